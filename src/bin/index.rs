use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use casefile_retrieval::config::Config;
use casefile_retrieval::db::Db;
use casefile_retrieval::ner::HeuristicNer;
use casefile_retrieval::{build_index, build_index_forced, MetadataStore};

#[derive(Parser, Debug)]
#[command(name = "index")]
#[command(about = "Index (or re-index) a corpus of .txt documents into the retrieval database")]
struct Args {
    /// Re-extract every document's metadata, ignoring stored file hashes, instead of
    /// only reprocessing new or modified files.
    #[arg(short, long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args = Args::parse();

    log::info!("Starting corpus indexing");

    let config = Config::load()?;
    log::info!("Corpus root: {}", config.corpus_dir().display());
    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());
    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| casefile_retrieval::db::migrate::run_migrations(conn, migrations_dir))
        .await?;

    let store = MetadataStore::new(db);
    let ner = HeuristicNer;

    let start = Instant::now();
    let bm25 = if args.force {
        log::info!("--force: re-extracting every document regardless of file hash");
        build_index_forced(config.corpus_dir(), &store, &ner, &config).await?
    } else {
        build_index(config.corpus_dir(), &store, &ner, &config).await?
    };
    let elapsed = start.elapsed();

    log::info!("=== Indexing Complete ===");
    log::info!("Documents in index: {}", bm25.len());
    log::info!("Time: {:?}", elapsed);

    let all = store.all_entities().await?;
    log::info!(
        "Entities known: {} people, {} organizations, {} locations",
        all.people.len(),
        all.organizations.len(),
        all.locations.len()
    );

    Ok(())
}
