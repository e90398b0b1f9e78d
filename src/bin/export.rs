use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use casefile_retrieval::config::Config;
use casefile_retrieval::db::Db;
use casefile_retrieval::entity::EntityType;
use casefile_retrieval::export::{export_cooccurrence_matrix, export_entity_documents, export_entity_frequencies};
use casefile_retrieval::MetadataStore;

#[derive(Parser, Debug)]
#[command(name = "export")]
#[command(about = "Export entity metadata to CSV")]
struct Args {
    #[command(subcommand)]
    layout: Layout,

    /// Output file path; prints to stdout if omitted.
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Layout {
    /// Entity,Type,Document Count rows, sorted by type then descending count.
    Frequencies,
    /// One row per entity with a semicolon-joined list of document IDs.
    Documents,
    /// Square co-occurrence matrix for one entity type.
    Cooccurrence {
        #[arg(value_enum)]
        entity_type: CliEntityType,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CliEntityType {
    Person,
    Org,
    Loc,
}

impl From<CliEntityType> for EntityType {
    fn from(value: CliEntityType) -> Self {
        match value {
            CliEntityType::Person => EntityType::Person,
            CliEntityType::Org => EntityType::Org,
            CliEntityType::Loc => EntityType::Loc,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = Config::load()?;
    let db = Db::new(config.db_path());
    let store = MetadataStore::new(db);

    let csv = match args.layout {
        Layout::Frequencies => export_entity_frequencies(&store).await?,
        Layout::Documents => export_entity_documents(&store).await?,
        Layout::Cooccurrence { entity_type } => export_cooccurrence_matrix(&store, entity_type.into()).await?,
    };

    match args.out {
        Some(path) => {
            std::fs::write(&path, csv)?;
            log::info!("wrote export to {}", path.display());
        }
        None => print!("{csv}"),
    }

    Ok(())
}
