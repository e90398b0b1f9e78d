use std::time::Instant;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use casefile_retrieval::config::Config;
use casefile_retrieval::db::Db;
use casefile_retrieval::ner::HeuristicNer;
use casefile_retrieval::query::ScorerWeights;
use casefile_retrieval::search::{Bm25Index, Bm25Params, Strategy};
use casefile_retrieval::{lookup_index_from_store, MetadataStore, SearchOrchestrator};

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Run a hybrid entity-aware search against an indexed corpus")]
struct Args {
    /// Free-form query text.
    query: String,

    /// Filtering/ranking strategy.
    #[arg(short, long, value_enum, default_value_t = CliStrategy::Adaptive)]
    strategy: CliStrategy,

    /// Maximum number of results to return.
    #[arg(short = 'k', long)]
    top_k: Option<usize>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CliStrategy {
    Strict,
    Loose,
    Boost,
    Adaptive,
    None,
}

impl From<CliStrategy> for Strategy {
    fn from(value: CliStrategy) -> Self {
        match value {
            CliStrategy::Strict => Strategy::Strict,
            CliStrategy::Loose => Strategy::Loose,
            CliStrategy::Boost => Strategy::Boost,
            CliStrategy::Adaptive => Strategy::Adaptive,
            CliStrategy::None => Strategy::None,
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

    let raw_texts = store.all_raw_texts().await?;
    let bm25_params = Bm25Params {
        k1: config.search.bm25_k1,
        b: config.search.bm25_b,
    };
    let bm25 = Bm25Index::build(raw_texts, bm25_params);

    let lookup = lookup_index_from_store(&store).await?;
    let ner = HeuristicNer;
    let weights = ScorerWeights {
        person: config.search.weight_person,
        location: config.search.weight_location,
        org: config.search.weight_org,
        date: config.search.weight_date,
    };

    let orchestrator = SearchOrchestrator::new(
        &bm25,
        &store,
        &lookup,
        &ner,
        weights,
        config.entities.fuzzy_threshold as f64,
        config.entities.scan_cap,
    );

    let top_k = args.top_k.unwrap_or(config.search.default_top_k);
    let strategy: Strategy = args.strategy.into();

    let start = Instant::now();
    let outcome = orchestrator
        .search(
            &args.query,
            top_k,
            strategy,
            config.search.min_candidates,
            config.search.max_candidates,
            None,
        )
        .await?;
    let elapsed = start.elapsed();

    // Best-effort query logging: a logging failure must never surface as a search error.
    if let Err(e) = store
        .log_query(
            args.query.clone(),
            format!("{:?}", outcome.effective_strategy),
            outcome.results.len(),
            elapsed.as_millis() as u64,
        )
        .await
    {
        log::warn!("failed to record query log: {}", e);
    }

    println!("Query: \"{}\"", args.query);
    println!("Strategy: {:?} (requested {:?})", outcome.effective_strategy, strategy);
    println!("Results: {} in {:?}\n", outcome.results.len(), elapsed);

    for (rank, result) in outcome.results.iter().enumerate() {
        println!("#{} {} (bm25={:.3}, boost={:.3}, final={:.3})", rank + 1, result.doc_id, result.bm25_score, result.metadata_boost, result.final_score);
        if !result.matched_entities.is_empty() {
            println!(
                "    matched: people={:?} orgs={:?} locations={:?} dates={:?}",
                result.matched_entities.people,
                result.matched_entities.organizations,
                result.matched_entities.locations,
                result.matched_entities.dates
            );
        }
        println!("    {}\n", result.preview);
    }

    if elapsed.as_millis() > config.performance.max_latency_ms as u128 {
        log::warn!("search latency exceeded target of {}ms", config.performance.max_latency_ms);
    }

    Ok(())
}
