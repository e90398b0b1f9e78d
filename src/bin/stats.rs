use anyhow::Result;
use casefile_retrieval::config::Config;
use casefile_retrieval::db::Db;
use casefile_retrieval::entity::EntityType;
use casefile_retrieval::error::RetrievalError;
use casefile_retrieval::MetadataStore;

/// Percentile over an already-sorted slice, nearest-rank method.
fn percentile(sorted_values: &[i64], p: f64) -> i64 {
    if sorted_values.is_empty() {
        return 0;
    }
    let index = ((sorted_values.len() - 1) as f64 * p).ceil() as usize;
    sorted_values[index.min(sorted_values.len() - 1)]
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let config = Config::load()?;
    let db = Db::new(config.db_path());
    let store = MetadataStore::new(db);

    println!("\n=== Query Performance Statistics ===\n");

    let stats = store
        .db()
        .with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT strategy, COUNT(*), AVG(took_ms), MIN(took_ms), MAX(took_ms), AVG(result_count)
                 FROM query_logs
                 WHERE logged_at > datetime('now', '-24 hours')
                 GROUP BY strategy
                 ORDER BY COUNT(*) DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, f64>(5)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
                .map_err(RetrievalError::Database)?;
            Ok(rows)
        })
        .await?;

    if stats.is_empty() {
        println!("No queries found in the last 24 hours. Run some searches with the `query` binary first.");
    } else {
        println!("{:-<78}", "");
        println!(
            "{:<12} {:>8} {:>12} {:>10} {:>10} {:>14}",
            "Strategy", "Count", "Avg (ms)", "Min (ms)", "Max (ms)", "Avg Results"
        );
        println!("{:-<78}", "");
        for (strategy, count, avg_ms, min_ms, max_ms, avg_results) in &stats {
            println!(
                "{:<12} {:>8} {:>12.1} {:>10} {:>10} {:>14.1}",
                strategy, count, avg_ms, min_ms, max_ms, avg_results
            );
        }
        println!("{:-<78}", "");

        let all_latencies = store
            .db()
            .with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT took_ms FROM query_logs WHERE logged_at > datetime('now', '-24 hours') ORDER BY took_ms",
                )?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, i64>(0))?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
                    .map_err(RetrievalError::Database)?;
                Ok(rows)
            })
            .await?;

        println!("\nLatency Percentiles (24 Hours):\n");
        println!("  P50: {}ms", percentile(&all_latencies, 0.50));
        println!("  P95: {}ms", percentile(&all_latencies, 0.95));
        println!("  P99: {}ms", percentile(&all_latencies, 0.99));
        if percentile(&all_latencies, 0.95) as u64 > config.performance.max_latency_ms {
            println!(
                "  (P95 exceeds configured max_latency_ms of {}ms)",
                config.performance.max_latency_ms
            );
        }
    }

    println!("\n=== Entity Corpus Statistics ===\n");
    for (label, entity_type) in [
        ("People", EntityType::Person),
        ("Organizations", EntityType::Org),
        ("Locations", EntityType::Loc),
    ] {
        let frequencies = store.frequencies(entity_type).await?;
        let total_documents: usize = frequencies.values().sum();
        let mut top: Vec<(&String, &usize)> = frequencies.iter().collect();
        top.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        println!("{}: {} distinct, {} document mentions", label, frequencies.len(), total_documents);
        for (name, count) in top.iter().take(5) {
            println!("    {name} ({count})");
        }
    }

    Ok(())
}
