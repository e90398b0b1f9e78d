use std::path::Path;

use anyhow::Result;
use casefile_retrieval::config::Config;
use casefile_retrieval::db::Db;
use casefile_retrieval::error::RetrievalError;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    log::info!("Starting casefile-retrieval v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Configuration loaded successfully");
    log::info!("Corpus root: {}", config.corpus_dir().display());
    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| casefile_retrieval::db::migrate::run_migrations(conn, migrations_dir))
        .await?;

    log::info!("Database initialized successfully");

    verify_database_schema(&db).await?;

    log::info!("Ready. Use the `index`, `query`, `stats` and `export` binaries to operate on this database.");

    Ok(())
}

/// Verifies that the tables, indexes and pragmas this engine depends on exist and are
/// configured as expected. Run by default so a misconfigured database fails loudly
/// before any of the other binaries touch it.
async fn verify_database_schema(db: &Db) -> Result<()> {
    db.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .map_err(RetrievalError::Database)?;

        let expected_tables = [
            "documents",
            "people",
            "organizations",
            "locations",
            "dates",
            "emails",
            "query_logs",
            "schema_migrations",
        ];
        let mut all_tables_exist = true;
        for table in expected_tables {
            if !tables.iter().any(|t| t == table) {
                log::error!("Missing table: {}", table);
                all_tables_exist = false;
            } else {
                log::debug!("table exists: {}", table);
            }
        }
        if !all_tables_exist {
            return Err(RetrievalError::Config("not all required tables exist".to_string()));
        }

        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")?;
        let indexes: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .map_err(RetrievalError::Database)?;

        let expected_indexes = [
            "idx_people_name",
            "idx_organizations_name",
            "idx_locations_name",
            "idx_dates_date_str",
            "idx_emails_email",
        ];
        for index_name in expected_indexes {
            if indexes.iter().any(|i| i == index_name) {
                log::debug!("index exists: {}", index_name);
            } else {
                log::warn!("expected index not found: {}", index_name);
            }
        }

        let applied = casefile_retrieval::db::migrate::get_applied_migrations(conn)?;
        if applied.is_empty() {
            return Err(RetrievalError::Config("no migrations have been applied".to_string()));
        }
        log::debug!("{} migration(s) applied", applied.len());

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(RetrievalError::Config(format!("journal mode is not WAL: {journal_mode}")));
        }
        log::debug!("journal mode: WAL");

        let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if foreign_keys != 1 {
            return Err(RetrievalError::Config("foreign keys not enabled".to_string()));
        }
        log::debug!("foreign keys enabled");

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(RetrievalError::Config(format!("database integrity check failed: {integrity}")));
        }
        log::info!("database integrity: OK");

        Ok(())
    })
    .await?;

    log::info!("database schema verification complete");
    Ok(())
}
