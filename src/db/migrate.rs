use rusqlite::{Connection, params};
use std::fs;
use std::path::Path;
use crate::error::{Result, RetrievalError};

/// Migration metadata
struct Migration {
    version: u32,
    name: String,
    sql: String,
}

/// Create schema_migrations table if it doesn't exist
fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get list of applied migrations
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
        .map_err(RetrievalError::Database)?;
    Ok(names)
}

/// Load migration files from migrations directory
fn load_migrations(migrations_dir: &Path) -> Result<Vec<Migration>> {
    let mut migrations = Vec::new();
    
    let entries = fs::read_dir(migrations_dir)
        .map_err(RetrievalError::Io)?;
    
    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("sql"))
        .collect();
    
    // Sort by filename
    files.sort_by_key(|e| e.file_name());
    
    for entry in files {
        let path = entry.path();
        let filename = path.file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RetrievalError::Config("Invalid migration filename".to_string()))?;
        
        // Parse version from filename (e.g., "001_core_tables.sql" -> 1)
        let version_str = filename
            .split('_')
            .next()
            .ok_or_else(|| RetrievalError::Config(format!("Invalid migration filename: {}", filename)))?;
        let version: u32 = version_str.parse()
            .map_err(|_| RetrievalError::Config(format!("Invalid migration version: {}", version_str)))?;
        
        let sql = fs::read_to_string(&path)
            .map_err(RetrievalError::Io)?;
        
        let name = filename.trim_end_matches(".sql").to_string();
        
        migrations.push(Migration { version, name, sql });
    }
    
    // Sort by version
    migrations.sort_by_key(|m| m.version);
    
    Ok(migrations)
}

/// Run all pending migrations
pub fn run_migrations(conn: &mut Connection, migrations_dir: &Path) -> Result<()> {
    ensure_migrations_table(conn)?;
    
    let applied = get_applied_migrations(conn)?;
    let migrations = load_migrations(migrations_dir)?;
    
    for migration in migrations {
        if applied.contains(&migration.name) {
            log::debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }
        
        log::info!("Applying migration: {} (version {})", migration.name, migration.version);
        
        // Execute migration in a transaction
        let tx = conn.transaction()?;
        
        // Use execute_batch which properly handles multiple SQL statements
        // including those with semicolons in trigger definitions
        tx.execute_batch(&migration.sql)
            .map_err(|e| {
                RetrievalError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                    Some(format!("Failed to execute migration {}: {}", migration.name, e))
                ))
            })?;
        
        // Record migration as applied
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        
        tx.commit()?;
        
        log::info!("Migration {} applied successfully", migration.name);
    }
    
    log::info!("All migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use std::fs;
    
    #[test]
    fn test_migration_tracking() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let conn = Connection::open(&db_path).unwrap();
        
        ensure_migrations_table(&conn).unwrap();
        
        // Apply a test migration
        conn.execute("CREATE TABLE test (id INTEGER)", []).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![1, "001_test"],
        ).unwrap();
        
        let applied = get_applied_migrations(&conn).unwrap();
        assert!(applied.contains(&"001_test".to_string()));
    }
    
    #[test]
    fn test_load_migrations() {
        let temp_dir = TempDir::new().unwrap();
        let migrations_dir = temp_dir.path().join("migrations");
        fs::create_dir(&migrations_dir).unwrap();
        
        fs::write(
            migrations_dir.join("001_test.sql"),
            "CREATE TABLE test (id INTEGER);"
        ).unwrap();
        
        fs::write(
            migrations_dir.join("002_another.sql"),
            "CREATE TABLE another (id INTEGER);"
        ).unwrap();
        
        let migrations = load_migrations(&migrations_dir).unwrap();
        assert_eq!(migrations.len(), 2);
        assert_eq!(migrations[0].version, 1);
        assert_eq!(migrations[1].version, 2);
    }
    
    #[test]
    fn test_full_migration_schema() {
        // Test that migrations create all expected tables
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let mut conn = Connection::open(&db_path).unwrap();

        // Use actual migrations directory if it exists, otherwise create test migrations
        let migrations_dir = Path::new("migrations");
        if migrations_dir.exists() {
            run_migrations(&mut conn, migrations_dir).unwrap();

            let tables: Vec<String> = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .unwrap()
                .query_map([], |row| row.get::<_, String>(0))
                .unwrap()
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
                .unwrap();

            assert!(tables.contains(&"documents".to_string()));
            assert!(tables.contains(&"people".to_string()));
            assert!(tables.contains(&"organizations".to_string()));
            assert!(tables.contains(&"locations".to_string()));
            assert!(tables.contains(&"dates".to_string()));
            assert!(tables.contains(&"emails".to_string()));
            assert!(tables.contains(&"query_logs".to_string()));
            assert!(tables.contains(&"schema_migrations".to_string()));

            let indexes: Vec<String> = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")
                .unwrap()
                .query_map([], |row| row.get::<_, String>(0))
                .unwrap()
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
                .unwrap();

            assert!(indexes.contains(&"idx_people_name".to_string()));
            assert!(indexes.contains(&"idx_organizations_name".to_string()));
            assert!(indexes.contains(&"idx_locations_name".to_string()));
            assert!(indexes.contains(&"idx_dates_date_str".to_string()));
            assert!(indexes.contains(&"idx_emails_email".to_string()));
        }
    }
}
