//! Incremental ingestion: classify discovered files against what's already indexed so a
//! re-run only processes new or modified documents (§6, supplemented feature).

use std::collections::{HashMap, HashSet};

use crate::db::Db;
use crate::error::{Result, RetrievalError};
use crate::ingest::{compute_file_hash, FileMetadata};

/// Result of classifying discovered files against the database.
#[derive(Debug, Default)]
pub struct FileClassification {
    /// Files not present in the database — need full processing.
    pub new_files: Vec<FileMetadata>,
    /// Files present in the database with a different hash — need re-processing.
    pub modified_files: Vec<FileMetadata>,
    /// Files present in the database with the same hash — skip processing.
    pub unchanged_files: Vec<FileMetadata>,
}

/// Loads every indexed document's `filename` (corpus-relative path) and its stored
/// `file_hash`, for O(1) lookup during classification.
pub async fn get_existing_hashes(db: &Db) -> Result<HashMap<String, String>> {
    db.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT filename, file_hash FROM documents")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut map = HashMap::new();
        for row in rows {
            let (path, hash) = row?;
            map.insert(path, hash);
        }
        Ok::<HashMap<String, String>, RetrievalError>(map)
    })
    .await
}

/// Classifies discovered files into new, modified, or unchanged relative to the database.
pub fn classify_files(
    files: &[FileMetadata],
    existing_hashes: &HashMap<String, String>,
) -> Result<FileClassification> {
    let mut classification = FileClassification::default();

    for file in files {
        let current_hash = compute_file_hash(&file.absolute_path)?;
        let existing = existing_hashes.get(&file.relative_path);

        match existing {
            None => classification.new_files.push(file.clone()),
            Some(stored) if stored != &current_hash => classification.modified_files.push(file.clone()),
            Some(_) => classification.unchanged_files.push(file.clone()),
        }
    }

    Ok(classification)
}

/// Finds indexed documents whose file no longer exists on disk (candidates for cleanup).
/// `existing_files` is the set of relative paths currently discovered under the corpus root.
pub async fn find_deleted_documents(
    db: &Db,
    existing_files: &HashSet<String>,
) -> Result<Vec<String>> {
    let indexed: Vec<String> = db
        .with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT filename FROM documents")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut paths = Vec::new();
            for row in rows {
                paths.push(row?);
            }
            Ok::<Vec<String>, RetrievalError>(paths)
        })
        .await?;

    Ok(indexed
        .into_iter()
        .filter(|p| !existing_files.contains(p))
        .collect())
}

/// Deletes documents by relative path. Entity rows cascade automatically via foreign
/// key `ON DELETE CASCADE`. Returns the number of documents deleted.
pub async fn delete_documents(db: &Db, relative_paths: &[String]) -> Result<usize> {
    if relative_paths.is_empty() {
        return Ok(0);
    }

    let count = relative_paths.len();
    let paths: Vec<String> = relative_paths.to_vec();

    db.with_connection(move |conn| {
        for path in &paths {
            conn.execute("DELETE FROM documents WHERE filename = ?1", rusqlite::params![path])?;
        }
        Ok::<usize, RetrievalError>(count)
    })
    .await?;

    Ok(count)
}
