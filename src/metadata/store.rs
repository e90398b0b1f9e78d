use std::collections::{HashMap, HashSet};
use std::path::Path;

use rusqlite::{params, Connection};

use crate::db::Db;
use crate::entity::{match_any, EntityType};
use crate::error::{Result, RetrievalError};

use super::DocumentMetadata;

/// Filter criteria for [`MetadataStore::filter`] / [`MetadataStore::filter_fuzzy`].
///
/// AND across non-empty fields; OR within a field's value list.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub people: Vec<String>,
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
    pub date_range: Option<(String, String)>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
            && self.organizations.is_empty()
            && self.locations.is_empty()
            && self.date_range.is_none()
    }
}

/// All canonical names observed in the corpus, grouped by entity type.
#[derive(Debug, Clone, Default)]
pub struct AllEntities {
    pub people: HashSet<String>,
    pub organizations: HashSet<String>,
    pub locations: HashSet<String>,
}

/// Runs the upsert transaction for [`MetadataStore::put`]. Split out so the retry-once
/// wrapper can call it twice against fresh connections without re-cloning its arguments.
fn write_document(
    conn: &mut Connection,
    filename: &str,
    raw_text: &str,
    file_hash: &str,
    metadata: &DocumentMetadata,
) -> Result<()> {
    let tx = conn.transaction().map_err(RetrievalError::Database)?;

    tx.execute(
        "INSERT INTO documents (doc_id, filename, raw_text, file_hash, word_count)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(doc_id) DO UPDATE SET
            filename = excluded.filename,
            raw_text = excluded.raw_text,
            file_hash = excluded.file_hash,
            word_count = excluded.word_count",
        params![
            metadata.doc_id,
            filename,
            raw_text,
            file_hash,
            metadata.word_count as i64
        ],
    )?;

    for (table, names) in [
        ("people", &metadata.people),
        ("organizations", &metadata.organizations),
        ("locations", &metadata.locations),
    ] {
        tx.execute(
            &format!("DELETE FROM {table} WHERE doc_id = ?1"),
            params![metadata.doc_id],
        )?;
        for name in names {
            tx.execute(
                &format!("INSERT INTO {table} (doc_id, name) VALUES (?1, ?2)"),
                params![metadata.doc_id, name],
            )?;
        }
    }

    tx.execute("DELETE FROM dates WHERE doc_id = ?1", params![metadata.doc_id])?;
    for d in &metadata.dates {
        tx.execute(
            "INSERT INTO dates (doc_id, date_str) VALUES (?1, ?2)",
            params![metadata.doc_id, d],
        )?;
    }

    tx.execute("DELETE FROM emails WHERE doc_id = ?1", params![metadata.doc_id])?;
    for e in &metadata.emails {
        tx.execute(
            "INSERT INTO emails (doc_id, email) VALUES (?1, ?2)",
            params![metadata.doc_id, e],
        )?;
    }

    tx.commit().map_err(RetrievalError::Database)?;
    Ok(())
}

fn table_for(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Person => "people",
        EntityType::Org => "organizations",
        EntityType::Loc => "locations",
    }
}

/// Persistent, transactional structured storage for per-document entity metadata
/// (§4.6). Single-writer, multi-reader: `put` is the only write path and is fully
/// atomic per document.
pub struct MetadataStore {
    db: Db,
}

impl MetadataStore {
    pub fn new(db: Db) -> Self {
        MetadataStore { db }
    }

    /// Exposes the underlying connection manager for collaborators (incremental
    /// classification) that operate below the metadata-shaped API.
    pub fn db(&self) -> &Db {
        &self.db
    }

    pub async fn run_migrations(&self, migrations_dir: &Path) -> Result<()> {
        let migrations_dir = migrations_dir.to_path_buf();
        self.db
            .with_connection(move |conn| crate::db::migrate::run_migrations(conn, &migrations_dir))
            .await
    }

    /// Upserts a document row and all of its entity sets atomically. Previous rows for
    /// `doc_id` in every entity table are deleted then re-inserted within one transaction.
    ///
    /// A transaction failure (e.g. a transient `SQLITE_BUSY` or I/O fault) is retried once
    /// in full before the error is surfaced, so a single lock contention blip doesn't fail
    /// an otherwise-healthy ingest run.
    pub async fn put(
        &self,
        filename: String,
        raw_text: String,
        file_hash: String,
        metadata: DocumentMetadata,
    ) -> Result<()> {
        let first = {
            let filename = filename.clone();
            let raw_text = raw_text.clone();
            let file_hash = file_hash.clone();
            let metadata = metadata.clone();
            self.db
                .with_connection(move |conn| write_document(conn, &filename, &raw_text, &file_hash, &metadata))
                .await
        };

        match first {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("put({}) failed, retrying once: {}", metadata.doc_id, e);
                self.db
                    .with_connection(move |conn| write_document(conn, &filename, &raw_text, &file_hash, &metadata))
                    .await
            }
        }
    }

    pub async fn get(&self, doc_id: &str) -> Result<Option<DocumentMetadata>> {
        let doc_id = doc_id.to_string();
        self.db
            .with_connection(move |conn| load_metadata(conn, &doc_id))
            .await
    }

    pub async fn get_raw_text(&self, doc_id: &str) -> Result<Option<String>> {
        let doc_id = doc_id.to_string();
        self.db
            .with_connection(move |conn| {
                conn.query_row(
                    "SELECT raw_text FROM documents WHERE doc_id = ?1",
                    params![doc_id],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(RetrievalError::Database(other)),
                })
            })
            .await
    }

    /// Every stored `(doc_id, raw_text)` pair, for rebuilding the in-memory BM25 index
    /// at process startup (§3: the lexical index itself is never persisted).
    pub async fn all_raw_texts(&self) -> Result<Vec<(String, String)>> {
        self.db
            .with_connection(|conn| {
                let mut stmt = conn.prepare("SELECT doc_id, raw_text FROM documents")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
                    .map_err(RetrievalError::Database)?;
                Ok(rows)
            })
            .await
    }

    pub async fn delete(&self, doc_id: &str) -> Result<()> {
        let doc_id = doc_id.to_string();
        self.db
            .with_connection(move |conn| {
                conn.execute("DELETE FROM documents WHERE doc_id = ?1", params![doc_id])?;
                Ok(())
            })
            .await
    }

    pub async fn existing_file_hashes(&self) -> Result<HashMap<String, String>> {
        self.db
            .with_connection(|conn| {
                let mut stmt = conn.prepare("SELECT filename, file_hash FROM documents")?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })?
                    .collect::<std::result::Result<HashMap<_, _>, rusqlite::Error>>()
                    .map_err(RetrievalError::Database)?;
                Ok(rows)
            })
            .await
    }

    /// Exact-match filter using indexed lookups: AND across provided criteria types,
    /// OR within a type's value list.
    pub async fn filter(
        &self,
        candidate_ids: Vec<String>,
        criteria: FilterCriteria,
    ) -> Result<Vec<String>> {
        if criteria.is_empty() {
            return Ok(candidate_ids);
        }
        self.db
            .with_connection(move |conn| exact_filter(conn, &candidate_ids, &criteria))
            .await
    }

    /// Same semantics as [`Self::filter`] but entity matches go through
    /// `EntityMatcher::match_any` instead of SQL equality, since fuzzy matching has no
    /// indexed path.
    pub async fn filter_fuzzy(
        &self,
        candidate_ids: Vec<String>,
        criteria: FilterCriteria,
    ) -> Result<Vec<String>> {
        if criteria.is_empty() {
            return Ok(candidate_ids);
        }
        self.db
            .with_connection(move |conn| {
                let mut kept = Vec::new();
                for doc_id in &candidate_ids {
                    let metadata = load_metadata(conn, doc_id)?.unwrap_or_default();
                    if metadata.doc_id.is_empty() {
                        continue;
                    }
                    if passes_fuzzy(&metadata, &criteria) {
                        kept.push(doc_id.clone());
                    }
                }
                Ok(kept)
            })
            .await
    }

    pub async fn all_entities(&self) -> Result<AllEntities> {
        self.db
            .with_connection(|conn| {
                Ok(AllEntities {
                    people: distinct_names(conn, "people")?,
                    organizations: distinct_names(conn, "organizations")?,
                    locations: distinct_names(conn, "locations")?,
                })
            })
            .await
    }

    pub async fn frequencies(&self, entity_type: EntityType) -> Result<HashMap<String, usize>> {
        let table = table_for(entity_type);
        let sql = format!(
            "SELECT name, COUNT(DISTINCT doc_id) FROM {table} GROUP BY name ORDER BY name"
        );
        self.db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
                    })?
                    .collect::<std::result::Result<HashMap<_, _>, rusqlite::Error>>()
                    .map_err(RetrievalError::Database)?;
                Ok(rows)
            })
            .await
    }

    /// All `doc_id`s whose entity set of `entity_type` contains `canonical` exactly.
    pub async fn document_ids_for_entity(
        &self,
        canonical: &str,
        entity_type: EntityType,
    ) -> Result<Vec<String>> {
        let table = table_for(entity_type);
        let sql = format!("SELECT DISTINCT doc_id FROM {table} WHERE name = ?1");
        let canonical = canonical.to_string();
        self.db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![canonical], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
                    .map_err(RetrievalError::Database)?;
                Ok(rows)
            })
            .await
    }

    /// Records one served query for latency/strategy auditing (§6). Callers treat
    /// failures as best-effort: a logging failure must never fail the search itself.
    pub async fn log_query(
        &self,
        query_text: String,
        strategy: String,
        result_count: usize,
        took_ms: u64,
    ) -> Result<()> {
        self.db
            .with_connection(move |conn| {
                conn.execute(
                    "INSERT INTO query_logs (query_text, strategy, result_count, took_ms)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![query_text, strategy, result_count as i64, took_ms as i64],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn cooccurrences(
        &self,
        canonical: String,
        entity_type: EntityType,
        limit: usize,
    ) -> Result<Vec<(String, usize)>> {
        let table = table_for(entity_type);
        let sql = format!(
            "SELECT b.name, COUNT(DISTINCT a.doc_id) AS cnt
             FROM {table} a
             JOIN {table} b ON a.doc_id = b.doc_id AND b.name != a.name
             WHERE a.name = ?1
             GROUP BY b.name
             ORDER BY cnt DESC, b.name ASC
             LIMIT ?2"
        );
        self.db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![canonical, limit as i64], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
                    })?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
                    .map_err(RetrievalError::Database)?;
                Ok(rows)
            })
            .await
    }
}

fn distinct_names(conn: &Connection, table: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("SELECT DISTINCT name FROM {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<HashSet<_>, rusqlite::Error>>()
        .map_err(RetrievalError::Database)?;
    Ok(rows)
}

fn load_metadata(conn: &Connection, doc_id: &str) -> Result<Option<DocumentMetadata>> {
    let word_count: Option<i64> = conn
        .query_row(
            "SELECT word_count FROM documents WHERE doc_id = ?1",
            params![doc_id],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(RetrievalError::Database(other)),
        })?;

    let Some(word_count) = word_count else {
        return Ok(None);
    };

    Ok(Some(DocumentMetadata {
        doc_id: doc_id.to_string(),
        word_count: word_count as usize,
        people: names_for_doc(conn, "people", doc_id)?,
        organizations: names_for_doc(conn, "organizations", doc_id)?,
        locations: names_for_doc(conn, "locations", doc_id)?,
        dates: strings_for_doc(conn, "dates", "date_str", doc_id)?,
        emails: strings_for_doc(conn, "emails", "email", doc_id)?,
    }))
}

fn names_for_doc(conn: &Connection, table: &str, doc_id: &str) -> Result<HashSet<String>> {
    strings_for_doc(conn, table, "name", doc_id)
}

fn strings_for_doc(
    conn: &Connection,
    table: &str,
    column: &str,
    doc_id: &str,
) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("SELECT {column} FROM {table} WHERE doc_id = ?1"))?;
    let rows = stmt
        .query_map(params![doc_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<HashSet<_>, rusqlite::Error>>()
        .map_err(RetrievalError::Database)?;
    Ok(rows)
}

fn exact_filter(
    conn: &Connection,
    candidate_ids: &[String],
    criteria: &FilterCriteria,
) -> Result<Vec<String>> {
    let mut surviving: HashSet<String> = candidate_ids.iter().cloned().collect();

    for (table, values) in [
        ("people", &criteria.people),
        ("organizations", &criteria.organizations),
        ("locations", &criteria.locations),
    ] {
        if values.is_empty() {
            continue;
        }
        let placeholders = values.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!("SELECT DISTINCT doc_id FROM {table} WHERE name IN ({placeholders})");
        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::ToSql> =
            values.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
        let matches: HashSet<String> = stmt
            .query_map(params.as_slice(), |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, rusqlite::Error>>()
            .map_err(RetrievalError::Database)?;
        surviving.retain(|id| matches.contains(id));
    }

    if let Some((low, high)) = &criteria.date_range {
        let placeholders_ids = candidate_ids
            .iter()
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT DISTINCT doc_id FROM dates WHERE date_str >= ? AND date_str <= ?
             AND doc_id IN ({placeholders_ids})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut params: Vec<&dyn rusqlite::ToSql> = vec![low, high];
        params.extend(candidate_ids.iter().map(|v| v as &dyn rusqlite::ToSql));
        let matches: HashSet<String> = stmt
            .query_map(params.as_slice(), |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, rusqlite::Error>>()
            .map_err(RetrievalError::Database)?;
        surviving.retain(|id| matches.contains(id));
    }

    Ok(candidate_ids
        .iter()
        .filter(|id| surviving.contains(*id))
        .cloned()
        .collect())
}

fn passes_fuzzy(metadata: &DocumentMetadata, criteria: &FilterCriteria) -> bool {
    if !criteria.people.is_empty() {
        let query: HashSet<String> = criteria.people.iter().cloned().collect();
        if !match_any(&query, &metadata.people) {
            return false;
        }
    }
    if !criteria.organizations.is_empty() {
        let query: HashSet<String> = criteria.organizations.iter().cloned().collect();
        if !match_any(&query, &metadata.organizations) {
            return false;
        }
    }
    if !criteria.locations.is_empty() {
        let query: HashSet<String> = criteria.locations.iter().cloned().collect();
        if !match_any(&query, &metadata.locations) {
            return false;
        }
    }
    if let Some((low, high)) = &criteria.date_range {
        if !metadata.dates.iter().any(|d| d >= low && d <= high) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate::run_migrations;
    use tempfile::TempDir;

    fn sample_metadata(doc_id: &str) -> DocumentMetadata {
        DocumentMetadata {
            doc_id: doc_id.to_string(),
            word_count: 5,
            people: HashSet::from(["Jeffrey Epstein".to_string()]),
            organizations: HashSet::new(),
            locations: HashSet::from(["Paris".to_string()]),
            dates: HashSet::from(["2020-01-01".to_string()]),
            emails: HashSet::new(),
        }
    }

    async fn new_store() -> (MetadataStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);
        {
            let migrations_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
            db.with_connection(move |conn| run_migrations(conn, &migrations_dir))
                .await
                .unwrap();
        }
        (MetadataStore::new(db), temp_dir)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (store, _dir) = new_store().await;
        store
            .put(
                "doc1.txt".to_string(),
                "Jeffrey Epstein met with Maxwell in Paris.".to_string(),
                "hash1".to_string(),
                sample_metadata("d1"),
            )
            .await
            .unwrap();

        let fetched = store.get("d1").await.unwrap().unwrap();
        assert_eq!(fetched.people, HashSet::from(["Jeffrey Epstein".to_string()]));
        assert_eq!(fetched.word_count, 5);
    }

    #[tokio::test]
    async fn get_missing_doc_returns_none() {
        let (store, _dir) = new_store().await;
        assert!(store.get("does-not-exist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_upserts_replacing_prior_sets() {
        let (store, _dir) = new_store().await;
        store
            .put("d1.txt".to_string(), "text".to_string(), "h1".to_string(), sample_metadata("d1"))
            .await
            .unwrap();

        let mut updated = sample_metadata("d1");
        updated.people = HashSet::from(["Alan Dershowitz".to_string()]);
        store
            .put("d1.txt".to_string(), "text".to_string(), "h2".to_string(), updated)
            .await
            .unwrap();

        let fetched = store.get("d1").await.unwrap().unwrap();
        assert_eq!(fetched.people, HashSet::from(["Alan Dershowitz".to_string()]));
    }

    #[tokio::test]
    async fn filter_exact_and_across_types() {
        let (store, _dir) = new_store().await;
        let mut d1 = sample_metadata("d1");
        d1.organizations = HashSet::from(["Acme Corp".to_string()]);
        store.put("d1.txt".into(), "t".into(), "h1".into(), d1).await.unwrap();

        let mut d2 = sample_metadata("d2");
        d2.organizations = HashSet::new();
        store.put("d2.txt".into(), "t".into(), "h2".into(), d2).await.unwrap();

        let criteria = FilterCriteria {
            people: vec!["Jeffrey Epstein".to_string()],
            organizations: vec!["Acme Corp".to_string()],
            ..Default::default()
        };
        let result = store
            .filter(vec!["d1".to_string(), "d2".to_string()], criteria)
            .await
            .unwrap();
        assert_eq!(result, vec!["d1".to_string()]);
    }

    #[tokio::test]
    async fn filter_fuzzy_matches_near_variants() {
        let (store, _dir) = new_store().await;
        store
            .put("d1.txt".into(), "t".into(), "h1".into(), sample_metadata("d1"))
            .await
            .unwrap();

        let criteria = FilterCriteria {
            people: vec!["Epstein".to_string()],
            ..Default::default()
        };
        let result = store
            .filter_fuzzy(vec!["d1".to_string()], criteria)
            .await
            .unwrap();
        assert_eq!(result, vec!["d1".to_string()]);
    }

    #[tokio::test]
    async fn all_entities_aggregates_across_docs() {
        let (store, _dir) = new_store().await;
        store
            .put("d1.txt".into(), "t".into(), "h1".into(), sample_metadata("d1"))
            .await
            .unwrap();
        let all = store.all_entities().await.unwrap();
        assert!(all.people.contains("Jeffrey Epstein"));
        assert!(all.locations.contains("Paris"));
    }

    #[tokio::test]
    async fn frequencies_counts_distinct_documents() {
        let (store, _dir) = new_store().await;
        store
            .put("d1.txt".into(), "t".into(), "h1".into(), sample_metadata("d1"))
            .await
            .unwrap();
        store
            .put("d2.txt".into(), "t".into(), "h2".into(), sample_metadata("d2"))
            .await
            .unwrap();
        let freq = store.frequencies(EntityType::Person).await.unwrap();
        assert_eq!(freq.get("Jeffrey Epstein"), Some(&2));
    }

    #[tokio::test]
    async fn cooccurrences_finds_paired_entities() {
        let (store, _dir) = new_store().await;
        let mut d1 = sample_metadata("d1");
        d1.people = HashSet::from(["Jeffrey Epstein".to_string(), "Ghislaine Maxwell".to_string()]);
        store.put("d1.txt".into(), "t".into(), "h1".into(), d1).await.unwrap();

        let co = store
            .cooccurrences("Jeffrey Epstein".to_string(), EntityType::Person, 10)
            .await
            .unwrap();
        assert!(co.iter().any(|(name, count)| name == "Ghislaine Maxwell" && *count == 1));
    }
}
