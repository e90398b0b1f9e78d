pub mod incremental;
pub mod metadata;
pub mod walker;

pub use incremental::{
    classify_files, delete_documents, find_deleted_documents, get_existing_hashes, FileClassification,
};
pub use metadata::{compute_file_hash, doc_id_for};
pub use walker::{discover_files, read_with_charset_detection, FileMetadata};

use std::collections::HashSet;
use std::path::Path;

use crate::config::Config;
use crate::entity::{ConsolidationGroup, EntityType};
use crate::metadata::{consolidate_corpus, extract, DocumentMetadata, ExtractedMetadata, MetadataStore};
use crate::ner::NerModel;
use crate::query::EntityLookupIndex;
use crate::search::{Bm25Index, Bm25Params};
use crate::text::normalize_text;

/// Scans `doc_dir` for `.txt` files, classifies them against what's already persisted in
/// `store`, (re-)extracts metadata for new/modified documents, re-consolidates the whole
/// corpus, persists the result, and builds an in-memory BM25 index over every surviving
/// document's raw text (§6).
///
/// Unchanged documents are not re-read from disk or re-run through the NER model; their
/// already-consolidated metadata is fed back into consolidation as-is, since consolidating
/// a set of canonical names is idempotent up to new corpus-wide merges.
pub async fn build_index(
    doc_dir: &Path,
    store: &MetadataStore,
    ner: &dyn NerModel,
    config: &Config,
) -> crate::error::Result<Bm25Index> {
    build_index_inner(doc_dir, store, ner, config, false).await
}

/// Same as [`build_index`] but ignores any previously stored file hashes, so every
/// discovered document is re-extracted and re-run through NER regardless of whether it
/// changed on disk. Used by the `index` binary's `--force` flag.
pub async fn build_index_forced(
    doc_dir: &Path,
    store: &MetadataStore,
    ner: &dyn NerModel,
    config: &Config,
) -> crate::error::Result<Bm25Index> {
    build_index_inner(doc_dir, store, ner, config, true).await
}

async fn build_index_inner(
    doc_dir: &Path,
    store: &MetadataStore,
    ner: &dyn NerModel,
    config: &Config,
    force: bool,
) -> crate::error::Result<Bm25Index> {
    let discovered = discover_files(doc_dir)?;
    let discovered_paths: HashSet<String> = discovered.iter().map(|f| f.relative_path.clone()).collect();

    let existing_hashes = if force {
        std::collections::HashMap::new()
    } else {
        get_existing_hashes(store.db()).await?
    };
    let classification = classify_files(&discovered, &existing_hashes)?;

    let deleted = find_deleted_documents(store.db(), &discovered_paths).await?;
    if !deleted.is_empty() {
        delete_documents(store.db(), &deleted).await?;
        log::info!("removed {} documents no longer present on disk", deleted.len());
    }

    let mut extracted: Vec<ExtractedMetadata> = Vec::new();
    let mut raw_texts: Vec<(String, String)> = Vec::new();

    for file in classification
        .new_files
        .iter()
        .chain(classification.modified_files.iter())
    {
        let decoded = read_with_charset_detection(&file.absolute_path)?;
        let normalized = normalize_text(&decoded);
        let doc_id = doc_id_for(&file.relative_path);

        let doc_metadata = extract(&doc_id, &normalized, ner, config.performance.ner_char_bound);
        extracted.push(doc_metadata);
        raw_texts.push((doc_id, normalized));
    }

    for file in &classification.unchanged_files {
        let doc_id = doc_id_for(&file.relative_path);
        if let Some(stored) = store.get(&doc_id).await? {
            extracted.push(as_extracted(&stored));
            if let Some(raw_text) = store.get_raw_text(&doc_id).await? {
                raw_texts.push((doc_id, raw_text));
            }
        }
    }

    let consolidated = consolidate_corpus(&extracted);

    let filenames: std::collections::HashMap<String, String> = classification
        .new_files
        .iter()
        .chain(classification.modified_files.iter())
        .chain(classification.unchanged_files.iter())
        .map(|f| (doc_id_for(&f.relative_path), f.relative_path.clone()))
        .collect();
    let hashes: std::collections::HashMap<String, String> = classification
        .new_files
        .iter()
        .chain(classification.modified_files.iter())
        .map(|f| {
            (
                doc_id_for(&f.relative_path),
                compute_file_hash(&f.absolute_path).unwrap_or_default(),
            )
        })
        .collect();

    let raw_text_by_id: std::collections::HashMap<String, String> = raw_texts.iter().cloned().collect();

    for doc_metadata in consolidated {
        let filename = filenames
            .get(&doc_metadata.doc_id)
            .cloned()
            .unwrap_or_else(|| doc_metadata.doc_id.clone());
        let raw_text = raw_text_by_id.get(&doc_metadata.doc_id).cloned().unwrap_or_default();
        let file_hash = hashes
            .get(&doc_metadata.doc_id)
            .cloned()
            .unwrap_or_else(|| existing_hashes.get(&filename).cloned().unwrap_or_default());
        store.put(filename, raw_text, file_hash, doc_metadata).await?;
    }

    log::info!(
        "indexed corpus: {} new, {} modified, {} unchanged, {} deleted",
        classification.new_files.len(),
        classification.modified_files.len(),
        classification.unchanged_files.len(),
        deleted.len()
    );

    let bm25_params = Bm25Params {
        k1: config.search.bm25_k1,
        b: config.search.bm25_b,
    };
    Ok(Bm25Index::build(raw_texts, bm25_params))
}

/// Builds a query-time [`EntityLookupIndex`] from a store's persisted canonical entities.
/// Variant forms aren't persisted (only canonicals are), so every canonical resolves only
/// to itself here; the substring-scan tier's document-count ranking is preserved by
/// re-deriving it from [`MetadataStore::frequencies`].
pub async fn lookup_index_from_store(store: &MetadataStore) -> crate::error::Result<EntityLookupIndex> {
    let all = store.all_entities().await?;
    let mut groups = Vec::new();

    for (entity_type, names) in [
        (EntityType::Person, &all.people),
        (EntityType::Org, &all.organizations),
        (EntityType::Loc, &all.locations),
    ] {
        let freq = store.frequencies(entity_type).await?;
        for name in names {
            let doc_count = freq.get(name).copied().unwrap_or(0);
            groups.push(ConsolidationGroup {
                canonical: name.clone(),
                entity_type,
                variants: HashSet::from([name.clone()]),
                doc_ids: (0..doc_count).map(|i| format!("_rank_placeholder_{i}")).collect(),
            });
        }
    }

    Ok(EntityLookupIndex::build(&groups))
}

fn as_extracted(doc: &DocumentMetadata) -> ExtractedMetadata {
    ExtractedMetadata {
        doc_id: doc.doc_id.clone(),
        word_count: doc.word_count,
        people: doc.people.iter().cloned().collect(),
        organizations: doc.organizations.iter().cloned().collect(),
        locations: doc.locations.iter().cloned().collect(),
        dates: doc.dates.clone(),
        emails: doc.emails.clone(),
    }
}
