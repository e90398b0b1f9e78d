use std::collections::HashSet;

use crate::entity::{match_any_with_threshold, DEFAULT_THRESHOLD};
use crate::error::Result;
use crate::metadata::{DocumentMetadata, FilterCriteria, MetadataStore};
use crate::ner::NerModel;
use crate::query::{boost, extract_query_entities, EntityLookupIndex, QueryEntities, ScorerWeights};

use super::bm25::Bm25Index;

/// Selectable filtering policy for the Enhanced Search Orchestrator (§4.10, §9). A
/// closed, tagged variant rather than a runtime-polymorphic trait object, per the
/// design notes' explicit preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Strict,
    Loose,
    Boost,
    Adaptive,
    None,
}

/// Entity criteria supplied programmatically by a caller, merged with the entities
/// inferred from the query text itself (§4.10 step 2).
#[derive(Debug, Clone, Default)]
pub struct ExplicitFilters {
    pub people: Vec<String>,
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
    /// Lexicographic date range; the store only supports range filtering over dates
    /// (§6), so entities extracted from the query text itself never populate this.
    pub date_range: Option<(String, String)>,
}

/// One ranked result: its BM25 and metadata scores, the query entities that matched it,
/// and a deterministic preview of its raw text (§3).
#[derive(Debug, Clone)]
pub struct RankedResult {
    pub doc_id: String,
    pub bm25_score: f32,
    pub metadata_boost: f32,
    pub final_score: f32,
    pub matched_entities: QueryEntities,
    pub preview: String,
}

/// Outcome of a `search` call: the ranked results plus, for `Adaptive`, the sub-strategy
/// that was actually applied (§4.10 "known open question").
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<RankedResult>,
    pub effective_strategy: Strategy,
}

/// Runs the three tiers (BM25 retrieval, query entity recognition, strategy application)
/// and returns ranked, top-K results. Holds only read-only/immutable collaborators —
/// no per-query mutation of any index (§5).
pub struct SearchOrchestrator<'a> {
    bm25: &'a Bm25Index,
    store: &'a MetadataStore,
    lookup: &'a EntityLookupIndex,
    ner: &'a dyn NerModel,
    weights: ScorerWeights,
    fuzzy_threshold: f64,
    scan_cap: usize,
}

impl<'a> SearchOrchestrator<'a> {
    pub fn new(
        bm25: &'a Bm25Index,
        store: &'a MetadataStore,
        lookup: &'a EntityLookupIndex,
        ner: &'a dyn NerModel,
        weights: ScorerWeights,
        fuzzy_threshold: f64,
        scan_cap: usize,
    ) -> Self {
        SearchOrchestrator {
            bm25,
            store,
            lookup,
            ner,
            weights,
            fuzzy_threshold,
            scan_cap,
        }
    }

    /// §4.10. `min_candidates`/`max_candidates` bound the `adaptive` strategy's fallback
    /// ladder; they are otherwise unused outside `adaptive`.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        strategy: Strategy,
        min_candidates: usize,
        max_candidates: usize,
        explicit_filters: Option<ExplicitFilters>,
    ) -> Result<SearchOutcome> {
        // Step 1: lexical retrieval.
        let bm25_matches = self.bm25.search(query, 500);
        if bm25_matches.is_empty() {
            return Ok(SearchOutcome {
                results: Vec::new(),
                effective_strategy: strategy,
            });
        }

        let candidates: Vec<(String, f32)> = bm25_matches
            .iter()
            .map(|m| (self.bm25.doc_id(m.doc_id_index).to_string(), m.score))
            .collect();

        // Step 2: entity recognition, merged with caller-supplied filters.
        let mut query_entities = extract_query_entities(query, self.lookup, self.ner, self.scan_cap);
        let explicit = explicit_filters.unwrap_or_default();
        query_entities.people.extend(explicit.people.iter().cloned());
        query_entities
            .organizations
            .extend(explicit.organizations.iter().cloned());
        query_entities.locations.extend(explicit.locations.iter().cloned());

        if query_entities.is_empty() && explicit.date_range.is_none() {
            let results = self
                .to_results(candidates.into_iter().take(top_k).collect(), &query_entities, &[])
                .await?;
            return Ok(SearchOutcome {
                results,
                effective_strategy: Strategy::None,
            });
        }

        // Step 3: apply strategy.
        let (kept, metadata_boosts, effective_strategy) = match strategy {
            Strategy::None => (candidates.clone(), Vec::new(), Strategy::None),
            Strategy::Strict => {
                let kept = self
                    .apply_strict(&candidates, &query_entities, explicit.date_range.clone())
                    .await?;
                (kept, Vec::new(), Strategy::Strict)
            }
            Strategy::Loose => {
                let kept = self.apply_loose(&candidates, &query_entities).await?;
                (kept, Vec::new(), Strategy::Loose)
            }
            Strategy::Boost => {
                let (ordered, boosts) = self.apply_boost(&candidates, &query_entities).await?;
                (ordered, boosts, Strategy::Boost)
            }
            Strategy::Adaptive => {
                let strict = self
                    .apply_strict(&candidates, &query_entities, explicit.date_range.clone())
                    .await?;
                if strict.len() >= min_candidates {
                    (strict, Vec::new(), Strategy::Strict)
                } else {
                    let loose = self.apply_loose(&candidates, &query_entities).await?;
                    if loose.len() >= min_candidates {
                        (loose, Vec::new(), Strategy::Loose)
                    } else {
                        let (ordered, boosts) = self.apply_boost(&candidates, &query_entities).await?;
                        (ordered, boosts, Strategy::Boost)
                    }
                }
            }
        };

        let cap = max_candidates.min(kept.len());
        let kept: Vec<(String, f32)> = kept.into_iter().take(cap).collect();
        let metadata_boosts: Vec<f32> = metadata_boosts.into_iter().take(cap).collect();
        let final_candidates: Vec<(String, f32)> = kept.into_iter().take(top_k).collect();
        let final_boosts: Vec<f32> = metadata_boosts.into_iter().take(top_k).collect();
        let results = self.to_results(final_candidates, &query_entities, &final_boosts).await?;

        Ok(SearchOutcome {
            results,
            effective_strategy,
        })
    }

    async fn apply_strict(
        &self,
        candidates: &[(String, f32)],
        query_entities: &QueryEntities,
        date_range: Option<(String, String)>,
    ) -> Result<Vec<(String, f32)>> {
        let ids: Vec<String> = candidates.iter().map(|(id, _)| id.clone()).collect();
        let criteria = FilterCriteria {
            people: query_entities.people.iter().cloned().collect(),
            organizations: query_entities.organizations.iter().cloned().collect(),
            locations: query_entities.locations.iter().cloned().collect(),
            date_range,
        };
        let surviving: HashSet<String> = self
            .store
            .filter_fuzzy(ids, criteria)
            .await?
            .into_iter()
            .collect();

        let mut kept = Vec::new();
        for (id, score) in candidates {
            if !surviving.contains(id) {
                continue;
            }
            if query_entities.dates.is_empty() {
                kept.push((id.clone(), *score));
                continue;
            }
            let metadata = self.store.get(id).await?.unwrap_or_default();
            if match_any_with_threshold(&query_entities.dates, &metadata.dates, self.fuzzy_threshold) {
                kept.push((id.clone(), *score));
            }
        }
        Ok(kept)
    }

    async fn apply_loose(
        &self,
        candidates: &[(String, f32)],
        query_entities: &QueryEntities,
    ) -> Result<Vec<(String, f32)>> {
        let mut kept = Vec::new();
        for (id, score) in candidates {
            let metadata = self.store.get(id).await?.unwrap_or_default();
            let hit = matches_any_type(query_entities, &metadata, self.fuzzy_threshold);
            if hit {
                kept.push((id.clone(), *score));
            }
        }
        Ok(kept)
    }

    async fn apply_boost(
        &self,
        candidates: &[(String, f32)],
        query_entities: &QueryEntities,
    ) -> Result<(Vec<(String, f32)>, Vec<f32>)> {
        let mut scored = Vec::with_capacity(candidates.len());
        for (id, bm25_score) in candidates {
            let metadata = self.store.get(id).await?.unwrap_or_default();
            let metadata_boost = boost(query_entities, &metadata, self.weights, self.fuzzy_threshold);
            let final_score = bm25_score + metadata_boost;
            scored.push((id.clone(), *bm25_score, metadata_boost, final_score));
        }

        // Stable sort: candidates with equal final_score keep their original BM25 order.
        scored.sort_by(|a, b| b.3.partial_cmp(&a.3).unwrap_or(std::cmp::Ordering::Equal));

        let ordered = scored.iter().map(|(id, bm25, _, _)| (id.clone(), *bm25)).collect();
        let boosts = scored.iter().map(|(_, _, b, _)| *b).collect();
        Ok((ordered, boosts))
    }

    async fn to_results(
        &self,
        candidates: Vec<(String, f32)>,
        query_entities: &QueryEntities,
        precomputed_boosts: &[f32],
    ) -> Result<Vec<RankedResult>> {
        let mut results = Vec::with_capacity(candidates.len());
        for (i, (doc_id, bm25_score)) in candidates.into_iter().enumerate() {
            let metadata = self.store.get(&doc_id).await?.unwrap_or_default();
            let metadata_boost = precomputed_boosts.get(i).copied().unwrap_or(0.0);
            let matched_entities = matched_subset(query_entities, &metadata, self.fuzzy_threshold);
            let raw_text = self.store.get_raw_text(&doc_id).await?.unwrap_or_default();
            results.push(RankedResult {
                doc_id,
                bm25_score,
                metadata_boost,
                final_score: bm25_score + metadata_boost,
                matched_entities,
                preview: preview(&raw_text),
            });
        }
        Ok(results)
    }
}

fn matches_any_type(query_entities: &QueryEntities, metadata: &DocumentMetadata, threshold: f64) -> bool {
    (!query_entities.people.is_empty()
        && match_any_with_threshold(&query_entities.people, &metadata.people, threshold))
        || (!query_entities.organizations.is_empty()
            && match_any_with_threshold(&query_entities.organizations, &metadata.organizations, threshold))
        || (!query_entities.locations.is_empty()
            && match_any_with_threshold(&query_entities.locations, &metadata.locations, threshold))
        || (!query_entities.dates.is_empty()
            && match_any_with_threshold(&query_entities.dates, &metadata.dates, threshold))
}

fn matched_subset(query_entities: &QueryEntities, metadata: &DocumentMetadata, threshold: f64) -> QueryEntities {
    QueryEntities {
        people: matched_within(&query_entities.people, &metadata.people, threshold),
        organizations: matched_within(&query_entities.organizations, &metadata.organizations, threshold),
        locations: matched_within(&query_entities.locations, &metadata.locations, threshold),
        dates: matched_within(&query_entities.dates, &metadata.dates, threshold),
    }
}

fn matched_within(query_set: &HashSet<String>, doc_set: &HashSet<String>, threshold: f64) -> HashSet<String> {
    query_set
        .iter()
        .filter(|q| doc_set.iter().any(|d| crate::entity::fuzzy_match_with_threshold(q, d, threshold)))
        .cloned()
        .collect()
}

/// Deterministic preview of a document's raw text: first 200 characters, trimmed, with
/// an ellipsis when truncated (§3).
fn preview(raw_text: &str) -> String {
    let trimmed = raw_text.trim();
    let truncated: String = trimmed.chars().take(200).collect();
    if trimmed.chars().count() > 200 {
        format!("{truncated}...")
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;
    use crate::ner::{EntitySpan, HeuristicNer};
    use tempfile::TempDir;

    async fn new_store() -> (MetadataStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Db::new(dir.path().join("test.db"));
        let migrations_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
        db.with_connection(move |conn| crate::db::migrate::run_migrations(conn, &migrations_dir))
            .await
            .unwrap();
        (MetadataStore::new(db), dir)
    }

    fn doc_meta(doc_id: &str, people: &[&str]) -> DocumentMetadata {
        DocumentMetadata {
            doc_id: doc_id.to_string(),
            word_count: 5,
            people: people.iter().map(|s| s.to_string()).collect(),
            organizations: HashSet::new(),
            locations: HashSet::from(["Paris".to_string()]),
            dates: HashSet::new(),
            emails: HashSet::new(),
        }
    }

    struct NoEntitiesNer;
    impl NerModel for NoEntitiesNer {
        fn extract(&self, _text: &str) -> Vec<EntitySpan> {
            vec![]
        }
    }

    #[tokio::test]
    async fn scenario_s1_no_entities_returns_bm25_order() {
        let (store, _dir) = new_store().await;
        let bm25 = Bm25Index::build(
            vec![
                ("d1".to_string(), "Jeffrey Epstein met with Maxwell in Paris."),
                ("d2".to_string(), "Flight logs show trips to Paris and London."),
                ("d3".to_string(), "Maxwell sent emails about financial transactions."),
            ],
            Default::default(),
        );
        store.put("d1.txt".into(), "t".into(), "h1".into(), doc_meta("d1", &[])).await.unwrap();
        store.put("d2.txt".into(), "t".into(), "h2".into(), doc_meta("d2", &[])).await.unwrap();
        store.put("d3.txt".into(), "t".into(), "h3".into(), doc_meta("d3", &[])).await.unwrap();

        let lookup = EntityLookupIndex::build(&[]);
        let ner = NoEntitiesNer;
        let orchestrator = SearchOrchestrator::new(&bm25, &store, &lookup, &ner, ScorerWeights::default(), DEFAULT_THRESHOLD, 2000);

        let outcome = orchestrator
            .search("Maxwell Paris", 5, Strategy::None, 50, 100, None)
            .await
            .unwrap();
        assert_eq!(outcome.results[0].doc_id, "d1");
        assert_eq!(outcome.effective_strategy, Strategy::None);
    }

    #[tokio::test]
    async fn boost_reranks_by_final_score() {
        let (store, _dir) = new_store().await;
        let bm25 = Bm25Index::build(
            vec![
                ("d1".to_string(), "Paris Paris Paris Paris Paris"),
                ("d2".to_string(), "Paris"),
            ],
            Default::default(),
        );
        store.put("d1.txt".into(), "t".into(), "h1".into(), doc_meta("d1", &[])).await.unwrap();
        store
            .put("d2.txt".into(), "t".into(), "h2".into(), doc_meta("d2", &["Jeffrey Epstein"]))
            .await
            .unwrap();

        let ner = HeuristicNer;
        let lookup = EntityLookupIndex::build(&[]);
        let explicit = ExplicitFilters {
            people: vec!["Jeffrey Epstein".to_string()],
            ..Default::default()
        };
        let orchestrator = SearchOrchestrator::new(&bm25, &store, &lookup, &ner, ScorerWeights::default(), DEFAULT_THRESHOLD, 2000);

        let outcome = orchestrator
            .search("Paris", 5, Strategy::Boost, 50, 100, Some(explicit))
            .await
            .unwrap();
        // d1 has a much higher BM25 score but zero entity matches; d2 should still not
        // necessarily outrank it unless its boost overcomes the gap, but both appear.
        assert_eq!(outcome.results.len(), 2);
        let d2 = outcome.results.iter().find(|r| r.doc_id == "d2").unwrap();
        assert!(d2.metadata_boost > 0.0);
    }

    #[tokio::test]
    async fn missing_metadata_treated_as_empty_sets() {
        let (store, _dir) = new_store().await;
        let bm25 = Bm25Index::build(vec![("d1".to_string(), "Maxwell")], Default::default());
        // No put() call: d1 has no stored metadata at all.
        let lookup = EntityLookupIndex::build(&[]);
        let ner = NoEntitiesNer;
        let explicit = ExplicitFilters {
            people: vec!["Maxwell".to_string()],
            ..Default::default()
        };
        let orchestrator = SearchOrchestrator::new(&bm25, &store, &lookup, &ner, ScorerWeights::default(), DEFAULT_THRESHOLD, 2000);

        let outcome = orchestrator
            .search("Maxwell", 5, Strategy::Strict, 50, 100, Some(explicit))
            .await
            .unwrap();
        assert!(outcome.results.is_empty());
    }
}
