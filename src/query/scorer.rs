use crate::entity::match_count_with_threshold as match_count;
use crate::entity::match_score_with_threshold as match_score;
use crate::metadata::DocumentMetadata;

use super::QueryEntities;

/// Per-type weights for the metadata boost formula (§4.9). Defaults mirror the spec's
/// `w_p = 2.0, w_l = 1.5, w_o = 1.5, w_d = 1.0`.
#[derive(Debug, Clone, Copy)]
pub struct ScorerWeights {
    pub person: f32,
    pub location: f32,
    pub org: f32,
    pub date: f32,
}

impl Default for ScorerWeights {
    fn default() -> Self {
        ScorerWeights {
            person: 2.0,
            location: 1.5,
            org: 1.5,
            date: 1.0,
        }
    }
}

/// Unnormalized metadata boost: weighted sum of per-type match counts, where each query
/// entity contributes at most 1 toward its type's count (§4.9). Used by the `boost`
/// strategy's `final_score = bm25_score + metadata_boost`.
pub fn boost(query: &QueryEntities, doc: &DocumentMetadata, weights: ScorerWeights, threshold: f64) -> f32 {
    weights.person * match_count(&query.people, &doc.people, threshold) as f32
        + weights.location * match_count(&query.locations, &doc.locations, threshold) as f32
        + weights.org * match_count(&query.organizations, &doc.organizations, threshold) as f32
        + weights.date * match_count(&query.dates, &doc.dates, threshold) as f32
}

/// Normalized boost in `[0, 1]`, exposed for strategies that want a bounded signal:
/// weighted average of per-type match fractions, over types non-empty in the query.
pub fn normalized_boost(
    query: &QueryEntities,
    doc: &DocumentMetadata,
    weights: ScorerWeights,
    threshold: f64,
) -> f32 {
    let mut weight_sum = 0.0f32;
    let mut score_sum = 0.0f32;

    let terms = [
        (!query.people.is_empty(), weights.person, &query.people, &doc.people),
        (
            !query.locations.is_empty(),
            weights.location,
            &query.locations,
            &doc.locations,
        ),
        (
            !query.organizations.is_empty(),
            weights.org,
            &query.organizations,
            &doc.organizations,
        ),
        (!query.dates.is_empty(), weights.date, &query.dates, &doc.dates),
    ];

    for (present, weight, query_set, doc_set) in terms {
        if !present {
            continue;
        }
        weight_sum += weight;
        score_sum += weight * match_score(query_set, doc_set, threshold);
    }

    if weight_sum == 0.0 {
        0.0
    } else {
        score_sum / weight_sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::DEFAULT_THRESHOLD;
    use std::collections::HashSet;

    fn metadata(people: &[&str]) -> DocumentMetadata {
        DocumentMetadata {
            doc_id: "d1".to_string(),
            word_count: 10,
            people: people.iter().map(|s| s.to_string()).collect(),
            organizations: HashSet::new(),
            locations: HashSet::new(),
            dates: HashSet::new(),
            emails: HashSet::new(),
        }
    }

    #[test]
    fn scenario_s5_boost_reranking() {
        let query = QueryEntities {
            people: HashSet::from(["Jeffrey Epstein".to_string(), "Ghislaine Maxwell".to_string()]),
            ..Default::default()
        };
        let doc_with_matches = metadata(&["Jeffrey Epstein", "Ghislaine Maxwell"]);
        let doc_without = metadata(&[]);

        let weights = ScorerWeights::default();
        let boost_with = boost(&query, &doc_with_matches, weights, DEFAULT_THRESHOLD);
        let boost_without = boost(&query, &doc_without, weights, DEFAULT_THRESHOLD);

        assert_eq!(boost_with, 4.0);
        assert_eq!(boost_without, 0.0);

        let final_with = 5.95 + boost_with;
        let final_without = 5.80 + boost_without;
        assert!(final_with > final_without);
    }

    #[test]
    fn normalized_boost_is_bounded() {
        let query = QueryEntities {
            people: HashSet::from(["Jeffrey Epstein".to_string()]),
            ..Default::default()
        };
        let doc = metadata(&["Jeffrey Epstein"]);
        let score = normalized_boost(&query, &doc, ScorerWeights::default(), DEFAULT_THRESHOLD);
        assert!((0.0..=1.0).contains(&score));
        assert_eq!(score, 1.0);
    }

    #[test]
    fn normalized_boost_empty_query_is_zero() {
        let query = QueryEntities::default();
        let doc = metadata(&["Jeffrey Epstein"]);
        let score = normalized_boost(&query, &doc, ScorerWeights::default(), DEFAULT_THRESHOLD);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn normalized_boost_only_considers_nonempty_query_types() {
        let query = QueryEntities {
            people: HashSet::from(["Jeffrey Epstein".to_string()]),
            ..Default::default()
        };
        let doc_without_person = metadata(&[]);
        // Only the `people` weight is in the denominator since locations/orgs/dates are
        // empty in the query, so a full person miss still produces exactly 0.
        let score = normalized_boost(&query, &doc_without_person, ScorerWeights::default(), DEFAULT_THRESHOLD);
        assert_eq!(score, 0.0);
    }
}
