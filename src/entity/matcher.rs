use std::collections::HashSet;

use similar::TextDiff;

const HONORIFICS: &[&str] = &["the", "mr.", "ms.", "mrs.", "dr."];

/// Default fuzzy-match similarity threshold (§4.3). Overridable via the `_with_threshold`
/// variants below, which `config.entities.fuzzy_threshold` is wired through to.
pub const DEFAULT_THRESHOLD: f64 = 0.85;

/// Normalizes a name for fuzzy comparison: lowercase, strip leading honorifics/articles,
/// drop single-letter-plus-period initials, collapse whitespace.
pub fn normalize(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut words: Vec<&str> = lower.split_whitespace().collect();

    while let Some(first) = words.first() {
        if HONORIFICS.contains(first) {
            words.remove(0);
        } else {
            break;
        }
    }

    words.retain(|w| {
        let stripped = w.trim_end_matches('.');
        !(stripped.chars().count() == 1 && w.ends_with('.'))
    });

    words.join(" ")
}

/// Returns `true` if `a` and `b` refer to the same entity under fuzzy comparison.
///
/// Symmetric: `fuzzy_match(a, b) == fuzzy_match(b, a)`.
pub fn fuzzy_match(a: &str, b: &str) -> bool {
    fuzzy_match_with_threshold(a, b, 0.85)
}

/// Same as [`fuzzy_match`] but with an explicit similarity threshold.
pub fn fuzzy_match_with_threshold(a: &str, b: &str, threshold: f64) -> bool {
    let na = normalize(a);
    let nb = normalize(b);

    if na == nb {
        return true;
    }
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    if na.contains(&nb) || nb.contains(&na) {
        return true;
    }

    sequence_ratio(&na, &nb) >= threshold
}

/// Longest-matching-subsequence ratio over character sequences (§4.3), Ratcliff/Obershelp
/// style rather than edit-distance: `2 * matched_chars / (len(a) + len(b))`.
fn sequence_ratio(a: &str, b: &str) -> f64 {
    TextDiff::from_chars(a, b).ratio() as f64
}

/// `true` iff at least one pair across the two sets fuzzily matches.
pub fn match_any(query_set: &HashSet<String>, doc_set: &HashSet<String>) -> bool {
    match_any_with_threshold(query_set, doc_set, DEFAULT_THRESHOLD)
}

/// Same as [`match_any`] but with an explicit similarity threshold.
pub fn match_any_with_threshold(
    query_set: &HashSet<String>,
    doc_set: &HashSet<String>,
    threshold: f64,
) -> bool {
    query_set
        .iter()
        .any(|q| doc_set.iter().any(|d| fuzzy_match_with_threshold(q, d, threshold)))
}

/// Count of `query_set` entries that fuzzily match something in `doc_set`. Each query
/// entity contributes at most 1, matching §4.9's `match_count` used by the boost formula.
pub fn match_count(query_set: &HashSet<String>, doc_set: &HashSet<String>) -> usize {
    match_count_with_threshold(query_set, doc_set, DEFAULT_THRESHOLD)
}

/// Same as [`match_count`] but with an explicit similarity threshold.
pub fn match_count_with_threshold(
    query_set: &HashSet<String>,
    doc_set: &HashSet<String>,
    threshold: f64,
) -> usize {
    query_set
        .iter()
        .filter(|q| doc_set.iter().any(|d| fuzzy_match_with_threshold(q, d, threshold)))
        .count()
}

/// Fraction of `query_set` entries that fuzzily match something in `doc_set`.
///
/// An empty query set produces 0.
pub fn match_score(query_set: &HashSet<String>, doc_set: &HashSet<String>) -> f32 {
    match_score_with_threshold(query_set, doc_set, DEFAULT_THRESHOLD)
}

/// Same as [`match_score`] but with an explicit similarity threshold.
pub fn match_score_with_threshold(
    query_set: &HashSet<String>,
    doc_set: &HashSet<String>,
    threshold: f64,
) -> f32 {
    if query_set.is_empty() {
        return 0.0;
    }
    match_count_with_threshold(query_set, doc_set, threshold) as f32 / query_set.len() as f32
}
