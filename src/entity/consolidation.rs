use std::collections::{HashMap, HashSet};

use super::validator::EntityType;

/// A surface form observed in the corpus, together with the documents it appeared in.
#[derive(Debug, Clone)]
pub struct SurfaceForm {
    pub text: String,
    pub entity_type: EntityType,
    pub doc_ids: HashSet<String>,
}

/// The result of consolidating a set of surface-form variants into one canonical entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationGroup {
    pub canonical: String,
    pub entity_type: EntityType,
    pub variants: HashSet<String>,
    pub doc_ids: HashSet<String>,
}

fn alias_map() -> &'static HashMap<&'static str, &'static str> {
    use std::sync::OnceLock;
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("u.s.", "United States"),
            ("us", "United States"),
            ("usa", "United States"),
            ("america", "United States"),
            ("united states", "United States"),
            ("u.k.", "United Kingdom"),
            ("uk", "United Kingdom"),
            ("united kingdom", "United Kingdom"),
        ])
    })
}

/// Normalization used for grouping, distinct from the fuzzy-matcher's normalize:
/// lowercase, dots removed, leading "the" stripped, trailing possessive stripped.
fn grouping_key(name: &str) -> String {
    let lower = name.to_lowercase();
    let no_dots: String = lower.chars().filter(|&c| c != '.').collect();
    let mut trimmed = no_dots.trim();
    if let Some(rest) = trimmed.strip_prefix("the ") {
        trimmed = rest;
    }
    let trimmed = trimmed.trim_end_matches("'s");
    trimmed.trim().to_string()
}

/// Groups surface forms per entity type and elects one canonical name per group.
///
/// Deterministic given the same inputs and the predefined alias map.
pub fn consolidate(forms: &[SurfaceForm]) -> Vec<ConsolidationGroup> {
    let mut by_type: HashMap<EntityType, Vec<&SurfaceForm>> = HashMap::new();
    for f in forms {
        by_type.entry(f.entity_type).or_default().push(f);
    }

    let mut groups = Vec::new();
    for (entity_type, members) in by_type {
        groups.extend(consolidate_one_type(entity_type, &members));
    }
    groups
}

fn consolidate_one_type(entity_type: EntityType, members: &[&SurfaceForm]) -> Vec<ConsolidationGroup> {
    let aliases = alias_map();

    // Map each surface form to the key its group is bucketed under: the alias target's
    // grouping key when present, else its own grouping key.
    let mut buckets: HashMap<String, Vec<&SurfaceForm>> = HashMap::new();
    for m in members {
        let key = grouping_key(&m.text);
        let bucket_key = match aliases.get(key.as_str()) {
            Some(target) => grouping_key(target),
            None => key,
        };
        buckets.entry(bucket_key).or_default().push(m);
    }

    let mut result = Vec::new();
    for (_bucket_key, variants) in buckets {
        let canonical = elect_canonical(&variants, aliases);

        let mut doc_ids: HashSet<String> = HashSet::new();
        let mut variant_texts: HashSet<String> = HashSet::new();
        for v in &variants {
            doc_ids.extend(v.doc_ids.iter().cloned());
            variant_texts.insert(v.text.clone());
        }

        result.push(ConsolidationGroup {
            canonical,
            entity_type,
            variants: variant_texts,
            doc_ids,
        });
    }

    result.sort_by(|a, b| a.canonical.cmp(&b.canonical));
    result
}

fn elect_canonical(
    variants: &[&SurfaceForm],
    aliases: &HashMap<&'static str, &'static str>,
) -> String {
    for v in variants {
        if let Some(target) = aliases.get(grouping_key(&v.text).as_str()) {
            return target.to_string();
        }
    }

    let mut best: Option<&SurfaceForm> = None;
    for v in variants {
        best = Some(match best {
            None => v,
            Some(cur) => {
                let v_len = v.text.chars().count();
                let cur_len = cur.text.chars().count();
                if v_len != cur_len {
                    if v_len > cur_len {
                        v
                    } else {
                        cur
                    }
                } else if v.doc_ids.len() != cur.doc_ids.len() {
                    if v.doc_ids.len() > cur.doc_ids.len() {
                        v
                    } else {
                        cur
                    }
                } else if v.text < cur.text {
                    v
                } else {
                    cur
                }
            }
        });
    }

    best.map(|v| v.text.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(text: &str, entity_type: EntityType, doc_ids: &[&str]) -> SurfaceForm {
        SurfaceForm {
            text: text.to_string(),
            entity_type,
            doc_ids: doc_ids.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn groups_exact_normalized_matches() {
        let forms = vec![
            form("Jeffrey Epstein", EntityType::Person, &["d1"]),
            form("jeffrey epstein", EntityType::Person, &["d2"]),
        ];
        let groups = consolidate(&forms);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].doc_ids.len(), 2);
    }

    #[test]
    fn scenario_s3_consolidation_via_alias_map() {
        // Variant doc sets of sizes {10, 5, 20, 3} (38 total) that overlap so their union
        // is exactly 30 distinct docs: "US" is a subset of "U.S."'s docs, and "America"'s
        // docs are a subset of "United States"'s docs.
        let forms = vec![
            form(
                "U.S.",
                EntityType::Loc,
                &["d1", "d2", "d3", "d4", "d5", "d6", "d7", "d8", "d9", "d10"],
            ),
            form("US", EntityType::Loc, &["d6", "d7", "d8", "d9", "d10"]),
            form(
                "United States",
                EntityType::Loc,
                &[
                    "d11", "d12", "d13", "d14", "d15", "d16", "d17", "d18", "d19", "d20", "d21",
                    "d22", "d23", "d24", "d25", "d26", "d27", "d28", "d29", "d30",
                ],
            ),
            form("America", EntityType::Loc, &["d28", "d29", "d30"]),
        ];
        let groups = consolidate(&forms);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].canonical, "United States");
        assert_eq!(groups[0].doc_ids.len(), 30);
    }

    #[test]
    fn scenario_s3_union_not_sum_with_overlap() {
        let forms = vec![
            form("U.S.", EntityType::Loc, &["d1", "d2"]),
            form("US", EntityType::Loc, &["d1", "d3"]),
        ];
        let groups = consolidate(&forms);
        assert_eq!(groups.len(), 1);
        // d1 counted once despite appearing in both variants' doc sets.
        assert_eq!(groups[0].doc_ids.len(), 3);
    }

    #[test]
    fn picks_longest_form_absent_alias() {
        let forms = vec![
            form("Maxwell", EntityType::Person, &["d1"]),
            form("Ghislaine Maxwell", EntityType::Person, &["d2"]),
        ];
        let groups = consolidate(&forms);
        // "Maxwell" and "Ghislaine Maxwell" do not normalize equal and have no alias
        // entry, so they form two separate groups.
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn each_surface_form_maps_to_exactly_one_canonical() {
        let forms = vec![
            form("U.S.", EntityType::Loc, &["d1"]),
            form("Paris", EntityType::Loc, &["d2"]),
        ];
        let groups = consolidate(&forms);
        let mut seen = HashSet::new();
        for g in &groups {
            for v in &g.variants {
                assert!(seen.insert(v.clone()), "variant {} appeared in two groups", v);
            }
        }
    }

    #[test]
    fn strips_leading_the_and_possessive_for_grouping() {
        let forms = vec![
            form("The Epstein Estate", EntityType::Org, &["d1"]),
            form("Epstein Estate's", EntityType::Org, &["d2"]),
        ];
        let groups = consolidate(&forms);
        assert_eq!(groups.len(), 1);
    }
}
