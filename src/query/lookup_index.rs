use std::collections::{HashMap, HashSet};

use crate::entity::{normalize, ConsolidationGroup, EntityType};

/// Maps a normalized surface form to every `(canonical, type)` pair it can resolve to.
/// Built from the union of all canonical names and their consolidation variants (§3).
/// Immutable after construction; safely shared by reference across queries.
#[derive(Debug, Clone, Default)]
pub struct EntityLookupIndex {
    lookup: HashMap<String, HashSet<(String, EntityType)>>,
    /// Canonical names per type, ordered by descending document count (ties by name),
    /// used by the query extractor's substring tier (§4.8, §9 "substring-scan cost control").
    ranked: HashMap<EntityType, Vec<String>>,
}

impl EntityLookupIndex {
    /// Builds the index from the corpus' consolidation groups.
    pub fn build(groups: &[ConsolidationGroup]) -> Self {
        let mut lookup: HashMap<String, HashSet<(String, EntityType)>> = HashMap::new();
        let mut by_type: HashMap<EntityType, Vec<(String, usize)>> = HashMap::new();

        for g in groups {
            let entry = (g.canonical.clone(), g.entity_type);
            lookup
                .entry(normalize(&g.canonical))
                .or_default()
                .insert(entry.clone());
            for variant in &g.variants {
                lookup
                    .entry(normalize(variant))
                    .or_default()
                    .insert(entry.clone());
            }
            by_type
                .entry(g.entity_type)
                .or_default()
                .push((g.canonical.clone(), g.doc_ids.len()));
        }

        let mut ranked = HashMap::new();
        for (entity_type, mut names) in by_type {
            names.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            ranked.insert(entity_type, names.into_iter().map(|(name, _)| name).collect());
        }

        EntityLookupIndex { lookup, ranked }
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Tier-2 lookup: exact match on a token's normalized form.
    pub fn lookup(&self, normalized_token: &str) -> Option<&HashSet<(String, EntityType)>> {
        self.lookup.get(normalized_token)
    }

    /// Tier-3 substring scan candidates for a type, capped at `cap` entries, most-frequent
    /// first.
    pub fn substring_candidates(&self, entity_type: EntityType, cap: usize) -> &[String] {
        match self.ranked.get(&entity_type) {
            Some(names) => &names[..names.len().min(cap)],
            None => &[],
        }
    }
}
