use std::collections::HashSet;

use crate::entity::{is_valid, normalize, EntityType};
use crate::ner::NerModel;

use super::EntityLookupIndex;

/// Typed entities inferred from a free-form query (§3). Union across all three
/// extraction tiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryEntities {
    pub people: HashSet<String>,
    pub organizations: HashSet<String>,
    pub locations: HashSet<String>,
    pub dates: HashSet<String>,
}

impl QueryEntities {
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
            && self.organizations.is_empty()
            && self.locations.is_empty()
            && self.dates.is_empty()
    }

    /// Unions `other`'s sets into `self` in place.
    pub fn merge(&mut self, other: &QueryEntities) {
        self.people.extend(other.people.iter().cloned());
        self.organizations.extend(other.organizations.iter().cloned());
        self.locations.extend(other.locations.iter().cloned());
        self.dates.extend(other.dates.iter().cloned());
    }

    fn insert(&mut self, entity_type: EntityType, name: String) {
        match entity_type {
            EntityType::Person => {
                self.people.insert(name);
            }
            EntityType::Org => {
                self.organizations.insert(name);
            }
            EntityType::Loc => {
                self.locations.insert(name);
            }
        }
    }

    fn contains(&self, entity_type: EntityType, name: &str) -> bool {
        match entity_type {
            EntityType::Person => self.people.contains(name),
            EntityType::Org => self.organizations.contains(name),
            EntityType::Loc => self.locations.contains(name),
        }
    }
}

const STOP_WORDS: &[&str] = &[
    "the",
    "and",
    "for",
    "with",
    "in",
    "on",
    "at",
    "to",
    "from",
    "by",
    "about",
    "investigation",
    "case",
    "documents",
    "files",
];

const SCAN_TYPES: [EntityType; 3] = [EntityType::Person, EntityType::Org, EntityType::Loc];

/// Runs the three-tier query entity extraction (§4.8): NER, lookup-index, substring scan.
/// Results from all tiers are unioned per type.
///
/// `scan_cap` bounds the tier-3 substring scan to the most-frequent `scan_cap` canonicals
/// per type (§9).
pub fn extract_query_entities(
    query: &str,
    lookup: &EntityLookupIndex,
    ner: &dyn NerModel,
    scan_cap: usize,
) -> QueryEntities {
    let mut result = QueryEntities::default();

    for span in ner.extract(query) {
        if is_valid(&span.text, span.entity_type) {
            result.insert(span.entity_type, span.text);
        }
    }

    let candidate_tokens: Vec<&str> = query
        .split_whitespace()
        .map(|tok| tok.trim_matches(|c: char| !c.is_alphanumeric() && c != '_'))
        .filter(|tok| !tok.is_empty())
        .filter(|tok| tok.chars().count() >= 3)
        .filter(|tok| !STOP_WORDS.contains(&tok.to_lowercase().as_str()))
        .collect();

    let mut unresolved: Vec<&str> = Vec::new();
    for token in &candidate_tokens {
        let normalized = normalize(token);
        match lookup.lookup(&normalized) {
            Some(hits) => {
                for (canonical, entity_type) in hits {
                    result.insert(*entity_type, canonical.clone());
                }
            }
            None => unresolved.push(token),
        }
    }

    for token in &unresolved {
        if token.chars().count() < 4 {
            continue;
        }
        let lower_token = token.to_lowercase();
        'token: for entity_type in SCAN_TYPES {
            for canonical in lookup.substring_candidates(entity_type, scan_cap) {
                if result.contains(entity_type, canonical) {
                    continue;
                }
                if canonical.to_lowercase().contains(&lower_token) {
                    result.insert(entity_type, canonical.clone());
                    break 'token;
                }
            }
        }
    }

    result
}
