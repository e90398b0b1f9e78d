mod extractor;
mod store;

pub use extractor::{extract, ExtractedMetadata};
pub use store::{AllEntities, FilterCriteria, MetadataStore};

use std::collections::HashSet;

use crate::entity::{consolidate, ConsolidationGroup, EntityType};

/// Final per-document metadata: all entity sets hold only consolidated canonical names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    pub doc_id: String,
    pub word_count: usize,
    pub people: HashSet<String>,
    pub organizations: HashSet<String>,
    pub locations: HashSet<String>,
    pub dates: HashSet<String>,
    pub emails: HashSet<String>,
}

/// Consolidates raw per-document extractions into final canonical `DocumentMetadata`.
///
/// Runs the Consolidation Engine once over the whole corpus' surface forms (grouped by
/// type), then rewrites each document's raw entity strings to their elected canonical.
pub fn consolidate_corpus(extracted: &[ExtractedMetadata]) -> Vec<DocumentMetadata> {
    let mut forms = Vec::new();
    for e in extracted {
        for p in &e.people {
            forms.push(surface_form(p, EntityType::Person, &e.doc_id));
        }
        for o in &e.organizations {
            forms.push(surface_form(o, EntityType::Org, &e.doc_id));
        }
        for l in &e.locations {
            forms.push(surface_form(l, EntityType::Loc, &e.doc_id));
        }
    }

    let groups = consolidate(&forms);
    let canonical_for = build_variant_index(&groups);

    extracted
        .iter()
        .map(|e| DocumentMetadata {
            doc_id: e.doc_id.clone(),
            word_count: e.word_count,
            people: rewrite(&e.people, EntityType::Person, &canonical_for),
            organizations: rewrite(&e.organizations, EntityType::Org, &canonical_for),
            locations: rewrite(&e.locations, EntityType::Loc, &canonical_for),
            dates: e.dates.clone(),
            emails: e.emails.clone(),
        })
        .collect()
}

fn surface_form(text: &str, entity_type: EntityType, doc_id: &str) -> crate::entity::SurfaceForm {
    crate::entity::SurfaceForm {
        text: text.to_string(),
        entity_type,
        doc_ids: HashSet::from([doc_id.to_string()]),
    }
}

type VariantKey = (String, EntityType);

fn build_variant_index(groups: &[ConsolidationGroup]) -> std::collections::HashMap<VariantKey, String> {
    let mut index = std::collections::HashMap::new();
    for g in groups {
        for v in &g.variants {
            index.insert((v.clone(), g.entity_type), g.canonical.clone());
        }
    }
    index
}

fn rewrite(
    raw: &[String],
    entity_type: EntityType,
    canonical_for: &std::collections::HashMap<VariantKey, String>,
) -> HashSet<String> {
    raw.iter()
        .filter_map(|r| canonical_for.get(&(r.clone(), entity_type)).cloned())
        .collect()
}
