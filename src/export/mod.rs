use std::collections::HashMap;

use crate::entity::EntityType;
use crate::error::Result;
use crate::metadata::{AllEntities, MetadataStore};

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn label_for(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Person => "PERSON",
        EntityType::Org => "ORG",
        EntityType::Loc => "LOC",
    }
}

/// Entity-frequency layout (§6): `Entity Type, Entity, Document Count`, sorted by type
/// then by descending document count.
pub async fn export_entity_frequencies(store: &MetadataStore) -> Result<String> {
    let mut rows = Vec::new();

    for entity_type in [EntityType::Person, EntityType::Org, EntityType::Loc] {
        let frequencies = store.frequencies(entity_type).await?;
        let mut entries: Vec<(String, usize)> = frequencies.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (name, count) in entries {
            rows.push((label_for(entity_type), name, count));
        }
    }

    let mut out = String::from("Entity Type,Entity,Document Count\n");
    for (entity_type, name, count) in rows {
        out.push_str(&format!("{},{},{}\n", entity_type, csv_field(&name), count));
    }
    Ok(out)
}

/// Entity-to-documents layout (§6): `Entity, Document Count, Document IDs`, with
/// semicolon-separated doc IDs inside one quoted field.
pub async fn export_entity_documents(store: &MetadataStore) -> Result<String> {
    let all: AllEntities = store.all_entities().await?;
    let mut out = String::from("Entity,Document Count,Document IDs\n");

    for entity_type in [EntityType::Person, EntityType::Org, EntityType::Loc] {
        let names: Vec<&String> = match entity_type {
            EntityType::Person => all.people.iter().collect(),
            EntityType::Org => all.organizations.iter().collect(),
            EntityType::Loc => all.locations.iter().collect(),
        };
        let mut sorted_names: Vec<&String> = names;
        sorted_names.sort();

        for name in sorted_names {
            let mut ids = store.document_ids_for_entity(name, entity_type).await?;
            ids.sort();
            out.push_str(&format!("{},{},\"{}\"\n", csv_field(name), ids.len(), ids.join(";")));
        }
    }

    Ok(out)
}

/// Co-occurrence matrix layout (§6): a square matrix of entity names on both axes, cell
/// value equal to the number of documents containing both; the diagonal is 0.
pub async fn export_cooccurrence_matrix(store: &MetadataStore, entity_type: EntityType) -> Result<String> {
    let all = store.all_entities().await?;
    let mut names: Vec<String> = match entity_type {
        EntityType::Person => all.people.into_iter().collect(),
        EntityType::Org => all.organizations.into_iter().collect(),
        EntityType::Loc => all.locations.into_iter().collect(),
    };
    names.sort();

    let mut out = String::new();
    out.push(',');
    out.push_str(&names.iter().map(|n| csv_field(n)).collect::<Vec<_>>().join(","));
    out.push('\n');

    for row_name in &names {
        let cooccurrences: HashMap<String, usize> = store
            .cooccurrences(row_name.clone(), entity_type, names.len())
            .await?
            .into_iter()
            .collect();

        let mut cells = Vec::with_capacity(names.len());
        for col_name in &names {
            if col_name == row_name {
                cells.push("0".to_string());
            } else {
                cells.push(cooccurrences.get(col_name).copied().unwrap_or(0).to_string());
            }
        }
        out.push_str(&csv_field(row_name));
        out.push(',');
        out.push_str(&cells.join(","));
        out.push('\n');
    }

    Ok(out)
}
