mod extractor;
mod lookup_index;
mod scorer;

pub use extractor::{extract_query_entities, QueryEntities};
pub use lookup_index::EntityLookupIndex;
pub use scorer::{boost, normalized_boost, ScorerWeights};
