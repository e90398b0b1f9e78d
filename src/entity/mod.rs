mod consolidation;
mod matcher;
mod validator;

pub use consolidation::{consolidate, ConsolidationGroup, SurfaceForm};
pub use matcher::{
    fuzzy_match, fuzzy_match_with_threshold, match_any, match_any_with_threshold, match_count,
    match_count_with_threshold, match_score, match_score_with_threshold, normalize,
    DEFAULT_THRESHOLD,
};
pub use validator::{is_valid, EntityType};
