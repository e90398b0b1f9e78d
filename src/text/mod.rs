mod normalizer;

pub use normalizer::{normalize_text, tokenize};
