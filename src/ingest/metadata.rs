use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Result, RetrievalError};

/// Computes the SHA256 hash of a file's raw bytes, used to detect modified files during
/// incremental re-indexing (§6).
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let content = std::fs::read(path).map_err(RetrievalError::Io)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Derives a document's stable `doc_id`: the SHA256 hash of its corpus-relative path
/// (§3). Stable across re-indexing and never reused, even if the document is deleted.
pub fn doc_id_for(relative_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(relative_path.as_bytes());
    format!("{:x}", hasher.finalize())
}
