use thiserror::Error;

/// Main error type for the retrieval engine
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The NER collaborator failed to produce spans for a document
    #[error("NER error: {0}")]
    Ner(String),

    /// Document or metadata parsing errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input from a caller (bad doc_id, out-of-range top_k, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Search-time errors
    #[error("Search error: {0}")]
    Search(String),
}

/// Convenient Result type using RetrievalError
pub type Result<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RetrievalError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: RetrievalError = rusqlite_err.into();
        assert!(matches!(err, RetrievalError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RetrievalError = io_err.into();
        assert!(matches!(err, RetrievalError::Io(_)));
    }
}
