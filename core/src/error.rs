use crate::DocId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed input during build, or a corrupt persisted snapshot.
    #[error("data integrity: {0}")]
    DataIntegrity(String),
    #[error("duplicate document id {0}")]
    DuplicateKey(DocId),
    /// Reference to an unknown document, term or keyword.
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// The persisted index changed underneath a reader.
    #[error("index modified during read: {0}")]
    ConcurrentModification(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("encoding: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("click store: {0}")]
    Storage(#[from] sled::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DataIntegrity,
    DuplicateKey,
    NotFound,
    InvalidQuery,
    ConcurrentModification,
    InvalidConfig,
    Storage,
}

impl SearchError {
    pub fn not_found(what: &'static str, key: impl ToString) -> Self {
        SearchError::NotFound { what, key: key.to_string() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::DataIntegrity(_) => ErrorKind::DataIntegrity,
            SearchError::DuplicateKey(_) => ErrorKind::DuplicateKey,
            SearchError::NotFound { .. } => ErrorKind::NotFound,
            SearchError::InvalidQuery(_) => ErrorKind::InvalidQuery,
            SearchError::ConcurrentModification(_) => ErrorKind::ConcurrentModification,
            SearchError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            SearchError::Io(_) | SearchError::Encoding(_) | SearchError::Json(_) | SearchError::Storage(_) => {
                ErrorKind::Storage
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_ignore_payload() {
        assert_eq!(SearchError::DuplicateKey(7).kind(), ErrorKind::DuplicateKey);
        assert_eq!(SearchError::not_found("keyword", 3).kind(), ErrorKind::NotFound);
        let io = SearchError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.kind(), ErrorKind::Storage);
    }

    #[test]
    fn not_found_message_names_the_key() {
        let e = SearchError::not_found("document", 42);
        assert_eq!(e.to_string(), "document not found: 42");
    }
}
