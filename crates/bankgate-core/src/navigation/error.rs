use thiserror::Error;

/// Failure to obtain a usable navigation tree.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to fetch navigation from {source_name}: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    #[error("failed to parse navigation document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("sibling nodes share route '{route}'")]
    DuplicateSibling { route: String },

    #[error("node id '{id}' is used more than once")]
    DuplicateId { id: String },
}
