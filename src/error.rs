use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to database")]
    Connect(#[source] libsql::Error),
    #[error("failed to apply migration {name}")]
    Migration {
        name: String,
        #[source]
        source: libsql::Error,
    },
    #[error("database query failed")]
    Query(#[from] libsql::Error),
    #[error("marker not found: {0}")]
    NotFound(String),
    #[error("store has been shut down")]
    Closed,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
