use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },
}

impl StoreError {
    /// True when the error is a caller mistake rather than a store failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, StoreError::InvalidInput { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
