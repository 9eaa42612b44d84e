use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinanceError {
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type FinanceResult<T> = Result<T, FinanceError>;
