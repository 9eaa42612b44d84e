use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid percent: {0}")]
    InvalidPercent(String),
    #[error("Unknown load status: {0}")]
    UnknownLoadStatus(String),
    #[error("Unknown transaction type: {0}")]
    UnknownTransactionType(String),
    #[error("Reconciliation type must not be empty")]
    EmptyReconciliationType,
    #[error("Unknown ledger entry type: {0}")]
    UnknownLedgerEntryType(String),
    #[error("Ledger entry {0} must have exactly one beneficiary")]
    InvalidBeneficiary(i64),
}
