use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::ids::{BankAccountId, BankTransactionId};
use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(TransactionType::Credit),
            "debit" => Ok(TransactionType::Debit),
            other => Err(DomainError::UnknownTransactionType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: BankTransactionId,
    pub external_id: String,
    pub account_id: Option<BankAccountId>,
    pub txn_date: NaiveDate,
    pub description: Option<String>,
    pub amount: Money,
    pub transaction_type: TransactionType,
    pub category: Option<String>,
    pub related_account_id: Option<BankAccountId>,
    pub sheet_owner: Option<String>,
}

/// The outcome recorded against a bank transaction. Only `Loads` moves
/// money state; every other kind is a note in the reconciliation log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReconciliationType {
    Loads,
    Ignore,
    Transfer,
    Other(String),
}

impl ReconciliationType {
    pub fn as_str(&self) -> &str {
        match self {
            ReconciliationType::Loads => "loads",
            ReconciliationType::Ignore => "ignore",
            ReconciliationType::Transfer => "transfer",
            ReconciliationType::Other(label) => label,
        }
    }

    pub fn settles_loads(&self) -> bool {
        matches!(self, ReconciliationType::Loads)
    }
}

impl fmt::Display for ReconciliationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconciliationType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        match label {
            "" => Err(DomainError::EmptyReconciliationType),
            "loads" => Ok(ReconciliationType::Loads),
            "ignore" => Ok(ReconciliationType::Ignore),
            "transfer" => Ok(ReconciliationType::Transfer),
            other => Ok(ReconciliationType::Other(other.to_string())),
        }
    }
}

impl Serialize for ReconciliationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReconciliationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Reconciliation is append-only: once a transaction has a log row it
/// never returns to `Unreconciled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReconciliationState {
    Unreconciled,
    Reconciled { entries: u32 },
}

impl ReconciliationState {
    pub fn from_entry_count(entries: u32) -> Self {
        if entries == 0 {
            ReconciliationState::Unreconciled
        } else {
            ReconciliationState::Reconciled { entries }
        }
    }
}
