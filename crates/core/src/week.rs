use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque settlement bucket label such as `2024-W27`. Compared by exact
/// string equality; nothing here interprets it as a calendar week.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekReference(String);

impl WeekReference {
    pub fn new(label: impl Into<String>) -> Self {
        WeekReference(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ledger description for the weekly close. Doubles as the ledger
    /// idempotency key, so the wording is load-bearing.
    pub fn closing_description(&self) -> String {
        format!("Fechamento semana {}", self.0)
    }
}

impl fmt::Display for WeekReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WeekReference {
    fn from(value: &str) -> Self {
        WeekReference::new(value)
    }
}
