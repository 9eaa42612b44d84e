use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::ids::{DriverId, LedgerEntryId, OwnerId};
use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    WeeklyCommission,
}

impl LedgerEntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerEntryType::WeeklyCommission => "weekly_commission",
        }
    }
}

impl fmt::Display for LedgerEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerEntryType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly_commission" => Ok(LedgerEntryType::WeeklyCommission),
            other => Err(DomainError::UnknownLedgerEntryType(other.to_string())),
        }
    }
}

/// Exactly one party per ledger line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Beneficiary {
    Owner(OwnerId),
    Driver(DriverId),
}

impl Beneficiary {
    /// Rebuilds the party from the two nullable ledger columns. `entry_id`
    /// only labels the error.
    pub fn from_columns(
        entry_id: i64,
        owner_id: Option<OwnerId>,
        driver_id: Option<DriverId>,
    ) -> Result<Self, DomainError> {
        match (owner_id, driver_id) {
            (Some(owner), None) => Ok(Beneficiary::Owner(owner)),
            (None, Some(driver)) => Ok(Beneficiary::Driver(driver)),
            _ => Err(DomainError::InvalidBeneficiary(entry_id)),
        }
    }

    pub fn owner_id(self) -> Option<OwnerId> {
        match self {
            Beneficiary::Owner(id) => Some(id),
            Beneficiary::Driver(_) => None,
        }
    }

    pub fn driver_id(self) -> Option<DriverId> {
        match self {
            Beneficiary::Driver(id) => Some(id),
            Beneficiary::Owner(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub beneficiary: Beneficiary,
    pub entry_date: NaiveDate,
    pub entry_type: LedgerEntryType,
    pub amount: Money,
    pub description: String,
}
