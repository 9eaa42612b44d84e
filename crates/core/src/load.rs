use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::ids::{DriverId, LoadId, OwnerId, TruckId};
use crate::money::{Money, Percent};
use crate::week::WeekReference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    #[default]
    Open,
    Paid,
}

impl LoadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadStatus::Open => "open",
            LoadStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(LoadStatus::Open),
            "paid" => Ok(LoadStatus::Paid),
            other => Err(DomainError::UnknownLoadStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Load {
    pub id: LoadId,
    pub external_id: String,
    pub driver_id: Option<DriverId>,
    pub truck_id: Option<TruckId>,
    pub load_date: NaiveDate,
    pub description: Option<String>,
    pub amount_gross: Money,
    pub slv_fee_percent: Percent,
    pub recife_fee_percent: Percent,
    pub status: LoadStatus,
    pub week_reference: Option<WeekReference>,
    pub sheet_owner: Option<String>,
}

impl Load {
    pub fn fees(&self) -> LoadFees {
        LoadFees::compute(self.amount_gross, self.slv_fee_percent, self.recife_fee_percent)
    }

    pub fn dispatcher_fee_description(&self) -> String {
        dispatcher_fee_description(&self.external_id)
    }
}

/// Expense description for a load's dispatcher fee. Part of the
/// duplicate-posting key, so the wording must stay fixed.
pub fn dispatcher_fee_description(load_external_id: &str) -> String {
    format!("Dispatcher fee load {load_external_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFees {
    pub gross: Money,
    pub slv_fee: Money,
    pub dispatcher_fee: Money,
    pub net: Money,
}

impl LoadFees {
    /// Both fees are rounded individually, then subtracted from gross.
    pub fn compute(gross: Money, slv_fee_percent: Percent, recife_fee_percent: Percent) -> Self {
        let slv_fee = gross.fee(slv_fee_percent);
        let dispatcher_fee = gross.fee(recife_fee_percent);
        let net = Money::from_decimal((gross - slv_fee - dispatcher_fee).amount());
        LoadFees {
            gross,
            slv_fee,
            dispatcher_fee,
            net,
        }
    }
}

/// Owner link reachable from a load. Loads carry no owner column; the
/// settlement owner is read through the truck every time it is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadOwnership {
    pub truck_owner: Option<OwnerId>,
}

impl LoadOwnership {
    /// The owner of the truck that ran the load. A driver's own owner link
    /// never takes part: a load without a truck has no settlement owner.
    pub fn settlement_owner(self) -> Option<OwnerId> {
        self.truck_owner
    }
}
