use std::collections::BTreeMap;

use crate::ids::{DriverId, OwnerId};
use crate::ledger::Beneficiary;
use crate::money::Money;

/// One load's contribution to a weekly close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementLoad {
    pub driver_id: Option<DriverId>,
    pub owner_id: Option<OwnerId>,
    pub net: Money,
}

/// Running net totals for one settlement week. Driver and owner totals
/// are independent ledgers: a load with both a driver and an owner adds
/// its net to each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekTotals {
    pub drivers: BTreeMap<DriverId, Money>,
    pub owners: BTreeMap<OwnerId, Money>,
    pub loads: usize,
}

impl WeekTotals {
    pub fn accumulate<I>(loads: I) -> Self
    where
        I: IntoIterator<Item = SettlementLoad>,
    {
        let mut totals = WeekTotals::default();
        for load in loads {
            totals.add(load);
        }
        totals
    }

    pub fn add(&mut self, load: SettlementLoad) {
        if let Some(driver_id) = load.driver_id {
            *self.drivers.entry(driver_id).or_insert_with(Money::zero) += load.net;
        }
        if let Some(owner_id) = load.owner_id {
            *self.owners.entry(owner_id).or_insert_with(Money::zero) += load.net;
        }
        self.loads += 1;
    }

    pub fn driver_total(&self) -> Money {
        self.drivers.values().copied().sum()
    }

    pub fn owner_total(&self) -> Money {
        self.owners.values().copied().sum()
    }

    /// Ledger lines to post, drivers first. Zero totals are skipped.
    pub fn postings(&self) -> Vec<(Beneficiary, Money)> {
        let drivers = self
            .drivers
            .iter()
            .map(|(id, total)| (Beneficiary::Driver(*id), *total));
        let owners = self
            .owners
            .iter()
            .map(|(id, total)| (Beneficiary::Owner(*id), *total));
        drivers.chain(owners).filter(|(_, total)| !total.is_zero()).collect()
    }
}
