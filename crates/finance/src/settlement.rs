use chrono::NaiveDate;
use haulbook_core::{LedgerEntryType, Money, SettlementLoad, WeekReference, WeekTotals};
use haulbook_storage::{ledger, loads, DbConnection, NewLedgerEntry};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::FinanceResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekClosing {
    pub drivers: Money,
    pub owners: Money,
    pub loads: usize,
    pub entries_posted: usize,
}

/// Sums the net of every load tagged with `week` per driver and per
/// settlement owner, then posts one weekly commission per beneficiary.
///
/// Entries already posted for the week are left alone, so closing the
/// same week twice changes nothing. Totals are returned either way.
pub async fn close_week(
    conn: &mut DbConnection,
    week: &WeekReference,
    entry_date: NaiveDate,
) -> FinanceResult<WeekClosing> {
    let records = loads::loads_for_week(conn, week).await?;

    let totals = WeekTotals::accumulate(records.iter().map(|record| SettlementLoad {
        driver_id: record.load.driver_id,
        owner_id: record.settlement_owner(),
        net: record.load.fees().net,
    }));

    let description = week.closing_description();
    let mut entries_posted = 0;
    for (beneficiary, amount) in totals.postings() {
        let entry = NewLedgerEntry {
            beneficiary,
            entry_date,
            entry_type: LedgerEntryType::WeeklyCommission,
            amount,
            description: &description,
            week_reference: Some(week),
        };
        match ledger::insert_ledger_entry(conn, &entry).await? {
            Some(id) => {
                entries_posted += 1;
                debug!(entry = %id, ?beneficiary, %amount, "weekly commission posted");
            }
            None => debug!(?beneficiary, "weekly commission already posted"),
        }
    }

    let closing = WeekClosing {
        drivers: totals.driver_total(),
        owners: totals.owner_total(),
        loads: totals.loads,
        entries_posted,
    };
    info!(
        week = %week,
        loads = closing.loads,
        drivers = %closing.drivers,
        owners = %closing.owners,
        entries_posted,
        "week closed"
    );
    Ok(closing)
}
