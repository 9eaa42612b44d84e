//! Read-only rollups. Nothing here writes.

use haulbook_core::{Beneficiary, LedgerEntry, Money};
use haulbook_storage::{
    loads, registry, summary, DashboardLoad, DashboardTransaction, DbConnection, LoadRecord,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{FinanceError, FinanceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_credit: Money,
    pub total_debit: Money,
    pub total_expenses: Money,
    pub balance: Money,
    pub pending_loads: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OpenLoadsSummary {
    pub open_count: usize,
    pub gross_total: Money,
    pub slv_fee_total: Money,
    pub recife_fee_total: Money,
    pub net_total: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PayablesReceivables {
    pub receivable: Money,
    pub payable: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_credit: Money,
    pub total_debit: Money,
    pub transaction_count: i64,
    pub reconciled_count: i64,
    pub pending_loads: i64,
    pub transactions: Vec<DashboardTransaction>,
    pub open_loads: Vec<DashboardLoad>,
}

/// Scope for party-filtered reads, given as external ids. The owner wins
/// when both are set; blank ids count as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyFilter<'a> {
    All,
    Owner(&'a str),
    Driver(&'a str),
}

impl<'a> PartyFilter<'a> {
    pub fn new(owner: Option<&'a str>, driver: Option<&'a str>) -> Self {
        let owner = owner.filter(|id| !id.trim().is_empty());
        let driver = driver.filter(|id| !id.trim().is_empty());
        match (owner, driver) {
            (Some(owner), _) => PartyFilter::Owner(owner),
            (None, Some(driver)) => PartyFilter::Driver(driver),
            (None, None) => PartyFilter::All,
        }
    }
}

#[derive(Clone, Copy)]
enum Scope {
    All,
    Party(Beneficiary),
    Unknown,
}

async fn resolve(conn: &mut DbConnection, filter: PartyFilter<'_>) -> Result<Scope, sqlx::Error> {
    let beneficiary = match filter {
        PartyFilter::All => return Ok(Scope::All),
        PartyFilter::Owner(id) => registry::find_owner_id(conn, id).await?.map(Beneficiary::Owner),
        PartyFilter::Driver(id) => registry::find_driver_id(conn, id).await?.map(Beneficiary::Driver),
    };
    Ok(beneficiary.map_or(Scope::Unknown, Scope::Party))
}

fn in_scope(record: &LoadRecord, party: Beneficiary) -> bool {
    match party {
        Beneficiary::Owner(owner) => record.settlement_owner() == Some(owner),
        Beneficiary::Driver(driver) => record.load.driver_id == Some(driver),
    }
}

pub async fn build_summary(conn: &mut DbConnection) -> FinanceResult<Summary> {
    let bank = summary::bank_totals(conn).await?;
    let total_expenses = summary::expense_total(conn).await?;
    let pending_loads = summary::pending_load_count(conn).await?;
    Ok(Summary {
        total_credit: bank.total_credit,
        total_debit: bank.total_debit,
        total_expenses,
        balance: bank.total_credit - bank.total_debit - total_expenses,
        pending_loads,
    })
}

/// Ledger lines for one owner or driver, newest first.
pub async fn get_ledger(
    conn: &mut DbConnection,
    filter: PartyFilter<'_>,
    limit: u32,
) -> FinanceResult<Vec<LedgerEntry>> {
    if limit == 0 {
        return Err(FinanceError::Validation("limit must be at least 1".into()));
    }
    match resolve(conn, filter).await? {
        Scope::All => Err(FinanceError::Validation(
            "ledger requires an owner_id or a driver_id".into(),
        )),
        Scope::Unknown => Ok(Vec::new()),
        Scope::Party(party) => Ok(haulbook_storage::ledger::ledger_entries_for(conn, party, limit).await?),
    }
}

/// Totals over loads not yet paid. Each fee column is summed unrounded and
/// rounded once; net is gross less the two rounded fee totals.
pub async fn get_open_loads_summary(
    conn: &mut DbConnection,
    filter: PartyFilter<'_>,
) -> FinanceResult<OpenLoadsSummary> {
    let scope = resolve(conn, filter).await?;
    if matches!(scope, Scope::Unknown) {
        return Ok(OpenLoadsSummary::default());
    }

    let records = loads::open_loads(conn).await?;
    let mut open_count = 0;
    let mut gross_total = Money::zero();
    let mut slv_exact = Decimal::ZERO;
    let mut recife_exact = Decimal::ZERO;
    for record in records.iter().filter(|r| match scope {
        Scope::Party(party) => in_scope(r, party),
        _ => true,
    }) {
        let load = &record.load;
        open_count += 1;
        gross_total += load.amount_gross;
        slv_exact += load.amount_gross.fee_exact(load.slv_fee_percent);
        recife_exact += load.amount_gross.fee_exact(load.recife_fee_percent);
    }

    let slv_fee_total = Money::from_decimal(slv_exact);
    let recife_fee_total = Money::from_decimal(recife_exact);
    Ok(OpenLoadsSummary {
        open_count,
        gross_total: Money::from_decimal(gross_total.amount()),
        slv_fee_total,
        recife_fee_total,
        net_total: Money::from_decimal((gross_total - slv_fee_total - recife_fee_total).amount()),
    })
}

pub async fn get_payables_receivables(
    conn: &mut DbConnection,
    filter: PartyFilter<'_>,
) -> FinanceResult<PayablesReceivables> {
    let open = get_open_loads_summary(conn, filter).await?;
    Ok(PayablesReceivables {
        receivable: open.net_total,
        payable: open.recife_fee_total,
    })
}

pub async fn dashboard(conn: &mut DbConnection) -> FinanceResult<Dashboard> {
    let bank = summary::bank_totals(conn).await?;
    Ok(Dashboard {
        total_credit: bank.total_credit,
        total_debit: bank.total_debit,
        transaction_count: bank.transaction_count,
        reconciled_count: summary::reconciled_transaction_count(conn).await?,
        pending_loads: summary::pending_load_count(conn).await?,
        transactions: summary::dashboard_transactions(conn).await?,
        open_loads: summary::dashboard_open_loads(conn).await?,
    })
}
