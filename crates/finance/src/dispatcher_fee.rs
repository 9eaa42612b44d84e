use haulbook_core::{ExpenseId, Money};
use haulbook_storage::{expenses, loads, DbConnection};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::FinanceResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeePosting {
    Posted { expense_id: ExpenseId, amount: Money },
    AlreadyPosted { amount: Money },
    NoFee,
    LoadNotFound,
}

/// Posts the dispatcher fee for a load as an expense against its
/// settlement owner, at most once per (description, amount, date).
///
/// A missing load is not an error: imports may reference loads that are
/// registered later. If a load's gross or date is edited after its fee
/// was posted, the recomputed fee is posted as a second expense.
pub async fn ensure_dispatcher_fee_expense(
    conn: &mut DbConnection,
    load_external_id: &str,
) -> FinanceResult<FeePosting> {
    if load_external_id.is_empty() {
        return Ok(FeePosting::LoadNotFound);
    }

    let Some(record) = loads::find_load_by_external_id(conn, load_external_id).await? else {
        debug!(load = load_external_id, "dispatcher fee skipped: load not found");
        return Ok(FeePosting::LoadNotFound);
    };

    let load = &record.load;
    if !load.recife_fee_percent.is_positive() {
        debug!(load = load_external_id, "dispatcher fee skipped: no fee percent");
        return Ok(FeePosting::NoFee);
    }

    let amount = load.amount_gross.fee(load.recife_fee_percent);
    let description = load.dispatcher_fee_description();

    let inserted = expenses::insert_dispatcher_fee_expense(
        conn,
        record.settlement_owner(),
        load.load_date,
        amount,
        &description,
    )
    .await?;

    Ok(match inserted {
        Some(expense_id) => {
            info!(load = load_external_id, %amount, expense = %expense_id, "dispatcher fee posted");
            FeePosting::Posted { expense_id, amount }
        }
        None => {
            debug!(load = load_external_id, %amount, "dispatcher fee already posted");
            FeePosting::AlreadyPosted { amount }
        }
    })
}
