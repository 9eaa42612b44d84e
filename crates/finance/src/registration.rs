use haulbook_core::{BankAccountId, BankTransactionId, DriverId, ExpenseId, LoadId, OwnerId, TruckId};
use haulbook_storage::{
    registry, BankAccountInput, BankTransactionInput, DbConnection, DriverInput, ExpenseInput,
    LoadInput, OwnerInput, TruckInput,
};
use serde::Serialize;
use tracing::info;

use crate::dispatcher_fee::{ensure_dispatcher_fee_expense, FeePosting};
use crate::error::{FinanceError, FinanceResult};

fn require_external_id(kind: &str, external_id: &str) -> FinanceResult<()> {
    if external_id.trim().is_empty() {
        return Err(FinanceError::Validation(format!("{kind} external_id is required")));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadRegistration {
    pub load_id: LoadId,
    pub fee: FeePosting,
}

/// Upserts a load and posts its dispatcher fee.
pub async fn register_load(conn: &mut DbConnection, input: &LoadInput) -> FinanceResult<LoadRegistration> {
    require_external_id("load", &input.external_id)?;
    let load_id = registry::upsert_load(conn, input).await?;
    let fee = ensure_dispatcher_fee_expense(conn, &input.external_id).await?;
    Ok(LoadRegistration { load_id, fee })
}

pub async fn register_owner(conn: &mut DbConnection, input: &OwnerInput) -> FinanceResult<OwnerId> {
    require_external_id("owner", &input.external_id)?;
    let id = registry::upsert_owner(conn, input).await?;
    info!(owner = %input.external_id, id = %id, "owner registered");
    Ok(id)
}

pub async fn register_driver(conn: &mut DbConnection, input: &DriverInput) -> FinanceResult<DriverId> {
    require_external_id("driver", &input.external_id)?;
    let id = registry::upsert_driver(conn, input).await?;
    info!(driver = %input.external_id, id = %id, "driver registered");
    Ok(id)
}

/// The owner must already be registered: trucks always belong to someone.
pub async fn register_truck(conn: &mut DbConnection, input: &TruckInput) -> FinanceResult<TruckId> {
    require_external_id("truck", &input.external_id)?;
    require_external_id("truck owner", &input.owner_external_id)?;
    if registry::find_owner_id(conn, &input.owner_external_id).await?.is_none() {
        return Err(FinanceError::Validation(format!(
            "unknown owner {} for truck {}",
            input.owner_external_id, input.external_id
        )));
    }
    let id = registry::upsert_truck(conn, input).await?;
    info!(truck = %input.external_id, id = %id, "truck registered");
    Ok(id)
}

pub async fn register_bank_account(
    conn: &mut DbConnection,
    input: &BankAccountInput,
) -> FinanceResult<BankAccountId> {
    require_external_id("bank account", &input.external_id)?;
    let id = registry::upsert_bank_account(conn, input).await?;
    info!(account = %input.external_id, id = %id, "bank account registered");
    Ok(id)
}

pub async fn register_bank_transaction(
    conn: &mut DbConnection,
    input: &BankTransactionInput,
) -> FinanceResult<BankTransactionId> {
    require_external_id("transaction", &input.external_id)?;
    let id = registry::upsert_bank_transaction(conn, input).await?;
    info!(transaction = %input.external_id, id = %id, "bank transaction registered");
    Ok(id)
}

/// Manual expenses have no natural key; every call inserts a row.
pub async fn add_expense(conn: &mut DbConnection, input: &ExpenseInput) -> FinanceResult<ExpenseId> {
    let id = registry::insert_expense(conn, input).await?;
    info!(id = %id, amount = %input.amount, "expense added");
    Ok(id)
}
