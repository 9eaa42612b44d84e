use chrono::NaiveDate;
use haulbook_core::{ExpenseId, Money, OwnerId};
use serde::Serialize;

use crate::db::DbConnection;

pub const DISPATCHER_CATEGORY: &str = "dispatcher";
pub const DISPATCHER_COST_CENTER: &str = "Dispatcher fee";

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseRecord {
    pub id: ExpenseId,
    pub owner_id: Option<OwnerId>,
    pub expense_date: NaiveDate,
    pub amount: Money,
    pub description: Option<String>,
    pub category: Option<String>,
    pub cost_center: Option<String>,
}

/// Inserts a dispatcher-fee expense unless one with the same description,
/// amount and date already exists. Returns `None` when it was a duplicate.
pub async fn insert_dispatcher_fee_expense(
    conn: &mut DbConnection,
    owner_id: Option<OwnerId>,
    expense_date: NaiveDate,
    amount: Money,
    description: &str,
) -> Result<Option<ExpenseId>, sqlx::Error> {
    let id: Option<i64> = sqlx::query_scalar(
        r#"
        INSERT OR IGNORE INTO expenses (
            owner_id,
            truck_id,
            bank_account_id,
            expense_date,
            amount_cents,
            description,
            category,
            cost_center
        )
        VALUES (?, NULL, NULL, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(owner_id.map(|id| id.0))
    .bind(expense_date)
    .bind(amount.to_cents())
    .bind(description)
    .bind(DISPATCHER_CATEGORY)
    .bind(DISPATCHER_COST_CENTER)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id.map(ExpenseId))
}

pub async fn expenses_with_description(
    conn: &mut DbConnection,
    description: &str,
) -> Result<Vec<ExpenseRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, Option<i64>, NaiveDate, i64, Option<String>, Option<String>, Option<String>)>(
        "SELECT id, owner_id, expense_date, amount_cents, description, category, cost_center \
         FROM expenses WHERE description = ? ORDER BY id",
    )
    .bind(description)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| ExpenseRecord {
            id: ExpenseId(r.0),
            owner_id: r.1.map(OwnerId),
            expense_date: r.2,
            amount: Money::from_cents(r.3),
            description: r.4,
            category: r.5,
            cost_center: r.6,
        })
        .collect())
}
