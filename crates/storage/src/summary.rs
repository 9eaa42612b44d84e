use chrono::NaiveDate;
use haulbook_core::{BankTransactionId, LoadId, Money, PaymentId};
use serde::Serialize;

use crate::db::DbConnection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BankTotals {
    pub total_credit: Money,
    pub total_debit: Money,
    pub transaction_count: i64,
}

pub async fn bank_totals(conn: &mut DbConnection) -> Result<BankTotals, sqlx::Error> {
    let (credit, debit, count): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN transaction_type = 'credit' THEN amount_cents ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN transaction_type = 'debit' THEN amount_cents ELSE 0 END), 0),
            COUNT(*)
        FROM bank_transactions
        "#,
    )
    .fetch_one(&mut *conn)
    .await?;

    Ok(BankTotals {
        total_credit: Money::from_cents(credit),
        total_debit: Money::from_cents(debit),
        transaction_count: count,
    })
}

pub async fn expense_total(conn: &mut DbConnection) -> Result<Money, sqlx::Error> {
    let cents: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(amount_cents), 0) FROM expenses")
        .fetch_one(&mut *conn)
        .await?;
    Ok(Money::from_cents(cents))
}

pub async fn pending_load_count(conn: &mut DbConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM loads WHERE status != 'paid'")
        .fetch_one(&mut *conn)
        .await
}

/// Transactions with at least one payment or reconciliation row.
pub async fn reconciled_transaction_count(conn: &mut DbConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM bank_transactions bt
        WHERE EXISTS (SELECT 1 FROM payments p WHERE p.bank_transaction_id = bt.id)
           OR EXISTS (SELECT 1 FROM bank_reconciliations br WHERE br.bank_transaction_id = bt.id)
        "#,
    )
    .fetch_one(&mut *conn)
    .await
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardTransaction {
    pub id: BankTransactionId,
    pub external_id: String,
    pub txn_date: NaiveDate,
    pub description: Option<String>,
    pub amount: Money,
    pub transaction_type: String,
    pub account_label: Option<String>,
    pub latest_payment_id: Option<PaymentId>,
    pub latest_reconciliation_type: Option<String>,
    pub latest_notes: Option<String>,
}

/// One row per transaction, newest first, with the latest payment and
/// reconciliation attached.
pub async fn dashboard_transactions(conn: &mut DbConnection) -> Result<Vec<DashboardTransaction>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String, NaiveDate, Option<String>, i64, String, Option<String>, Option<i64>, Option<String>, Option<String>)>(
        r#"
        SELECT
            bt.id,
            bt.external_id,
            bt.txn_date,
            bt.description,
            bt.amount_cents,
            bt.transaction_type,
            ba.label,
            (SELECT MAX(p.id) FROM payments p WHERE p.bank_transaction_id = bt.id),
            br.reconciliation_type,
            br.notes
        FROM bank_transactions bt
        LEFT JOIN bank_accounts ba ON ba.id = bt.account_id
        LEFT JOIN bank_reconciliations br ON br.id = (
            SELECT MAX(id) FROM bank_reconciliations WHERE bank_transaction_id = bt.id
        )
        ORDER BY bt.txn_date DESC, bt.id DESC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| DashboardTransaction {
            id: BankTransactionId(r.0),
            external_id: r.1,
            txn_date: r.2,
            description: r.3,
            amount: Money::from_cents(r.4),
            transaction_type: r.5,
            account_label: r.6,
            latest_payment_id: r.7.map(PaymentId),
            latest_reconciliation_type: r.8,
            latest_notes: r.9,
        })
        .collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardLoad {
    pub id: LoadId,
    pub external_id: String,
    pub load_date: NaiveDate,
    pub description: Option<String>,
    pub amount_gross: Money,
    pub week_reference: Option<String>,
    pub driver_name: Option<String>,
    pub truck_plate: Option<String>,
}

pub async fn dashboard_open_loads(conn: &mut DbConnection) -> Result<Vec<DashboardLoad>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String, NaiveDate, Option<String>, i64, Option<String>, Option<String>, Option<String>)>(
        r#"
        SELECT l.id, l.external_id, l.load_date, l.description, l.amount_gross_cents,
               l.week_reference, d.name, t.plate
        FROM loads l
        LEFT JOIN drivers d ON d.id = l.driver_id
        LEFT JOIN trucks t ON t.id = l.truck_id
        WHERE l.status != 'paid'
        ORDER BY l.load_date DESC, l.id DESC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| DashboardLoad {
            id: LoadId(r.0),
            external_id: r.1,
            load_date: r.2,
            description: r.3,
            amount_gross: Money::from_cents(r.4),
            week_reference: r.5,
            driver_name: r.6,
            truck_plate: r.7,
        })
        .collect())
}
