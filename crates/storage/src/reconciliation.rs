use chrono::NaiveDate;
use haulbook_core::{
    BankAccountId, BankTransaction, BankTransactionId, LoadId, Money, PaymentId,
    ReconciliationId, ReconciliationType, TransactionType,
};
use serde::Serialize;

use crate::db::{decode_error, DbConnection};

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationRecord {
    pub id: ReconciliationId,
    pub bank_transaction_id: BankTransactionId,
    pub reconciliation_type: ReconciliationType,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub bank_transaction_id: BankTransactionId,
    pub total_amount: Money,
    pub load_ids: Vec<LoadId>,
}

#[derive(sqlx::FromRow)]
struct BankTransactionRow {
    id: i64,
    external_id: String,
    account_id: Option<i64>,
    txn_date: NaiveDate,
    description: Option<String>,
    amount_cents: i64,
    transaction_type: String,
    category: Option<String>,
    related_account_id: Option<i64>,
    sheet_owner: Option<String>,
}

impl TryFrom<BankTransactionRow> for BankTransaction {
    type Error = sqlx::Error;

    fn try_from(row: BankTransactionRow) -> Result<Self, Self::Error> {
        let transaction_type: TransactionType =
            row.transaction_type.parse().map_err(decode_error)?;
        Ok(BankTransaction {
            id: BankTransactionId(row.id),
            external_id: row.external_id,
            account_id: row.account_id.map(BankAccountId),
            txn_date: row.txn_date,
            description: row.description,
            amount: Money::from_cents(row.amount_cents),
            transaction_type,
            category: row.category,
            related_account_id: row.related_account_id.map(BankAccountId),
            sheet_owner: row.sheet_owner,
        })
    }
}

pub async fn find_bank_transaction_by_external_id(
    conn: &mut DbConnection,
    external_id: &str,
) -> Result<Option<BankTransaction>, sqlx::Error> {
    let row = sqlx::query_as::<_, BankTransactionRow>(
        "SELECT id, external_id, account_id, txn_date, description, amount_cents, transaction_type, \
         category, related_account_id, sheet_owner FROM bank_transactions WHERE external_id = ?",
    )
    .bind(external_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(BankTransaction::try_from).transpose()
}

pub async fn bank_transaction_amount(
    conn: &mut DbConnection,
    id: BankTransactionId,
) -> Result<Option<Money>, sqlx::Error> {
    let cents: Option<i64> = sqlx::query_scalar("SELECT amount_cents FROM bank_transactions WHERE id = ?")
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(cents.map(Money::from_cents))
}

pub async fn insert_payment(
    conn: &mut DbConnection,
    bank_transaction_id: BankTransactionId,
    total_amount: Money,
) -> Result<PaymentId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO payments (bank_transaction_id, total_amount_cents) VALUES (?, ?) RETURNING id",
    )
    .bind(bank_transaction_id.0)
    .bind(total_amount.to_cents())
    .fetch_one(&mut *conn)
    .await?;
    Ok(PaymentId(id))
}

pub async fn insert_payment_load(
    conn: &mut DbConnection,
    payment_id: PaymentId,
    load_id: LoadId,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO payment_loads (payment_id, load_id) VALUES (?, ?)")
        .bind(payment_id.0)
        .bind(load_id.0)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert_reconciliation(
    conn: &mut DbConnection,
    bank_transaction_id: BankTransactionId,
    reconciliation_type: &ReconciliationType,
    notes: Option<&str>,
) -> Result<ReconciliationId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO bank_reconciliations (bank_transaction_id, reconciliation_type, notes) \
         VALUES (?, ?, ?) RETURNING id",
    )
    .bind(bank_transaction_id.0)
    .bind(reconciliation_type.as_str())
    .bind(notes)
    .fetch_one(&mut *conn)
    .await?;
    Ok(ReconciliationId(id))
}

pub async fn reconciliation_count(
    conn: &mut DbConnection,
    bank_transaction_id: BankTransactionId,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM bank_reconciliations WHERE bank_transaction_id = ?")
        .bind(bank_transaction_id.0)
        .fetch_one(&mut *conn)
        .await
}

/// Oldest first, in insertion order.
pub async fn reconciliation_log(
    conn: &mut DbConnection,
    bank_transaction_id: BankTransactionId,
) -> Result<Vec<ReconciliationRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String, Option<String>, String)>(
        "SELECT id, reconciliation_type, notes, created_at FROM bank_reconciliations \
         WHERE bank_transaction_id = ? ORDER BY id",
    )
    .bind(bank_transaction_id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(ReconciliationRecord {
                id: ReconciliationId(r.0),
                bank_transaction_id,
                reconciliation_type: r.1.parse().map_err(decode_error)?,
                notes: r.2,
                created_at: r.3,
            })
        })
        .collect()
}

pub async fn payments_for_transaction(
    conn: &mut DbConnection,
    bank_transaction_id: BankTransactionId,
) -> Result<Vec<PaymentRecord>, sqlx::Error> {
    let payments = sqlx::query_as::<_, (i64, i64)>(
        "SELECT id, total_amount_cents FROM payments WHERE bank_transaction_id = ? ORDER BY id",
    )
    .bind(bank_transaction_id.0)
    .fetch_all(&mut *conn)
    .await?;

    let mut records = Vec::with_capacity(payments.len());
    for (id, cents) in payments {
        let load_ids: Vec<i64> =
            sqlx::query_scalar("SELECT load_id FROM payment_loads WHERE payment_id = ? ORDER BY load_id")
                .bind(id)
                .fetch_all(&mut *conn)
                .await?;
        records.push(PaymentRecord {
            id: PaymentId(id),
            bank_transaction_id,
            total_amount: Money::from_cents(cents),
            load_ids: load_ids.into_iter().map(LoadId).collect(),
        });
    }
    Ok(records)
}
