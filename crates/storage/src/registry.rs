//! Upserts keyed by external id. References to other entities are passed
//! as external ids and resolved in SQL; an unknown reference stores NULL.

use chrono::NaiveDate;
use haulbook_core::{
    BankAccountId, BankTransactionId, DriverId, ExpenseId, LoadId, Money, OwnerId, Percent,
    TransactionType, TruckId, WeekReference,
};
use serde::Deserialize;

use crate::db::DbConnection;

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerInput {
    pub external_id: String,
    pub name: String,
    pub notification_chat_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriverInput {
    pub external_id: String,
    pub name: String,
    pub owner_external_id: Option<String>,
    #[serde(default)]
    pub is_owner_driver: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TruckInput {
    pub external_id: String,
    pub owner_external_id: String,
    pub plate: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankAccountInput {
    pub external_id: String,
    pub label: String,
    pub owner_external_id: Option<String>,
    pub driver_external_id: Option<String>,
}

/// Load registration. There is no status field: new loads start open and
/// re-registering a load never changes its status.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadInput {
    pub external_id: String,
    pub driver_external_id: Option<String>,
    pub truck_external_id: Option<String>,
    pub load_date: NaiveDate,
    pub description: Option<String>,
    pub amount_gross: Money,
    pub slv_fee_percent: Option<Percent>,
    pub recife_fee_percent: Option<Percent>,
    pub week_reference: Option<WeekReference>,
    pub sheet_owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankTransactionInput {
    pub external_id: String,
    pub account_external_id: Option<String>,
    pub txn_date: NaiveDate,
    pub description: Option<String>,
    pub amount: Money,
    pub transaction_type: Option<TransactionType>,
    pub category: Option<String>,
    pub related_account_external_id: Option<String>,
    pub sheet_owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseInput {
    pub owner_external_id: Option<String>,
    pub truck_external_id: Option<String>,
    pub bank_account_external_id: Option<String>,
    pub expense_date: NaiveDate,
    pub amount: Money,
    pub description: Option<String>,
    pub category: Option<String>,
    pub cost_center: Option<String>,
}

pub async fn upsert_owner(conn: &mut DbConnection, input: &OwnerInput) -> Result<OwnerId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO owners (external_id, name, notification_chat_id)
        VALUES (?, ?, ?)
        ON CONFLICT(external_id) DO UPDATE SET
            name = excluded.name,
            notification_chat_id = excluded.notification_chat_id
        RETURNING id
        "#,
    )
    .bind(&input.external_id)
    .bind(&input.name)
    .bind(&input.notification_chat_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(OwnerId(id))
}

pub async fn upsert_driver(conn: &mut DbConnection, input: &DriverInput) -> Result<DriverId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO drivers (external_id, name, owner_id, is_owner_driver)
        VALUES (?, ?, (SELECT id FROM owners WHERE external_id = ?), ?)
        ON CONFLICT(external_id) DO UPDATE SET
            name = excluded.name,
            owner_id = excluded.owner_id,
            is_owner_driver = excluded.is_owner_driver
        RETURNING id
        "#,
    )
    .bind(&input.external_id)
    .bind(&input.name)
    .bind(&input.owner_external_id)
    .bind(input.is_owner_driver)
    .fetch_one(&mut *conn)
    .await?;
    Ok(DriverId(id))
}

/// Fails when the owner external id is unknown: trucks always have an owner.
pub async fn upsert_truck(conn: &mut DbConnection, input: &TruckInput) -> Result<TruckId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO trucks (external_id, owner_id, plate)
        VALUES (?, (SELECT id FROM owners WHERE external_id = ?), ?)
        ON CONFLICT(external_id) DO UPDATE SET
            owner_id = excluded.owner_id,
            plate = excluded.plate
        RETURNING id
        "#,
    )
    .bind(&input.external_id)
    .bind(&input.owner_external_id)
    .bind(&input.plate)
    .fetch_one(&mut *conn)
    .await?;
    Ok(TruckId(id))
}

pub async fn upsert_bank_account(
    conn: &mut DbConnection,
    input: &BankAccountInput,
) -> Result<BankAccountId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO bank_accounts (external_id, label, owner_id, driver_id)
        VALUES (
            ?,
            ?,
            (SELECT id FROM owners WHERE external_id = ?),
            (SELECT id FROM drivers WHERE external_id = ?)
        )
        ON CONFLICT(external_id) DO UPDATE SET
            label = excluded.label,
            owner_id = excluded.owner_id,
            driver_id = excluded.driver_id
        RETURNING id
        "#,
    )
    .bind(&input.external_id)
    .bind(&input.label)
    .bind(&input.owner_external_id)
    .bind(&input.driver_external_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(BankAccountId(id))
}

pub async fn upsert_load(conn: &mut DbConnection, input: &LoadInput) -> Result<LoadId, sqlx::Error> {
    let slv = input.slv_fee_percent.unwrap_or(Percent::ZERO);
    let recife = input.recife_fee_percent.unwrap_or(Percent::DEFAULT_DISPATCHER);

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO loads (
            external_id,
            driver_id,
            truck_id,
            load_date,
            description,
            amount_gross_cents,
            slv_fee_percent,
            recife_fee_percent,
            week_reference,
            sheet_owner
        )
        VALUES (
            ?,
            (SELECT id FROM drivers WHERE external_id = ?),
            (SELECT id FROM trucks WHERE external_id = ?),
            ?, ?, ?, ?, ?, ?, ?
        )
        ON CONFLICT(external_id) DO UPDATE SET
            driver_id = excluded.driver_id,
            truck_id = excluded.truck_id,
            load_date = excluded.load_date,
            description = excluded.description,
            amount_gross_cents = excluded.amount_gross_cents,
            slv_fee_percent = excluded.slv_fee_percent,
            recife_fee_percent = excluded.recife_fee_percent,
            week_reference = excluded.week_reference,
            sheet_owner = excluded.sheet_owner,
            updated_at = datetime('now')
        RETURNING id
        "#,
    )
    .bind(&input.external_id)
    .bind(&input.driver_external_id)
    .bind(&input.truck_external_id)
    .bind(input.load_date)
    .bind(&input.description)
    .bind(input.amount_gross.to_cents())
    .bind(slv.to_string())
    .bind(recife.to_string())
    .bind(input.week_reference.as_ref().map(WeekReference::as_str))
    .bind(&input.sheet_owner)
    .fetch_one(&mut *conn)
    .await?;
    Ok(LoadId(id))
}

pub async fn upsert_bank_transaction(
    conn: &mut DbConnection,
    input: &BankTransactionInput,
) -> Result<BankTransactionId, sqlx::Error> {
    let transaction_type = input.transaction_type.unwrap_or_default();

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO bank_transactions (
            external_id,
            account_id,
            txn_date,
            description,
            amount_cents,
            transaction_type,
            category,
            related_account_id,
            sheet_owner
        )
        VALUES (
            ?,
            (SELECT id FROM bank_accounts WHERE external_id = ?),
            ?, ?, ?, ?, ?,
            (SELECT id FROM bank_accounts WHERE external_id = ?),
            ?
        )
        ON CONFLICT(external_id) DO UPDATE SET
            account_id = excluded.account_id,
            txn_date = excluded.txn_date,
            description = excluded.description,
            amount_cents = excluded.amount_cents,
            transaction_type = excluded.transaction_type,
            category = excluded.category,
            related_account_id = excluded.related_account_id,
            sheet_owner = excluded.sheet_owner
        RETURNING id
        "#,
    )
    .bind(&input.external_id)
    .bind(&input.account_external_id)
    .bind(input.txn_date)
    .bind(&input.description)
    .bind(input.amount.to_cents())
    .bind(transaction_type.as_str())
    .bind(&input.category)
    .bind(&input.related_account_external_id)
    .bind(&input.sheet_owner)
    .fetch_one(&mut *conn)
    .await?;
    Ok(BankTransactionId(id))
}

/// Manually entered expenses have no natural key and are always inserted.
pub async fn insert_expense(conn: &mut DbConnection, input: &ExpenseInput) -> Result<ExpenseId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO expenses (
            owner_id,
            truck_id,
            bank_account_id,
            expense_date,
            amount_cents,
            description,
            category,
            cost_center
        )
        VALUES (
            (SELECT id FROM owners WHERE external_id = ?),
            (SELECT id FROM trucks WHERE external_id = ?),
            (SELECT id FROM bank_accounts WHERE external_id = ?),
            ?, ?, ?, ?, ?
        )
        RETURNING id
        "#,
    )
    .bind(&input.owner_external_id)
    .bind(&input.truck_external_id)
    .bind(&input.bank_account_external_id)
    .bind(input.expense_date)
    .bind(input.amount.to_cents())
    .bind(&input.description)
    .bind(&input.category)
    .bind(&input.cost_center)
    .fetch_one(&mut *conn)
    .await?;
    Ok(ExpenseId(id))
}

pub async fn find_owner_id(conn: &mut DbConnection, external_id: &str) -> Result<Option<OwnerId>, sqlx::Error> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM owners WHERE external_id = ?")
        .bind(external_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id.map(OwnerId))
}

pub async fn find_driver_id(conn: &mut DbConnection, external_id: &str) -> Result<Option<DriverId>, sqlx::Error> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM drivers WHERE external_id = ?")
        .bind(external_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id.map(DriverId))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_db;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn owner(external_id: &str) -> OwnerInput {
        OwnerInput {
            external_id: external_id.to_string(),
            name: format!("Owner {external_id}"),
            notification_chat_id: None,
        }
    }

    #[tokio::test]
    async fn upsert_owner_keeps_surrogate_id() {
        let pool = create_memory_db().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let first = upsert_owner(&mut conn, &owner("OWNER_01")).await.unwrap();
        let mut renamed = owner("OWNER_01");
        renamed.name = "Renamed".into();
        let second = upsert_owner(&mut conn, &renamed).await.unwrap();
        assert_eq!(first, second);

        let name: String = sqlx::query_scalar("SELECT name FROM owners WHERE id = ?")
            .bind(first.0)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(name, "Renamed");
    }

    #[tokio::test]
    async fn truck_with_unknown_owner_is_rejected() {
        let pool = create_memory_db().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let result = upsert_truck(
            &mut conn,
            &TruckInput {
                external_id: "TRUCK_01".into(),
                owner_external_id: "NOPE".into(),
                plate: None,
            },
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn load_defaults_fees_and_preserves_paid_status() {
        let pool = create_memory_db().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let input = LoadInput {
            external_id: "L1".into(),
            driver_external_id: Some("UNKNOWN".into()),
            truck_external_id: None,
            load_date: date(2024, 1, 10),
            description: None,
            amount_gross: Money::from_cents(100_000),
            slv_fee_percent: None,
            recife_fee_percent: None,
            week_reference: Some(WeekReference::from("2024-W02")),
            sheet_owner: None,
        };
        let id = upsert_load(&mut conn, &input).await.unwrap();

        let (driver_id, slv, recife, status): (Option<i64>, String, String, String) = sqlx::query_as(
            "SELECT driver_id, slv_fee_percent, recife_fee_percent, status FROM loads WHERE id = ?",
        )
        .bind(id.0)
        .fetch_one(&mut *conn)
        .await
        .unwrap();
        assert_eq!(driver_id, None);
        assert_eq!(slv, "0");
        assert_eq!(recife, "10");
        assert_eq!(status, "open");

        sqlx::query("UPDATE loads SET status = 'paid' WHERE id = ?")
            .bind(id.0)
            .execute(&mut *conn)
            .await
            .unwrap();
        let again = upsert_load(&mut conn, &input).await.unwrap();
        assert_eq!(again, id);

        let status: String = sqlx::query_scalar("SELECT status FROM loads WHERE id = ?")
            .bind(id.0)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(status, "paid");
    }

    #[tokio::test]
    async fn bank_transaction_defaults_to_credit() {
        let pool = create_memory_db().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let id = upsert_bank_transaction(
            &mut conn,
            &BankTransactionInput {
                external_id: "TXN_01".into(),
                account_external_id: None,
                txn_date: date(2024, 1, 10),
                description: Some("ACH deposit".into()),
                amount: Money::from_cents(50_000),
                transaction_type: None,
                category: None,
                related_account_external_id: None,
                sheet_owner: None,
            },
        )
        .await
        .unwrap();

        let kind: String = sqlx::query_scalar("SELECT transaction_type FROM bank_transactions WHERE id = ?")
            .bind(id.0)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(kind, "credit");
    }
}
