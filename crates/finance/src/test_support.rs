//! Seed data shared by the engine tests.

use chrono::NaiveDate;
use haulbook_core::{BankTransactionId, DriverId, LoadId, Money, OwnerId, TransactionType};
use haulbook_storage::{
    create_memory_db, registry, BankTransactionInput, DbConnection, DbPool, DriverInput, LoadInput,
    OwnerInput, TruckInput,
};
use sqlx::pool::PoolConnection;
use sqlx::Sqlite;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn money(s: &str) -> Money {
    s.parse().unwrap()
}

pub struct Fixture {
    pub pool: DbPool,
}

impl Fixture {
    pub async fn new() -> Self {
        Self {
            pool: create_memory_db().await.unwrap(),
        }
    }

    pub async fn conn(&self) -> PoolConnection<Sqlite> {
        self.pool.acquire().await.unwrap()
    }

    /// OWNER_01 employs DRIVER_01; TRUCK_01 belongs to OWNER_02, so loads
    /// run on TRUCK_01 settle to OWNER_02. DRIVER_02 has no owner.
    pub async fn fleet(&self, conn: &mut DbConnection) {
        for (external_id, name) in [("OWNER_01", "Silva Transportes"), ("OWNER_02", "Rota Norte")] {
            registry::upsert_owner(
                conn,
                &OwnerInput {
                    external_id: external_id.into(),
                    name: name.into(),
                    notification_chat_id: None,
                },
            )
            .await
            .unwrap();
        }
        for (external_id, owner) in [("DRIVER_01", Some("OWNER_01")), ("DRIVER_02", None)] {
            registry::upsert_driver(
                conn,
                &DriverInput {
                    external_id: external_id.into(),
                    name: format!("Driver {external_id}"),
                    owner_external_id: owner.map(str::to_string),
                    is_owner_driver: false,
                },
            )
            .await
            .unwrap();
        }
        registry::upsert_truck(
            conn,
            &TruckInput {
                external_id: "TRUCK_01".into(),
                owner_external_id: "OWNER_02".into(),
                plate: Some("ABC1D23".into()),
            },
        )
        .await
        .unwrap();
    }

    pub fn load_input(&self, external_id: &str, gross: &str, load_date: NaiveDate, week: &str) -> LoadInput {
        LoadInput {
            external_id: external_id.into(),
            driver_external_id: Some("DRIVER_01".into()),
            truck_external_id: Some("TRUCK_01".into()),
            load_date,
            description: Some(format!("Load {external_id}")),
            amount_gross: money(gross),
            slv_fee_percent: None,
            recife_fee_percent: None,
            week_reference: Some(week.into()),
            sheet_owner: None,
        }
    }

    pub async fn load(
        &self,
        conn: &mut DbConnection,
        external_id: &str,
        gross: &str,
        load_date: NaiveDate,
        week: &str,
    ) -> LoadId {
        let input = self.load_input(external_id, gross, load_date, week);
        registry::upsert_load(conn, &input).await.unwrap()
    }

    pub async fn transaction(
        &self,
        conn: &mut DbConnection,
        external_id: &str,
        amount: &str,
        txn_date: NaiveDate,
        transaction_type: TransactionType,
    ) -> BankTransactionId {
        registry::upsert_bank_transaction(
            conn,
            &BankTransactionInput {
                external_id: external_id.into(),
                account_external_id: None,
                txn_date,
                description: Some(format!("Statement line {external_id}")),
                amount: money(amount),
                transaction_type: Some(transaction_type),
                category: None,
                related_account_external_id: None,
                sheet_owner: None,
            },
        )
        .await
        .unwrap()
    }

    pub async fn owner_id(&self, conn: &mut DbConnection, external_id: &str) -> OwnerId {
        registry::find_owner_id(conn, external_id).await.unwrap().unwrap()
    }

    pub async fn driver_id(&self, conn: &mut DbConnection, external_id: &str) -> DriverId {
        registry::find_driver_id(conn, external_id).await.unwrap().unwrap()
    }

    pub async fn load_status(&self, conn: &mut DbConnection, id: LoadId) -> String {
        sqlx::query_scalar("SELECT status FROM loads WHERE id = ?")
            .bind(id.0)
            .fetch_one(&mut *conn)
            .await
            .unwrap()
    }
}
