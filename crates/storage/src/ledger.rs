use chrono::NaiveDate;
use haulbook_core::{
    Beneficiary, DriverId, LedgerEntry, LedgerEntryId, LedgerEntryType, Money, OwnerId,
    WeekReference,
};

use crate::db::{decode_error, DbConnection};

#[derive(Debug, Clone)]
pub struct NewLedgerEntry<'a> {
    pub beneficiary: Beneficiary,
    pub entry_date: NaiveDate,
    pub entry_type: LedgerEntryType,
    pub amount: Money,
    pub description: &'a str,
    pub week_reference: Option<&'a WeekReference>,
}

/// Inserts unless the beneficiary already has an entry with the same type
/// and description. Returns `None` for the duplicate case.
pub async fn insert_ledger_entry(
    conn: &mut DbConnection,
    entry: &NewLedgerEntry<'_>,
) -> Result<Option<LedgerEntryId>, sqlx::Error> {
    let id: Option<i64> = sqlx::query_scalar(
        r#"
        INSERT OR IGNORE INTO ledger_entries (
            owner_id,
            driver_id,
            entry_date,
            entry_type,
            amount_cents,
            description,
            week_reference
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(entry.beneficiary.owner_id().map(|id| id.0))
    .bind(entry.beneficiary.driver_id().map(|id| id.0))
    .bind(entry.entry_date)
    .bind(entry.entry_type.as_str())
    .bind(entry.amount.to_cents())
    .bind(entry.description)
    .bind(entry.week_reference.map(WeekReference::as_str))
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id.map(LedgerEntryId))
}

/// Most recent entries first; same-day entries newest insert first.
pub async fn ledger_entries_for(
    conn: &mut DbConnection,
    beneficiary: Beneficiary,
    limit: u32,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    let (column, id) = match beneficiary {
        Beneficiary::Owner(id) => ("owner_id", id.0),
        Beneficiary::Driver(id) => ("driver_id", id.0),
    };
    let sql = format!(
        "SELECT id, owner_id, driver_id, entry_date, entry_type, amount_cents, description \
         FROM ledger_entries WHERE {column} = ? ORDER BY entry_date DESC, id DESC LIMIT ?"
    );
    let rows = sqlx::query_as::<_, (i64, Option<i64>, Option<i64>, NaiveDate, String, i64, String)>(&sql)
        .bind(id)
        .bind(i64::from(limit))
        .fetch_all(&mut *conn)
        .await?;

    rows.into_iter()
        .map(|r| {
            let beneficiary = Beneficiary::from_columns(r.0, r.1.map(OwnerId), r.2.map(DriverId))
                .map_err(decode_error)?;
            let entry_type: LedgerEntryType = r.4.parse().map_err(decode_error)?;
            Ok(LedgerEntry {
                id: LedgerEntryId(r.0),
                beneficiary,
                entry_date: r.3,
                entry_type,
                amount: Money::from_cents(r.5),
                description: r.6,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_db;
    use crate::registry::{upsert_owner, OwnerInput};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[tokio::test]
    async fn entries_are_newest_first_with_id_tie_break() {
        let pool = create_memory_db().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let owner = upsert_owner(&mut conn, &OwnerInput {
            external_id: "O1".into(),
            name: "Fleet".into(),
            notification_chat_id: None,
        })
        .await
        .unwrap();

        for (day, description) in [(5, "a"), (9, "b"), (9, "c"), (1, "d")] {
            insert_ledger_entry(&mut conn, &NewLedgerEntry {
                beneficiary: Beneficiary::Owner(owner),
                entry_date: date(day),
                entry_type: LedgerEntryType::WeeklyCommission,
                amount: Money::from_cents(100),
                description,
                week_reference: None,
            })
            .await
            .unwrap();
        }

        let entries = ledger_entries_for(&mut conn, Beneficiary::Owner(owner), 3).await.unwrap();
        let order: Vec<_> = entries.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn same_description_for_same_beneficiary_is_ignored() {
        let pool = create_memory_db().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let owner = upsert_owner(&mut conn, &OwnerInput {
            external_id: "O1".into(),
            name: "Fleet".into(),
            notification_chat_id: None,
        })
        .await
        .unwrap();
        let entry = NewLedgerEntry {
            beneficiary: Beneficiary::Owner(owner),
            entry_date: date(1),
            entry_type: LedgerEntryType::WeeklyCommission,
            amount: Money::from_cents(100),
            description: "Fechamento semana 2024-W01",
            week_reference: None,
        };
        assert!(insert_ledger_entry(&mut conn, &entry).await.unwrap().is_some());
        assert!(insert_ledger_entry(&mut conn, &entry).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_entry_type_is_a_decode_error() {
        let pool = create_memory_db().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let owner = upsert_owner(&mut conn, &OwnerInput {
            external_id: "O1".into(),
            name: "Fleet".into(),
            notification_chat_id: None,
        })
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO ledger_entries (owner_id, entry_date, entry_type, amount_cents, description) \
             VALUES (?, '2024-01-01', 'bonus', 100, 'x')",
        )
        .bind(owner.0)
        .execute(&mut *conn)
        .await
        .unwrap();

        let result = ledger_entries_for(&mut conn, Beneficiary::Owner(owner), 10).await;
        assert!(matches!(result, Err(sqlx::Error::Decode(_))));
    }
}
