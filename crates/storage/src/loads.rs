use chrono::NaiveDate;
use haulbook_core::{
    DriverId, Load, LoadId, LoadOwnership, LoadStatus, Money, OwnerId, Percent, TruckId,
    WeekReference,
};

use crate::db::{decode_error, DbConnection};

/// A load plus the truck owner needed to settle it.
#[derive(Debug, Clone)]
pub struct LoadRecord {
    pub load: Load,
    pub ownership: LoadOwnership,
}

impl LoadRecord {
    pub fn settlement_owner(&self) -> Option<OwnerId> {
        self.ownership.settlement_owner()
    }
}

#[derive(sqlx::FromRow)]
struct LoadRow {
    id: i64,
    external_id: String,
    driver_id: Option<i64>,
    truck_id: Option<i64>,
    load_date: NaiveDate,
    description: Option<String>,
    amount_gross_cents: i64,
    slv_fee_percent: String,
    recife_fee_percent: String,
    status: String,
    week_reference: Option<String>,
    sheet_owner: Option<String>,
    truck_owner_id: Option<i64>,
}

impl TryFrom<LoadRow> for LoadRecord {
    type Error = sqlx::Error;

    fn try_from(row: LoadRow) -> Result<Self, Self::Error> {
        let slv_fee_percent: Percent = row.slv_fee_percent.parse().map_err(decode_error)?;
        let recife_fee_percent: Percent = row.recife_fee_percent.parse().map_err(decode_error)?;
        let status: LoadStatus = row.status.parse().map_err(decode_error)?;

        Ok(LoadRecord {
            load: Load {
                id: LoadId(row.id),
                external_id: row.external_id,
                driver_id: row.driver_id.map(DriverId),
                truck_id: row.truck_id.map(TruckId),
                load_date: row.load_date,
                description: row.description,
                amount_gross: Money::from_cents(row.amount_gross_cents),
                slv_fee_percent,
                recife_fee_percent,
                status,
                week_reference: row.week_reference.map(WeekReference::new),
                sheet_owner: row.sheet_owner,
            },
            ownership: LoadOwnership {
                truck_owner: row.truck_owner_id.map(OwnerId),
            },
        })
    }
}

const LOAD_SELECT: &str = r#"
    SELECT
        l.id,
        l.external_id,
        l.driver_id,
        l.truck_id,
        l.load_date,
        l.description,
        l.amount_gross_cents,
        l.slv_fee_percent,
        l.recife_fee_percent,
        l.status,
        l.week_reference,
        l.sheet_owner,
        t.owner_id AS truck_owner_id
    FROM loads l
    LEFT JOIN trucks t ON t.id = l.truck_id
"#;

fn into_records(rows: Vec<LoadRow>) -> Result<Vec<LoadRecord>, sqlx::Error> {
    rows.into_iter().map(LoadRecord::try_from).collect()
}

pub async fn find_load_by_external_id(
    conn: &mut DbConnection,
    external_id: &str,
) -> Result<Option<LoadRecord>, sqlx::Error> {
    let sql = format!("{LOAD_SELECT} WHERE l.external_id = ?");
    let row = sqlx::query_as::<_, LoadRow>(&sql)
        .bind(external_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(LoadRecord::try_from).transpose()
}

pub async fn find_load(conn: &mut DbConnection, id: LoadId) -> Result<Option<LoadRecord>, sqlx::Error> {
    let sql = format!("{LOAD_SELECT} WHERE l.id = ?");
    let row = sqlx::query_as::<_, LoadRow>(&sql)
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(LoadRecord::try_from).transpose()
}

pub async fn loads_for_week(
    conn: &mut DbConnection,
    week: &WeekReference,
) -> Result<Vec<LoadRecord>, sqlx::Error> {
    let sql = format!("{LOAD_SELECT} WHERE l.week_reference = ? ORDER BY l.id");
    let rows = sqlx::query_as::<_, LoadRow>(&sql)
        .bind(week.as_str())
        .fetch_all(&mut *conn)
        .await?;
    into_records(rows)
}

/// Every load whose status is not `paid`, most recent first.
pub async fn open_loads(conn: &mut DbConnection) -> Result<Vec<LoadRecord>, sqlx::Error> {
    let sql = format!("{LOAD_SELECT} WHERE l.status != 'paid' ORDER BY l.load_date DESC, l.id DESC");
    let rows = sqlx::query_as::<_, LoadRow>(&sql)
        .fetch_all(&mut *conn)
        .await?;
    into_records(rows)
}

/// Returns the number of rows updated: 0 when the id is unknown.
pub async fn mark_load_paid(conn: &mut DbConnection, id: LoadId) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE loads SET status = 'paid', updated_at = datetime('now') WHERE id = ?",
    )
    .bind(id.0)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}
