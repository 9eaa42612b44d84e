use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::{Pool, Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub type DbPool = Pool<Sqlite>;
pub type DbTransaction<'c> = Transaction<'c, Sqlite>;
pub type DbConnection = SqliteConnection;

const MAX_CONNECTIONS: u32 = 4;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(5000))
        .pragma("cache_size", "-32000");

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database. Every pooled connection to
/// `:memory:` is its own database, so the pool is pinned to one
/// connection that is never recycled.
pub async fn create_memory_db() -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS owners (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        external_id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        notification_chat_id TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS drivers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        external_id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        owner_id INTEGER,
        is_owner_driver INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY (owner_id) REFERENCES owners(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trucks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        external_id TEXT NOT NULL UNIQUE,
        owner_id INTEGER NOT NULL,
        plate TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY (owner_id) REFERENCES owners(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bank_accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        external_id TEXT NOT NULL UNIQUE,
        label TEXT NOT NULL,
        owner_id INTEGER,
        driver_id INTEGER,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY (owner_id) REFERENCES owners(id),
        FOREIGN KEY (driver_id) REFERENCES drivers(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS loads (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        external_id TEXT NOT NULL UNIQUE,
        driver_id INTEGER,
        truck_id INTEGER,
        load_date TEXT NOT NULL,
        description TEXT,
        amount_gross_cents INTEGER NOT NULL,
        slv_fee_percent TEXT NOT NULL DEFAULT '0',
        recife_fee_percent TEXT NOT NULL DEFAULT '10',
        status TEXT NOT NULL DEFAULT 'open' CHECK (status IN ('open', 'paid')),
        week_reference TEXT,
        sheet_owner TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY (driver_id) REFERENCES drivers(id),
        FOREIGN KEY (truck_id) REFERENCES trucks(id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_loads_week_reference ON loads(week_reference)",
    "CREATE INDEX IF NOT EXISTS idx_loads_status ON loads(status)",
    r#"
    CREATE TABLE IF NOT EXISTS expenses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER,
        truck_id INTEGER,
        bank_account_id INTEGER,
        expense_date TEXT NOT NULL,
        amount_cents INTEGER NOT NULL,
        description TEXT,
        category TEXT,
        cost_center TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY (owner_id) REFERENCES owners(id),
        FOREIGN KEY (truck_id) REFERENCES trucks(id),
        FOREIGN KEY (bank_account_id) REFERENCES bank_accounts(id)
    )
    "#,
    // Duplicate guard for system-posted dispatcher fees.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_expenses_dispatcher_fee
        ON expenses(description, amount_cents, expense_date)
        WHERE category = 'dispatcher'
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bank_transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        external_id TEXT NOT NULL UNIQUE,
        account_id INTEGER,
        txn_date TEXT NOT NULL,
        description TEXT,
        amount_cents INTEGER NOT NULL,
        transaction_type TEXT NOT NULL DEFAULT 'credit' CHECK (transaction_type IN ('credit', 'debit')),
        category TEXT,
        related_account_id INTEGER,
        sheet_owner TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY (account_id) REFERENCES bank_accounts(id),
        FOREIGN KEY (related_account_id) REFERENCES bank_accounts(id)
    )
    "#,
    // Payments and reconciliations keep the transaction id even when the
    // transaction row is gone, so there is no foreign key on it.
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bank_transaction_id INTEGER NOT NULL,
        total_amount_cents INTEGER NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payment_loads (
        payment_id INTEGER NOT NULL,
        load_id INTEGER NOT NULL,
        PRIMARY KEY (payment_id, load_id),
        FOREIGN KEY (payment_id) REFERENCES payments(id) ON DELETE CASCADE,
        FOREIGN KEY (load_id) REFERENCES loads(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bank_reconciliations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bank_transaction_id INTEGER NOT NULL,
        reconciliation_type TEXT NOT NULL,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_bank_reconciliations_txn ON bank_reconciliations(bank_transaction_id)",
    r#"
    CREATE TABLE IF NOT EXISTS ledger_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER,
        driver_id INTEGER,
        entry_date TEXT NOT NULL,
        entry_type TEXT NOT NULL,
        amount_cents INTEGER NOT NULL,
        description TEXT NOT NULL,
        week_reference TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        CHECK ((owner_id IS NULL) <> (driver_id IS NULL)),
        FOREIGN KEY (owner_id) REFERENCES owners(id),
        FOREIGN KEY (driver_id) REFERENCES drivers(id)
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_ledger_entries_driver_key
        ON ledger_entries(driver_id, entry_type, description)
        WHERE driver_id IS NOT NULL
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_ledger_entries_owner_key
        ON ledger_entries(owner_id, entry_type, description)
        WHERE owner_id IS NOT NULL
    "#,
];

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(*statement).execute(pool).await?;
    }
    Ok(())
}

/// Wraps a text-column parse failure as a sqlx decode error.
pub(crate) fn decode_error<E>(error: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(error))
}
