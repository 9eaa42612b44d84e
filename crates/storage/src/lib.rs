pub mod db;
pub mod expenses;
pub mod ledger;
pub mod loads;
pub mod reconciliation;
pub mod registry;
pub mod summary;

pub use db::{create_db, create_memory_db, DbConnection, DbPool, DbTransaction};
pub use expenses::{ExpenseRecord, DISPATCHER_CATEGORY, DISPATCHER_COST_CENTER};
pub use ledger::NewLedgerEntry;
pub use loads::LoadRecord;
pub use reconciliation::{PaymentRecord, ReconciliationRecord};
pub use registry::{
    BankAccountInput, BankTransactionInput, DriverInput, ExpenseInput, LoadInput, OwnerInput,
    TruckInput,
};
pub use summary::{BankTotals, DashboardLoad, DashboardTransaction};
