pub mod bank;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod load;
pub mod money;
pub mod settlement;
pub mod week;

pub use bank::{BankTransaction, ReconciliationState, ReconciliationType, TransactionType};
pub use error::DomainError;
pub use ids::{
    BankAccountId, BankTransactionId, DriverId, ExpenseId, LedgerEntryId, LoadId, OwnerId,
    PaymentId, ReconciliationId, TruckId,
};
pub use ledger::{Beneficiary, LedgerEntry, LedgerEntryType};
pub use load::{dispatcher_fee_description, Load, LoadFees, LoadOwnership, LoadStatus};
pub use money::{round_cents, Money, Percent};
pub use settlement::{SettlementLoad, WeekTotals};
pub use week::WeekReference;
