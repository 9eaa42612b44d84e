use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! surrogate_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub i64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

surrogate_id!(
    OwnerId,
    DriverId,
    TruckId,
    BankAccountId,
    LoadId,
    ExpenseId,
    BankTransactionId,
    PaymentId,
    ReconciliationId,
    LedgerEntryId,
);
