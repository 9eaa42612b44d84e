use chrono::{Local, NaiveDate};
use haulbook_core::{
    BankAccountId, BankTransactionId, DriverId, ExpenseId, LedgerEntry, OwnerId, ReconciliationState, TruckId,
    WeekReference,
};
use haulbook_storage::{
    BankAccountInput, BankTransactionInput, DbConnection, DbPool, DbTransaction, DriverInput, ExpenseInput,
    LoadInput, OwnerInput, ReconciliationRecord, TruckInput,
};
use tracing::instrument;

use crate::config::EngineConfig;
use crate::dispatcher_fee::{self, FeePosting};
use crate::error::FinanceResult;
use crate::match_engine::ReconciliationCandidate;
use crate::reconcile::{self, ReconciliationOutcome, ReconciliationRequest};
use crate::registration::{self, LoadRegistration};
use crate::settlement::{self, WeekClosing};
use crate::summary::{self, Dashboard, OpenLoadsSummary, PartyFilter, PayablesReceivables, Summary};

/// Entry point for every finance operation. Each call runs in its own
/// transaction on the shared pool and commits only on success.
#[derive(Debug, Clone)]
pub struct FinanceEngine {
    pool: DbPool,
    config: EngineConfig,
}

impl FinanceEngine {
    pub fn new(pool: DbPool, config: EngineConfig) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// For callers composing several operations into one unit of work
    /// with the `*_in` variants.
    pub async fn begin(&self) -> FinanceResult<DbTransaction<'static>> {
        Ok(self.pool.begin().await?)
    }

    #[instrument(skip(self))]
    pub async fn ensure_dispatcher_fee_expense(&self, load_external_id: &str) -> FinanceResult<FeePosting> {
        let mut tx = self.pool.begin().await?;
        let posting = dispatcher_fee::ensure_dispatcher_fee_expense(&mut tx, load_external_id).await?;
        tx.commit().await?;
        Ok(posting)
    }

    pub async fn ensure_dispatcher_fee_expense_in(
        &self,
        conn: &mut DbConnection,
        load_external_id: &str,
    ) -> FinanceResult<FeePosting> {
        dispatcher_fee::ensure_dispatcher_fee_expense(conn, load_external_id).await
    }

    #[instrument(skip(self, input), fields(load = %input.external_id))]
    pub async fn register_load(&self, input: &LoadInput) -> FinanceResult<LoadRegistration> {
        let mut tx = self.pool.begin().await?;
        let registration = registration::register_load(&mut tx, input).await?;
        tx.commit().await?;
        Ok(registration)
    }

    #[instrument(skip(self, input), fields(transaction = %input.external_id))]
    pub async fn register_bank_transaction(&self, input: &BankTransactionInput) -> FinanceResult<BankTransactionId> {
        let mut tx = self.pool.begin().await?;
        let id = registration::register_bank_transaction(&mut tx, input).await?;
        tx.commit().await?;
        Ok(id)
    }

    #[instrument(skip(self, input), fields(owner = %input.external_id))]
    pub async fn register_owner(&self, input: &OwnerInput) -> FinanceResult<OwnerId> {
        let mut tx = self.pool.begin().await?;
        let id = registration::register_owner(&mut tx, input).await?;
        tx.commit().await?;
        Ok(id)
    }

    #[instrument(skip(self, input), fields(driver = %input.external_id))]
    pub async fn register_driver(&self, input: &DriverInput) -> FinanceResult<DriverId> {
        let mut tx = self.pool.begin().await?;
        let id = registration::register_driver(&mut tx, input).await?;
        tx.commit().await?;
        Ok(id)
    }

    #[instrument(skip(self, input), fields(truck = %input.external_id))]
    pub async fn register_truck(&self, input: &TruckInput) -> FinanceResult<TruckId> {
        let mut tx = self.pool.begin().await?;
        let id = registration::register_truck(&mut tx, input).await?;
        tx.commit().await?;
        Ok(id)
    }

    #[instrument(skip(self, input), fields(account = %input.external_id))]
    pub async fn register_bank_account(&self, input: &BankAccountInput) -> FinanceResult<BankAccountId> {
        let mut tx = self.pool.begin().await?;
        let id = registration::register_bank_account(&mut tx, input).await?;
        tx.commit().await?;
        Ok(id)
    }

    #[instrument(skip(self, input), fields(amount = %input.amount))]
    pub async fn add_expense(&self, input: &ExpenseInput) -> FinanceResult<ExpenseId> {
        let mut tx = self.pool.begin().await?;
        let id = registration::add_expense(&mut tx, input).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Closes the week with today's local date on the ledger entries.
    pub async fn close_week(&self, week: &WeekReference) -> FinanceResult<WeekClosing> {
        self.close_week_on(week, Local::now().date_naive()).await
    }

    #[instrument(skip(self, week), fields(week = %week))]
    pub async fn close_week_on(&self, week: &WeekReference, entry_date: NaiveDate) -> FinanceResult<WeekClosing> {
        let mut tx = self.pool.begin().await?;
        let closing = settlement::close_week(&mut tx, week, entry_date).await?;
        tx.commit().await?;
        Ok(closing)
    }

    #[instrument(skip(self))]
    pub async fn build_summary(&self) -> FinanceResult<Summary> {
        let mut tx = self.pool.begin().await?;
        let result = summary::build_summary(&mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    /// `limit` falls back to the configured ledger limit.
    #[instrument(skip(self))]
    pub async fn get_ledger(
        &self,
        owner_id: Option<&str>,
        driver_id: Option<&str>,
        limit: Option<u32>,
    ) -> FinanceResult<Vec<LedgerEntry>> {
        let limit = limit.unwrap_or(self.config.ledger_limit);
        let mut tx = self.pool.begin().await?;
        let entries = summary::get_ledger(&mut tx, PartyFilter::new(owner_id, driver_id), limit).await?;
        tx.commit().await?;
        Ok(entries)
    }

    #[instrument(skip(self))]
    pub async fn get_open_loads_summary(
        &self,
        owner_id: Option<&str>,
        driver_id: Option<&str>,
    ) -> FinanceResult<OpenLoadsSummary> {
        let mut tx = self.pool.begin().await?;
        let open = summary::get_open_loads_summary(&mut tx, PartyFilter::new(owner_id, driver_id)).await?;
        tx.commit().await?;
        Ok(open)
    }

    #[instrument(skip(self))]
    pub async fn get_payables_receivables(
        &self,
        owner_id: Option<&str>,
        driver_id: Option<&str>,
    ) -> FinanceResult<PayablesReceivables> {
        let mut tx = self.pool.begin().await?;
        let result = summary::get_payables_receivables(&mut tx, PartyFilter::new(owner_id, driver_id)).await?;
        tx.commit().await?;
        Ok(result)
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> FinanceResult<Dashboard> {
        let mut tx = self.pool.begin().await?;
        let result = summary::dashboard(&mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    #[instrument(skip(self))]
    pub async fn suggest_reconciliation_candidates(
        &self,
        txn_external_id: &str,
        limit: Option<usize>,
    ) -> FinanceResult<Vec<ReconciliationCandidate>> {
        let limit = limit.unwrap_or(self.config.candidate_limit as usize);
        let mut tx = self.pool.begin().await?;
        let candidates = reconcile::suggest_reconciliation_candidates(&mut tx, txn_external_id, limit).await?;
        tx.commit().await?;
        Ok(candidates)
    }

    #[instrument(
        skip(self, request),
        fields(transaction = %request.bank_transaction_id, kind = request.reconciliation_type.as_str())
    )]
    pub async fn reconcile(&self, request: &ReconciliationRequest) -> FinanceResult<ReconciliationOutcome> {
        let mut tx = self.pool.begin().await?;
        let outcome = reconcile::reconcile(&mut tx, request).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn reconcile_in(
        &self,
        conn: &mut DbConnection,
        request: &ReconciliationRequest,
    ) -> FinanceResult<ReconciliationOutcome> {
        reconcile::reconcile(conn, request).await
    }

    pub async fn reconciliation_state(&self, txn_id: BankTransactionId) -> FinanceResult<ReconciliationState> {
        let mut tx = self.pool.begin().await?;
        let state = reconcile::reconciliation_state(&mut tx, txn_id).await?;
        tx.commit().await?;
        Ok(state)
    }

    pub async fn reconciliation_log(&self, txn_id: BankTransactionId) -> FinanceResult<Vec<ReconciliationRecord>> {
        let mut tx = self.pool.begin().await?;
        let log = reconcile::reconciliation_log(&mut tx, txn_id).await?;
        tx.commit().await?;
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FinanceError;
    use crate::test_support::{date, money, Fixture};
    use haulbook_core::{LoadId, ReconciliationType, TransactionType};

    async fn engine() -> (Fixture, FinanceEngine) {
        let fx = Fixture::new().await;
        {
            let mut conn = fx.conn().await;
            fx.fleet(&mut conn).await;
        }
        let engine = FinanceEngine::new(fx.pool.clone(), EngineConfig::default());
        (fx, engine)
    }

    #[tokio::test]
    async fn register_then_close_then_read_ledger() {
        let (fx, engine) = engine().await;
        for ext in ["L1", "L2"] {
            let input = fx.load_input(ext, "1000", date(2024, 1, 8), "2024-W02");
            engine.register_load(&input).await.unwrap();
        }

        let week = WeekReference::from("2024-W02");
        let closing = engine.close_week_on(&week, date(2024, 1, 14)).await.unwrap();
        assert_eq!(closing.drivers, money("1800"));
        assert_eq!(closing.owners, money("1800"));
        assert_eq!(closing.loads, 2);

        let again = engine.close_week_on(&week, date(2024, 1, 15)).await.unwrap();
        assert_eq!(again.entries_posted, 0);

        let ledger = engine.get_ledger(None, Some("DRIVER_01"), None).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].amount, money("1800"));
        let by_owner = engine.get_ledger(Some("OWNER_02"), Some("DRIVER_01"), Some(5)).await.unwrap();
        assert_eq!(by_owner.len(), 1);
        assert!(matches!(
            by_owner[0].beneficiary,
            haulbook_core::Beneficiary::Owner(_)
        ));

        let summary = engine.build_summary().await.unwrap();
        assert_eq!(summary.total_expenses, money("200"));
        assert_eq!(summary.balance, money("-200"));
    }

    #[tokio::test]
    async fn failed_reconcile_leaves_nothing_behind() {
        let (fx, engine) = engine().await;
        let registered = engine
            .register_load(&fx.load_input("L1", "1000", date(2024, 2, 1), "2024-W05"))
            .await
            .unwrap();
        let txn = {
            let mut conn = fx.conn().await;
            fx.transaction(&mut conn, "T1", "1000", date(2024, 2, 3), TransactionType::Credit).await
        };

        let request = ReconciliationRequest {
            bank_transaction_id: txn,
            reconciliation_type: ReconciliationType::Loads,
            notes: None,
            load_ids: vec![registered.load_id, LoadId(9_999)],
        };
        assert!(matches!(engine.reconcile(&request).await, Err(FinanceError::Storage(_))));
        assert_eq!(
            engine.reconciliation_state(txn).await.unwrap(),
            ReconciliationState::Unreconciled
        );
        assert_eq!(engine.get_open_loads_summary(None, None).await.unwrap().open_count, 1);

        let candidates = engine.suggest_reconciliation_candidates("T1", None).await.unwrap();
        assert_eq!(candidates[0].load_id, registered.load_id);
        assert_eq!(candidates[0].score, 94);

        let ok = ReconciliationRequest {
            load_ids: vec![registered.load_id],
            ..request
        };
        engine.reconcile(&ok).await.unwrap();
        let open = engine.get_open_loads_summary(None, None).await.unwrap();
        assert_eq!(open.open_count, 0);
        assert!(engine.suggest_reconciliation_candidates("T1", None).await.unwrap().is_empty());
        assert_eq!(engine.reconciliation_log(txn).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn caller_supplied_transaction_composes_operations() {
        let (fx, engine) = engine().await;
        let mut tx = engine.begin().await.unwrap();
        haulbook_storage::registry::upsert_load(&mut tx, &fx.load_input("L1", "500", date(2024, 3, 1), "2024-W09"))
            .await
            .unwrap();
        let posting = engine.ensure_dispatcher_fee_expense_in(&mut tx, "L1").await.unwrap();
        assert!(matches!(posting, FeePosting::Posted { amount, .. } if amount == money("50")));
        drop(tx);

        assert_eq!(
            engine.ensure_dispatcher_fee_expense("L1").await.unwrap(),
            FeePosting::LoadNotFound
        );
        let payables = engine.get_payables_receivables(None, None).await.unwrap();
        assert!(payables.payable.is_zero());
    }

    #[tokio::test]
    async fn registrations_commit_and_feed_settlement() {
        let fx = Fixture::new().await;
        let engine = FinanceEngine::new(fx.pool.clone(), EngineConfig::default());
        engine
            .register_owner(&OwnerInput {
                external_id: "OWNER_07".into(),
                name: "Sertao Log".into(),
                notification_chat_id: None,
            })
            .await
            .unwrap();
        engine
            .register_driver(&DriverInput {
                external_id: "DRIVER_01".into(),
                name: "Rui".into(),
                owner_external_id: None,
                is_owner_driver: false,
            })
            .await
            .unwrap();
        engine
            .register_truck(&TruckInput {
                external_id: "TRUCK_01".into(),
                owner_external_id: "OWNER_07".into(),
                plate: Some("ABC1D23".into()),
            })
            .await
            .unwrap();
        let account = engine
            .register_bank_account(&BankAccountInput {
                external_id: "ACC_07".into(),
                label: "Operating".into(),
                owner_external_id: Some("OWNER_07".into()),
                driver_external_id: None,
            })
            .await
            .unwrap();
        let again = engine
            .register_bank_account(&BankAccountInput {
                external_id: "ACC_07".into(),
                label: "Operating (renamed)".into(),
                owner_external_id: Some("OWNER_07".into()),
                driver_external_id: None,
            })
            .await
            .unwrap();
        assert_eq!(account, again);

        engine
            .add_expense(&ExpenseInput {
                owner_external_id: Some("OWNER_07".into()),
                truck_external_id: Some("TRUCK_01".into()),
                bank_account_external_id: Some("ACC_07".into()),
                expense_date: date(2024, 1, 9),
                amount: money("35.50"),
                description: Some("Tolls".into()),
                category: Some("road".into()),
                cost_center: None,
            })
            .await
            .unwrap();

        engine
            .register_load(&fx.load_input("L1", "1000", date(2024, 1, 8), "2024-W02"))
            .await
            .unwrap();
        let closing = engine
            .close_week_on(&WeekReference::from("2024-W02"), date(2024, 1, 14))
            .await
            .unwrap();
        assert_eq!(closing.entries_posted, 2);
        assert_eq!(closing.owners, money("900"));

        let owner_ledger = engine.get_ledger(Some("OWNER_07"), None, None).await.unwrap();
        assert_eq!(owner_ledger.len(), 1);
        let summary = engine.build_summary().await.unwrap();
        assert_eq!(summary.total_expenses, money("135.50"));
    }

    #[tokio::test]
    async fn bank_transaction_registration_validates_and_reads_back() {
        let (_fx, engine) = engine().await;
        let blank = BankTransactionInput {
            external_id: " ".into(),
            account_external_id: None,
            txn_date: date(2024, 1, 12),
            description: None,
            amount: money("100"),
            transaction_type: None,
            category: None,
            related_account_external_id: None,
            sheet_owner: None,
        };
        assert!(matches!(
            engine.register_bank_transaction(&blank).await,
            Err(FinanceError::Validation(_))
        ));

        let id = engine
            .register_bank_transaction(&BankTransactionInput {
                external_id: "T9".into(),
                ..blank
            })
            .await
            .unwrap();
        assert_eq!(engine.reconciliation_state(id).await.unwrap(), ReconciliationState::Unreconciled);
        assert!(engine.reconciliation_log(id).await.unwrap().is_empty());
    }
}
