use haulbook_core::{
    BankTransactionId, LoadId, Money, PaymentId, ReconciliationId, ReconciliationState,
    ReconciliationType,
};
use haulbook_storage::{loads, reconciliation, DbConnection, ReconciliationRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::FinanceResult;
use crate::match_engine::{rank_candidates, MatchableLoad, ReconciliationCandidate};

#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationRequest {
    pub bank_transaction_id: BankTransactionId,
    pub reconciliation_type: ReconciliationType,
    pub notes: Option<String>,
    /// Only read for `loads` reconciliations.
    #[serde(default)]
    pub load_ids: Vec<LoadId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationOutcome {
    pub reconciliation_id: ReconciliationId,
    pub payment_id: Option<PaymentId>,
    pub total_amount: Money,
    pub loads_paid: Vec<LoadId>,
}

/// Records the outcome for a bank transaction. A `loads` reconciliation
/// also creates a payment for the transaction amount, links each load and
/// marks it paid. Must run in a transaction: an unknown load id fails
/// partway through.
pub async fn reconcile(
    conn: &mut DbConnection,
    request: &ReconciliationRequest,
) -> FinanceResult<ReconciliationOutcome> {
    let txn_id = request.bank_transaction_id;
    let total_amount = match reconciliation::bank_transaction_amount(conn, txn_id).await? {
        Some(amount) => amount,
        None => {
            debug!(transaction = %txn_id, "bank transaction not found, recording zero amount");
            Money::zero()
        }
    };

    let mut payment_id = None;
    let mut loads_paid = Vec::new();
    if request.reconciliation_type.settles_loads() {
        let payment = reconciliation::insert_payment(conn, txn_id, total_amount).await?;
        for &load_id in &request.load_ids {
            if loads_paid.contains(&load_id) {
                continue;
            }
            reconciliation::insert_payment_load(conn, payment, load_id).await?;
            loads::mark_load_paid(conn, load_id).await?;
            loads_paid.push(load_id);
        }
        payment_id = Some(payment);
    }

    let reconciliation_id = reconciliation::insert_reconciliation(
        conn,
        txn_id,
        &request.reconciliation_type,
        request.notes.as_deref(),
    )
    .await?;

    info!(
        transaction = %txn_id,
        kind = request.reconciliation_type.as_str(),
        %total_amount,
        loads = loads_paid.len(),
        "bank transaction reconciled"
    );

    Ok(ReconciliationOutcome {
        reconciliation_id,
        payment_id,
        total_amount,
        loads_paid,
    })
}

/// Open loads ranked against a bank transaction. Unknown transaction
/// external ids give an empty list.
pub async fn suggest_reconciliation_candidates(
    conn: &mut DbConnection,
    txn_external_id: &str,
    limit: usize,
) -> FinanceResult<Vec<ReconciliationCandidate>> {
    let Some(txn) = reconciliation::find_bank_transaction_by_external_id(conn, txn_external_id).await?
    else {
        return Ok(Vec::new());
    };

    let open: Vec<MatchableLoad> = loads::open_loads(conn)
        .await?
        .into_iter()
        .map(|record| MatchableLoad {
            id: record.load.id,
            external_id: record.load.external_id,
            load_date: record.load.load_date,
            amount_gross: record.load.amount_gross,
        })
        .collect();

    Ok(rank_candidates(&txn, &open, limit))
}

pub async fn reconciliation_state(
    conn: &mut DbConnection,
    txn_id: BankTransactionId,
) -> FinanceResult<ReconciliationState> {
    let entries = reconciliation::reconciliation_count(conn, txn_id).await?;
    Ok(ReconciliationState::from_entry_count(
        u32::try_from(entries).unwrap_or(u32::MAX),
    ))
}

pub async fn reconciliation_log(
    conn: &mut DbConnection,
    txn_id: BankTransactionId,
) -> FinanceResult<Vec<ReconciliationRecord>> {
    Ok(reconciliation::reconciliation_log(conn, txn_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{date, Fixture};
    use haulbook_core::TransactionType;

    fn request(txn: BankTransactionId, kind: ReconciliationType, load_ids: Vec<LoadId>) -> ReconciliationRequest {
        ReconciliationRequest {
            bank_transaction_id: txn,
            reconciliation_type: kind,
            notes: None,
            load_ids,
        }
    }

    #[tokio::test]
    async fn loads_reconciliation_pays_each_load_once() {
        let fx = Fixture::new().await;
        let mut conn = fx.conn().await;
        let l1 = fx.load(&mut conn, "L1", "1000", date(2024, 2, 1), "2024-W05").await;
        let l2 = fx.load(&mut conn, "L2", "800", date(2024, 2, 2), "2024-W05").await;
        let txn = fx.transaction(&mut conn, "T1", "1800", date(2024, 2, 5), TransactionType::Credit).await;

        let outcome = reconcile(&mut conn, &request(txn, ReconciliationType::Loads, vec![l1, l2, l1]))
            .await
            .unwrap();
        assert_eq!(outcome.total_amount, Money::from_cents(180_000));
        assert_eq!(outcome.loads_paid, vec![l1, l2]);
        assert_eq!(fx.load_status(&mut conn, l1).await, "paid");
        assert_eq!(fx.load_status(&mut conn, l2).await, "paid");

        let payments = reconciliation::payments_for_transaction(&mut conn, txn).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(Some(payments[0].id), outcome.payment_id);
        assert_eq!(payments[0].load_ids, vec![l1, l2]);
        assert_eq!(
            reconciliation_state(&mut conn, txn).await.unwrap(),
            ReconciliationState::Reconciled { entries: 1 }
        );
    }

    #[tokio::test]
    async fn ignore_after_loads_appends_to_the_log() {
        let fx = Fixture::new().await;
        let mut conn = fx.conn().await;
        let l1 = fx.load(&mut conn, "L1", "250", date(2024, 2, 1), "2024-W05").await;
        let l2 = fx.load(&mut conn, "L2", "250", date(2024, 2, 1), "2024-W05").await;
        let txn = fx.transaction(&mut conn, "T1", "500", date(2024, 2, 5), TransactionType::Credit).await;

        reconcile(&mut conn, &request(txn, ReconciliationType::Loads, vec![l1, l2]))
            .await
            .unwrap();
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment_loads")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(links, 2);

        reconcile(&mut conn, &request(txn, ReconciliationType::Ignore, vec![]))
            .await
            .unwrap();
        let log = reconciliation_log(&mut conn, txn).await.unwrap();
        let kinds: Vec<_> = log.iter().map(|r| r.reconciliation_type.as_str()).collect();
        assert_eq!(kinds, vec!["loads", "ignore"]);
        assert_eq!(reconciliation::payments_for_transaction(&mut conn, txn).await.unwrap().len(), 1);
        assert_eq!(fx.load_status(&mut conn, l1).await, "paid");
        assert_eq!(fx.load_status(&mut conn, l2).await, "paid");
        assert_eq!(
            reconciliation_state(&mut conn, txn).await.unwrap(),
            ReconciliationState::Reconciled { entries: 2 }
        );
    }

    #[tokio::test]
    async fn ignore_logs_without_payment() {
        let fx = Fixture::new().await;
        let mut conn = fx.conn().await;
        let l1 = fx.load(&mut conn, "L1", "1000", date(2024, 2, 1), "2024-W05").await;
        let txn = fx.transaction(&mut conn, "T1", "45", date(2024, 2, 5), TransactionType::Debit).await;
        assert_eq!(
            reconciliation_state(&mut conn, txn).await.unwrap(),
            ReconciliationState::Unreconciled
        );

        let mut req = request(txn, ReconciliationType::Ignore, vec![l1]);
        req.notes = Some("bank fee".into());
        let outcome = reconcile(&mut conn, &req).await.unwrap();
        assert_eq!(outcome.payment_id, None);
        assert!(outcome.loads_paid.is_empty());
        assert_eq!(fx.load_status(&mut conn, l1).await, "open");
        assert!(reconciliation::payments_for_transaction(&mut conn, txn).await.unwrap().is_empty());

        let log = reconciliation_log(&mut conn, txn).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].notes.as_deref(), Some("bank fee"));
    }

    #[tokio::test]
    async fn missing_transaction_records_zero_amount() {
        let fx = Fixture::new().await;
        let mut conn = fx.conn().await;
        let ghost = BankTransactionId(999);
        let outcome = reconcile(&mut conn, &request(ghost, ReconciliationType::Loads, vec![]))
            .await
            .unwrap();
        assert!(outcome.total_amount.is_zero());
        assert!(outcome.payment_id.is_some());
        assert_eq!(reconciliation_log(&mut conn, ghost).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_load_rolls_back_whole_reconciliation() {
        let fx = Fixture::new().await;
        let mut conn = fx.conn().await;
        let l1 = fx.load(&mut conn, "L1", "1000", date(2024, 2, 1), "2024-W05").await;
        let txn = fx.transaction(&mut conn, "T1", "1000", date(2024, 2, 5), TransactionType::Credit).await;
        drop(conn);

        let mut tx = fx.pool.begin().await.unwrap();
        let result = reconcile(&mut tx, &request(txn, ReconciliationType::Loads, vec![l1, LoadId(404)])).await;
        assert!(result.is_err());
        drop(tx);

        let mut conn = fx.conn().await;
        assert_eq!(fx.load_status(&mut conn, l1).await, "open");
        assert!(reconciliation::payments_for_transaction(&mut conn, txn).await.unwrap().is_empty());
        assert_eq!(
            reconciliation_state(&mut conn, txn).await.unwrap(),
            ReconciliationState::Unreconciled
        );
    }

    #[tokio::test]
    async fn candidates_rank_open_loads_only() {
        let fx = Fixture::new().await;
        let mut conn = fx.conn().await;
        let paid = fx.load(&mut conn, "L0", "1000", date(2024, 2, 5), "2024-W05").await;
        fx.load(&mut conn, "L1", "1000", date(2024, 2, 3), "2024-W05").await;
        fx.load(&mut conn, "L2", "1020", date(2024, 2, 5), "2024-W05").await;
        fx.transaction(&mut conn, "T1", "1000", date(2024, 2, 5), TransactionType::Credit).await;
        loads::mark_load_paid(&mut conn, paid).await.unwrap();

        let candidates = suggest_reconciliation_candidates(&mut conn, "T1", 5).await.unwrap();
        let ids: Vec<_> = candidates.iter().map(|c| c.load_external_id.as_str()).collect();
        assert_eq!(ids, vec!["L1", "L2"]);
        assert_eq!(candidates[0].score, 94);
        assert_eq!(candidates[1].score, 60);

        assert!(suggest_reconciliation_candidates(&mut conn, "NOPE", 5).await.unwrap().is_empty());
    }
}
