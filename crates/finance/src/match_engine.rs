use chrono::NaiveDate;
use haulbook_core::{BankTransaction, LoadId, Money};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// Score lost per currency unit of amount difference.
pub const AMOUNT_GAP_WEIGHT: i64 = 2;
/// Score lost per day between load and transaction.
pub const DAY_GAP_WEIGHT: i64 = 3;
pub const MAX_SCORE: i64 = 100;

#[derive(Debug, Clone)]
pub struct MatchableLoad {
    pub id: LoadId,
    pub external_id: String,
    pub load_date: NaiveDate,
    pub amount_gross: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationCandidate {
    pub load_id: LoadId,
    pub load_external_id: String,
    pub load_date: NaiveDate,
    pub amount_gross: Money,
    pub amount_gap: Money,
    pub day_gap: i64,
    pub score: u8,
}

/// `max(0, 100 - trunc(amount_gap * 2 + day_gap * 3))`.
pub fn score(amount_gap: Decimal, day_gap: i64) -> u8 {
    let penalty = amount_gap.abs() * Decimal::from(AMOUNT_GAP_WEIGHT)
        + Decimal::from(day_gap.saturating_abs().saturating_mul(DAY_GAP_WEIGHT));
    let penalty = penalty.trunc().to_i64().unwrap_or(i64::MAX);
    let score = MAX_SCORE.saturating_sub(penalty).clamp(0, MAX_SCORE);
    u8::try_from(score).unwrap_or(0)
}

/// Ranks loads by closeness to the transaction: smallest amount gap first,
/// then smallest day gap, then lowest load id. Keeps at most `limit`.
pub fn rank_candidates(
    txn: &BankTransaction,
    loads: &[MatchableLoad],
    limit: usize,
) -> Vec<ReconciliationCandidate> {
    let mut gaps: Vec<(&MatchableLoad, Decimal, i64)> = loads
        .iter()
        .map(|load| {
            let amount_gap = (load.amount_gross.amount() - txn.amount.amount()).abs();
            let day_gap = (load.load_date - txn.txn_date).num_days().abs();
            (load, amount_gap, day_gap)
        })
        .collect();

    gaps.sort_by(|a, b| {
        a.1.cmp(&b.1)
            .then(a.2.cmp(&b.2))
            .then(a.0.id.cmp(&b.0.id))
    });

    gaps.into_iter()
        .take(limit)
        .map(|(load, amount_gap, day_gap)| ReconciliationCandidate {
            load_id: load.id,
            load_external_id: load.external_id.clone(),
            load_date: load.load_date,
            amount_gross: load.amount_gross,
            amount_gap: Money::from_decimal(amount_gap),
            day_gap,
            score: score(amount_gap, day_gap),
        })
        .collect()
}
