use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use haulbook_core::{
    BankAccountId, BankTransactionId, DriverId, ExpenseId, LedgerEntry, OwnerId, TruckId, WeekReference,
};
use haulbook_finance::{
    Dashboard, FinanceEngine, LoadRegistration, OpenLoadsSummary, PayablesReceivables,
    ReconciliationCandidate, ReconciliationOutcome, ReconciliationRequest, Summary, WeekClosing,
};
use haulbook_storage::{
    BankAccountInput, BankTransactionInput, DriverInput, ExpenseInput, LoadInput, OwnerInput, TruckInput,
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub engine: FinanceEngine,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/summary", get(summary))
        .route("/dashboard", get(dashboard))
        .route("/weeks/{week}/close", post(close_week))
        .route("/ledger", get(ledger))
        .route("/owners", post(register_owner))
        .route("/drivers", post(register_driver))
        .route("/trucks", post(register_truck))
        .route("/accounts", post(register_account))
        .route("/expenses", post(add_expense))
        .route("/loads", post(register_load))
        .route("/loads/open", get(open_loads))
        .route("/payables", get(payables))
        .route("/transactions", post(register_transaction))
        .route("/transactions/{external_id}/candidates", get(candidates))
        .route("/reconcile", post(reconcile))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct PartyQuery {
    owner_id: Option<String>,
    driver_id: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct CloseWeekQuery {
    entry_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct Registered<T> {
    id: T,
}

impl<T> Registered<T> {
    fn json(id: T) -> Json<Self> {
        Json(Self { id })
    }
}

async fn summary(State(state): State<AppState>) -> ApiResult<Summary> {
    Ok(Json(state.engine.build_summary().await?))
}

async fn dashboard(State(state): State<AppState>) -> ApiResult<Dashboard> {
    Ok(Json(state.engine.dashboard().await?))
}

async fn close_week(
    State(state): State<AppState>,
    Path(week): Path<String>,
    Query(query): Query<CloseWeekQuery>,
) -> ApiResult<WeekClosing> {
    if week.trim().is_empty() {
        return Err(ApiError::bad_request("week reference is required"));
    }
    let week = WeekReference::from(week.as_str());
    let closing = match query.entry_date {
        Some(date) => state.engine.close_week_on(&week, date).await?,
        None => state.engine.close_week(&week).await?,
    };
    Ok(Json(closing))
}

async fn ledger(State(state): State<AppState>, Query(query): Query<PartyQuery>) -> ApiResult<Vec<LedgerEntry>> {
    let entries = state
        .engine
        .get_ledger(query.owner_id.as_deref(), query.driver_id.as_deref(), query.limit)
        .await?;
    Ok(Json(entries))
}

async fn open_loads(State(state): State<AppState>, Query(query): Query<PartyQuery>) -> ApiResult<OpenLoadsSummary> {
    let open = state
        .engine
        .get_open_loads_summary(query.owner_id.as_deref(), query.driver_id.as_deref())
        .await?;
    Ok(Json(open))
}

async fn payables(State(state): State<AppState>, Query(query): Query<PartyQuery>) -> ApiResult<PayablesReceivables> {
    let result = state
        .engine
        .get_payables_receivables(query.owner_id.as_deref(), query.driver_id.as_deref())
        .await?;
    Ok(Json(result))
}

async fn register_owner(State(state): State<AppState>, Json(input): Json<OwnerInput>) -> ApiResult<Registered<OwnerId>> {
    Ok(Registered::json(state.engine.register_owner(&input).await?))
}

async fn register_driver(
    State(state): State<AppState>,
    Json(input): Json<DriverInput>,
) -> ApiResult<Registered<DriverId>> {
    Ok(Registered::json(state.engine.register_driver(&input).await?))
}

async fn register_truck(State(state): State<AppState>, Json(input): Json<TruckInput>) -> ApiResult<Registered<TruckId>> {
    Ok(Registered::json(state.engine.register_truck(&input).await?))
}

async fn register_account(
    State(state): State<AppState>,
    Json(input): Json<BankAccountInput>,
) -> ApiResult<Registered<BankAccountId>> {
    Ok(Registered::json(state.engine.register_bank_account(&input).await?))
}

async fn add_expense(State(state): State<AppState>, Json(input): Json<ExpenseInput>) -> ApiResult<Registered<ExpenseId>> {
    Ok(Registered::json(state.engine.add_expense(&input).await?))
}

async fn register_load(State(state): State<AppState>, Json(input): Json<LoadInput>) -> ApiResult<LoadRegistration> {
    Ok(Json(state.engine.register_load(&input).await?))
}

async fn register_transaction(
    State(state): State<AppState>,
    Json(input): Json<BankTransactionInput>,
) -> ApiResult<Registered<BankTransactionId>> {
    Ok(Registered::json(state.engine.register_bank_transaction(&input).await?))
}

async fn candidates(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    Query(query): Query<CandidateQuery>,
) -> ApiResult<Vec<ReconciliationCandidate>> {
    let candidates = state
        .engine
        .suggest_reconciliation_candidates(&external_id, query.limit)
        .await?;
    Ok(Json(candidates))
}

async fn reconcile(
    State(state): State<AppState>,
    Json(request): Json<ReconciliationRequest>,
) -> ApiResult<ReconciliationOutcome> {
    Ok(Json(state.engine.reconcile(&request).await?))
}
