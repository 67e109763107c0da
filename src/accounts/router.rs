use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::domain::{Account, AccountId};
use super::import::ImportRecord;
use super::repository::AccountRepository;
use super::service::{
    CollectionsService, ImportSummary, ReevaluationReport, StrategyTestResult,
};
use crate::error::AppError;
use crate::strategy::{SavedStrategy, StrategyDraft, StrategyGraph};

/// Header naming the operator or job behind a request; recorded in logs.
pub const TRIGGERED_BY_HEADER: &str = "x-triggered-by";
const DEFAULT_TRIGGER: &str = "api";

/// Import body: a bare list of records or `{"records": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ImportPayload {
    Records(Vec<ImportRecord>),
    Wrapped { records: Vec<ImportRecord> },
}

impl ImportPayload {
    fn into_records(self) -> Vec<ImportRecord> {
        match self {
            ImportPayload::Records(records) | ImportPayload::Wrapped { records } => records,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StrategyTestRequest {
    pub graph: StrategyGraph,
    pub account: Account,
}

#[derive(Debug, Serialize)]
pub struct ActivationResponse {
    pub strategy: SavedStrategy,
    pub reevaluation: ReevaluationReport,
}

/// Router exposing the collection queue and strategy management endpoints.
pub fn collections_router<R>(service: Arc<CollectionsService<R>>) -> Router
where
    R: AccountRepository + 'static,
{
    Router::new()
        .route("/api/v1/accounts", get(list_accounts::<R>))
        .route("/api/v1/accounts/import", post(import_accounts::<R>))
        .route("/api/v1/accounts/:account_id", get(account_detail::<R>))
        .route("/api/v1/strategy/apply", post(apply_strategy::<R>))
        .route(
            "/api/v1/strategies",
            get(list_strategies::<R>).post(save_strategy::<R>),
        )
        .route("/api/v1/strategies/test", post(test_strategy::<R>))
        .route("/api/v1/strategies/deactivate", post(deactivate_strategy::<R>))
        .route(
            "/api/v1/strategies/:strategy_id/activate",
            post(activate_strategy::<R>),
        )
        .with_state(service)
}

fn triggered_by(headers: &HeaderMap) -> String {
    headers
        .get(TRIGGERED_BY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_TRIGGER)
        .to_string()
}

pub(crate) async fn list_accounts<R>(
    State(service): State<Arc<CollectionsService<R>>>,
) -> Result<Json<Vec<Account>>, AppError>
where
    R: AccountRepository + 'static,
{
    Ok(Json(service.accounts()?))
}

pub(crate) async fn account_detail<R>(
    State(service): State<Arc<CollectionsService<R>>>,
    Path(account_id): Path<String>,
) -> Result<Json<Account>, AppError>
where
    R: AccountRepository + 'static,
{
    Ok(Json(service.account(&AccountId::new(account_id))?))
}

pub(crate) async fn import_accounts<R>(
    State(service): State<Arc<CollectionsService<R>>>,
    headers: HeaderMap,
    Json(payload): Json<ImportPayload>,
) -> Result<Json<ImportSummary>, AppError>
where
    R: AccountRepository + 'static,
{
    let records = payload.into_records();
    Ok(Json(service.import(&records, &triggered_by(&headers))?))
}

pub(crate) async fn apply_strategy<R>(
    State(service): State<Arc<CollectionsService<R>>>,
    headers: HeaderMap,
) -> Result<Json<ReevaluationReport>, AppError>
where
    R: AccountRepository + 'static,
{
    Ok(Json(service.apply_strategy(&triggered_by(&headers))?))
}

pub(crate) async fn list_strategies<R>(
    State(service): State<Arc<CollectionsService<R>>>,
) -> Result<Json<Vec<SavedStrategy>>, AppError>
where
    R: AccountRepository + 'static,
{
    Ok(Json(service.list_strategies()?))
}

pub(crate) async fn save_strategy<R>(
    State(service): State<Arc<CollectionsService<R>>>,
    headers: HeaderMap,
    Json(mut draft): Json<StrategyDraft>,
) -> Result<Response, AppError>
where
    R: AccountRepository + 'static,
{
    let trigger = triggered_by(&headers);
    if draft.created_by.trim().is_empty() {
        draft.created_by = trigger.clone();
    }
    let saved = service.save_strategy(draft, &trigger)?;
    Ok((StatusCode::CREATED, Json(saved)).into_response())
}

pub(crate) async fn activate_strategy<R>(
    State(service): State<Arc<CollectionsService<R>>>,
    Path(strategy_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ActivationResponse>, AppError>
where
    R: AccountRepository + 'static,
{
    let (strategy, reevaluation) =
        service.activate_strategy(&strategy_id, &triggered_by(&headers))?;
    Ok(Json(ActivationResponse {
        strategy,
        reevaluation,
    }))
}

pub(crate) async fn deactivate_strategy<R>(
    State(service): State<Arc<CollectionsService<R>>>,
    headers: HeaderMap,
) -> Result<Json<ReevaluationReport>, AppError>
where
    R: AccountRepository + 'static,
{
    Ok(Json(service.deactivate_strategy(&triggered_by(&headers))?))
}

pub(crate) async fn test_strategy<R>(
    State(service): State<Arc<CollectionsService<R>>>,
    Json(request): Json<StrategyTestRequest>,
) -> Json<StrategyTestResult>
where
    R: AccountRepository + 'static,
{
    Json(service.test_strategy(&request.graph, &request.account))
}
