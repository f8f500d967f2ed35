use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    api_errors::AppError,
    app_state::AppState,
    classifier::{Framework, ValidationStatus},
    integrity,
    policy::Operation,
    record::{IngestRequest, LogRecord},
    security::CurrentUser,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    success: bool,
    #[serde(rename = "logID")]
    log_id: String,
    framework: Framework,
    risk_score: u8,
    validated: Option<ValidationStatus>,
}

pub async fn ingest(
    State(st): State<Arc<AppState>>,
    user: CurrentUser,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, AppError> {
    let Json(req) = body.map_err(|rejection| {
        tracing::warn!("Rejected ingest body: {}", rejection.body_text());
        AppError::bad_request("Invalid request body")
    })?;
    let record = st
        .pipeline
        .ingest(&user.claims, req)
        .await
        .map_err(|e| AppError::from_domain(e, "Internal Server Error", false))?;

    Ok(Json(IngestResponse {
        success: true,
        log_id: record.log_id,
        framework: record.framework,
        risk_score: record.risk_score,
        validated: record.validated,
    }))
}

#[derive(Deserialize)]
pub struct ListQuery {
    user: Option<String>,
}

pub async fn list_logs(
    State(st): State<Arc<AppState>>,
    user: CurrentUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<LogRecord>>, AppError> {
    user.require(Operation::ListLogs)?;
    let result = match q.user.as_deref().filter(|u| !u.is_empty()) {
        Some(name) => st.ledger.query_by_user(name).await,
        None => st.ledger.get_all().await,
    };
    result
        .map(Json)
        .map_err(|e| AppError::from_domain(e, "Failed to fetch logs", false))
}

#[derive(Serialize)]
pub struct LogResponse {
    success: bool,
    data: LogRecord,
}

pub async fn get_log(
    State(st): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<LogResponse>, AppError> {
    user.require(Operation::ReadLog)?;
    let record = st
        .ledger
        .get_by_id(&id)
        .await
        .map_err(|e| AppError::from_domain(e, "Failed to read log", st.api.distinct_not_found))?;
    Ok(Json(LogResponse {
        success: true,
        data: record,
    }))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    success: bool,
}

pub async fn delete_log(
    State(st): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    user.require(Operation::DeleteLog)?;
    st.ledger
        .delete(&id)
        .await
        .map_err(|e| AppError::from_domain(e, "Failed to delete log", st.api.distinct_not_found))?;
    tracing::info!("Deleted log {} on behalf of {}", id, user.claims.sub);
    Ok(Json(DeleteResponse { success: true }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    success: bool,
    #[serde(rename = "logID")]
    log_id: String,
    valid: bool,
    stored_hash: String,
    computed_hash: String,
}

pub async fn verify_log(
    State(st): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<VerifyResponse>, AppError> {
    user.require(Operation::VerifyLog)?;
    let record = st
        .ledger
        .get_by_id(&id)
        .await
        .map_err(|e| AppError::from_domain(e, "Failed to verify log", st.api.distinct_not_found))?;

    let computed_hash = integrity::recompute(&record);
    let valid = integrity::verify(&record);
    if !valid {
        tracing::warn!("Integrity mismatch for log {}", record.log_id);
    }
    Ok(Json(VerifyResponse {
        success: true,
        log_id: record.log_id,
        valid,
        stored_hash: record.hash,
        computed_hash,
    }))
}
