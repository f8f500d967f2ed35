use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{
    aggregation::{self, BreakdownEntry, Stats, TrendPoint},
    api_errors::AppError,
    app_state::AppState,
    policy::Operation,
    record::LogRecord,
    security::CurrentUser,
};

async fn scan(st: &AppState, client_message: &str) -> Result<Vec<LogRecord>, AppError> {
    st.ledger
        .get_all()
        .await
        .map_err(|e| AppError::from_domain(e, client_message, false))
}

pub async fn stats(
    State(st): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Stats>, AppError> {
    user.require(Operation::Stats)?;
    let records = scan(&st, "Failed to get stats").await?;
    Ok(Json(aggregation::stats(&records, &st.aggregation)))
}

pub async fn trends(
    State(st): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<TrendPoint>>, AppError> {
    user.require(Operation::Trends)?;
    let records = scan(&st, "Failed to get trends").await?;
    Ok(Json(aggregation::trends(&records, st.aggregation.trend_order)))
}

pub async fn violation_breakdown(
    State(st): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<BreakdownEntry>>, AppError> {
    user.require(Operation::ViolationBreakdown)?;
    let records = scan(&st, "Failed to get breakdown").await?;
    Ok(Json(aggregation::violation_breakdown(&records)))
}

pub async fn recent_violations(
    State(st): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<LogRecord>>, AppError> {
    user.require(Operation::RecentViolations)?;
    let records = scan(&st, "Failed to get recent violations").await?;
    Ok(Json(aggregation::recent_violations(
        &records,
        st.aggregation.recent_limit,
    )))
}
