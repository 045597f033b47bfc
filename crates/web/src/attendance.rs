use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use hostel::service::attendance::MarkOutcome;
use model::{
    attendance::{MarkEntry, MonthlyAttendanceSummary},
    ids::{DayId, MonthId},
    rights::Role,
};
use serde::Deserialize;

use crate::{
    auth::Claims,
    error::{ApiError, ApiResult},
    view::{DayRecordView, RosterEntry},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/attendance", get(monthly))
        .route("/attendance/roster", get(roster))
        .route("/attendance/day", get(day))
        .route("/attendance/mark", post(mark))
        .route("/me/attendance", get(my_attendance))
}

#[derive(Debug, Deserialize, Default)]
pub struct MonthParams {
    pub month: Option<MonthId>,
}

#[derive(Debug, Deserialize)]
pub struct DayParams {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct MarkForm {
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub records: Vec<MarkEntry>,
}

pub async fn monthly(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<MonthParams>,
) -> ApiResult<Vec<MonthlyAttendanceSummary>> {
    claims.role.ensure(Role::Admin)?;
    Ok(Json(
        state.hostel.attendance.monthly_attendance(params.month).await,
    ))
}

pub async fn roster(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<RosterEntry>> {
    claims.role.ensure(Role::Admin)?;
    let roster = state.hostel.attendance.roster().await;
    Ok(Json(roster.iter().map(RosterEntry::from).collect()))
}

pub async fn day(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<DayParams>,
) -> ApiResult<Vec<DayRecordView>> {
    claims.role.ensure(Role::Admin)?;
    let records = state
        .hostel
        .attendance
        .records_for_date(DayId::from_date(params.date))
        .await;
    Ok(Json(records.iter().map(DayRecordView::from).collect()))
}

pub async fn mark(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(form): Json<MarkForm>,
) -> Result<Response, ApiError> {
    claims.role.ensure(Role::Admin)?;
    let outcome = state
        .hostel
        .attendance
        .mark_daily(form.date.map(DayId::from_date), &form.records)
        .await;
    let status = match outcome {
        MarkOutcome::Saved { .. } => StatusCode::OK,
        MarkOutcome::Partial { .. } => StatusCode::MULTI_STATUS,
        MarkOutcome::Rejected(_) => StatusCode::BAD_REQUEST,
        MarkOutcome::StorageFailure { duplicate: true, .. } => StatusCode::CONFLICT,
        MarkOutcome::StorageFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((status, Json(outcome.report())).into_response())
}

pub async fn my_attendance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<MonthParams>,
) -> ApiResult<MonthlyAttendanceSummary> {
    let id = claims.student_id()?;
    state
        .hostel
        .attendance
        .student_monthly_attendance(&id.to_hex(), params.month)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Attendance not available"))
}
