use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use hostel::service::billing::MonthlyBill;
use model::rights::Role;

use crate::{
    attendance::MonthParams,
    auth::Claims,
    error::{ApiError, ApiResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/billing", get(bills))
        .route("/me/bill", get(my_bill))
}

pub async fn bills(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<MonthParams>,
) -> ApiResult<Vec<MonthlyBill>> {
    claims.role.ensure(Role::Admin)?;
    Ok(Json(state.hostel.billing.monthly_bills(params.month).await))
}

pub async fn my_bill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<MonthParams>,
) -> ApiResult<MonthlyBill> {
    let id = claims.student_id()?;
    state
        .hostel
        .billing
        .student_bill(&id.to_hex(), params.month)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Bill not available"))
}
