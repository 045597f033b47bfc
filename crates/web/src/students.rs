use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use hostel::service::students::{Profile, StudentRow};
use model::rights::Role;
use serde::{Deserialize, Serialize};

use crate::{
    auth::Claims,
    error::{ApiError, ApiResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/students", get(list))
        .route("/students/count", get(count))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct Count {
    pub count: u64,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<StudentRow>> {
    claims.role.ensure(Role::Admin)?;
    Ok(Json(state.hostel.students.list_students(params.limit).await))
}

pub async fn count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Count> {
    claims.role.ensure(Role::Admin)?;
    Ok(Json(Count {
        count: state.hostel.students.count_students().await,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Profile> {
    let id = claims.student_id()?;
    state
        .hostel
        .students
        .profile(&id.to_hex())
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Student not found"))
}
