use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Extension, Json, Router,
};
use model::{
    complaint::{ComplaintDraft, ComplaintStatus},
    rights::Role,
};
use serde::{Deserialize, Serialize};
use storage::ComplaintQuery;

use crate::{
    auth::Claims,
    error::{ApiError, ApiResult},
    view::ComplaintRow,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/complaints", get(list).post(submit))
        .route("/complaints/:id/status", put(set_status))
        .route("/me/complaints", get(mine))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    pub status: Option<ComplaintStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ComplaintForm {
    /// Ignored for students, who always file for themselves.
    pub student_id: Option<String>,
    pub category: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<ComplaintRow>> {
    claims.role.ensure(Role::Admin)?;
    let views = match params.status {
        None => state.hostel.complaints.list_complaints().await,
        Some(status) => state
            .hostel
            .complaints
            .try_list_complaints(&ComplaintQuery {
                student: None,
                status: Some(status),
            })
            .await
            .map_err(|err| {
                log::error!("list_complaints failed: kind={} status={:?}", err.kind(), status);
                ApiError::internal("Failed to load complaints")
            })?,
    };
    Ok(Json(views.into_iter().map(ComplaintRow::from).collect()))
}

pub async fn mine(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<ComplaintRow>> {
    let id = claims.student_id()?;
    let views = state.hostel.complaints.student_complaints(id).await;
    Ok(Json(views.into_iter().map(ComplaintRow::from).collect()))
}

pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(form): Json<ComplaintForm>,
) -> ApiResult<Ack> {
    let student_id = if claims.role.is_admin() {
        form.student_id
            .ok_or_else(|| ApiError::bad_request("student_id is required"))?
    } else {
        claims.student_id()?.to_hex()
    };
    let draft = ComplaintDraft {
        student_id,
        category: form.category,
        description: form.description,
    };
    state.hostel.complaints.submit(&draft).await?;
    Ok(Json(Ack {
        success: true,
        message: "Complaint submitted successfully.".to_owned(),
    }))
}

pub async fn set_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(form): Json<StatusForm>,
) -> ApiResult<Ack> {
    claims.role.ensure(Role::Admin)?;
    state.hostel.complaints.set_status(&id, &form.status).await?;
    Ok(Json(Ack {
        success: true,
        message: format!("Complaint status updated to {}.", form.status.trim()),
    }))
}
