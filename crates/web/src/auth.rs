use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse as _, Response},
    routing::post,
    Json, Router,
};
use bson::oid::ObjectId;
use chrono::Utc;
use hostel::service::students::Profile;
use log::warn;
use model::{rights::Role, student::Registration};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

const ADMIN_SUBJECT: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: u64,
}

impl Claims {
    pub fn new(sub: String, role: Role, ttl: Duration) -> Self {
        Claims {
            sub,
            role,
            exp: Utc::now().timestamp().max(0) as u64 + ttl.as_secs(),
        }
    }

    /// Id of the student the token was issued to.
    pub fn student_id(&self) -> Result<ObjectId, ApiError> {
        if self.role != Role::Student {
            return Err(ApiError::new(
                StatusCode::FORBIDDEN,
                "only students have their own records",
            ));
        }
        ObjectId::parse_str(&self.sub).map_err(|_| ApiError::unauthorized())
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/admin", post(admin_login))
        .route("/auth/register", post(register))
}

/// Rejects requests without a valid bearer token and stores the claims as a
/// request extension.
pub async fn middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let claims = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| eyre::eyre!("No authorization header"))
        .and_then(|header| state.jwt.claims::<Claims>(header));
    match claims {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            warn!("Unauthorized request to {}: {}", request.uri().path(), err);
            sleep(Duration::from_secs(1)).await;
            ApiError::unauthorized().into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminForm {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub role: Role,
    pub student_id: Option<String>,
}

pub async fn login(State(state): State<AppState>, Json(form): Json<LoginForm>) -> ApiResult<Session> {
    let profile = state
        .hostel
        .students
        .authenticate(&form.email, &form.password)
        .await?;
    let student_id = profile.id.to_hex();
    let token = state.issue(student_id.clone(), Role::Student)?;
    Ok(Json(Session {
        token,
        role: Role::Student,
        student_id: Some(student_id),
    }))
}

pub async fn admin_login(
    State(state): State<AppState>,
    Json(form): Json<AdminForm>,
) -> ApiResult<Session> {
    if form.key != state.admin_key.as_ref() {
        warn!("Failed admin login");
        sleep(Duration::from_secs(1)).await;
        return Err(ApiError::unauthorized());
    }
    let token = state.issue(ADMIN_SUBJECT.to_owned(), Role::Admin)?;
    Ok(Json(Session {
        token,
        role: Role::Admin,
        student_id: None,
    }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<Registration>,
) -> ApiResult<Profile> {
    Ok(Json(state.hostel.students.register(form).await?))
}
