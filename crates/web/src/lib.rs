use std::{sync::Arc, time::Duration};

use axum::{middleware, Router};
use env::Env;
use eyre::{Context as _, Result};
use hostel::Hostel;
use jwt::Jwt;
use log::{error, info};
use model::rights::Role;

use crate::{auth::Claims, error::ApiError};

pub mod attendance;
pub mod auth;
pub mod billing;
pub mod complaints;
pub mod error;
pub mod jwt;
pub mod students;
pub mod view;

#[derive(Clone)]
pub struct AppState {
    pub hostel: Hostel,
    pub jwt: Arc<Jwt>,
    pub admin_key: Arc<str>,
    pub token_ttl: Duration,
}

impl AppState {
    pub fn new(hostel: Hostel, env: &Env) -> Self {
        AppState {
            hostel,
            jwt: Arc::new(Jwt::new(env.jwt_secret())),
            admin_key: Arc::from(env.admin_key()),
            token_ttl: env.token_ttl(),
        }
    }

    pub fn issue(&self, sub: String, role: Role) -> Result<String, ApiError> {
        let claims = Claims::new(sub, role, self.token_ttl);
        self.jwt
            .make_jwt(&claims)
            .map(|jwt| jwt.token)
            .map_err(|err| {
                error!("Failed to sign token: {:#}", err);
                ApiError::internal("Failed to sign token")
            })
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(students::routes())
        .merge(attendance::routes())
        .merge(billing::routes())
        .merge(complaints::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware,
        ));
    Router::new()
        .merge(auth::routes())
        .merge(protected)
        .with_state(state)
}

pub async fn serve(hostel: Hostel, env: &Env) -> Result<()> {
    let app = router(AppState::new(hostel, env));
    let listener = tokio::net::TcpListener::bind(env.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", env.bind_addr()))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
