//! Credential endpoints: cookie login and bearer token issuance. Both answer every
//! credential failure with the same generic 400.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use tracing::{error, info};

use super::models::{CredentialModel, TokenResponse};
use super::AppState;
use crate::error::{AppError, AppResult};
use crate::identity::{AuthScheme, IssuedToken, LoginRequest, Principal, TokenError, TokenIssuer, VerifiedLogin};

fn verify(state: &AppState, payload: Result<Json<CredentialModel>, JsonRejection>) -> AppResult<VerifiedLogin> {
    let Json(model) = payload.map_err(|e| AppError::invalid_field("body", e.body_text()))?;
    model.validate()?;
    let req = LoginRequest { username: model.username.unwrap_or_default(), password: model.password.unwrap_or_default() };
    Ok(state.auth.login(&req)?)
}

fn session_response(state: &AppState, login: VerifiedLogin) -> AppResult<Response> {
    let principal = Principal::new(login.identity.username.clone(), login.claims, AuthScheme::Cookie);
    let session = state.sessions.issue(principal, Utc::now()).map_err(|e| AppError::internal(e.to_string()))?;
    let cookie = HeaderValue::from_str(&session.cookie()).map_err(|e| AppError::internal(e.to_string()))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, cookie);
    info!(target: "auth", user = %login.identity.username, "cookie login");
    Ok((headers, Json(serde_json::json!({"status":"ok"}))).into_response())
}

pub(crate) async fn login(State(state): State<AppState>, payload: Result<Json<CredentialModel>, JsonRejection>) -> Response {
    match verify(&state, payload).and_then(|login| session_response(&state, login)) {
        Ok(r) => r,
        Err(e) => e.into_response(),
    }
}

pub(crate) async fn token(State(state): State<AppState>, payload: Result<Json<CredentialModel>, JsonRejection>) -> Response {
    let login = match verify(&state, payload) {
        Ok(l) => l,
        Err(e) => return e.into_response(),
    };
    let settings = state.config.snapshot();
    token_response(&login, TokenIssuer::new(&settings.tokens).issue(&login.identity, &login.claims, Utc::now()))
}

/// Signing failures are logged and answered like any other failed login.
fn token_response(login: &VerifiedLogin, issued: Result<IssuedToken, TokenError>) -> Response {
    match issued {
        Ok(issued) => {
            info!(target: "auth", user = %login.identity.username, expires = %issued.expiration, "token issued");
            Json(TokenResponse { token: issued.token, expiration: issued.expiration }).into_response()
        }
        Err(e) => {
            error!(target: "auth", user = %login.identity.username, error = %e, "token signing failed");
            AppError::InvalidCredentials.into_response()
        }
    }
}
