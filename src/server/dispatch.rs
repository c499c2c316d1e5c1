//! Versioned action dispatch: resolve the variant, gate it, run it, report supported versions.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use futures_util::FutureExt; // for catch_unwind on async blocks
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use super::extract::ApiCall;
use super::AppState;
use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::identity::{Principal, RequestContext};
use crate::versioning::{format_versions, Action, ApiVersion, Family, SUPPORTED_VERSIONS_HEADER};

/// Path segments a route captured.
#[derive(Debug, Clone, Default)]
pub struct RouteParams {
    pub moniker: String,
    pub speaker_id: Option<i32>,
    pub id: Option<i32>,
}

/// Everything a resolved handler variant gets to work with.
pub struct ActionRequest {
    pub state: AppState,
    pub settings: Arc<Settings>,
    pub version: ApiVersion,
    pub ctx: RequestContext,
    pub params: RouteParams,
    pub query: HashMap<String, String>,
    pub body: axum::body::Bytes,
    pub now: DateTime<Utc>,
}

pub type ActionHandler = fn(ActionRequest) -> BoxFuture<'static, AppResult<Response>>;

impl ActionRequest {
    /// Caller identity; the gate has already run, so this only fails on anonymous actions.
    pub fn principal(&self) -> AppResult<&Principal> {
        self.ctx.principal.as_ref().ok_or_else(|| AppError::unauthenticated("Authentication is required"))
    }

    pub fn id(&self) -> AppResult<i32> {
        self.params.id.ok_or_else(|| AppError::not_found("Resource id missing"))
    }

    pub fn speaker_id(&self) -> AppResult<i32> {
        self.params.speaker_id.ok_or_else(|| AppError::not_found("Speaker id missing"))
    }

    /// Boolean query flag, e.g. `?includeTalks=true`. Absent or unparseable is false.
    pub fn flag(&self, name: &str) -> bool {
        self.query
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn json<T: DeserializeOwned>(&self) -> AppResult<T> {
        if self.body.is_empty() {
            return Err(AppError::invalid_field("body", "A request body is required."));
        }
        serde_json::from_slice(&self.body).map_err(|e| AppError::invalid_field("body", e.to_string()))
    }
}

pub fn ok<T: Serialize>(body: T) -> AppResult<Response> { Ok(Json(body).into_response()) }

pub fn created<T: Serialize>(location: &str, body: T) -> AppResult<Response> {
    let location = HeaderValue::from_str(location).map_err(|e| AppError::internal(e.to_string()))?;
    let mut resp = (StatusCode::CREATED, Json(body)).into_response();
    resp.headers_mut().insert(axum::http::header::LOCATION, location);
    Ok(resp)
}

pub fn empty() -> AppResult<Response> { Ok(StatusCode::OK.into_response()) }

async fn run(state: AppState, call: ApiCall, family: Family, action: Action, params: RouteParams) -> AppResult<Response> {
    let default = call.settings.default_version;
    let requested = call.version?;
    let (version, handler) = {
        let resolved = state.table.resolve(family, action, requested, default)?;
        state.policies.evaluate(call.ctx.principal.as_ref(), resolved.gate)?;
        (resolved.version, *resolved.handler)
    };
    let req = ActionRequest {
        state,
        settings: call.settings,
        version,
        ctx: call.ctx,
        params,
        query: call.query,
        body: call.body,
        now: call.now,
    };
    match AssertUnwindSafe(handler(req)).catch_unwind().await {
        Ok(result) => result,
        Err(panic_payload) => {
            // Convert panics to a 500 error response without crashing the server task
            let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() { *s }
                      else if let Some(s) = panic_payload.downcast_ref::<String>() { s.as_str() }
                      else { "panic" };
            error!(target: "panic", family = family.as_str(), ?action, "handler panic: {}", msg);
            Err(AppError::internal("handler panicked"))
        }
    }
}

/// Run `family/action` for one request and stamp the supported-versions header on the
/// response, errors included.
pub async fn dispatch(state: AppState, call: ApiCall, family: Family, action: Action, params: RouteParams) -> Response {
    let supported = state.table.supported_versions(family, action, call.settings.default_version);
    let mut resp = match run(state, call, family, action, params).await {
        Ok(r) => r,
        Err(e) => e.into_response(),
    };
    if let Ok(v) = HeaderValue::from_str(&format_versions(&supported)) {
        resp.headers_mut().insert(SUPPORTED_VERSIONS_HEADER, v);
    }
    resp
}

