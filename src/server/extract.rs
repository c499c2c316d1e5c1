//! Request preamble shared by every versioned endpoint: settings snapshot, caller
//! identity, requested version, query string and raw body.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRequest, Query, Request};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::AppState;
use crate::config::Settings;
use crate::error::AppResult;
use crate::identity::{session_from_cookie_header, Principal, RequestContext, TokenIssuer};
use crate::versioning::{read_version, RequestedVersion};

pub struct ApiCall {
    /// Captured once; a reload mid-request does not affect this request.
    pub settings: Arc<Settings>,
    /// Kept unresolved so the dispatcher can report it after the supported-versions lookup.
    pub version: AppResult<RequestedVersion>,
    pub ctx: RequestContext,
    pub query: HashMap<String, String>,
    pub body: Bytes,
    pub now: DateTime<Utc>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim()).filter(|t| !t.is_empty())
}

/// Caller behind the request. A valid bearer token wins over the session cookie; invalid
/// or expired credentials leave the request anonymous.
pub fn identify(state: &AppState, settings: &Settings, headers: &HeaderMap, now: DateTime<Utc>) -> Option<Principal> {
    if let Some(token) = bearer_token(headers) {
        match TokenIssuer::new(&settings.tokens).validate(token, now) {
            Ok(p) => return Some(p),
            Err(e) => debug!(target: "auth", error = %e, "bearer token ignored"),
        }
    }
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    let sid = session_from_cookie_header(cookies)?;
    let principal = state.sessions.validate(sid, now);
    if principal.is_none() {
        debug!(target: "auth", "session cookie ignored");
    }
    principal
}

fn base_url(headers: &HeaderMap) -> String {
    let host = headers.get(header::HOST).and_then(|h| h.to_str().ok()).unwrap_or("localhost");
    format!("http://{}", host)
}

impl FromRequest<AppState> for ApiCall {
    type Rejection = Response;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let now = Utc::now();
        let settings = state.config.snapshot();
        let headers = req.headers().clone();
        let query = Query::<HashMap<String, String>>::try_from_uri(req.uri()).map(|q| q.0).unwrap_or_default();
        let ctx = RequestContext {
            principal: identify(state, &settings, &headers, now),
            request_id: uuid::Uuid::new_v4().to_string(),
            base_url: base_url(&headers),
        };
        debug!(
            target: "api",
            request_id = %ctx.request_id,
            method = %req.method(),
            path = %req.uri().path(),
            user = ctx.user().unwrap_or("<anonymous>"),
            "request"
        );
        let version = read_version(&headers, settings.default_version);
        let body = Bytes::from_request(req, state).await.map_err(IntoResponse::into_response)?;
        Ok(Self { settings, version, ctx, query, body, now })
    }
}
