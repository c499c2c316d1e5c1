//!
//! codecamp HTTP server
//! --------------------
//! This module defines the Axum-based HTTP API for camps, speakers and talks.
//!
//! Responsibilities:
//! - Cookie login and bearer token issuance backed by the `identity` module.
//! - Versioned resource endpoints routed through one dispatch table, gated per action.
//! - Configuration reload without restart.
//! - First-run seed data and startup logging.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::routing::{get, options, post};
use axum::Router;
use futures_util::FutureExt;
use tracing::info;

use crate::config::{ConfigHandle, SettingsSource};
use crate::identity::{AuthProvider, Gate, IdentityStore, LocalAuthProvider, PolicyRegistry, SessionManager, SUPER_USER_POLICY};
use crate::seed;
use crate::storage::SharedStore;
use crate::versioning::{Action, ApiVersion, Controller, DispatchTable, Family, TableError};

pub mod auth;
pub mod camps;
pub mod dispatch;
pub mod extract;
pub mod models;
pub mod operations;
pub mod speakers;
pub mod talks;

use dispatch::{dispatch, ActionHandler, ActionRequest, RouteParams};
use extract::ApiCall;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub identities: IdentityStore,
    pub auth: Arc<dyn AuthProvider>,
    pub sessions: SessionManager,
    pub config: ConfigHandle,
    pub policies: Arc<PolicyRegistry>,
    pub table: Arc<DispatchTable<ActionHandler>>,
}

/// Every versioned action the API serves, by family.
pub fn dispatch_table(policies: &PolicyRegistry) -> Result<DispatchTable<ActionHandler>, TableError> {
    let v = ApiVersion::new;
    let super_user = Gate::Policy(SUPER_USER_POLICY);

    // Camps declare no versions: they follow the configured default.
    let camps = Controller::<ActionHandler>::new(Family::Camps)
        .action(Action::List, Gate::Anonymous, |r: ActionRequest| camps::list(r).boxed())
        .action(Action::Get, Gate::Anonymous, |r: ActionRequest| camps::get(r).boxed())
        .action(Action::Create, super_user.clone(), |r: ActionRequest| camps::create(r).boxed())
        .action(Action::Update, super_user.clone(), |r: ActionRequest| camps::update(r).boxed())
        .action(Action::Delete, super_user, |r: ActionRequest| camps::delete(r).boxed());

    let speakers = Controller::<ActionHandler>::new(Family::Speakers)
        .version(v(1, 1))
        .version(v(1, 2))
        .pinned(Action::List, &[v(1, 1)], Gate::Anonymous, |r: ActionRequest| speakers::list_with_count(r).boxed())
        .pinned(Action::List, &[v(1, 2)], Gate::Anonymous, |r: ActionRequest| speakers::list_plain(r).boxed())
        .action(Action::Get, Gate::Anonymous, |r: ActionRequest| speakers::get(r).boxed())
        .action(Action::Create, Gate::Authenticated, |r: ActionRequest| speakers::create(r).boxed())
        .action(Action::Update, Gate::Authenticated, |r: ActionRequest| speakers::update(r).boxed())
        .action(Action::Delete, Gate::Authenticated, |r: ActionRequest| speakers::delete(r).boxed());
    let speakers2 = speakers
        .derive(&[v(2, 0)])
        .override_action(Action::List, Gate::Anonymous, |r: ActionRequest| speakers::list_v2(r).boxed());

    let talks = Controller::<ActionHandler>::new(Family::Talks)
        .version(v(1, 0))
        .version(v(1, 1))
        .version(v(2, 0))
        .action(Action::List, Gate::Anonymous, |r: ActionRequest| talks::list(r).boxed())
        .action(Action::Get, Gate::Anonymous, |r: ActionRequest| talks::get(r).boxed())
        .pinned(Action::Create, &[v(2, 0)], Gate::Authenticated, |r: ActionRequest| talks::create(r).boxed())
        .action(Action::Update, Gate::Authenticated, |r: ActionRequest| talks::update(r).boxed())
        .action(Action::Delete, Gate::Authenticated, |r: ActionRequest| talks::delete(r).boxed());

    DispatchTable::build(vec![camps, speakers, speakers2, talks], policies)
}

/// Seed the stores and assemble the state. Fails if seeding or the dispatch table does.
pub fn build_state(config: ConfigHandle) -> anyhow::Result<AppState> {
    let identities = IdentityStore::new();
    seed::seed_identities(&identities).context("seeding identities")?;
    let store = SharedStore::new();
    seed::seed_camps(&store).context("seeding camps")?;
    let policies = PolicyRegistry::standard();
    let table = dispatch_table(&policies).context("building dispatch table")?;
    Ok(AppState {
        store,
        auth: Arc::new(LocalAuthProvider::new(identities.clone())),
        identities,
        sessions: SessionManager::default(),
        config,
        policies: Arc::new(policies),
        table: Arc::new(table),
    })
}

pub fn router(state: AppState) -> Router {
    let top = |family: Family, action: Action| {
        move |State(state): State<AppState>, call: ApiCall| dispatch(state, call, family, action, RouteParams::default())
    };
    let camp = |family: Family, action: Action| {
        move |State(state): State<AppState>, Path(moniker): Path<String>, call: ApiCall| {
            dispatch(state, call, family, action, RouteParams { moniker, ..RouteParams::default() })
        }
    };
    let speaker = |family: Family, action: Action| {
        move |State(state): State<AppState>, Path((moniker, speaker_id)): Path<(String, i32)>, call: ApiCall| {
            let params = match family {
                Family::Talks => RouteParams { moniker, speaker_id: Some(speaker_id), id: None },
                _ => RouteParams { moniker, speaker_id: None, id: Some(speaker_id) },
            };
            dispatch(state, call, family, action, params)
        }
    };
    let talk = |action: Action| {
        move |State(state): State<AppState>, Path((moniker, speaker_id, id)): Path<(String, i32, i32)>, call: ApiCall| {
            dispatch(state, call, Family::Talks, action, RouteParams { moniker, speaker_id: Some(speaker_id), id: Some(id) })
        }
    };

    Router::new()
        .route("/api/camps", get(top(Family::Camps, Action::List)).post(top(Family::Camps, Action::Create)))
        .route(
            "/api/camps/{moniker}",
            get(camp(Family::Camps, Action::Get))
                .put(camp(Family::Camps, Action::Update))
                .patch(camp(Family::Camps, Action::Update))
                .delete(camp(Family::Camps, Action::Delete)),
        )
        .route(
            "/api/camps/{moniker}/speakers",
            get(camp(Family::Speakers, Action::List)).post(camp(Family::Speakers, Action::Create)),
        )
        .route(
            "/api/camps/{moniker}/speakers/{speaker_id}",
            get(speaker(Family::Speakers, Action::Get))
                .put(speaker(Family::Speakers, Action::Update))
                .delete(speaker(Family::Speakers, Action::Delete)),
        )
        .route(
            "/api/camps/{moniker}/speakers/{speaker_id}/talks",
            get(speaker(Family::Talks, Action::List)).post(speaker(Family::Talks, Action::Create)),
        )
        .route(
            "/api/camps/{moniker}/speakers/{speaker_id}/talks/{id}",
            get(talk(Action::Get)).put(talk(Action::Update)).delete(talk(Action::Delete)),
        )
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/token", post(auth::token))
        .route("/api/operations/reloadConfig", options(operations::reload_config))
        .with_state(state)
}

/// Serve `state` on an already bound listener until the server stops.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Load settings from `source`, seed, and serve on the configured port.
pub async fn run_with_source(source: SettingsSource) -> anyhow::Result<()> {
    let config = ConfigHandle::load(source).context("loading configuration")?;
    let settings = config.snapshot();
    let state = build_state(config)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.http_port));
    info!(target: "codecamp", default_version = %settings.default_version, "Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, state).await
}

/// Convenience entry point reading `CODECAMP_SETTINGS` / `appsettings.json` and the environment.
pub async fn run() -> anyhow::Result<()> {
    run_with_source(SettingsSource::from_env()).await
}
