//! Shared harness: a seeded server on an ephemeral port plus a few request helpers.
#![allow(dead_code)]

use std::net::SocketAddr;

use anyhow::Result;
use reqwest::{Client, Response};
use serde_json::{json, Value};

use codecamp::config::{ConfigHandle, Settings, SettingsSource, TokenSettings};
use codecamp::identity::NewIdentity;
use codecamp::seed::{SEED_PASSWORD, SEED_USER};
use codecamp::server::{build_state, serve, AppState};
use codecamp::versioning::ApiVersion;

pub const OTHER_USER: &str = "shawn";
pub const OTHER_PASSWORD: &str = "Sh@wnPass1";

pub fn test_settings() -> Settings {
    Settings {
        tokens: TokenSettings {
            key: "integration-test-signing-key-0123456789abcdef".into(),
            issuer: "http://codecamp.test".into(),
            audience: "http://codecamp.test".into(),
        },
        default_version: ApiVersion::new(1, 1),
        http_port: 0,
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub client: Client,
}

pub async fn start() -> Result<TestServer> {
    start_with(ConfigHandle::with_settings(test_settings(), SettingsSource::none())).await
}

pub async fn start_with(config: ConfigHandle) -> Result<TestServer> {
    let state = build_state(config)?;
    // A second, non-privileged identity.
    state.identities.create_user(
        NewIdentity { username: OTHER_USER.into(), first_name: "Shawn".into(), last_name: "W".into(), email: "shawn@example.com".into() },
        OTHER_PASSWORD,
    )?;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(serve(listener, state.clone()));
    Ok(TestServer { addr, state, client: Client::new() })
}

impl TestServer {
    pub fn url(&self, path: &str) -> String { format!("http://{}{}", self.addr, path) }

    pub async fn token_for(&self, username: &str, password: &str) -> Result<String> {
        let resp = self
            .client
            .post(self.url("/api/auth/token"))
            .json(&json!({"userName": username, "password": password}))
            .send()
            .await?;
        anyhow::ensure!(resp.status() == 200, "token request failed: {}", resp.status());
        let body: Value = resp.json().await?;
        Ok(body["token"].as_str().unwrap_or_default().to_string())
    }

    pub async fn admin_token(&self) -> Result<String> { self.token_for(SEED_USER, SEED_PASSWORD).await }

    pub async fn other_token(&self) -> Result<String> { self.token_for(OTHER_USER, OTHER_PASSWORD).await }

    pub fn seed_speaker_id(&self) -> i32 {
        use codecamp::storage::CampRepository;
        self.state.store.repository().speakers(codecamp::seed::SEED_CAMP)[0].id
    }
}

/// Status plus JSON body (Null when the body is empty or not JSON).
pub async fn read(resp: Response) -> Result<(u16, Value)> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    Ok((status, serde_json::from_str(&text).unwrap_or(Value::Null)))
}
