//! Configuration reload over HTTP: the new snapshot applies to later requests only, and a
//! broken file leaves the running configuration in place.

mod common;

use std::path::Path;

use anyhow::Result;
use serde_json::json;

use codecamp::config::{ConfigHandle, SettingsSource};
use common::{read, start_with};

fn write_settings(path: &Path, key: &str, default_version: &str) -> Result<()> {
    let body = json!({
        "Tokens": {"Key": key, "Issuer": "http://codecamp.test", "Audience": "http://codecamp.test"},
        "Versioning": {"DefaultVersion": default_version}
    });
    std::fs::write(path, serde_json::to_vec_pretty(&body)?)?;
    Ok(())
}

async fn reload(srv: &common::TestServer) -> Result<(u16, serde_json::Value)> {
    read(srv.client.request(reqwest::Method::OPTIONS, srv.url("/api/operations/reloadConfig")).send().await?).await
}

#[tokio::test]
async fn reload_switches_default_version() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("appsettings.json");
    write_settings(&path, "first-signing-key-0123456789abcdef", "1.1")?;
    let srv = start_with(ConfigHandle::load(SettingsSource::file(&path))?).await?;

    let (_, body) = read(srv.client.get(srv.url("/api/camps/ATL2016/speakers")).send().await?).await?;
    assert_eq!(body["count"], 1);

    write_settings(&path, "first-signing-key-0123456789abcdef", "1.2")?;
    let (status, body) = reload(&srv).await?;
    assert_eq!(status, 200);
    assert_eq!(body, "Configuration reloaded");

    let resp = srv.client.get(srv.url("/api/camps/ATL2016/speakers")).send().await?;
    let (_, body) = read(resp).await?;
    assert!(body.is_array());

    // camps follow the default, so their version moved too
    let resp = srv.client.get(srv.url("/api/camps")).send().await?;
    assert_eq!(resp.headers()["api-supported-versions"], "1.2");
    Ok(())
}

#[tokio::test]
async fn broken_file_keeps_previous_settings() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("appsettings.json");
    write_settings(&path, "first-signing-key-0123456789abcdef", "2.0")?;
    let srv = start_with(ConfigHandle::load(SettingsSource::file(&path))?).await?;

    std::fs::write(&path, r#"{"Tokens": {"Key": ""}}"#)?;
    let (status, body) = reload(&srv).await?;
    assert_eq!(status, 400);
    assert_eq!(body, "Could not reload configuration");

    let (_, body) = read(srv.client.get(srv.url("/api/camps/ATL2016/speakers")).send().await?).await?;
    assert!(body["currentTime"].is_string());
    Ok(())
}

#[tokio::test]
async fn rotated_key_invalidates_old_tokens() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("appsettings.json");
    write_settings(&path, "first-signing-key-0123456789abcdef", "1.1")?;
    let srv = start_with(ConfigHandle::load(SettingsSource::file(&path))?).await?;
    let old = srv.admin_token().await?;

    write_settings(&path, "second-signing-key-0123456789abcdef", "1.1")?;
    assert_eq!(reload(&srv).await?.0, 200);

    let speaker = json!({"name":"Rotated Speaker"});
    let resp = srv.client.post(srv.url("/api/camps/ATL2016/speakers")).bearer_auth(&old).json(&speaker).send().await?;
    assert_eq!(resp.status(), 401);
    let fresh = srv.admin_token().await?;
    let resp = srv.client.post(srv.url("/api/camps/ATL2016/speakers")).bearer_auth(&fresh).json(&speaker).send().await?;
    assert_eq!(resp.status(), 201);
    Ok(())
}
