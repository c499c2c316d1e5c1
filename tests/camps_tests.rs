//! Camp endpoints and the SuperUser policy.

mod common;

use anyhow::Result;
use serde_json::json;

use common::{read, start};

fn new_camp() -> serde_json::Value {
    json!({
        "moniker": "SEA2026",
        "name": "Seattle Code Camp",
        "description": "A full day of sessions in Seattle",
        "eventDate": "2026-11-07T09:00:00",
        "length": 1,
        "locationCityTown": "Seattle"
    })
}

#[tokio::test]
async fn anonymous_listing_and_lookup() -> Result<()> {
    let srv = start().await?;
    let resp = srv.client.get(srv.url("/api/camps")).send().await?;
    assert_eq!(resp.headers()["api-supported-versions"], "1.1");
    let (status, body) = read(resp).await?;
    assert_eq!(status, 200);
    assert_eq!(body[0]["moniker"], "ATL2016");
    assert!(body[0]["url"].as_str().unwrap().ends_with("/api/camps/ATL2016"));

    let (status, body) = read(srv.client.get(srv.url("/api/camps/atl2016?includeSpeakers=true")).send().await?).await?;
    assert_eq!(status, 200);
    assert_eq!(body["speakers"].as_array().map(|a| a.len()), Some(1));

    let (status, body) = read(srv.client.get(srv.url("/api/camps/NOPE")).send().await?).await?;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "not_found");
    Ok(())
}

#[tokio::test]
async fn create_requires_super_user() -> Result<()> {
    let srv = start().await?;
    let anon = srv.client.post(srv.url("/api/camps")).json(&new_camp()).send().await?;
    assert_eq!(anon.status(), 401);

    let other = srv.other_token().await?;
    let (status, body) = read(srv.client.post(srv.url("/api/camps")).bearer_auth(other).json(&new_camp()).send().await?).await?;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "forbidden");

    let admin = srv.admin_token().await?;
    let resp = srv.client.post(srv.url("/api/camps")).bearer_auth(&admin).json(&new_camp()).send().await?;
    assert_eq!(resp.status(), 201);
    let location = resp.headers()["location"].to_str()?.to_string();
    assert!(location.ends_with("/api/camps/SEA2026"));
    let (status, body) = read(srv.client.get(location).send().await?).await?;
    assert_eq!(status, 200);
    assert_eq!(body["locationCityTown"], "Seattle");
    Ok(())
}

#[tokio::test]
async fn invalid_or_duplicate_camp_is_rejected() -> Result<()> {
    let srv = start().await?;
    let admin = srv.admin_token().await?;
    let mut bad = new_camp();
    bad["name"] = json!("SEA");
    bad["moniker"] = json!("SEA 2026");
    let (status, body) = read(srv.client.post(srv.url("/api/camps")).bearer_auth(&admin).json(&bad).send().await?).await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "validation_failed");
    assert!(body["errors"]["name"].is_array());
    assert!(body["errors"]["moniker"].is_array());

    let mut dup = new_camp();
    dup["moniker"] = json!("atl2016");
    let (status, body) = read(srv.client.post(srv.url("/api/camps")).bearer_auth(&admin).json(&dup).send().await?).await?;
    assert_eq!(status, 400);
    assert!(body["errors"]["moniker"].is_array());
    Ok(())
}

#[tokio::test]
async fn update_and_delete() -> Result<()> {
    let srv = start().await?;
    let admin = srv.admin_token().await?;
    let mut changed = new_camp();
    changed["moniker"] = json!("ATL2016");
    changed["name"] = json!("Atlanta Code Camp 2016");

    let other = srv.other_token().await?;
    let resp = srv.client.patch(srv.url("/api/camps/ATL2016")).bearer_auth(other).json(&changed).send().await?;
    assert_eq!(resp.status(), 403);

    let (status, body) = read(srv.client.patch(srv.url("/api/camps/ATL2016")).bearer_auth(&admin).json(&changed).send().await?).await?;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "Atlanta Code Camp 2016");

    let resp = srv.client.put(srv.url("/api/camps/NOPE")).bearer_auth(&admin).json(&changed).send().await?;
    assert_eq!(resp.status(), 404);

    let resp = srv.client.delete(srv.url("/api/camps/ATL2016")).bearer_auth(&admin).send().await?;
    assert_eq!(resp.status(), 200);
    let resp = srv.client.get(srv.url("/api/camps/ATL2016")).send().await?;
    assert_eq!(resp.status(), 404);
    Ok(())
}

#[tokio::test]
async fn failed_save_reports_persistence_error() -> Result<()> {
    let srv = start().await?;
    let admin = srv.admin_token().await?;
    srv.state.store.set_read_only(true);
    let (status, body) = read(srv.client.post(srv.url("/api/camps")).bearer_auth(&admin).json(&new_camp()).send().await?).await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "persistence_failed");
    srv.state.store.set_read_only(false);
    let resp = srv.client.get(srv.url("/api/camps/SEA2026")).send().await?;
    assert_eq!(resp.status(), 404);
    Ok(())
}

#[tokio::test]
async fn camps_only_serve_the_default_version() -> Result<()> {
    let srv = start().await?;
    let (status, body) = read(srv.client.get(srv.url("/api/camps")).header("ver", "2.0").send().await?).await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "unsupported_version");
    Ok(())
}

#[tokio::test]
async fn location_carries_an_encoded_moniker() -> Result<()> {
    let srv = start().await?;
    let admin = srv.admin_token().await?;
    for moniker in ["SEA?2026", "BAD\u{1}CAMP"] {
        let mut bad = new_camp();
        bad["moniker"] = json!(moniker);
        let (status, body) = read(srv.client.post(srv.url("/api/camps")).bearer_auth(&admin).json(&bad).send().await?).await?;
        assert_eq!(status, 400);
        assert!(body["errors"]["moniker"].is_array());
    }
    let (_, body) = read(srv.client.get(srv.url("/api/camps")).send().await?).await?;
    assert_eq!(body.as_array().map(|a| a.len()), Some(1));

    let mut camp = new_camp();
    camp["moniker"] = json!("Zürich2026");
    let resp = srv.client.post(srv.url("/api/camps")).bearer_auth(&admin).json(&camp).send().await?;
    assert_eq!(resp.status(), 201);
    let location = resp.headers()["location"].to_str()?.to_string();
    assert!(location.ends_with("/api/camps/Z%C3%BCrich2026"));
    let (status, body) = read(srv.client.get(location).send().await?).await?;
    assert_eq!(status, 200);
    assert_eq!(body["moniker"], "Zürich2026");
    Ok(())
}
