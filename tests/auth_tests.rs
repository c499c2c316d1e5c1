//! Credential endpoints: token issuance, cookie login, and how each feeds request identity.

mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use serde_json::json;

use codecamp::identity::{TokenIssuer, TOKEN_LIFETIME_MINUTES};
use common::{read, start, test_settings};

#[tokio::test]
async fn token_carries_identity_user_and_role_claims() -> Result<()> {
    let srv = start().await?;
    let before = Utc::now();
    let resp = srv.client.post(srv.url("/api/auth/token")).json(&json!({"userName":"vioflu","password":"P@ssw0rd"})).send().await?;
    let (status, body) = read(resp).await?;
    assert_eq!(status, 200);
    let token = body["token"].as_str().unwrap();
    let expiration: chrono::DateTime<Utc> = serde_json::from_value(body["expiration"].clone())?;
    assert!(expiration >= before + Duration::minutes(TOKEN_LIFETIME_MINUTES) - Duration::seconds(1));

    let issuer = TokenIssuer::new(&test_settings().tokens);
    let principal = issuer.validate(token, Utc::now())?;
    assert_eq!(principal.name, "vioflu");
    assert!(principal.has_claim("SuperUser", "True"));
    assert!(principal.has_claim("IsAdmin", "True"));
    assert!(principal.has_claim("email", "vf@gmail.com"));
    assert!(principal.has_claim("given_name", "vioflu"));
    // rejected once the fifteen minutes are up
    assert!(issuer.validate(token, expiration + Duration::minutes(1)).is_err());
    Ok(())
}

#[tokio::test]
async fn unknown_user_and_wrong_password_look_the_same() -> Result<()> {
    let srv = start().await?;
    let unknown = read(srv.client.post(srv.url("/api/auth/token")).json(&json!({"userName":"nobody","password":"P@ssw0rd"})).send().await?).await?;
    let wrong = read(srv.client.post(srv.url("/api/auth/token")).json(&json!({"userName":"vioflu","password":"nope"})).send().await?).await?;
    assert_eq!(unknown.0, 400);
    assert_eq!(unknown, wrong);
    assert_eq!(unknown.1["message"], "Failed to login");
    Ok(())
}

#[tokio::test]
async fn missing_username_is_a_validation_error() -> Result<()> {
    let srv = start().await?;
    let (status, body) = read(srv.client.post(srv.url("/api/auth/token")).json(&json!({"password":"x"})).send().await?).await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "validation_failed");
    assert!(body["errors"]["userName"].is_array());
    Ok(())
}

#[tokio::test]
async fn cookie_login_authenticates_later_requests() -> Result<()> {
    let srv = start().await?;
    let client = reqwest::Client::builder().cookie_store(true).build()?;
    let resp = client.post(srv.url("/api/auth/login")).json(&json!({"userName":"vioflu","password":"P@ssw0rd"})).send().await?;
    assert_eq!(resp.status(), 200);
    let set_cookie = resp.headers().get("set-cookie").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    assert!(set_cookie.starts_with("codecamp_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));

    let resp = client
        .post(srv.url("/api/camps/ATL2016/speakers"))
        .json(&json!({"name":"Cookie Speaker"}))
        .send()
        .await?;
    assert_eq!(resp.status(), 201);
    Ok(())
}

#[tokio::test]
async fn failed_cookie_login_sets_no_cookie() -> Result<()> {
    let srv = start().await?;
    let resp = srv.client.post(srv.url("/api/auth/login")).json(&json!({"userName":"vioflu","password":"wrong"})).send().await?;
    assert!(resp.headers().get("set-cookie").is_none());
    let (status, body) = read(resp).await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "invalid_credentials");
    Ok(())
}

#[tokio::test]
async fn bad_bearer_token_leaves_request_anonymous() -> Result<()> {
    let srv = start().await?;
    let (status, body) = read(
        srv.client
            .post(srv.url("/api/camps/ATL2016/speakers"))
            .bearer_auth("not.a.token")
            .json(&json!({"name":"Nobody Special"}))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "unauthenticated");

    // anonymous reads are unaffected
    let resp = srv.client.get(srv.url("/api/camps")).bearer_auth("not.a.token").send().await?;
    assert_eq!(resp.status(), 200);
    Ok(())
}

#[tokio::test]
async fn bearer_wins_over_cookie() -> Result<()> {
    let srv = start().await?;
    let client = reqwest::Client::builder().cookie_store(true).build()?;
    // cookie session for the admin
    client.post(srv.url("/api/auth/login")).json(&json!({"userName":"vioflu","password":"P@ssw0rd"})).send().await?;
    // bearer for the non-privileged user
    let other = srv.other_token().await?;
    let resp = client
        .post(srv.url("/api/camps"))
        .bearer_auth(other)
        .json(&json!({"moniker":"SEA2026","name":"Seattle Code Camp","description":"A full day of sessions in Seattle"}))
        .send()
        .await?;
    assert_eq!(resp.status(), 403);
    Ok(())
}
