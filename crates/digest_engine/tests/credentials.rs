use std::fs;

use chrono::{TimeZone, Utc};
use digest_engine::{ApiSettings, AuthError, TokenFileCredentials};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_token(dir: &TempDir, token: Value) -> std::path::PathBuf {
    let path = dir.path().join("token.json");
    fs::write(&path, token.to_string()).unwrap();
    path
}

#[tokio::test]
async fn fresh_token_is_returned_without_refresh() {
    let temp = TempDir::new().unwrap();
    let path = write_token(
        &temp,
        json!({"token": "still-good", "refresh_token": "r", "expiry": "2030-01-01T00:00:00Z"}),
    );
    let provider = TokenFileCredentials::new(path, &ApiSettings::default()).unwrap();

    let now = Utc.with_ymd_and_hms(2029, 12, 31, 23, 0, 0).unwrap();
    let credential = provider.credential_at(now).await.unwrap();
    assert_eq!(credential.access_token, "still-good");
}

#[tokio::test]
async fn expiring_token_is_refreshed_and_rewritten() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "new-token", "expires_in": 3600})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let path = write_token(
        &temp,
        json!({
            "token": "old-token",
            "refresh_token": "r-1",
            "token_uri": format!("{}/token", server.uri()),
            "client_id": "cid",
            "scopes": ["https://www.googleapis.com/auth/gmail.send"],
            "expiry": "2025-01-01T00:00:30Z"
        }),
    );
    let provider = TokenFileCredentials::new(&path, &ApiSettings::default()).unwrap();

    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let credential = provider.credential_at(now).await.unwrap();
    assert_eq!(credential.access_token, "new-token");
    assert_eq!(
        credential.expires_at,
        Some(Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap())
    );

    let stored: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(stored["token"], "new-token");
    assert_eq!(stored["refresh_token"], "r-1");
    assert_eq!(stored["scopes"][0], "https://www.googleapis.com/auth/gmail.send");
}

#[tokio::test]
async fn expired_token_without_refresh_token_fails() {
    let temp = TempDir::new().unwrap();
    let path = write_token(
        &temp,
        json!({"token": "old", "expiry": "2020-01-01T00:00:00Z"}),
    );
    let provider = TokenFileCredentials::new(path, &ApiSettings::default()).unwrap();

    let err = provider.credential_at(Utc::now()).await.unwrap_err();
    assert!(matches!(err, AuthError::NoRefreshToken));
}

#[tokio::test]
async fn missing_token_file_is_reported() {
    let temp = TempDir::new().unwrap();
    let provider =
        TokenFileCredentials::new(temp.path().join("absent.json"), &ApiSettings::default())
            .unwrap();
    let err = provider.credential_at(Utc::now()).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenFile { .. }));
}
