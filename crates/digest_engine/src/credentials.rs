//! OAuth access tokens kept in a local JSON token file.
//!
//! The file is produced by an interactive consent flow elsewhere; this module
//! only reads it, refreshes the access token when it is about to expire, and
//! writes the refreshed token back.
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use digest_logging::digest_info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::api::{map_reqwest_error, read_json, ApiError, ApiSettings};
use crate::persist::{AtomicFileWriter, PersistError};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token file {path} unavailable: {message}")]
    TokenFile { path: PathBuf, message: String },
    #[error("token file has no refresh token and the access token expired")]
    NoRefreshToken,
    #[error("token refresh failed: {0}")]
    Refresh(#[from] ApiError),
    #[error("cannot store refreshed token: {0}")]
    Store(#[from] PersistError),
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn valid_credential(&self) -> Result<Credential, AuthError>;
}

/// Authorized-user token file. Unknown keys are kept on rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

pub struct TokenFileCredentials {
    path: PathBuf,
    client: reqwest::Client,
    refresh_margin: Duration,
}

impl TokenFileCredentials {
    pub fn new(path: impl Into<PathBuf>, settings: &ApiSettings) -> Result<Self, ApiError> {
        Ok(Self {
            path: path.into(),
            client: settings.build_client()?,
            refresh_margin: Duration::from_secs(60),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<TokenFile, AuthError> {
        let file_error = |message: String| AuthError::TokenFile {
            path: self.path.clone(),
            message,
        };
        let raw = std::fs::read_to_string(&self.path).map_err(|e| file_error(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| file_error(e.to_string()))
    }

    fn store(&self, token: &TokenFile) -> Result<(), AuthError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AuthError::TokenFile {
                path: self.path.clone(),
                message: "not a file path".to_string(),
            })?;
        AtomicFileWriter::new(dir).write_json(name, token)?;
        Ok(())
    }

    fn expires_soon(&self, token: &TokenFile, now: DateTime<Utc>) -> bool {
        let margin = chrono::Duration::seconds(self.refresh_margin.as_secs() as i64);
        token.expiry.is_some_and(|expiry| expiry - margin <= now)
    }

    /// Returns the stored token, refreshing it first when it expires within
    /// the refresh margin of `now`.
    pub async fn credential_at(&self, now: DateTime<Utc>) -> Result<Credential, AuthError> {
        let mut token = self.load()?;
        if self.expires_soon(&token, now) {
            self.refresh(&mut token, now).await?;
            self.store(&token)?;
        }
        Ok(Credential {
            access_token: token.token,
            expires_at: token.expiry,
        })
    }

    async fn refresh(&self, token: &mut TokenFile, now: DateTime<Utc>) -> Result<(), AuthError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(AuthError::NoRefreshToken)?;
        let token_uri = token.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        if let Some(id) = token.client_id.as_deref() {
            form.push(("client_id", id));
        }
        if let Some(secret) = token.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let response = self
            .client
            .post(token_uri)
            .form(&form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let refreshed: RefreshResponse = read_json(response).await?;

        digest_info!("refreshed access token from {}", self.path.display());
        token.token = refreshed.access_token;
        token.expiry = refreshed
            .expires_in
            .map(|secs| now + chrono::Duration::seconds(secs));
        Ok(())
    }
}

#[async_trait]
impl CredentialProvider for TokenFileCredentials {
    async fn valid_credential(&self) -> Result<Credential, AuthError> {
        self.credential_at(Utc::now()).await
    }
}
