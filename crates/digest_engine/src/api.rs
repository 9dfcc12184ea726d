use std::fmt;
use std::time::Duration;

use digest_logging::digest_debug;
use serde::de::DeserializeOwned;

/// Timeouts and size limits shared by every HTTP client.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Upper bound on a streamed binary body (synthesised audio).
    pub max_body_bytes: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_body_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ApiSettings {
    pub(crate) fn build_client(&self) -> Result<reqwest::Client, ApiError> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(|err| ApiError::new(ApiFailure::Network, err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ApiFailure,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failures worth another attempt: network trouble, timeouts, rate
    /// limiting and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            ApiFailure::Network | ApiFailure::Timeout => true,
            ApiFailure::HttpStatus(code) => code == 429 || (500..600).contains(&code),
            _ => false,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFailure {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Decode,
    Network,
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiFailure::InvalidUrl => write!(f, "invalid url"),
            ApiFailure::HttpStatus(code) => write!(f, "http status {code}"),
            ApiFailure::Timeout => write!(f, "timeout"),
            ApiFailure::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            ApiFailure::Decode => write!(f, "undecodable response"),
            ApiFailure::Network => write!(f, "network error"),
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(ApiFailure::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(ApiFailure::Decode, err.to_string());
    }
    ApiError::new(ApiFailure::Network, err.to_string())
}

/// Joins a base URL and a path without doubling or dropping the slash.
pub(crate) fn endpoint(base: &str, path: &str) -> Result<reqwest::Url, ApiError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    reqwest::Url::parse(&joined).map_err(|err| ApiError::new(ApiFailure::InvalidUrl, err.to_string()))
}

/// Fails on non-success status with the first part of the body as message.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    Err(ApiError::new(
        ApiFailure::HttpStatus(status.as_u16()),
        format!("{status}: {snippet}"),
    ))
}

/// Reads a successful response as JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let response = ensure_success(response).await?;
    let body = response.text().await.map_err(map_reqwest_error)?;
    digest_debug!("response body: {body}");
    serde_json::from_str(&body).map_err(|err| ApiError::new(ApiFailure::Decode, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let transient = [
            ApiFailure::Network,
            ApiFailure::Timeout,
            ApiFailure::HttpStatus(429),
            ApiFailure::HttpStatus(503),
        ];
        for kind in transient {
            assert!(ApiError::new(kind, "x").is_transient());
        }
        let permanent = [
            ApiFailure::HttpStatus(401),
            ApiFailure::HttpStatus(404),
            ApiFailure::Decode,
            ApiFailure::InvalidUrl,
        ];
        for kind in permanent {
            assert!(!ApiError::new(kind, "x").is_transient());
        }
    }

    #[test]
    fn endpoint_joins_with_single_slash() {
        let url = endpoint("http://localhost:9000/", "/websets/v0/websets").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/websets/v0/websets");
    }
}
