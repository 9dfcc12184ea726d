//! Client for the websets, monitors and answer endpoints.
use async_trait::async_trait;
use digest_core::{Answer, EnrichmentDefinition, Item, ItemsPage, Webset};
use digest_logging::{digest_debug, digest_warn};
use serde::{Deserialize, Serialize};

use crate::api::{endpoint, map_reqwest_error, read_json, ApiError, ApiSettings};

pub const DEFAULT_EXA_BASE_URL: &str = "https://api.exa.ai";
const DASHBOARD_BASE_URL: &str = "https://websets.exa.ai";
const WEBSETS_PATH: &str = "websets/v0/websets";
const MONITORS_PATH: &str = "websets/v0/monitors";
const ANSWER_PATH: &str = "answer";
const MAX_ITEM_PAGES: usize = 50;

/// Read side of the websets API, as needed by the poller and the monitor.
#[async_trait]
pub trait WebsetApi: Send + Sync {
    async fn get_webset(&self, webset_id: &str) -> Result<Webset, ApiError>;
    async fn list_items(&self, webset_id: &str) -> Result<Vec<Item>, ApiError>;
}

pub fn dashboard_url(webset_id: &str) -> String {
    format!("{DASHBOARD_BASE_URL}/{webset_id}")
}

/// Parameters of a new webset search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsetQuery {
    pub query: String,
    pub count: u32,
    pub criteria: Vec<String>,
    pub entity_type: Option<String>,
    pub include_domains: Vec<String>,
    pub start_published_date: Option<String>,
    pub enrichments: Vec<EnrichmentDefinition>,
}

impl WebsetQuery {
    pub fn new(query: impl Into<String>, count: u32) -> Self {
        Self {
            query: query.into(),
            count,
            criteria: Vec::new(),
            entity_type: None,
            include_domains: Vec::new(),
            start_published_date: None,
            enrichments: Vec::new(),
        }
    }

    pub fn articles(mut self) -> Self {
        self.entity_type = Some("article".to_string());
        self
    }
}

fn is_empty_slice<T>(values: &&[T]) -> bool {
    values.is_empty()
}

#[derive(Serialize)]
struct Entity<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize)]
struct Criterion<'a> {
    description: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchPayload<'a> {
    query: &'a str,
    count: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    criteria: Vec<Criterion<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity: Option<Entity<'a>>,
    #[serde(skip_serializing_if = "is_empty_slice")]
    include_domains: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    start_published_date: Option<&'a str>,
}

impl<'a> From<&'a WebsetQuery> for SearchPayload<'a> {
    fn from(query: &'a WebsetQuery) -> Self {
        Self {
            query: &query.query,
            count: query.count,
            criteria: query
                .criteria
                .iter()
                .map(|c| Criterion { description: c })
                .collect(),
            entity: query.entity_type.as_deref().map(|kind| Entity { kind }),
            include_domains: &query.include_domains,
            start_published_date: query.start_published_date.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct CreateWebsetPayload<'a> {
    search: SearchPayload<'a>,
    #[serde(skip_serializing_if = "is_empty_slice")]
    enrichments: &'a [EnrichmentDefinition],
}

/// Scheduled re-run of a webset search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSchedule {
    pub cron: String,
    pub timezone: String,
    pub behavior: String,
}

impl Default for MonitorSchedule {
    fn default() -> Self {
        Self {
            cron: "0 9 * * *".to_string(),
            timezone: "UTC".to_string(),
            behavior: "append".to_string(),
        }
    }
}

#[derive(Serialize)]
struct Cadence<'a> {
    cron: &'a str,
    timezone: &'a str,
}

#[derive(Serialize)]
struct MonitorConfig<'a> {
    #[serde(flatten)]
    search: SearchPayload<'a>,
    behavior: &'a str,
}

#[derive(Serialize)]
struct MonitorBehavior<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    config: MonitorConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateMonitorPayload<'a> {
    webset_id: &'a str,
    cadence: Cadence<'a>,
    behavior: MonitorBehavior<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Monitor {
    pub id: String,
}

/// Question for the answer endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerQuery {
    pub query: String,
    pub text: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_domains: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_published_date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExaClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ExaClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        settings: &ApiSettings,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: settings.build_client()?,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    fn get(&self, path: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        Ok(self
            .client
            .get(endpoint(&self.base_url, path)?)
            .header("x-api-key", &self.api_key))
    }

    fn post(&self, path: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        Ok(self
            .client
            .post(endpoint(&self.base_url, path)?)
            .header("x-api-key", &self.api_key))
    }

    pub async fn create_webset(&self, query: &WebsetQuery) -> Result<Webset, ApiError> {
        let payload = CreateWebsetPayload {
            search: query.into(),
            enrichments: &query.enrichments,
        };
        digest_debug!(
            "create webset payload: {}",
            serde_json::to_string(&payload).unwrap_or_default()
        );
        let response = self
            .post(WEBSETS_PATH)?
            .json(&payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    pub async fn create_monitor(
        &self,
        webset_id: &str,
        query: &WebsetQuery,
        schedule: &MonitorSchedule,
    ) -> Result<Monitor, ApiError> {
        let payload = CreateMonitorPayload {
            webset_id,
            cadence: Cadence {
                cron: &schedule.cron,
                timezone: &schedule.timezone,
            },
            behavior: MonitorBehavior {
                kind: "search",
                config: MonitorConfig {
                    search: query.into(),
                    behavior: &schedule.behavior,
                },
            },
        };
        let response = self
            .post(MONITORS_PATH)?
            .json(&payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    pub async fn answer(&self, query: &AnswerQuery) -> Result<Answer, ApiError> {
        let response = self
            .post(ANSWER_PATH)?
            .json(query)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }
}

#[async_trait]
impl WebsetApi for ExaClient {
    async fn get_webset(&self, webset_id: &str) -> Result<Webset, ApiError> {
        let response = self
            .get(&format!("{WEBSETS_PATH}/{webset_id}"))?
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn list_items(&self, webset_id: &str) -> Result<Vec<Item>, ApiError> {
        let path = format!("{WEBSETS_PATH}/{webset_id}/items");
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_ITEM_PAGES {
            let mut request = self.get(&path)?;
            if let Some(cursor) = cursor.as_deref() {
                request = request.query(&[("cursor", cursor)]);
            }
            let response = request.send().await.map_err(map_reqwest_error)?;
            let page: ItemsPage = read_json(response).await?;
            items.extend(page.data);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(items),
            }
        }

        digest_warn!("item listing for {webset_id} stopped after {MAX_ITEM_PAGES} pages");
        Ok(items)
    }
}
