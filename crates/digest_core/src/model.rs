//! Wire model of the websets API as seen by the poller and formatters.
//!
//! Everything here is a read-only snapshot: a fresh value is decoded on every
//! request and the previous one is dropped.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type WebsetId = String;

/// Status of a webset (the server-side search job).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Idle,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Position on the way to a terminal state. `None` for statuses that
    /// carry no ordering information.
    pub fn rank(self) -> Option<u8> {
        match self {
            JobStatus::Pending => Some(0),
            JobStatus::Running => Some(1),
            JobStatus::Completed | JobStatus::Idle => Some(2),
            JobStatus::Failed => Some(3),
            JobStatus::Unknown => None,
        }
    }

    /// Completed and idle both mean "the search stopped producing items".
    pub fn is_settled(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Idle)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Idle => "idle",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl EnrichmentStatus {
    pub fn is_in_flight(self) -> bool {
        matches!(self, EnrichmentStatus::Pending | EnrichmentStatus::Running)
    }
}

/// Search progress as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Percent complete, 0-100. Absent while the search is warming up.
    #[serde(default)]
    pub completion: Option<f64>,
    #[serde(default)]
    pub found: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsetSearch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub progress: Option<Progress>,
}

/// An enrichment attached to a webset; also used as the create-request shape.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnrichmentDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl EnrichmentDefinition {
    /// A text-format enrichment with a display title.
    pub fn text(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            title: Some(title.into()),
            description: description.into(),
            format: Some("text".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webset {
    pub id: WebsetId,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub searches: Vec<WebsetSearch>,
    #[serde(default)]
    pub enrichments: Vec<EnrichmentDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Webset {
    /// Aggregate progress over all searches: `found` is summed, `completion`
    /// is the lowest reported value. `None` when no search reports progress.
    pub fn progress(&self) -> Option<Progress> {
        let mut reported = self.searches.iter().filter_map(|s| s.progress).peekable();
        reported.peek()?;
        let mut total = Progress::default();
        for progress in reported {
            total.found += progress.found;
            total.completion = match (total.completion, progress.completion) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
        Some(total)
    }

    /// Display title of an enrichment definition by id.
    pub fn enrichment_title(&self, enrichment_id: &str) -> Option<&str> {
        self.enrichments
            .iter()
            .find(|def| def.id.as_deref() == Some(enrichment_id))
            .and_then(|def| def.title.as_deref())
    }
}

/// Result of one enrichment on one item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_id: Option<String>,
    #[serde(default)]
    pub status: EnrichmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<String>>,
}

impl Enrichment {
    /// Result texts, only once the enrichment completed with something to show.
    pub fn results(&self) -> Option<&[String]> {
        if self.status != EnrichmentStatus::Completed {
            return None;
        }
        self.result.as_deref().filter(|r| !r.is_empty())
    }

    pub fn first_result(&self) -> Option<&str> {
        self.results().and_then(|r| r.first()).map(String::as_str)
    }

    /// A completed enrichment with a title, used for locally generated content.
    pub fn completed(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            enrichment_id: None,
            status: EnrichmentStatus::Completed,
            title: Some(title.into()),
            result: Some(vec![text.into()]),
        }
    }
}

/// One curated result record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub enrichments: Vec<Enrichment>,
}

impl Item {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    fn article_field(&self, key: &str) -> Option<&str> {
        self.properties
            .get("article")
            .and_then(|article| article.get(key))
            .and_then(Value::as_str)
    }

    pub fn url(&self) -> Option<&str> {
        self.property("url").filter(|u| !u.is_empty())
    }

    pub fn description(&self) -> Option<&str> {
        self.property("description").filter(|d| !d.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.property("title")
            .or_else(|| self.article_field("title"))
            .filter(|t| !t.is_empty())
    }

    pub fn published_date(&self) -> Option<&str> {
        self.property("publishedDate")
            .or_else(|| self.article_field("publishedAt"))
    }

    pub fn author(&self) -> Option<&str> {
        self.property("author")
            .or_else(|| self.article_field("author"))
    }

    /// Builds an item from a url and description, for sample content.
    pub fn with_properties(url: &str, description: &str) -> Self {
        let mut properties = Map::new();
        properties.insert("url".to_string(), Value::String(url.to_string()));
        properties.insert(
            "description".to_string(),
            Value::String(description.to_string()),
        );
        Self {
            id: None,
            properties,
            enrichments: Vec::new(),
        }
    }
}

/// Page of the item listing endpoint. Deployments have used `data`, `items`
/// and `results` for the list key.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsPage {
    #[serde(default, alias = "items", alias = "results")]
    pub data: Vec<Item>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Generated answer with its sources.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Answer {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}
