//! Digest core: pure data model and text processing, no IO.
mod completion;
mod content;
mod dedupe;
pub mod format;
mod model;
pub mod speech;
mod truncate;

pub use completion::{
    job_has_results, CompletionPolicy, EnrichmentTally, Observation, StatusTracker,
    DEFAULT_COMPLETION_THRESHOLD,
};
pub use content::{fallback_answer, fallback_items, Content};
pub use dedupe::{normalize_url_for_dedupe, SeenUrls};
pub use model::{
    Answer, Citation, Enrichment, EnrichmentDefinition, EnrichmentStatus, Item, ItemsPage,
    JobStatus, Progress, Webset, WebsetId, WebsetSearch,
};
pub use speech::{limit_words, normalize_for_speech};
pub use truncate::{
    notice, notice_len, truncate, CutPoint, TruncateOptions, Truncated, DEFAULT_BOUNDARY_FLOOR,
};
