//! Polls a webset until its items are ready, it fails, or the time budget runs out.
//!
//! The loop is driven by `tokio::time`, so callers (and tests with a paused
//! clock) control how waiting is observed. One status request is in flight at
//! a time; there is no concurrency inside a poll.
use std::future::Future;
use std::time::Duration;

use digest_core::{
    job_has_results, CompletionPolicy, EnrichmentTally, Item, JobStatus, Progress, StatusTracker,
    Webset, DEFAULT_COMPLETION_THRESHOLD,
};
use digest_logging::{digest_info, digest_warn};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::ApiError;
use crate::exa::WebsetApi;

#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    pub max_wait: Duration,
    pub interval: Duration,
    pub completion_threshold: f64,
    /// Pause before retrying a failed request; shorter than `interval`.
    pub retry_backoff: Duration,
    /// Consecutive attempts per request before a transport error surfaces.
    pub max_transport_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(120),
            interval: Duration::from_secs(10),
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            retry_backoff: Duration::from_secs(2),
            max_transport_attempts: 3,
        }
    }
}

impl PollSettings {
    pub fn validate(&self) -> Result<CompletionPolicy, PollError> {
        let invalid = |reason: &str| Err(PollError::InvalidSettings(reason.to_string()));
        if self.max_wait.is_zero() {
            return invalid("max_wait must be positive");
        }
        if self.interval.is_zero() || self.interval >= self.max_wait {
            return invalid("interval must be positive and below max_wait");
        }
        if self.retry_backoff >= self.interval {
            return invalid("retry_backoff must be below interval");
        }
        if self.max_transport_attempts == 0 {
            return invalid("max_transport_attempts must be at least 1");
        }
        match CompletionPolicy::new(self.completion_threshold) {
            Some(policy) => Ok(policy),
            None => invalid("completion_threshold must be in (0, 1]"),
        }
    }
}

/// Progress reported to the caller while polling.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    Status {
        elapsed: Duration,
        status: JobStatus,
        found: u64,
        completion: Option<f64>,
    },
    Enrichment {
        elapsed: Duration,
        completed: usize,
        total: usize,
    },
    Retry {
        attempt: u32,
        max_attempts: u32,
        error: ApiError,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: PollEvent);
}

/// Writes poll progress to the log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: PollEvent) {
        match event {
            PollEvent::Status {
                elapsed,
                status,
                found,
                completion,
            } => match completion {
                Some(pct) => digest_info!(
                    "[{:>3}s] status: {status}, found {found} items, {pct:.0}% complete",
                    elapsed.as_secs()
                ),
                None => digest_info!(
                    "[{:>3}s] status: {status}, found {found} items",
                    elapsed.as_secs()
                ),
            },
            PollEvent::Enrichment {
                elapsed,
                completed,
                total,
            } => digest_info!(
                "[{:>3}s] enrichments completed: {completed}/{total}",
                elapsed.as_secs()
            ),
            PollEvent::Retry {
                attempt,
                max_attempts,
                error,
            } => digest_warn!("request failed (attempt {attempt}/{max_attempts}): {error}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Job settled and enough enrichments finished.
    Ready,
    /// The time budget ran out; items are whatever was fetched last.
    TimedOut,
    /// Cancelled by the caller.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub completion: Completion,
    pub items: Vec<Item>,
    pub status: JobStatus,
    pub found: u64,
    pub elapsed: Duration,
    pub webset: Option<Webset>,
}

impl PollOutcome {
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Ready
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("invalid poll settings: {0}")]
    InvalidSettings(String),
    #[error("webset {webset_id} failed")]
    JobFailed { webset_id: String },
    #[error("transport failed after {attempts} attempts: {source}")]
    Transport { attempts: u32, source: ApiError },
    #[error("api error: {0}")]
    Api(ApiError),
}

struct Snapshot {
    started: Instant,
    tracker: StatusTracker,
    items: Vec<Item>,
    webset: Option<Webset>,
}

impl Snapshot {
    fn finish(self, completion: Completion) -> PollOutcome {
        PollOutcome {
            completion,
            status: self.tracker.status(),
            found: self.tracker.found(),
            elapsed: self.started.elapsed(),
            items: self.items,
            webset: self.webset,
        }
    }
}

/// Polls `webset_id` until ready, failed, timed out or cancelled.
///
/// Items are only fetched once the job reports completed/idle with results;
/// a job still running never counts as ready, whatever its enrichments say.
pub async fn poll_until_ready(
    api: &dyn WebsetApi,
    webset_id: &str,
    settings: &PollSettings,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<PollOutcome, PollError> {
    let policy = settings.validate()?;
    let mut snapshot = Snapshot {
        started: Instant::now(),
        tracker: StatusTracker::new(),
        items: Vec::new(),
        webset: None,
    };

    loop {
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(snapshot.finish(Completion::Interrupted)),
            result = with_retry(settings, sink, || api.get_webset(webset_id)) => result?,
        };

        let elapsed = snapshot.started.elapsed();
        let observation = snapshot
            .tracker
            .observe(fetched.status, fetched.progress().as_ref());
        if observation.regressed {
            digest_warn!(
                "webset {webset_id} reported {} after {}; keeping {}",
                fetched.status,
                observation.status,
                observation.status
            );
        }
        snapshot.webset = Some(fetched);
        sink.emit(PollEvent::Status {
            elapsed,
            status: observation.status,
            found: observation.found,
            completion: observation.completion,
        });

        if observation.status == JobStatus::Failed {
            return Err(PollError::JobFailed {
                webset_id: webset_id.to_string(),
            });
        }

        let progress = Progress {
            completion: observation.completion,
            found: observation.found,
        };
        if job_has_results(observation.status, Some(&progress)) {
            let items = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(snapshot.finish(Completion::Interrupted)),
                result = with_retry(settings, sink, || api.list_items(webset_id)) => result?,
            };
            let tally = EnrichmentTally::from_items(&items);
            sink.emit(PollEvent::Enrichment {
                elapsed: snapshot.started.elapsed(),
                completed: tally.completed,
                total: tally.total,
            });
            snapshot.items = items;
            if policy.is_satisfied(&tally) {
                return Ok(snapshot.finish(Completion::Ready));
            }
        }

        let elapsed = snapshot.started.elapsed();
        if elapsed >= settings.max_wait {
            digest_warn!(
                "webset {webset_id} not ready after {}s; continuing with {} items",
                elapsed.as_secs(),
                snapshot.items.len()
            );
            return Ok(snapshot.finish(Completion::TimedOut));
        }

        let pause = settings.interval.min(settings.max_wait - elapsed);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(snapshot.finish(Completion::Interrupted)),
            _ = tokio::time::sleep(pause) => {}
        }
    }
}

/// Runs `request` until it succeeds, fails permanently, or the attempt budget
/// for transient failures is spent.
async fn with_retry<T, F, Fut>(
    settings: &PollSettings,
    sink: &dyn ProgressSink,
    mut request: F,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 1;
    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(error) if !error.is_transient() => return Err(PollError::Api(error)),
            Err(error) if attempt >= settings.max_transport_attempts => {
                return Err(PollError::Transport {
                    attempts: attempt,
                    source: error,
                })
            }
            Err(error) => {
                sink.emit(PollEvent::Retry {
                    attempt,
                    max_attempts: settings.max_transport_attempts,
                    error,
                });
                tokio::time::sleep(settings.retry_backoff).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PollSettings::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_timings() {
        let settings = PollSettings {
            interval: Duration::from_secs(200),
            ..PollSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(PollError::InvalidSettings(_))
        ));

        let settings = PollSettings {
            retry_backoff: Duration::from_secs(10),
            ..PollSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = PollSettings {
            completion_threshold: 0.0,
            ..PollSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
