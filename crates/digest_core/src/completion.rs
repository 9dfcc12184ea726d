use crate::model::{EnrichmentStatus, Item, JobStatus, Progress};

/// Share of enrichments that must be completed before items are handed on.
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnrichmentTally {
    pub completed: usize,
    pub total: usize,
}

impl EnrichmentTally {
    pub fn from_items(items: &[Item]) -> Self {
        let mut tally = Self::default();
        for enrichment in items.iter().flat_map(|item| item.enrichments.iter()) {
            tally.total += 1;
            if enrichment.status == EnrichmentStatus::Completed {
                tally.completed += 1;
            }
        }
        tally
    }

    /// Completed fraction; an item set without enrichments counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionPolicy {
    threshold: f64,
}

impl CompletionPolicy {
    /// Returns `None` unless `threshold` is in `(0, 1]`.
    pub fn new(threshold: f64) -> Option<Self> {
        (threshold > 0.0 && threshold <= 1.0).then_some(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_satisfied(&self, tally: &EnrichmentTally) -> bool {
        tally.fraction() >= self.threshold
    }
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_COMPLETION_THRESHOLD,
        }
    }
}

/// Whether a settled job has anything worth fetching: either the search
/// reports 100% or it already found items.
pub fn job_has_results(status: JobStatus, progress: Option<&Progress>) -> bool {
    if !status.is_settled() {
        return false;
    }
    progress.is_some_and(|p| p.completion.is_some_and(|c| c >= 100.0) || p.found > 0)
}

/// What the tracker believes after folding in one status response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub status: JobStatus,
    pub found: u64,
    pub completion: Option<f64>,
    /// The server reported a status that ranks below one already seen.
    pub regressed: bool,
}

/// Folds successive status responses for one job.
///
/// Status only moves toward a terminal state and `found` never decreases,
/// whatever order the server's responses arrive in.
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    status: Option<JobStatus>,
    found: u64,
    completion: Option<f64>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, status: JobStatus, progress: Option<&Progress>) -> Observation {
        let mut regressed = false;
        let next = match self.status {
            None => status,
            Some(current) => match (current.rank(), status.rank()) {
                (Some(old), Some(new)) if new < old => {
                    regressed = true;
                    current
                }
                (_, None) => current,
                _ => status,
            },
        };
        self.status = Some(next);

        if let Some(progress) = progress {
            self.found = self.found.max(progress.found);
            if progress.completion.is_some() {
                self.completion = progress.completion;
            }
        }

        Observation {
            status: next,
            found: self.found,
            completion: self.completion,
            regressed,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status.unwrap_or(JobStatus::Unknown)
    }

    pub fn found(&self) -> u64 {
        self.found
    }
}
