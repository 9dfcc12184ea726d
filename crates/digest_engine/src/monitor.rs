use std::time::Duration;

use digest_core::{Item, SeenUrls};
use digest_logging::{digest_info, digest_warn};
use tokio_util::sync::CancellationToken;

use crate::exa::WebsetApi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub check_interval: Duration,
    pub error_backoff: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            error_backoff: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonitorSummary {
    pub checks: u64,
    pub failed_checks: u64,
    pub new_items: usize,
    pub total_items: usize,
}

/// Lists the webset's items repeatedly and hands every item with an unseen
/// URL to `on_new`, until `cancel` fires.
pub async fn watch_new_items<F>(
    api: &dyn WebsetApi,
    webset_id: &str,
    seen: &mut SeenUrls,
    settings: &MonitorSettings,
    cancel: &CancellationToken,
    mut on_new: F,
) -> MonitorSummary
where
    F: FnMut(&Item),
{
    let mut summary = MonitorSummary::default();
    digest_info!(
        "watching webset {webset_id}, checking every {}s",
        settings.check_interval.as_secs()
    );

    loop {
        let listed = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = api.list_items(webset_id) => result,
        };
        summary.checks += 1;

        let pause = match listed {
            Ok(items) => {
                summary.total_items = items.len();
                let fresh = seen.take_new(&items);
                if fresh.is_empty() {
                    digest_info!("no new items (total {})", items.len());
                } else {
                    digest_info!("{} new item(s)", fresh.len());
                    summary.new_items += fresh.len();
                    for item in fresh {
                        on_new(item);
                    }
                }
                settings.check_interval
            }
            Err(err) => {
                summary.failed_checks += 1;
                digest_warn!("monitor check failed: {err}");
                settings.error_backoff
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    digest_info!(
        "monitor stopped after {} checks, {} new items",
        summary.checks,
        summary.new_items
    );
    summary
}
