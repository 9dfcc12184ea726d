//! One module per subcommand. Each `run` owns the whole flow of its command
//! and prints user-facing results to stdout; progress goes to the log.
mod analyze;
mod enrich;
mod monitor;
mod newsletter;
mod search;
mod voice;

use std::future::Future;

use anyhow::{bail, Context};
use chrono::{NaiveDateTime, Utc};
use digest_core::{EnrichmentStatus, Item, Webset};
use digest_engine::{ensure_output_dir, ArtifactStore, ExaClient};
use tokio_util::sync::CancellationToken;

use crate::cli::Command;
use crate::config::AppConfig;

pub(crate) async fn dispatch(
    command: Command,
    config: &AppConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    match command {
        Command::Search(args) => search::run(config, args, cancel).await,
        Command::Enrich(args) => enrich::run(config, args, cancel).await,
        Command::Monitor(args) => monitor::run(config, args, cancel).await,
        Command::Analyze(args) => analyze::run(config, args, cancel).await,
        Command::Newsletter(args) => newsletter::run(config, args, cancel).await,
        Command::Voice(args) => voice::run(config, args, cancel).await,
    }
}

/// Runs `work` unless the token fires first, in which case the run is over.
async fn until_cancelled<T, F>(cancel: &CancellationToken, work: F) -> anyhow::Result<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => bail!("interrupted"),
        value = work => Ok(value),
    }
}

fn exa_client(config: &AppConfig) -> anyhow::Result<ExaClient> {
    let key = config.exa_key()?;
    ExaClient::new(key, &config.endpoints.exa, &config.api_settings())
        .context("failed to build Exa client")
}

fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn artifact_store(
    config: &AppConfig,
    topic: &str,
    stamp: NaiveDateTime,
) -> anyhow::Result<ArtifactStore> {
    ensure_output_dir(&config.output_dir)
        .with_context(|| format!("cannot use output dir {:?}", config.output_dir))?;
    Ok(ArtifactStore::new(&config.output_dir, topic, stamp))
}

fn print_webset_details(webset: &Webset) {
    println!("Webset ID: {}", webset.id);
    println!("Status: {}", webset.status);
    if let Some(created) = webset.created_at.as_deref() {
        println!("Created: {created}");
    }
    if let Some(progress) = webset.progress() {
        println!("Items found: {}", progress.found);
    }
}

/// Item block with the enrichment state of each column.
fn print_item(item: &Item, index: usize, webset: Option<&Webset>) {
    println!(
        "\n{index}. {}",
        item.description().or_else(|| item.title()).unwrap_or("N/A")
    );
    println!("   URL: {}", item.url().unwrap_or("N/A"));
    if let Some(published) = item.published_date() {
        println!("   Published: {published}");
    }
    if let Some(author) = item.author() {
        println!("   Author: {author}");
    }
    for enrichment in &item.enrichments {
        let title = enrichment
            .title
            .as_deref()
            .or_else(|| {
                let id = enrichment.enrichment_id.as_deref()?;
                webset?.enrichment_title(id)
            })
            .unwrap_or("Enrichment");
        match (enrichment.status, enrichment.first_result()) {
            (EnrichmentStatus::Completed, Some(result)) => {
                println!(
                    "   {title}: {}",
                    digest_core::format::ellipsize(result, 100)
                );
            }
            (status, _) if status.is_in_flight() => println!("   {title}: processing..."),
            (status, _) => println!("   {title}: {status:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future;

    use super::*;

    #[tokio::test]
    async fn work_finishes_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let value = until_cancelled(&cancel, async { 7 }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn cancelled_token_abandons_pending_work() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = until_cancelled(&cancel, future::pending::<()>()).await;
        assert_eq!(result.unwrap_err().to_string(), "interrupted");
    }
}
