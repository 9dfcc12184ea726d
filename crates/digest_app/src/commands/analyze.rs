use std::time::Duration;

use anyhow::{bail, Context};
use digest_core::format::{analysis_prompt, analysis_report};
use digest_engine::{
    dashboard_url, poll_until_ready, ChatClient, ChatSettings, LogProgressSink, WebsetQuery,
};
use digest_logging::{digest_info, digest_warn};
use tokio_util::sync::CancellationToken;

use super::{artifact_store, exa_client, now_utc, until_cancelled};
use crate::cli::AnalyzeArgs;
use crate::config::AppConfig;

const NEWS_DOMAINS: [&str; 5] = [
    "techcrunch.com",
    "reuters.com",
    "bloomberg.com",
    "cnn.com",
    "bbc.com",
];
const NEWS_SINCE: &str = "2024-01-01";
const SKIPPED_NOTICE: &str = "Perplexity AI analysis skipped - API key not configured. \
Set PERPLEXITY_API_KEY to enable AI-powered analysis.";

fn news_query(topic: &str) -> WebsetQuery {
    WebsetQuery {
        include_domains: NEWS_DOMAINS.iter().map(|d| d.to_string()).collect(),
        start_published_date: Some(NEWS_SINCE.to_string()),
        ..WebsetQuery::new(format!("{topic} news recent developments"), 10)
    }
}

pub(super) async fn run(
    config: &AppConfig,
    args: AnalyzeArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let exa = exa_client(config)?;
    let query = news_query(&args.topic);
    let webset = until_cancelled(cancel, exa.create_webset(&query))
        .await?
        .context("failed to create news webset")?;
    digest_info!("collecting news on {:?} in webset {}", args.topic, webset.id);

    let mut settings = config.poll_settings();
    settings.interval = Duration::from_secs(config.timing.analyze_poll_interval_secs);
    let outcome = poll_until_ready(&exa, &webset.id, &settings, &LogProgressSink, cancel).await?;

    if cancel.is_cancelled() {
        bail!("interrupted");
    }
    if outcome.items.is_empty() {
        println!(
            "No articles collected yet ({:?}). Check the webset later: {}",
            outcome.completion,
            dashboard_url(&webset.id)
        );
        return Ok(());
    }

    let analysis = match config.perplexity_api_key.as_deref() {
        Some(key) => {
            let chat = ChatClient::new(
                key,
                &config.endpoints.chat,
                ChatSettings::default(),
                &config.api_settings(),
            )?;
            let prompt = analysis_prompt(&outcome.items);
            match until_cancelled(cancel, chat.complete(&prompt)).await? {
                Ok(text) => text,
                Err(err) => {
                    digest_warn!("analysis request failed: {err}");
                    format!("Analysis unavailable: {err}")
                }
            }
        }
        None => SKIPPED_NOTICE.to_string(),
    };

    let now = now_utc();
    let latest = outcome.webset.as_ref().unwrap_or(&webset);
    let report = analysis_report(latest, &outcome.items, &analysis, &now);
    println!("{report}");

    let store = artifact_store(config, &args.topic, now)?;
    let path = store
        .save_text("news_analysis", &report)
        .context("failed to save analysis report")?;
    println!("Report saved to {}", path.display());
    Ok(())
}
