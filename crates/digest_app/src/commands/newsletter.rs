use std::time::Instant;

use anyhow::{bail, Context};
use chrono::NaiveDateTime;
use digest_core::format::{websets_newsletter, NewsletterMeta};
use digest_core::{fallback_items, Content, EnrichmentDefinition, Item, Webset};
use digest_engine::{
    dashboard_url, poll_until_ready, ExaClient, LogProgressSink, WebsetQuery,
};
use digest_logging::{digest_info, digest_warn};
use tokio_util::sync::CancellationToken;

use super::{artifact_store, exa_client, now_utc, until_cancelled};
use crate::cli::NewsletterArgs;
use crate::config::AppConfig;

const FALLBACK_WEBSET_ID: &str = "sample-content";

fn newsletter_query(topic: &str, count: u32, now: &NaiveDateTime) -> WebsetQuery {
    WebsetQuery {
        criteria: vec![
            format!("Recent article about {topic} developments or breakthroughs"),
            "Article from credible tech or business publication".to_string(),
            "Article contains specific details about companies, products, or research"
                .to_string(),
            "Article published within the last week".to_string(),
        ],
        enrichments: vec![
            EnrichmentDefinition::text(
                "Article Summary",
                "Provide a 2-3 sentence summary of the main points and key takeaways",
            ),
            EnrichmentDefinition::text(
                "Key Details",
                "Extract company names, product names, key figures, and important dates mentioned",
            ),
            EnrichmentDefinition::text(
                "Industry Impact",
                "Analyze the significance and potential impact of this news on the industry",
            ),
        ],
        ..WebsetQuery::new(
            format!(
                "latest {topic} news developments announcements {}",
                now.format("%Y-%m")
            ),
            count,
        )
    }
}

pub(super) async fn run(
    config: &AppConfig,
    args: NewsletterArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let topic = args.topic.unwrap_or_else(|| config.topic.clone());
    let now = now_utc();
    let exa = exa_client(config)?;

    let gathered = gather(config, &exa, &topic, args.count, &now, cancel).await;
    if cancel.is_cancelled() {
        bail!("interrupted");
    }
    let (content, failure) = Content::resolve(gathered, || (None, fallback_items(&topic)));
    if let Some(err) = failure {
        digest_warn!("webset pipeline failed ({err:#}); using sample content");
    }
    let gathered_at = started.elapsed();
    let fallback = content.is_fallback();
    let (webset, items) = content.into_inner();

    let webset_id = webset
        .as_ref()
        .map_or(FALLBACK_WEBSET_ID, |webset| webset.id.as_str());
    let dashboard = dashboard_url(webset_id);
    let meta = NewsletterMeta {
        topic: &topic,
        webset_id,
        dashboard_url: &dashboard,
    };
    let newsletter = websets_newsletter(&items, webset.as_ref(), &meta, &now);
    println!("{newsletter}");

    let store = artifact_store(config, &topic, now)?;
    let text_path = store
        .save_text("newsletter", &newsletter)
        .context("failed to save newsletter")?;
    println!("\nNewsletter saved to {}", text_path.display());
    if let Some(webset) = &webset {
        let json_path = store
            .save_json("webset_data", webset)
            .context("failed to save webset data")?;
        println!("Webset data saved to {}", json_path.display());
    }

    digest_info!(
        "gathering took {:.1}s, total {:.1}s{}",
        gathered_at.as_secs_f64(),
        started.elapsed().as_secs_f64(),
        if fallback { " (sample content)" } else { "" }
    );
    Ok(())
}

/// Create, poll and collect. Any failure, including an empty result, sends
/// the caller to sample content.
async fn gather(
    config: &AppConfig,
    exa: &ExaClient,
    topic: &str,
    count: u32,
    now: &NaiveDateTime,
    cancel: &CancellationToken,
) -> anyhow::Result<(Option<Webset>, Vec<Item>)> {
    let step = Instant::now();
    let query = newsletter_query(topic, count, now);
    let created = until_cancelled(cancel, exa.create_webset(&query))
        .await?
        .context("failed to create webset")?;
    digest_info!(
        "webset {} created in {:.1}s",
        created.id,
        step.elapsed().as_secs_f64()
    );

    let step = Instant::now();
    let outcome = poll_until_ready(
        exa,
        &created.id,
        &config.poll_settings(),
        &LogProgressSink,
        cancel,
    )
    .await?;
    digest_info!(
        "polling finished as {:?} in {:.1}s with {} item(s)",
        outcome.completion,
        step.elapsed().as_secs_f64(),
        outcome.items.len()
    );

    if outcome.items.is_empty() {
        bail!("no items collected ({:?})", outcome.completion);
    }
    let webset = outcome.webset.unwrap_or(created);
    Ok((Some(webset), outcome.items))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn query_names_topic_and_month() {
        let now = NaiveDate::from_ymd_opt(2025, 3, 7)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap();
        let query = newsletter_query("Robotics", 5, &now);
        assert_eq!(
            query.query,
            "latest Robotics news developments announcements 2025-03"
        );
        assert_eq!(query.count, 5);
        assert_eq!(query.criteria.len(), 4);
        assert_eq!(
            query.criteria[0],
            "Recent article about Robotics developments or breakthroughs"
        );
        let titles: Vec<_> = query
            .enrichments
            .iter()
            .filter_map(|e| e.title.as_deref())
            .collect();
        assert_eq!(titles, ["Article Summary", "Key Details", "Industry Impact"]);
    }
}
