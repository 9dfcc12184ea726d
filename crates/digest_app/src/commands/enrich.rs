use std::time::Duration;

use anyhow::Context;
use digest_core::{EnrichmentDefinition, Item};
use digest_engine::{
    dashboard_url, poll_until_ready, ExaClient, LogProgressSink, WebsetApi, WebsetQuery,
};
use digest_logging::{digest_info, digest_warn};
use tokio_util::sync::CancellationToken;

use super::{exa_client, print_item, print_webset_details, until_cancelled};
use crate::cli::EnrichArgs;
use crate::config::AppConfig;

const ITEM_FETCH_ATTEMPTS: u32 = 3;
const ITEM_FETCH_DELAY: Duration = Duration::from_secs(2);

fn funding_query(args: &EnrichArgs) -> WebsetQuery {
    WebsetQuery {
        criteria: vec![
            "Article about AI startup raising funding".to_string(),
            "Article mentions funding amount and investors".to_string(),
            "Article from credible tech or business publication".to_string(),
        ],
        enrichments: vec![
            EnrichmentDefinition::text(
                "Company Details",
                "Extract company name, funding amount, and what they do",
            ),
            EnrichmentDefinition::text(
                "Key Investors",
                "Extract lead investor and other participants",
            ),
        ],
        ..WebsetQuery::new(&args.query, args.count)
    }
}

pub(super) async fn run(
    config: &AppConfig,
    args: EnrichArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let exa = exa_client(config)?;
    let query = funding_query(&args);
    digest_info!(
        "creating webset with {} criteria and {} enrichments",
        query.criteria.len(),
        query.enrichments.len()
    );

    let webset = until_cancelled(cancel, exa.create_webset(&query))
        .await?
        .context("failed to create enriched webset")?;
    print_webset_details(&webset);
    println!("View results: {}", dashboard_url(&webset.id));

    let (items, latest) = if args.wait {
        let outcome = poll_until_ready(
            &exa,
            &webset.id,
            &config.poll_settings(),
            &LogProgressSink,
            cancel,
        )
        .await?;
        (outcome.items, outcome.webset)
    } else {
        (fetch_items(&exa, &webset.id, cancel).await, None)
    };

    if items.is_empty() {
        println!("\nNo items yet. The webset is still searching; check the dashboard link above.");
        return Ok(());
    }
    let definitions = latest.as_ref().unwrap_or(&webset);
    println!("\nFound {} item(s):", items.len());
    for (idx, item) in items.iter().enumerate() {
        print_item(item, idx + 1, Some(definitions));
    }
    Ok(())
}

/// A few quick listings; a fresh webset usually has no items yet.
async fn fetch_items(exa: &ExaClient, webset_id: &str, cancel: &CancellationToken) -> Vec<Item> {
    for attempt in 1..=ITEM_FETCH_ATTEMPTS {
        let listed = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = exa.list_items(webset_id) => result,
        };
        match listed {
            Ok(items) if !items.is_empty() => return items,
            Ok(_) => digest_info!("attempt {attempt}/{ITEM_FETCH_ATTEMPTS}: no items yet"),
            Err(err) => digest_warn!("attempt {attempt}/{ITEM_FETCH_ATTEMPTS}: {err}"),
        }
        if attempt < ITEM_FETCH_ATTEMPTS {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(ITEM_FETCH_DELAY) => {}
            }
        }
    }
    Vec::new()
}
