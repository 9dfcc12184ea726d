use anyhow::Context;
use digest_core::{format::ellipsize, Item, SeenUrls};
use digest_engine::{
    dashboard_url, watch_new_items, MonitorSchedule, WebsetApi, WebsetQuery,
};
use digest_logging::{digest_info, digest_warn};
use tokio_util::sync::CancellationToken;

use super::{exa_client, until_cancelled};
use crate::cli::MonitorArgs;
use crate::config::AppConfig;

pub(super) async fn run(
    config: &AppConfig,
    args: MonitorArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let exa = exa_client(config)?;
    let query = WebsetQuery::new(&args.query, args.count).articles();

    let webset = until_cancelled(cancel, exa.create_webset(&query))
        .await?
        .context("failed to create webset")?;
    println!("Webset ID: {}", webset.id);
    println!("View results: {}", dashboard_url(&webset.id));

    // The server-side schedule is a bonus; local polling works without it.
    let schedule = MonitorSchedule::default();
    match until_cancelled(cancel, exa.create_monitor(&webset.id, &query, &schedule)).await? {
        Ok(monitor) => digest_info!("monitor {} scheduled", monitor.id),
        Err(err) => digest_warn!("could not schedule monitor: {err}"),
    }

    let mut seen = SeenUrls::new();
    match until_cancelled(cancel, exa.list_items(&webset.id)).await? {
        Ok(items) => {
            let fresh = seen.take_new(&items);
            println!("\nInitial items ({}):", fresh.len());
            for (idx, item) in fresh.iter().enumerate() {
                println!("{}. {}", idx + 1, ellipsize(headline(item), 50));
            }
        }
        Err(err) => digest_warn!("initial listing failed: {err}"),
    }

    println!("\nWatching for new items. Press Ctrl-C to stop.");
    let mut reported = 0usize;
    let summary = watch_new_items(
        &exa,
        &webset.id,
        &mut seen,
        &config.monitor_settings(),
        cancel,
        |item| {
            reported += 1;
            println!("#{reported}: {}", ellipsize(headline(item), 60));
            println!("   {}", item.url().unwrap_or("N/A"));
        },
    )
    .await;

    println!(
        "\nMonitoring stopped. Found {} total items",
        seen.total_new()
    );
    digest_info!(
        "{} checks, {} failed, {} new since start",
        summary.checks,
        summary.failed_checks,
        summary.new_items
    );
    Ok(())
}

fn headline(item: &Item) -> &str {
    item.title()
        .or_else(|| item.description())
        .or_else(|| item.url())
        .unwrap_or("Untitled")
}
