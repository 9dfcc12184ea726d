use anyhow::Context;
use digest_engine::{dashboard_url, poll_until_ready, LogProgressSink, WebsetQuery};
use digest_logging::digest_info;
use tokio_util::sync::CancellationToken;

use super::{exa_client, print_item, print_webset_details, until_cancelled};
use crate::cli::SearchArgs;
use crate::config::AppConfig;

pub(super) async fn run(
    config: &AppConfig,
    args: SearchArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let exa = exa_client(config)?;
    digest_info!("creating webset for {:?} ({} items)", args.query, args.count);

    let query = WebsetQuery::new(&args.query, args.count);
    let webset = until_cancelled(cancel, exa.create_webset(&query))
        .await?
        .context("failed to create webset")?;
    print_webset_details(&webset);
    println!("View results: {}", dashboard_url(&webset.id));

    if !args.wait {
        return Ok(());
    }

    let outcome = poll_until_ready(
        &exa,
        &webset.id,
        &config.poll_settings(),
        &LogProgressSink,
        cancel,
    )
    .await?;
    println!(
        "\n{:?} after {}s with {} item(s)",
        outcome.completion,
        outcome.elapsed.as_secs(),
        outcome.items.len()
    );
    for (idx, item) in outcome.items.iter().enumerate() {
        print_item(item, idx + 1, outcome.webset.as_ref());
    }
    Ok(())
}
