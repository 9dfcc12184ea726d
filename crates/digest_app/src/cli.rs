use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use digest_logging::LogDestination;

#[derive(Debug, Parser)]
#[command(
    name = "webset-digest",
    version,
    about = "Build news digests from Exa websets, with optional audio and email delivery"
)]
pub struct Cli {
    /// RON file with configuration overrides.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for saved reports, newsletters and audio.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogArg::Terminal, global = true)]
    pub log: LogArg,

    /// Log HTTP payloads and other debug detail.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogArg {
    Terminal,
    File,
    Both,
}

impl From<LogArg> for LogDestination {
    fn from(value: LogArg) -> Self {
        match value {
            LogArg::Terminal => LogDestination::Terminal,
            LogArg::File => LogDestination::File,
            LogArg::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a webset and print its details.
    Search(SearchArgs),
    /// Create a webset with criteria and enrichments, then show enrichment results.
    Enrich(EnrichArgs),
    /// Create a webset with a scheduled monitor and report new items until Ctrl-C.
    Monitor(MonitorArgs),
    /// Collect recent news on a topic and produce an LLM analysis report.
    Analyze(AnalyzeArgs),
    /// Build a newsletter from an enriched webset.
    Newsletter(NewsletterArgs),
    /// Build a briefing from the answer endpoint, with audio and email delivery.
    Voice(VoiceArgs),
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(long, default_value = "Latest AI breakthroughs 2024")]
    pub query: String,
    #[arg(long, default_value_t = 10)]
    pub count: u32,
    /// Poll until the webset is ready and list its items.
    #[arg(long)]
    pub wait: bool,
}

#[derive(Debug, Args)]
pub struct EnrichArgs {
    #[arg(long, default_value = "AI startup funding rounds announced in 2024")]
    pub query: String,
    #[arg(long, default_value_t = 5)]
    pub count: u32,
    /// Poll until enrichments settle before showing items.
    #[arg(long)]
    pub wait: bool,
}

#[derive(Debug, Args)]
pub struct MonitorArgs {
    #[arg(long, default_value = "AI breakthrough news 2024")]
    pub query: String,
    #[arg(long, default_value_t = 5)]
    pub count: u32,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[arg(long, default_value = "AI breakthroughs")]
    pub topic: String,
}

#[derive(Debug, Args)]
pub struct NewsletterArgs {
    /// Defaults to the configured topic.
    #[arg(long)]
    pub topic: Option<String>,
    #[arg(long, default_value_t = 5)]
    pub count: u32,
}

#[derive(Debug, Args)]
pub struct VoiceArgs {
    #[arg(long, value_enum, default_value_t = VoiceMode::EmailWithAudio)]
    pub mode: VoiceMode,
    /// Defaults to the configured topic.
    #[arg(long)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VoiceMode {
    /// Generate and save the newsletter only.
    ContentOnly,
    /// Email the newsletter without audio.
    Email,
    /// Email the newsletter with a spoken summary attached.
    EmailWithAudio,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "webset-digest",
            "voice",
            "--mode",
            "content-only",
            "--log",
            "both",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.log, LogArg::Both);
        match cli.command {
            Command::Voice(args) => {
                assert_eq!(args.mode, VoiceMode::ContentOnly);
                assert_eq!(args.topic, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn search_defaults() {
        let cli = Cli::try_parse_from(["webset-digest", "search"]).unwrap();
        let Command::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.query, "Latest AI breakthroughs 2024");
        assert_eq!(args.count, 10);
        assert!(!args.wait);
    }
}
