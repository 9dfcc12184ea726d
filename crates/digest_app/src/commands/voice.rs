use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::{Duration as DateDuration, NaiveDateTime};
use digest_core::format::{
    audio_summary, html_email, long_date, truncation_overview, voice_newsletter,
};
use digest_core::{
    fallback_answer, limit_words, normalize_for_speech, Answer, Content, Truncated,
};
use digest_engine::{
    deliver, AnswerQuery, ArtifactStore, GmailApiMailer, MailAttachment, MailTransport,
    OutgoingMessage, SmtpMailer, SmtpSettings, SpeechClient, SpeechError, TokenFileCredentials,
    VoiceSettings,
};
use digest_logging::{digest_info, digest_warn};
use tokio_util::sync::CancellationToken;

use super::{artifact_store, exa_client, now_utc, until_cancelled};
use crate::cli::{VoiceArgs, VoiceMode};
use crate::config::AppConfig;

const SOURCE_DOMAINS: [&str; 12] = [
    "techcrunch.com",
    "arstechnica.com",
    "theverge.com",
    "wired.com",
    "venturebeat.com",
    "technologyreview.com",
    "zdnet.com",
    "engadget.com",
    "reuters.com",
    "bloomberg.com",
    "forbes.com",
    "cnbc.com",
];
const LOOKBACK_DAYS: i64 = 3;
const RULE: &str = "==================================================";

fn briefing_query(topic: &str, now: &NaiveDateTime) -> AnswerQuery {
    let query = format!(
        "Create a comprehensive newsletter about the latest {topic} developments. \
Include at least 5 recent stories with:\n\
1. Specific company announcements and breakthroughs\n\
2. New product launches and innovations\n\
3. Funding rounds and business developments\n\
4. Research breakthroughs and scientific advances\n\
5. Industry trends and market movements\n\n\
For each story, provide the title, key details, and significance to the {topic} industry."
    );
    let since = *now - DateDuration::days(LOOKBACK_DAYS);
    AnswerQuery {
        query,
        text: true,
        include_domains: SOURCE_DOMAINS.iter().map(|d| d.to_string()).collect(),
        start_published_date: Some(since.format("%Y-%m-%d").to_string()),
        end_published_date: Some(now.format("%Y-%m-%d").to_string()),
    }
}

pub(super) async fn run(
    config: &AppConfig,
    args: VoiceArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let topic = args.topic.unwrap_or_else(|| config.topic.clone());
    let now = now_utc();
    let exa = exa_client(config)?;

    digest_info!("requesting {topic} briefing");
    let answered = until_cancelled(cancel, exa.answer(&briefing_query(&topic, &now))).await?;
    let (answer, failure) = Content::resolve(answered, || fallback_answer(&topic));
    if let Some(err) = failure {
        digest_warn!("answer request failed ({err}); using sample content");
    }
    let answer = limit_citations(answer.into_inner(), config.max_articles as usize);
    let content = voice_newsletter(&answer, &now);
    let store = artifact_store(config, &topic, now)?;

    if args.mode == VoiceMode::ContentOnly {
        println!("{content}");
        let path = store
            .save_text("newsletter_content", &content)
            .context("failed to save newsletter content")?;
        println!("\nContent saved to {}", path.display());
        report_elapsed(started, config.timing.voice_target_secs);
        return Ok(());
    }

    let audio = if args.mode == VoiceMode::EmailWithAudio {
        until_cancelled(cancel, spoken_summary(config, &answer, &topic, &now, &store)).await?
    } else {
        None
    };

    let sent = until_cancelled(cancel, send_email(config, &content, audio.as_ref(), &now)).await?;
    save_locally(&store, &content, sent.as_ref(), audio.as_ref())
        .context("failed to save newsletter files")?;
    report_elapsed(started, config.timing.voice_target_secs);
    Ok(())
}

fn limit_citations(mut answer: Answer, max: usize) -> Answer {
    answer.citations.truncate(max);
    answer
}

struct SpokenSummary {
    path: PathBuf,
    bytes: Vec<u8>,
}

/// Normalised, word-limited summary rendered to speech. `None` whenever
/// audio is unavailable; the newsletter goes out without it.
async fn spoken_summary(
    config: &AppConfig,
    answer: &Answer,
    topic: &str,
    now: &NaiveDateTime,
    store: &ArtifactStore,
) -> Option<SpokenSummary> {
    let Some(key) = config.elevenlabs_api_key.as_deref() else {
        digest_info!("ELEVENLABS_API_KEY not set, skipping audio");
        return None;
    };
    let text = limit_words(
        &normalize_for_speech(&audio_summary(answer, topic, now)),
        config.thresholds.audio_max_words,
        config.thresholds.audio_tail_window,
    );
    digest_info!("audio text: {} words", text.split_whitespace().count());

    let client = match SpeechClient::new(key, &config.endpoints.speech, &config.api_settings()) {
        Ok(client) => client,
        Err(err) => {
            digest_warn!("cannot build speech client: {err}");
            return None;
        }
    };
    let bytes = match client
        .synthesize(&text, &config.voice_id, VoiceSettings::default())
        .await
    {
        Ok(bytes) => bytes,
        Err(SpeechError::Unauthorized) => {
            digest_warn!("text-to-speech rejected the API key; continuing without audio");
            return None;
        }
        Err(err) => {
            digest_warn!("audio generation failed: {err}");
            return None;
        }
    };
    match store.save_audio("newsletter_audio", &bytes) {
        Ok(path) => Some(SpokenSummary { path, bytes }),
        Err(err) => {
            digest_warn!("could not save audio: {err}");
            None
        }
    }
}

fn transports(config: &AppConfig) -> Vec<Box<dyn MailTransport>> {
    let mut transports: Vec<Box<dyn MailTransport>> = Vec::new();
    let api = config.api_settings();

    if let Some(token_file) = &config.gmail_token_file {
        let mailer = TokenFileCredentials::new(token_file, &api).and_then(|credentials| {
            GmailApiMailer::new(
                Arc::new(credentials),
                &config.endpoints.gmail,
                config.thresholds.gmail_api_body_limit,
                &api,
            )
        });
        match mailer {
            Ok(mailer) => transports.push(Box::new(mailer)),
            Err(err) => digest_warn!("Gmail API transport unavailable: {err}"),
        }
    }
    if let (Some(user), Some(password)) = (&config.gmail_user, &config.gmail_app_password) {
        let mut settings = SmtpSettings::gmail(user, password);
        settings.max_body_len = config.thresholds.smtp_body_limit;
        transports.push(Box::new(SmtpMailer::new(settings)));
    }
    transports
}

/// Returns the body as sent, or `None` when nothing was delivered.
async fn send_email(
    config: &AppConfig,
    content: &str,
    audio: Option<&SpokenSummary>,
    now: &NaiveDateTime,
) -> Option<Truncated> {
    if config.recipient_emails.is_empty() {
        digest_warn!("RECIPIENT_EMAILS is empty, skipping email delivery");
        return None;
    }
    let transports = transports(config);
    if transports.is_empty() {
        digest_warn!(
            "no mail transport configured (GMAIL_TOKEN_FILE or GMAIL_USER/GMAIL_APP_PASSWORD)"
        );
        return None;
    }

    let draft = OutgoingMessage {
        from: config.sender_email.clone(),
        to: config.recipient_emails.clone(),
        subject: format!("AI Voice Newsletter - {}", long_date(now)),
        body: content.to_string(),
        attachment: audio.map(|audio| MailAttachment {
            filename: file_name(&audio.path),
            data: audio.bytes.clone(),
        }),
    };
    let ordered: Vec<&dyn MailTransport> = transports.iter().map(|t| t.as_ref()).collect();
    let report = deliver(&ordered, &draft, config.thresholds.truncation_floor).await;

    for (transport, error) in &report.failures {
        digest_warn!("{transport} failed: {error}");
    }
    match (report.transport, report.sent) {
        (Some(transport), Some(sent)) => {
            println!(
                "Newsletter sent via {transport} to {} recipient(s)",
                draft.to.len()
            );
            Some(sent)
        }
        _ => {
            println!("Email delivery failed; newsletter saved locally only");
            None
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "newsletter_audio.mp3".to_string())
}

/// Backup of what went out, with a note when the body was cut.
fn backup_text(sent: &Truncated) -> String {
    let mut out = format!("EMAIL CONTENT (What was sent via email):\n{RULE}\n");
    if sent.was_truncated {
        out.push_str("NOTE: Content was truncated for email delivery\n");
        out.push_str(&format!("Original length: {} characters\n", sent.original_len));
        out.push_str(&format!("Sent length: {} characters\n", sent.kept_len));
        out.push_str("Full content is saved in the complete newsletter file.\n\n");
    }
    out.push_str(&sent.text);
    out
}

fn truncation_summary(full: &str, sent: &Truncated) -> String {
    format!(
        "CONTENT TRUNCATION SUMMARY:\n{RULE}\n\
Original content length: {} characters\n\
Email content length: {} characters\n\
Truncated: {} characters\n\n\
Content overview:\n{}",
        sent.original_len,
        sent.kept_len,
        sent.original_len.saturating_sub(sent.kept_len),
        truncation_overview(full)
    )
}

/// Stand-in for a delivery that never happened: the full text, uncut.
fn unsent(full: &str) -> Truncated {
    let len = full.chars().count();
    Truncated {
        text: full.to_string(),
        was_truncated: false,
        original_len: len,
        kept_len: len,
        cut: None,
    }
}

fn save_locally(
    store: &ArtifactStore,
    full: &str,
    sent: Option<&Truncated>,
    audio: Option<&SpokenSummary>,
) -> anyhow::Result<()> {
    let sent = sent.cloned().unwrap_or_else(|| unsent(full));
    let path = store.save_text("newsletter_backup", &backup_text(&sent))?;
    println!("Email content saved: {}", path.display());

    if sent.was_truncated {
        let complete = format!("COMPLETE NEWSLETTER CONTENT (Full version):\n{RULE}\n{full}");
        let path = store.save_text("newsletter_complete", &complete)?;
        println!("Complete content saved: {}", path.display());
        let path = store.save_text("truncation_summary", &truncation_summary(full, &sent))?;
        println!("Truncation summary saved: {}", path.display());
    }

    let path = store.save_html("newsletter", &html_email(&sent.text))?;
    println!("HTML version saved: {}", path.display());

    if let Some(audio) = audio {
        let note = format!(
            "AUDIO ATTACHMENT CONTENT (Newsletter summary):\n{RULE}\n\
This text was converted to audio and attached to the email.\n\
The email content did NOT include this summary.\n\n\
Audio file: {}\n",
            file_name(&audio.path)
        );
        let path = store.save_text("audio_summary", &note)?;
        println!("Audio transcript saved: {}", path.display());
        println!("Audio attachment: {}", audio.path.display());
    }
    Ok(())
}

fn report_elapsed(started: Instant, target_secs: u64) {
    let elapsed = started.elapsed().as_secs_f64();
    if elapsed <= target_secs as f64 {
        digest_info!("finished in {elapsed:.1}s (target {target_secs}s)");
    } else {
        digest_warn!("finished in {elapsed:.1}s, over the {target_secs}s target");
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use digest_core::{truncate, TruncateOptions};
    use pretty_assertions::assert_eq;

    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 7)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    #[test]
    fn briefing_covers_last_three_days() {
        let query = briefing_query("Robotics", &now());
        assert!(query.query.starts_with(
            "Create a comprehensive newsletter about the latest Robotics developments."
        ));
        assert_eq!(query.start_published_date.as_deref(), Some("2025-03-04"));
        assert_eq!(query.end_published_date.as_deref(), Some("2025-03-07"));
        assert_eq!(query.include_domains.len(), 12);
        assert!(query.text);
    }

    #[test]
    fn backup_notes_truncation_only_when_it_happened() {
        let plain = backup_text(&unsent("same"));
        assert!(!plain.contains("NOTE:"));
        assert!(plain.ends_with("same"));

        let full = "word ".repeat(40);
        let cut = backup_text(&truncate(&full, &TruncateOptions::new(50)));
        assert!(cut.contains("Original length: 200 characters"));
        assert!(cut.contains("Sent length: 50 characters"));
    }

    #[test]
    fn truncation_summary_counts_body_without_notice() {
        let full = "é".repeat(30);
        let sent = truncate(&full, &TruncateOptions::new(10));
        let summary = truncation_summary(&full, &sent);
        assert!(summary.contains("Original content length: 30 characters"));
        assert!(summary.contains("Email content length: 10 characters"));
        assert!(summary.contains("Truncated: 20 characters"));
    }

    #[test]
    fn multibyte_text_sent_whole_is_not_reported_as_cut() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), "AI", now());
        let full = "Café news – naïve résumé";
        let sent = truncate(full, &TruncateOptions::new(500));
        assert!(!sent.was_truncated);

        save_locally(&store, full, Some(&sent), None).unwrap();
        let names = saved_files(dir.path());
        assert!(names.iter().any(|n| n.starts_with("newsletter_backup")));
        assert!(!names.iter().any(|n| n.starts_with("newsletter_complete")));
        assert!(!names.iter().any(|n| n.starts_with("truncation_summary")));
    }

    #[test]
    fn cut_delivery_keeps_complete_copy_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), "AI", now());
        let full = "x".repeat(300);
        let sent = truncate(&full, &TruncateOptions::new(100));

        save_locally(&store, &full, Some(&sent), None).unwrap();
        let names = saved_files(dir.path());
        assert!(names.iter().any(|n| n.starts_with("newsletter_complete")));
        assert!(names.iter().any(|n| n.starts_with("truncation_summary")));
    }

    fn saved_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn citations_are_capped() {
        let answer = fallback_answer("AI");
        assert_eq!(limit_citations(answer.clone(), 1).citations.len(), 1);
        assert_eq!(limit_citations(answer, 8).citations.len(), 2);
    }
}
