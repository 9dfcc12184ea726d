//! Plain-text renderings of webset items, answers and reports.
//!
//! Every function is pure: the current time is passed in so output is
//! reproducible in tests.
use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::model::{Answer, Item, Webset};

pub const EMPTY_NEWSLETTER: &str = "No recent content found for today's newsletter.";

const RULE_WIDTH: usize = 60;
const ANALYSIS_ITEM_LIMIT: usize = 8;
const ANALYSIS_SNIPPET_CHARS: usize = 200;
const REPORT_SOURCE_LIMIT: usize = 5;
const OVERVIEW_LINES: usize = 10;
const OVERVIEW_CHARS: usize = 500;

/// Header data for the websets newsletter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsletterMeta<'a> {
    pub topic: &'a str,
    pub webset_id: &'a str,
    pub dashboard_url: &'a str,
}

pub fn long_date(now: &NaiveDateTime) -> String {
    now.format("%B %d, %Y").to_string()
}

fn generated_stamp(now: &NaiveDateTime) -> String {
    now.format("%Y-%m-%d at %H:%M UTC").to_string()
}

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

/// First `max_chars` characters, with "..." when something was cut.
pub fn ellipsize(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Headline for an item: its description, unless that is missing or just a URL.
pub fn story_title(item: &Item, index: usize) -> String {
    match item.description().or_else(|| item.title()) {
        Some(title) if !title.starts_with("http") => title.to_string(),
        _ => format!("Story #{index}"),
    }
}

fn enrichment_label(title: &str) -> &str {
    match title {
        "Article Summary" => "Summary",
        other => other,
    }
}

/// Newsletter built from enriched webset items.
pub fn websets_newsletter(
    items: &[Item],
    webset: Option<&Webset>,
    meta: &NewsletterMeta<'_>,
    now: &NaiveDateTime,
) -> String {
    if items.is_empty() {
        return EMPTY_NEWSLETTER.to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "AI NEWSLETTER - {}", long_date(now));
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(out);
    let _ = writeln!(out, "DAILY {} BRIEFING", meta.topic.to_uppercase());
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Welcome to your AI-powered daily newsletter! Here are today's key developments from our curated webset analysis:"
    );
    let _ = writeln!(out);

    for (idx, item) in items.iter().enumerate() {
        let number = idx + 1;
        let _ = writeln!(out, "STORY #{number}: {}", story_title(item, number));
        let _ = writeln!(out, "   {}", "-".repeat(50));
        let _ = writeln!(out, "   Source: {}", item.url().unwrap_or("No URL"));
        if let Some(published) = item.published_date() {
            let _ = writeln!(out, "   Published: {published}");
        }
        for enrichment in &item.enrichments {
            let Some(result) = enrichment.first_result() else {
                continue;
            };
            let title = enrichment
                .title
                .as_deref()
                .or_else(|| {
                    let id = enrichment.enrichment_id.as_deref()?;
                    webset?.enrichment_title(id)
                })
                .unwrap_or("Analysis");
            let _ = writeln!(out, "   {}: {result}", enrichment_label(title));
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "CONTENT SOURCE");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "Webset ID: {}", meta.webset_id);
    let _ = writeln!(out, "View full webset: {}", meta.dashboard_url);
    let _ = writeln!(out, "Articles analyzed: {}", items.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "NEWSLETTER STATS");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "- Articles curated: {}", items.len());
    let _ = writeln!(out, "- Topic focus: {}", meta.topic);
    let _ = writeln!(out, "- Generated: {}", generated_stamp(now));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "This newsletter is generated from AI-curated content from trusted sources."
    );
    let _ = write!(
        out,
        "Each story is enriched with summaries and impact analysis."
    );
    out
}

/// Newsletter body built from a generated answer and its citations.
pub fn voice_newsletter(answer: &Answer, now: &NaiveDateTime) -> String {
    if answer.answer.trim().is_empty() {
        return EMPTY_NEWSLETTER.to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "AI VOICE NEWSLETTER - {}", long_date(now));
    let _ = writeln!(out);
    let _ = writeln!(out, "Welcome to your daily AI-powered voice newsletter!");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", answer.answer.trim_end());
    let _ = writeln!(out);

    if !answer.citations.is_empty() {
        let _ = writeln!(out, "\n**Sources:**");
        for (idx, citation) in answer.citations.iter().enumerate() {
            let title = citation.title.as_deref().unwrap_or("Source");
            let _ = writeln!(out, "{}. [{title}]({})", idx + 1, citation.url);
        }
    }

    let _ = write!(
        out,
        "\n\nGenerated on {} using [Exa AI](https://docs.exa.ai/reference/answer)",
        generated_stamp(now)
    );
    out
}

/// Short spoken summary: header sentence plus the first three sentences
/// of the answer.
pub fn audio_summary(answer: &Answer, topic: &str, now: &NaiveDateTime) -> String {
    if answer.answer.trim().is_empty() {
        return EMPTY_NEWSLETTER.to_string();
    }
    let key_points = answer
        .answer
        .split(". ")
        .take(3)
        .collect::<Vec<_>>()
        .join(". ");
    format!(
        "AI Voice Newsletter Summary for {date}. \
         Today's newsletter covers the latest developments in {topic}, based on {count} quality sources. \
         Key highlights include: {key_points}. \
         For complete details and source links, please refer to the full newsletter content.",
        date = long_date(now),
        count = answer.citations.len(),
    )
}

/// Prompt handed to the chat model when analysing collected articles.
pub fn analysis_prompt(items: &[Item]) -> String {
    let mut summary = String::new();
    for item in items.iter().take(ANALYSIS_ITEM_LIMIT) {
        let title = item.title().or_else(|| item.url()).unwrap_or("No title");
        let body = item
            .description()
            .or_else(|| item.property("text"))
            .unwrap_or("");
        let _ = writeln!(
            summary,
            "- {title}: {}",
            ellipsize(body, ANALYSIS_SNIPPET_CHARS)
        );
    }

    format!(
        "Analyze the following recent news articles and provide:\n\
         1. Key trends and patterns\n\
         2. Most significant developments\n\
         3. Potential implications and predictions\n\
         4. Market/industry impact assessment\n\n\
         News Articles:\n{summary}\n\
         Please provide a structured analysis with clear insights."
    )
}

pub fn analysis_report(
    webset: &Webset,
    items: &[Item],
    analysis: &str,
    now: &NaiveDateTime,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "NEWS ANALYSIS REPORT");
    let _ = writeln!(out, "===================");
    let _ = writeln!(out, "Generated: {}", now.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(
        out,
        "Webset: {}",
        webset.title.as_deref().unwrap_or(&webset.id)
    );
    let _ = writeln!(out, "Articles Analyzed: {}", items.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "SOURCES OVERVIEW:");
    for (idx, item) in items.iter().take(REPORT_SOURCE_LIMIT).enumerate() {
        let title = item.title().or_else(|| item.url()).unwrap_or("No title");
        let _ = writeln!(out, "{}. {title}", idx + 1);
        let _ = writeln!(out, "   URL: {}", item.url().unwrap_or("No URL"));
        let _ = writeln!(
            out,
            "   Published: {}",
            item.published_date().unwrap_or("Unknown date")
        );
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "\nAI ANALYSIS:\n{}\n{analysis}", "=".repeat(50));
    out
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Minimal standalone HTML page for the newsletter text.
pub fn html_email(content: &str) -> String {
    let body = escape_html(content).replace('\n', "<br>\n");
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; max-width: 600px; margin: 0 auto; padding: 20px; }}
        .content {{ padding: 20px; background: #f9f9f9; border-radius: 10px; }}
        a {{ color: #2196F3; text-decoration: none; }}
    </style>
</head>
<body>
    <div class="content">
        {body}
    </div>
</body>
</html>"#
    )
}

/// Section headers and story titles of a long newsletter, for the
/// truncation summary file.
pub fn truncation_overview(content: &str) -> String {
    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            if let Some(title) = line.strip_prefix("*   **Title:**") {
                Some(format!("- {}", title.trim()))
            } else if line.len() > 4 && line.starts_with("**") && line.ends_with("**") {
                Some(line.to_string())
            } else {
                None
            }
        })
        .take(OVERVIEW_LINES)
        .collect();
    ellipsize(&lines.join("\n"), OVERVIEW_CHARS)
}

#[cfg(test)]
mod tests {
    use super::{ellipsize, escape_html};

    #[test]
    fn ellipsize_is_char_safe() {
        assert_eq!(ellipsize("héllo", 2), "hé...");
        assert_eq!(ellipsize("hi", 2), "hi");
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(escape_html("<a & b>"), "&lt;a &amp; b&gt;");
    }
}
