//! Rewrites newsletter text into something a speech synthesizer reads well.
//!
//! The stages run in a fixed order: pictographs, markdown, date phrases,
//! phrase substitution, URLs, whitespace, terminal punctuation. Later stages
//! rely on the earlier ones (for example the URL pattern runs after `&` and
//! `%` have already been spelled out).
use std::sync::LazyLock;

use regex::{Captures, Regex};

pub const DEFAULT_MAX_WORDS: usize = 200;
pub const DEFAULT_TAIL_WINDOW: usize = 50;

const ACRONYMS: &[&str] = &[
    "AI", "AGI", "API", "APIs", "CEO", "CFO", "CTO", "CPU", "GPU", "GPUs", "LLM", "LLMs", "ML",
    "NLP", "VR", "EU", "UK", "US",
];

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_compile_err) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(fallback_err) => panic!("hardcoded fallback regex must compile: {fallback_err}"),
        },
    }
}

static PICTOGRAPHS: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(
        r"[\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}\x{2B00}-\x{2BFF}\x{2190}-\x{21FF}\x{2300}-\x{23FF}\x{2500}-\x{25FF}\x{FE0F}\x{200D}\x{20E3}]",
    )
});

static MD_IMAGE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"!\[[^\]]*\]\([^)]*\)"));
static MD_LINK: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\[([^\]]+)\]\([^)]*\)"));
static MD_HEADING: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?m)^[ \t]*#{1,6}[ \t]*"));
static MD_QUOTE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?m)^[ \t]*>[ \t]?"));
static MD_RULE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?m)^[ \t]*[-=_*]{3,}[ \t]*$"));
static MD_LIST: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?m)^[ \t]*(?:[-*+\x{2022}]|\d{1,3}[.)])[ \t]+"));
static MD_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\*{1,3}|_{2,3}|`+|~~"));

const MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec";
const WEEKDAYS: &str = "Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday";
const LEADING_PREPOSITION: &str = r"(?:\b(?:on|for|as of|since|from)\s+)?";

static MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(&format!(
        r"(?i){LEADING_PREPOSITION}\b(?:{MONTHS})\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}\b"
    ))
});
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(&format!(
        r"(?i){LEADING_PREPOSITION}\b\d{{4}}-\d{{2}}-\d{{2}}(?:[T ]\d{{2}}:\d{{2}}(?::\d{{2}}(?:\.\d+)?)?(?:Z|[+-]\d{{2}}:?\d{{2}})?)?\b"
    ))
});
static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(&format!(r"(?i){LEADING_PREPOSITION}\b(?:{WEEKDAYS})s?\b,?"))
});
static PART_OF_DAY: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r"(?i)\b(?:earlier\s+|later\s+)?this\s+(?:morning|afternoon|evening)\b,?")
});
static RELATIVE_DAY: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r"(?i)\b(?:earlier\s+|later\s+)?(?:today|tonight|yesterday)('s)?\b,?")
});

static PERCENT: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\s*%"));
static AMPERSAND: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\s*&\s*"));
static AT_SIGN: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\s*@\s*"));
static FOR_EXAMPLE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?i)\be\.g\.,?"));
static THAT_IS: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?i)\bi\.e\.,?"));
static VERSUS: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?i)\bvs\.?(\s)"));
static ET_CETERA: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"(?i)\betc\."));
static ACRONYM: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(&format!(r"\b(?:{})\b", ACRONYMS.join("|"))));

// Tolerates schemes split by whitespace or empty brackets, which `collapse` would rejoin.
static URL: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(r"(?i)(?:https?[\s()\[\]]*:[\s()\[\]]*//|www\.)\S*")
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\s+"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\s+([.,!?;:])"));
static EMPTY_BRACKETS: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\(\s*\)|\[\s*\]"));
static REPEATED_TERMINAL: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"([.!?])[.!?,;:]+"));
static REPEATED_PAUSE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"[,;:]+([.!?,;:])"));
static LEADING_PUNCT: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"^[\s.,;:!?-]+"));

/// Full speech normalization pipeline.
pub fn normalize_for_speech(text: &str) -> String {
    let text = strip_pictographs(text);
    let text = strip_markdown(&text);
    let text = strip_date_phrases(&text);
    let text = substitute_phrases(&text);
    let text = strip_urls(&text);
    let text = collapse(&text);
    // Collapsing can still glue a scheme back together; strip once more.
    let text = collapse(&strip_urls(&text));
    ensure_terminal_punctuation(text)
}

/// Removes emoji, dingbats, arrows and box-drawing characters.
pub fn strip_pictographs(text: &str) -> String {
    PICTOGRAPHS.replace_all(text, "").into_owned()
}

fn strip_markdown(text: &str) -> String {
    let text = MD_IMAGE.replace_all(text, "");
    let text = MD_LINK.replace_all(&text, "$1");
    let text = MD_RULE.replace_all(&text, "");
    let text = MD_HEADING.replace_all(&text, "");
    let text = MD_QUOTE.replace_all(&text, "");
    let text = MD_LIST.replace_all(&text, "");
    MD_EMPHASIS.replace_all(&text, "").into_owned()
}

fn strip_date_phrases(text: &str) -> String {
    let text = MONTH_DAY_YEAR.replace_all(text, "");
    let text = ISO_DATE.replace_all(&text, "");
    let text = WEEKDAY.replace_all(&text, "");
    let text = PART_OF_DAY.replace_all(&text, "");
    // "today's briefing" reads fine; only the bare adverbs go.
    RELATIVE_DAY
        .replace_all(&text, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

fn substitute_phrases(text: &str) -> String {
    let text = AMPERSAND.replace_all(text, " and ");
    let text = PERCENT.replace_all(&text, " percent");
    let text = AT_SIGN.replace_all(&text, " at ");
    let text = FOR_EXAMPLE.replace_all(&text, "for example");
    let text = THAT_IS.replace_all(&text, "that is");
    let text = VERSUS.replace_all(&text, "versus$1");
    let text = ET_CETERA.replace_all(&text, "et cetera.");
    ACRONYM
        .replace_all(&text, |caps: &Captures<'_>| spell_out(&caps[0]))
        .into_owned()
}

/// "GPUs" becomes "G P Us" so the plural still reads naturally.
fn spell_out(acronym: &str) -> String {
    let (letters, suffix) = match acronym.strip_suffix('s') {
        Some(stem) if stem.chars().all(|c| c.is_ascii_uppercase()) => (stem, "s"),
        _ => (acronym, ""),
    };
    let spaced: Vec<String> = letters.chars().map(|c| c.to_string()).collect();
    format!("{}{}", spaced.join(" "), suffix)
}

fn strip_urls(text: &str) -> String {
    URL.replace_all(text, " ").into_owned()
}

fn collapse(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    let text = EMPTY_BRACKETS.replace_all(&text, "");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = REPEATED_PAUSE.replace_all(&text, "$1");
    let text = REPEATED_TERMINAL.replace_all(&text, "$1");
    let text = LEADING_PUNCT.replace_all(&text, "");
    text.trim().to_string()
}

fn ensure_terminal_punctuation(mut text: String) -> String {
    while text.ends_with([',', ';', ':', '-']) {
        text.pop();
        text.truncate(text.trim_end().len());
    }
    if text.is_empty() {
        return ".".to_string();
    }
    if !text.ends_with(['.', '!', '?']) {
        text.push('.');
    }
    text
}

/// Caps text at `max_words` words. The result ends on the last sentence
/// terminator when one falls within `tail_window` characters of the cut,
/// otherwise a period is appended.
pub fn limit_words(text: &str, max_words: usize, tail_window: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    let mut limited = words[..max_words].join(" ");
    let last_terminal = limited.rfind(['.', '!', '?']);
    match last_terminal {
        Some(idx) if idx + tail_window > limited.len() => limited.truncate(idx + 1),
        _ => limited.push('.'),
    }
    limited
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spells_plural_acronyms() {
        assert_eq!(spell_out("GPUs"), "G P Us");
        assert_eq!(spell_out("AI"), "A I");
    }

    #[test]
    fn possessive_today_is_kept() {
        assert_eq!(
            strip_date_phrases("Today's picks, published today."),
            "Today's picks, published ."
        );
    }

    #[test]
    fn trailing_pause_becomes_period() {
        assert_eq!(ensure_terminal_punctuation("Key points:".into()), "Key points.");
        assert_eq!(ensure_terminal_punctuation(String::new()), ".");
    }
}
