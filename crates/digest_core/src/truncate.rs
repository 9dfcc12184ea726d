//! Length-bounded text with semantic cut points.
//!
//! Lengths are counted in `char`s. The cut prefers the last paragraph break,
//! then the last sentence end, but only when that boundary keeps at least
//! `boundary_floor` of the budget; otherwise the text is hard-cut. A notice
//! with the original and kept lengths is always appended to truncated output.

/// Minimum share of the budget a boundary cut must keep.
pub const DEFAULT_BOUNDARY_FLOOR: f64 = 0.8;

const DEFAULT_REASON: &str = "length limits";

#[derive(Debug, Clone, PartialEq)]
pub struct TruncateOptions {
    pub max_len: usize,
    pub boundary_floor: f64,
    /// Completes "Content truncated due to ...".
    pub reason: String,
}

impl TruncateOptions {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            boundary_floor: DEFAULT_BOUNDARY_FLOOR,
            reason: DEFAULT_REASON.to_string(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_boundary_floor(mut self, floor: f64) -> Self {
        self.boundary_floor = floor.clamp(0.0, 1.0);
        self
    }

    fn floor_position(&self) -> f64 {
        self.max_len as f64 * self.boundary_floor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutPoint {
    Paragraph,
    Sentence,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated {
    pub text: String,
    pub was_truncated: bool,
    pub original_len: usize,
    /// Length of the kept body, not counting the notice.
    pub kept_len: usize,
    pub cut: Option<CutPoint>,
}

pub fn truncate(text: &str, options: &TruncateOptions) -> Truncated {
    let original_len = text.chars().count();
    if original_len <= options.max_len {
        return Truncated {
            text: text.to_string(),
            was_truncated: false,
            original_len,
            kept_len: original_len,
            cut: None,
        };
    }

    let prefix = char_prefix(text, options.max_len);
    let floor = options.floor_position();

    let (body, cut) = if let Some(body) = paragraph_cut(prefix, floor) {
        (body, CutPoint::Paragraph)
    } else if let Some(body) = sentence_cut(prefix, floor) {
        (body, CutPoint::Sentence)
    } else {
        (prefix, CutPoint::Hard)
    };

    let kept_len = body.chars().count();
    let mut out = String::with_capacity(body.len() + 160);
    out.push_str(body);
    out.push_str(&notice(options, original_len, kept_len));

    Truncated {
        text: out,
        was_truncated: true,
        original_len,
        kept_len,
        cut: Some(cut),
    }
}

/// The notice appended to truncated text.
pub fn notice(options: &TruncateOptions, original_len: usize, kept_len: usize) -> String {
    format!(
        "\n\n[Content truncated due to {reason}. Full content saved locally.]\n\n\
         Original content length: {original_len} characters\n\
         Sent content length: {kept_len} characters",
        reason = options.reason,
    )
}

pub fn notice_len(options: &TruncateOptions, original_len: usize, kept_len: usize) -> usize {
    notice(options, original_len, kept_len).chars().count()
}

fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn char_position(text: &str, byte_idx: usize) -> f64 {
    text[..byte_idx].chars().count() as f64
}

fn paragraph_cut(prefix: &str, floor: f64) -> Option<&str> {
    let idx = prefix.rfind("\n\n")?;
    (char_position(prefix, idx) >= floor).then(|| &prefix[..idx])
}

fn sentence_cut(prefix: &str, floor: f64) -> Option<&str> {
    // ASCII bytes never occur inside a multi-byte UTF-8 sequence.
    let bytes = prefix.as_bytes();
    let idx = (0..bytes.len().saturating_sub(1))
        .rev()
        .find(|&i| matches!(bytes[i], b'.' | b'!' | b'?') && bytes[i + 1] == b' ')?;
    (char_position(prefix, idx) >= floor).then(|| &prefix[..=idx])
}
