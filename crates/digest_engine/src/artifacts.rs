//! Local copies of everything a run produces.
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use digest_logging::digest_info;

use crate::persist::{AtomicFileWriter, PersistError};

pub const AUDIO_SUBDIR: &str = "audio";
const MAX_TOPIC_CHARS: usize = 50;

/// `{prefix}_{topic}_{YYYYmmdd_HHMMSS}.{ext}` with the topic made safe for
/// any filesystem.
pub fn artifact_filename(prefix: &str, topic: &str, ext: &str, now: &NaiveDateTime) -> String {
    let stamp = now.format("%Y%m%d_%H%M%S");
    let topic = sanitize_topic(topic);
    if topic.is_empty() {
        format!("{prefix}_{stamp}.{ext}")
    } else {
        format!("{prefix}_{topic}_{stamp}.{ext}")
    }
}

/// Spaces become underscores; anything outside `[A-Za-z0-9_-]` is dropped.
fn sanitize_topic(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.trim().chars() {
        let mapped = if c.is_whitespace() || c == '_' {
            '_'
        } else if c.is_ascii_alphanumeric() || c == '-' {
            c
        } else {
            continue;
        };
        if mapped == '_' {
            if prev_underscore {
                continue;
            }
            prev_underscore = true;
        } else {
            prev_underscore = false;
        }
        cleaned.push(mapped);
    }
    let trimmed: String = cleaned
        .trim_matches('_')
        .chars()
        .take(MAX_TOPIC_CHARS)
        .collect();
    if is_reserved_windows_name(&trimmed) {
        format!("{trimmed}_")
    } else {
        trimmed
    }
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Named artifacts of one run, all stamped with the run's start time.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    writer: AtomicFileWriter,
    topic: String,
    stamp: NaiveDateTime,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, topic: impl Into<String>, stamp: NaiveDateTime) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
            topic: topic.into(),
            stamp,
        }
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }

    pub fn filename(&self, prefix: &str, ext: &str) -> String {
        artifact_filename(prefix, &self.topic, ext, &self.stamp)
    }

    pub fn save_text(&self, prefix: &str, content: &str) -> Result<PathBuf, PersistError> {
        let path = self.writer.write(&self.filename(prefix, "txt"), content)?;
        digest_info!("saved {}", path.display());
        Ok(path)
    }

    pub fn save_html(&self, prefix: &str, content: &str) -> Result<PathBuf, PersistError> {
        let path = self.writer.write(&self.filename(prefix, "html"), content)?;
        digest_info!("saved {}", path.display());
        Ok(path)
    }

    pub fn save_json<T: serde::Serialize>(
        &self,
        prefix: &str,
        value: &T,
    ) -> Result<PathBuf, PersistError> {
        let path = self.writer.write_json(&self.filename(prefix, "json"), value)?;
        digest_info!("saved {}", path.display());
        Ok(path)
    }

    /// Audio goes to the `audio/` subfolder.
    pub fn save_audio(&self, prefix: &str, audio: &[u8]) -> Result<PathBuf, PersistError> {
        let path = self
            .writer
            .subdir(AUDIO_SUBDIR)
            .write_bytes(&self.filename(prefix, "mp3"), audio)?;
        digest_info!("saved {} ({} bytes)", path.display(), audio.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_topic() {
        assert_eq!(sanitize_topic("AI & ML  startups!"), "AI_ML_startups");
        assert_eq!(sanitize_topic("  ../etc/passwd "), "etcpasswd");
        assert_eq!(sanitize_topic("con"), "con_");
        assert_eq!(sanitize_topic("🚀"), "");
    }
}
