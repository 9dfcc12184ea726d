use std::collections::HashSet;

use url::Url;

use crate::model::Item;

/// Canonical form used to decide whether two item URLs are the same story:
/// lowercase scheme and host, no fragment, no trailing slash on the path.
/// Strings that do not parse as URLs are only trimmed.
pub fn normalize_url_for_dedupe(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    url.set_fragment(None);
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&path);
    // `Url` already lowercases scheme and host.
    let mut normalized = url.to_string();
    if url.query().is_none() && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// URLs reported so far by one monitor run.
#[derive(Debug, Clone, Default)]
pub struct SeenUrls {
    seen: HashSet<String>,
    total_new: usize,
}

impl SeenUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the url; `true` the first time it is seen.
    pub fn insert(&mut self, url: &str) -> bool {
        let fresh = self.seen.insert(normalize_url_for_dedupe(url));
        if fresh {
            self.total_new += 1;
        }
        fresh
    }

    /// Items whose URL has not been seen yet, in listing order. Items
    /// without a URL are skipped.
    pub fn take_new<'a>(&mut self, items: &'a [Item]) -> Vec<&'a Item> {
        items
            .iter()
            .filter(|item| item.url().is_some_and(|url| self.insert(url)))
            .collect()
    }

    pub fn total_new(&self) -> usize {
        self.total_new
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_url_for_dedupe;

    #[test]
    fn normalizes_case_fragment_and_trailing_slash() {
        assert_eq!(
            normalize_url_for_dedupe("HTTPS://Example.com/News/#top"),
            "https://example.com/News"
        );
        assert_eq!(
            normalize_url_for_dedupe("https://example.com/"),
            "https://example.com"
        );
        assert_eq!(
            normalize_url_for_dedupe("https://example.com/a/?q=1"),
            "https://example.com/a?q=1"
        );
    }

    #[test]
    fn unparsable_input_is_trimmed() {
        assert_eq!(normalize_url_for_dedupe("  not a url "), "not a url");
    }
}
