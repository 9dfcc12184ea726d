use crate::model::{Answer, Citation, Enrichment, Item};

/// Output of a remote step, or the local placeholder used instead of it.
#[derive(Debug, Clone, PartialEq)]
pub enum Content<T> {
    Generated(T),
    Fallback(T),
}

impl<T> Content<T> {
    /// The single place where a failed remote step turns into fallback
    /// content. The error is handed back so the caller can report it.
    pub fn resolve<E>(result: Result<T, E>, fallback: impl FnOnce() -> T) -> (Self, Option<E>) {
        match result {
            Ok(value) => (Content::Generated(value), None),
            Err(err) => (Content::Fallback(fallback()), Some(err)),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Content::Fallback(_))
    }

    pub fn get(&self) -> &T {
        match self {
            Content::Generated(value) | Content::Fallback(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Content::Generated(value) | Content::Fallback(value) => value,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Content<U> {
        match self {
            Content::Generated(value) => Content::Generated(f(value)),
            Content::Fallback(value) => Content::Fallback(f(value)),
        }
    }
}

/// Sample briefing used when the answer endpoint is unavailable.
pub fn fallback_answer(topic: &str) -> Answer {
    let answer = format!(
        "Today's {topic} Newsletter\n\n\
Here are the latest developments in {topic}:\n\n\
1. **Model Research**: Continued improvements in language models and safety research, with new partnerships announced for enterprise applications.\n\n\
2. **Scientific Computing**: Recent developments in machine learning efficiency, showing promising results in scientific research applications.\n\n\
3. **Autonomous Systems**: Progress in autonomous driving technology and AI-powered manufacturing processes, expanding deployment across multiple cities.\n\n\
4. **Workplace Tools**: Enhanced productivity tools with AI assistance, focusing on workplace automation and developer productivity improvements.\n\n\
5. **Startup Ecosystem**: Multiple startups securing significant funding rounds, indicating strong investor confidence in the sector's growth potential.\n\n\
These developments represent significant progress in {topic}, with implications for industry transformation and technological advancement."
    );
    let citations = vec![
        Citation {
            url: "https://techcrunch.com/ai-developments".to_string(),
            title: Some(format!("Latest {topic} Developments - TechCrunch")),
            text: Some(format!(
                "Recent advances in {topic} technology and industry news"
            )),
        },
        Citation {
            url: "https://arstechnica.com/ai-news".to_string(),
            title: Some(format!("{topic} Innovation Report - Ars Technica")),
            text: Some(format!(
                "Technical analysis of {topic} breakthroughs and research"
            )),
        },
    ];
    Answer { answer, citations }
}

/// Sample item set used when the webset pipeline fails.
pub fn fallback_items(topic: &str) -> Vec<Item> {
    let mut item = Item::with_properties(
        "https://example.com/news1",
        &format!("Recent {topic} Development #1"),
    );
    item.enrichments.push(Enrichment::completed(
        "Article Summary",
        format!("Significant advancement in {topic} technology with new breakthrough announced."),
    ));
    vec![item]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_picks_fallback_on_error() {
        let (content, err) = Content::resolve(Err::<u32, _>("boom"), || 7);
        assert_eq!(content, Content::Fallback(7));
        assert_eq!(err, Some("boom"));

        let (content, err) = Content::resolve(Ok::<_, &str>(1), || 7);
        assert!(!content.is_fallback());
        assert_eq!(err, None);
    }

    #[test]
    fn fallback_items_have_completed_summary() {
        let items = fallback_items("Robotics");
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].enrichments[0].first_result(),
            Some("Significant advancement in Robotics technology with new breakthrough announced.")
        );
    }
}
