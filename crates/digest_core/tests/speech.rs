use digest_core::speech::{strip_pictographs, DEFAULT_MAX_WORDS, DEFAULT_TAIL_WINDOW};
use digest_core::{limit_words, normalize_for_speech};
use pretty_assertions::assert_eq;

#[test]
fn output_has_no_urls_and_ends_with_terminal_punctuation() {
    let inputs = [
        "",
        "   ",
        "See https://example.com/story?id=1&ref=x for more",
        "Read it at www.example.org/path, or http://old.example.net:",
        "🚀🚀🚀",
        "**Sources:**\n1. [TechCrunch](https://techcrunch.com/a)\n2. [Wired](https://wired.com/b)",
        "Question?",
        "Trailing dash -",
        "Prices rose 5% & fell 3%; analysts were surprised,",
    ];
    for input in inputs {
        let spoken = normalize_for_speech(input);
        assert!(!spoken.contains("http://"), "{input:?} -> {spoken:?}");
        assert!(!spoken.contains("https://"), "{input:?} -> {spoken:?}");
        assert!(
            spoken.ends_with(['.', '!', '?']),
            "{input:?} -> {spoken:?}"
        );
    }
}

#[test]
fn strips_markdown_but_keeps_link_labels() {
    let spoken = normalize_for_speech("## Heading\n- **Bold** item with [a link](https://x.com)");
    assert_eq!(spoken, "Heading Bold item with a link.");
}

#[test]
fn spells_out_symbols_and_acronyms() {
    let spoken = normalize_for_speech("AI & ML grew 40% 🚀");
    assert_eq!(spoken, "A I and M L grew 40 percent.");
}

#[test]
fn removes_date_phrases() {
    let spoken = normalize_for_speech(
        "On Monday, OpenAI announced on January 5, 2025 a new model this morning.",
    );
    assert_eq!(spoken, "OpenAI announced a new model.");

    let spoken = normalize_for_speech("Published 2024-06-01T09:30:00Z by the team yesterday.");
    assert_eq!(spoken, "Published by the team.");
}

#[test]
fn clean_input_is_left_alone() {
    assert_eq!(normalize_for_speech("Hello world."), "Hello world.");
    assert_eq!(normalize_for_speech("Is it ready?"), "Is it ready?");
}

#[test]
fn schemes_rejoined_by_cleanup_are_still_removed() {
    for input in [
        "Read more at https ://example.com/story",
        "Source: http()://example.com/x",
        "Nested http(( )) ://example.com/y and more",
        "Odd http:()//example.com/z link",
    ] {
        let spoken = normalize_for_speech(input);
        assert!(!spoken.contains("http://"), "{input:?} -> {spoken:?}");
        assert!(!spoken.contains("https://"), "{input:?} -> {spoken:?}");
        assert!(!spoken.contains("example.com"), "{input:?} -> {spoken:?}");
    }
    assert_eq!(
        normalize_for_speech("Read more at https ://example.com/story"),
        "Read more at."
    );
}

#[test]
fn pictographs_and_box_drawing_are_removed() {
    assert_eq!(strip_pictographs("━━ ✅ Done 📰"), "  Done ");
}

#[test]
fn limit_words_prefers_sentence_end_near_the_cut() {
    let sentence = "one two three four five six seven eight nine ten. ";
    let text = sentence.repeat(30);

    let limited = limit_words(&text, DEFAULT_MAX_WORDS, DEFAULT_TAIL_WINDOW);
    assert!(limited.split_whitespace().count() <= DEFAULT_MAX_WORDS);
    assert!(limited.ends_with("ten."));
}

#[test]
fn limit_words_appends_period_without_nearby_sentence_end() {
    let text = "word ".repeat(300);
    let limited = limit_words(&text, 10, DEFAULT_TAIL_WINDOW);
    assert_eq!(limited, format!("{}.", vec!["word"; 10].join(" ")));
}

#[test]
fn limit_words_keeps_short_text() {
    assert_eq!(limit_words("Short one.", 200, 50), "Short one.");
}
