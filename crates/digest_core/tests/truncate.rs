use digest_core::{notice_len, truncate, CutPoint, TruncateOptions};
use pretty_assertions::assert_eq;

#[test]
fn text_within_budget_is_returned_unchanged() {
    let options = TruncateOptions::new(50);
    let text = "Short newsletter.\n\nSecond paragraph.";

    let first = truncate(text, &options);
    assert!(!first.was_truncated);
    assert_eq!(first.text, text);
    assert_eq!(first.cut, None);

    let second = truncate(&first.text, &options);
    assert_eq!(second, first);
}

#[test]
fn cuts_at_paragraph_break_past_the_floor() {
    let options = TruncateOptions::new(100);
    // Break at 85, and a later sentence end at 89: the paragraph wins.
    let text = format!("{}\n\nBb. {}", "a".repeat(85), "b".repeat(60));

    let result = truncate(&text, &options);
    assert!(result.was_truncated);
    assert_eq!(result.cut, Some(CutPoint::Paragraph));
    assert_eq!(result.kept_len, 85);
    assert!(result.text.starts_with(&format!("{}\n\n[Content truncated", "a".repeat(85))));
}

#[test]
fn paragraph_before_floor_falls_back_to_sentence() {
    let options = TruncateOptions::new(100);
    let text = format!(
        "{}\n\n{}. {}",
        "a".repeat(10),
        "c".repeat(78),
        "d".repeat(50)
    );

    let result = truncate(&text, &options);
    assert_eq!(result.cut, Some(CutPoint::Sentence));
    assert_eq!(result.kept_len, 91);
    let body = &result.text[..91];
    assert!(body.ends_with("c."));
}

#[test]
fn hard_cut_when_no_boundary_reaches_the_floor() {
    let options = TruncateOptions::new(100);
    let text = format!("Intro. {}", "x".repeat(200));

    let result = truncate(&text, &options);
    assert_eq!(result.cut, Some(CutPoint::Hard));
    assert_eq!(result.kept_len, 100);
    assert_eq!(result.original_len, 207);
}

#[test]
fn notice_reports_lengths_and_reason() {
    let options = TruncateOptions::new(100).with_reason("email length limits");
    let text = format!("{}\n\n{}", "a".repeat(85), "b".repeat(43));

    let result = truncate(&text, &options);
    assert!(result
        .text
        .contains("[Content truncated due to email length limits. Full content saved locally.]"));
    assert!(result.text.contains("Original content length: 130 characters"));
    assert!(result.text.ends_with("Sent content length: 85 characters"));
}

#[test]
fn output_never_exceeds_budget_plus_notice() {
    let text = "Première phrase. Deuxième phrase!\n\nNouveau paragraphe ici? Oui. Fin du texte sans point";
    let total = text.chars().count();
    for max_len in 0..=total + 3 {
        let options = TruncateOptions::new(max_len);
        let result = truncate(text, &options);
        let bound = if result.was_truncated {
            max_len + notice_len(&options, result.original_len, result.kept_len)
        } else {
            max_len
        };
        assert!(
            result.text.chars().count() <= bound,
            "max_len={max_len} produced {} chars",
            result.text.chars().count()
        );
        assert!(result.kept_len <= max_len);
    }
}

#[test]
fn custom_floor_accepts_earlier_boundaries() {
    let options = TruncateOptions::new(100).with_boundary_floor(0.1);
    let text = format!("{}\n\n{}", "a".repeat(20), "b".repeat(200));

    let result = truncate(&text, &options);
    assert_eq!(result.cut, Some(CutPoint::Paragraph));
    assert_eq!(result.kept_len, 20);
}
