use ghost_prompt::core::text::ansi::strip_ansi;
use ghost_prompt::{truncate_to_width, visible_width, word_wrap, wrap_text_with_ansi};
use pretty_assertions::assert_eq;

const SAMPLES: &[&str] = &[
    "the quick brown fox jumps over the lazy dog",
    "\x1b[1mbold words\x1b[0m then plain words after the reset",
    "supercalifragilisticexpialidocious is long",
    "日本語のテキストと english mixed together",
    "tabs\tand  double  spaces",
    "",
];

#[test]
fn wrapped_lines_never_exceed_the_width() {
    for sample in SAMPLES {
        for width in 1..=24 {
            for line in wrap_text_with_ansi(sample, width) {
                assert!(
                    visible_width(&line) <= width.max(2),
                    "{sample:?} at {width}: {line:?}"
                );
            }
        }
    }
}

#[test]
fn wrapping_keeps_every_word() {
    let text = "alpha beta gamma delta epsilon";
    let lines = wrap_text_with_ansi(text, 11);
    assert_eq!(lines, vec!["alpha beta", "gamma delta", "epsilon"]);
    let rejoined: Vec<String> = lines.iter().map(|line| strip_ansi(line)).collect();
    assert_eq!(rejoined.join(" "), text);
}

#[test]
fn style_is_reopened_on_continuation_lines() {
    let lines = wrap_text_with_ansi("\x1b[31mred text wraps\x1b[0m", 8);
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("\x1b[31m"), "{:?}", lines[1]);
    assert_eq!(strip_ansi(&lines[0]), "red text");
    assert_eq!(strip_ansi(&lines[1]), "wraps");
}

#[test]
fn word_wrap_preserves_existing_newlines() {
    assert_eq!(word_wrap("one two\nsix", 3), "one\ntwo\nsix");
    assert_eq!(word_wrap("a\n\nb", 10), "a\n\nb");
}

#[test]
fn zero_width_returns_input_unchanged() {
    let text = "some \x1b[2mdim\x1b[0m text";
    assert_eq!(word_wrap(text, 0), text);
    assert_eq!(wrap_text_with_ansi(text, 0), vec![text.to_string()]);
}

#[test]
fn truncation_is_idempotent_and_bounded() {
    for sample in SAMPLES {
        for width in 0..=20 {
            let once = truncate_to_width(sample, width);
            assert!(visible_width(&once) <= width, "{sample:?} at {width}");
            assert_eq!(truncate_to_width(&once, width), once);
        }
    }
}

#[test]
fn truncation_keeps_closing_escapes() {
    assert_eq!(
        truncate_to_width("\x1b[2mghost text\x1b[0m", 5),
        "\x1b[2mghost\x1b[0m"
    );
    assert_eq!(truncate_to_width("fits", 10), "fits");
}

#[test]
fn widths_follow_the_static_rules() {
    assert_eq!(visible_width("ls -la"), 6);
    assert_eq!(visible_width("\x1b[31mred\x1b[0m"), 3);
    assert_eq!(visible_width("日本"), 4);
    // Variation selector 16 adds no columns of its own.
    assert_eq!(visible_width("a\u{FE0F}"), 1);
    assert_eq!(visible_width("a\u{200D}b"), 2);
}
