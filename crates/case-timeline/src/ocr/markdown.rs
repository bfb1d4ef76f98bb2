//! Reduce OCR markup to plain text

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

static MATH_DELIMITERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[()\[\]]").expect("valid regex"));

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

static ITEM_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d{1,9}[.)]").expect("valid regex"));

static HTML_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Strip markdown structure (headings, emphasis, tables, code fences) and
/// inline math delimiters, keeping the words.
///
/// Ordered list numbers are kept: a line such as `2019. Complaint filed`
/// parses as a list item and its number is often a year.
pub fn strip_markdown(markup: &str) -> String {
    let source = MATH_DELIMITERS.replace_all(markup, "");
    let parser = Parser::new_ext(&source, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);

    let mut out = String::with_capacity(source.len());
    for (event, range) in parser.into_offset_iter() {
        match event {
            // Numbers as written; the parser reports only the first of each list
            Event::Start(Tag::Item) => {
                if let Some(marker) = ITEM_NUMBER.find(&source[range]) {
                    out.push_str(marker.as_str().trim_start());
                    out.push(' ');
                }
            }
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::Html(html) | Event::InlineHtml(html) => {
                out.push_str(&HTML_TAGS.replace_all(&html, ""))
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::End(TagEnd::TableCell) => out.push(' '),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::TableHead
                | TagEnd::TableRow,
            ) => out.push_str("\n\n"),
            _ => {}
        }
    }

    let out = out
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_RUNS.replace_all(&out, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_structure() {
        let markup = "# Complaint\n\n**Filed** on _March 4, 2021_ by `counsel`.\n\n- first\n- second\n";
        let text = strip_markdown(markup);
        assert!(text.starts_with("Complaint\n\nFiled on March 4, 2021 by counsel."));
        assert!(text.contains("first"));
        assert!(text.contains("second"));
        assert!(!text.contains('#'));
        assert!(!text.contains('*'));
        assert!(!text.contains('_'));
    }

    #[test]
    fn test_strips_tables() {
        let markup = "| Date | Event |\n|---|---|\n| 2020-01-02 | Hearing |\n";
        let text = strip_markdown(markup);
        assert!(!text.contains('|'));
        assert!(text.contains("2020-01-02 Hearing"));
    }

    #[test]
    fn test_strips_math_delimiters() {
        assert_eq!(strip_markdown(r"Damages of \(5\%\) were awarded"), "Damages of 5% were awarded");
    }

    #[test]
    fn test_keeps_ordered_list_numbers() {
        let text = strip_markdown("2019. Plaintiff filed the complaint.\n\n2021. Defendant answered.");
        assert!(text.contains("2019. Plaintiff filed the complaint."));
        assert!(text.contains("2021. Defendant answered."));

        let text = strip_markdown("1. Summons\n2. Complaint\n\n- exhibit");
        assert!(text.contains("1. Summons"));
        assert!(text.contains("2. Complaint"));
        assert!(text.contains("exhibit"));
        assert!(!text.contains("3."));
    }

    #[test]
    fn test_keeps_html_text() {
        let text = strip_markdown("Signed <b>March 4, 2021</b> by counsel");
        assert_eq!(text, "Signed March 4, 2021 by counsel");
    }

    #[test]
    fn test_empty_markup() {
        assert_eq!(strip_markdown(""), "");
        assert_eq!(strip_markdown("\n\n  \n"), "");
    }
}
