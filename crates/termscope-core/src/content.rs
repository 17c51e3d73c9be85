//! Readable-text extraction for policy pages.
//!
//! The text-mode fallback embeds page text in the model prompt. Navigation
//! chrome and scripts are dropped, whitespace is collapsed, and the result is
//! capped so the prompt stays bounded.

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Node, Selector};

lazy_static! {
    static ref HEADING_SELECTOR: Selector = Selector::parse("title, h1").unwrap();
}

/// Appended whenever text was cut. Always present in truncated output.
pub const TRUNCATION_MARKER: &str = " [TRUNCATED]";

/// Default character cap for extracted text.
pub const DEFAULT_MAX_CHARS: usize = 10_000;

/// Elements whose subtree never contributes text.
const SKIPPED_ELEMENTS: &[&str] = &[
    "head", "script", "style", "nav", "footer", "header", "noscript", "template", "svg",
    "iframe",
];

/// Elements that separate words when rendered.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

/// Collapse every whitespace run into a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text pulled from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Whitespace-collapsed text, ending with [`TRUNCATION_MARKER`] when cut
    pub text: String,
    pub truncated: bool,
    /// Character count before truncation
    pub original_chars: usize,
}

/// Strips HTML down to readable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentExtractor {
    max_chars: usize,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS)
    }
}

impl ContentExtractor {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn extract_text(&self, html: &str) -> ExtractedText {
        let document = Html::parse_document(html);
        let mut raw = String::new();
        collect_text(document.root_element(), &mut raw);

        let text = collapse_whitespace(&raw);
        let original_chars = text.chars().count();
        let (text, truncated) = truncate_with_marker(text, original_chars, self.max_chars);

        ExtractedText {
            text,
            truncated,
            original_chars,
        }
    }
}

/// The `<title>` and `<h1>` text of a page, space separated.
pub fn page_headings(html: &str) -> String {
    let document = Html::parse_document(html);
    let raw: Vec<String> = document
        .select(&HEADING_SELECTOR)
        .map(|el| el.text().collect::<String>())
        .collect();
    collapse_whitespace(&raw.join(" "))
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
                if BLOCK_ELEMENTS.contains(&name) {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn truncate_with_marker(text: String, chars: usize, max_chars: usize) -> (String, bool) {
    if chars <= max_chars {
        return (text, false);
    }

    let marker_chars = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_chars {
        return (TRUNCATION_MARKER.trim_start().to_string(), true);
    }

    let keep = max_chars - marker_chars;
    let mut cut: String = text.chars().take(keep).collect();
    cut.truncate(cut.trim_end().len());
    cut.push_str(TRUNCATION_MARKER);
    (cut, true)
}
