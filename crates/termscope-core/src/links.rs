//! Link extraction from fetched HTML.

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

use crate::content::collapse_whitespace;
use crate::origin::{is_http, normalize_url, SiteScope};

lazy_static! {
    static ref ANCHOR_SELECTOR: Selector = Selector::parse("a[href]").unwrap();
    static ref BASE_SELECTOR: Selector = Selector::parse("base[href]").unwrap();
    static ref IMG_ALT_SELECTOR: Selector = Selector::parse("img[alt]").unwrap();
}

/// hrefs with these prefixes never lead to a document.
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "sms:"];

/// A normalized, in-scope link and the text that labelled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub url: Url,
    pub anchor_text: String,
}

/// Extract the distinct in-scope links of a page, in document order.
///
/// Relative hrefs resolve against `<base href>` when present, otherwise
/// against `page_url`. Links back to the page itself are dropped. When the
/// same URL appears several times the first non-empty anchor text wins.
pub fn extract_links(html: &str, page_url: &Url, scope: &SiteScope) -> Vec<ExtractedLink> {
    let document = Html::parse_document(html);

    let base = document
        .select(&BASE_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone());
    let page = normalize_url(page_url);

    let mut links: Vec<ExtractedLink> = Vec::new();
    let mut positions: HashMap<Url, usize> = HashMap::new();

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_href(&base, href))
        else {
            continue;
        };
        if url == page || !scope.contains(&url) {
            continue;
        }

        let text = anchor_text(&element);
        match positions.get(&url) {
            Some(&index) => {
                if links[index].anchor_text.is_empty() && !text.is_empty() {
                    links[index].anchor_text = text;
                }
            }
            None => {
                positions.insert(url.clone(), links.len());
                links.push(ExtractedLink {
                    url,
                    anchor_text: text,
                });
            }
        }
    }

    links
}

fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    let url = base.join(href).ok()?;
    is_http(&url).then(|| normalize_url(&url))
}

fn anchor_text(element: &ElementRef<'_>) -> String {
    let text = collapse_whitespace(&element.text().collect::<String>());
    if !text.is_empty() {
        return text;
    }

    ["aria-label", "title"]
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .map(collapse_whitespace)
        .find(|t| !t.is_empty())
        .or_else(|| {
            element
                .select(&IMG_ALT_SELECTOR)
                .filter_map(|img| img.value().attr("alt"))
                .map(collapse_whitespace)
                .find(|t| !t.is_empty())
        })
        .unwrap_or_default()
}
