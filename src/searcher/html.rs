use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::SearchResult;
use crate::config::HtmlSelectors;
use crate::text::{first_digits, normalize_whitespace};

/// Hit count scraped from the page `<title>`, e.g. `"42"` from
/// `"Search Results (42 found)"`. Empty when there is no title or no digits.
pub(crate) fn scrape_total(body: &str) -> String {
    let document = Html::parse_document(body);
    let Ok(title) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&title)
        .next()
        .map(|t| t.text().collect::<String>())
        .and_then(|text| first_digits(&text).map(str::to_string))
        .unwrap_or_default()
}

/// One record per `row` match, in document order.
pub(crate) fn extract(
    body: &str,
    selectors: &HtmlSelectors,
    host: Option<&Url>,
    sanitize_tags: &[String],
) -> Vec<SearchResult> {
    let document = Html::parse_document(body);

    document
        .select(&selectors.row)
        .map(|row| {
            let anchor = row.select(&selectors.link).next();
            SearchResult {
                link: anchor
                    .and_then(|a| a.value().attr("href"))
                    .map(|href| resolve(host, href))
                    .unwrap_or_default(),
                title: anchor
                    .map(|a| normalize_whitespace(&a.text().collect::<String>()))
                    .unwrap_or_default(),
                description: row
                    .select(&selectors.description)
                    .next()
                    .map(|d| sanitized_text(d, sanitize_tags))
                    .unwrap_or_default(),
            }
        })
        .collect()
}

fn resolve(host: Option<&Url>, href: &str) -> String {
    let href = href.trim();
    match host {
        Some(base) => base
            .join(href)
            .map(String::from)
            .unwrap_or_else(|_| href.to_string()),
        None => href.to_string(),
    }
}

/// Text of `element` with every `sanitize_tags` element, and all it
/// contains, left out.
fn sanitized_text(element: ElementRef<'_>, sanitize_tags: &[String]) -> String {
    let mut out = String::new();
    collect_text(element, sanitize_tags, &mut out);
    normalize_whitespace(&out)
}

fn collect_text(element: ElementRef<'_>, sanitize_tags: &[String], out: &mut String) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            let name = el.value().name();
            if !sanitize_tags.iter().any(|t| t.eq_ignore_ascii_case(name)) {
                collect_text(el, sanitize_tags, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}
