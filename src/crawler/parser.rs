//! HTML content extraction
//!
//! This module handles parsing HTML content to extract:
//! - Readable text, one phrase per line
//! - Outbound links from `<a href>` tags
//!
//! Both functions take raw response bytes and never fail: invalid UTF-8 is
//! decoded lossily and malformed markup is repaired by the HTML parser.

use crate::url::netloc;
use scraper::{Html, Selector};
use url::Url;

/// Elements whose text is never part of the extracted content
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "head", "title", "meta", "noscript"];

/// Href prefixes that never lead to a crawlable page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Extracts the readable text of an HTML document
///
/// Text under `script`, `style`, `head`, `title`, `meta` and `noscript` is
/// dropped. Every remaining text node is split into lines and then into phrases
/// at runs of two spaces; phrases are trimmed, empty ones dropped, and the rest
/// joined with newlines.
///
/// # Example
///
/// ```
/// use tidemark::crawler::extract_text;
///
/// let html = br#"<html><head><title>Ignored</title></head>
///     <body><h1>Welcome</h1><p>First  Second</p><script>var x;</script></body></html>"#;
/// assert_eq!(extract_text(html), "Welcome\nFirst\nSecond");
/// ```
pub fn extract_text(html: &[u8]) -> String {
    let source = String::from_utf8_lossy(html);
    let document = Html::parse_document(&source);

    let mut fragments: Vec<&str> = Vec::new();

    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|element| SKIPPED_ELEMENTS.contains(&element.name()))
                .unwrap_or(false)
        });
        if skipped {
            continue;
        }

        let text: &str = text;
        fragments.extend(
            text.lines()
                .flat_map(|line| line.split("  "))
                .map(str::trim)
                .filter(|phrase| !phrase.is_empty()),
        );
    }

    fragments.join("\n")
}

/// Extracts every outbound link of an HTML document
///
/// # Link Resolution Rules
///
/// | Href | Result |
/// |------|--------|
/// | `http://...`, `https://...` | unchanged |
/// | `//host/path` | `<base scheme>://host/path` |
/// | `/path` | `<base scheme>://<base host[:port]>/path` |
/// | `path` | `<base scheme>://<base host[:port]>/path` |
///
/// Relative hrefs resolve against the host root rather than the page's
/// directory. Empty hrefs, fragment-only hrefs and `javascript:`, `mailto:`,
/// `tel:` and `data:` hrefs are skipped. Links are returned in document order,
/// duplicates included.
///
/// # Arguments
///
/// * `html` - The HTML content
/// * `base_url` - The URL the document was fetched from
///
/// # Returns
///
/// The links found, or nothing if `base_url` has no host
pub fn extract_links(html: &[u8], base_url: &str) -> Vec<String> {
    let Some((scheme, host)) = Url::parse(base_url)
        .ok()
        .and_then(|url| netloc(&url).map(|host| (url.scheme().to_string(), host)))
    else {
        tracing::debug!("Cannot resolve links against {}", base_url);
        return Vec::new();
    };

    let source = String::from_utf8_lossy(html);
    let document = Html::parse_document(&source);

    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(link) = resolve_link(href, &scheme, &host) {
                    links.push(link);
                }
            }
        }
    }

    links
}

fn resolve_link(href: &str, scheme: &str, host: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|prefix| lower.starts_with(prefix)) {
        return None;
    }

    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(href.to_string())
    } else if href.starts_with("//") {
        Some(format!("{}:{}", scheme, href))
    } else if href.starts_with('/') {
        Some(format!("{}://{}{}", scheme, host, href))
    } else {
        Some(format!("{}://{}/{}", scheme, host, href))
    }
}
