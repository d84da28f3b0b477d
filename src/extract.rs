//! Structural Extractor
//!
//! Pulls the article out of a rendered page. The page layout is assumed to
//! have one `<article>` container with an `<h1>` heading inside it.
//!
//! Text extraction flattens an element into the concatenation of all
//! descendant text nodes and trims the ends; markup between nodes is dropped
//! and inner whitespace is kept as written.

use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;

/// Query for the content container
pub const ARTICLE_SELECTOR: &str = "article";

/// Query for the title, relative to the container
pub const HEADING_SELECTOR: &str = "h1";

/// Placeholder for optional fields that are absent
pub const DEFAULT_FIELD: &str = "N/A";

/// Title and body of the page's article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub title: String,
    pub body: String,
}

/// Parse `html` and extract the article.
///
/// A missing container is an error. A missing heading is not: the title
/// falls back to [`DEFAULT_FIELD`].
pub fn extract(html: &str) -> Result<PageSummary, ExtractError> {
    let document = Html::parse_document(html);
    let article_selector = parse_selector(ARTICLE_SELECTOR)?;

    let article = document
        .select(&article_selector)
        .next()
        .ok_or(ExtractError::MissingContainer {
            selector: ARTICLE_SELECTOR,
        })?;

    Ok(PageSummary {
        title: select_text_or(article, HEADING_SELECTOR, DEFAULT_FIELD),
        body: text_content(article),
    })
}

/// Trimmed text of the first match of `selector` under `scope`, or `default`.
pub fn select_text_or(scope: ElementRef<'_>, selector: &str, default: &str) -> String {
    let Ok(selector) = parse_selector(selector) else {
        return default.to_string();
    };
    scope
        .select(&selector)
        .next()
        .map(text_content)
        .unwrap_or_else(|| default.to_string())
}

/// All descendant text of `element`, concatenated and trimmed.
pub fn text_content(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}
