//! Anti-CSRF token lookup for AJAX review paging

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{error, warn};

static STATE_OBJECT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span#cr-state-object[data-state]").expect("valid selector"));

/// Token from the page's `cr-state-object` state blob, if present.
pub fn extract_reviews_csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    extract_from_document(&document)
}

pub fn extract_from_document(document: &Html) -> Option<String> {
    let Some(state) = document
        .select(&STATE_OBJECT)
        .next()
        .and_then(|element| element.value().attr("data-state"))
    else {
        warn!("Could not find cr-state-object element");
        return None;
    };

    // The HTML parser has already decoded entities in the attribute value
    let state: Value = match serde_json::from_str(state) {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to parse cr-state-object: {}", e);
            return None;
        }
    };

    let token = state
        .get("reviewsCsrfToken")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    if token.is_none() {
        warn!("cr-state-object found but no CSRF token present");
    }
    token
}
