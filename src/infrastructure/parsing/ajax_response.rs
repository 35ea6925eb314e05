//! Decoder for the marketplace's AJAX paging response
//!
//! The body is a sequence of JSON arrays separated by `&&&`, each one a DOM
//! command such as `["append", "#cm_cr-review_list", "<div ...>"]`. Only
//! `append` commands carrying review markup are of interest.

use serde_json::Value;
use tracing::debug;

use crate::infrastructure::parsing_error::ParsingError;

const CHUNK_SEPARATOR: &str = "&&&";
const APPEND_COMMAND: &str = "append";
const REVIEW_MARKER: &str = r#"data-hook="review""#;

/// Review HTML fragments in response order. Malformed chunks are skipped.
pub fn extract_review_fragments(raw: &str) -> Vec<String> {
    raw.split(CHUNK_SEPARATOR)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .filter_map(|chunk| match decode_chunk(chunk) {
            Ok(fragment) => fragment,
            Err(e) => {
                debug!("{}", e);
                None
            }
        })
        .collect()
}

fn decode_chunk(chunk: &str) -> Result<Option<String>, ParsingError> {
    let command: Vec<Value> =
        serde_json::from_str(chunk).map_err(|e| ParsingError::MalformedAjaxChunk {
            reason: e.to_string(),
        })?;

    if command.first().and_then(Value::as_str) != Some(APPEND_COMMAND) {
        return Ok(None);
    }

    Ok(command
        .iter()
        .skip(1)
        .filter_map(Value::as_str)
        .find(|value| value.contains(REVIEW_MARKER))
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_append_chunks_with_review_markup() {
        let raw = r##"
            ["append", null, "<div data-hook=\"review\">Review 1</div>"]
            &&&
            ["append", "<div data-hook=\"review\">Review 2</div>"]
            &&&
            ["other-action", "some-selector", "non-review content"]
            &&&
            ["append", "#cm_cr-pagination_bar", "<ul class=\"a-pagination\"></ul>"]
        "##;

        let fragments = extract_review_fragments(raw);

        assert_eq!(fragments.len(), 2);
        assert!(fragments[0].contains("Review 1"));
        assert!(fragments[1].contains("Review 2"));
    }

    #[test]
    fn skips_malformed_chunks() {
        let raw = r#"
            ["append", null, "<div data-hook=\"review\">Review 1</div>"]
            &&&
            {invalid json}
            &&&
            ["append", null, "<div data-hook=\"review\">Review 2</div>"]
        "#;

        assert_eq!(extract_review_fragments(raw).len(), 2);
    }

    #[test]
    fn plain_text_yields_nothing() {
        assert!(extract_review_fragments("No reviews in this response").is_empty());
        assert!(extract_review_fragments("").is_empty());
    }
}
