//! Review extraction from rendered listing markup
//!
//! Each field is read by its own extractor over the review element, trying
//! the configured selectors in priority order. A single validation step then
//! decides whether the collected fields form a usable [`Review`].

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::ajax_response::extract_review_fragments;
use super::config::ReviewSelectors;
use crate::domain::review::{ANONYMOUS_AUTHOR, Review};
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

static RATING_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d\.?\d?)").expect("valid rating regex"));
static VOTES_OF_TOTAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d,.]*)\s+of\s+(\d[\d,.]*)").expect("valid votes regex")
});
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,.]*").expect("valid number regex"));
static VARIATION_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:size|colou?r|style|pattern)\s*(?:name)?\s*:\s*")
        .expect("valid variation regex")
});

const TITLE_EXCLUDED_CLASSES: [&str; 3] = ["a-icon-alt", "a-letter-space", "cr-translated-review-content"];
const STAR_RATING_HOOK: &str = "review-star-rating";

/// Fields read from one review element before validation.
#[derive(Debug, Default, Clone, PartialEq)]
struct ReviewDraft {
    id: Option<String>,
    rating: Option<f64>,
    title: Option<String>,
    text: Option<String>,
    author_name: Option<String>,
    date: Option<String>,
    is_verified_purchase: bool,
    is_vine_review: bool,
    helpful_votes: Option<(u32, Option<u32>)>,
    product_variation: Option<String>,
    badges: Option<BTreeSet<String>>,
}

impl ReviewDraft {
    /// Keep only drafts with an id, a positive rating and non-empty text.
    fn validate(self) -> ParsingResult<Review> {
        let mut missing = Vec::new();
        if self.id.is_none() {
            missing.push("id");
        }
        if !self.rating.is_some_and(|r| r > 0.0) {
            missing.push("rating");
        }
        if self.text.is_none() {
            missing.push("text");
        }

        let (Some(id), Some(rating), Some(text)) = (self.id, self.rating, self.text) else {
            return Err(ParsingError::required_fields_missing(missing));
        };
        if !missing.is_empty() {
            return Err(ParsingError::required_fields_missing(missing));
        }

        let (helpful_votes, total_votes) = match self.helpful_votes {
            Some((helpful, total)) => (Some(helpful), total),
            None => (None, None),
        };

        Ok(Review {
            id,
            rating,
            title: self.title,
            text,
            author_name: self
                .author_name
                .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
            is_verified_purchase: self.is_verified_purchase,
            date: self.date,
            helpful_votes,
            total_votes,
            product_variation: self.product_variation,
            is_vine_review: self.is_vine_review,
            badges: self.badges,
        })
    }
}

/// Review markup parser with compiled selectors.
pub struct ReviewParser {
    review_container: Vec<Selector>,
    author: Vec<Selector>,
    title_container: Vec<Selector>,
    rating: Vec<Selector>,
    body: Vec<Selector>,
    verified_badge: Vec<Selector>,
    date: Vec<Selector>,
    helpful_votes: Vec<Selector>,
    variation: Vec<Selector>,
    vine_badge: Vec<Selector>,
    badges: Vec<Selector>,
    original_title: Selector,
    span: Selector,
}

impl ReviewParser {
    pub fn new() -> ParsingResult<Self> {
        Self::with_selectors(&ReviewSelectors::default())
    }

    pub fn with_selectors(config: &ReviewSelectors) -> ParsingResult<Self> {
        Ok(Self {
            review_container: compile_selectors("review_container", &config.review_container)?,
            author: compile_selectors("author", &config.author)?,
            title_container: compile_selectors("title_container", &config.title_container)?,
            rating: compile_selectors("rating", &config.rating)?,
            body: compile_selectors("body", &config.body)?,
            verified_badge: compile_selectors("verified_badge", &config.verified_badge)?,
            date: compile_selectors("date", &config.date)?,
            helpful_votes: compile_selectors("helpful_votes", &config.helpful_votes)?,
            variation: compile_selectors("variation", &config.variation)?,
            vine_badge: compile_selectors("vine_badge", &config.vine_badge)?,
            badges: compile_selectors("badges", &config.badges)?,
            original_title: compile_one(".cr-original-review-content")?,
            span: compile_one("span")?,
        })
    }

    /// Parse every valid review in an HTML document or fragment.
    pub fn parse_reviews(&self, html: &str) -> Vec<Review> {
        let document = Html::parse_document(html);
        self.parse_document(&document)
    }

    pub fn parse_document(&self, document: &Html) -> Vec<Review> {
        let Some(elements) = self
            .review_container
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
        else {
            debug!("No review containers found");
            return Vec::new();
        };

        let total = elements.len();
        let reviews: Vec<Review> = elements
            .into_iter()
            .enumerate()
            .filter_map(|(index, element)| match self.extract_review(element) {
                Ok(review) => Some(review),
                Err(e) => {
                    warn!("Skipping review {}/{}: {}", index + 1, total, e);
                    None
                }
            })
            .collect();

        debug!("Parsed {}/{} reviews", reviews.len(), total);
        reviews
    }

    /// Decode an AJAX paging response and parse the review fragments it carries.
    pub fn parse_ajax_response(&self, raw: &str) -> Vec<Review> {
        let fragments = extract_review_fragments(raw);
        if fragments.is_empty() {
            debug!("AJAX response carried no review fragments");
            return Vec::new();
        }
        self.parse_reviews(&fragments.concat())
    }

    /// Read one review element and validate it.
    pub fn extract_review(&self, element: ElementRef<'_>) -> ParsingResult<Review> {
        let draft = ReviewDraft {
            id: extract_id(element),
            rating: extract_rating(element, &self.rating),
            title: self.extract_title(element),
            text: first_text(element, &self.body),
            author_name: first_text(element, &self.author),
            date: first_text(element, &self.date),
            is_verified_purchase: has_match(element, &self.verified_badge),
            is_vine_review: has_match(element, &self.vine_badge),
            helpful_votes: first_text(element, &self.helpful_votes)
                .and_then(|text| parse_helpful_votes(&text)),
            product_variation: first_text(element, &self.variation)
                .and_then(|text| clean_variation(&text)),
            badges: extract_badges(element, &self.badges),
        };
        draft.validate()
    }

    fn extract_title(&self, element: ElementRef<'_>) -> Option<String> {
        let container = first_match(element, &self.title_container)?;

        if let Some(original) = container
            .select(&self.original_title)
            .map(element_text)
            .find(|text| !text.is_empty())
        {
            return Some(original);
        }

        container
            .select(&self.span)
            .filter(|span| is_title_span(*span))
            .map(element_text)
            .filter(|text| !text.is_empty())
            .last()
    }
}

/// Compile a field's selector list, skipping entries that fail to parse.
pub(super) fn compile_selectors(field: &str, selector_strings: &[String]) -> ParsingResult<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                let error = ParsingError::invalid_selector(selector_str, &e.to_string());
                warn!("{}", error);
                errors.push(error.to_string());
            }
        }
    }

    if selectors.is_empty() {
        return Err(ParsingError::NoValidSelectors {
            field: field.to_string(),
            errors,
        });
    }
    Ok(selectors)
}

fn compile_one(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::NoValidSelectors {
        field: selector.to_string(),
        errors: vec![e.to_string()],
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_match<'a>(element: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .find_map(|selector| element.select(selector).next())
}

/// First non-empty trimmed text across the selector list.
fn first_text(element: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        element
            .select(selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

fn has_match(element: ElementRef<'_>, selectors: &[Selector]) -> bool {
    first_match(element, selectors).is_some()
}

fn extract_id(element: ElementRef<'_>) -> Option<String> {
    element
        .value()
        .attr("id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn extract_rating(element: ElementRef<'_>, selectors: &[Selector]) -> Option<f64> {
    let text = first_text(element, selectors)?;
    parse_rating(&text)
}

pub(crate) fn parse_rating(text: &str) -> Option<f64> {
    RATING_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|rating| *rating > 0.0)
}

/// Spans inside the star rating widget or decoration spans are not titles.
fn is_title_span(span: ElementRef<'_>) -> bool {
    let value = span.value();
    if TITLE_EXCLUDED_CLASSES
        .iter()
        .any(|class| value.classes().any(|c| c == *class))
    {
        return false;
    }
    !span
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().attr("data-hook") == Some(STAR_RATING_HOOK))
}

fn strip_separators(number: &str) -> Option<u32> {
    number
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()
}

/// Helpful votes and, for "X of Y" statements, the total vote count.
pub(crate) fn parse_helpful_votes(text: &str) -> Option<(u32, Option<u32>)> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = VOTES_OF_TOTAL.captures(text) {
        let helpful = caps.get(1).and_then(|m| strip_separators(m.as_str()));
        let total = caps.get(2).and_then(|m| strip_separators(m.as_str()));
        if let (Some(helpful), Some(total)) = (helpful, total) {
            return Some((helpful, Some(total)));
        }
    }

    if text.to_lowercase().contains("one person") {
        return Some((1, None));
    }

    match NUMBER.find(text) {
        Some(number) => strip_separators(number.as_str()).map(|votes| (votes, None)),
        // Statement present without digits: a single voter
        None => Some((1, None)),
    }
}

pub(crate) fn clean_variation(text: &str) -> Option<String> {
    let cleaned = VARIATION_PREFIX.replace(text, "");
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

fn is_reserved_badge(label: &str) -> bool {
    let label = label.to_lowercase();
    label.contains("verified purchase") || label.contains("vine")
}

fn extract_badges(element: ElementRef<'_>, selectors: &[Selector]) -> Option<BTreeSet<String>> {
    let badges: BTreeSet<String> = selectors
        .iter()
        .flat_map(|selector| element.select(selector))
        .map(element_text)
        .filter(|label| !label.is_empty() && !is_reserved_badge(label))
        .collect();
    (!badges.is_empty()).then_some(badges)
}
