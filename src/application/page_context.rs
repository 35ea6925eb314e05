//! The product page the pipeline is running against

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static PRODUCT_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(?:dp|gp/product|product-reviews)/([A-Z0-9]+)").expect("valid product id regex")
});

/// Location and rendered markup of the page currently loaded.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub url: Url,
    pub html: String,
}

impl PageContext {
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
        }
    }

    /// A marketplace product detail page.
    pub fn is_product_page(&self) -> bool {
        self.url.host_str().is_some_and(|host| host.contains("amazon")) && self.url.path().contains("/dp/")
    }

    /// ASIN from the URL path; never derived from anything else.
    pub fn product_id(&self) -> Option<String> {
        PRODUCT_ID
            .captures(self.url.path())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn context(url: &str) -> PageContext {
        PageContext::new(Url::parse(url).unwrap(), "")
    }

    #[rstest]
    #[case("https://www.amazon.com/Some-Blender/dp/B08N5WRWNW/ref=sr_1_1", true)]
    #[case("https://www.amazon.de/dp/B08N5WRWNW", true)]
    #[case("https://www.amazon.com/product-reviews/B08N5WRWNW", false)]
    #[case("https://www.example.com/dp/B08N5WRWNW", false)]
    fn detects_product_pages(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(context(url).is_product_page(), expected);
    }

    #[rstest]
    #[case("https://www.amazon.com/Some-Blender/dp/B08N5WRWNW/ref=sr_1_1", Some("B08N5WRWNW"))]
    #[case("https://www.amazon.com/gp/product/B000123456?th=1", Some("B000123456"))]
    #[case("https://www.amazon.com/product-reviews/B08N5WRWNW?pageNumber=2", Some("B08N5WRWNW"))]
    #[case("https://www.amazon.com/dp/", None)]
    #[case("https://www.amazon.com/gp/help/customer", None)]
    fn extracts_product_id(#[case] url: &str, #[case] expected: Option<&str>) {
        assert_eq!(context(url).product_id().as_deref(), expected);
    }
}
