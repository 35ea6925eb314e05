//! Command-line entry point
//!
//! Usage: `truestar-reviews <product-url> [saved-page.html]`
//!
//! Runs one acquisition cycle against the product page and prints the
//! analysis as JSON on stdout. Logs go to stderr and the log directory.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::{error, info};
use url::Url;

use truestar_reviews_lib::application::{
    AcquisitionOrchestrator, DismissHandle, PageContext, ResultPresenter, RunOutcome,
};
use truestar_reviews_lib::domain::AnalysisResult;
use truestar_reviews_lib::infrastructure::logging::log_system_info;
use truestar_reviews_lib::infrastructure::{
    ConfigManager, HttpClient, HttpClientConfig, TracingErrorReporter, init_logging_with_config,
};

/// Writes results to stdout as pretty JSON.
struct ConsolePresenter;

impl ResultPresenter for ConsolePresenter {
    fn show_loading(&self) {
        info!("🔄 Analyzing reviews...");
    }

    fn hide_loading(&self) {}

    fn show_analysis(&self, analysis: &AnalysisResult, on_close: DismissHandle) {
        match serde_json::to_string_pretty(analysis) {
            Ok(json) => println!("{json}"),
            Err(e) => error!("Failed to serialize analysis: {}", e),
        }
        on_close.dismiss();
    }

    fn show_error(&self, message: &str, analysis: &AnalysisResult) {
        eprintln!("❌ {message}");
        if let Ok(json) = serde_json::to_string_pretty(analysis) {
            println!("{json}");
        }
    }
}

const USAGE: &str = "usage: truestar-reviews <product-url> [saved-page.html]";

/// Product URL plus an optional saved copy of the page to analyze offline.
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<(Url, Option<String>)> {
    let url = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let url = Url::parse(&url).with_context(|| format!("invalid product URL: {url}"))?;
    let saved_page = args.next();
    if args.next().is_some() {
        return Err(anyhow!(USAGE));
    }
    Ok((url, saved_page))
}

#[tokio::main]
async fn main() -> Result<()> {
    let (url, saved_page) = parse_args(std::env::args().skip(1))?;

    let config = ConfigManager::new()?.load_config().await?;
    init_logging_with_config(&config.logging)?;
    log_system_info();

    let html = match saved_page {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {path}"))?,
        None => {
            let client = HttpClient::new(HttpClientConfig::from_fetch_config(&config.fetch))?;
            client.get_text(url.as_str()).await?
        }
    };

    let reporter = Arc::new(TracingErrorReporter::new(config.preferences));
    let orchestrator = AcquisitionOrchestrator::from_config(&config, Arc::new(ConsolePresenter), reporter)?;

    match orchestrator.run(&PageContext::new(url, html)).await {
        RunOutcome::NotProductPage => eprintln!("Not an Amazon product page"),
        RunOutcome::NoReviews(_) => eprintln!("No reviews found on page"),
        RunOutcome::Presented { acquisition, .. } | RunOutcome::InvalidAnalysis { acquisition, .. } => {
            info!(
                "🎉 Analyzed {} reviews ({:?})",
                acquisition.reviews.len(),
                acquisition.source
            );
        }
        RunOutcome::Failed { message } => return Err(anyhow!(message)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values.iter().map(|v| v.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn url_alone_fetches_live_page() {
        let (url, saved) = parse_args(args(&["https://www.amazon.com/dp/B08N5WRWNW"])).unwrap();
        assert_eq!(url.host_str(), Some("www.amazon.com"));
        assert_eq!(saved, None);
    }

    #[test]
    fn saved_page_is_optional_second_argument() {
        let (_, saved) = parse_args(args(&["https://www.amazon.com/dp/B08N5WRWNW", "page.html"])).unwrap();
        assert_eq!(saved.as_deref(), Some("page.html"));
    }

    #[test]
    fn rejects_missing_invalid_or_extra_arguments() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["not a url"])).is_err());
        assert!(parse_args(args(&["https://www.amazon.com/dp/B08N5WRWNW", "a.html", "b.html"])).is_err());
    }
}
