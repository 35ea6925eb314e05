//! Pagination domain logic.
//!
//! Responsibility:
//! - review count -> page count rule (fixed 10 reviews per listing page)
//! - choosing which listing pages to sample when the full set is large

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Amazon review listings always render 10 reviews per page.
pub const REVIEWS_PER_PAGE: u64 = 10;

/// Review totals inferred from a rendered listing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaginationInfo {
    pub total_reviews: u64,
    pub total_pages: u32,
}

impl PaginationInfo {
    /// Build from a review total. 0 reviews -> 0 pages, 1..=10 -> 1, 11..=20 -> 2.
    pub fn from_total_reviews(total_reviews: u64) -> Self {
        let pages = total_reviews.div_ceil(REVIEWS_PER_PAGE);
        Self {
            total_reviews,
            total_pages: u32::try_from(pages).unwrap_or(u32::MAX),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.total_reviews == 0
    }
}

/// Bounded page sampling policy.
///
/// Small corpora are fetched in full. Larger ones get the most recent pages,
/// the oldest pages and, for very long histories, a few evenly spaced interior
/// pages so the sample is not purely bimodal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSampler {
    /// Totals at or below this are fetched in full
    pub full_coverage_limit: u32,
    pub recent_pages: u32,
    pub oldest_pages: u32,
    pub middle_samples: u32,
    /// Interior samples are only added when the total exceeds this
    pub middle_sample_threshold: u32,
}

impl Default for PageSampler {
    fn default() -> Self {
        Self {
            full_coverage_limit: 8,
            recent_pages: 5,
            oldest_pages: 3,
            middle_samples: 3,
            middle_sample_threshold: 20,
        }
    }
}

impl PageSampler {
    /// Ascending, deduplicated page numbers (1-based) to fetch.
    pub fn select_pages(&self, total_pages: u32) -> Vec<u32> {
        if total_pages <= self.full_coverage_limit {
            return (1..=total_pages).collect();
        }

        let mut pages = BTreeSet::new();

        pages.extend(1..=self.recent_pages.min(total_pages));

        let oldest_start = total_pages.saturating_sub(self.oldest_pages).max(1) + 1;
        pages.extend(oldest_start.min(total_pages)..=total_pages);

        if total_pages > self.middle_sample_threshold {
            let middle_start = self.recent_pages + 1;
            let middle_end = total_pages - self.oldest_pages;
            let middle_range = f64::from(middle_end.saturating_sub(middle_start));
            let buckets = f64::from(self.middle_samples + 1);

            for sample in 1..=self.middle_samples {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let offset = ((middle_range / buckets) * f64::from(sample)).floor() as u32;
                pages.insert(middle_start + offset);
            }
        }

        pages.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(10, 1)]
    #[case(11, 2)]
    #[case(20, 2)]
    #[case(2_156, 216)]
    fn page_count_uses_ceiling_division(#[case] reviews: u64, #[case] pages: u32) {
        assert_eq!(PaginationInfo::from_total_reviews(reviews).total_pages, pages);
    }

    #[test]
    fn small_totals_are_fetched_in_full() {
        let sampler = PageSampler::default();
        for total in 0..=8 {
            let expected: Vec<u32> = (1..=total).collect();
            assert_eq!(sampler.select_pages(total), expected);
        }
    }

    #[test]
    fn twenty_pages_samples_recent_and_oldest() {
        let pages = PageSampler::default().select_pages(20);
        assert_eq!(pages, vec![1, 2, 3, 4, 5, 18, 19, 20]);
    }

    #[test]
    fn nine_pages_has_no_overlap_duplicates() {
        let pages = PageSampler::default().select_pages(9);
        assert_eq!(pages, vec![1, 2, 3, 4, 5, 7, 8, 9]);
    }

    #[test]
    fn hundred_pages_adds_interior_samples() {
        let pages = PageSampler::default().select_pages(100);

        for required in [1, 5, 98, 100] {
            assert!(pages.contains(&required), "missing page {required}");
        }
        assert!(pages.iter().any(|&p| p > 5 && p < 98));
        assert!(pages.len() <= 12);
        assert_eq!(pages, vec![1, 2, 3, 4, 5, 28, 51, 74, 98, 99, 100]);
    }

    proptest! {
        #[test]
        fn page_count_matches_ceiling(total in 0u64..10_000_000) {
            let info = PaginationInfo::from_total_reviews(total);
            let expected = (total + REVIEWS_PER_PAGE - 1) / REVIEWS_PER_PAGE;
            prop_assert_eq!(u64::from(info.total_pages), expected);
        }

        #[test]
        fn sample_is_sorted_unique_bounded_and_in_range(total in 0u32..100_000) {
            let pages = PageSampler::default().select_pages(total);
            prop_assert!(pages.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(pages.iter().all(|&p| p >= 1 && p <= total));
            prop_assert!(pages.len() <= 11);
            if total > 8 {
                prop_assert!(pages.contains(&1));
                prop_assert!(pages.contains(&total));
            }
        }
    }
}
