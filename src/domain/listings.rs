//! Splits marketboard listings into quality tiers.

use super::entities::{Listing, Quality};

/// Competitive listings of one item, split by tier. Exchange-only listings
/// are never part of either bucket.
#[derive(Debug, Default, PartialEq)]
pub struct QualityBuckets<'a> {
    pub normal: Vec<&'a Listing>,
    pub high: Vec<&'a Listing>,
    /// Mannequin listings that were dropped.
    pub exchange_only: usize,
}

impl<'a> QualityBuckets<'a> {
    pub fn bucket(&self, quality: Quality) -> &[&'a Listing] {
        match quality {
            Quality::Normal => &self.normal,
            Quality::High => &self.high,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normal.is_empty() && self.high.is_empty()
    }
}

pub fn classify(listings: &[Listing]) -> QualityBuckets<'_> {
    let mut buckets = QualityBuckets::default();

    for listing in listings {
        if listing.is_exchange_only {
            buckets.exchange_only += 1;
            continue;
        }
        match listing.quality {
            Quality::Normal => buckets.normal.push(listing),
            Quality::High => buckets.high.push(listing),
        }
    }

    buckets
}
