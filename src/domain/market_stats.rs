//! Per-quality price statistics built from raw marketboard listings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entities::{
    ItemId, Listing, MarketSnapshot, MarketStats, Quality, QualityStats, SaleVelocity,
};
use super::listings::classify;
use super::outliers::{median_of_sorted, outlier_mask, OUTLIER_THRESHOLD};

pub const DEFAULT_SAMPLE_SIZE: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Cheapest listings kept per tier.
    pub sample_size: usize,
    pub outlier_threshold: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            outlier_threshold: OUTLIER_THRESHOLD,
        }
    }
}

/// Summarises the listings of one item.
///
/// Returns `None` when neither tier has a competitive listing. A tier with no
/// listings is left out of the map.
pub fn compute_stats(
    item_id: ItemId,
    listings: &[Listing],
    velocity: SaleVelocity,
    config: &StatsConfig,
) -> Option<QualityStats> {
    let buckets = classify(listings);
    let mut stats = QualityStats::new();

    for quality in [Quality::Normal, Quality::High] {
        let bucket = buckets.bucket(quality);
        if bucket.is_empty() {
            continue;
        }
        let summary = summarize_bucket(item_id, quality, bucket, velocity, config);
        stats.insert(quality, summary);
    }

    if stats.is_empty() {
        None
    } else {
        Some(stats)
    }
}

/// Runs [`compute_stats`] for every item of a snapshot. Items without any
/// competitive listing are omitted.
pub fn compute_market(
    snapshot: &MarketSnapshot,
    config: &StatsConfig,
) -> BTreeMap<ItemId, QualityStats> {
    snapshot
        .items
        .values()
        .filter_map(|market| {
            compute_stats(market.item_id, &market.listings, market.velocity, config)
                .map(|stats| (market.item_id, stats))
        })
        .collect()
}

fn summarize_bucket(
    item_id: ItemId,
    quality: Quality,
    bucket: &[&Listing],
    velocity: SaleVelocity,
    config: &StatsConfig,
) -> MarketStats {
    let prices: Vec<u64> = bucket.iter().map(|listing| listing.price_per_unit).collect();
    let mask = outlier_mask(&prices, config.outlier_threshold);

    let mut survivors: Vec<&Listing> = bucket
        .iter()
        .zip(&mask)
        .filter_map(|(listing, keep)| keep.then_some(*listing))
        .collect();

    let dropped = bucket.len() - survivors.len();
    if dropped > 0 {
        tracing::debug!(item_id, quality = quality.label(), dropped, "removed outlier listings");
    }

    survivors.sort_by_key(|listing| listing.price_per_unit);

    let sorted_prices: Vec<f64> = survivors
        .iter()
        .map(|listing| listing.price_per_unit as f64)
        .collect();

    let median_price = (!sorted_prices.is_empty()).then(|| median_of_sorted(&sorted_prices));
    let min_price = survivors.first().map(|listing| listing.price_per_unit);

    MarketStats {
        item_id,
        quality,
        min_price,
        median_price,
        sample_listings: survivors
            .iter()
            .take(config.sample_size)
            .map(|listing| (*listing).clone())
            .collect(),
        total_listing_count: survivors.len(),
        sale_velocity: velocity.for_quality(quality),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ItemMarket;
    use crate::domain::outliers::filter_outliers_with;
    use proptest::prelude::*;
    use time::OffsetDateTime;

    fn listing(price: u64, quality: Quality, mannequin: bool) -> Listing {
        Listing {
            item_id: 5057,
            quality,
            price_per_unit: price,
            quantity: 1,
            is_exchange_only: mannequin,
            seller_location: "Tonberry".to_string(),
        }
    }

    fn sample_listings() -> Vec<Listing> {
        vec![
            listing(1000, Quality::High, false),
            listing(950, Quality::High, false),
            listing(980, Quality::High, false),
            listing(1, Quality::High, true),
            listing(800, Quality::Normal, false),
            listing(100, Quality::Normal, false),
            listing(750, Quality::Normal, false),
            listing(780, Quality::Normal, false),
        ]
    }

    fn velocity() -> SaleVelocity {
        SaleVelocity {
            normal: 12.5,
            high: 3.0,
        }
    }

    #[test]
    fn summarises_both_tiers() {
        let stats = compute_stats(5057, &sample_listings(), velocity(), &StatsConfig::default())
            .unwrap();

        let hq = &stats[&Quality::High];
        assert_eq!(hq.min_price, Some(950));
        assert_eq!(hq.total_listing_count, 3);
        assert_eq!(hq.median_price, Some(980.0));
        assert_eq!(hq.sale_velocity, 3.0);
        assert!(hq.sample_listings.len() <= 5);

        let nq = &stats[&Quality::Normal];
        assert_eq!(nq.min_price, Some(750));
        assert_eq!(nq.total_listing_count, 3);
        assert_eq!(nq.median_price, Some(780.0));
        assert_eq!(nq.sale_velocity, 12.5);
    }

    #[test]
    fn sample_is_sorted_and_capped() {
        let listings: Vec<Listing> = [130, 100, 120, 110, 105, 125, 115]
            .into_iter()
            .map(|price| listing(price, Quality::Normal, false))
            .collect();
        let config = StatsConfig {
            sample_size: 3,
            ..StatsConfig::default()
        };

        let stats = compute_stats(5057, &listings, velocity(), &config).unwrap();
        let nq = &stats[&Quality::Normal];

        let sample: Vec<u64> = nq.sample_listings.iter().map(|l| l.price_per_unit).collect();
        assert_eq!(sample, vec![100, 105, 110]);
        assert_eq!(nq.total_listing_count, 7);
        assert_eq!(nq.min_price, Some(nq.sample_listings[0].price_per_unit));
        assert_eq!(nq.median_price, Some(115.0));
    }

    #[test]
    fn missing_tier_is_omitted() {
        let listings = vec![
            listing(200, Quality::Normal, false),
            listing(210, Quality::Normal, false),
            listing(5, Quality::High, true),
        ];

        let stats = compute_stats(5057, &listings, velocity(), &StatsConfig::default()).unwrap();

        assert!(stats.contains_key(&Quality::Normal));
        assert!(!stats.contains_key(&Quality::High));
    }

    #[test]
    fn no_competitive_listings_is_none() {
        assert!(compute_stats(5057, &[], velocity(), &StatsConfig::default()).is_none());

        let mannequins = vec![listing(1, Quality::Normal, true), listing(2, Quality::High, true)];
        assert!(compute_stats(5057, &mannequins, velocity(), &StatsConfig::default()).is_none());
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let config = StatsConfig::default();
        let first = compute_stats(5057, &sample_listings(), velocity(), &config);
        let second = compute_stats(5057, &sample_listings(), velocity(), &config);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn market_skips_items_without_listings() {
        let mut items = BTreeMap::new();
        let mut priced = ItemMarket::new(5057);
        priced.listings = sample_listings();
        priced.velocity = velocity();
        items.insert(5057, priced);
        items.insert(5058, ItemMarket::new(5058));

        let snapshot = MarketSnapshot {
            scope: "Japan".to_string(),
            fetched_at: OffsetDateTime::UNIX_EPOCH,
            items,
        };

        let market = compute_market(&snapshot, &StatsConfig::default());
        assert_eq!(market.len(), 1);
        assert!(market.contains_key(&5057));
    }

    proptest! {
        #[test]
        fn stats_agree_with_the_surviving_listings(
            raw in prop::collection::vec((1u64..100_000, any::<bool>(), any::<bool>()), 0..40),
            sample_size in 1usize..10,
        ) {
            let listings: Vec<Listing> = raw
                .iter()
                .map(|&(price, hq, mannequin)| {
                    let quality = if hq { Quality::High } else { Quality::Normal };
                    listing(price, quality, mannequin)
                })
                .collect();
            let config = StatsConfig {
                sample_size,
                ..StatsConfig::default()
            };

            let stats = compute_stats(5057, &listings, velocity(), &config);
            let competitive = |quality: Quality| -> Vec<u64> {
                listings
                    .iter()
                    .filter(|l| !l.is_exchange_only && l.quality == quality)
                    .map(|l| l.price_per_unit)
                    .collect()
            };

            let no_competitive = competitive(Quality::Normal).is_empty()
                && competitive(Quality::High).is_empty();
            prop_assert_eq!(stats.is_none(), no_competitive);

            let stats = stats.unwrap_or_default();
            for quality in [Quality::Normal, Quality::High] {
                let prices = competitive(quality);
                let Some(tier) = stats.get(&quality) else {
                    prop_assert!(prices.is_empty());
                    continue;
                };
                let survivors = filter_outliers_with(&prices, config.outlier_threshold)
                    .unwrap_or_default();

                prop_assert_eq!(tier.min_price, survivors.iter().min().copied());
                prop_assert_eq!(tier.total_listing_count, survivors.len());
                prop_assert!(tier.total_listing_count >= tier.sample_listings.len());
                prop_assert_eq!(tier.sample_listings.len(), sample_size.min(survivors.len()));
                prop_assert_eq!(
                    tier.min_price,
                    tier.sample_listings.first().map(|l| l.price_per_unit)
                );
                prop_assert!(tier
                    .sample_listings
                    .windows(2)
                    .all(|pair| pair[0].price_per_unit <= pair[1].price_per_unit));
            }
        }
    }
}
