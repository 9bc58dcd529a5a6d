//! Robust outlier removal for price series.
//!
//! A price is kept when its modified z-score `|x - median| / s` is at most the
//! threshold, where `s = 1.4826 * MAD`. When the MAD is zero (more than half
//! the prices are identical) `s` falls back to `1.253314 * mean |x - median|`.
//! At least half of any series sits within one MAD of the median, so with a
//! threshold of 1.0 or more the result is never empty.

/// Default modified z-score cut-off (Iglewicz & Hoaglin).
pub const OUTLIER_THRESHOLD: f64 = 3.5;

/// Lowest threshold accepted; smaller values are raised to this.
pub const MIN_OUTLIER_THRESHOLD: f64 = 1.0;

const MAD_SCALE: f64 = 1.4826;
const MEAN_AD_SCALE: f64 = 1.253314;

/// Removes anomalous prices with the default threshold.
///
/// Returns `None` for an empty series. Survivors keep their relative order.
pub fn filter_outliers(prices: &[u64]) -> Option<Vec<u64>> {
    filter_outliers_with(prices, OUTLIER_THRESHOLD)
}

pub fn filter_outliers_with(prices: &[u64], threshold: f64) -> Option<Vec<u64>> {
    if prices.is_empty() {
        return None;
    }

    let mask = outlier_mask(prices, threshold);
    Some(
        prices
            .iter()
            .zip(mask)
            .filter_map(|(price, keep)| keep.then_some(*price))
            .collect(),
    )
}

/// Per-position keep decision for `prices`; `true` means the price survives.
pub fn outlier_mask(prices: &[u64], threshold: f64) -> Vec<bool> {
    if prices.len() <= 2 {
        return vec![true; prices.len()];
    }

    let threshold = threshold.max(MIN_OUTLIER_THRESHOLD);
    let values: Vec<f64> = prices.iter().map(|&price| price as f64).collect();
    let center = median(&values);
    let deviations: Vec<f64> = values.iter().map(|value| (value - center).abs()).collect();

    let mad = median(&deviations);
    let spread = if mad > 0.0 {
        MAD_SCALE * mad
    } else {
        MEAN_AD_SCALE * deviations.iter().sum::<f64>() / deviations.len() as f64
    };

    if spread <= 0.0 {
        return vec![true; prices.len()];
    }

    deviations
        .iter()
        .map(|deviation| deviation / spread <= threshold)
        .collect()
}

/// Median of an unsorted, non-empty series; the mean of the two middle values
/// for even lengths.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    median_of_sorted(&sorted)
}

pub(crate) fn median_of_sorted(sorted: &[f64]) -> f64 {
    let len = sorted.len();
    if len == 0 {
        return f64::NAN;
    }
    let mid = len / 2;
    if len % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
