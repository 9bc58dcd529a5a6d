//! Craft cost aggregation and craft-vs-buy profit analysis.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entities::{
    BaselinePrice, CostLine, CraftSummary, Ingredient, ItemId, MaterialPolicy, PriceSource,
    Quality, QualityStats, RecipeExpansion,
};
use super::error::CraftError;

/// Margins below this are flagged as thin.
pub const LOW_MARGIN_THRESHOLD: f64 = 0.2;

/// Prices the recipe with the cheapest source for every ingredient.
pub fn analyze(
    expansion: &RecipeExpansion,
    stats_by_item: &BTreeMap<ItemId, QualityStats>,
) -> Result<CraftSummary, CraftError> {
    analyze_with(expansion, stats_by_item, MaterialPolicy::Cheapest)
}

pub fn analyze_with(
    expansion: &RecipeExpansion,
    stats_by_item: &BTreeMap<ItemId, QualityStats>,
    policy: MaterialPolicy,
) -> Result<CraftSummary, CraftError> {
    let mut lines = Vec::with_capacity(expansion.ingredients.len());
    let mut total_craft_cost = 0_u64;

    for ingredient in &expansion.ingredients {
        let offers = UnitOffers::collect(ingredient, stats_by_item.get(&ingredient.item_id));
        let (chosen_source, chosen_unit_price) = offers
            .cheapest(policy)
            .ok_or(CraftError::UnpricedIngredient {
                item_id: ingredient.item_id,
            })?;
        let overflow = || CraftError::CostOverflow {
            item_id: ingredient.item_id,
        };
        let line_total = chosen_unit_price
            .checked_mul(u64::from(ingredient.required_amount))
            .ok_or_else(overflow)?;
        total_craft_cost = total_craft_cost
            .checked_add(line_total)
            .ok_or_else(overflow)?;

        lines.push(CostLine {
            ingredient: ingredient.clone(),
            shop_unit: offers.shop,
            normal_unit: offers.normal,
            high_unit: offers.high,
            chosen_source,
            chosen_unit_price,
            line_total,
        });
    }

    let result = &expansion.result;
    let result_stats = stats_by_item.get(&result.item_id);
    let (source, unit_price) = UnitOffers::collect(result, result_stats)
        .cheapest(MaterialPolicy::Cheapest)
        .ok_or(CraftError::UnpricedResult {
            item_id: result.item_id,
        })?;
    let overflow = || CraftError::CostOverflow {
        item_id: result.item_id,
    };
    let baseline = BaselinePrice {
        source,
        unit_price,
        amount: result.required_amount,
        total: unit_price
            .checked_mul(u64::from(result.required_amount))
            .ok_or_else(overflow)?,
    };

    if baseline.total == 0 {
        return Err(CraftError::ZeroBaselinePrice {
            item_id: result.item_id,
        });
    }

    let profit = signed(baseline.total)
        .zip(signed(total_craft_cost))
        .map(|(baseline, cost)| baseline - cost)
        .ok_or_else(overflow)?;
    let profit_margin = profit as f64 / baseline.total as f64;

    Ok(CraftSummary {
        result_item_id: result.item_id,
        material_policy: policy,
        lines,
        total_craft_cost,
        baseline,
        profit,
        profit_margin,
        sale_velocity: combined_velocity(result_stats),
    })
}

fn signed(value: u64) -> Option<i64> {
    i64::try_from(value).ok()
}

fn combined_velocity(stats: Option<&QualityStats>) -> f64 {
    stats
        .map(|tiers| tiers.values().map(|tier| tier.sale_velocity).sum::<f64>())
        .unwrap_or(0.0)
}

/// Unit prices available for one catalog row.
struct UnitOffers {
    shop: Option<u64>,
    normal: Option<u64>,
    high: Option<u64>,
}

impl UnitOffers {
    fn collect(ingredient: &Ingredient, stats: Option<&QualityStats>) -> Self {
        let min_price = |quality: Quality| {
            stats
                .and_then(|tiers| tiers.get(&quality))
                .and_then(|tier| tier.min_price)
        };

        Self {
            shop: ingredient.shop_unit_price,
            normal: min_price(Quality::Normal),
            high: min_price(Quality::High),
        }
    }

    fn cheapest(&self, policy: MaterialPolicy) -> Option<(PriceSource, u64)> {
        let candidates = [
            (PriceSource::Shop, self.shop),
            (PriceSource::NormalQuality, self.normal),
            (PriceSource::HighQuality, self.high),
        ];

        let hq_only = policy == MaterialPolicy::HighQuality && self.high.is_some();

        candidates
            .into_iter()
            .filter(|(source, _)| !(hq_only && *source == PriceSource::NormalQuality))
            .filter_map(|(source, price)| price.map(|price| (source, price)))
            .min_by_key(|(source, price)| (*price, *source))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitIndicatorStatus {
    Healthy,
    Thin,
    Loss,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProfitIndicator {
    pub status: ProfitIndicatorStatus,
    pub margin: f64,
    pub rationale: String,
}

impl CraftSummary {
    pub fn margin_status(&self) -> ProfitIndicatorStatus {
        if self.profit_margin <= 0.0 {
            ProfitIndicatorStatus::Loss
        } else if self.profit_margin < LOW_MARGIN_THRESHOLD {
            ProfitIndicatorStatus::Thin
        } else {
            ProfitIndicatorStatus::Healthy
        }
    }
}

pub fn profit_indicator(summary: &CraftSummary) -> ProfitIndicator {
    let status = summary.margin_status();
    let rationale = match status {
        ProfitIndicatorStatus::Loss => "Crafting this item will result in a loss".to_string(),
        ProfitIndicatorStatus::Thin => format!(
            "Low profit margin (below {:.0}%)",
            LOW_MARGIN_THRESHOLD * 100.0
        ),
        ProfitIndicatorStatus::Healthy => format!(
            "Buy {} - craft {} = {}",
            summary.baseline.total, summary.total_craft_cost, summary.profit
        ),
    };

    ProfitIndicator {
        status,
        margin: summary.profit_margin,
        rationale,
    }
}
