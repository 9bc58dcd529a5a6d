//! One craft-vs-buy query: resolve the recipe, fetch its market, price it.

use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    domain::{
        analyze_with, compute_market, resolve, CraftError, CraftSummary, ItemDirectory, ItemId,
        ItemInfo, MarketSnapshot, MaterialPolicy, QualityStats, RecipeCatalog, RecipeExpansion,
        StatsConfig,
    },
    infra::universalis::UniversalisClient,
};

/// Everything a renderer needs to show a craft check without recomputing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CraftReport {
    pub scope: String,
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
    pub expansion: RecipeExpansion,
    pub items: BTreeMap<ItemId, ItemInfo>,
    pub market: BTreeMap<ItemId, QualityStats>,
    pub summary: CraftSummary,
    /// Same recipe priced with high-quality materials wherever they are listed.
    pub high_quality_summary: CraftSummary,
}

impl CraftReport {
    pub fn item_name(&self, id: ItemId) -> String {
        self.items
            .get(&id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| ItemInfo::unknown(id).name)
    }
}

pub async fn check_recipe<C>(
    catalog: &C,
    client: &UniversalisClient,
    scope: &str,
    config: &StatsConfig,
    result_id: ItemId,
) -> Result<CraftReport, CraftError>
where
    C: RecipeCatalog + ItemDirectory + ?Sized,
{
    let expansion = resolve(catalog, result_id)?;
    let items = item_infos(catalog, &expansion);

    let item_ids: Vec<ItemId> = items.keys().copied().collect();
    let hq_item_ids: Vec<ItemId> = items
        .values()
        .filter(|item| item.can_be_hq)
        .map(|item| item.id)
        .collect();

    tracing::info!(
        result_id,
        scope,
        items = item_ids.len(),
        hq_items = hq_item_ids.len(),
        "checking recipe"
    );

    let snapshot = client
        .fetch_snapshot(scope, &item_ids, &hq_item_ids)
        .await
        .map_err(|error| CraftError::UpstreamUnavailable {
            reason: error.to_string(),
        })?;

    build_report(expansion, items, &snapshot, config)
}

/// Synchronous tail of [`check_recipe`] once the snapshot is in hand.
pub fn build_report(
    expansion: RecipeExpansion,
    items: BTreeMap<ItemId, ItemInfo>,
    snapshot: &MarketSnapshot,
    config: &StatsConfig,
) -> Result<CraftReport, CraftError> {
    let market = compute_market(snapshot, config);
    let summary = analyze_with(&expansion, &market, MaterialPolicy::Cheapest)?;
    let high_quality_summary = analyze_with(&expansion, &market, MaterialPolicy::HighQuality)?;

    tracing::debug!(
        result_id = expansion.result_id(),
        craft_cost = summary.total_craft_cost,
        profit = summary.profit,
        "recipe priced"
    );

    Ok(CraftReport {
        scope: snapshot.scope.clone(),
        fetched_at: snapshot.fetched_at,
        expansion,
        items,
        market,
        summary,
        high_quality_summary,
    })
}

fn item_infos<D>(directory: &D, expansion: &RecipeExpansion) -> BTreeMap<ItemId, ItemInfo>
where
    D: ItemDirectory + ?Sized,
{
    expansion
        .item_ids()
        .into_iter()
        .map(|id| (id, directory.item_or_unknown(id)))
        .collect()
}
