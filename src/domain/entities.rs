use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Game item identifier. `0` never names a real item.
pub type ItemId = u32;

/// Market statistics for one item, keyed by quality tier. Tiers without
/// eligible listings are absent rather than empty.
pub type QualityStats = BTreeMap<Quality, MarketStats>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Normal,
    High,
}

impl Quality {
    pub fn label(&self) -> &'static str {
        match self {
            Quality::Normal => "NQ",
            Quality::High => "HQ",
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, Quality::High)
    }
}

/// One marketboard offer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub item_id: ItemId,
    pub quality: Quality,
    pub price_per_unit: u64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Mannequin / display listings that cannot be bought competitively.
    #[serde(default)]
    pub is_exchange_only: bool,
    #[serde(default)]
    pub seller_location: String,
}

fn default_quantity() -> u32 {
    1
}

/// Units sold per day, as reported by the marketplace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SaleVelocity {
    pub normal: f64,
    pub high: f64,
}

impl SaleVelocity {
    pub fn for_quality(&self, quality: Quality) -> f64 {
        match quality {
            Quality::Normal => self.normal,
            Quality::High => self.high,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub item_id: ItemId,
    pub quality: Quality,
    pub min_price: Option<u64>,
    pub median_price: Option<f64>,
    /// Cheapest surviving listings, ascending by price.
    pub sample_listings: Vec<Listing>,
    /// Listings left after outlier filtering, before the sample cap.
    pub total_listing_count: usize,
    pub sale_velocity: f64,
}

/// Raw market figures for one item as returned by the marketplace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemMarket {
    pub item_id: ItemId,
    pub velocity: SaleVelocity,
    pub listings: Vec<Listing>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub last_upload: Option<OffsetDateTime>,
}

impl ItemMarket {
    pub fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            velocity: SaleVelocity::default(),
            listings: Vec::new(),
            last_upload: None,
        }
    }
}

/// Listings for a set of items, captured for one world, data center or region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub scope: String,
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
    pub items: BTreeMap<ItemId, ItemMarket>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub id: ItemId,
    pub name: String,
    pub can_be_hq: bool,
}

impl ItemInfo {
    /// Placeholder for ids the item directory does not know. HQ is assumed
    /// possible so the high-quality tier is still queried.
    pub fn unknown(id: ItemId) -> Self {
        Self {
            id,
            name: format!("Item #{id}"),
            can_be_hq: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientRole {
    Result,
    Ingredient,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub item_id: ItemId,
    pub required_amount: u32,
    pub shop_unit_price: Option<u64>,
    pub role: IngredientRole,
}

/// A craftable item with its direct ingredients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeExpansion {
    pub recipe_id: Option<u32>,
    pub result: Ingredient,
    pub ingredients: Vec<Ingredient>,
}

impl RecipeExpansion {
    pub fn result_id(&self) -> ItemId {
        self.result.item_id
    }

    /// Every item to look up on the market: the result and each ingredient.
    pub fn item_ids(&self) -> BTreeSet<ItemId> {
        std::iter::once(self.result.item_id)
            .chain(self.ingredients.iter().map(|ingredient| ingredient.item_id))
            .collect()
    }

    /// All rows, result first.
    pub fn rows(&self) -> impl Iterator<Item = &Ingredient> {
        std::iter::once(&self.result).chain(self.ingredients.iter())
    }
}

/// Where a unit price comes from. The declaration order is the tie-break
/// order when two sources ask the same price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Shop,
    NormalQuality,
    HighQuality,
}

impl PriceSource {
    pub fn label(&self) -> &'static str {
        match self {
            PriceSource::Shop => "Shop",
            PriceSource::NormalQuality => "Marketboard (NQ)",
            PriceSource::HighQuality => "Marketboard (HQ)",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    pub ingredient: Ingredient,
    pub shop_unit: Option<u64>,
    pub normal_unit: Option<u64>,
    pub high_unit: Option<u64>,
    pub chosen_source: PriceSource,
    pub chosen_unit_price: u64,
    pub line_total: u64,
}

/// Cheapest way to simply buy the finished item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaselinePrice {
    pub source: PriceSource,
    pub unit_price: u64,
    /// Units the recipe yields per craft.
    pub amount: u32,
    pub total: u64,
}

/// Which market tiers may be used when pricing ingredients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialPolicy {
    /// Cheapest of shop, NQ and HQ.
    #[default]
    Cheapest,
    /// Shop or HQ wherever HQ listings exist; other ingredients fall back to
    /// the cheapest source.
    HighQuality,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CraftSummary {
    pub result_item_id: ItemId,
    pub material_policy: MaterialPolicy,
    pub lines: Vec<CostLine>,
    pub total_craft_cost: u64,
    pub baseline: BaselinePrice,
    pub profit: i64,
    /// `profit / baseline.total`, e.g. `0.6` for 60 %.
    pub profit_margin: f64,
    /// Combined NQ + HQ units sold per day for the result.
    pub sale_velocity: f64,
}
