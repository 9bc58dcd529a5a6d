//! Pure craft-vs-buy logic. Nothing in here performs I/O.

pub mod entities;
pub mod error;
pub mod evaluation;
pub mod listings;
pub mod market_stats;
pub mod outliers;
pub mod recipe;

pub use entities::{
    BaselinePrice, CostLine, CraftSummary, Ingredient, IngredientRole, ItemId, ItemInfo,
    ItemMarket, Listing, MarketSnapshot, MarketStats, MaterialPolicy, PriceSource, Quality,
    QualityStats, RecipeExpansion, SaleVelocity,
};
pub use error::CraftError;
pub use evaluation::{
    analyze, analyze_with, profit_indicator, ProfitIndicator, ProfitIndicatorStatus,
    LOW_MARGIN_THRESHOLD,
};
pub use listings::{classify, QualityBuckets};
pub use market_stats::{compute_market, compute_stats, StatsConfig, DEFAULT_SAMPLE_SIZE};
pub use outliers::{filter_outliers, filter_outliers_with, median, OUTLIER_THRESHOLD};
pub use recipe::{
    expand_row, resolve, IngredientSlot, ItemDirectory, RecipeCatalog, RecipeRow, RecipeSummary,
    MAX_INGREDIENT_SLOTS,
};
