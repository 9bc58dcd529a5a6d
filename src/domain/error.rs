use thiserror::Error;

use super::entities::ItemId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CraftError {
    #[error("no recipe produces item {result_id}")]
    NotFound { result_id: ItemId },
    #[error("insufficient market data: ingredient {item_id} has no shop or marketboard price")]
    UnpricedIngredient { item_id: ItemId },
    #[error("insufficient market data: item {item_id} has no shop or marketboard price")]
    UnpricedResult { item_id: ItemId },
    #[error("profit percentage undefined: item {item_id} has a baseline price of zero")]
    ZeroBaselinePrice { item_id: ItemId },
    #[error("cost of item {item_id} does not fit in 64 bits")]
    CostOverflow { item_id: ItemId },
    #[error("marketplace unavailable: {reason}")]
    UpstreamUnavailable { reason: String },
}

impl CraftError {
    /// True for the errors a caller should present as "not enough market data"
    /// rather than as a failure.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            CraftError::UnpricedIngredient { .. } | CraftError::UnpricedResult { .. }
        )
    }
}
