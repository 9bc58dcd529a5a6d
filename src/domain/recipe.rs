//! Recipe lookup and single-level ingredient expansion.

use serde::{Deserialize, Serialize};

use super::entities::{Ingredient, IngredientRole, ItemId, ItemInfo, RecipeExpansion};
use super::error::CraftError;

/// Eight material slots plus two crystal slots.
pub const MAX_INGREDIENT_SLOTS: usize = 10;

/// One ingredient slot of a catalog row. Unused slots carry item id `0`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientSlot {
    pub item_id: ItemId,
    #[serde(default)]
    pub amount: u32,
    /// Vendor price; `0` or missing means the item is not sold in a shop.
    #[serde(default)]
    pub shop_price: Option<u64>,
}

impl IngredientSlot {
    pub fn is_used(&self) -> bool {
        self.item_id != 0 && self.amount > 0
    }
}

/// Catalog row describing how one item is crafted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRow {
    #[serde(default)]
    pub recipe_id: Option<u32>,
    pub result_id: ItemId,
    #[serde(default = "default_result_amount")]
    pub result_amount: u32,
    #[serde(default)]
    pub result_shop_price: Option<u64>,
    #[serde(default)]
    pub ingredients: Vec<IngredientSlot>,
}

fn default_result_amount() -> u32 {
    1
}

/// Short entry for recipe pickers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub result_id: ItemId,
    pub name: String,
}

impl RecipeSummary {
    /// `"Name (id)"`, the label the item picker shows.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.result_id)
    }
}

/// Read-only access to crafting recipes. Implementations must allow
/// concurrent reads.
pub trait RecipeCatalog: Send + Sync {
    fn recipe(&self, result_id: ItemId) -> Option<RecipeRow>;

    fn recipes(&self) -> Vec<RecipeSummary>;
}

/// Read-only access to item names and HQ eligibility.
pub trait ItemDirectory: Send + Sync {
    fn item(&self, id: ItemId) -> Option<ItemInfo>;

    fn item_or_unknown(&self, id: ItemId) -> ItemInfo {
        self.item(id).unwrap_or_else(|| ItemInfo::unknown(id))
    }
}

/// Expands the recipe producing `result_id` into its direct ingredients.
///
/// Ingredients that are craftable themselves are not expanded further.
pub fn resolve<C>(catalog: &C, result_id: ItemId) -> Result<RecipeExpansion, CraftError>
where
    C: RecipeCatalog + ?Sized,
{
    let row = catalog
        .recipe(result_id)
        .ok_or(CraftError::NotFound { result_id })?;
    Ok(expand_row(&row))
}

pub fn expand_row(row: &RecipeRow) -> RecipeExpansion {
    if row.ingredients.len() > MAX_INGREDIENT_SLOTS {
        tracing::warn!(
            result_id = row.result_id,
            slots = row.ingredients.len(),
            "recipe has more ingredient slots than the game allows; extra slots ignored"
        );
    }

    let ingredients = row
        .ingredients
        .iter()
        .take(MAX_INGREDIENT_SLOTS)
        .filter(|slot| slot.is_used())
        .map(|slot| Ingredient {
            item_id: slot.item_id,
            required_amount: slot.amount,
            shop_unit_price: shop_price(slot.shop_price),
            role: IngredientRole::Ingredient,
        })
        .collect();

    RecipeExpansion {
        recipe_id: row.recipe_id,
        result: Ingredient {
            item_id: row.result_id,
            required_amount: row.result_amount.max(1),
            shop_unit_price: shop_price(row.result_shop_price),
            role: IngredientRole::Result,
        },
        ingredients,
    }
}

fn shop_price(raw: Option<u64>) -> Option<u64> {
    raw.filter(|price| *price > 0)
}
