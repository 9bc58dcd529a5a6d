//! Read-only recipe and item catalog loaded from a JSON snapshot on disk.
//!
//! The snapshot is produced by the game-data import job; this module only
//! reads it. Lookups never mutate, so a loaded catalog can be shared between
//! concurrent queries behind an `Arc`.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ItemDirectory, ItemId, ItemInfo, RecipeCatalog, RecipeRow, RecipeSummary};

const CATALOG_FILENAME: &str = "catalog.json";
const DATA_DIR_NAME: &str = "craft-or-buy";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

/// On-disk layout of the catalog snapshot.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub items: Vec<ItemInfo>,
    #[serde(default)]
    pub recipes: Vec<RecipeRow>,
}

#[derive(Debug, Default, Clone)]
pub struct JsonCatalog {
    items: HashMap<ItemId, ItemInfo>,
    recipes: HashMap<ItemId, RecipeRow>,
}

impl JsonCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            items = catalog.items.len(),
            recipes = catalog.recipes.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(content)?;
        Self::from_file(file)
    }

    pub fn from_file(file: CatalogFile) -> Result<Self, CatalogError> {
        let mut recipes = HashMap::with_capacity(file.recipes.len());
        for row in file.recipes {
            if row.result_id == 0 {
                return Err(CatalogError::Invalid(
                    "recipe with result item id 0".to_string(),
                ));
            }
            // Several recipes can yield the same item (one per crafting job);
            // the first one listed wins.
            if recipes.contains_key(&row.result_id) {
                tracing::debug!(result_id = row.result_id, "skipping alternate recipe");
                continue;
            }
            recipes.insert(row.result_id, row);
        }

        let items = file.items.into_iter().map(|item| (item.id, item)).collect();

        Ok(Self { items, recipes })
    }

    /// Recipes whose result name contains `query`, case-insensitively,
    /// ordered by name then id.
    pub fn search(&self, query: &str) -> Vec<RecipeSummary> {
        let needle = query.trim().to_lowercase();
        self.recipes()
            .into_iter()
            .filter(|summary| needle.is_empty() || summary.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl RecipeCatalog for JsonCatalog {
    fn recipe(&self, result_id: ItemId) -> Option<RecipeRow> {
        self.recipes.get(&result_id).cloned()
    }

    fn recipes(&self) -> Vec<RecipeSummary> {
        let mut summaries: Vec<RecipeSummary> = self
            .recipes
            .keys()
            .map(|&result_id| RecipeSummary {
                result_id,
                name: self.item_or_unknown(result_id).name,
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.result_id.cmp(&b.result_id)));
        summaries
    }
}

impl ItemDirectory for JsonCatalog {
    fn item(&self, id: ItemId) -> Option<ItemInfo> {
        self.items.get(&id).cloned()
    }
}

/// Default catalog location in the local data directory.
pub fn default_catalog_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
        .join(CATALOG_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resolve;
    use std::io::Write;

    const CATALOG: &str = r#"{
        "items": [
            { "id": 1601, "name": "Iron Longsword", "can_be_hq": true },
            { "id": 5057, "name": "Iron Ingot", "can_be_hq": true },
            { "id": 2, "name": "Fire Shard", "can_be_hq": false },
            { "id": 1602, "name": "bronze dagger", "can_be_hq": true }
        ],
        "recipes": [
            {
                "recipe_id": 31,
                "result_id": 1601,
                "result_amount": 1,
                "ingredients": [
                    { "item_id": 5057, "amount": 3, "shop_price": 50 },
                    { "item_id": 2, "amount": 2, "shop_price": 0 },
                    { "item_id": 0, "amount": 0 }
                ]
            },
            { "result_id": 1602, "ingredients": [] },
            { "recipe_id": 99, "result_id": 1601, "ingredients": [] }
        ]
    }"#;

    #[test]
    fn loads_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "{CATALOG}").unwrap();

        let catalog = JsonCatalog::load(tmp.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.item(5057).unwrap().name, "Iron Ingot");
        assert!(!catalog.item(2).unwrap().can_be_hq);
    }

    #[test]
    fn first_recipe_for_a_result_wins() {
        let catalog = JsonCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.recipe(1601).unwrap().recipe_id, Some(31));
    }

    #[test]
    fn resolves_through_the_catalog() {
        let catalog = JsonCatalog::from_json(CATALOG).unwrap();
        let expansion = resolve(&catalog, 1601).unwrap();

        assert_eq!(expansion.ingredients.len(), 2);
        assert_eq!(expansion.ingredients[1].shop_unit_price, None);
        assert_eq!(expansion.result.required_amount, 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = JsonCatalog::load(Path::new("/nonexistent/craft-or-buy/catalog.json"));
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            JsonCatalog::from_json("{ not json"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn rejects_result_id_zero() {
        let result = JsonCatalog::from_json(r#"{ "recipes": [ { "result_id": 0 } ] }"#);
        assert!(matches!(result, Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn search_is_case_insensitive_and_sorted() {
        let catalog = JsonCatalog::from_json(CATALOG).unwrap();

        let all: Vec<String> = catalog.search("").iter().map(RecipeSummary::label).collect();
        assert_eq!(all, vec!["Iron Longsword (1601)", "bronze dagger (1602)"]);

        let hits = catalog.search("LONG");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].result_id, 1601);
    }

    #[test]
    fn unknown_items_get_a_placeholder() {
        let catalog = JsonCatalog::from_json(CATALOG).unwrap();
        let info = catalog.item_or_unknown(424242);
        assert_eq!(info.name, "Item #424242");
        assert!(info.can_be_hq);
    }
}
