//! Craft-or-buy checks for FFXIV recipes against live Universalis prices.

pub mod app;
pub mod domain;
pub mod infra;
pub mod report;
pub mod util;

pub use app::{build_report, check_recipe, CraftReport};
