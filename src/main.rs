use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use craft_or_buy::{
    check_recipe,
    domain::ItemId,
    infra::catalog::JsonCatalog,
    report::render_text,
    util::{
        settings::{load_settings, save_settings, Settings},
        version::APP_NAME,
    },
};

/// Is it cheaper to craft an item or to buy it off the market board?
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Recipe catalog JSON (defaults to the local data directory)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Price one recipe and compare it against buying the result
    Check {
        item_id: ItemId,

        /// World, data center or region to query
        #[arg(long)]
        scope: Option<String>,

        /// Print the full report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List craftable items as "name (id)"
    Recipes {
        #[arg(long)]
        search: Option<String>,
    },
    /// Show the effective settings
    Config {
        /// Write the default settings file
        #[arg(long, default_value_t = false)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.settings.as_deref()).context("loading settings")?;
    settings.logging = settings.logging.clone().verbose(cli.verbose);
    settings.logging.init();

    if let Some(path) = &cli.catalog {
        settings.catalog_path = Some(path.clone());
    }

    match cli.command {
        Command::Check {
            item_id,
            scope,
            json,
        } => {
            if let Some(scope) = scope {
                settings.scope = scope;
            }
            run_check(&settings, item_id, json).await
        }
        Command::Recipes { search } => run_recipes(&settings, search.as_deref()),
        Command::Config { init } => run_config(&settings, cli.settings.as_deref(), init),
    }
}

async fn run_check(settings: &Settings, item_id: ItemId, json: bool) -> Result<()> {
    let catalog = load_catalog(settings)?;
    let client = settings.client().context("building Universalis client")?;

    let report = match check_recipe(
        &catalog,
        &client,
        &settings.scope,
        &settings.stats_config(),
        item_id,
    )
    .await
    {
        Ok(report) => report,
        Err(error) if error.is_insufficient_data() => {
            bail!("insufficient market data for item {item_id}: {error}")
        }
        Err(error) => return Err(error.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }
    Ok(())
}

fn run_recipes(settings: &Settings, search: Option<&str>) -> Result<()> {
    let catalog = load_catalog(settings)?;
    let recipes = catalog.search(search.unwrap_or_default());
    if recipes.is_empty() {
        tracing::warn!("no recipes matched");
    }
    for recipe in recipes {
        println!("{}", recipe.label());
    }
    Ok(())
}

fn run_config(
    settings: &Settings,
    path: Option<&std::path::Path>,
    init: bool,
) -> Result<()> {
    if init {
        let written = save_settings(&Settings::default(), path).context("writing settings")?;
        println!("wrote {}", written.display());
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

fn load_catalog(settings: &Settings) -> Result<JsonCatalog> {
    let path = settings.catalog_path();
    JsonCatalog::load(&path).with_context(|| format!("loading catalog {}", path.display()))
}
