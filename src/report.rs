//! Plain-text rendering of a [`CraftReport`] for the terminal.

use std::fmt;

use crate::app::CraftReport;
use crate::domain::{
    profit_indicator, CraftSummary, ItemId, MaterialPolicy, ProfitIndicatorStatus, Quality,
};

/// Terminal layout of a report; `to_string()` gives the full text.
pub struct TextReport<'a>(pub &'a CraftReport);

pub fn render_text(report: &CraftReport) -> String {
    TextReport(report).to_string()
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let result_id = report.expansion.result_id();

        writeln!(
            f,
            "{} ({result_id}) on {}, market data from {}",
            report.item_name(result_id),
            report.scope,
            report.fetched_at.date()
        )?;
        writeln!(f)?;

        write_market_line(f, report, result_id)?;
        for ingredient in &report.expansion.ingredients {
            write_market_line(f, report, ingredient.item_id)?;
        }
        writeln!(f)?;

        write_summary(f, report, &report.summary)?;
        if report.high_quality_summary.lines != report.summary.lines {
            writeln!(f)?;
            write_summary(f, report, &report.high_quality_summary)?;
        }
        Ok(())
    }
}

fn write_market_line(
    f: &mut fmt::Formatter<'_>,
    report: &CraftReport,
    item_id: ItemId,
) -> fmt::Result {
    let tiers = report.market.get(&item_id);
    let tier = |quality: Quality| {
        tiers
            .and_then(|stats| stats.get(&quality))
            .map(|stats| {
                format!(
                    "{} min {} median {} ({} listed)",
                    quality.label(),
                    price(stats.min_price),
                    stats
                        .median_price
                        .map(|median| format!("{median:.0}"))
                        .unwrap_or_else(|| "-".into()),
                    stats.total_listing_count
                )
            })
            .unwrap_or_else(|| format!("{} -", quality.label()))
    };
    writeln!(
        f,
        "  {:<32} {:<36} {}",
        report.item_name(item_id),
        tier(Quality::Normal),
        tier(Quality::High)
    )
}

fn write_summary(
    f: &mut fmt::Formatter<'_>,
    report: &CraftReport,
    summary: &CraftSummary,
) -> fmt::Result {
    let heading = match summary.material_policy {
        MaterialPolicy::Cheapest => "Cheapest materials",
        MaterialPolicy::HighQuality => "High-quality materials",
    };
    writeln!(f, "{heading}")?;

    for line in &summary.lines {
        writeln!(
            f,
            "  {:<32} {:>3} x {:>9} ({:<4}) = {:>10}",
            report.item_name(line.ingredient.item_id),
            line.ingredient.required_amount,
            line.chosen_unit_price,
            line.chosen_source.label(),
            line.line_total
        )?;
    }

    let indicator = profit_indicator(summary);
    let status = match indicator.status {
        ProfitIndicatorStatus::Healthy => "OK",
        ProfitIndicatorStatus::Thin => "WARNING",
        ProfitIndicatorStatus::Loss => "LOSS",
    };
    writeln!(f, "  craft cost   {:>10}", summary.total_craft_cost)?;
    writeln!(
        f,
        "  buy price    {:>10} ({} x {} {})",
        summary.baseline.total,
        summary.baseline.amount,
        summary.baseline.unit_price,
        summary.baseline.source.label()
    )?;
    writeln!(
        f,
        "  profit       {:>10} ({:.1}%)",
        summary.profit,
        summary.profit_margin * 100.0
    )?;
    writeln!(f, "  sells/day    {:>10.2}", summary.sale_velocity)?;
    writeln!(f, "  [{status}] {}", indicator.rationale)
}

fn price(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}
