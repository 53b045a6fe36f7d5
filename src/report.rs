//! Manual moon report
//!
//! Same parse-and-price pass the bidder runs, for a pasted scan instead of the
//! auction list. Nothing is bid on.

use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

use crate::error::Result;
use crate::market::{ItemNameSource, PriceOracle, PriceTable};
use crate::materials::MaterialReference;
use crate::scan::parse_scan;
use crate::types::{MaterialId, Money, Quantity, YieldRecord};
use crate::utils::{format_isk, strip_localized_markup};

pub const DEFAULT_MIN_BUY: Money = 1_000_000.0;

/// One material of a moon, priced at the trade hub
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub material_id: MaterialId,
    pub material_name: Option<String>,
    pub quantity: Quantity,
    pub sell: Money,
    pub buy: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub name: String,
    pub lines: Vec<ReportLine>,
    pub sell: Money,
    pub buy: Money,
}

impl ReportEntry {
    /// Plain-text table, one material per line plus a total
    pub fn render(&self) -> String {
        let mut out = format!("{}\n", self.name);
        for line in &self.lines {
            let label = line
                .material_name
                .clone()
                .unwrap_or_else(|| line.material_id.to_string());
            out.push_str(&format!(
                "  {:<28} {:>8} {:>18} {:>18}\n",
                label,
                line.quantity,
                format_isk(line.sell),
                format_isk(line.buy)
            ));
        }
        out.push_str(&format!(
            "  {:<28} {:>8} {:>18} {:>18}\n",
            "Total",
            "",
            format_isk(self.sell),
            format_isk(self.buy)
        ));
        out
    }
}

fn price_entry(
    record: YieldRecord,
    prices: &PriceTable,
    names: &HashMap<MaterialId, String>,
) -> Option<ReportEntry> {
    let mut lines = Vec::with_capacity(record.materials.len());
    for (id, quantity) in &record.materials {
        let Some(quote) = prices.get(id) else {
            warn!("No price for material {}, leaving {} out of the report", id, record.name);
            return None;
        };
        lines.push(ReportLine {
            material_id: *id,
            material_name: names.get(id).cloned(),
            quantity: *quantity,
            sell: *quantity as f64 * quote.sell_unit_price,
            buy: *quantity as f64 * quote.buy_unit_price,
        });
    }

    Some(ReportEntry {
        sell: lines.iter().map(|l| l.sell).sum(),
        buy: lines.iter().map(|l| l.buy).sum(),
        name: record.name,
        lines,
    })
}

/// Price every moon of a pasted scan; moons worth less than `min_buy` are dropped
pub async fn build_report(
    text: &str,
    reference: &MaterialReference,
    oracle: &PriceOracle,
    names: Option<&dyn ItemNameSource>,
    min_buy: Money,
) -> Result<Vec<ReportEntry>> {
    let yields = parse_scan(&strip_localized_markup(text), reference);
    let ids: BTreeSet<MaterialId> = yields
        .iter()
        .flat_map(|y| y.materials.keys().copied())
        .collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let prices = oracle.fetch_prices(&ids).await?;
    let names = match names {
        Some(source) => source.fetch_names(&ids).await.unwrap_or_else(|e| {
            warn!("Material names unavailable: {}", e);
            HashMap::new()
        }),
        None => HashMap::new(),
    };

    let total = yields.len();
    let entries: Vec<ReportEntry> = yields
        .into_iter()
        .filter_map(|y| price_entry(y, &prices, &names))
        .filter(|e| e.buy >= min_buy)
        .collect();
    info!("Report: {} of {} moons worth at least {}", entries.len(), total, format_isk(min_buy));
    Ok(entries)
}
