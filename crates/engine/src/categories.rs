//! Market-category classifier
//!
//! Unlike price tiers, category totals are defined to reconcile against the
//! full realized-PnL figure, so open positions contribute their realized
//! components here. Positions whose category lookup failed land in a literal
//! "Other" bucket instead of being dropped.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::types::{CategorySummary, Position};

pub const FALLBACK_CATEGORY: &str = "Other";

#[derive(Default)]
struct CategoryAccumulator {
    realized_pnl: Decimal,
    volume: Decimal,
}

/// Per-category realized PnL and volume share across closed and open
/// positions, sorted by descending PnL.
pub fn classify_categories(
    closed: &[Position],
    open: &[Position],
    categories: &HashMap<String, String>,
) -> Vec<CategorySummary> {
    let mut accs: HashMap<&str, CategoryAccumulator> = HashMap::new();

    for pos in closed.iter().chain(open.iter()) {
        let category = categories
            .get(&pos.condition_id)
            .map_or(FALLBACK_CATEGORY, String::as_str);
        let acc = accs.entry(category).or_default();
        acc.realized_pnl += pos.realized_pnl;
        acc.volume += pos.usd_amount();
    }

    let total_volume: Decimal = accs.values().map(|a| a.volume).sum();

    let mut summaries: Vec<CategorySummary> = accs
        .into_iter()
        .map(|(category, acc)| CategorySummary {
            category: category.to_string(),
            realized_pnl: acc.realized_pnl,
            volume: acc.volume,
            pct_volume: (total_volume != Decimal::ZERO)
                .then(|| acc.volume / total_volume * dec!(100)),
        })
        .collect();

    // Descending PnL; category name breaks ties so output order is stable
    summaries.sort_by(|a, b| {
        b.realized_pnl
            .cmp(&a.realized_pnl)
            .then_with(|| a.category.cmp(&b.category))
    });
    summaries
}
