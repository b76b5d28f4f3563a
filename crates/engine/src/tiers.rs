//! Entry-price tier classifier
//!
//! Buckets closed positions into fixed 10-cent bands of average entry price,
//! from long-shot (0-10c) to heavy favorite (90-100c). A price of exactly
//! $1.00 clamps into the top band rather than falling off the table.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::stats::win_rate_pct;
use crate::types::{Position, TierSummary};

/// (low_cents inclusive, high_cents exclusive, label), report order
pub const PRICE_TIERS: [(i64, i64, &str); 10] = [
    (90, 100, "90-100c"),
    (80, 90, "80-90c"),
    (70, 80, "70-80c"),
    (60, 70, "60-70c"),
    (50, 60, "50-60c"),
    (40, 50, "40-50c"),
    (30, 40, "30-40c"),
    (20, 30, "20-30c"),
    (10, 20, "10-20c"),
    (0, 10, "0-10c"),
];

/// Tier index for an average entry price. Cents are truncated, and values
/// outside 0..100 clamp into the nearest band.
pub fn tier_index(avg_price: Decimal) -> usize {
    let cents = (avg_price * dec!(100)).trunc().to_i64().unwrap_or(0);
    PRICE_TIERS
        .iter()
        .position(|&(low, high, _)| cents >= low && cents < high)
        .unwrap_or(if cents >= 100 { 0 } else { 9 })
}

#[derive(Default)]
struct TierAccumulator {
    positions: usize,
    wins: usize,
    losses: usize,
    realized_pnl: Decimal,
}

/// Tier table over closed positions. Open positions are excluded entirely:
/// counting their realized components here would double them against the
/// all-time realized figure during reconciliation.
pub fn classify_tiers(closed: &[Position]) -> Vec<TierSummary> {
    let mut accs: [TierAccumulator; 10] = Default::default();

    for pos in closed {
        let acc = &mut accs[tier_index(pos.avg_price)];
        acc.positions += 1;
        acc.realized_pnl += pos.realized_pnl;
        if pos.realized_pnl > Decimal::ZERO {
            acc.wins += 1;
        } else if pos.realized_pnl < Decimal::ZERO {
            acc.losses += 1;
        }
    }

    let total = closed.len();
    PRICE_TIERS
        .iter()
        .zip(accs.iter())
        .map(|(&(_, _, label), acc)| TierSummary {
            tier: label.to_string(),
            positions: acc.positions,
            pct_of_total: (total > 0).then(|| {
                Decimal::from(acc.positions as u64) / Decimal::from(total as u64) * dec!(100)
            }),
            win_rate: win_rate_pct(acc.wins, acc.losses),
            realized_pnl: acc.realized_pnl,
        })
        .collect()
}
