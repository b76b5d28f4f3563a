//! PnL Aggregator — realized, unrealized, and total PnL per time window
//!
//! Realized PnL keys off resolution timestamps, so bounded windows only see
//! closed positions. Open positions have no resolution timestamp yet: their
//! realized components (partial sells) count toward the all-time figure only,
//! and their cash PnL is the all-time unrealized figure. All sums are exact
//! decimal with no intermediate rounding.

use rust_decimal::Decimal;

use crate::types::{Position, WindowPnl};
use crate::windows::{positions_in_window, TimeWindow};

/// Realized PnL and position count over closed positions in a window
pub fn realized_in_window(closed: &[Position], window: TimeWindow, now: i64) -> (Decimal, usize) {
    let in_window = positions_in_window(closed, window, now);
    let realized = in_window.iter().map(|p| p.realized_pnl).sum();
    (realized, in_window.len())
}

/// All-time realized PnL: every closed position plus the realized components
/// of open positions
pub fn realized_all(closed: &[Position], open: &[Position]) -> Decimal {
    let from_closed: Decimal = closed.iter().map(|p| p.realized_pnl).sum();
    let from_open: Decimal = open.iter().map(|p| p.realized_pnl).sum();
    from_closed + from_open
}

/// All-time unrealized PnL: sum of open-position cash PnL
pub fn unrealized_all(open: &[Position]) -> Decimal {
    open.iter().map(|p| p.unrealized_pnl).sum()
}

/// Calculated total = realized (all-time) + unrealized (all-time).
/// An independent cross-check against the leaderboard figure, not a
/// substitute for it.
pub fn calculated_total(closed: &[Position], open: &[Position]) -> Decimal {
    realized_all(closed, open) + unrealized_all(open)
}

/// PnL breakdown for every reporting window, in `TimeWindow::ALL` order.
///
/// Bounded windows carry `unrealized: None` — there is no historical
/// unrealized snapshot to report, and zero would imply one exists.
pub fn window_breakdown(closed: &[Position], open: &[Position], now: i64) -> Vec<WindowPnl> {
    TimeWindow::ALL
        .iter()
        .map(|&window| match window {
            TimeWindow::All => {
                let realized = realized_all(closed, open);
                let unrealized = unrealized_all(open);
                WindowPnl {
                    window,
                    realized,
                    unrealized: Some(unrealized),
                    total: realized + unrealized,
                    positions: closed.len(),
                }
            }
            bounded => {
                let (realized, positions) = realized_in_window(closed, bounded, now);
                WindowPnl {
                    window,
                    realized,
                    unrealized: None,
                    total: realized,
                    positions,
                }
            }
        })
        .collect()
}
