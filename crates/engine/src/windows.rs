//! Time-Window Filter — bucket closed positions by resolution timestamp
//!
//! Windows are rolling and measured against an externally supplied reference
//! `now`, so the same snapshot always buckets the same way.

use serde::{Deserialize, Serialize};

use crate::types::Position;

pub const SECONDS_1D: i64 = 86_400;
pub const SECONDS_7D: i64 = 604_800;
pub const SECONDS_30D: i64 = 2_592_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeWindow {
    Day,
    Week,
    Month,
    All,
}

impl TimeWindow {
    /// Report order: shortest window first, all-time last
    pub const ALL: [TimeWindow; 4] = [
        TimeWindow::Day,
        TimeWindow::Week,
        TimeWindow::Month,
        TimeWindow::All,
    ];

    /// Window length in seconds; `None` for all-time
    pub fn seconds(self) -> Option<i64> {
        match self {
            TimeWindow::Day => Some(SECONDS_1D),
            TimeWindow::Week => Some(SECONDS_7D),
            TimeWindow::Month => Some(SECONDS_30D),
            TimeWindow::All => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeWindow::Day => "1D",
            TimeWindow::Week => "7D",
            TimeWindow::Month => "30D",
            TimeWindow::All => "All",
        }
    }

    /// Lower inclusive bound on resolution timestamps, or `None` for all-time
    pub fn cutoff(self, now: i64) -> Option<i64> {
        self.seconds().map(|s| now - s)
    }
}

/// Does a closed position fall inside the window? Positions without a
/// resolution timestamp (open positions) never match a bounded window.
pub fn in_window(position: &Position, window: TimeWindow, now: i64) -> bool {
    match window.cutoff(now) {
        None => true,
        Some(cutoff) => position.resolved_at.is_some_and(|ts| ts >= cutoff),
    }
}

/// Closed positions resolved inside the window
pub fn positions_in_window<'a>(
    closed: &'a [Position],
    window: TimeWindow,
    now: i64,
) -> Vec<&'a Position> {
    closed
        .iter()
        .filter(|p| in_window(p, window, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn closed_at(ts: i64) -> Position {
        Position {
            wallet: "0xabc".into(),
            condition_id: "0xc1".into(),
            title: String::new(),
            outcome: String::new(),
            slug: String::new(),
            avg_price: Decimal::ZERO,
            total_bought: Decimal::ZERO,
            total_sold: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            resolved_at: Some(ts),
            end_date: None,
        }
    }

    #[test]
    fn test_window_membership() {
        let now = 1_700_000_000;
        let positions = vec![
            closed_at(now - 3_600),              // within 1d
            closed_at(now - 3 * SECONDS_1D),     // within 7d
            closed_at(now - 20 * SECONDS_1D),    // within 30d
            closed_at(now - 400 * SECONDS_1D),   // all-time only
        ];

        assert_eq!(positions_in_window(&positions, TimeWindow::Day, now).len(), 1);
        assert_eq!(positions_in_window(&positions, TimeWindow::Week, now).len(), 2);
        assert_eq!(positions_in_window(&positions, TimeWindow::Month, now).len(), 3);
        assert_eq!(positions_in_window(&positions, TimeWindow::All, now).len(), 4);
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let now = 1_700_000_000;
        let boundary = closed_at(now - SECONDS_7D);
        assert!(in_window(&boundary, TimeWindow::Week, now));
        assert!(!in_window(&boundary, TimeWindow::Day, now));
    }

    #[test]
    fn test_open_position_never_in_bounded_window() {
        let now = 1_700_000_000;
        let mut open = closed_at(now);
        open.resolved_at = None;
        assert!(!in_window(&open, TimeWindow::Day, now));
        assert!(in_window(&open, TimeWindow::All, now));
    }
}
