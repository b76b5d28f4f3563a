//! Types for wallet PnL analysis
//!
//! All monetary and share quantities use `rust_decimal::Decimal` so large
//! summations stay exact. Timestamps are integer seconds since epoch.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

/// A normalized position, closed or open.
///
/// Invariant: a closed position (`resolved_at` set) always carries a zero
/// `unrealized_pnl`. An open position may carry a non-zero `realized_pnl`
/// from partial sells alongside its unrealized component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub wallet: String,
    pub condition_id: String,
    pub title: String,
    pub outcome: String,
    pub slug: String,
    /// Average entry price, fractional 0–1
    pub avg_price: Decimal,
    /// Total shares bought
    pub total_bought: Decimal,
    /// Total shares sold (zero for a fully-open position)
    pub total_sold: Decimal,
    pub realized_pnl: Decimal,
    /// Mark-to-market PnL on shares still held; zero once fully closed
    pub unrealized_pnl: Decimal,
    /// Resolution timestamp; `None` for an open position
    pub resolved_at: Option<i64>,
    /// Market end date as reported upstream (e.g. "2026-11-05T00:00:00Z")
    pub end_date: Option<String>,
}

impl Position {
    pub fn is_closed(&self) -> bool {
        self.resolved_at.is_some()
    }

    /// USD entered into the position: avg entry price × shares bought
    pub fn usd_amount(&self) -> Decimal {
        self.avg_price * self.total_bought
    }
}

/// A normalized trade. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub wallet: String,
    pub condition_id: String,
    pub side: Side,
    pub size: Decimal,
    pub price: Decimal,
    pub timestamp: i64,
}

/// Authoritative leaderboard figures for a wallet, as of fetch time.
/// Ground truth for reconciliation; never recomputed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub wallet: String,
    pub user_name: Option<String>,
    pub rank: Option<i64>,
    pub pnl: Decimal,
    pub volume: Decimal,
}

/// Immutable input to the pipeline: one wallet's fully-assembled records.
///
/// The core never owns raw-record storage. Each snapshot must be complete
/// before it is handed in; partial or concurrently-mutating collections are
/// not a supported input state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub wallet: String,
    pub closed_positions: Vec<Position>,
    pub open_positions: Vec<Position>,
    pub trades: Vec<Trade>,
    pub leaderboard: Option<LeaderboardEntry>,
    /// Markets traded, as counted upstream (not recomputed)
    pub markets_traded: Option<u64>,
    /// condition_id → category tag; misses fall back to "Other"
    pub categories: HashMap<String, String>,
}

/// Realized/unrealized breakdown for one time window.
///
/// Bounded windows report `unrealized: None` — unrealized PnL is a
/// point-in-time snapshot and only exists at the all-time granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowPnl {
    pub window: crate::windows::TimeWindow,
    pub realized: Decimal,
    pub unrealized: Option<Decimal>,
    pub total: Decimal,
    pub positions: usize,
}

/// Per-price-tier breakdown of closed positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSummary {
    pub tier: String,
    pub positions: usize,
    pub pct_of_total: Option<Decimal>,
    pub win_rate: Option<Decimal>,
    pub realized_pnl: Decimal,
}

/// Per-category breakdown across closed and open positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub realized_pnl: Decimal,
    pub volume: Decimal,
    pub pct_volume: Option<Decimal>,
}

/// Cross-check of the calculated total against the leaderboard figure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub calculated_total: Decimal,
    pub leaderboard_total: Option<Decimal>,
    /// calculated − leaderboard
    pub delta: Option<Decimal>,
    /// delta as a percentage of the leaderboard figure
    pub delta_pct: Option<Decimal>,
    /// Warning flag: delta exceeds tolerance. Never blocks output.
    pub divergent: bool,
}

/// One closed position formatted for the report detail sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRow {
    pub market: String,
    pub outcome: String,
    pub entry_price: Decimal,
    pub usd_amount: Decimal,
    pub realized_pnl: Decimal,
    pub roi_pct: Option<Decimal>,
    /// Earliest BUY date for the market ("YYYY-MM-DD"), when trades cover it
    pub entry_date: Option<String>,
    pub exit_date: Option<String>,
    pub category: String,
}

/// Output of the pipeline: every derived metric for one wallet snapshot.
///
/// Derived fresh on each computation; two runs over the same snapshot with
/// the same reference `now` produce identical bundles. `None` means a metric
/// is undefined (zero denominator / missing leaderboard), never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBundle {
    pub wallet: String,
    pub user_name: Option<String>,
    pub rank: Option<i64>,

    /// Authoritative leaderboard PnL when present, else the calculated total
    pub total_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    /// 1D / 7D / 30D / All, in that order
    pub windows: Vec<WindowPnl>,

    pub volume: Option<Decimal>,
    pub roi_pct: Option<Decimal>,
    pub win_rate_pct: Option<Decimal>,
    pub wins: usize,
    pub losses: usize,
    pub avg_bet_size: Option<Decimal>,
    pub markets_traded: Option<u64>,
    pub total_trades: usize,
    pub closed_positions: usize,
    pub open_positions: usize,

    pub avg_trade_size: Option<Decimal>,
    pub days_active: Option<Decimal>,
    pub trades_per_day: Option<Decimal>,
    pub avg_hold_minutes: Option<Decimal>,

    pub tiers: Vec<TierSummary>,
    /// Sorted by descending realized PnL
    pub categories: Vec<CategorySummary>,
    pub position_rows: Vec<PositionRow>,

    pub reconciliation: Reconciliation,
}
