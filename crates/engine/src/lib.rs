//! Wallet PnL analysis engine for Polymarket
//!
//! Fetches raw account data from the public Data and Gamma APIs,
//! normalizes it into exact-decimal records, and computes the full
//! metric bundle for a wallet: windowed PnL, price-tier and category
//! breakdowns, trading-behavior stats, and a reconciliation of the
//! calculated total against the leaderboard figure.

pub mod api;
pub mod categories;
pub mod normalize;
pub mod pipeline;
pub mod pnl;
pub mod reconcile;
pub mod stats;
pub mod tiers;
pub mod types;
pub mod windows;

pub use api::{GammaClient, PolymarketDataClient};
pub use normalize::{MalformedPolicy, MalformedRecord};
pub use pipeline::{analyze_wallet, AnalyzerConfig, SnapshotSource};
pub use types::{
    CategorySummary, LeaderboardEntry, MetricBundle, Position, PositionRow, Reconciliation, Side,
    TierSummary, Trade, WalletSnapshot, WindowPnl,
};
pub use windows::TimeWindow;
