//! Wallet analysis pipeline
//!
//! Pure computation over one immutable `WalletSnapshot`: no I/O, no locks,
//! no clock reads beyond the supplied reference `now`. Running it twice on
//! the same snapshot with the same `now` yields identical bundles.

use async_trait::async_trait;
use chrono::DateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::categories::{classify_categories, FALLBACK_CATEGORY};
use crate::pnl::{calculated_total, realized_all, unrealized_all, window_breakdown};
use crate::reconcile::{reconcile, ReconcileConfig};
use crate::stats;
use crate::tiers::classify_tiers;
use crate::types::{MetricBundle, PositionRow, Side, Trade, WalletSnapshot};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub reconcile: ReconcileConfig,
}

/// A source of fully-assembled wallet snapshots, injected into the
/// orchestrator. Implementations own fetching and caching; the pipeline
/// itself never talks to a data store.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn wallet_snapshot(&self, wallet: &str) -> anyhow::Result<WalletSnapshot>;
}

/// Earliest BUY timestamp per condition id
fn entry_timestamps(trades: &[Trade]) -> HashMap<&str, i64> {
    let mut entries: HashMap<&str, i64> = HashMap::new();
    for t in trades {
        if t.side != Side::Buy {
            continue;
        }
        entries
            .entry(t.condition_id.as_str())
            .and_modify(|ts| *ts = (*ts).min(t.timestamp))
            .or_insert(t.timestamp);
    }
    entries
}

fn format_date(ts: i64) -> Option<String> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

fn position_rows(snapshot: &WalletSnapshot) -> Vec<PositionRow> {
    let entries = entry_timestamps(&snapshot.trades);

    snapshot
        .closed_positions
        .iter()
        .map(|pos| {
            let usd_amount = pos.usd_amount();
            // end_date is an unvalidated upstream string; get() refuses a
            // slice that is short or lands mid-character
            let exit_date = pos
                .end_date
                .as_deref()
                .and_then(|d| d.get(..10))
                .map(str::to_string)
                .or_else(|| pos.resolved_at.and_then(format_date));
            PositionRow {
                market: pos.title.clone(),
                outcome: pos.outcome.clone(),
                entry_price: pos.avg_price,
                usd_amount,
                realized_pnl: pos.realized_pnl,
                roi_pct: (usd_amount != Decimal::ZERO)
                    .then(|| pos.realized_pnl / usd_amount * dec!(100)),
                entry_date: entries
                    .get(pos.condition_id.as_str())
                    .and_then(|&ts| format_date(ts)),
                exit_date,
                category: snapshot
                    .categories
                    .get(&pos.condition_id)
                    .cloned()
                    .unwrap_or_else(|| FALLBACK_CATEGORY.to_string()),
            }
        })
        .collect()
}

/// Compute the full Metric Bundle for one wallet snapshot.
pub fn analyze_wallet(
    snapshot: &WalletSnapshot,
    now: i64,
    config: &AnalyzerConfig,
) -> MetricBundle {
    let closed = &snapshot.closed_positions;
    let open = &snapshot.open_positions;

    let realized = realized_all(closed, open);
    let unrealized = unrealized_all(open);
    let calculated = calculated_total(closed, open);

    // Downstream stats use the authoritative total when the leaderboard is
    // present, falling back to the calculated total otherwise.
    let total_pnl = snapshot
        .leaderboard
        .as_ref()
        .map_or(calculated, |e| e.pnl);
    let volume = snapshot.leaderboard.as_ref().map(|e| e.volume);

    let (wins, losses) = stats::count_wins_losses(closed);

    let bundle = MetricBundle {
        wallet: snapshot.wallet.clone(),
        user_name: snapshot
            .leaderboard
            .as_ref()
            .and_then(|e| e.user_name.clone()),
        rank: snapshot.leaderboard.as_ref().and_then(|e| e.rank),
        total_pnl,
        realized_pnl: realized,
        unrealized_pnl: unrealized,
        windows: window_breakdown(closed, open, now),
        volume,
        roi_pct: stats::roi_pct(total_pnl, volume),
        win_rate_pct: stats::win_rate_pct(wins, losses),
        wins,
        losses,
        avg_bet_size: stats::avg_bet_size(volume, closed.len() + open.len()),
        markets_traded: snapshot.markets_traded,
        total_trades: snapshot.trades.len(),
        closed_positions: closed.len(),
        open_positions: open.len(),
        avg_trade_size: stats::avg_trade_size(&snapshot.trades),
        days_active: stats::days_active(&snapshot.trades),
        trades_per_day: stats::trades_per_day(&snapshot.trades),
        avg_hold_minutes: stats::avg_hold_minutes(&snapshot.trades),
        tiers: classify_tiers(closed),
        categories: classify_categories(closed, open, &snapshot.categories),
        position_rows: position_rows(snapshot),
        reconciliation: reconcile(
            &snapshot.wallet,
            calculated,
            snapshot.leaderboard.as_ref(),
            &config.reconcile,
        ),
    };

    debug!(
        wallet = %bundle.wallet,
        total_pnl = %bundle.total_pnl,
        realized = %bundle.realized_pnl,
        unrealized = %bundle.unrealized_pnl,
        closed = bundle.closed_positions,
        open = bundle.open_positions,
        "Wallet analysis complete"
    );

    bundle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LeaderboardEntry, Position};
    use crate::windows::TimeWindow;

    fn position(
        cid: &str,
        avg_price: Decimal,
        bought: Decimal,
        realized: Decimal,
        unrealized: Decimal,
        resolved_at: Option<i64>,
    ) -> Position {
        Position {
            wallet: "0xabc".into(),
            condition_id: cid.into(),
            title: format!("Market {cid}"),
            outcome: "Yes".into(),
            slug: format!("market-{cid}"),
            avg_price,
            total_bought: bought,
            total_sold: Decimal::ZERO,
            realized_pnl: realized,
            unrealized_pnl: unrealized,
            resolved_at,
            end_date: None,
        }
    }

    fn trade(cid: &str, side: Side, ts: i64) -> Trade {
        Trade {
            wallet: "0xabc".into(),
            condition_id: cid.into(),
            side,
            size: dec!(100),
            price: dec!(0.4),
            timestamp: ts,
        }
    }

    /// Scenario from the methodology notes: one fully-resolved winner plus
    /// one open position with a partial sell.
    fn scenario_snapshot(now: i64) -> WalletSnapshot {
        // Closed: bought 100 @ $0.40, resolved winning → realized 60
        let closed = vec![position(
            "m1",
            dec!(0.40),
            dec!(100),
            dec!(60),
            Decimal::ZERO,
            Some(now - 1_000),
        )];
        // Open: bought 50 @ $0.50, sold 20 @ $0.70 → realized 4, unrealized 5
        let open = vec![position("m2", dec!(0.50), dec!(50), dec!(4), dec!(5), None)];

        WalletSnapshot {
            wallet: "0xabc".into(),
            closed_positions: closed,
            open_positions: open,
            trades: vec![
                trade("m1", Side::Buy, now - 5_000),
                trade("m2", Side::Buy, now - 4_000),
                trade("m2", Side::Sell, now - 2_000),
            ],
            leaderboard: None,
            markets_traded: Some(2),
            categories: HashMap::from([("m1".to_string(), "Politics".to_string())]),
        }
    }

    #[test]
    fn test_partial_sell_scenario() {
        let now = 1_700_000_000;
        let bundle = analyze_wallet(&scenario_snapshot(now), now, &AnalyzerConfig::default());

        assert_eq!(bundle.realized_pnl, dec!(64));
        assert_eq!(bundle.unrealized_pnl, dec!(5));
        assert_eq!(bundle.reconciliation.calculated_total, dec!(69));
        // No leaderboard entry → calculated total is the reported total
        assert_eq!(bundle.total_pnl, dec!(69));
        assert_eq!(bundle.volume, None);
        assert_eq!(bundle.roi_pct, None);
        assert_eq!(bundle.avg_bet_size, None);
    }

    #[test]
    fn test_realized_plus_unrealized_equals_calculated_total() {
        let now = 1_700_000_000;
        let bundle = analyze_wallet(&scenario_snapshot(now), now, &AnalyzerConfig::default());
        assert_eq!(
            bundle.realized_pnl + bundle.unrealized_pnl,
            bundle.reconciliation.calculated_total
        );
    }

    #[test]
    fn test_idempotence() {
        let now = 1_700_000_000;
        let snapshot = scenario_snapshot(now);
        let config = AnalyzerConfig::default();
        let first = analyze_wallet(&snapshot, now, &config);
        let second = analyze_wallet(&snapshot, now, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn test_authoritative_total_drives_stats() {
        let now = 1_700_000_000;
        let mut snapshot = scenario_snapshot(now);
        snapshot.leaderboard = Some(LeaderboardEntry {
            wallet: "0xabc".into(),
            user_name: Some("trader".into()),
            rank: Some(7),
            pnl: dec!(70),
            volume: dec!(1400),
        });

        let bundle = analyze_wallet(&snapshot, now, &AnalyzerConfig::default());
        assert_eq!(bundle.total_pnl, dec!(70));
        assert_eq!(bundle.roi_pct, Some(dec!(5)));
        // volume / (1 closed + 1 open)
        assert_eq!(bundle.avg_bet_size, Some(dec!(700)));
        // Calculated total still reported independently
        assert_eq!(bundle.reconciliation.calculated_total, dec!(69));
        assert_eq!(bundle.reconciliation.delta, Some(dec!(-1)));
        assert!(!bundle.reconciliation.divergent);
    }

    #[test]
    fn test_windowed_unrealized_is_not_applicable() {
        let now = 1_700_000_000;
        let bundle = analyze_wallet(&scenario_snapshot(now), now, &AnalyzerConfig::default());

        for w in &bundle.windows {
            match w.window {
                TimeWindow::All => assert_eq!(w.unrealized, Some(dec!(5))),
                _ => assert_eq!(w.unrealized, None),
            }
        }
    }

    #[test]
    fn test_position_rows_carry_entry_dates_and_categories() {
        let now = 1_700_000_000;
        let bundle = analyze_wallet(&scenario_snapshot(now), now, &AnalyzerConfig::default());

        assert_eq!(bundle.position_rows.len(), 1);
        let row = &bundle.position_rows[0];
        assert_eq!(row.market, "Market m1");
        assert_eq!(row.category, "Politics");
        // realized 60 on $40 entered → 150%
        assert_eq!(row.usd_amount, dec!(40));
        assert_eq!(row.roi_pct, Some(dec!(150)));
        assert!(row.entry_date.is_some());
        assert!(row.exit_date.is_some());
    }

    #[test]
    fn test_exit_date_tolerates_malformed_end_date() {
        let now = 1_700_000_000;
        let mut snapshot = scenario_snapshot(now);
        // Multibyte character straddling byte 10 must not panic the slice;
        // the row falls back to the resolution date
        snapshot.closed_positions[0].end_date = Some("012345678é rest".into());

        let bundle = analyze_wallet(&snapshot, now, &AnalyzerConfig::default());
        assert_eq!(
            bundle.position_rows[0].exit_date,
            format_date(now - 1_000)
        );

        // Short strings fall back the same way
        snapshot.closed_positions[0].end_date = Some("2026".into());
        let bundle = analyze_wallet(&snapshot, now, &AnalyzerConfig::default());
        assert_eq!(
            bundle.position_rows[0].exit_date,
            format_date(now - 1_000)
        );

        // A well-formed date is still truncated to its day
        snapshot.closed_positions[0].end_date = Some("2026-11-05T00:00:00Z".into());
        let bundle = analyze_wallet(&snapshot, now, &AnalyzerConfig::default());
        assert_eq!(bundle.position_rows[0].exit_date.as_deref(), Some("2026-11-05"));
    }

    #[test]
    fn test_empty_wallet_reports_na_not_zero_division() {
        let snapshot = WalletSnapshot {
            wallet: "0xempty".into(),
            closed_positions: vec![],
            open_positions: vec![],
            trades: vec![],
            leaderboard: None,
            markets_traded: None,
            categories: HashMap::new(),
        };
        let bundle = analyze_wallet(&snapshot, 1_700_000_000, &AnalyzerConfig::default());

        assert_eq!(bundle.total_pnl, Decimal::ZERO);
        assert_eq!(bundle.roi_pct, None);
        assert_eq!(bundle.win_rate_pct, None);
        assert_eq!(bundle.avg_bet_size, None);
        assert_eq!(bundle.avg_trade_size, None);
        assert!(bundle.categories.is_empty());
    }
}
