//! Reconciliation Checker — calculated total vs the leaderboard figure
//!
//! The leaderboard is ground truth but lags and may include fee adjustments
//! not modeled here, so divergence is a monitored signal, not an error. The
//! calculated total is never adjusted to match.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{LeaderboardEntry, Reconciliation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Relative divergence (percent of the leaderboard figure) above which
    /// the discrepancy flag is set
    pub tolerance_pct: Decimal,
    /// Absolute floor: deltas at or below this many dollars never flag,
    /// so near-zero wallets don't trip the relative check
    pub min_delta: Decimal,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            tolerance_pct: dec!(5),
            min_delta: dec!(10),
        }
    }
}

/// delta = calculated − leaderboard. Flags divergence beyond tolerance;
/// never blocks output and never corrects the calculated figure.
pub fn reconcile(
    wallet: &str,
    calculated_total: Decimal,
    leaderboard: Option<&LeaderboardEntry>,
    config: &ReconcileConfig,
) -> Reconciliation {
    let Some(entry) = leaderboard else {
        return Reconciliation {
            calculated_total,
            leaderboard_total: None,
            delta: None,
            delta_pct: None,
            divergent: false,
        };
    };

    let delta = calculated_total - entry.pnl;
    let delta_pct = (entry.pnl != Decimal::ZERO).then(|| delta / entry.pnl.abs() * dec!(100));

    let divergent = delta.abs() > config.min_delta
        && delta_pct.is_none_or(|p| p.abs() > config.tolerance_pct);

    if divergent {
        warn!(
            wallet,
            calculated = %calculated_total,
            leaderboard = %entry.pnl,
            delta = %delta,
            "Calculated PnL diverges from leaderboard beyond tolerance"
        );
    }

    Reconciliation {
        calculated_total,
        leaderboard_total: Some(entry.pnl),
        delta: Some(delta),
        delta_pct,
        divergent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pnl: Decimal) -> LeaderboardEntry {
        LeaderboardEntry {
            wallet: "0xabc".into(),
            user_name: None,
            rank: Some(1),
            pnl,
            volume: dec!(100000),
        }
    }

    #[test]
    fn test_missing_leaderboard_is_not_divergent() {
        let r = reconcile("0xabc", dec!(500), None, &ReconcileConfig::default());
        assert_eq!(r.delta, None);
        assert_eq!(r.delta_pct, None);
        assert!(!r.divergent);
        assert_eq!(r.calculated_total, dec!(500));
    }

    #[test]
    fn test_within_tolerance() {
        let e = entry(dec!(1000));
        let r = reconcile("0xabc", dec!(1030), Some(&e), &ReconcileConfig::default());
        assert_eq!(r.delta, Some(dec!(30)));
        assert_eq!(r.delta_pct, Some(dec!(3)));
        assert!(!r.divergent);
    }

    #[test]
    fn test_beyond_tolerance_flags_but_keeps_figures() {
        let e = entry(dec!(1000));
        let r = reconcile("0xabc", dec!(1200), Some(&e), &ReconcileConfig::default());
        assert_eq!(r.delta, Some(dec!(200)));
        assert_eq!(r.delta_pct, Some(dec!(20)));
        assert!(r.divergent);
        // Calculated figure is surfaced untouched
        assert_eq!(r.calculated_total, dec!(1200));
        assert_eq!(r.leaderboard_total, Some(dec!(1000)));
    }

    #[test]
    fn test_small_absolute_delta_never_flags() {
        // $8 off a $20 leaderboard figure is 40% relative but under the floor
        let e = entry(dec!(20));
        let r = reconcile("0xabc", dec!(28), Some(&e), &ReconcileConfig::default());
        assert!(!r.divergent);
    }

    #[test]
    fn test_zero_leaderboard_uses_absolute_floor() {
        let e = entry(Decimal::ZERO);
        let r = reconcile("0xabc", dec!(11), Some(&e), &ReconcileConfig::default());
        assert_eq!(r.delta_pct, None);
        assert!(r.divergent);

        let r = reconcile("0xabc", dec!(9), Some(&e), &ReconcileConfig::default());
        assert!(!r.divergent);
    }

    #[test]
    fn test_negative_leaderboard_relative_delta() {
        let e = entry(dec!(-1000));
        let r = reconcile("0xabc", dec!(-1030), Some(&e), &ReconcileConfig::default());
        assert_eq!(r.delta, Some(dec!(-30)));
        assert_eq!(r.delta_pct, Some(dec!(-3)));
        assert!(!r.divergent);
    }
}
