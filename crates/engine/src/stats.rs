//! Stats Calculator — volume, ROI, win rate, bet sizing, activity
//!
//! Undefined ratios are `None`, rendered downstream as "N/A". They are never
//! reported as zero, NaN, or infinity.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::types::{Position, Side, Trade};

const HUNDRED: Decimal = dec!(100);

/// Win/loss counts over closed positions. A position with exactly-zero
/// realized PnL is neither a win nor a loss.
pub fn count_wins_losses(closed: &[Position]) -> (usize, usize) {
    let wins = closed.iter().filter(|p| p.realized_pnl > Decimal::ZERO).count();
    let losses = closed.iter().filter(|p| p.realized_pnl < Decimal::ZERO).count();
    (wins, losses)
}

/// wins ÷ (wins + losses) × 100, `None` when no decided positions exist
pub fn win_rate_pct(wins: usize, losses: usize) -> Option<Decimal> {
    let decided = wins + losses;
    if decided == 0 {
        return None;
    }
    Some(Decimal::from(wins as u64) / Decimal::from(decided as u64) * HUNDRED)
}

/// total PnL ÷ volume × 100, `None` when volume is zero or unknown
pub fn roi_pct(total_pnl: Decimal, volume: Option<Decimal>) -> Option<Decimal> {
    match volume {
        Some(v) if v != Decimal::ZERO => Some(total_pnl / v * HUNDRED),
        _ => None,
    }
}

/// volume ÷ (closed + open position count), `None` on a zero denominator
pub fn avg_bet_size(volume: Option<Decimal>, positions: usize) -> Option<Decimal> {
    match volume {
        Some(v) if positions > 0 => Some(v / Decimal::from(positions as u64)),
        _ => None,
    }
}

/// Mean notional per trade (size × price)
pub fn avg_trade_size(trades: &[Trade]) -> Option<Decimal> {
    if trades.is_empty() {
        return None;
    }
    let notional: Decimal = trades.iter().map(|t| t.size * t.price).sum();
    Some(notional / Decimal::from(trades.len() as u64))
}

/// Activity span from first to last trade, floored at one day
pub fn days_active(trades: &[Trade]) -> Option<Decimal> {
    let min = trades.iter().map(|t| t.timestamp).min()?;
    let max = trades.iter().map(|t| t.timestamp).max()?;
    let days = Decimal::from(max - min) / Decimal::from(86_400);
    Some(days.max(Decimal::ONE))
}

pub fn trades_per_day(trades: &[Trade]) -> Option<Decimal> {
    let days = days_active(trades)?;
    Some(Decimal::from(trades.len() as u64) / days)
}

/// Mean minutes between each BUY and the first later SELL on the same market.
/// `None` when no BUY/SELL pair exists.
pub fn avg_hold_minutes(trades: &[Trade]) -> Option<Decimal> {
    let mut by_market: HashMap<&str, (Vec<i64>, Vec<i64>)> = HashMap::new();
    for t in trades {
        let entry = by_market.entry(t.condition_id.as_str()).or_default();
        match t.side {
            Side::Buy => entry.0.push(t.timestamp),
            Side::Sell => entry.1.push(t.timestamp),
        }
    }

    let mut holds: Vec<i64> = Vec::new();
    for (buys, sells) in by_market.values_mut() {
        buys.sort_unstable();
        sells.sort_unstable();
        for &buy in buys.iter() {
            if let Some(&sell) = sells.iter().find(|&&s| s > buy) {
                holds.push(sell - buy);
            }
        }
    }

    if holds.is_empty() {
        return None;
    }
    let total: i64 = holds.iter().sum();
    Some(Decimal::from(total) / Decimal::from(holds.len() as u64) / Decimal::from(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_with_pnl(pnl: Decimal) -> Position {
        Position {
            wallet: "0xabc".into(),
            condition_id: "0xc1".into(),
            title: String::new(),
            outcome: String::new(),
            slug: String::new(),
            avg_price: dec!(0.5),
            total_bought: dec!(100),
            total_sold: Decimal::ZERO,
            realized_pnl: pnl,
            unrealized_pnl: Decimal::ZERO,
            resolved_at: Some(1_700_000_000),
            end_date: None,
        }
    }

    fn trade(cid: &str, side: Side, size: Decimal, price: Decimal, ts: i64) -> Trade {
        Trade {
            wallet: "0xabc".into(),
            condition_id: cid.into(),
            side,
            size,
            price,
            timestamp: ts,
        }
    }

    #[test]
    fn test_zero_pnl_position_neither_win_nor_loss() {
        let closed = vec![
            position_with_pnl(dec!(10)),
            position_with_pnl(dec!(-5)),
            position_with_pnl(Decimal::ZERO),
        ];
        let (wins, losses) = count_wins_losses(&closed);
        assert_eq!((wins, losses), (1, 1));

        let decided = closed
            .iter()
            .filter(|p| p.realized_pnl != Decimal::ZERO)
            .count();
        assert_eq!(wins + losses, decided);
        assert_eq!(win_rate_pct(wins, losses), Some(dec!(50)));
    }

    #[test]
    fn test_win_rate_undefined_with_no_decided_positions() {
        assert_eq!(win_rate_pct(0, 0), None);
        let (wins, losses) = count_wins_losses(&[position_with_pnl(Decimal::ZERO)]);
        assert_eq!(win_rate_pct(wins, losses), None);
    }

    #[test]
    fn test_roi_undefined_on_zero_or_missing_volume() {
        assert_eq!(roi_pct(dec!(50), Some(Decimal::ZERO)), None);
        assert_eq!(roi_pct(dec!(50), None), None);
        assert_eq!(roi_pct(dec!(50), Some(dec!(1000))), Some(dec!(5)));
    }

    #[test]
    fn test_avg_bet_size() {
        assert_eq!(avg_bet_size(Some(dec!(900)), 3), Some(dec!(300)));
        assert_eq!(avg_bet_size(Some(dec!(900)), 0), None);
        assert_eq!(avg_bet_size(None, 3), None);
    }

    #[test]
    fn test_activity_metrics() {
        let trades = vec![
            trade("m1", Side::Buy, dec!(10), dec!(0.5), 1_700_000_000),
            trade("m1", Side::Sell, dec!(10), dec!(0.7), 1_700_000_000 + 2 * 86_400),
        ];
        assert_eq!(days_active(&trades), Some(dec!(2)));
        assert_eq!(trades_per_day(&trades), Some(dec!(1)));
        assert_eq!(avg_trade_size(&trades), Some(dec!(6)));
        assert_eq!(avg_trade_size(&[]), None);
        assert_eq!(days_active(&[]), None);
    }

    #[test]
    fn test_hold_time_pairs_buy_with_next_sell_same_market() {
        let trades = vec![
            trade("m1", Side::Buy, dec!(10), dec!(0.5), 1_000),
            trade("m1", Side::Sell, dec!(10), dec!(0.7), 1_600), // 10 min
            trade("m2", Side::Buy, dec!(10), dec!(0.4), 2_000),
            trade("m2", Side::Sell, dec!(10), dec!(0.6), 3_200), // 20 min
            // sell before the buy on m3 never pairs
            trade("m3", Side::Sell, dec!(5), dec!(0.5), 100),
            trade("m3", Side::Buy, dec!(5), dec!(0.5), 200),
        ];
        assert_eq!(avg_hold_minutes(&trades), Some(dec!(15)));
        assert_eq!(avg_hold_minutes(&[]), None);
    }
}
