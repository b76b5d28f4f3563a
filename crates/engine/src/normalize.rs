//! Record Normalizer — strict boundary between raw API payloads and the core
//!
//! The data-api is loose with numeric types: the same field arrives as a JSON
//! number on one page and a string on the next. Everything is converted to
//! `Decimal` / epoch seconds here, before any aggregation. A missing or
//! unparseable required field is a `MalformedRecord` — never a silent zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::types::{LeaderboardEntry, Position, Side, Trade};

/// A raw record failed normalization
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {record} record: {reason}")]
pub struct MalformedRecord {
    pub record: &'static str,
    pub reason: String,
}

impl MalformedRecord {
    fn missing(record: &'static str, field: &'static str) -> Self {
        Self {
            record,
            reason: format!("missing required field `{field}`"),
        }
    }

    fn non_numeric(record: &'static str, field: &'static str, value: &Value) -> Self {
        Self {
            record,
            reason: format!("field `{field}` is not numeric: {value}"),
        }
    }
}

/// What to do with a record that fails normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Log and drop the record, keep the rest of the wallet
    Skip,
    /// Propagate the error and abort the wallet
    Abort,
}

// ---------------------------------------------------------------------------
// Raw deserialization structs (data-api field names)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPosition {
    pub proxy_wallet: Option<String>,
    pub condition_id: Option<String>,
    pub title: Option<String>,
    pub outcome: Option<String>,
    pub slug: Option<String>,
    pub avg_price: Option<Value>,
    pub total_bought: Option<Value>,
    pub total_sold: Option<Value>,
    pub realized_pnl: Option<Value>,
    pub cash_pnl: Option<Value>,
    /// Resolution timestamp (closed positions only)
    pub timestamp: Option<Value>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTrade {
    pub proxy_wallet: Option<String>,
    pub condition_id: Option<String>,
    pub side: Option<String>,
    pub size: Option<Value>,
    pub price: Option<Value>,
    pub timestamp: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLeaderboardEntry {
    pub proxy_wallet: Option<String>,
    pub user_name: Option<String>,
    pub rank: Option<Value>,
    pub pnl: Option<Value>,
    pub vol: Option<Value>,
}

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let s = n.to_string();
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .ok()
        }
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        _ => None,
    }
}

fn require_decimal(
    record: &'static str,
    field: &'static str,
    value: Option<&Value>,
) -> Result<Decimal, MalformedRecord> {
    let value = value.ok_or_else(|| MalformedRecord::missing(record, field))?;
    parse_decimal(value).ok_or_else(|| MalformedRecord::non_numeric(record, field, value))
}

fn require_timestamp(
    record: &'static str,
    field: &'static str,
    value: Option<&Value>,
) -> Result<i64, MalformedRecord> {
    let value = value.ok_or_else(|| MalformedRecord::missing(record, field))?;
    let ts = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    ts.ok_or_else(|| MalformedRecord::non_numeric(record, field, value))
}

fn require_str(
    record: &'static str,
    field: &'static str,
    value: Option<&String>,
) -> Result<String, MalformedRecord> {
    match value {
        Some(s) if !s.is_empty() => Ok(s.clone()),
        _ => Err(MalformedRecord::missing(record, field)),
    }
}

// ---------------------------------------------------------------------------
// Normalizers
// ---------------------------------------------------------------------------

/// Normalize one closed position. Closed positions carry no unrealized
/// component; it is pinned to zero here.
pub fn normalize_closed_position(
    wallet: &str,
    raw: &RawPosition,
) -> Result<Position, MalformedRecord> {
    const RECORD: &str = "closed position";
    Ok(Position {
        wallet: wallet.to_string(),
        condition_id: require_str(RECORD, "conditionId", raw.condition_id.as_ref())?,
        title: raw.title.clone().unwrap_or_default(),
        outcome: raw.outcome.clone().unwrap_or_default(),
        slug: raw.slug.clone().unwrap_or_default(),
        avg_price: require_decimal(RECORD, "avgPrice", raw.avg_price.as_ref())?,
        total_bought: require_decimal(RECORD, "totalBought", raw.total_bought.as_ref())?,
        total_sold: raw
            .total_sold
            .as_ref()
            .and_then(parse_decimal)
            .unwrap_or(Decimal::ZERO),
        realized_pnl: require_decimal(RECORD, "realizedPnl", raw.realized_pnl.as_ref())?,
        unrealized_pnl: Decimal::ZERO,
        resolved_at: Some(require_timestamp(RECORD, "timestamp", raw.timestamp.as_ref())?),
        end_date: raw.end_date.clone(),
    })
}

/// Normalize one open position. `realizedPnl` may be non-zero from partial
/// sells; `cashPnl` is the unrealized component and is required.
pub fn normalize_open_position(
    wallet: &str,
    raw: &RawPosition,
) -> Result<Position, MalformedRecord> {
    const RECORD: &str = "open position";
    Ok(Position {
        wallet: wallet.to_string(),
        condition_id: require_str(RECORD, "conditionId", raw.condition_id.as_ref())?,
        title: raw.title.clone().unwrap_or_default(),
        outcome: raw.outcome.clone().unwrap_or_default(),
        slug: raw.slug.clone().unwrap_or_default(),
        avg_price: require_decimal(RECORD, "avgPrice", raw.avg_price.as_ref())?,
        total_bought: require_decimal(RECORD, "totalBought", raw.total_bought.as_ref())?,
        total_sold: raw
            .total_sold
            .as_ref()
            .and_then(parse_decimal)
            .unwrap_or(Decimal::ZERO),
        realized_pnl: raw
            .realized_pnl
            .as_ref()
            .and_then(parse_decimal)
            .unwrap_or(Decimal::ZERO),
        unrealized_pnl: require_decimal(RECORD, "cashPnl", raw.cash_pnl.as_ref())?,
        resolved_at: None,
        end_date: raw.end_date.clone(),
    })
}

pub fn normalize_trade(wallet: &str, raw: &RawTrade) -> Result<Trade, MalformedRecord> {
    const RECORD: &str = "trade";
    let side = match raw.side.as_deref() {
        Some("BUY") => Side::Buy,
        Some("SELL") => Side::Sell,
        Some(other) => {
            return Err(MalformedRecord {
                record: RECORD,
                reason: format!("unknown side `{other}`"),
            })
        }
        None => return Err(MalformedRecord::missing(RECORD, "side")),
    };
    Ok(Trade {
        wallet: wallet.to_string(),
        condition_id: require_str(RECORD, "conditionId", raw.condition_id.as_ref())?,
        side,
        size: require_decimal(RECORD, "size", raw.size.as_ref())?,
        price: require_decimal(RECORD, "price", raw.price.as_ref())?,
        timestamp: require_timestamp(RECORD, "timestamp", raw.timestamp.as_ref())?,
    })
}

pub fn normalize_leaderboard_entry(
    wallet: &str,
    raw: &RawLeaderboardEntry,
) -> Result<LeaderboardEntry, MalformedRecord> {
    const RECORD: &str = "leaderboard";
    Ok(LeaderboardEntry {
        wallet: wallet.to_string(),
        user_name: raw.user_name.clone(),
        rank: raw.rank.as_ref().and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }),
        pnl: require_decimal(RECORD, "pnl", raw.pnl.as_ref())?,
        volume: require_decimal(RECORD, "vol", raw.vol.as_ref())?,
    })
}

/// Apply a per-record normalizer to a batch under the given policy
fn normalize_batch<R, T>(
    wallet: &str,
    raws: &[R],
    policy: MalformedPolicy,
    normalize: impl Fn(&str, &R) -> Result<T, MalformedRecord>,
) -> Result<Vec<T>, MalformedRecord> {
    let mut out = Vec::with_capacity(raws.len());
    for raw in raws {
        match normalize(wallet, raw) {
            Ok(record) => out.push(record),
            Err(e) => match policy {
                MalformedPolicy::Skip => warn!(wallet, error = %e, "Skipping malformed record"),
                MalformedPolicy::Abort => return Err(e),
            },
        }
    }
    Ok(out)
}

pub fn normalize_closed_positions(
    wallet: &str,
    raws: &[RawPosition],
    policy: MalformedPolicy,
) -> Result<Vec<Position>, MalformedRecord> {
    normalize_batch(wallet, raws, policy, normalize_closed_position)
}

pub fn normalize_open_positions(
    wallet: &str,
    raws: &[RawPosition],
    policy: MalformedPolicy,
) -> Result<Vec<Position>, MalformedRecord> {
    normalize_batch(wallet, raws, policy, normalize_open_position)
}

pub fn normalize_trades(
    wallet: &str,
    raws: &[RawTrade],
    policy: MalformedPolicy,
) -> Result<Vec<Trade>, MalformedRecord> {
    normalize_batch(wallet, raws, policy, normalize_trade)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn raw_closed(avg_price: Value, realized: Value, ts: Value) -> RawPosition {
        RawPosition {
            condition_id: Some("0xc1".into()),
            title: Some("Test Market".into()),
            outcome: Some("Yes".into()),
            slug: Some("test-market".into()),
            avg_price: Some(avg_price),
            total_bought: Some(json!(100)),
            total_sold: Some(json!(0)),
            realized_pnl: Some(realized),
            timestamp: Some(ts),
            ..Default::default()
        }
    }

    #[test]
    fn test_closed_position_numeric_fields() {
        let raw = raw_closed(json!(0.4), json!(60.0), json!(1_700_000_000));
        let pos = normalize_closed_position("0xabc", &raw).unwrap();
        assert_eq!(pos.avg_price, dec!(0.4));
        assert_eq!(pos.realized_pnl, dec!(60));
        assert_eq!(pos.resolved_at, Some(1_700_000_000));
        assert_eq!(pos.unrealized_pnl, Decimal::ZERO);
        assert!(pos.is_closed());
    }

    #[test]
    fn test_string_encoded_numbers_accepted() {
        let raw = raw_closed(json!("0.40"), json!("-12.5"), json!("1700000000"));
        let pos = normalize_closed_position("0xabc", &raw).unwrap();
        assert_eq!(pos.avg_price, dec!(0.40));
        assert_eq!(pos.realized_pnl, dec!(-12.5));
        assert_eq!(pos.resolved_at, Some(1_700_000_000));
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        let mut raw = raw_closed(json!(0.4), json!(60.0), json!(1_700_000_000));
        raw.realized_pnl = None;
        let err = normalize_closed_position("0xabc", &raw).unwrap_err();
        assert!(err.to_string().contains("realizedPnl"));
    }

    #[test]
    fn test_non_numeric_field_is_malformed_not_zero() {
        let raw = raw_closed(json!("n/a"), json!(60.0), json!(1_700_000_000));
        assert!(normalize_closed_position("0xabc", &raw).is_err());
    }

    #[test]
    fn test_open_position_requires_cash_pnl() {
        let raw = RawPosition {
            condition_id: Some("0xc2".into()),
            avg_price: Some(json!(0.5)),
            total_bought: Some(json!(50)),
            realized_pnl: Some(json!(4.0)),
            cash_pnl: Some(json!(5.0)),
            ..Default::default()
        };
        let pos = normalize_open_position("0xabc", &raw).unwrap();
        assert_eq!(pos.realized_pnl, dec!(4));
        assert_eq!(pos.unrealized_pnl, dec!(5));
        assert!(pos.resolved_at.is_none());

        let raw = RawPosition {
            cash_pnl: None,
            ..raw
        };
        assert!(normalize_open_position("0xabc", &raw).is_err());
    }

    #[test]
    fn test_trade_side_parsing() {
        let raw = RawTrade {
            condition_id: Some("0xc1".into()),
            side: Some("BUY".into()),
            size: Some(json!(25)),
            price: Some(json!(0.6)),
            timestamp: Some(json!(1_700_000_100)),
            ..Default::default()
        };
        let trade = normalize_trade("0xabc", &raw).unwrap();
        assert_eq!(trade.side, Side::Buy);

        let bad = RawTrade {
            side: Some("HOLD".into()),
            ..raw
        };
        assert!(normalize_trade("0xabc", &bad).is_err());
    }

    #[test]
    fn test_skip_policy_drops_only_bad_records() {
        let good = raw_closed(json!(0.4), json!(60.0), json!(1_700_000_000));
        let mut bad = good.clone();
        bad.avg_price = Some(json!({"nested": true}));

        let out =
            normalize_closed_positions("0xabc", &[good.clone(), bad.clone()], MalformedPolicy::Skip)
                .unwrap();
        assert_eq!(out.len(), 1);

        let err = normalize_closed_positions("0xabc", &[good, bad], MalformedPolicy::Abort);
        assert!(err.is_err());
    }

    #[test]
    fn test_leaderboard_entry() {
        let raw = RawLeaderboardEntry {
            proxy_wallet: Some("0xabc".into()),
            user_name: Some("trader".into()),
            rank: Some(json!(42)),
            pnl: Some(json!(12345.67)),
            vol: Some(json!("99000.5")),
        };
        let entry = normalize_leaderboard_entry("0xabc", &raw).unwrap();
        assert_eq!(entry.rank, Some(42));
        assert_eq!(entry.pnl, dec!(12345.67));
        assert_eq!(entry.volume, dec!(99000.5));
    }
}
