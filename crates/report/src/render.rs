//! CSV report rendering
//!
//! Four sheets per run: a one-row-per-wallet summary plus tier, category,
//! and closed-position detail sheets. Decimals are rounded to cents at this
//! boundary only; undefined metrics render as "N/A", never as zero.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use engine::MetricBundle;

fn fmt(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn fmt_opt(value: Option<Decimal>) -> String {
    value.map(fmt).unwrap_or_else(|| "N/A".to_string())
}

fn window_total(bundle: &MetricBundle, label: &str) -> String {
    bundle
        .windows
        .iter()
        .find(|w| w.window.label() == label)
        .map(|w| fmt(w.total))
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn write_reports(bundles: &[MetricBundle], dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create output dir {}", dir.display()))?;

    write_summary(bundles, &dir.join("summary.csv"))?;
    write_tiers(bundles, &dir.join("tiers.csv"))?;
    write_categories(bundles, &dir.join("categories.csv"))?;
    write_positions(bundles, &dir.join("positions.csv"))?;

    info!(wallets = bundles.len(), dir = %dir.display(), "Reports written");
    Ok(())
}

fn write_summary(bundles: &[MetricBundle], path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record([
        "wallet",
        "username",
        "rank",
        "total_pnl",
        "realized_pnl",
        "unrealized_pnl",
        "pnl_1d",
        "pnl_7d",
        "pnl_30d",
        "pnl_all",
        "volume",
        "roi_pct",
        "win_rate_pct",
        "wins",
        "losses",
        "avg_bet_size",
        "markets_traded",
        "total_trades",
        "closed_positions",
        "open_positions",
        "avg_trade_size",
        "days_active",
        "trades_per_day",
        "avg_hold_minutes",
        "calculated_total",
        "leaderboard_total",
        "reconcile_delta",
        "reconcile_delta_pct",
        "divergent",
    ])?;

    for b in bundles {
        let r = &b.reconciliation;
        w.write_record([
            b.wallet.clone(),
            b.user_name.clone().unwrap_or_default(),
            b.rank.map(|r| r.to_string()).unwrap_or_default(),
            fmt(b.total_pnl),
            fmt(b.realized_pnl),
            fmt(b.unrealized_pnl),
            window_total(b, "1D"),
            window_total(b, "7D"),
            window_total(b, "30D"),
            window_total(b, "All"),
            fmt_opt(b.volume),
            fmt_opt(b.roi_pct),
            fmt_opt(b.win_rate_pct),
            b.wins.to_string(),
            b.losses.to_string(),
            fmt_opt(b.avg_bet_size),
            b.markets_traded.map(|n| n.to_string()).unwrap_or_default(),
            b.total_trades.to_string(),
            b.closed_positions.to_string(),
            b.open_positions.to_string(),
            fmt_opt(b.avg_trade_size),
            fmt_opt(b.days_active),
            fmt_opt(b.trades_per_day),
            fmt_opt(b.avg_hold_minutes),
            fmt(r.calculated_total),
            fmt_opt(r.leaderboard_total),
            fmt_opt(r.delta),
            fmt_opt(r.delta_pct),
            r.divergent.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_tiers(bundles: &[MetricBundle], path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(["wallet", "tier", "positions", "pct_of_total", "win_rate_pct", "realized_pnl"])?;

    for b in bundles {
        for tier in &b.tiers {
            w.write_record([
                b.wallet.clone(),
                tier.tier.to_string(),
                tier.positions.to_string(),
                fmt_opt(tier.pct_of_total),
                fmt_opt(tier.win_rate),
                fmt(tier.realized_pnl),
            ])?;
        }
    }
    w.flush()?;
    Ok(())
}

fn write_categories(bundles: &[MetricBundle], path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(["wallet", "category", "realized_pnl", "volume", "pct_volume"])?;

    for b in bundles {
        for cat in &b.categories {
            w.write_record([
                b.wallet.clone(),
                cat.category.clone(),
                fmt(cat.realized_pnl),
                fmt(cat.volume),
                fmt_opt(cat.pct_volume),
            ])?;
        }
    }
    w.flush()?;
    Ok(())
}

fn write_positions(bundles: &[MetricBundle], path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record([
        "wallet",
        "market",
        "outcome",
        "entry_price",
        "usd_amount",
        "realized_pnl",
        "roi_pct",
        "entry_date",
        "exit_date",
        "category",
    ])?;

    for b in bundles {
        for row in &b.position_rows {
            w.write_record([
                b.wallet.clone(),
                row.market.clone(),
                row.outcome.clone(),
                fmt(row.entry_price),
                fmt(row.usd_amount),
                fmt(row.realized_pnl),
                fmt_opt(row.roi_pct),
                row.entry_date.clone().unwrap_or_default(),
                row.exit_date.clone().unwrap_or_default(),
                row.category.clone(),
            ])?;
        }
    }
    w.flush()?;
    Ok(())
}
