//! poly-wallet-report — PnL analysis reports for Polymarket wallets
//!
//! Usage:
//!   poly-wallet-report run --wallet-file wallets.csv   — Analyze a wallet list
//!   poly-wallet-report wallet 0xabc...                 — Analyze one wallet

mod render;
mod snapshot;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use engine::api::{GammaClient, PolymarketDataClient};
use engine::normalize::MalformedPolicy;
use engine::{analyze_wallet, AnalyzerConfig, MetricBundle, SnapshotSource};
use persistence::repository::{WalletRepository, WalletStatsRecord};
use persistence::Database;
use snapshot::CachedSnapshotSource;

#[derive(Parser)]
#[command(name = "poly-wallet-report")]
#[command(about = "PnL analysis reports for Polymarket wallets", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every wallet in a CSV file
    Run {
        /// CSV file of wallet addresses (first column)
        #[arg(long)]
        wallet_file: PathBuf,
        /// Directory for the CSV report sheets
        #[arg(long, default_value = "reports")]
        output_dir: PathBuf,
        /// Only analyze the first N wallets
        #[arg(long)]
        limit: Option<usize>,
        /// Wallets analyzed concurrently
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        /// SQLite cache path
        #[arg(long, default_value = "data/wallet_cache.db")]
        db: PathBuf,
        /// Skip the SQLite cache and fetch everything fresh
        #[arg(long)]
        no_cache: bool,
        /// Ignore the PROXY_URL environment variable
        #[arg(long)]
        no_proxy: bool,
        /// Abort a wallet on the first malformed record instead of skipping it
        #[arg(long)]
        strict: bool,
    },
    /// Analyze a single wallet
    Wallet {
        /// Wallet address (0x...)
        address: String,
        /// Directory for the CSV report sheets
        #[arg(long, default_value = "reports")]
        output_dir: PathBuf,
        /// SQLite cache path
        #[arg(long, default_value = "data/wallet_cache.db")]
        db: PathBuf,
        /// Skip the SQLite cache and fetch everything fresh
        #[arg(long)]
        no_cache: bool,
        /// Ignore the PROXY_URL environment variable
        #[arg(long)]
        no_proxy: bool,
        /// Abort the wallet on the first malformed record instead of skipping it
        #[arg(long)]
        strict: bool,
    },
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,engine=debug,persistence=debug,poly_wallet_report=debug")
    } else {
        EnvFilter::new("info,engine=info,persistence=info,poly_wallet_report=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

/// First-column wallet addresses from a CSV file, deduplicated in order.
/// Non-address rows (headers, blanks) are skipped.
fn load_wallets(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("read wallet file {}", path.display()))?;

    let mut wallets = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(first) = record.get(0) else { continue };
        let address = first.trim();
        if !address.starts_with("0x") {
            continue;
        }
        let address = address.to_lowercase();
        if !wallets.contains(&address) {
            wallets.push(address);
        }
    }
    Ok(wallets)
}

fn stats_record(bundle: &MetricBundle) -> WalletStatsRecord {
    let r = &bundle.reconciliation;
    WalletStatsRecord {
        wallet: bundle.wallet.clone(),
        user_name: bundle.user_name.clone(),
        rank: bundle.rank,
        total_pnl: bundle.total_pnl.to_string(),
        realized_pnl: bundle.realized_pnl.to_string(),
        unrealized_pnl: bundle.unrealized_pnl.to_string(),
        calculated_total: r.calculated_total.to_string(),
        leaderboard_total: r.leaderboard_total.map(|d| d.to_string()),
        reconcile_delta: r.delta.map(|d| d.to_string()),
        divergent: r.divergent as i64,
        volume: bundle.volume.map(|d| d.to_string()),
        roi_pct: bundle.roi_pct.map(|d| d.to_string()),
        win_rate_pct: bundle.win_rate_pct.map(|d| d.to_string()),
        wins: bundle.wins as i64,
        losses: bundle.losses as i64,
        markets_traded: bundle.markets_traded.map(|n| n as i64),
        total_trades: bundle.total_trades as i64,
        closed_positions: bundle.closed_positions as i64,
        open_positions: bundle.open_positions as i64,
    }
}

struct RunOptions {
    output_dir: PathBuf,
    concurrency: usize,
    db: PathBuf,
    no_cache: bool,
    no_proxy: bool,
    strict: bool,
}

async fn run_analysis(wallets: Vec<String>, opts: RunOptions) -> Result<()> {
    if wallets.is_empty() {
        anyhow::bail!("no wallet addresses to analyze");
    }

    let proxy = if opts.no_proxy {
        None
    } else {
        std::env::var("PROXY_URL").ok()
    };
    if proxy.is_some() {
        info!("Routing API requests through PROXY_URL");
    }

    let data = PolymarketDataClient::new(proxy.as_deref())?;
    let gamma = GammaClient::new(proxy.as_deref())?;
    let db = if opts.no_cache {
        None
    } else {
        Some(Arc::new(Database::new(&opts.db).await?))
    };

    let policy = if opts.strict {
        MalformedPolicy::Abort
    } else {
        MalformedPolicy::Skip
    };
    let source = Arc::new(CachedSnapshotSource::new(data, gamma, db.clone(), policy));
    let config = Arc::new(AnalyzerConfig::default());

    // One reference time for the whole run keeps window cutoffs consistent
    // across wallets.
    let now = Utc::now().timestamp();

    info!(wallets = wallets.len(), concurrency = opts.concurrency, "Starting analysis");

    let semaphore = Arc::new(Semaphore::new(opts.concurrency.max(1)));
    let mut tasks: JoinSet<(String, Result<MetricBundle>)> = JoinSet::new();

    for wallet in wallets {
        let source = Arc::clone(&source);
        let config = Arc::clone(&config);
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        tasks.spawn(async move {
            let _permit = permit;
            let result = source
                .wallet_snapshot(&wallet)
                .await
                .map(|snapshot| analyze_wallet(&snapshot, now, &config));
            (wallet, result)
        });
    }

    let mut bundles = Vec::new();
    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (wallet, result) = joined?;
        match result {
            Ok(bundle) => bundles.push(bundle),
            Err(e) => {
                failed += 1;
                error!(wallet = %wallet, error = %e, "Wallet analysis failed");
            }
        }
    }

    bundles.sort_by(|a, b| b.total_pnl.cmp(&a.total_pnl));

    if let Some(db) = &db {
        let repo = WalletRepository::new(db.pool());
        for bundle in &bundles {
            repo.save_wallet_stats(&stats_record(bundle)).await?;
        }
    }

    render::write_reports(&bundles, &opts.output_dir)?;

    let divergent = bundles.iter().filter(|b| b.reconciliation.divergent).count();
    info!(
        analyzed = bundles.len(),
        failed, divergent, "Analysis complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Run {
            wallet_file,
            output_dir,
            limit,
            concurrency,
            db,
            no_cache,
            no_proxy,
            strict,
        } => {
            let mut wallets = load_wallets(&wallet_file)?;
            if let Some(limit) = limit {
                wallets.truncate(limit);
            }
            run_analysis(
                wallets,
                RunOptions {
                    output_dir,
                    concurrency,
                    db,
                    no_cache,
                    no_proxy,
                    strict,
                },
            )
            .await
        }
        Commands::Wallet {
            address,
            output_dir,
            db,
            no_cache,
            no_proxy,
            strict,
        } => {
            run_analysis(
                vec![address.to_lowercase()],
                RunOptions {
                    output_dir,
                    concurrency: 1,
                    db,
                    no_cache,
                    no_proxy,
                    strict,
                },
            )
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_wallets_skips_headers_and_dedupes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "wallet,label").unwrap();
        writeln!(file, "0xAbC123,whale").unwrap();
        writeln!(file, "0xabc123,dup").unwrap();
        writeln!(file, "").unwrap();
        writeln!(file, "0xdef456").unwrap();
        file.flush().unwrap();

        let wallets = load_wallets(file.path()).unwrap();
        assert_eq!(wallets, vec!["0xabc123".to_string(), "0xdef456".to_string()]);
    }
}
