//! Snapshot assembly — fetch, cache, normalize
//!
//! `CachedSnapshotSource` is the one place that talks to both APIs and the
//! SQLite cache. Trades sync incrementally (only trades newer than the
//! newest cached one are fetched); positions and the leaderboard entry are
//! re-fetched every run since they mutate in place upstream.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use engine::api::polymarket::{raw_timestamp, LeaderboardPeriod};
use engine::api::{GammaClient, PolymarketDataClient};
use engine::normalize::{
    normalize_closed_positions, normalize_leaderboard_entry, normalize_open_positions,
    normalize_trades, MalformedPolicy, RawPosition, RawTrade,
};
use engine::{LeaderboardEntry, SnapshotSource, WalletSnapshot};
use persistence::repository::WalletRepository;
use persistence::Database;

pub struct CachedSnapshotSource {
    data: PolymarketDataClient,
    gamma: GammaClient,
    db: Option<Arc<Database>>,
    policy: MalformedPolicy,
}

impl CachedSnapshotSource {
    pub fn new(
        data: PolymarketDataClient,
        gamma: GammaClient,
        db: Option<Arc<Database>>,
        policy: MalformedPolicy,
    ) -> Self {
        Self {
            data,
            gamma,
            db,
            policy,
        }
    }

    async fn fetch_leaderboard(&self, wallet: &str) -> Result<Option<LeaderboardEntry>> {
        let Some(raw) = self
            .data
            .get_leaderboard_entry(wallet, LeaderboardPeriod::All)
            .await?
        else {
            debug!(wallet, "Wallet not on leaderboard");
            return Ok(None);
        };

        match normalize_leaderboard_entry(wallet, &raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => match self.policy {
                MalformedPolicy::Skip => {
                    warn!(wallet, error = %e, "Skipping malformed leaderboard entry");
                    Ok(None)
                }
                MalformedPolicy::Abort => Err(e.into()),
            },
        }
    }

    /// Full trade history as raw payloads, merging the cache with only the
    /// trades newer than its high-water mark.
    async fn fetch_trades(&self, wallet: &str) -> Result<Vec<RawTrade>> {
        let Some(db) = &self.db else {
            return self.data.get_trades(wallet).await;
        };

        let repo = WalletRepository::new(db.pool());
        repo.upsert_wallet(wallet).await?;

        let new_raws = match repo.last_trade_timestamp(wallet).await? {
            Some(last_ts) => self.data.get_trades_since(wallet, last_ts).await?,
            None => self.data.get_trades(wallet).await?,
        };

        let mut payloads = Vec::with_capacity(new_raws.len());
        for raw in &new_raws {
            let json = serde_json::to_string(raw).context("encode trade payload")?;
            payloads.push((raw_timestamp(raw), json));
        }
        let inserted = repo.save_trades(wallet, &payloads).await?;
        debug!(wallet, fetched = new_raws.len(), inserted, "Trade sync");

        let mut raws = Vec::new();
        for json in repo.cached_trade_payloads(wallet).await? {
            match serde_json::from_str::<RawTrade>(&json) {
                Ok(raw) => raws.push(raw),
                Err(e) => warn!(wallet, error = %e, "Dropping undecodable cached trade"),
            }
        }
        Ok(raws)
    }

    async fn cache_positions(
        &self,
        wallet: &str,
        closed: &[RawPosition],
        open: &[RawPosition],
    ) -> Result<()> {
        let Some(db) = &self.db else {
            return Ok(());
        };
        let repo = WalletRepository::new(db.pool());
        repo.replace_closed_positions(wallet, &position_payloads(closed)?)
            .await?;
        repo.replace_open_positions(wallet, &position_payloads(open)?)
            .await?;
        Ok(())
    }

    /// Tags for one slug: cache first, gamma on miss. Empty tag lists are
    /// cached too so dead slugs are not re-queried every run.
    async fn slug_tags(&self, slug: &str) -> Result<Vec<String>> {
        if let Some(db) = &self.db {
            let repo = WalletRepository::new(db.pool());
            if let Some(tags) = repo.get_market_tags(slug).await? {
                return Ok(tags);
            }
            let tags = match self.gamma.get_market_tags(slug).await {
                Ok(tags) => tags,
                Err(e) => {
                    warn!(slug, error = %e, "Gamma tag lookup failed");
                    return Ok(Vec::new());
                }
            };
            repo.save_market_tags(slug, &tags).await?;
            return Ok(tags);
        }

        match self.gamma.get_market_tags(slug).await {
            Ok(tags) => Ok(tags),
            Err(e) => {
                warn!(slug, error = %e, "Gamma tag lookup failed");
                Ok(Vec::new())
            }
        }
    }

    /// condition_id → category for every market across both position sets.
    /// The first non-"All" tag wins; markets without tags are left out and
    /// fall through to the "Other" bucket downstream.
    async fn build_categories(
        &self,
        positions: &[engine::Position],
    ) -> Result<HashMap<String, String>> {
        let mut by_slug: HashMap<&str, Option<String>> = HashMap::new();
        let mut categories = HashMap::new();

        for pos in positions {
            if pos.slug.is_empty() {
                continue;
            }
            let category = match by_slug.get(pos.slug.as_str()) {
                Some(cached) => cached.clone(),
                None => {
                    let tags = self.slug_tags(&pos.slug).await?;
                    let category = tags.into_iter().next();
                    by_slug.insert(pos.slug.as_str(), category.clone());
                    category
                }
            };
            if let Some(category) = category {
                categories.insert(pos.condition_id.clone(), category);
            }
        }
        Ok(categories)
    }
}

fn position_payloads(raws: &[RawPosition]) -> Result<Vec<(String, String)>> {
    raws.iter()
        .map(|raw| {
            let json = serde_json::to_string(raw).context("encode position payload")?;
            Ok((raw.condition_id.clone().unwrap_or_default(), json))
        })
        .collect()
}

#[async_trait]
impl SnapshotSource for CachedSnapshotSource {
    async fn wallet_snapshot(&self, wallet: &str) -> Result<WalletSnapshot> {
        let leaderboard = self.fetch_leaderboard(wallet).await?;
        let markets_traded = self.data.get_markets_traded(wallet).await?;

        let raw_closed = self.data.get_closed_positions(wallet).await?;
        let raw_open = self.data.get_open_positions(wallet).await?;
        self.cache_positions(wallet, &raw_closed, &raw_open).await?;

        let closed_positions = normalize_closed_positions(wallet, &raw_closed, self.policy)?;
        let open_positions = normalize_open_positions(wallet, &raw_open, self.policy)?;

        let raw_trades = self.fetch_trades(wallet).await?;
        let trades = normalize_trades(wallet, &raw_trades, self.policy)?;

        let mut all_positions = closed_positions.clone();
        all_positions.extend(open_positions.iter().cloned());
        let categories = self.build_categories(&all_positions).await?;

        debug!(
            wallet,
            closed = closed_positions.len(),
            open = open_positions.len(),
            trades = trades.len(),
            "Snapshot assembled"
        );

        Ok(WalletSnapshot {
            wallet: wallet.to_string(),
            closed_positions,
            open_positions,
            trades,
            leaderboard,
            markets_traded,
            categories,
        })
    }
}
