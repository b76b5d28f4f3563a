//! Polymarket Data API client — public endpoints, no authentication required
//!
//! Uses `data-api.polymarket.com` for leaderboard, positions, closed
//! positions, trades, and the markets-traded count. Endpoints that page
//! are fetched with offset pagination until a short page comes back.

use anyhow::Result;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::normalize::{RawLeaderboardEntry, RawPosition, RawTrade};

const BASE_URL: &str = "https://data-api.polymarket.com";

/// Leaderboard time period selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardPeriod {
    Day,
    Week,
    Month,
    All,
}

impl LeaderboardPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            LeaderboardPeriod::Day => "day",
            LeaderboardPeriod::Week => "week",
            LeaderboardPeriod::Month => "month",
            LeaderboardPeriod::All => "all",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TradedResponse {
    traded: Option<u64>,
}

/// Polymarket Data API client
#[derive(Clone)]
pub struct PolymarketDataClient {
    client: Client,
}

impl PolymarketDataClient {
    /// Build a client, optionally routing through an HTTP proxy.
    pub fn new(proxy_url: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder().timeout(std::time::Duration::from_secs(30));
        if let Some(proxy) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> Result<T> {
        let resp = self.client.get(url).query(params).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Polymarket API error {status} for {url}: {body}");
        }
        Ok(resp.json().await?)
    }

    /// Fetch every page of a user-scoped endpoint until a short page returns.
    async fn fetch_paginated<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        wallet: &str,
        limit: usize,
        extra_params: &[(&str, String)],
        max_pages: usize,
    ) -> Result<Vec<T>> {
        let url = format!("{BASE_URL}/{endpoint}");
        let mut all = Vec::new();
        let mut offset = 0usize;

        for page in 0..max_pages {
            let mut params = vec![
                ("user", wallet.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ];
            params.extend(extra_params.iter().cloned());

            let batch: Vec<T> = self.get_json(&url, &params).await?;
            let fetched = batch.len();
            all.extend(batch);
            debug!(wallet, endpoint, page, fetched, "Fetched page");

            if fetched < limit {
                break;
            }
            offset += limit;
        }

        Ok(all)
    }

    /// GET /v1/leaderboard — this wallet's entry for one time period.
    /// Returns `None` when the wallet is not ranked.
    pub async fn get_leaderboard_entry(
        &self,
        wallet: &str,
        period: LeaderboardPeriod,
    ) -> Result<Option<RawLeaderboardEntry>> {
        let url = format!("{BASE_URL}/v1/leaderboard");
        let params = [
            ("user", wallet.to_string()),
            ("timePeriod", period.as_str().to_string()),
        ];
        let entries: Vec<RawLeaderboardEntry> = self.get_json(&url, &params).await?;
        Ok(entries.into_iter().next())
    }

    /// GET /traded — number of distinct markets traded
    pub async fn get_markets_traded(&self, wallet: &str) -> Result<Option<u64>> {
        let url = format!("{BASE_URL}/traded");
        let params = [("user", wallet.to_string())];
        let resp: TradedResponse = self.get_json(&url, &params).await?;
        Ok(resp.traded)
    }

    /// GET /closed-positions — all pages, highest realized PnL first
    pub async fn get_closed_positions(&self, wallet: &str) -> Result<Vec<RawPosition>> {
        self.fetch_paginated(
            "closed-positions",
            wallet,
            50,
            &[
                ("sortBy", "realizedpnl".to_string()),
                ("sortDirection", "DESC".to_string()),
            ],
            10_000,
        )
        .await
    }

    /// GET /positions — all pages of open positions
    pub async fn get_open_positions(&self, wallet: &str) -> Result<Vec<RawPosition>> {
        self.fetch_paginated(
            "positions",
            wallet,
            500,
            &[
                ("sortBy", "CURRENT".to_string()),
                ("sortDirection", "DESC".to_string()),
            ],
            10_000,
        )
        .await
    }

    /// GET /trades — full trade history
    pub async fn get_trades(&self, wallet: &str) -> Result<Vec<RawTrade>> {
        self.fetch_paginated("trades", wallet, 500, &[], 5_000).await
    }

    /// GET /trades, stopping once a page reaches trades at or before
    /// `since_ts`. Used for incremental cache sync; only newer trades are
    /// returned.
    pub async fn get_trades_since(&self, wallet: &str, since_ts: i64) -> Result<Vec<RawTrade>> {
        let url = format!("{BASE_URL}/trades");
        let limit = 500usize;
        let mut all_new = Vec::new();
        let mut offset = 0usize;

        for page in 0..100 {
            let params = [
                ("user", wallet.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ];
            let batch: Vec<RawTrade> = self.get_json(&url, &params).await?;
            let fetched = batch.len();

            let mut new_in_page = 0usize;
            for trade in batch {
                if raw_timestamp(&trade) > since_ts {
                    all_new.push(trade);
                    new_in_page += 1;
                }
            }
            debug!(wallet, page, fetched, new_in_page, "Incremental trades page");

            // Caught up with cached history, or reached the end
            if new_in_page < fetched || fetched < limit {
                break;
            }
            offset += limit;
        }

        Ok(all_new)
    }
}

/// Best-effort timestamp of a raw trade payload; 0 when absent or unparseable
pub fn raw_timestamp(trade: &RawTrade) -> i64 {
    match trade.timestamp.as_ref() {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
