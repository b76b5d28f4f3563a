//! Wallet repository — raw payload cache and computed stats

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, SqlitePool};

/// Computed stats row for one wallet. Decimal figures travel as TEXT.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct WalletStatsRecord {
    pub wallet: String,
    pub user_name: Option<String>,
    pub rank: Option<i64>,
    pub total_pnl: String,
    pub realized_pnl: String,
    pub unrealized_pnl: String,
    pub calculated_total: String,
    pub leaderboard_total: Option<String>,
    pub reconcile_delta: Option<String>,
    pub divergent: i64,
    pub volume: Option<String>,
    pub roi_pct: Option<String>,
    pub win_rate_pct: Option<String>,
    pub wins: i64,
    pub losses: i64,
    pub markets_traded: Option<i64>,
    pub total_trades: i64,
    pub closed_positions: i64,
    pub open_positions: i64,
}

/// Content hash of a raw trade payload, scoped to the wallet
pub fn trade_hash(wallet: &str, raw_json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(wallet.as_bytes());
    hasher.update(b"|");
    hasher.update(raw_json.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Repository for wallet payload caching and stats
pub struct WalletRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> WalletRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a wallet and bump its sync time
    pub async fn upsert_wallet(&self, wallet: &str) -> DbResult<()> {
        sqlx::query(
            r#"INSERT INTO wallets (wallet, last_synced_at)
               VALUES (?1, strftime('%s', 'now'))
               ON CONFLICT(wallet) DO UPDATE SET
                 last_synced_at = strftime('%s', 'now')"#,
        )
        .bind(wallet)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Timestamp of the newest cached trade, if any
    pub async fn last_trade_timestamp(&self, wallet: &str) -> DbResult<Option<i64>> {
        let row: Option<(Option<i64>,)> =
            sqlx::query_as("SELECT MAX(timestamp) FROM wallet_trades WHERE wallet = ?1")
                .bind(wallet)
                .fetch_optional(self.pool)
                .await?;
        Ok(row.and_then(|(ts,)| ts))
    }

    /// All cached trade payloads for a wallet, oldest first
    pub async fn cached_trade_payloads(&self, wallet: &str) -> DbResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT raw_json FROM wallet_trades WHERE wallet = ?1 ORDER BY timestamp ASC",
        )
        .bind(wallet)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(|(json,)| json).collect())
    }

    /// Insert trades with deduplication (INSERT OR IGNORE by trade_hash).
    /// Returns the number of newly inserted trades.
    pub async fn save_trades(&self, wallet: &str, payloads: &[(i64, String)]) -> DbResult<usize> {
        let mut inserted = 0usize;
        for (timestamp, raw_json) in payloads {
            let result = sqlx::query(
                r#"INSERT OR IGNORE INTO wallet_trades (wallet, trade_hash, timestamp, raw_json)
                   VALUES (?1, ?2, ?3, ?4)"#,
            )
            .bind(wallet)
            .bind(trade_hash(wallet, raw_json))
            .bind(timestamp)
            .bind(raw_json)
            .execute(self.pool)
            .await?;

            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Replace all closed-position payloads for a wallet
    pub async fn replace_closed_positions(
        &self,
        wallet: &str,
        payloads: &[(String, String)],
    ) -> DbResult<()> {
        self.replace_positions("closed_positions", wallet, payloads)
            .await
    }

    /// Replace all open-position payloads for a wallet
    pub async fn replace_open_positions(
        &self,
        wallet: &str,
        payloads: &[(String, String)],
    ) -> DbResult<()> {
        self.replace_positions("open_positions", wallet, payloads)
            .await
    }

    async fn replace_positions(
        &self,
        table: &str,
        wallet: &str,
        payloads: &[(String, String)],
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DELETE FROM {table} WHERE wallet = ?1"))
            .bind(wallet)
            .execute(&mut *tx)
            .await?;
        for (condition_id, raw_json) in payloads {
            sqlx::query(&format!(
                "INSERT INTO {table} (wallet, condition_id, raw_json) VALUES (?1, ?2, ?3)"
            ))
            .bind(wallet)
            .bind(condition_id)
            .bind(raw_json)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Cached gamma tags for a market slug, if previously fetched
    pub async fn get_market_tags(&self, slug: &str) -> DbResult<Option<Vec<String>>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT tags_json FROM market_tags WHERE slug = ?1")
                .bind(slug)
                .fetch_optional(self.pool)
                .await?;
        match row {
            Some((json,)) => {
                let tags = serde_json::from_str(&json)
                    .map_err(|e| crate::DbError::Query(format!("bad tags_json for {slug}: {e}")))?;
                Ok(Some(tags))
            }
            None => Ok(None),
        }
    }

    /// Cache gamma tags for a market slug (an empty list is cached too, so
    /// unresolvable slugs are not re-fetched every run)
    pub async fn save_market_tags(&self, slug: &str, tags: &[String]) -> DbResult<()> {
        let json = serde_json::to_string(tags)
            .map_err(|e| crate::DbError::Query(format!("encode tags for {slug}: {e}")))?;
        sqlx::query(
            r#"INSERT INTO market_tags (slug, tags_json, fetched_at)
               VALUES (?1, ?2, strftime('%s', 'now'))
               ON CONFLICT(slug) DO UPDATE SET
                 tags_json = excluded.tags_json,
                 fetched_at = strftime('%s', 'now')"#,
        )
        .bind(slug)
        .bind(json)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Insert or update a wallet's computed stats (upsert by wallet)
    pub async fn save_wallet_stats(&self, record: &WalletStatsRecord) -> DbResult<()> {
        sqlx::query(
            r#"INSERT INTO wallet_stats
                (wallet, user_name, rank, total_pnl, realized_pnl, unrealized_pnl,
                 calculated_total, leaderboard_total, reconcile_delta, divergent,
                 volume, roi_pct, win_rate_pct, wins, losses, markets_traded,
                 total_trades, closed_positions, open_positions, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                       ?16, ?17, ?18, ?19, strftime('%s', 'now'))
               ON CONFLICT(wallet) DO UPDATE SET
                 user_name = excluded.user_name,
                 rank = excluded.rank,
                 total_pnl = excluded.total_pnl,
                 realized_pnl = excluded.realized_pnl,
                 unrealized_pnl = excluded.unrealized_pnl,
                 calculated_total = excluded.calculated_total,
                 leaderboard_total = excluded.leaderboard_total,
                 reconcile_delta = excluded.reconcile_delta,
                 divergent = excluded.divergent,
                 volume = excluded.volume,
                 roi_pct = excluded.roi_pct,
                 win_rate_pct = excluded.win_rate_pct,
                 wins = excluded.wins,
                 losses = excluded.losses,
                 markets_traded = excluded.markets_traded,
                 total_trades = excluded.total_trades,
                 closed_positions = excluded.closed_positions,
                 open_positions = excluded.open_positions,
                 updated_at = strftime('%s', 'now')
            "#,
        )
        .bind(&record.wallet)
        .bind(&record.user_name)
        .bind(record.rank)
        .bind(&record.total_pnl)
        .bind(&record.realized_pnl)
        .bind(&record.unrealized_pnl)
        .bind(&record.calculated_total)
        .bind(&record.leaderboard_total)
        .bind(&record.reconcile_delta)
        .bind(record.divergent)
        .bind(&record.volume)
        .bind(&record.roi_pct)
        .bind(&record.win_rate_pct)
        .bind(record.wins)
        .bind(record.losses)
        .bind(record.markets_traded)
        .bind(record.total_trades)
        .bind(record.closed_positions)
        .bind(record.open_positions)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// All persisted wallet stats, biggest total PnL first
    pub async fn get_all_wallet_stats(&self) -> DbResult<Vec<WalletStatsRecord>> {
        let records = sqlx::query_as::<_, WalletStatsRecord>(
            "SELECT * FROM wallet_stats ORDER BY CAST(total_pnl AS REAL) DESC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(records)
    }
}
