//! Database schema definitions

/// SQL to create all tables
/// NOTE: All prices/amounts stored as TEXT to preserve rust_decimal::Decimal precision
pub const CREATE_TABLES: &str = r#"
-- Tracked wallets
CREATE TABLE IF NOT EXISTS wallets (
    wallet TEXT PRIMARY KEY,
    first_seen_at INTEGER DEFAULT (strftime('%s', 'now')),
    last_synced_at INTEGER
);

-- Raw trade payloads, deduplicated by hash for incremental sync
CREATE TABLE IF NOT EXISTS wallet_trades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    wallet TEXT NOT NULL,
    trade_hash TEXT NOT NULL UNIQUE,
    timestamp INTEGER NOT NULL,
    raw_json TEXT NOT NULL,
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- Latest closed-position payloads per wallet (replaced wholesale each sync)
CREATE TABLE IF NOT EXISTS closed_positions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    wallet TEXT NOT NULL,
    condition_id TEXT NOT NULL,
    raw_json TEXT NOT NULL,
    synced_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- Latest open-position payloads per wallet (replaced wholesale each sync)
CREATE TABLE IF NOT EXISTS open_positions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    wallet TEXT NOT NULL,
    condition_id TEXT NOT NULL,
    raw_json TEXT NOT NULL,
    synced_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- Gamma tag labels per market slug
CREATE TABLE IF NOT EXISTS market_tags (
    slug TEXT PRIMARY KEY,
    tags_json TEXT NOT NULL,
    fetched_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- Computed per-wallet stats from the latest run
CREATE TABLE IF NOT EXISTS wallet_stats (
    wallet TEXT PRIMARY KEY,
    user_name TEXT,
    rank INTEGER,
    total_pnl TEXT NOT NULL DEFAULT '0',
    realized_pnl TEXT NOT NULL DEFAULT '0',
    unrealized_pnl TEXT NOT NULL DEFAULT '0',
    calculated_total TEXT NOT NULL DEFAULT '0',
    leaderboard_total TEXT,
    reconcile_delta TEXT,
    divergent INTEGER NOT NULL DEFAULT 0,
    volume TEXT,
    roi_pct TEXT,
    win_rate_pct TEXT,
    wins INTEGER NOT NULL DEFAULT 0,
    losses INTEGER NOT NULL DEFAULT 0,
    markets_traded INTEGER,
    total_trades INTEGER NOT NULL DEFAULT 0,
    closed_positions INTEGER NOT NULL DEFAULT 0,
    open_positions INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- ========== INDEXES ==========

CREATE INDEX IF NOT EXISTS idx_trades_wallet_ts ON wallet_trades(wallet, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_closed_wallet ON closed_positions(wallet);
CREATE INDEX IF NOT EXISTS idx_open_wallet ON open_positions(wallet)
"#;
