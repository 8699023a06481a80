// =============================================================================
// Tokenwatch Constants
// =============================================================================
// This file contains all constants used throughout the watcher to enable
// easy tuning and configuration from a single location.

// =============================================================================
// EXPLORER API
// =============================================================================

/// Default BscScan-compatible endpoint for token transfer queries
pub const DEFAULT_EXPLORER_API_URL: &str = "https://api.bscscan.com/api";

/// Base URL for the transaction links included in notifications
pub const TX_LINK_BASE: &str = "https://bscscan.com/tx/";

/// How many of the newest transfer events to request per (wallet, token) pair
pub const DEFAULT_MAX_EVENTS_PER_QUERY: u32 = 10;

/// Timeout applied to every outbound HTTP call
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;

// =============================================================================
// TELEGRAM API
// =============================================================================

/// Telegram Bot API host
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

// =============================================================================
// WATCH LOOP CONFIGURATION
// =============================================================================

/// Seconds to sleep between watch cycles
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 15;

/// Concurrent explorer queries allowed within one cycle
pub const DEFAULT_MAX_IN_FLIGHT_REQUESTS: usize = 4;

// =============================================================================
// NOTIFICATION DEDUP
// =============================================================================

/// FIFO cap on remembered transaction hashes per (user, wallet, token) key
pub const DEFAULT_NOTIFIED_SET_CAP: usize = 500;

// =============================================================================
// RATE LIMITING
// =============================================================================

/// Maximum notifications per window per (user, token contract)
pub const DEFAULT_RATE_LIMIT_COUNT: u32 = 10;

/// Rate limit window duration in seconds
pub const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

// =============================================================================
// SUBSCRIPTION LIMITS
// =============================================================================

/// Maximum wallets one user may register
pub const MAX_WALLETS_PER_USER: i64 = 5;

/// Lower bound applied to a new watch when no range is given
pub const DEFAULT_MIN_AMOUNT: f64 = 0.0;

/// Upper bound applied to a new watch when no range is given
pub const DEFAULT_MAX_AMOUNT: f64 = 999_999.0;

// =============================================================================
// DATABASE CONFIGURATION
// =============================================================================

/// SQLite database location when DATABASE_URL is not set
pub const DEFAULT_DATABASE_URL: &str = "sqlite:tokenwatch.db";

/// Default connection pool size
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
