pub mod models;
pub mod db;
pub mod services;
pub mod utils;
pub mod constants;
pub mod watcher;

pub use utils::config::Config;
pub use db::connection::get_db_pool;

// Re-export common types
pub use sqlx::{Row, SqlitePool};
pub use anyhow::Result;
pub use chrono::{DateTime, Utc};
