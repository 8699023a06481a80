pub mod connection;
pub mod migrations;
pub mod notified;
pub mod store;
pub mod subscriptions;

pub use connection::{get_db_pool, DatabaseConfig};
pub use store::SqliteStore;
