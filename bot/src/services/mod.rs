pub mod explorer;
pub mod telegram;

pub use explorer::{ExplorerClient, ExplorerError};
pub use telegram::{NotifyError, TelegramNotifier};
