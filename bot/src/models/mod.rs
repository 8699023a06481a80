pub mod subscriptions;
pub mod transfers;

pub use subscriptions::{TokenWatch, Wallet, WatchKey, WatchPair};
pub use transfers::{Direction, DirectionFilter, TransferEvent};
