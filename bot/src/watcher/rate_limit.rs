use std::collections::{HashMap, HashSet};
use tokio::time::{Duration, Instant};

/// Sliding-window cap on outbound notifications per (user, token) key.
/// Stale send timestamps are evicted lazily on each check. The window lives
/// only in memory, so a restart starts it empty.
#[derive(Debug)]
pub struct SendWindow {
    sends: HashMap<String, Vec<Instant>>,
    max_sends: u32,
    window: Duration,
}

impl SendWindow {
    pub fn new(max_sends: u32, window: Duration) -> Self {
        Self {
            sends: HashMap::new(),
            max_sends,
            window,
        }
    }

    /// True when another send is allowed for this key right now. A denial is
    /// a deferral: the caller leaves the event unmarked and retries it on a
    /// later cycle.
    pub fn can_send(&mut self, key: &str) -> bool {
        let now = Instant::now();
        let window = self.window;

        let sends = self.sends.entry(key.to_string()).or_default();

        // Drop timestamps that have left the window
        sends.retain(|&time| now.duration_since(time) < window);

        sends.len() < self.max_sends as usize
    }

    /// Records a confirmed send for this key. Failed sends are not recorded,
    /// so they do not consume window budget.
    pub fn record_send(&mut self, key: &str) {
        self.sends
            .entry(key.to_string())
            .or_default()
            .push(Instant::now());
    }

    /// Drops the windows of keys that are no longer subscribed.
    pub fn prune(&mut self, live_keys: &HashSet<String>) {
        self.sends.retain(|key, _| live_keys.contains(key));
    }
}
