pub mod dedup;
pub mod message;
pub mod rate_limit;

use anyhow::Result;
use futures::StreamExt;
use futures::stream;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::models::subscriptions::{WatchKey, WatchPair};
use crate::models::transfers::{DirectionFilter, TransferEvent};
use crate::utils::config::Config;
use self::dedup::NotifiedSet;
use self::rate_limit::SendWindow;

/// Read access to the subscription set and the durable notified ledger.
#[allow(async_fn_in_trait)]
pub trait SubscriptionStore {
    /// Read-only snapshot of every (user, wallet, watch) pair for one cycle.
    async fn snapshot(&self) -> Result<Vec<WatchPair>>;

    /// Persisted notified-sets, oldest hash first per key.
    async fn load_notified_sets(&self) -> Result<HashMap<WatchKey, Vec<String>>>;

    /// Bulk write-back of newly alerted hashes, trimmed to `cap` per key.
    async fn record_notified(
        &self,
        updates: &HashMap<WatchKey, Vec<String>>,
        cap: usize,
    ) -> Result<()>;
}

/// Source of recent token-transfer events, newest first.
#[allow(async_fn_in_trait)]
pub trait TransferSource {
    async fn recent_transfers(
        &self,
        wallet_address: &str,
        token_contract: &str,
        max_results: u32,
    ) -> Result<Vec<TransferEvent>>;
}

/// Delivers one chat message to one user.
#[allow(async_fn_in_trait)]
pub trait AlertSink {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct WatcherSettings {
    pub poll_interval: Duration,
    pub max_events_per_query: u32,
    pub notified_set_cap: usize,
    pub rate_limit_count: u32,
    pub rate_limit_window: Duration,
    pub direction_filter: DirectionFilter,
    pub max_in_flight_requests: usize,
}

impl WatcherSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
            max_events_per_query: config.max_events_per_query,
            notified_set_cap: config.notified_set_cap,
            rate_limit_count: config.rate_limit_count,
            rate_limit_window: Duration::from_secs(config.rate_limit_window_seconds),
            direction_filter: config.direction_filter,
            max_in_flight_requests: config.max_in_flight_requests,
        }
    }
}

/// Counters for one cycle, reported in the per-cycle summary log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleSummary {
    pub pairs_total: usize,
    pub pairs_failed: usize,
    pub events_seen: usize,
    pub sent: usize,
    pub duplicates: usize,
    pub deferred: usize,
    pub send_failures: usize,
}

/// The watch loop core. Walks every subscription on a fixed cadence,
/// queries the explorer per (wallet, token) pair, filters events by amount
/// range and direction, dedups against the notified ledger, applies the
/// per-(user, token) send cap and delivers alerts.
pub struct TransferWatcher<S, E, N> {
    store: S,
    explorer: E,
    notifier: N,
    settings: WatcherSettings,
    notified: HashMap<WatchKey, NotifiedSet>,
    window: SendWindow,
    pending_updates: HashMap<WatchKey, Vec<String>>,
}

impl<S, E, N> TransferWatcher<S, E, N>
where
    S: SubscriptionStore,
    E: TransferSource,
    N: AlertSink,
{
    /// Builds the watcher and warms the dedup ledger from the store.
    pub async fn load(store: S, explorer: E, notifier: N, settings: WatcherSettings) -> Result<Self> {
        let persisted = store.load_notified_sets().await?;
        let cap = settings.notified_set_cap;
        let notified: HashMap<WatchKey, NotifiedSet> = persisted
            .into_iter()
            .map(|(key, hashes)| (key, NotifiedSet::from_hashes(hashes, cap)))
            .collect();

        info!("📒 Loaded {} notified-set(s) from the store", notified.len());

        let window = SendWindow::new(settings.rate_limit_count, settings.rate_limit_window);

        Ok(Self {
            store,
            explorer,
            notifier,
            settings,
            notified,
            window,
            pending_updates: HashMap::new(),
        })
    }

    /// Runs cycles until the shutdown token fires. The sleep starts only
    /// after a cycle has fully finished, ledger write-back included, so two
    /// cycles can never race on the same notified-set.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "🔭 Watch loop starting | polling every {}s",
            self.settings.poll_interval.as_secs()
        );

        let mut cycle_count: usize = 0;

        while !shutdown.is_cancelled() {
            cycle_count += 1;

            match self.run_cycle(&shutdown).await {
                Ok(summary) => {
                    info!(
                        "📊 Cycle {} | pairs {} ({} failed) | events {} | sent {} | dup {} | deferred {}",
                        cycle_count,
                        summary.pairs_total,
                        summary.pairs_failed,
                        summary.events_seen,
                        summary.sent,
                        summary.duplicates,
                        summary.deferred
                    );
                }
                Err(e) => {
                    error!("❌ Cycle {} failed: {:#}", cycle_count, e);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        info!("👋 Watch loop stopped");
        Ok(())
    }

    /// One full pass: snapshot the subscriptions, fan out explorer queries
    /// with bounded concurrency, evaluate the results sequentially, persist
    /// the ledger updates in one batch. A batch that fails to persist is
    /// kept and merged into the next cycle's write-back.
    pub async fn run_cycle(&mut self, shutdown: &CancellationToken) -> Result<CycleSummary> {
        let pairs = self.store.snapshot().await?;
        self.prune_stale_state(&pairs);
        let mut summary = CycleSummary {
            pairs_total: pairs.len(),
            ..Default::default()
        };

        let max_events = self.settings.max_events_per_query;
        let max_in_flight = self.settings.max_in_flight_requests.max(1);

        // Fetch phase: concurrent across pairs, capped by max_in_flight.
        // Evaluation stays sequential so the dedup and rate-limit state is
        // only ever touched from one place.
        let mut results: Vec<(WatchPair, Result<Vec<TransferEvent>>)> =
            Vec::with_capacity(pairs.len());
        {
            let explorer = &self.explorer;
            let mut fetches = stream::iter(pairs)
                .map(|pair| async move {
                    let result = explorer
                        .recent_transfers(
                            &pair.wallet.address,
                            &pair.watch.token_contract,
                            max_events,
                        )
                        .await;
                    (pair, result)
                })
                .buffer_unordered(max_in_flight);

            while let Some(item) = fetches.next().await {
                results.push(item);
                if shutdown.is_cancelled() {
                    break;
                }
            }
        }

        // Carry forward any batch a previous cycle failed to persist
        let mut updates: HashMap<WatchKey, Vec<String>> = std::mem::take(&mut self.pending_updates);

        for (pair, result) in results {
            if shutdown.is_cancelled() {
                debug!("Shutdown requested, finishing cycle early");
                break;
            }

            let events = match result {
                Ok(events) => events,
                Err(e) => {
                    summary.pairs_failed += 1;
                    warn!(
                        "⚠️ Explorer query failed for wallet {} token {}: {:#}",
                        pair.wallet.address, pair.watch.token_contract, e
                    );
                    continue;
                }
            };

            summary.events_seen += events.len();
            self.evaluate_pair(&pair, events, &mut updates, &mut summary)
                .await;
        }

        if !updates.is_empty() {
            if let Err(e) = self
                .store
                .record_notified(&updates, self.settings.notified_set_cap)
                .await
            {
                // Keep the batch so the next cycle retries the write-back;
                // the in-memory sets already hold these hashes
                self.pending_updates = updates;
                return Err(e);
            }
            debug!("💾 Persisted notified updates for {} key(s)", updates.len());
        }

        Ok(summary)
    }

    /// Evaluates one pair's events in explorer order (newest first). Each
    /// event is independent: range filter, direction filter, dedup, rate
    /// limit, then send. A hash is marked notified only after a confirmed
    /// send, so failed sends retry on the next cycle.
    async fn evaluate_pair(
        &mut self,
        pair: &WatchPair,
        events: Vec<TransferEvent>,
        updates: &mut HashMap<WatchKey, Vec<String>>,
        summary: &mut CycleSummary,
    ) {
        let chat_id = pair.chat_id();
        let key = WatchKey::new(chat_id, &pair.wallet.address, &pair.watch.token_contract);
        let rate_key = key.rate_key();
        let cap = self.settings.notified_set_cap;

        for event in events {
            let amount = match event.amount() {
                Ok(amount) => amount,
                Err(e) => {
                    debug!("Skipping event {}: {:#}", event.tx_hash, e);
                    continue;
                }
            };

            if !pair.watch.amount_in_range(amount) {
                continue;
            }

            let direction = event.direction(&pair.wallet.address);
            if !self.settings.direction_filter.allows(direction) {
                continue;
            }

            let notified = self
                .notified
                .entry(key.clone())
                .or_insert_with(|| NotifiedSet::new(cap));
            if notified.contains(&event.tx_hash) {
                summary.duplicates += 1;
                continue;
            }

            if !self.window.can_send(&rate_key) {
                summary.deferred += 1;
                debug!(
                    "⏳ Send cap reached for {}, deferring tx {}",
                    rate_key, event.tx_hash
                );
                continue;
            }

            let text = message::format_alert(
                &pair.wallet,
                &pair.watch,
                direction,
                amount,
                &event.tx_hash,
            );

            match self.notifier.send(chat_id, &text).await {
                Ok(()) => {
                    notified.insert(event.tx_hash.clone());
                    self.window.record_send(&rate_key);
                    updates.entry(key.clone()).or_default().push(event.tx_hash);
                    summary.sent += 1;
                    info!(
                        "🔔 Alerted user {} | {} {} {} | wallet '{}'",
                        chat_id,
                        direction.label(),
                        amount,
                        pair.watch.token_label,
                        pair.wallet.name
                    );
                }
                Err(e) => {
                    summary.send_failures += 1;
                    warn!(
                        "⚠️ Notify failed for user {} (tx {}): {:#} (will retry next cycle)",
                        chat_id, event.tx_hash, e
                    );
                }
            }
        }
    }

    /// Drops dedup, rate-window, and pending write-back state for keys that
    /// left the subscription set.
    fn prune_stale_state(&mut self, pairs: &[WatchPair]) {
        let live: HashSet<WatchKey> = pairs
            .iter()
            .map(|pair| {
                WatchKey::new(
                    pair.chat_id(),
                    &pair.wallet.address,
                    &pair.watch.token_contract,
                )
            })
            .collect();

        self.notified.retain(|key, _| live.contains(key));
        self.pending_updates.retain(|key, _| live.contains(key));

        let live_rate_keys: HashSet<String> = live.iter().map(|key| key.rate_key()).collect();
        self.window.prune(&live_rate_keys);
    }
}
