//! # Reveal Node
//!
//! Runs a reveal coordinator against in-memory collaborators and a simulated
//! oracle, then drives one demonstration round.
//!
//! ## Wiring
//!
//! ```text
//! RevealCoordinator ──request()──▶ ChannelOracle ──OracleRequest──▶ SimulatedOracle
//!        ▲                                                               │
//!        └──────on_fulfill────── fulfillment listener ◀──Fulfillment─────┘
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`RV_*` environment variables)
//! 2. Initialize telemetry
//! 3. Build collaborators and the coordinator
//! 4. Spawn the simulated oracle and the fulfillment listener
//! 5. Run the demo round, rescuing unanswered items with the owner fallback
//! 6. Shut down
//!
//! ## Demo Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RV_DEMO_POOL` | `100` | Pool size (capped by `RV_MAX_SUPPLY`) |
//! | `RV_DEMO_ITEMS` | `12` | Items to reveal |
//! | `RV_DEMO_SEED` | random | Seed of the simulated oracle |
//! | `RV_DEMO_LATENCY_MS` | `50` | Oracle answer latency |
//! | `RV_DEMO_DROPPED` | `1` | Requests the oracle never answers |

mod oracle_sim;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use reveal_allocator::prelude::*;
use reveal_telemetry::{component_span, init_telemetry, TelemetryConfig};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};

use crate::oracle_sim::SimulatedOracle;

/// Coordinator type run by the node.
pub type NodeCoordinator =
    RevealCoordinator<InMemoryItemRegistry, ChannelOracle, InMemoryItemRegistry, InMemoryEventLog>;

/// Capacity of the fulfillment channel.
const FULFILLMENT_CHANNEL_CAPACITY: usize = 64;

/// Demo round parameters.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Pool size.
    pub pool_size: u64,
    /// Items to reveal.
    pub items: u64,
    /// Oracle seed.
    pub seed: Option<u64>,
    /// Oracle latency.
    pub latency: Duration,
    /// Requests the oracle ignores.
    pub dropped_requests: usize,
    /// How long to wait for the oracle before falling back.
    pub oracle_timeout: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            pool_size: 100,
            items: 12,
            seed: None,
            latency: Duration::from_millis(50),
            dropped_requests: 1,
            oracle_timeout: Duration::from_secs(2),
        }
    }
}

impl DemoConfig {
    /// Load demo parameters from the environment.
    fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = env_number("RV_DEMO_POOL")? {
            config.pool_size = v;
        }
        if let Some(v) = env_number("RV_DEMO_ITEMS")? {
            config.items = v;
        }
        config.seed = env_number("RV_DEMO_SEED")?;
        if let Some(v) = env_number("RV_DEMO_LATENCY_MS")? {
            config.latency = Duration::from_millis(v);
        }
        if let Some(v) = env_number("RV_DEMO_DROPPED")? {
            config.dropped_requests = usize::try_from(v).context("RV_DEMO_DROPPED out of range")?;
        }
        Ok(config)
    }
}

fn env_number(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} must be an unsigned integer, got {v:?}")),
        Err(_) => Ok(None),
    }
}

/// Outcome of a demo round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoReport {
    /// Items revealed by the oracle.
    pub oracle_reveals: u64,
    /// Items revealed by the owner fallback.
    pub owner_reveals: u64,
    /// Indices left in the pool.
    pub pool_remaining: usize,
}

/// The node runtime: coordinator, collaborators and background tasks.
pub struct NodeRuntime {
    /// The reveal coordinator.
    coordinator: Arc<NodeCoordinator>,
    /// Item registry (mirror and minter).
    registry: Arc<InMemoryItemRegistry>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Simulated oracle task.
    oracle_task: JoinHandle<()>,
    /// Fulfillment listener; ends once the oracle task drops its sender.
    listener_task: JoinHandle<ListenerReport>,
}

impl NodeRuntime {
    /// Build the coordinator and spawn the oracle simulation and the
    /// fulfillment listener.
    pub fn start(config: RevealConfig, demo: &DemoConfig) -> Self {
        info!("===========================================");
        info!("  Reveal Node v{}", reveal_allocator::VERSION);
        info!("===========================================");

        let registry = Arc::new(InMemoryItemRegistry::new());
        registry.grant_minter(config.allocator_address);

        let (oracle, requests) = ChannelOracle::new();
        let oracle_address = config.oracle_address;
        let coordinator = Arc::new(RevealCoordinator::new(
            config,
            Arc::clone(&registry),
            Arc::new(oracle),
            Arc::clone(&registry),
            Arc::new(InMemoryEventLog::new()),
        ));

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (fulfillment_tx, fulfillment_rx) = mpsc::channel(FULFILLMENT_CHANNEL_CAPACITY);

        // Simulated oracle. Leaving the select drops `fulfillment_tx`, which
        // stops the listener once it has drained the channel.
        let simulated = SimulatedOracle::new(oracle_address, demo.seed, demo.latency)
            .dropping_first(demo.dropped_requests);
        let oracle_task = tokio::spawn(
            async move {
                tokio::select! {
                    _ = simulated.run(requests, fulfillment_tx) => {}
                    _ = shutdown_rx.changed() => {
                        info!("[oracle] Shutdown signal received");
                    }
                }
            }
            .instrument(component_span!("oracle", component = "simulated-oracle")),
        );

        // Fulfillment listener
        let listener_task = spawn_fulfillment_listener(Arc::clone(&coordinator), fulfillment_rx);

        info!("Background tasks started");
        Self {
            coordinator,
            registry,
            shutdown_tx,
            oracle_task,
            listener_task,
        }
    }

    /// The coordinator.
    pub fn coordinator(&self) -> Arc<NodeCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Initializes the pool, requests reveals in batches, waits for the
    /// oracle, and rescues whatever it left unanswered.
    pub async fn run_demo(&self, demo: &DemoConfig) -> Result<DemoReport> {
        let config = self.coordinator.config().clone();
        let pool_size = demo.pool_size.min(config.max_supply);
        ensure!(demo.items <= pool_size, "cannot reveal {} items from a pool of {pool_size}", demo.items);

        self.coordinator
            .initialize_pool(config.owner, pool_size)
            .await
            .context("pool initialization failed")?;

        let entries: Vec<RevealEntry> = (1..=demo.items)
            .map(|raw| RevealEntry::new(receiver_for(raw), ItemId(raw)))
            .collect();
        let batch_size = config.max_batch_size.min(4);
        for batch in entries.chunks(batch_size) {
            let request_id = self
                .coordinator
                .request_reveal(batch)
                .await
                .context("reveal request failed")?;
            info!(request_id = %request_id, items = batch.len(), "Batch submitted");
        }

        let settled = tokio::time::timeout(demo.oracle_timeout, async {
            while self.coordinator.rolling_count().await > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        if settled.is_err() {
            warn!(
                rolling = self.coordinator.rolling_count().await,
                "Oracle did not answer in time, using owner fallback"
            );
            for entry in &entries {
                if self.coordinator.roll_state(entry.item_id).await.is_rolling() {
                    let index = self
                        .coordinator
                        .reveal_by_owner(config.owner, entry.item_id)
                        .await
                        .with_context(|| format!("owner fallback failed for {}", entry.item_id))?;
                    info!(item = %entry.item_id, index = %index, "Rescued by owner");
                }
            }
        }

        let check = self.coordinator.check_invariants().await;
        ensure!(check.is_valid(), "invariants violated after demo: {check:?}");

        for entry in &entries {
            let raw = self.coordinator.asset_index_raw(entry.item_id).await;
            ensure!(
                raw == self.registry.raw_index(entry.item_id),
                "mirror disagrees for {}",
                entry.item_id
            );
            info!(item = %entry.item_id, index = %raw, "Revealed");
        }

        let stats = self.coordinator.stats().await;
        let report = DemoReport {
            oracle_reveals: stats.items_revealed,
            owner_reveals: stats.owner_reveals,
            pool_remaining: self.coordinator.pool_size().await,
        };
        info!(?report, "Demo round complete");
        Ok(report)
    }

    /// Shutdown the node gracefully.
    ///
    /// Stops the oracle first, then waits for the listener to apply whatever
    /// was already delivered. Returns the listener's totals.
    pub async fn shutdown(self) -> ListenerReport {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        if let Err(e) = self.oracle_task.await {
            error!("[oracle] Task failed: {}", e);
        }

        let report = match self.listener_task.await {
            Ok(report) => {
                info!(?report, "[listener] Finished");
                report
            }
            Err(e) => {
                error!("[listener] Task failed: {}", e);
                ListenerReport::default()
            }
        };

        info!("Shutdown complete");
        report
    }
}

/// Deterministic receiver address for demo item `raw`.
fn receiver_for(raw: u64) -> Address {
    let mut bytes = [0x5au8; 20];
    bytes[12..].copy_from_slice(&raw.to_be_bytes());
    Address::new(bytes)
}

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _telemetry_guard = init_telemetry(&telemetry).context("failed to initialize telemetry")?;

    let config = RevealConfig::from_env().context("invalid reveal configuration")?;
    let demo = DemoConfig::from_env()?;

    let runtime = NodeRuntime::start(config, &demo);
    let result = runtime.run_demo(&demo).await;
    let unanswered = runtime.coordinator().pending_requests().await;
    if !unanswered.is_empty() {
        warn!(requests = unanswered.len(), "Oracle requests never answered");
    }
    let listener = runtime.shutdown().await;

    let report = result?;
    info!(
        oracle = report.oracle_reveals,
        owner = report.owner_reveals,
        remaining = report.pool_remaining,
        fulfillments = listener.applied,
        "Done"
    );
    Ok(())
}
