// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Periodic block-height polling.
//!
//! The poller runs independently of traffic. Each tick fetches the chain
//! height and appends a [`BlockHeightSnapshot`] only when the height differs
//! from the latest stored one. Gateway and store failures end the tick with a
//! warning; the next tick runs on schedule.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn, Instrument, Span};

use crate::cache::{BlockHeightSnapshot, CacheStore};
use crate::config::constants::DEFAULT_POLL_INTERVAL;
use crate::gateway::ContractGateway;
use crate::tracing::spans;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The height matched the latest snapshot; nothing was written
    Unchanged(u64),
    /// A new snapshot with this height was appended
    Updated(u64),
    /// The gateway or the store failed; the error was logged
    Failed,
}

/// Appends block-height snapshots on a fixed interval.
pub struct BlockHeightPoller {
    gateway: Arc<dyn ContractGateway>,
    store: Arc<dyn CacheStore>,
    interval: Duration,
}

impl BlockHeightPoller {
    /// Creates a poller with the default 10 second interval.
    pub fn new(gateway: Arc<dyn ContractGateway>, store: Arc<dyn CacheStore>) -> Self {
        Self {
            gateway,
            store,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the interval between ticks.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// The interval between ticks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one fetch-compare-append cycle.
    pub async fn tick(&self) -> TickOutcome {
        async {
            let height = match self.gateway.block_number().await {
                Ok(height) => height,
                Err(e) => {
                    warn!(error = %e, "Failed to fetch block number");
                    return TickOutcome::Failed;
                }
            };
            Span::current().record("height", height);

            let latest = match self.store.latest_snapshot().await {
                Ok(latest) => latest,
                Err(e) => {
                    warn!(error = %e, "Failed to read latest block-height snapshot");
                    return TickOutcome::Failed;
                }
            };

            if latest.is_some_and(|snapshot| snapshot.height == height) {
                debug!(height, "Block height unchanged");
                return TickOutcome::Unchanged(height);
            }

            match self
                .store
                .append_snapshot(BlockHeightSnapshot::new(height))
                .await
            {
                Ok(()) => {
                    debug!(
                        height,
                        previous = latest.map(|snapshot| snapshot.height),
                        "Stored new block height"
                    );
                    TickOutcome::Updated(height)
                }
                Err(e) => {
                    warn!(height, error = %e, "Failed to store block-height snapshot");
                    TickOutcome::Failed
                }
            }
        }
        .instrument(spans::poll_tick())
        .await
    }

    /// Spawns the polling loop. The first tick runs immediately; the loop
    /// exits when `shutdown` fires or its sender is dropped.
    pub fn spawn(self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                interval_secs = self.interval.as_secs_f64(),
                "Block-height poller started"
            );

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.recv() => {
                        info!("Block-height poller received shutdown signal");
                        break;
                    }

                    _ = ticker.tick() => {
                        self.tick().await;
                    }
                }
            }
        })
    }
}
