//! # Expiry Sweeper Background Service
//!
//! Periodically expires lapsed seat offers and passes the seats on.
//!
//! ## Sweep Flow
//!
//! 1. Timer tick triggers a sweep cycle
//! 2. The store lists events with NOTIFIED entries past `expires_at`
//! 3. Each event is swept under its own lock
//! 4. Idle per-event locks are pruned (when configured)
//!
//! Expiry is evaluated lazily, so an offer may outlive its nominal deadline by
//! up to one sweep interval.
//!
//! ## Configuration
//!
//! ```toml
//! [waitlist]
//! sweep_enabled = true
//! sweep_interval_seconds = 300  # 5 minutes
//! lock_prune_on_sweep = true
//! ```

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use super::promotion_controller::{PromotionController, SweepReport};
use crate::error::Result;
use crate::system_context::SystemContext;

/// Background service for lapsed-offer expiry
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    context: SystemContext,
    promotions: PromotionController,
}

impl ExpirySweeper {
    pub fn new(context: SystemContext, promotions: PromotionController) -> Self {
        Self {
            context,
            promotions,
        }
    }

    fn interval(&self) -> Duration {
        self.context.config.sweep_interval()
    }

    /// Run one sweep cycle
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let report = self.promotions.sweep_expired().await?;

        if self.context.config.waitlist.lock_prune_on_sweep {
            let pruned = self.context.locks.prune_idle();
            if pruned > 0 {
                debug!(pruned = pruned, "Pruned idle event locks");
            }
        }
        Ok(report)
    }

    /// Run sweep cycles forever.
    ///
    /// A failed cycle is logged and the loop carries on.
    pub async fn run(&self) -> Result<()> {
        let mut interval_timer = interval(self.interval());
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_seconds = self.interval().as_secs(),
            "Starting expiry sweeper"
        );

        loop {
            interval_timer.tick().await;
            self.run_cycle().await;
        }
    }

    async fn run_cycle(&self) {
        let start = std::time::Instant::now();
        match self.sweep_once().await {
            Ok(report) => {
                debug!(
                    offers_expired = report.offers_expired,
                    offers_sent = report.offers_sent,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Expiry sweep cycle finished"
                );
            }
            Err(e) => {
                error!(error = %e, "Expiry sweep cycle failed");
            }
        }
    }

    /// Run on a background task until `shutdown` flips to `true` or its sender drops
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval_timer = interval(self.interval());
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                interval_seconds = self.interval().as_secs(),
                "Expiry sweeper spawned"
            );

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => self.run_cycle().await,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Expiry sweeper shutting down");
                            break;
                        }
                    }
                }
            }
        })
    }
}
