//! Background auto-cancellation sweep.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use order_store::OrderStore;

use crate::engine::OrderEngine;
use crate::ports::inventory::InventoryPort;

/// Timing parameters for the auto-cancellation sweep.
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// Time between sweep passes.
    pub interval: Duration,

    /// Age past which a pending order is auto-cancelled.
    pub pending_timeout: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            pending_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Handle to a running sweep task.
///
/// The task runs until [`SweepHandle::stop`] is called or the handle is
/// dropped; shutdown takes effect between passes, never mid-pass.
pub struct SweepHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Signals shutdown and waits for the task to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }

    /// Returns true once the sweep task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub(crate) fn spawn<S, I>(engine: OrderEngine<S, I>, config: SweepConfig) -> SweepHandle
where
    S: OrderStore + Clone + 'static,
    I: InventoryPort + Clone + 'static,
{
    let (shutdown, mut rx) = watch::channel(false);
    let pending_timeout = chrono::Duration::from_std(config.pending_timeout)
        .unwrap_or_else(|_| chrono::Duration::minutes(30));

    let task = tokio::spawn(async move {
        // The first pass runs one full interval after startup.
        let mut ticker = time::interval_at(
            time::Instant::now() + config.interval,
            config.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(
            interval_secs = config.interval.as_secs(),
            pending_timeout_secs = config.pending_timeout.as_secs(),
            "auto-cancellation sweep started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match engine.sweep_once(pending_timeout).await {
                        Ok(0) => {}
                        Ok(cancelled) => {
                            tracing::info!(cancelled, "sweep pass auto-cancelled orders");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "sweep pass failed");
                        }
                    }
                }
                _ = rx.changed() => break,
            }
        }

        tracing::debug!("auto-cancellation sweep stopped");
    });

    SweepHandle { shutdown, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{Money, UserId};
    use order_store::{InMemoryOrderStore, NewOrder, OrderLine, OrderStatus, OrderId};

    use crate::ports::inventory::InMemoryInventoryService;

    async fn backdated_pending_order(store: &InMemoryOrderStore, minutes: i64) -> OrderId {
        let mut order = NewOrder::pending(
            UserId::new(),
            vec![OrderLine::new(
                "SKU-001",
                "Widget",
                2,
                Money::from_cents(9999),
            )],
            Money::from_cents(19998),
            "",
        );
        order.created_at = Utc::now() - chrono::Duration::minutes(minutes);
        store.create(order).await.unwrap().id
    }

    async fn wait_for_status(store: &InMemoryOrderStore, id: OrderId, status: OrderStatus) -> bool {
        for _ in 0..100 {
            tokio::task::yield_now().await;
            if store.get(id).await.unwrap().status == status {
                return true;
            }
        }
        false
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_cancels_expired_order_on_next_pass() {
        let store = InMemoryOrderStore::new();
        let engine = OrderEngine::new(store.clone(), InMemoryInventoryService::new());

        let stale = backdated_pending_order(&store, 35).await;
        let fresh = backdated_pending_order(&store, 10).await;

        let handle = engine.spawn_sweep(SweepConfig {
            interval: Duration::from_secs(60),
            pending_timeout: Duration::from_secs(30 * 60),
        });
        // Let the task register its ticker before moving the clock.
        tokio::task::yield_now().await;

        time::advance(Duration::from_secs(61)).await;
        assert!(wait_for_status(&store, stale, OrderStatus::Cancelled).await);
        assert_eq!(
            store.get(fresh).await.unwrap().status,
            OrderStatus::Pending
        );

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_does_not_run_before_first_interval() {
        let store = InMemoryOrderStore::new();
        let engine = OrderEngine::new(store.clone(), InMemoryInventoryService::new());

        let stale = backdated_pending_order(&store, 35).await;

        let handle = engine.spawn_sweep(SweepConfig {
            interval: Duration::from_secs(300),
            pending_timeout: Duration::from_secs(30 * 60),
        });
        tokio::task::yield_now().await;

        time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(
            store.get(stale).await.unwrap().status,
            OrderStatus::Pending
        );

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_terminates_the_task() {
        let store = InMemoryOrderStore::new();
        let engine = OrderEngine::new(store, InMemoryInventoryService::new());

        let handle = engine.spawn_sweep(SweepConfig::default());
        assert!(!handle.is_finished());

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_runs_repeatedly() {
        let store = InMemoryOrderStore::new();
        let engine = OrderEngine::new(store.clone(), InMemoryInventoryService::new());

        let handle = engine.spawn_sweep(SweepConfig {
            interval: Duration::from_secs(60),
            pending_timeout: Duration::from_secs(30 * 60),
        });
        tokio::task::yield_now().await;

        // First pass sees nothing to cancel.
        time::advance(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        // An order that was already stale shows up before the second pass.
        let stale = backdated_pending_order(&store, 35).await;
        time::advance(Duration::from_secs(60)).await;
        assert!(wait_for_status(&store, stale, OrderStatus::Cancelled).await);

        handle.stop().await;
    }
}
