// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires every long-running control-plane component into independent
//! tokio tasks sharing one shutdown signal, composing the reducer,
//! sweeper, health loop, dispatcher, and admin listener the way a
//! reconcile/listener/lifecycle split would.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use tx_registry::{KvEngineRegistry, StaleEngineSweeper};
use tx_realtime::{KvWorkerRegistry, SessionHealthLoop, SessionRouter};
use tx_storage::{InMemoryDs, InMemoryKv};
use tx_webhook::{InMemoryEndpointRegistry, WebhookDispatcher};
use txctl_core::SystemClock;

use crate::config::Config;
use crate::env;
use crate::state::AppState;

pub struct Daemon {
    config: Config,
    kv: InMemoryKv,
    store: InMemoryDs,
    registry: KvEngineRegistry<InMemoryKv>,
    clock: SystemClock,
    state: AppState,
}

impl Daemon {
    /// Wires the in-memory reference storage adapters (spec's `[SUPPLEMENT]`
    /// C1/C2/C3 adapters) into every component. A production deployment
    /// swaps these three for durable backends without touching anything
    /// in this module; every consumer here depends only on the `tx-storage`
    /// traits.
    pub fn new(config: Config) -> Self {
        let kv = InMemoryKv::new();
        let store = InMemoryDs::new();
        let registry = KvEngineRegistry::new(kv.clone());
        let workers = KvWorkerRegistry::new(kv.clone());
        let clock = SystemClock;

        let scheduler = new_scheduler(&config, store.clone(), kv.clone(), registry.clone(), clock);

        let router = SessionRouter::new(workers, store.clone())
            .with_stale_after_ms(config.t_heartbeat_stale.as_millis() as u64);

        let state = AppState {
            kv: kv.clone(),
            store: store.clone(),
            registry: registry.clone(),
            scheduler: Arc::new(scheduler),
            router: Arc::new(router),
            clock,
        };

        Self { config, kv, store, registry, clock, state }
    }

    /// Spawns the scheduler reducer, stale-engine sweeper, realtime
    /// session health loop, webhook dispatcher, and the admin IPC
    /// listener, then waits for all of them to return after `shutdown`
    /// fires.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> std::io::Result<()> {
        let mut tasks = Vec::new();

        // `AppState::scheduler` is an `Arc` shared with every admin
        // connection and only ever used through its `&self` methods; the
        // reducer loop needs to *own* a `Scheduler`, so a second,
        // independent instance is built from the same underlying
        // kv/store/registry/clock handles rather than trying to reclaim
        // the shared one.
        let scheduler = new_scheduler(&self.config, self.store.clone(), self.kv.clone(), self.registry.clone(), self.clock);
        tasks.push(tokio::spawn(scheduler.run(shutdown.clone())));

        let sweeper = StaleEngineSweeper::new(self.registry.clone(), self.kv.clone(), self.clock)
            .with_stale_after(self.config.t_heartbeat_stale);
        tasks.push(tokio::spawn(sweeper.run(shutdown.clone())));

        let health_workers = KvWorkerRegistry::new(self.kv.clone());
        let health = SessionHealthLoop::new(health_workers, self.store.clone(), self.kv.clone(), self.clock)
            .with_stale_after(self.config.t_heartbeat_stale);
        tasks.push(tokio::spawn(health.run(shutdown.clone())));

        let dispatcher =
            WebhookDispatcher::new(self.store.clone(), self.clock, Box::new(InMemoryEndpointRegistry::new()));
        tasks.push(tokio::spawn(dispatcher.run(shutdown.clone())));

        let socket_path = env::socket_path();
        let listener_state = self.state.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(err) = crate::ipc::serve(&socket_path, listener_state, shutdown).await {
                error!(error = %err, "admin listener exited with an error");
            }
        }));

        for task in tasks {
            if let Err(err) = task.await {
                error!(error = %err, "a daemon task panicked");
            }
        }
        info!("daemon shut down cleanly");
        Ok(())
    }
}

fn new_scheduler(
    config: &Config,
    store: InMemoryDs,
    kv: InMemoryKv,
    registry: KvEngineRegistry<InMemoryKv>,
    clock: SystemClock,
) -> tx_orchestrator::Scheduler<InMemoryDs, InMemoryKv, KvEngineRegistry<InMemoryKv>, SystemClock> {
    tx_orchestrator::Scheduler::new(store, kv, registry, clock, config.owner_id.clone())
        .with_dispatch_retry(config.t_dispatch_retry)
        .with_dispatch_deadline(config.t_dispatch_deadline)
        .with_shard_count(config.shard_count)
}
