//! Client entry point
//!
//! A [`TxnClient`] wires the shared collaborators together and opens
//! transactions. The store, oracle, and cleaner are deployment-specific and
//! must be supplied; clock, registry, planner, statistics, and configuration
//! default to the in-process implementations and can be swapped with the
//! `with_*` builders before the first transaction begins.

use crate::config::ClientConfig;
use crate::oracle::LocalTimestampOracle;
use crate::plan::{CommitPlanner, DefaultPlanner};
use crate::stats::NoopStats;
use crate::transaction::{Collaborators, Transaction};
use crate::worker::{ProcessWorkerRegistry, SystemWallClock};
use siphon_core::error::Result;
use siphon_core::traits::{
    LockCleaner, StatsSink, TimestampOracle, TxnStore, WallClock, WorkerRegistry,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Factory for transactions sharing one set of collaborators.
pub struct TxnClient {
    store: Arc<dyn TxnStore>,
    oracle: Arc<dyn TimestampOracle>,
    cleaner: Arc<dyn LockCleaner>,
    clock: Arc<dyn WallClock>,
    registry: Arc<dyn WorkerRegistry>,
    planner: Arc<dyn CommitPlanner>,
    stats: Arc<dyn StatsSink>,
    config: ClientConfig,
    registered: AtomicBool,
}

impl TxnClient {
    /// Create a client over the given store, oracle, and cleaner, with
    /// default clock, registry, planner, statistics, and configuration.
    pub fn new(
        store: Arc<dyn TxnStore>,
        oracle: Arc<dyn TimestampOracle>,
        cleaner: Arc<dyn LockCleaner>,
    ) -> Self {
        TxnClient {
            store,
            oracle,
            cleaner,
            clock: Arc::new(SystemWallClock),
            registry: Arc::new(ProcessWorkerRegistry::new()),
            planner: Arc::new(DefaultPlanner),
            stats: Arc::new(NoopStats),
            config: ClientConfig::default(),
            registered: AtomicBool::new(false),
        }
    }

    /// Client over an in-process oracle, for tests and single-process use.
    pub fn with_local_oracle(store: Arc<dyn TxnStore>, cleaner: Arc<dyn LockCleaner>) -> Self {
        TxnClient::new(store, Arc::new(LocalTimestampOracle::new()), cleaner)
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn WallClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the worker registry.
    pub fn with_registry(mut self, registry: Arc<dyn WorkerRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the commit planner.
    pub fn with_planner(mut self, planner: Arc<dyn CommitPlanner>) -> Self {
        self.planner = planner;
        self
    }

    /// Replace the statistics sink.
    pub fn with_stats(mut self, stats: Arc<dyn StatsSink>) -> Self {
        self.stats = stats;
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Open a transaction at a fresh snapshot timestamp.
    pub fn begin(&self) -> Result<Transaction> {
        self.ensure_registered()?;
        let start_ts = self.oracle.start_ts()?;
        Ok(Transaction::new(
            Arc::new(Collaborators {
                store: Arc::clone(&self.store),
                oracle: Arc::clone(&self.oracle),
                clock: Arc::clone(&self.clock),
                cleaner: Arc::clone(&self.cleaner),
                planner: Arc::clone(&self.planner),
                stats: Arc::clone(&self.stats),
                config: self.config.clone(),
            }),
            self.registry.client_address(),
            start_ts,
        ))
    }

    /// Register this worker once, before its first transaction.
    fn ensure_registered(&self) -> Result<()> {
        if self.registered.load(Ordering::Acquire) {
            return Ok(());
        }
        self.registry.register_worker()?;
        self.registered.store(true, Ordering::Release);
        Ok(())
    }
}
