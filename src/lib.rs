//! # Siphon
//!
//! Client-side coordinator for cross-row, cross-table transactions on top of
//! a distributed, row-atomic, multi-version table store.
//!
//! A transaction groups arbitrarily many reads and writes across rows and
//! tables into one snapshot-isolated unit and commits them with a two-phase
//! prewrite/commit protocol. One column is chosen as the **primary**: its
//! lock-to-commit-record transition is the single row-atomic store operation
//! that decides the whole transaction. Every other lock points back at the
//! primary, so any reader that trips over leftover state can resolve it.
//!
//! # Quick Start
//!
//! ```ignore
//! use siphon::{Get, Put, TxnClient};
//! use std::sync::Arc;
//!
//! // store and cleaner are deployment-specific: the store speaks to the
//! // backing table service, the cleaner resolves abandoned locks.
//! let client = TxnClient::with_local_oracle(store, cleaner);
//!
//! let mut txn = client.begin()?;
//! txn.put(
//!     &"accounts".into(),
//!     Put::new("alice").add_column("cf", "balance", "90"),
//! )?;
//! txn.put(
//!     &"accounts".into(),
//!     Put::new("bob").add_column("cf", "balance", "110"),
//! )?;
//! txn.commit()?;
//!
//! let txn = client.begin()?;
//! let row = txn.get(&"accounts".into(), &Get::new("bob").add_column("cf", "balance"))?;
//! ```
//!
//! # Architecture
//!
//! | Piece | Purpose |
//! |-------|---------|
//! | [`TxnClient`] | wires shared collaborators, opens transactions |
//! | [`Transaction`] | buffers mutations, drives prewrite/commit/rollback |
//! | [`TxnScanner`] | snapshot scans with lock resolution |
//! | `TxnStore` / `LockCleaner` traits | the deployment-specific edges |
//!
//! The store, timestamp oracle, and lock cleaner are consumed through
//! traits; this crate ships in-process implementations of the ambient
//! collaborators (clock, registry, oracle, statistics) only.

pub use siphon_core::{
    Cell, CellKind, Column, ColumnCoordinate, ConflictLock, Delete, Error, Get, LockRole, Put,
    ReadResult, Result, Scan, TableName, TxnLock,
};
pub use siphon_core::traits::{
    LockCleaner, RowStream, StatsSink, TimestampOracle, TxnStore, WallClock, WorkerRegistry,
};
pub use siphon_txn::{
    AtomicStats, ClientConfig, CommitPlan, CommitPlanner, DefaultPlanner, LocalTimestampOracle,
    MutationBuffer, NoopStats, ProcessWorkerRegistry, RowMutation, StaticWorkerRegistry,
    SystemWallClock, Transaction, TxnClient, TxnScanner, TxnStatus,
};
