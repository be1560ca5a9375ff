//! Transaction layer for siphon
//!
//! This crate implements the client-side coordinator for cross-row,
//! cross-table transactions over a row-atomic, multi-version table store:
//! - Transaction: buffered mutations, snapshot reads, two-phase commit
//! - MutationBuffer: deduplicating per-transaction write buffer
//! - CommitPlanner: primary selection and lock construction
//! - TxnScanner: snapshot scans with lock resolution
//! - In-process collaborators: timestamp oracle, wall clock, worker
//!   registry, statistics sinks

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod client;
pub mod config;
pub mod oracle;
pub mod plan;
pub mod scanner;
pub mod stats;
pub mod transaction;
pub mod worker;

pub use buffer::{MutationBuffer, RowMutation};
pub use client::TxnClient;
pub use config::ClientConfig;
pub use oracle::LocalTimestampOracle;
pub use plan::{CommitPlan, CommitPlanner, DefaultPlanner};
pub use scanner::TxnScanner;
pub use stats::{AtomicStats, NoopStats};
pub use transaction::{Transaction, TxnStatus};
pub use worker::{ProcessWorkerRegistry, StaticWorkerRegistry, SystemWallClock};
