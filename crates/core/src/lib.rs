//! Core model for the siphon transaction client
//!
//! This crate defines everything the coordinator and its collaborators agree
//! on:
//! - the cell-level data model and shadow-family identity
//! - user-facing request/result types with validation
//! - the lock payload wire format
//! - the collaborator traits (store endpoints, oracle, clock, registry,
//!   cleaner, statistics)
//! - the unified error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod lock;
pub mod request;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use lock::{ConflictLock, LockRole, TxnLock};
pub use request::{Delete, Get, Put, ReadResult, Scan};
pub use types::{Cell, CellKind, Column, ColumnCoordinate, TableName};
