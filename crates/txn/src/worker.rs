//! Wall clock and worker identity
//!
//! Every lock embeds the writing worker's address and a wall time so remote
//! cleaners can judge whether the owner is plausibly alive before rolling its
//! transaction back.

use chrono::Utc;
use once_cell::sync::OnceCell;
use siphon_core::error::Result;
use siphon_core::traits::{WallClock, WorkerRegistry};
use uuid::Uuid;

/// Wall clock reading the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now_millis(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Registry identity derived from the local process.
///
/// The address is `<uuid>@<pid>`, computed once per registry instance, so
/// every lock written through one client names the same owner.
#[derive(Debug, Default)]
pub struct ProcessWorkerRegistry {
    address: OnceCell<Vec<u8>>,
}

impl ProcessWorkerRegistry {
    /// Create a registry for this process.
    pub fn new() -> Self {
        ProcessWorkerRegistry::default()
    }
}

impl WorkerRegistry for ProcessWorkerRegistry {
    fn register_worker(&self) -> Result<()> {
        let address = self.client_address();
        tracing::debug!(
            address = %String::from_utf8_lossy(&address),
            "registered transaction worker"
        );
        Ok(())
    }

    fn client_address(&self) -> Vec<u8> {
        self.address
            .get_or_init(|| {
                format!("{}@{}", Uuid::new_v4(), std::process::id()).into_bytes()
            })
            .clone()
    }
}

/// Registry with a caller-chosen, fixed address.
///
/// Useful when the embedding process already has a cluster-wide identity.
#[derive(Clone, Debug)]
pub struct StaticWorkerRegistry {
    address: Vec<u8>,
}

impl StaticWorkerRegistry {
    /// Create a registry answering with `address`.
    pub fn new(address: impl Into<Vec<u8>>) -> Self {
        StaticWorkerRegistry {
            address: address.into(),
        }
    }
}

impl WorkerRegistry for StaticWorkerRegistry {
    fn register_worker(&self) -> Result<()> {
        Ok(())
    }

    fn client_address(&self) -> Vec<u8> {
        self.address.clone()
    }
}
