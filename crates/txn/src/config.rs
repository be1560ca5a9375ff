//! Client configuration

use serde::{Deserialize, Serialize};

/// Configuration for the transaction client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Rows fetched per backing-store round trip by scanners that do not set
    /// their own caching.
    pub scan_batch_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            scan_batch_size: 64,
        }
    }
}

impl ClientConfig {
    /// Config for tests: tiny scan batches to exercise batching paths.
    pub fn for_testing() -> Self {
        ClientConfig { scan_batch_size: 2 }
    }

    /// Set the default scan batch size.
    pub fn with_scan_batch_size(mut self, rows: usize) -> Self {
        self.scan_batch_size = rows;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_batch_size_is_positive() {
        assert!(ClientConfig::default().scan_batch_size > 0);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::default().with_scan_batch_size(7);
        assert_eq!(config.scan_batch_size, 7);
    }

    #[test]
    fn test_testing_config_uses_small_batches() {
        assert!(ClientConfig::for_testing().scan_batch_size < ClientConfig::default().scan_batch_size);
    }
}
