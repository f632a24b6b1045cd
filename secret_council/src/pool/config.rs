//! Worker pool configuration.

use serde::{Deserialize, Serialize};

use super::errors::PoolError;

pub const DEFAULT_MAX_SESSIONS_PER_WORKER: usize = 10;
pub const DEFAULT_INBOX_CAPACITY: usize = 100;

/// Pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Sessions a single worker may own before a new worker is spawned
    pub max_sessions_per_worker: usize,

    /// Bounded capacity of each worker's inbound channel
    pub inbox_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_worker: DEFAULT_MAX_SESSIONS_PER_WORKER,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
        }
    }
}

impl PoolConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_sessions_per_worker == 0 {
            return Err(PoolError::InvalidConfig(
                "max sessions per worker must be at least 1".to_string(),
            ));
        }

        if self.inbox_capacity == 0 {
            return Err(PoolError::InvalidConfig(
                "inbox capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PoolConfig::default();
        assert_eq!(config.max_sessions_per_worker, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = PoolConfig {
            max_sessions_per_worker: 0,
            ..PoolConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PoolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_inbox_rejected() {
        let config = PoolConfig {
            inbox_capacity: 0,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: PoolConfig = serde_json::from_str(r#"{"max_sessions_per_worker": 3}"#).unwrap();
        assert_eq!(config.max_sessions_per_worker, 3);
        assert_eq!(config.inbox_capacity, DEFAULT_INBOX_CAPACITY);
    }
}
