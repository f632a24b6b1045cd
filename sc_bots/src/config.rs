//! Bot runner configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use secret_council::{
    PoolConfig,
    constants::{MAX_PLAYERS, MIN_PLAYERS},
    pool::config::{DEFAULT_INBOX_CAPACITY, DEFAULT_MAX_SESSIONS_PER_WORKER},
};
use std::net::SocketAddr;

/// Complete runner configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct BotsConfig {
    /// Number of games to simulate
    pub games: usize,
    /// Seats per game
    pub players: usize,
    /// Base seed; game `i` uses `seed + i`. Random when unset.
    pub seed: Option<u64>,
    /// Events a single game may take before it is abandoned
    pub max_events_per_game: usize,
    /// Worker pool sizing
    pub pool: PoolConfig,
    /// Prometheus exporter address, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl BotsConfig {
    /// Load configuration from environment variables
    ///
    /// CLI overrides take precedence over `SC_GAMES`, `SC_PLAYERS` and
    /// `SC_SEED`.
    ///
    /// # Errors
    ///
    /// Returns error if a variable that is set cannot be parsed
    pub fn from_env(
        games_override: Option<usize>,
        players_override: Option<usize>,
        seed_override: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let games = games_override.unwrap_or_else(|| parse_env_or("SC_GAMES", 10));
        let players = players_override.unwrap_or_else(|| parse_env_or("SC_PLAYERS", 7));
        let seed = match seed_override {
            Some(seed) => Some(seed),
            None => parse_env_opt("SC_SEED")?,
        };

        let pool = PoolConfig {
            max_sessions_per_worker: parse_env_or(
                "SC_MAX_SESSIONS_PER_WORKER",
                DEFAULT_MAX_SESSIONS_PER_WORKER,
            ),
            inbox_capacity: parse_env_or("SC_INBOX_CAPACITY", DEFAULT_INBOX_CAPACITY),
        };

        Ok(BotsConfig {
            games,
            players,
            seed,
            max_events_per_game: parse_env_or("SC_MAX_EVENTS_PER_GAME", 10_000),
            pool,
            metrics_bind: parse_env_opt("SC_METRICS_BIND")?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.games == 0 {
            return Err(ConfigError::Invalid {
                var: "SC_GAMES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.players) {
            return Err(ConfigError::Invalid {
                var: "SC_PLAYERS".to_string(),
                reason: format!("Must be between {MIN_PLAYERS} and {MAX_PLAYERS}"),
            });
        }

        if self.max_events_per_game == 0 {
            return Err(ConfigError::Invalid {
                var: "SC_MAX_EVENTS_PER_GAME".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.pool.max_sessions_per_worker == 0 {
            return Err(ConfigError::Invalid {
                var: "SC_MAX_SESSIONS_PER_WORKER".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.pool.inbox_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "SC_INBOX_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Seed for the game at `index`, if runs are reproducible.
    pub fn game_seed(&self, index: usize) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_add(index as u64))
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Helper for optional variables: unset is `None`, unparsable is an error
fn parse_env_opt<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|e: T::Err| ConfigError::Invalid {
            var: key.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(None),
    }
}
