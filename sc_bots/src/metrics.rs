//! Prometheus metrics for simulated council games.
//!
//! # Metrics
//!
//! - **Game Metrics**: games started and finished, finish reasons
//! - **Event Metrics**: applied and rejected events by error kind
//! - **Pool Metrics**: spawned workers and attached sessions

use metrics_exporter_prometheus::PrometheusBuilder;
use secret_council::{GameEnding, GameError};
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// Game Metrics
// ============================================================================

pub fn games_started_total() {
    metrics::counter!("council_games_started_total").increment(1);
}

/// Record a finished game, labelled by how it ended.
pub fn games_finished_total(ending: Option<GameEnding>) {
    let reason = match ending {
        Some(GameEnding::SubversivePolicy) => "subversive_policy",
        Some(GameEnding::LoyalPolicy) => "loyal_policy",
        Some(GameEnding::UsurperElected) => "usurper_elected",
        Some(GameEnding::UsurperExecuted) => "usurper_executed",
        None => "stalled",
    };
    metrics::counter!("council_games_finished_total", "reason" => reason).increment(1);
}

// ============================================================================
// Event Metrics
// ============================================================================

pub fn events_applied_total() {
    metrics::counter!("council_events_applied_total").increment(1);
}

pub fn events_rejected_total(error: &GameError) {
    let kind = match error {
        GameError::WrongPhase => "wrong_phase",
        GameError::Unauthorized => "unauthorized",
        GameError::Invalid(_) => "invalid",
        GameError::GameFull => "game_full",
    };
    metrics::counter!("council_events_rejected_total", "kind" => kind).increment(1);
}

// ============================================================================
// Pool Metrics
// ============================================================================

pub fn pool_workers(count: usize) {
    metrics::gauge!("council_pool_workers").set(count as f64);
}

pub fn pool_sessions(count: usize) {
    metrics::gauge!("council_pool_sessions").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter() {
        // No recorder installed; calls must be no-ops.
        games_started_total();
        games_finished_total(Some(GameEnding::LoyalPolicy));
        games_finished_total(None);
        events_applied_total();
        events_rejected_total(&GameError::Invalid("test".to_string()));
        pool_workers(2);
        pool_sessions(7);
    }
}
