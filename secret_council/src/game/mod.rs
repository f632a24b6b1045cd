//! Council game engine.
//!
//! This module provides the rules of a single hidden-role council game:
//! - Role dealing and the subversive power table
//! - The 17-card policy deck
//! - Election, legislation, veto and special power phases
//! - Termination checks and public state snapshots

pub mod constants;
pub mod entities;
pub mod functional;
pub mod state_machine;

pub use entities::{
    Ballot, Faction, GameEnding, GameSnapshot, PlayerIndex, Policy, PolicyDeck, PolicyTracks,
    Revealed, Role, ShuffledDeck, SpecialPower,
};
pub use state_machine::{Event, GameError, Notice, Outcome, Phase, PowerRequest, Session};
