//! # Secret Council
//!
//! A rules engine for a hidden-role council game, together with a pool of
//! async workers that multiplexes many concurrent games.
//!
//! ## Architecture
//!
//! Every game is a [`Session`]: a synchronous state machine that consumes one
//! [`Event`] at a time and answers with exactly one [`Outcome`]. Sessions move
//! through these phases:
//!
//! - **WaitingForPlayers**: Seats are filled in join order
//! - **NominatingChancellor**: The president proposes a chancellor
//! - **VotingOnGovernment**: Every living player votes on the government
//! - **PresidentDiscarding/ChancellorEnacting**: The legislative session
//! - **VetoRequested/VetoConfirmation**: Optional veto once unlocked
//! - **Power\***: The president uses an unlocked special power
//! - **GameOver**: Terminal
//!
//! The [`pool`] module runs sessions on Tokio tasks. Each worker owns a
//! bounded number of sessions and processes their events strictly in
//! arrival order.
//!
//! ## Core Modules
//!
//! - [`game`]: Session state machine, entities and rule tables
//! - [`pool`]: Worker pool, session handles and pool configuration
//!
//! ## Example
//!
//! ```
//! use secret_council::{Event, Notice, Session};
//!
//! let mut session = Session::with_seed(7);
//! for _ in 0..5 {
//!     session.apply(Event::Join).unwrap();
//! }
//! let started = session.apply(Event::Start).unwrap();
//! assert!(matches!(started, Notice::GameStarted { .. }));
//! ```

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    Ballot, Event, Faction, GameEnding, GameError, GameSnapshot, Notice, Outcome, Phase,
    PlayerIndex, Policy, PolicyDeck, PolicyTracks, PowerRequest, Revealed, Role, Session,
    ShuffledDeck, SpecialPower, constants, entities, functional,
};

/// Async worker pool multiplexing sessions over Tokio tasks.
pub mod pool;
pub use pool::{Output, PoolConfig, PoolError, SessionHandle, SessionId, SessionLink, WorkerPool};
