//! Worker pool multiplexing many sessions over a few async workers.
//!
//! This module implements:
//! - Worker: Tokio task owning up to `max_sessions_per_worker` sessions
//! - WorkerPool: Places sessions on workers and spawns workers on demand
//! - SessionHandle/SessionLink: Event routing and per-session outputs
//!
//! ## Architecture
//!
//! Each worker runs in a separate Tokio task with a bounded mpsc inbox and
//! processes one message to completion before taking the next, so events of
//! a session are applied strictly in the order they were sent. Outcomes go
//! out on an unbounded per-session channel. A session that reaches game over
//! is detached right after its final outcome and its slot is freed.
//!
//! ## Example
//!
//! ```
//! use secret_council::{Event, Notice, PoolConfig, Session, WorkerPool};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let pool = WorkerPool::init(PoolConfig::default()).unwrap();
//! let mut link = pool.attach(Session::new()).await.unwrap();
//!
//! let outcome = link.request(Event::Join).await.unwrap();
//! assert_eq!(outcome, Ok(Notice::PlayerRegistered(0)));
//!
//! pool.shutdown().await;
//! # });
//! ```

pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod worker;

pub use config::PoolConfig;
pub use errors::PoolError;
pub use manager::WorkerPool;
pub use messages::{Output, SessionId};
pub use worker::{SessionHandle, SessionLink};
