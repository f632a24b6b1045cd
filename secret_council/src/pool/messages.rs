//! Worker message types.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::game::{Event, Outcome, Session};

/// Pool-assigned identifier of an attached session.
pub type SessionId = Uuid;

/// One outcome, tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub session_id: SessionId,
    pub outcome: Outcome,
}

/// Messages that can be sent to a worker
#[derive(Debug)]
pub(crate) enum WorkerMessage {
    /// Take ownership of a session
    Attach {
        id: SessionId,
        session: Box<Session>,
        outbox: mpsc::UnboundedSender<Output>,
    },

    /// Apply an event to an owned session
    Event { id: SessionId, event: Event },

    /// Drop a session; answers whether it was still attached
    Detach {
        id: SessionId,
        response: oneshot::Sender<bool>,
    },

    /// Stop after everything already queued
    Shutdown,
}
