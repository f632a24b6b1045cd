//! Worker task owning a bounded set of sessions.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};

use super::{
    errors::PoolError,
    messages::{Output, SessionId, WorkerMessage},
};
use crate::game::{Event, Outcome, Session};

/// Handle for routing events to an attached session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    worker: usize,
    sender: mpsc::Sender<WorkerMessage>,
}

impl SessionHandle {
    pub(crate) fn new(id: SessionId, worker: usize, sender: mpsc::Sender<WorkerMessage>) -> Self {
        Self { id, worker, sender }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Index of the worker that owns the session
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Queue an event for the session. The outcome arrives on the session's
    /// output channel.
    pub async fn send(&self, event: Event) -> Result<(), PoolError> {
        self.sender
            .send(WorkerMessage::Event { id: self.id, event })
            .await
            .map_err(|_| PoolError::WorkerClosed)
    }

    /// Drop the session from its worker and free its slot. Returns `false`
    /// if the session had already finished or been detached.
    pub async fn detach(&self) -> Result<bool, PoolError> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(WorkerMessage::Detach {
                id: self.id,
                response,
            })
            .await
            .map_err(|_| PoolError::WorkerClosed)?;
        receiver.await.map_err(|_| PoolError::WorkerClosed)
    }
}

/// An attached session's handle together with its output channel
#[derive(Debug)]
pub struct SessionLink {
    handle: SessionHandle,
    outputs: mpsc::UnboundedReceiver<Output>,
}

impl SessionLink {
    pub(crate) fn new(handle: SessionHandle, outputs: mpsc::UnboundedReceiver<Output>) -> Self {
        Self { handle, outputs }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn id(&self) -> SessionId {
        self.handle.id
    }

    /// Next output of the session; `None` once it has been detached and all
    /// queued outputs were read.
    pub async fn recv(&mut self) -> Option<Output> {
        self.outputs.recv().await
    }

    /// Send an event and wait for its outcome.
    pub async fn request(&mut self, event: Event) -> Result<Outcome, PoolError> {
        self.handle.send(event).await?;
        self.outputs
            .recv()
            .await
            .map(|output| output.outcome)
            .ok_or(PoolError::SessionClosed)
    }

    /// Split into the event sender and the output stream, e.g. to read
    /// outputs on a separate task.
    pub fn into_parts(self) -> (SessionHandle, mpsc::UnboundedReceiver<Output>) {
        (self.handle, self.outputs)
    }
}

struct AttachedSession {
    session: Session,
    outbox: mpsc::UnboundedSender<Output>,
}

/// Worker owning sessions and applying their events one at a time
pub(crate) struct Worker {
    id: usize,

    /// Sessions currently owned by this worker
    sessions: HashMap<SessionId, AttachedSession>,

    /// Message inbox
    inbox: mpsc::Receiver<WorkerMessage>,

    /// Attached session count shared with the pool's slot
    load: Arc<Mutex<usize>>,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        inbox: mpsc::Receiver<WorkerMessage>,
        load: Arc<Mutex<usize>>,
    ) -> Self {
        Self {
            id,
            sessions: HashMap::new(),
            inbox,
            load,
        }
    }

    /// Run the worker message loop
    pub(crate) async fn run(mut self) {
        log::info!("Worker {} starting", self.id);

        while let Some(message) = self.inbox.recv().await {
            if matches!(message, WorkerMessage::Shutdown) {
                break;
            }
            self.handle_message(message).await;
        }

        log::info!(
            "Worker {} stopped with {} sessions attached",
            self.id,
            self.sessions.len()
        );
    }

    async fn handle_message(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Attach {
                id,
                session,
                outbox,
            } => {
                self.sessions.insert(
                    id,
                    AttachedSession {
                        session: *session,
                        outbox,
                    },
                );
                log::debug!("Worker {}: attached session {}", self.id, id);
            }
            WorkerMessage::Event { id, event } => self.handle_event(id, event).await,
            WorkerMessage::Detach { id, response } => {
                let attached = self.release(id).await.is_some();
                let _ = response.send(attached);
            }
            WorkerMessage::Shutdown => {}
        }
    }

    async fn handle_event(&mut self, id: SessionId, event: Event) {
        let Some(attached) = self.sessions.get_mut(&id) else {
            log::warn!(
                "Worker {}: dropping {:?} for unknown session {}",
                self.id,
                event,
                id
            );
            return;
        };

        let outcome = attached.session.apply(event);
        match &outcome {
            Ok(notice) => log::debug!("Session {}: {}", id, notice),
            Err(error) => log::debug!("Session {}: rejected {:?}: {}", id, event, error),
        }

        let output = Output {
            session_id: id,
            outcome,
        };

        // Finished sessions free their slot before the final output goes out.
        if attached.session.is_over() {
            if let Some(finished) = self.release(id).await {
                let _ = finished.outbox.send(output);
            }
            return;
        }

        if attached.outbox.send(output).is_err() {
            log::debug!(
                "Worker {}: output receiver for session {} dropped, detaching",
                self.id,
                id
            );
            self.release(id).await;
        }
    }

    /// Remove a session and decrement the slot load exactly once.
    async fn release(&mut self, id: SessionId) -> Option<AttachedSession> {
        let attached = self.sessions.remove(&id)?;
        let mut load = self.load.lock().await;
        *load = load.saturating_sub(1);
        log::debug!(
            "Worker {}: detached session {}, {} remaining",
            self.id,
            id,
            *load
        );
        Some(attached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameError, Notice};
    use uuid::Uuid;

    fn spawn_worker() -> (mpsc::Sender<WorkerMessage>, Arc<Mutex<usize>>) {
        let (sender, inbox) = mpsc::channel(8);
        let load = Arc::new(Mutex::new(1));
        tokio::spawn(Worker::new(0, inbox, load.clone()).run());
        (sender, load)
    }

    async fn attach(sender: &mpsc::Sender<WorkerMessage>) -> SessionLink {
        let id = Uuid::new_v4();
        let (outbox, outputs) = mpsc::unbounded_channel();
        sender
            .send(WorkerMessage::Attach {
                id,
                session: Box::new(Session::with_seed(1)),
                outbox,
            })
            .await
            .unwrap();
        SessionLink::new(SessionHandle::new(id, 0, sender.clone()), outputs)
    }

    #[tokio::test]
    async fn test_worker_applies_events_in_order() {
        let (sender, _load) = spawn_worker();
        let mut link = attach(&sender).await;

        for _ in 0..3 {
            link.handle().send(Event::Join).await.unwrap();
        }
        for expected in 0..3 {
            let output = link.recv().await.unwrap();
            assert_eq!(output.session_id, link.id());
            assert_eq!(output.outcome, Ok(Notice::PlayerRegistered(expected)));
        }
    }

    #[tokio::test]
    async fn test_worker_reports_rejections() {
        let (sender, _load) = spawn_worker();
        let mut link = attach(&sender).await;

        let outcome = link.request(Event::Start).await.unwrap();
        assert!(matches!(outcome, Err(GameError::Invalid(_))));
        let outcome = link.request(Event::Join).await.unwrap();
        assert_eq!(outcome, Ok(Notice::PlayerRegistered(0)));
    }

    #[tokio::test]
    async fn test_link_splits_into_handle_and_outputs() {
        let (sender, _load) = spawn_worker();
        let link = attach(&sender).await;
        let id = link.id();

        let (handle, mut outputs) = link.into_parts();
        let reader = tokio::spawn(async move { outputs.recv().await });
        handle.send(Event::Join).await.unwrap();

        let output = reader.await.unwrap().unwrap();
        assert_eq!(output.session_id, id);
        assert_eq!(output.outcome, Ok(Notice::PlayerRegistered(0)));
    }

    #[tokio::test]
    async fn test_detach_decrements_once() {
        let (sender, load) = spawn_worker();
        let mut link = attach(&sender).await;

        assert!(link.handle().detach().await.unwrap());
        assert_eq!(*load.lock().await, 0);
        assert!(!link.handle().detach().await.unwrap());
        assert_eq!(*load.lock().await, 0);

        assert_eq!(
            link.request(Event::Join).await,
            Err(PoolError::SessionClosed)
        );
    }

    #[tokio::test]
    async fn test_shutdown_closes_handles() {
        let (sender, _load) = spawn_worker();
        let link = attach(&sender).await;
        sender.send(WorkerMessage::Shutdown).await.unwrap();

        // The worker drops its inbox on exit.
        sender.closed().await;
        assert_eq!(
            link.handle().send(Event::Join).await,
            Err(PoolError::WorkerClosed)
        );
    }
}
