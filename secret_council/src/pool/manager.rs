//! Worker pool for spawning workers and placing sessions on them.

use std::sync::Arc;
use tokio::{
    sync::{Mutex, RwLock, mpsc},
    task::JoinHandle,
};
use uuid::Uuid;

use super::{
    config::PoolConfig,
    errors::PoolError,
    messages::WorkerMessage,
    worker::{SessionHandle, SessionLink, Worker},
};
use crate::game::Session;

/// One spawned worker as seen by the pool
struct HandlerSlot {
    id: usize,

    /// Sessions currently owned by the worker
    load: Arc<Mutex<usize>>,

    sender: mpsc::Sender<WorkerMessage>,

    task: JoinHandle<()>,
}

/// Slot picked for a new session, with its load already incremented
struct Reservation {
    worker: usize,
    load: Arc<Mutex<usize>>,
    sender: mpsc::Sender<WorkerMessage>,
}

/// Pool multiplexing sessions over a growing set of workers
pub struct WorkerPool {
    config: PoolConfig,

    /// Spawned workers, in creation order
    slots: RwLock<Vec<HandlerSlot>>,
}

impl WorkerPool {
    /// Create an empty pool. Workers are spawned on demand by [`attach`].
    ///
    /// [`attach`]: WorkerPool::attach
    pub fn init(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        log::info!(
            "Worker pool ready ({} sessions per worker, inbox {})",
            config.max_sessions_per_worker,
            config.inbox_capacity
        );
        Ok(Self {
            config,
            slots: RwLock::new(Vec::new()),
        })
    }

    /// Sizing the pool was created with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Hand a session to the first worker with spare capacity, spawning a
    /// new worker when every existing one is full.
    pub async fn attach(&self, session: Session) -> Result<SessionLink, PoolError> {
        let id = Uuid::new_v4();
        let (outbox, outputs) = mpsc::unbounded_channel();
        let reservation = self.reserve().await;

        let message = WorkerMessage::Attach {
            id,
            session: Box::new(session),
            outbox,
        };
        if reservation.sender.send(message).await.is_err() {
            let mut load = reservation.load.lock().await;
            *load = load.saturating_sub(1);
            return Err(PoolError::WorkerClosed);
        }

        log::debug!("Attached session {} to worker {}", id, reservation.worker);
        let handle = SessionHandle::new(id, reservation.worker, reservation.sender);
        Ok(SessionLink::new(handle, outputs))
    }

    /// Drop a session from its worker. See [`SessionHandle::detach`].
    pub async fn detach(&self, handle: &SessionHandle) -> Result<bool, PoolError> {
        handle.detach().await
    }

    async fn reserve(&self) -> Reservation {
        let max = self.config.max_sessions_per_worker;

        {
            let slots = self.slots.read().await;
            if let Some(reservation) = Self::claim(&slots, max).await {
                return reservation;
            }
        }

        let mut slots = self.slots.write().await;
        // Another attach may have spawned a worker or a session may have
        // finished while the read lock was released.
        if let Some(reservation) = Self::claim(&slots, max).await {
            return reservation;
        }

        let slot = self.spawn_worker(slots.len());
        let reservation = Reservation {
            worker: slot.id,
            load: slot.load.clone(),
            sender: slot.sender.clone(),
        };
        slots.push(slot);
        reservation
    }

    /// First slot strictly below `max`, incremented under its own lock.
    async fn claim(slots: &[HandlerSlot], max: usize) -> Option<Reservation> {
        for slot in slots {
            let mut load = slot.load.lock().await;
            if *load < max {
                *load += 1;
                return Some(Reservation {
                    worker: slot.id,
                    load: slot.load.clone(),
                    sender: slot.sender.clone(),
                });
            }
        }
        None
    }

    /// Spawn a worker that starts out owning one reserved session.
    fn spawn_worker(&self, id: usize) -> HandlerSlot {
        let (sender, inbox) = mpsc::channel(self.config.inbox_capacity);
        let load = Arc::new(Mutex::new(1));
        let worker = Worker::new(id, inbox, load.clone());
        let task = tokio::spawn(worker.run());
        log::info!("Created and spawned worker {}", id);

        HandlerSlot {
            id,
            load,
            sender,
            task,
        }
    }

    pub async fn worker_count(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Attached session count of every worker, in creation order.
    pub async fn session_counts(&self) -> Vec<usize> {
        let slots = self.slots.read().await;
        let mut counts = Vec::with_capacity(slots.len());
        for slot in slots.iter() {
            counts.push(*slot.load.lock().await);
        }
        counts
    }

    /// Stop every worker once it has drained its inbox. The pool stays
    /// usable; later attaches spawn fresh workers.
    pub async fn shutdown(&self) {
        let slots = std::mem::take(&mut *self.slots.write().await);
        let count = slots.len();

        for slot in &slots {
            if slot.sender.send(WorkerMessage::Shutdown).await.is_err() {
                log::warn!("Worker {} already stopped", slot.id);
            }
        }
        for slot in slots {
            if let Err(e) = slot.task.await {
                log::error!("Worker {} panicked: {}", slot.id, e);
            }
        }

        log::info!("Worker pool shut down {} workers", count);
    }
}
