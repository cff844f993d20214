//! Fixed-size pool of connected controller sessions.
//!
//! Slots are handed out through a counting semaphore sized to the number of
//! slots that actually connected, plus a queue of idle slot indices. A
//! [`SlotGuard`] gives exclusive use of one session and puts the slot back
//! when dropped.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error, warn};
use tokio::sync::{Mutex as SessionLock, OwnedMutexGuard, OwnedSemaphorePermit, Semaphore};

use crate::error::WlcError;
use crate::session::{DeviceSession, SessionFactory};

struct Slot<S> {
    busy: AtomicBool,
    session: Arc<SessionLock<S>>,
}

pub struct SessionPool<S: DeviceSession> {
    slots: Vec<Slot<S>>,
    idle: Mutex<VecDeque<usize>>,
    permits: Arc<Semaphore>,
}

impl<S: DeviceSession> SessionPool<S> {
    /// Opens `size` sessions from `factory`, each connect retried up to
    /// `connect_retries` times.
    ///
    /// Slots that fail to connect are logged and left out; the pool only
    /// fails when none of them connect.
    pub async fn connect<F>(
        factory: &F,
        size: usize,
        connect_retries: u32,
    ) -> Result<Arc<Self>, WlcError>
    where
        F: SessionFactory<Session = S>,
    {
        let mut slots = Vec::with_capacity(size);
        let mut last_error = None;

        for index in 0..size {
            let mut session = factory.create();
            match session.connect(connect_retries).await {
                Ok(()) => {
                    debug!("pool slot {index} connected");
                    slots.push(Slot {
                        busy: AtomicBool::new(false),
                        session: Arc::new(SessionLock::new(session)),
                    });
                }
                Err(e) => {
                    warn!("pool slot {index} failed to connect: {e}");
                    last_error = Some(e);
                }
            }
        }

        if slots.is_empty() {
            let reason = last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "pool size is zero".to_string());
            error!("no pool slot connected: {reason}");
            return Err(WlcError::ConnectFailure(format!(
                "no pool slot connected: {reason}"
            )));
        }
        if slots.len() < size {
            warn!("session pool degraded to {}/{} slots", slots.len(), size);
        }

        let usable = slots.len();
        debug!("session pool up with {usable} slots");
        Ok(Arc::new(Self {
            slots,
            idle: Mutex::new((0..usable).collect()),
            permits: Arc::new(Semaphore::new(usable)),
        }))
    }

    /// Waits for an idle slot.
    pub async fn acquire(self: &Arc<Self>) -> Result<SlotGuard<S>, WlcError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WlcError::PoolClosed)?;
        self.claim(permit)
    }

    /// Takes an idle slot if one is free right now.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SlotGuard<S>> {
        let permit = self.permits.clone().try_acquire_owned().ok()?;
        match self.claim(permit) {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!("try_acquire: {e}");
                None
            }
        }
    }

    fn claim(self: &Arc<Self>, permit: OwnedSemaphorePermit) -> Result<SlotGuard<S>, WlcError> {
        let index = self
            .idle
            .lock()
            .map_err(|e| WlcError::Internal(format!("idle queue lock error: {e}")))?
            .pop_front()
            .ok_or_else(|| WlcError::Internal("permit granted with no idle slot".to_string()))?;

        let slot = &self.slots[index];
        if slot.busy.swap(true, Ordering::AcqRel) {
            return Err(WlcError::Internal(format!(
                "slot {index} handed out while busy"
            )));
        }
        let session = match slot.session.clone().try_lock_owned() {
            Ok(session) => session,
            Err(_) => {
                slot.busy.store(false, Ordering::Release);
                return Err(WlcError::Internal(format!("slot {index} session is locked")));
            }
        };

        Ok(SlotGuard {
            pool: Arc::clone(self),
            index,
            session: Some(session),
            _permit: permit,
        })
    }

    /// Number of usable (connected) slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently handed out.
    pub fn in_use(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.busy.load(Ordering::Acquire))
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Refuses further acquisitions, then logs out and disconnects every
    /// slot, waiting for in-flight commands to finish first.
    pub async fn shutdown(&self) {
        self.permits.close();
        for (index, slot) in self.slots.iter().enumerate() {
            let mut session = slot.session.lock().await;
            session.disconnect().await;
            debug!("pool slot {index} disconnected");
        }
        debug!("session pool down");
    }

    fn release(&self, index: usize) {
        self.slots[index].busy.store(false, Ordering::Release);
        match self.idle.lock() {
            Ok(mut idle) => idle.push_back(index),
            Err(e) => error!("idle queue lock error, slot {index} lost: {e}"),
        }
    }
}

/// Exclusive use of one pooled session.
pub struct SlotGuard<S: DeviceSession> {
    pool: Arc<SessionPool<S>>,
    index: usize,
    session: Option<OwnedMutexGuard<S>>,
    _permit: OwnedSemaphorePermit,
}

impl<S: DeviceSession> SlotGuard<S> {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<S: DeviceSession> Deref for SlotGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        match self.session.as_deref() {
            Some(session) => session,
            None => unreachable!("slot guard used after release"),
        }
    }
}

impl<S: DeviceSession> DerefMut for SlotGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        match self.session.as_deref_mut() {
            Some(session) => session,
            None => unreachable!("slot guard used after release"),
        }
    }
}

impl<S: DeviceSession> Drop for SlotGuard<S> {
    fn drop(&mut self) {
        // Unlock the session before the slot becomes visible as idle; the
        // permit is returned last, when the field drops.
        self.session.take();
        self.pool.release(self.index);
    }
}
