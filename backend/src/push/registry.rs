use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::PushEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::AbortHandle;

use super::sse::PushStream;

/// Called when a session's expiry timer fires.
#[async_trait]
pub trait SessionLifecycle: Send + Sync {
    async fn session_expired(&self, session_id: &str);
}

struct Connection {
    id: u64,
    sender: UnboundedSender<PushEvent>,
}

struct Inner {
    connections: Mutex<HashMap<String, Connection>>,
    timers: Mutex<HashMap<String, AbortHandle>>,
    lifecycle: Arc<dyn SessionLifecycle>,
    next_id: AtomicU64,
}

/// Maps each session to at most one live push connection and keeps an expiry
/// timer per session in step with it.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Inner>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl SessionRegistry {
    pub fn new(lifecycle: Arc<dyn SessionLifecycle>) -> Self {
        Self {
            inner: Arc::new(Inner {
                connections: Mutex::new(HashMap::new()),
                timers: Mutex::new(HashMap::new()),
                lifecycle,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a new connection for the session. A previous connection is
    /// replaced and its stream ends.
    pub fn connect(&self, session_id: &str, expires_at: DateTime<Utc>) -> PushStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let _ = sender.send(PushEvent::Connected);
        let previous = guard(&self.inner.connections)
            .insert(session_id.to_string(), Connection { id, sender });
        if previous.is_some() {
            log::info!("Push connection replaced for session");
        }

        self.start_timer(session_id, expires_at);
        log::debug!("Push connection {} registered", id);
        PushStream::new(receiver, self.clone(), session_id.to_string(), id)
    }

    fn start_timer(&self, session_id: &str, expires_at: DateTime<Utc>) {
        let delay = (expires_at - Utc::now()).to_std().unwrap_or_default();
        let registry = self.clone();
        let owned_id = session_id.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            registry.expire(&owned_id).await;
        })
        .abort_handle();

        if let Some(old) = guard(&self.inner.timers).insert(session_id.to_string(), handle) {
            old.abort();
        }
    }

    async fn expire(&self, session_id: &str) {
        let connection = guard(&self.inner.connections).remove(session_id);
        if let Some(connection) = connection {
            let _ = connection.sender.send(PushEvent::SessionExpired);
        }
        guard(&self.inner.timers).remove(session_id);

        log::info!("Session expired, notifying lifecycle");
        self.inner.lifecycle.session_expired(session_id).await;
    }

    /// Drops the mapping only while `connection_id` is still the registered one.
    pub fn disconnect(&self, session_id: &str, connection_id: u64) {
        let mut connections = guard(&self.inner.connections);
        let current = connections
            .get(session_id)
            .map(|connection| connection.id == connection_id)
            .unwrap_or(false);
        if !current {
            return;
        }
        connections.remove(session_id);
        drop(connections);

        if let Some(timer) = guard(&self.inner.timers).remove(session_id) {
            timer.abort();
        }
        log::debug!("Push connection {} closed", connection_id);
    }

    /// Logout: forget the connection and the timer.
    pub fn remove_session(&self, session_id: &str) {
        guard(&self.inner.connections).remove(session_id);
        if let Some(timer) = guard(&self.inner.timers).remove(session_id) {
            timer.abort();
        }
    }

    pub fn is_connected(&self, session_id: &str) -> bool {
        guard(&self.inner.connections).contains_key(session_id)
    }

    /// Best effort. Returns whether a live connection took the event.
    pub fn push(&self, session_id: &str, event: PushEvent) -> bool {
        let connections = guard(&self.inner.connections);
        match connections.get(session_id) {
            Some(connection) => {
                let name = event.name();
                let delivered = connection.sender.send(event).is_ok();
                if !delivered {
                    log::warn!("Dropped {} event for a closed connection", name);
                }
                delivered
            }
            None => false,
        }
    }

    pub fn connection_count(&self) -> usize {
        guard(&self.inner.connections).len()
    }
}
