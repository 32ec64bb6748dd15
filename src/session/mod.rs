//! Conversation sessions — one assistant thread per user.
//!
//! The map itself sits behind a short-lived `std::sync::Mutex` that is never
//! held across an `.await`. Each session additionally owns an async lock; a
//! `SessionLease` holds it for the whole exchange, so a user's messages are
//! processed one at a time and a thread is created at most once per user.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::SessionConfig;

struct SessionSlot {
    thread: Arc<AsyncMutex<Option<String>>>,
    last_used: Mutex<Instant>,
}

impl SessionSlot {
    fn new() -> Self {
        Self {
            thread: Arc::new(AsyncMutex::new(None)),
            last_used: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        if let Ok(mut last) = self.last_used.lock() {
            *last = Instant::now();
        }
    }

    fn last_used(&self) -> Instant {
        self.last_used
            .lock()
            .map(|t| *t)
            .unwrap_or_else(|_| Instant::now())
    }

    /// A session with an exchange in flight must not be evicted.
    fn is_busy(&self) -> bool {
        self.thread.try_lock().is_err()
    }
}

/// Exclusive use of a conversation thread for one exchange.
pub struct SessionLease {
    thread_id: String,
    held: Option<(Arc<SessionSlot>, OwnedMutexGuard<Option<String>>)>,
}

impl SessionLease {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        if let Some((slot, _guard)) = &self.held {
            slot.touch();
        }
    }
}

/// Stores conversation threads by user id with idle and capacity eviction.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<SessionSlot>>>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Acquire the thread for `user_id`, creating it with `create` when the
    /// user has none yet. Anonymous callers always get a fresh, unstored
    /// thread.
    ///
    /// Waits while another exchange for the same user holds its lease.
    pub async fn acquire<F, Fut, E>(
        &self,
        user_id: Option<&str>,
        create: F,
    ) -> Result<SessionLease, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let Some(user_id) = user_id else {
            let thread_id = create().await?;
            debug!(thread_id = %thread_id, "Created anonymous thread");
            return Ok(SessionLease {
                thread_id,
                held: None,
            });
        };

        let slot = self.slot_for(user_id);
        let mut guard = Arc::clone(&slot.thread).lock_owned().await;

        let thread_id = match guard.as_ref() {
            Some(existing) => {
                debug!(user_id, thread_id = %existing, "Reusing thread");
                existing.clone()
            }
            None => {
                let created = create().await?;
                info!(user_id, thread_id = %created, "Created thread for user");
                *guard = Some(created.clone());
                created
            }
        };
        slot.touch();

        Ok(SessionLease {
            thread_id,
            held: Some((slot, guard)),
        })
    }

    /// Get or insert the slot for a user, evicting the least-recently-used
    /// idle session when the store is full.
    fn slot_for(&self, user_id: &str) -> Arc<SessionSlot> {
        let mut sessions = self.lock();
        if let Some(slot) = sessions.get(user_id) {
            slot.touch();
            return Arc::clone(slot);
        }

        if sessions.len() >= self.config.max_sessions {
            let victim = sessions
                .iter()
                .filter(|(_, slot)| !slot.is_busy())
                .min_by_key(|(_, slot)| slot.last_used())
                .map(|(id, _)| id.clone());
            if let Some(victim) = victim {
                sessions.remove(&victim);
                info!(user_id = %victim, "Evicted least-recently-used session");
            }
        }

        let slot = Arc::new(SessionSlot::new());
        sessions.insert(user_id.to_string(), Arc::clone(&slot));
        slot
    }

    /// Remove sessions idle longer than the configured timeout. Returns how
    /// many were removed.
    pub fn prune_idle(&self) -> usize {
        let idle_timeout = self.config.idle_timeout;
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, slot| slot.is_busy() || slot.last_used().elapsed() < idle_timeout);
        let pruned = before - sessions.len();
        if pruned > 0 {
            info!(pruned, remaining = sessions.len(), "Pruned idle sessions");
        }
        pruned
    }

    /// Thread currently stored for a user, if any and not in use.
    pub fn thread_for(&self, user_id: &str) -> Option<String> {
        let slot = self.lock().get(user_id).cloned()?;
        slot.thread.try_lock().ok().and_then(|t| t.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<SessionSlot>>> {
        // A poisoned map is still structurally valid.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Spawn a background task that prunes idle sessions on an interval.
pub fn spawn_prune_task(store: Arc<SessionStore>) -> JoinHandle<()> {
    let period = store.config.prune_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // Skip immediate first tick
        loop {
            interval.tick().await;
            store.prune_idle();
        }
    })
}
