//! Multi-subscriber change tracking
//!
//! A [`ModifiedEntrySet`] records changed entries for every registered
//! subscriber. Each subscriber drains its own backlog with
//! [`ModifiedEntrySet::get_modified`]; several changes to the same identity
//! between drains collapse into the latest one.
//!
//! Subscribers that stop polling are reaped by a background thread once their
//! idle timeout passes. The thread only runs while somebody is subscribed: when
//! the last subscriber goes away it drops the storage and exits, and the next
//! [`ModifiedEntrySet::start_tracking`] call starts it again.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard, Weak};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use cadence_core::config::TrackerConfig;
use cadence_core::error::TrackerError;

/// Limits and timings for a [`ModifiedEntrySet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSettings {
    /// Maximum number of live subscribers
    pub max_users: usize,
    /// Idle time after which a subscriber is dropped
    pub subscriber_timeout: Duration,
    /// How often the reaper looks for expired subscribers
    pub sweep_interval: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self::from(&TrackerConfig::default())
    }
}

impl From<&TrackerConfig> for TrackerSettings {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            max_users: config.max_users,
            subscriber_timeout: config.subscriber_timeout(),
            sweep_interval: config.sweep_interval(),
        }
    }
}

struct Subscriber<V> {
    backlog: HashMap<String, Arc<V>>,
    expires: Instant,
}

struct State<V> {
    /// `None` while nobody is subscribed and the reaper is stopped
    subscribers: Option<HashMap<String, Subscriber<V>>>,
}

struct Inner<V> {
    name: &'static str,
    settings: TrackerSettings,
    state: RwLock<State<V>>,
}

impl<V> Inner<V> {
    fn lock(&self) -> RwLockWriteGuard<'_, State<V>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop expired subscribers. Returns false once nobody is left, in which
    /// case the storage has been torn down and the reaper must exit.
    fn sweep(&self) -> bool {
        let mut state = self.lock();
        let Some(subscribers) = state.subscribers.as_mut() else {
            return false;
        };

        let now = Instant::now();
        subscribers.retain(|id, sub| {
            let alive = sub.expires > now;
            if !alive {
                warn!(
                    tracker = self.name,
                    subscriber = %id,
                    pending = sub.backlog.len(),
                    "subscriber expired without polling; dropping it"
                );
            }
            alive
        });

        if subscribers.is_empty() {
            state.subscribers = None;
            debug!(tracker = self.name, "no subscribers left; stopping reaper");
            return false;
        }
        true
    }
}

/// Thread-safe change set with independent per-subscriber backlogs
pub struct ModifiedEntrySet<V> {
    inner: Arc<Inner<V>>,
}

impl<V> ModifiedEntrySet<V>
where
    V: Send + Sync + 'static,
{
    /// Create a tracker with default settings
    pub fn new(name: &'static str) -> Self {
        Self::with_settings(name, TrackerSettings::default())
    }

    /// Create a tracker with explicit settings
    pub fn with_settings(name: &'static str, settings: TrackerSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                settings,
                state: RwLock::new(State { subscribers: None }),
            }),
        }
    }

    /// Settings this tracker was created with
    pub fn settings(&self) -> &TrackerSettings {
        &self.inner.settings
    }

    /// Register a new subscriber and return its id
    pub fn start_tracking(&self) -> Result<String, TrackerError> {
        let mut state = self.inner.lock();

        if state.subscribers.is_none() {
            self.spawn_reaper()?;
        }
        let subscribers = state.subscribers.get_or_insert_with(HashMap::new);

        if subscribers.len() >= self.inner.settings.max_users {
            return Err(TrackerError::TooManyUsers(self.inner.settings.max_users));
        }

        let id = Uuid::new_v4().to_string();
        subscribers.insert(
            id.clone(),
            Subscriber {
                backlog: HashMap::new(),
                expires: Instant::now() + self.inner.settings.subscriber_timeout,
            },
        );
        debug!(tracker = self.inner.name, subscriber = %id, "started tracking");
        Ok(id)
    }

    /// Unregister a subscriber; unknown ids are ignored
    pub fn stop_tracking(&self, id: &str) {
        let mut state = self.inner.lock();
        if let Some(subscribers) = state.subscribers.as_mut() {
            if subscribers.remove(id).is_some() {
                debug!(tracker = self.inner.name, subscriber = %id, "stopped tracking");
            }
        }
    }

    /// Record a change for every current subscriber
    pub fn track_modified(&self, identity: impl Into<String>, entry: V) {
        self.track_modified_batch(std::iter::once((identity.into(), entry)));
    }

    /// Record several changes for every current subscriber under one lock
    pub fn track_modified_batch(&self, entries: impl IntoIterator<Item = (String, V)>) {
        let mut state = self.inner.lock();
        let Some(subscribers) = state.subscribers.as_mut() else {
            return;
        };
        if subscribers.is_empty() {
            return;
        }

        let entries: Vec<(String, Arc<V>)> = entries
            .into_iter()
            .map(|(identity, entry)| (identity, Arc::new(entry)))
            .collect();

        for sub in subscribers.values_mut() {
            for (identity, entry) in &entries {
                sub.backlog.insert(identity.clone(), Arc::clone(entry));
            }
        }
    }

    /// Drain everything recorded for `id` since its previous drain.
    ///
    /// Fails with [`TrackerError::UnknownId`] if the subscriber is not
    /// registered or its idle timeout has passed.
    pub fn get_modified(&self, id: &str) -> Result<HashMap<String, Arc<V>>, TrackerError> {
        let mut state = self.inner.lock();
        let subscribers = state
            .subscribers
            .as_mut()
            .ok_or_else(|| TrackerError::UnknownId(id.to_string()))?;

        let now = Instant::now();
        match subscribers.get_mut(id) {
            None => return Err(TrackerError::UnknownId(id.to_string())),
            Some(sub) if sub.expires > now => {
                sub.expires = now + self.inner.settings.subscriber_timeout;
                return Ok(std::mem::take(&mut sub.backlog));
            }
            Some(_) => {}
        }

        // Expired but not swept yet.
        subscribers.remove(id);
        warn!(tracker = self.inner.name, subscriber = %id, "subscriber polled after expiring");
        Err(TrackerError::UnknownId(id.to_string()))
    }

    /// Whether `id` is registered and has not passed its idle timeout
    pub fn is_tracking(&self, id: &str) -> bool {
        let now = Instant::now();
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .as_ref()
            .and_then(|subscribers| subscribers.get(id))
            .is_some_and(|sub| sub.expires > now)
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .as_ref()
            .map_or(0, HashMap::len)
    }

    /// Whether storage is allocated and the reaper is running
    pub fn is_active(&self) -> bool {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .is_some()
    }

    fn spawn_reaper(&self) -> Result<(), TrackerError> {
        let weak: Weak<Inner<V>> = Arc::downgrade(&self.inner);
        let interval = self.inner.settings.sweep_interval;
        let name = self.inner.name;

        thread::Builder::new()
            .name(format!("{}-reaper", name))
            .spawn(move || loop {
                thread::sleep(interval);
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if !inner.sweep() {
                    return;
                }
            })
            .map_err(|e| TrackerError::Backend(format!("failed to start reaper: {}", e)))?;

        info!(tracker = name, "started subscriber reaper");
        Ok(())
    }
}
