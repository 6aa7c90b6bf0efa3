//! Registry and state tracker for lazily loadable routes.
//!
//! Every registered route maps to a *unit key* (its chunk name, or its path
//! when it has none). Each unit is in exactly one of three states:
//!
//! ```text
//! Pending --request_preload--> Loading --ok--> Preloaded
//! Loading --err--> Pending
//! Preloaded --clear_preloaded--> Pending
//! ```
//!
//! The switch to `Loading` happens synchronously inside
//! [`PreloadCoordinator::request_preload`], before the load is spawned, so a
//! second request for the same unit always sees it and does nothing. Load
//! failures are logged and roll the unit back to `Pending`; they never reach
//! the caller.

use crate::loader::{LoadError, UnitLoader};
use futures::task::{LocalSpawn, LocalSpawnExt};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

/// How eagerly a route should be fetched by [`crate::strategies::preload_by_priority`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Needed right after start-up.
    Critical,
    /// Worth fetching once the browser is idle.
    High,
    /// Only on hover or visibility.
    #[default]
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
    /// Registry key; re-registering the same path replaces the descriptor.
    pub path: String,
    /// Name of the loadable unit; several routes may share one chunk.
    #[serde(default)]
    pub chunk: Option<String>,
    /// Tier used by priority-driven preloading.
    #[serde(default)]
    pub priority: Priority,
    /// Request a preload as soon as the route is registered.
    #[serde(default)]
    pub preload_eagerly: bool,
}

impl RouteDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            chunk: None,
            priority: Priority::default(),
            preload_eagerly: false,
        }
    }

    pub fn with_chunk(mut self, chunk: impl Into<String>) -> Self {
        self.chunk = Some(chunk.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn eager(mut self) -> Self {
        self.preload_eagerly = true;
        self
    }

    /// The key the unit is tracked and loaded under.
    pub fn unit_key(&self) -> &str {
        self.chunk.as_deref().unwrap_or(&self.path)
    }
}

/// Where a unit is in its preload lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreloadState {
    Pending,
    Loading,
    Preloaded,
}

/// Aggregate counts over registered routes. The three counts always sum to `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadStatus {
    /// Number of registered routes.
    pub total: usize,
    /// Routes whose unit finished loading.
    pub preloaded_count: usize,
    /// Routes whose unit is in flight.
    pub loading_count: usize,
    /// Routes eligible for a new preload request.
    pub pending_count: usize,
}

#[derive(Default)]
struct State {
    routes: IndexMap<String, RouteDescriptor>,
    loading: HashSet<String>,
    preloaded: HashSet<String>,
}

impl State {
    fn unit_key<'a>(&'a self, path: &'a str) -> &'a str {
        self.routes
            .get(path)
            .map(RouteDescriptor::unit_key)
            .unwrap_or(path)
    }

    fn unit_state(&self, key: &str) -> PreloadState {
        if self.preloaded.contains(key) {
            PreloadState::Preloaded
        } else if self.loading.contains(key) {
            PreloadState::Loading
        } else {
            PreloadState::Pending
        }
    }

    fn status(&self) -> PreloadStatus {
        let mut status = PreloadStatus {
            total: self.routes.len(),
            ..PreloadStatus::default()
        };
        for route in self.routes.values() {
            match self.unit_state(route.unit_key()) {
                PreloadState::Preloaded => status.preloaded_count += 1,
                PreloadState::Loading => status.loading_count += 1,
                PreloadState::Pending => {}
            }
        }
        status.pending_count = status.total - status.preloaded_count - status.loading_count;
        status
    }
}

type Listener = Rc<dyn Fn(&PreloadStatus)>;

struct Inner {
    state: RefCell<State>,
    loader: Box<dyn UnitLoader>,
    spawner: Box<dyn LocalSpawn>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_listener_id: Cell<u64>,
}

/// Shared handle to one preload registry.
///
/// Cloning is cheap and every clone observes the same state. Construct one at
/// application start and hand it to whatever needs it.
#[derive(Clone)]
pub struct PreloadCoordinator {
    inner: Rc<Inner>,
}

impl PartialEq for PreloadCoordinator {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for PreloadCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreloadCoordinator")
            .field("status", &self.status())
            .finish()
    }
}

impl PreloadCoordinator {
    pub fn new(loader: impl UnitLoader + 'static, spawner: impl LocalSpawn + 'static) -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(State::default()),
                loader: Box::new(loader),
                spawner: Box::new(spawner),
                listeners: RefCell::new(Vec::new()),
                next_listener_id: Cell::new(0),
            }),
        }
    }

    /// Insert or replace the route stored under `descriptor.path`.
    pub fn register_route(&self, descriptor: RouteDescriptor) {
        let path = descriptor.path.clone();
        let eager = descriptor.preload_eagerly;
        self.inner.state.borrow_mut().routes.insert(path.clone(), descriptor);
        debug!("registered route {}", path);
        self.notify();

        if eager {
            self.request_preload(&path);
        }
    }

    pub fn route(&self, path: &str) -> Option<RouteDescriptor> {
        self.inner.state.borrow().routes.get(path).cloned()
    }

    /// Snapshot of all routes in registration order.
    pub fn routes(&self) -> Vec<RouteDescriptor> {
        self.inner.state.borrow().routes.values().cloned().collect()
    }

    /// Start loading the route's unit unless it is already loading or loaded.
    /// Unknown paths are ignored.
    pub fn request_preload(&self, path: &str) {
        let key = {
            let mut state = self.inner.state.borrow_mut();
            let Some(route) = state.routes.get(path) else {
                debug!("ignoring preload for unregistered route {}", path);
                return;
            };
            let key = route.unit_key().to_string();
            if state.unit_state(&key) != PreloadState::Pending {
                return;
            }
            state.loading.insert(key.clone());
            key
        };
        debug!("preloading unit {} for {}", key, path);
        self.notify();

        let load = self.inner.loader.load(&key);
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let settle_key = key.clone();
        let task = async move {
            let result = load.await;
            if let Some(inner) = weak.upgrade() {
                PreloadCoordinator { inner }.settle(&settle_key, result);
            }
        };

        if let Err(err) = self.inner.spawner.spawn_local(task) {
            warn!("could not schedule preload of {}: {}", key, err);
            self.inner.state.borrow_mut().loading.remove(&key);
            self.notify();
        }
    }

    /// Request each path independently; one failure does not affect the rest.
    pub fn request_preload_many<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            self.request_preload(path.as_ref());
        }
    }

    fn settle(&self, key: &str, result: Result<(), LoadError>) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.loading.remove(key);
            match &result {
                Ok(()) => {
                    state.preloaded.insert(key.to_string());
                }
                Err(err) => {
                    warn!("failed to preload unit {}: {}", key, err);
                }
            }
        }
        if result.is_ok() {
            debug!("unit {} preloaded", key);
        }
        self.notify();
    }

    pub fn is_preloaded(&self, path: &str) -> bool {
        let state = self.inner.state.borrow();
        state.preloaded.contains(state.unit_key(path))
    }

    pub fn is_loading(&self, path: &str) -> bool {
        let state = self.inner.state.borrow();
        state.loading.contains(state.unit_key(path))
    }

    /// State of a registered route, `None` if the path is unknown.
    pub fn state(&self, path: &str) -> Option<PreloadState> {
        let state = self.inner.state.borrow();
        let route = state.routes.get(path)?;
        Some(state.unit_state(route.unit_key()))
    }

    pub fn status(&self) -> PreloadStatus {
        self.inner.state.borrow().status()
    }

    /// Forget every completed preload. Loads still in flight are untouched
    /// and will mark their unit preloaded when they finish.
    pub fn clear_preloaded(&self) {
        self.inner.state.borrow_mut().preloaded.clear();
        self.notify();
    }

    /// Call `listener` with the new status after every change.
    /// The listener stays registered until the returned handle is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, listener: impl Fn(&PreloadStatus) + 'static) -> Subscription {
        let id = self.inner.next_listener_id.get();
        self.inner.next_listener_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        Subscription {
            inner: Rc::downgrade(&self.inner),
            id,
        }
    }

    fn notify(&self) {
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        if listeners.is_empty() {
            return;
        }
        let status = self.status();
        for listener in listeners {
            listener(&status);
        }
    }

    /// Run a fire-and-forget task on the coordinator's executor.
    pub(crate) fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        if let Err(err) = self.inner.spawner.spawn_local(task) {
            warn!("could not schedule preload task: {}", err);
        }
    }
}

/// Keeps a status listener registered; dropping it unsubscribes.
pub struct Subscription {
    inner: Weak<Inner>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}
