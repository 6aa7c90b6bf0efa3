//! Policies that decide *when* to ask the coordinator for a preload.
//!
//! Each strategy only reacts to signals handed to it (start-up, idle, hover,
//! visibility, network change). The browser plumbing that produces those
//! signals lives in [`crate::web`].

use crate::preload::{PreloadCoordinator, Priority};
use futures::future::{abortable, AbortHandle, LocalBoxFuture};
use futures::FutureExt;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

/// Source of delays for debounced strategies.
pub trait Timer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

impl<T: Timer + ?Sized> Timer for Rc<T> {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        (**self).sleep(duration)
    }
}

/// Preload `paths` right away. Meant for application start.
pub fn preload_critical<I, S>(coordinator: &PreloadCoordinator, paths: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    coordinator.request_preload_many(paths);
}

/// Preload `paths` once `idle` resolves.
pub fn preload_when_idle<I, S>(
    coordinator: &PreloadCoordinator,
    paths: I,
    idle: impl Future<Output = ()> + 'static,
) where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let paths: Vec<String> = paths.into_iter().map(|p| p.as_ref().to_string()).collect();
    if paths.is_empty() {
        return;
    }
    let handle = coordinator.clone();
    coordinator.spawn(async move {
        idle.await;
        debug!("idle period reached, preloading {} routes", paths.len());
        handle.request_preload_many(paths);
    });
}

/// Critical routes now, high-priority routes when idle. Low-priority routes
/// are left to hover and visibility triggers.
pub fn preload_by_priority(
    coordinator: &PreloadCoordinator,
    idle: impl Future<Output = ()> + 'static,
) {
    let routes = coordinator.routes();
    let critical = routes
        .iter()
        .filter(|r| r.priority == Priority::Critical)
        .map(|r| r.path.as_str());
    preload_critical(coordinator, critical);

    let high = routes
        .iter()
        .filter(|r| r.priority == Priority::High)
        .map(|r| r.path.clone());
    preload_when_idle(coordinator, high, idle);
}

/// Debounced preloading on hover intent.
pub struct HoverPreloader {
    coordinator: PreloadCoordinator,
    timer: Rc<dyn Timer>,
    delay: Duration,
}

impl HoverPreloader {
    pub fn new(coordinator: PreloadCoordinator, timer: impl Timer + 'static, delay: Duration) -> Self {
        Self {
            coordinator,
            timer: Rc::new(timer),
            delay,
        }
    }

    /// Preload `path` after the hover delay unless the returned intent is
    /// cancelled or dropped first.
    pub fn hover(&self, path: &str) -> HoverIntent {
        if self.coordinator.is_preloaded(path) || self.coordinator.is_loading(path) {
            return HoverIntent { abort: None };
        }

        let coordinator = self.coordinator.clone();
        let path = path.to_string();
        let delay = self.timer.sleep(self.delay);
        let (task, abort) = abortable(async move {
            delay.await;
            coordinator.request_preload(&path);
        });
        self.coordinator.spawn(task.map(|_| ()));
        HoverIntent { abort: Some(abort) }
    }
}

/// Pending hover preload. Dropping it cancels the preload if the delay has
/// not elapsed yet.
#[must_use = "dropping a HoverIntent cancels it"]
pub struct HoverIntent {
    abort: Option<AbortHandle>,
}

impl HoverIntent {
    pub fn cancel(mut self) {
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
    }

    /// Let the preload fire even after this handle is gone.
    pub fn detach(mut self) {
        self.abort = None;
    }

    pub fn is_armed(&self) -> bool {
        self.abort.as_ref().is_some_and(|a| !a.is_aborted())
    }
}

impl Drop for HoverIntent {
    fn drop(&mut self) {
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
    }
}

/// What an observer should do after a visibility callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Continue,
    Stop,
}

/// Fires one preload the first time its region becomes visible.
pub struct VisibilityTrigger {
    coordinator: PreloadCoordinator,
    path: String,
    fired: Cell<bool>,
}

impl VisibilityTrigger {
    pub fn new(coordinator: PreloadCoordinator, path: impl Into<String>) -> Self {
        Self {
            coordinator,
            path: path.into(),
            fired: Cell::new(false),
        }
    }

    pub fn on_visibility_change(&self, visible: bool) -> Observation {
        if self.fired.get() {
            return Observation::Stop;
        }
        if !visible {
            return Observation::Continue;
        }
        self.fired.set(true);
        self.coordinator.request_preload(&self.path);
        Observation::Stop
    }

    pub fn has_fired(&self) -> bool {
        self.fired.get()
    }
}

/// Effective connection type as reported by the Network Information API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionClass {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
    /// The host exposes no connection information.
    #[serde(rename = "unknown")]
    Unknown,
}

impl ConnectionClass {
    pub fn from_effective_type(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => ConnectionClass::Slow2g,
            "2g" => ConnectionClass::TwoG,
            "3g" => ConnectionClass::ThreeG,
            "4g" => ConnectionClass::FourG,
            _ => ConnectionClass::Unknown,
        }
    }

    fn rank(self) -> Option<u8> {
        match self {
            ConnectionClass::Slow2g => Some(0),
            ConnectionClass::TwoG => Some(1),
            ConnectionClass::ThreeG => Some(2),
            ConnectionClass::FourG => Some(3),
            ConnectionClass::Unknown => None,
        }
    }

    /// Unknown connections are treated as fast enough.
    pub fn meets(self, minimum: ConnectionClass) -> bool {
        match (self.rank(), minimum.rank()) {
            (Some(actual), Some(min)) => actual >= min,
            _ => true,
        }
    }
}

/// What the host reports about the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// `navigator.connection.effectiveType`, or `Unknown` without the API.
    pub class: ConnectionClass,
    /// `navigator.connection.saveData`: the user asked for reduced data usage.
    pub save_data: bool,
}

impl Default for NetworkInfo {
    fn default() -> Self {
        Self {
            class: ConnectionClass::Unknown,
            save_data: false,
        }
    }
}

/// Preloads a fixed list only while the connection is fast enough.
pub struct NetworkAwarePreloader {
    coordinator: PreloadCoordinator,
    paths: Vec<String>,
    minimum: ConnectionClass,
    respect_save_data: bool,
}

impl NetworkAwarePreloader {
    pub fn new<I, S>(coordinator: PreloadCoordinator, paths: I, minimum: ConnectionClass) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            coordinator,
            paths: paths.into_iter().map(Into::into).collect(),
            minimum,
            respect_save_data: true,
        }
    }

    pub fn respect_save_data(mut self, respect: bool) -> Self {
        self.respect_save_data = respect;
        self
    }

    /// Call on start-up and on every network change. Returns whether the
    /// list was requested.
    pub fn evaluate(&self, info: NetworkInfo) -> bool {
        if self.respect_save_data && info.save_data {
            debug!("save-data requested, skipping network-aware preload");
            return false;
        }
        if !info.class.meets(self.minimum) {
            debug!("connection {:?} below {:?}, skipping preload", info.class, self.minimum);
            return false;
        }
        self.coordinator.request_preload_many(&self.paths);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preload::RouteDescriptor;
    use crate::testing::{ManualTimer, MockLoader};
    use futures::channel::oneshot;
    use futures::executor::LocalPool;

    fn setup(paths: &[&str]) -> (LocalPool, Rc<MockLoader>, PreloadCoordinator) {
        let pool = LocalPool::new();
        let loader = Rc::new(MockLoader::resolving());
        let coordinator = PreloadCoordinator::new(loader.clone(), pool.spawner());
        for path in paths {
            coordinator.register_route(RouteDescriptor::new(*path));
        }
        (pool, loader, coordinator)
    }

    #[test]
    fn critical_preloads_immediately() {
        let (mut pool, loader, c) = setup(&["/", "/courses"]);
        preload_critical(&c, ["/", "/courses"]);
        assert!(c.is_loading("/"));
        pool.run_until_stalled();
        assert_eq!(loader.calls(), vec!["/", "/courses"]);
        assert_eq!(c.status().preloaded_count, 2);
    }

    #[test]
    fn idle_waits_for_signal() {
        let (mut pool, loader, c) = setup(&["/community"]);
        let (tx, rx) = oneshot::channel::<()>();
        preload_when_idle(&c, ["/community"], async move {
            let _ = rx.await;
        });
        pool.run_until_stalled();
        assert!(loader.calls().is_empty());

        tx.send(()).unwrap();
        pool.run_until_stalled();
        assert!(c.is_preloaded("/community"));
    }

    #[test]
    fn priority_split() {
        let (mut pool, loader, c) = setup(&[]);
        c.register_route(RouteDescriptor::new("/").with_priority(Priority::Critical));
        c.register_route(RouteDescriptor::new("/courses").with_priority(Priority::High));
        c.register_route(RouteDescriptor::new("/trust"));

        let (tx, rx) = oneshot::channel::<()>();
        preload_by_priority(&c, async move {
            let _ = rx.await;
        });
        pool.run_until_stalled();
        assert_eq!(loader.calls(), vec!["/"]);

        tx.send(()).unwrap();
        pool.run_until_stalled();
        assert_eq!(loader.calls(), vec!["/", "/courses"]);
        assert_eq!(c.state("/trust"), Some(crate::preload::PreloadState::Pending));
    }

    #[test]
    fn hover_fires_after_delay() {
        let (mut pool, loader, c) = setup(&["/features"]);
        let timer = Rc::new(ManualTimer::default());
        let hover = HoverPreloader::new(c.clone(), timer.clone(), Duration::from_millis(100));

        let intent = hover.hover("/features");
        pool.run_until_stalled();
        assert!(intent.is_armed());
        assert!(loader.calls().is_empty());
        assert_eq!(timer.requested(), vec![Duration::from_millis(100)]);

        timer.fire_all();
        pool.run_until_stalled();
        assert!(c.is_preloaded("/features"));
        intent.detach();
    }

    #[test]
    fn hover_cancelled_before_delay_never_loads() {
        let (mut pool, loader, c) = setup(&["/features"]);
        let timer = Rc::new(ManualTimer::default());
        let hover = HoverPreloader::new(c.clone(), timer.clone(), Duration::from_millis(100));

        hover.hover("/features").cancel();
        timer.fire_all();
        pool.run_until_stalled();
        assert!(loader.calls().is_empty());
        assert!(!c.is_preloaded("/features"));
    }

    #[test]
    fn hover_on_preloaded_route_is_inert() {
        let (mut pool, _loader, c) = setup(&["/guide"]);
        c.request_preload("/guide");
        pool.run_until_stalled();

        let timer = Rc::new(ManualTimer::default());
        let hover = HoverPreloader::new(c.clone(), timer.clone(), Duration::from_millis(50));
        let intent = hover.hover("/guide");
        assert!(!intent.is_armed());
        assert!(timer.requested().is_empty());
    }

    #[test]
    fn visibility_fires_once() {
        let (mut pool, loader, c) = setup(&["/community"]);
        let trigger = VisibilityTrigger::new(c.clone(), "/community");

        assert_eq!(trigger.on_visibility_change(false), Observation::Continue);
        assert!(!trigger.has_fired());
        assert_eq!(trigger.on_visibility_change(true), Observation::Stop);
        c.clear_preloaded();
        assert_eq!(trigger.on_visibility_change(true), Observation::Stop);
        pool.run_until_stalled();
        assert_eq!(loader.calls(), vec!["/community"]);
    }

    #[test]
    fn connection_class_parsing_and_threshold() {
        assert_eq!(ConnectionClass::from_effective_type("4g"), ConnectionClass::FourG);
        assert_eq!(ConnectionClass::from_effective_type(" Slow-2G "), ConnectionClass::Slow2g);
        assert_eq!(ConnectionClass::from_effective_type("5g"), ConnectionClass::Unknown);
        assert!(ConnectionClass::FourG.meets(ConnectionClass::ThreeG));
        assert!(!ConnectionClass::TwoG.meets(ConnectionClass::ThreeG));
        assert!(ConnectionClass::Unknown.meets(ConnectionClass::FourG));
    }

    #[test]
    fn network_aware_reevaluates_on_change() {
        let (mut pool, loader, c) = setup(&["/dashboard", "/courses"]);
        let preloader =
            NetworkAwarePreloader::new(c.clone(), ["/dashboard", "/courses"], ConnectionClass::FourG);

        let slow = NetworkInfo {
            class: ConnectionClass::ThreeG,
            save_data: false,
        };
        assert!(!preloader.evaluate(slow));
        pool.run_until_stalled();
        assert!(loader.calls().is_empty());

        let fast = NetworkInfo {
            class: ConnectionClass::FourG,
            save_data: false,
        };
        assert!(preloader.evaluate(fast));
        pool.run_until_stalled();
        assert_eq!(c.status().preloaded_count, 2);
    }

    #[test]
    fn network_aware_honors_save_data() {
        let (_pool, loader, c) = setup(&["/dashboard"]);
        let info = NetworkInfo {
            class: ConnectionClass::FourG,
            save_data: true,
        };
        let strict = NetworkAwarePreloader::new(c.clone(), ["/dashboard"], ConnectionClass::ThreeG);
        assert!(!strict.evaluate(info));
        let lenient = NetworkAwarePreloader::new(c.clone(), ["/dashboard"], ConnectionClass::ThreeG)
            .respect_save_data(false);
        assert!(lenient.evaluate(info));
        assert_eq!(loader.calls(), vec!["/dashboard"]);
    }
}
