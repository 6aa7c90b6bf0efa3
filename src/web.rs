//! Browser bindings: executor, timers, loaders and host signals.
//!
//! Everything here talks to `window` and is only meaningful inside a browser.

use crate::cache::clear_class_cache;
use crate::config::{PreloadConfig, IDLE_FALLBACK_MS};
use crate::loader::{LoadError, UnitLoader};
use crate::preload::{PreloadCoordinator, RouteDescriptor};
use crate::strategies::{ConnectionClass, NetworkInfo, Observation, Timer, VisibilityTrigger};
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};
use futures::FutureExt;
use log::warn;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Element, EventTarget, IntersectionObserver, IntersectionObserverEntry};

/// Runs tasks on the browser microtask queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct WasmSpawner;

impl LocalSpawn for WasmSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

/// `setTimeout`-backed timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlooTimer;

impl Timer for GlooTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        gloo_timers::future::sleep(duration).boxed_local()
    }
}

fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

/// File name a unit key is served under: `/dashboard/student` -> `dashboard-student.js`.
pub fn unit_file_name(key: &str) -> String {
    let stem = key.trim_matches('/').replace('/', "-");
    if stem.is_empty() {
        "index.js".to_string()
    } else {
        format!("{}.js", stem)
    }
}

/// Fetches `{base_url}{unit}.js` so the browser caches the chunk.
#[derive(Debug, Clone)]
pub struct FetchLoader {
    base_url: String,
}

impl FetchLoader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}{}", self.base_url, unit_file_name(key))
    }
}

impl UnitLoader for FetchLoader {
    fn load(&self, key: &str) -> LocalBoxFuture<'static, Result<(), LoadError>> {
        let url = self.url_for(key);
        let key = key.to_string();
        async move {
            let window = web_sys::window().ok_or_else(|| LoadError::Js("no window".into()))?;
            let response = JsFuture::from(window.fetch_with_str(&url))
                .await
                .map_err(|e| LoadError::Network(describe(&e)))?;
            let response: web_sys::Response = response
                .dyn_into()
                .map_err(|e| LoadError::Js(describe(&e)))?;
            if !response.ok() {
                return Err(LoadError::NotFound {
                    key,
                    status: response.status(),
                });
            }
            Ok(())
        }
        .boxed_local()
    }
}

/// Delegates to a host function `(key) => Promise`, e.g. a dynamic `import()`.
#[derive(Debug, Clone)]
pub struct JsLoader {
    load_fn: js_sys::Function,
}

impl JsLoader {
    pub fn new(load_fn: js_sys::Function) -> Self {
        Self { load_fn }
    }
}

impl UnitLoader for JsLoader {
    fn load(&self, key: &str) -> LocalBoxFuture<'static, Result<(), LoadError>> {
        let started = self.load_fn.call1(&JsValue::NULL, &JsValue::from_str(key));
        async move {
            let value = started.map_err(|e| LoadError::Script(describe(&e)))?;
            JsFuture::from(js_sys::Promise::resolve(&value))
                .await
                .map(|_| ())
                .map_err(|e| LoadError::Script(describe(&e)))
        }
        .boxed_local()
    }
}

/// Resolves during the next idle period, or after a short timeout where
/// `requestIdleCallback` is unavailable.
pub fn idle() -> LocalBoxFuture<'static, ()> {
    let window = gloo_utils::window();
    let supported = js_sys::Reflect::has(&window, &JsValue::from_str("requestIdleCallback"))
        .unwrap_or(false);
    if supported {
        let (tx, rx) = oneshot::channel::<()>();
        let callback = Closure::once_into_js(move || {
            let _ = tx.send(());
        });
        if window
            .request_idle_callback(callback.unchecked_ref())
            .is_ok()
        {
            return async move {
                let _ = rx.await;
            }
            .boxed_local();
        }
    }
    gloo_timers::future::TimeoutFuture::new(IDLE_FALLBACK_MS).boxed_local()
}

fn connection() -> Option<JsValue> {
    let navigator = gloo_utils::window().navigator();
    js_sys::Reflect::get(&navigator, &JsValue::from_str("connection"))
        .ok()
        .filter(JsValue::is_object)
}

fn read_connection(connection: &JsValue) -> NetworkInfo {
    let class = js_sys::Reflect::get(connection, &JsValue::from_str("effectiveType"))
        .ok()
        .and_then(|v| v.as_string())
        .map(|v| ConnectionClass::from_effective_type(&v))
        .unwrap_or(ConnectionClass::Unknown);
    let save_data = js_sys::Reflect::get(connection, &JsValue::from_str("saveData"))
        .ok()
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    NetworkInfo { class, save_data }
}

/// Snapshot of `navigator.connection`.
pub fn current_network() -> NetworkInfo {
    connection()
        .map(|c| read_connection(&c))
        .unwrap_or_default()
}

/// Removes its `change` listener when dropped.
pub struct NetworkListener {
    target: EventTarget,
    callback: Closure<dyn Fn()>,
}

impl Drop for NetworkListener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback("change", self.callback.as_ref().unchecked_ref());
    }
}

/// Call `on_change` whenever the connection class changes. `None` when the
/// host has no Network Information API.
pub fn on_network_change(on_change: impl Fn(NetworkInfo) + 'static) -> Option<NetworkListener> {
    let connection = connection()?;
    let target: EventTarget = connection.clone().dyn_into().ok()?;
    let callback = Closure::<dyn Fn()>::new(move || on_change(read_connection(&connection)));
    if let Err(err) =
        target.add_event_listener_with_callback("change", callback.as_ref().unchecked_ref())
    {
        warn!("could not watch network changes: {}", describe(&err));
        return None;
    }
    Some(NetworkListener { target, callback })
}

/// Disconnects the underlying `IntersectionObserver` when dropped.
pub struct VisibilityObserver {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>,
}

impl Drop for VisibilityObserver {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

/// Feed `element`'s visibility into `trigger`; stops observing after the
/// first time it becomes visible.
pub fn observe_visibility(
    element: &Element,
    trigger: VisibilityTrigger,
) -> Result<VisibilityObserver, JsValue> {
    let trigger = Rc::new(trigger);
    let callback = Closure::<dyn FnMut(js_sys::Array, IntersectionObserver)>::new(
        move |entries: js_sys::Array, observer: IntersectionObserver| {
            let visible = entries
                .iter()
                .any(|entry| entry.unchecked_into::<IntersectionObserverEntry>().is_intersecting());
            if trigger.on_visibility_change(visible) == Observation::Stop {
                observer.disconnect();
            }
        },
    );
    let observer = IntersectionObserver::new(callback.as_ref().unchecked_ref())?;
    observer.observe(element);
    Ok(VisibilityObserver {
        observer,
        _callback: callback,
    })
}

/// Read `window.__PRELOAD_CONFIG__`, falling back to defaults.
pub fn host_config() -> PreloadConfig {
    let value = js_sys::Reflect::get(&gloo_utils::window(), &JsValue::from_str("__PRELOAD_CONFIG__"))
        .unwrap_or(JsValue::UNDEFINED);
    if value.is_undefined() || value.is_null() {
        return PreloadConfig::default();
    }
    PreloadConfig::from_js(value).unwrap_or_else(|err| {
        warn!("{}; using defaults", err);
        PreloadConfig::default()
    })
}

/// `cn` for JavaScript callers. Strings and non-zero numbers count; every
/// other value is skipped.
#[wasm_bindgen(js_name = cn)]
pub fn cn_js(fragments: &js_sys::Array) -> String {
    let owned: Vec<Option<String>> = fragments
        .iter()
        .map(|v| {
            v.as_string().or_else(|| {
                v.as_f64()
                    .filter(|n| *n != 0.0 && !n.is_nan())
                    .map(|n| n.to_string())
            })
        })
        .collect();
    crate::utils::cn(owned)
}

#[wasm_bindgen(js_name = clearClassNameCache)]
pub fn clear_class_name_cache_js() {
    clear_class_cache();
}

/// A coordinator handle for plain JavaScript hosts.
#[wasm_bindgen(js_name = PreloadCoordinator)]
pub struct JsPreloadCoordinator {
    inner: PreloadCoordinator,
}

#[wasm_bindgen(js_class = PreloadCoordinator)]
impl JsPreloadCoordinator {
    /// `load_fn` receives a unit key and returns a Promise.
    #[wasm_bindgen(constructor)]
    pub fn new(load_fn: js_sys::Function) -> JsPreloadCoordinator {
        JsPreloadCoordinator {
            inner: PreloadCoordinator::new(JsLoader::new(load_fn), WasmSpawner),
        }
    }

    #[wasm_bindgen(js_name = registerRoute)]
    pub fn register_route(&self, descriptor: JsValue) -> Result<(), JsValue> {
        let route: RouteDescriptor = serde_wasm_bindgen::from_value(descriptor)?;
        self.inner.register_route(route);
        Ok(())
    }

    #[wasm_bindgen(js_name = getRoute)]
    pub fn get_route(&self, path: &str) -> Result<JsValue, JsValue> {
        match self.inner.route(path) {
            Some(route) => Ok(serde_wasm_bindgen::to_value(&route)?),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    #[wasm_bindgen(js_name = listRoutes)]
    pub fn list_routes(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.inner.routes())?)
    }

    #[wasm_bindgen(js_name = requestPreload)]
    pub fn request_preload(&self, path: &str) {
        self.inner.request_preload(path);
    }

    #[wasm_bindgen(js_name = requestPreloadMany)]
    pub fn request_preload_many(&self, paths: Vec<String>) {
        self.inner.request_preload_many(paths);
    }

    #[wasm_bindgen(js_name = isPreloaded)]
    pub fn is_preloaded(&self, path: &str) -> bool {
        self.inner.is_preloaded(path)
    }

    #[wasm_bindgen(js_name = isLoading)]
    pub fn is_loading(&self, path: &str) -> bool {
        self.inner.is_loading(path)
    }

    #[wasm_bindgen(js_name = getStatus)]
    pub fn status(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.inner.status())?)
    }

    #[wasm_bindgen(js_name = clearPreloaded)]
    pub fn clear_preloaded(&self) {
        self.inner.clear_preloaded();
    }
}
