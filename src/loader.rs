//! The capability that actually materializes a code unit.
//!
//! The coordinator never knows how a unit is fetched; it hands the unit key to
//! a [`UnitLoader`] and only looks at whether the returned future resolved to
//! `Ok` or `Err`.

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Why a unit could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The request never reached the server or was aborted.
    Network(String),
    /// The server answered, but not with the unit.
    NotFound { key: String, status: u16 },
    /// The unit arrived but could not be evaluated.
    Script(String),
    /// A JavaScript exception whose shape we could not interpret.
    Js(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Network(msg) => write!(f, "Network error: {}", msg),
            LoadError::NotFound { key, status } => {
                write!(f, "Unit '{}' not found (HTTP {})", key, status)
            }
            LoadError::Script(msg) => write!(f, "Failed to evaluate unit: {}", msg),
            LoadError::Js(msg) => write!(f, "JavaScript error: {}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

/// Asynchronously fetches the unit identified by `key`.
pub trait UnitLoader {
    fn load(&self, key: &str) -> LocalBoxFuture<'static, Result<(), LoadError>>;
}

impl<T: UnitLoader + ?Sized> UnitLoader for Rc<T> {
    fn load(&self, key: &str) -> LocalBoxFuture<'static, Result<(), LoadError>> {
        (**self).load(key)
    }
}

/// Adapts a closure into a [`UnitLoader`].
pub struct FnLoader<F>(pub F);

impl<F, Fut> UnitLoader for FnLoader<F>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<(), LoadError>> + 'static,
{
    fn load(&self, key: &str) -> LocalBoxFuture<'static, Result<(), LoadError>> {
        (self.0)(key.to_string()).boxed_local()
    }
}
