//! Test doubles for the loader and timer seams.
//!
//! Both are single-threaded and deterministic, meant to be driven by
//! `futures::executor::LocalPool`.

use crate::loader::{LoadError, UnitLoader};
use crate::strategies::Timer;
use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use std::cell::RefCell;
use std::collections::HashSet;
use std::time::Duration;

/// Records every load and either settles it at once or holds it until told.
#[derive(Debug, Default)]
pub struct MockLoader {
    hold: bool,
    calls: RefCell<Vec<String>>,
    failing: RefCell<HashSet<String>>,
    held: RefCell<Vec<(String, oneshot::Sender<Result<(), LoadError>>)>>,
}

impl MockLoader {
    /// Every load succeeds immediately unless its key was marked with [`MockLoader::fail`].
    pub fn resolving() -> Self {
        Self::default()
    }

    /// Every load stays in flight until [`MockLoader::resolve`] or [`MockLoader::reject`].
    pub fn holding() -> Self {
        Self {
            hold: true,
            ..Self::default()
        }
    }

    pub fn fail(&self, key: &str) -> &Self {
        self.failing.borrow_mut().insert(key.to_string());
        self
    }

    /// Settle the oldest held load for `key` successfully.
    pub fn resolve(&self, key: &str) -> bool {
        self.settle(key, Ok(()))
    }

    pub fn reject(&self, key: &str, error: LoadError) -> bool {
        self.settle(key, Err(error))
    }

    fn settle(&self, key: &str, result: Result<(), LoadError>) -> bool {
        let sender = {
            let mut held = self.held.borrow_mut();
            match held.iter().position(|(k, _)| k == key) {
                Some(idx) => held.remove(idx).1,
                None => return false,
            }
        };
        sender.send(result).is_ok()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self, key: &str) -> usize {
        self.calls.borrow().iter().filter(|k| *k == key).count()
    }

    pub fn in_flight(&self) -> usize {
        self.held.borrow().len()
    }
}

impl UnitLoader for MockLoader {
    fn load(&self, key: &str) -> LocalBoxFuture<'static, Result<(), LoadError>> {
        self.calls.borrow_mut().push(key.to_string());

        if !self.hold {
            let result = if self.failing.borrow().contains(key) {
                Err(LoadError::Network(format!("mock failure for {}", key)))
            } else {
                Ok(())
            };
            return future::ready(result).boxed_local();
        }

        let (tx, rx) = oneshot::channel();
        self.held.borrow_mut().push((key.to_string(), tx));
        let key = key.to_string();
        async move {
            rx.await
                .unwrap_or_else(|_| Err(LoadError::Network(format!("{} abandoned", key))))
        }
        .boxed_local()
    }
}

/// Timer whose sleeps only finish when [`ManualTimer::fire_all`] is called.
#[derive(Debug, Default)]
pub struct ManualTimer {
    requested: RefCell<Vec<Duration>>,
    waiting: RefCell<Vec<oneshot::Sender<()>>>,
}

impl ManualTimer {
    pub fn fire_all(&self) {
        for waiter in self.waiting.borrow_mut().drain(..) {
            let _ = waiter.send(());
        }
    }

    pub fn requested(&self) -> Vec<Duration> {
        self.requested.borrow().clone()
    }
}

impl Timer for ManualTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        self.requested.borrow_mut().push(duration);
        let (tx, rx) = oneshot::channel();
        self.waiting.borrow_mut().push(tx);
        async move {
            let _ = rx.await;
        }
        .boxed_local()
    }
}
