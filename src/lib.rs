//! Front-end runtime helpers for the e-learning site.
//!
//! - [`cache`] / [`utils`]: memoized class-name joining (`cn`, `cn!`,
//!   [`ClassNameBuilder`]) with FIFO eviction.
//! - [`preload`]: the route registry that deduplicates and tracks lazy chunk
//!   preloads ([`PreloadCoordinator`]).
//! - [`strategies`]: when to preload (start-up, idle, hover, visibility,
//!   network class).
//! - [`web`], [`hooks`], [`components`]: browser and Yew wiring.

pub mod cache;
pub mod components;
pub mod config;
pub mod hooks;
pub mod loader;
pub mod logging;
pub mod preload;
pub mod strategies;
pub mod testing;
pub mod utils;
pub mod web;

pub use cache::{CacheStats, ClassNameCache};
pub use loader::{FnLoader, LoadError, UnitLoader};
pub use preload::{
    PreloadCoordinator, PreloadState, PreloadStatus, Priority, RouteDescriptor, Subscription,
};
pub use utils::{cn, ClassFragment, ClassNameBuilder};
