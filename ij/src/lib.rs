//! Injector - named-value registry with deferred readiness joins
//!
//! Producers publish values under string keys at any time. Consumers ask to be
//! notified once one or more keys are available, before or after publication.
//! It is a multi-key "wait until all ready" join, not a dependency-injection
//! framework: no type resolution, no constructor wiring, no lifecycles.
//!
//! # Layers
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ ambient (process-wide default Injector)      │
//! ├──────────────────────────────────────────────┤
//! │ Injector: when / capture / inject / events   │
//! ├──────────────────────────────────────────────┤
//! │ Services: values + pending waiters           │
//! ├──────────────────────────────────────────────┤
//! │ Turns: deferred work, drained by settle()    │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use injector::Injector;
//! use std::sync::{Arc, Mutex};
//!
//! let inj: Injector<&'static str> = Injector::new();
//! let seen = Arc::new(Mutex::new(None));
//!
//! let s = seen.clone();
//! inj.when(["db", "cache"], move |values| *s.lock().unwrap() = Some(values));
//!
//! inj.set("db", "conn1");
//! inj.set("cache", "redis");
//! inj.settle();
//!
//! assert_eq!(*seen.lock().unwrap(), Some(vec!["conn1", "redis"]));
//! ```

pub mod ambient;
mod capture;
pub mod cli;
pub mod config;
mod error;
mod events;
mod injector;
mod join;
mod keys;
pub mod scenario;
mod service;
mod store;
mod turns;

pub use capture::{Capture, Replay};
pub use config::{DEFAULT_EVENT_CAPACITY, InjectorConfig, MAX_EVENT_CAPACITY};
pub use error::{InjectError, InjectResult};
pub use events::{EventBus, EventNames, ServiceEvent, ServiceEventKind};
pub use injector::{Injector, Ready};
pub use keys::Keys;
pub use service::Service;
pub use store::{Services, Unfulfilled, Waiter};
pub use turns::{Job, Turns};
