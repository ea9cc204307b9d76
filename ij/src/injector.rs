//! The injector: joins over the key-value store
//!
//! Callers publish values with `set` and wait for one or more keys with
//! `when`, `capture`, or `when_ready`. `inject` is the synchronous best-effort
//! variant that never waits.
//!
//! Nothing waiting on a key ever runs on the caller's stack inside `set` or
//! `when`. That work is deferred to the turn queue, drained by `settle()` or
//! by a notifier task started with `spawn_notifier()`.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::capture::Capture;
use crate::config::InjectorConfig;
use crate::error::{InjectError, InjectResult};
use crate::events::{EventBus, ServiceEvent, ServiceEventKind};
use crate::join::JoinDescriptor;
use crate::keys::Keys;
use crate::service::Service;
use crate::store::{Services, Unfulfilled};
use crate::turns::Turns;

type Target<V> = Box<dyn FnOnce(Vec<V>) + Send + 'static>;

struct Inner<V> {
    config: InjectorConfig,
    services: Services<V>,
    events: EventBus<V>,
    turns: Arc<Turns>,
}

/// Named-value registry with deferred multi-key joins
///
/// Cheap to clone; clones share the same registry.
pub struct Injector<V = Service> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for Injector<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for Injector<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Injector<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an injector with the default event names
    pub fn new() -> Self {
        Self::build(InjectorConfig::default())
    }

    /// Create an injector from a config, validating it first
    pub fn with_config(config: InjectorConfig) -> InjectResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: InjectorConfig) -> Self {
        debug!(?config, "Injector::build: called");
        let turns = Arc::new(Turns::new());
        Self {
            inner: Arc::new(Inner {
                services: Services::new(Arc::clone(&turns)),
                events: EventBus::new(config.event_names(), config.event_capacity),
                config,
                turns,
            }),
        }
    }

    pub fn config(&self) -> &InjectorConfig {
        &self.inner.config
    }

    pub fn ready_event_name(&self) -> &str {
        &self.inner.config.ready_event_name
    }

    pub fn remove_event_name(&self) -> &str {
        &self.inner.config.remove_event_name
    }

    pub fn replace_event_name(&self) -> &str {
        &self.inner.config.replace_event_name
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.services.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.services.has(key)
    }

    /// Publish `value` under `key`
    ///
    /// Returns the replaced value, if any. Emits a Ready event on first
    /// publication and a Replace event on overwrite.
    pub fn set(&self, key: &str, value: V) -> Option<V> {
        let previous = self.inner.services.set(key, value.clone());
        let kind = if previous.is_some() {
            debug!(%key, "Injector::set: replaced");
            ServiceEventKind::Replace
        } else {
            info!(%key, "Service ready");
            ServiceEventKind::Ready
        };
        self.inner.events.emit(kind, key, value);

        previous
    }

    /// Invoke `target` once every key in `keys` has been published
    ///
    /// Values arrive in request order, repeated at every position of a
    /// duplicated key. An empty key list fires `target` immediately with no
    /// values. Otherwise `target` runs on a later turn, even when all keys are
    /// already present.
    pub fn when<K, F>(&self, keys: K, target: F)
    where
        K: Into<Keys>,
        F: FnOnce(Vec<V>) + Send + 'static,
    {
        let keys = keys.into();
        debug!(keys = ?keys.as_slice(), "Injector::when: called");

        match keys.len() {
            0 => target(Vec::new()),
            1 => {
                let turns = Arc::clone(&self.inner.turns);
                self.inner.services.register_waiter(
                    &keys.as_slice()[0],
                    Box::new(move |value| turns.defer(move || target(vec![value]))),
                );
            }
            _ => self.join(keys, Box::new(target)),
        }
    }

    fn join(&self, keys: Keys, target: Target<V>) {
        let join = JoinDescriptor::new(keys);
        let distinct = join.distinct();
        let state = Arc::new(Mutex::new((join, Some(target))));

        for key in distinct {
            let state = Arc::clone(&state);
            let turns = Arc::clone(&self.inner.turns);
            let arrived = key.clone();
            self.inner.services.register_waiter(
                &key,
                Box::new(move |value| {
                    let fire = {
                        let mut guard = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                        let (join, target) = &mut *guard;
                        if join.arrive(&arrived, value) {
                            target.take().map(|target| (target, join.values()))
                        } else {
                            None
                        }
                    };
                    if let Some((target, values)) = fire {
                        turns.defer(move || target(values));
                    }
                }),
            );
        }
    }

    /// Start a join whose consumer is supplied later
    pub fn capture<K: Into<Keys>>(&self, keys: K) -> Capture<V> {
        let keys = keys.into();
        debug!(keys = ?keys.as_slice(), "Injector::capture: called");

        let capture = Capture::new(keys);
        for key in capture.distinct() {
            let handle = capture.clone();
            let arrived = key.clone();
            self.inner
                .services
                .register_waiter(&key, Box::new(move |value| handle.arrive(&arrived, value)));
        }
        capture
    }

    /// Invoke `target` now if every key is present
    ///
    /// Returns whether `target` fired. Never waits.
    pub fn inject<K, F>(&self, keys: K, target: F) -> bool
    where
        K: Into<Keys>,
        F: FnOnce(Vec<Option<V>>),
    {
        self.inject_with(keys, target, |_| false)
    }

    /// Invoke `target` now, asking `missing` to forgive each absent key
    ///
    /// Keys are checked in request order. The first absent key that `missing`
    /// refuses aborts the call without checking the rest; forgiven keys pass
    /// `None` in their positions.
    pub fn inject_with<K, F, M>(&self, keys: K, target: F, mut missing: M) -> bool
    where
        K: Into<Keys>,
        F: FnOnce(Vec<Option<V>>),
        M: FnMut(&str) -> bool,
    {
        let keys = keys.into();
        debug!(keys = ?keys.as_slice(), "Injector::inject: called");

        let mut values = Vec::with_capacity(keys.len());
        for key in keys.iter() {
            let value = self.get(key);
            if value.is_none() && !missing(key) {
                warn!(%key, "Injection aborted: service missing");
                return false;
            }
            values.push(value);
        }

        target(values);
        true
    }

    /// Future resolving once every key in `keys` has been published
    ///
    /// The waiter is registered here, not at the first poll. The future
    /// resolves only while the turn queue is being drained, by
    /// `spawn_notifier()` or by another task calling `settle()`.
    pub fn when_ready<K: Into<Keys>>(&self, keys: K) -> Ready<V> {
        let keys = keys.into();
        let requested = keys.as_slice().to_vec();
        let (tx, rx) = oneshot::channel();
        self.when(keys, move |values| {
            let _ = tx.send(values);
        });
        Ready { rx, keys: requested }
    }

    /// Keys with outstanding waiters, or `None` when nothing is pending
    pub fn list_unfulfilled(&self) -> Option<Vec<Unfulfilled>> {
        self.inner.services.list_unfulfilled()
    }

    /// Receive Ready and Replace events for every later publication
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent<V>> {
        self.inner.events.subscribe()
    }

    /// Run deferred turns until none remain; returns how many ran
    pub fn settle(&self) -> usize {
        self.inner.turns.run_until_idle()
    }

    pub fn pending_turns(&self) -> usize {
        self.inner.turns.pending()
    }

    /// Drain deferred turns on a background tokio task
    ///
    /// The task runs until its handle is aborted.
    pub fn spawn_notifier(&self) -> JoinHandle<()> {
        self.inner.turns.spawn_notifier()
    }
}

/// Future returned by `Injector::when_ready`
///
/// Fails with `InjectError::Abandoned` if every injector handle is dropped
/// before the keys arrive.
pub struct Ready<V> {
    rx: oneshot::Receiver<Vec<V>>,
    keys: Vec<String>,
}

impl<V> Ready<V> {
    /// Keys this future is waiting on
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl<V> Future for Ready<V> {
    type Output = InjectResult<Vec<V>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let polled = Pin::new(&mut self.rx).poll(cx);
        polled.map(|result| {
            result.map_err(|_| InjectError::Abandoned {
                keys: self.keys.clone(),
            })
        })
    }
}
