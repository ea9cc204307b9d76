//! Process-wide default injector
//!
//! A convenience for callers that want one shared registry without passing it
//! around. The instance is created on first use (or supplied once with
//! `install`) and lives for the rest of the process. There is no reset.

use std::sync::OnceLock;

use tokio::sync::broadcast;
use tracing::debug;

use crate::capture::Capture;
use crate::error::{InjectError, InjectResult};
use crate::events::ServiceEvent;
use crate::injector::Injector;
use crate::keys::Keys;
use crate::service::Service;
use crate::store::Unfulfilled;

static AMBIENT: OnceLock<Injector> = OnceLock::new();

/// The shared injector, created with default config on first use
pub fn inner() -> &'static Injector {
    AMBIENT.get_or_init(|| {
        debug!("ambient::inner: creating default injector");
        Injector::new()
    })
}

/// Supply the shared injector before anything else touches it
pub fn install(injector: Injector) -> InjectResult<()> {
    AMBIENT
        .set(injector)
        .map_err(|_| InjectError::AmbientAlreadyInitialized)
}

pub fn get(key: &str) -> Option<Service> {
    inner().get(key)
}

pub fn set(key: &str, value: Service) -> Option<Service> {
    inner().set(key, value)
}

pub fn has(key: &str) -> bool {
    inner().has(key)
}

pub fn when<K, F>(keys: K, target: F)
where
    K: Into<Keys>,
    F: FnOnce(Vec<Service>) + Send + 'static,
{
    inner().when(keys, target)
}

pub fn capture<K: Into<Keys>>(keys: K) -> Capture<Service> {
    inner().capture(keys)
}

pub fn inject<K, F>(keys: K, target: F) -> bool
where
    K: Into<Keys>,
    F: FnOnce(Vec<Option<Service>>),
{
    inner().inject(keys, target)
}

pub fn inject_with<K, F, M>(keys: K, target: F, missing: M) -> bool
where
    K: Into<Keys>,
    F: FnOnce(Vec<Option<Service>>),
    M: FnMut(&str) -> bool,
{
    inner().inject_with(keys, target, missing)
}

pub fn list_unfulfilled() -> Option<Vec<Unfulfilled>> {
    inner().list_unfulfilled()
}

pub fn subscribe() -> broadcast::Receiver<ServiceEvent<Service>> {
    inner().subscribe()
}

pub fn settle() -> usize {
    inner().settle()
}
