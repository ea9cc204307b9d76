//! Capture handles
//!
//! A capture is a join whose consumer is supplied later. Replay targets
//! registered before satisfaction are queued and fired once, in order, when
//! the last key arrives; targets registered afterwards fire immediately.
//! Targets registered while the queue is still being fired join the end of
//! it, so queue order holds across threads.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::join::JoinDescriptor;
use crate::keys::Keys;

/// Target receiving the captured values
pub type Replay<V> = Box<dyn FnOnce(Vec<V>) + Send + 'static>;

struct CaptureState<V> {
    join: JoinDescriptor<V>,
    replays: Vec<Replay<V>>,
    firing: bool,
}

/// Handle returned by `Injector::capture`
pub struct Capture<V> {
    state: Arc<Mutex<CaptureState<V>>>,
}

impl<V> Clone for Capture<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<V> Capture<V>
where
    V: Clone + Send + 'static,
{
    pub(crate) fn new(keys: Keys) -> Self {
        Self {
            state: Arc::new(Mutex::new(CaptureState {
                join: JoinDescriptor::new(keys),
                replays: Vec::new(),
                firing: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CaptureState<V>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the arrival of `key`, firing queued replays on satisfaction
    pub(crate) fn arrive(&self, key: &str, value: V) {
        let values = {
            let mut state = self.lock();
            if !state.join.arrive(key, value) {
                return;
            }
            state.firing = true;
            state.join.values()
        };
        debug!("Capture::arrive: satisfied");

        loop {
            let replays = {
                let mut state = self.lock();
                if state.replays.is_empty() {
                    state.firing = false;
                    break;
                }
                std::mem::take(&mut state.replays)
            };
            for replay in replays {
                replay(values.clone());
            }
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().join.keys().as_slice().to_vec()
    }

    pub(crate) fn distinct(&self) -> Vec<String> {
        self.lock().join.distinct()
    }

    pub fn is_satisfied(&self) -> bool {
        self.lock().join.is_satisfied()
    }

    /// Distinct keys that have not arrived yet
    pub fn outstanding(&self) -> Vec<String> {
        self.lock().join.outstanding()
    }

    /// Fire `target` with the values once every key has arrived
    ///
    /// Fires immediately if already satisfied and no queued replays are still
    /// firing. Each target fires exactly once.
    pub fn when<F>(&self, target: F) -> &Self
    where
        F: FnOnce(Vec<V>) + Send + 'static,
    {
        let mut state = self.lock();
        if !state.join.is_satisfied() || state.firing {
            state.replays.push(Box::new(target));
            debug!(queued = state.replays.len(), "Capture::when: queued replay");
            return self;
        }

        let values = state.join.values();
        drop(state);
        target(values);
        self
    }

    /// Fire `action` now if every key has arrived
    ///
    /// Returns whether the action fired. Nothing is remembered when it does
    /// not, so callers may try again later.
    pub fn apply<F>(&self, action: F) -> bool
    where
        F: FnOnce(Vec<Option<V>>),
    {
        self.apply_with(action, |_| false)
    }

    /// Fire `action` now, asking `missing` to forgive each outstanding key
    ///
    /// Outstanding keys are offered in request order; the first one `missing`
    /// refuses aborts the call. Forgiven keys leave `None` in their positions.
    pub fn apply_with<F, M>(&self, action: F, mut missing: M) -> bool
    where
        F: FnOnce(Vec<Option<V>>),
        M: FnMut(&str) -> bool,
    {
        let (outstanding, values) = {
            let state = self.lock();
            (state.join.outstanding(), state.join.partial_values())
        };

        for key in &outstanding {
            if !missing(key) {
                debug!(%key, "Capture::apply: outstanding key not forgiven");
                return false;
            }
        }

        action(values);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_fire_in_order_on_satisfaction() {
        let capture: Capture<i32> = Capture::new(Keys::from(["a", "b"]));
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            capture.when(move |values| seen.lock().unwrap().push((tag, values)));
        }

        capture.arrive("a", 1);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(capture.outstanding(), vec!["b".to_string()]);

        capture.arrive("b", 2);
        assert!(capture.is_satisfied());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", vec![1, 2]), ("second", vec![1, 2])]
        );

        // Late arrivals do not replay again
        capture.arrive("b", 3);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_replay_registered_while_firing_runs_after_queue() {
        let capture: Capture<i32> = Capture::new(Keys::from("k"));
        let order = Arc::new(Mutex::new(Vec::new()));

        let (o, handle) = (order.clone(), capture.clone());
        capture.when(move |_| {
            o.lock().unwrap().push("first");
            let o = o.clone();
            handle.when(move |_| o.lock().unwrap().push("nested"));
        });
        let o = order.clone();
        capture.when(move |_| o.lock().unwrap().push("second"));

        capture.arrive("k", 1);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "nested"]);

        // Once the queue is drained, late targets fire inline again
        let o = order.clone();
        capture.when(move |_| o.lock().unwrap().push("late"));
        assert_eq!(order.lock().unwrap().last(), Some(&"late"));
    }

    #[test]
    fn test_when_after_satisfaction_fires_inline() {
        let capture: Capture<&str> = Capture::new(Keys::from("k"));
        capture.arrive("k", "v");

        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        capture.when(move |values| *s.lock().unwrap() = Some(values));
        assert_eq!(*seen.lock().unwrap(), Some(vec!["v"]));
    }

    #[test]
    fn test_when_is_chainable() {
        let capture: Capture<i32> = Capture::new(Keys::from("k"));
        let count = Arc::new(Mutex::new(0));
        let (c1, c2) = (count.clone(), count.clone());
        capture
            .when(move |_| *c1.lock().unwrap() += 1)
            .when(move |_| *c2.lock().unwrap() += 1);
        capture.arrive("k", 0);
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn test_apply_without_missing_handler_is_noop_until_satisfied() {
        let capture: Capture<i32> = Capture::new(Keys::from("k"));
        let mut fired = Vec::new();

        assert!(!capture.apply(|v| fired.push(v)));
        assert!(fired.is_empty());

        capture.arrive("k", 4);
        assert!(capture.apply(|v| fired.push(v)));
        assert_eq!(fired, vec![vec![Some(4)]]);
    }

    #[test]
    fn test_apply_with_forgiving_handler() {
        let capture: Capture<i32> = Capture::new(Keys::from(["a", "b", "a"]));
        capture.arrive("b", 2);

        let mut asked = Vec::new();
        let mut fired = None;
        let ok = capture.apply_with(
            |v| fired = Some(v),
            |key| {
                asked.push(key.to_string());
                true
            },
        );
        assert!(ok);
        assert_eq!(asked, vec!["a".to_string()]);
        assert_eq!(fired, Some(vec![None, Some(2), None]));
    }

    #[test]
    fn test_apply_stops_at_first_refusal() {
        let capture: Capture<i32> = Capture::new(Keys::from(["a", "b"]));
        let mut asked = Vec::new();
        let ok = capture.apply_with(
            |_| panic!("action must not fire"),
            |key| {
                asked.push(key.to_string());
                false
            },
        );
        assert!(!ok);
        assert_eq!(asked, vec!["a".to_string()]);
    }
}
