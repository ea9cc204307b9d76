//! Join descriptor shared by `when` and `capture`
//!
//! Tracks which distinct keys of a request have arrived and fills every
//! position a key occupies. The descriptor is satisfied once each distinct key
//! has arrived at least once; there is no way back.

use crate::keys::Keys;

pub(crate) struct JoinDescriptor<V> {
    keys: Keys,
    /// Distinct keys with their arrival flag, in first-appearance order
    expecting: Vec<(String, bool)>,
    observed: usize,
    values: Vec<Option<V>>,
}

impl<V: Clone> JoinDescriptor<V> {
    pub fn new(keys: Keys) -> Self {
        let expecting = keys.distinct().into_iter().map(|k| (k.to_string(), false)).collect();
        let values = vec![None; keys.len()];
        Self {
            keys,
            expecting,
            observed: 0,
            values,
        }
    }

    pub fn keys(&self) -> &Keys {
        &self.keys
    }

    /// Distinct keys that need a waiter
    pub fn distinct(&self) -> Vec<String> {
        self.expecting.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Record the arrival of `key`
    ///
    /// Returns true only on the arrival that satisfies the descriptor.
    pub fn arrive(&mut self, key: &str, value: V) -> bool {
        let Some(slot) = self.expecting.iter_mut().find(|(k, _)| k == key) else {
            return false;
        };
        if slot.1 {
            return false;
        }
        slot.1 = true;
        self.observed += 1;

        for position in self.keys.positions(key) {
            self.values[position] = Some(value.clone());
        }
        self.is_satisfied()
    }

    pub fn is_satisfied(&self) -> bool {
        self.observed == self.expecting.len()
    }

    /// Distinct keys that have not arrived yet
    pub fn outstanding(&self) -> Vec<String> {
        self.expecting
            .iter()
            .filter(|(_, seen)| !seen)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Positional values with holes for keys that have not arrived
    pub fn partial_values(&self) -> Vec<Option<V>> {
        self.values.clone()
    }

    /// Positional values; complete once the descriptor is satisfied
    pub fn values(&self) -> Vec<V> {
        self.values.iter().flatten().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_satisfied_after_every_distinct_key() {
        let mut join = JoinDescriptor::new(Keys::from(["a", "b"]));
        assert!(!join.is_satisfied());
        assert!(!join.arrive("b", 2));
        assert_eq!(join.outstanding(), vec!["a".to_string()]);
        assert!(join.arrive("a", 1));
        assert_eq!(join.values(), vec![1, 2]);
    }

    #[test]
    fn test_duplicate_key_fills_every_position() {
        let mut join = JoinDescriptor::new(Keys::from(["k", "x", "k"]));
        assert_eq!(join.distinct(), vec!["k".to_string(), "x".to_string()]);
        assert!(!join.arrive("k", 5));
        assert_eq!(join.partial_values(), vec![Some(5), None, Some(5)]);
        assert!(join.arrive("x", 9));
        assert_eq!(join.values(), vec![5, 9, 5]);
    }

    #[test]
    fn test_repeat_arrival_is_ignored() {
        let mut join = JoinDescriptor::new(Keys::from(["a", "b"]));
        assert!(!join.arrive("a", 1));
        assert!(!join.arrive("a", 2));
        assert_eq!(join.partial_values(), vec![Some(1), None]);
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let mut join = JoinDescriptor::new(Keys::from("a"));
        assert!(!join.arrive("z", 1));
        assert!(join.arrive("a", 1));
    }

    #[test]
    fn test_empty_request_is_satisfied() {
        let join: JoinDescriptor<i32> = JoinDescriptor::new(Keys::default());
        assert!(join.is_satisfied());
        assert!(join.values().is_empty());
    }
}
