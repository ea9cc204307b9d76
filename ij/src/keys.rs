//! Key lists accepted by the join operations
//!
//! Every multi-key operation takes either a single key or an ordered list of
//! keys. Duplicates are allowed and each position is filled independently.

use std::collections::HashSet;

/// An ordered list of registry keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keys(Vec<String>);

impl Keys {
    /// Create from any iterator of key-like values
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Distinct keys in order of first appearance
    pub fn distinct(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.iter().filter(|k| seen.insert(*k)).collect()
    }

    /// Positions at which `key` appears
    pub fn positions<'a>(&'a self, key: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.0.iter().enumerate().filter(move |(_, k)| *k == key).map(|(i, _)| i)
    }
}

impl From<&str> for Keys {
    fn from(key: &str) -> Self {
        Self(vec![key.to_string()])
    }
}

impl From<String> for Keys {
    fn from(key: String) -> Self {
        Self(vec![key])
    }
}

impl From<&String> for Keys {
    fn from(key: &String) -> Self {
        Self(vec![key.clone()])
    }
}

impl From<&[&str]> for Keys {
    fn from(keys: &[&str]) -> Self {
        Self::new(keys.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for Keys {
    fn from(keys: [&str; N]) -> Self {
        Self::new(keys)
    }
}

impl From<Vec<&str>> for Keys {
    fn from(keys: Vec<&str>) -> Self {
        Self::new(keys)
    }
}

impl From<Vec<String>> for Keys {
    fn from(keys: Vec<String>) -> Self {
        Self(keys)
    }
}

impl From<&[String]> for Keys {
    fn from(keys: &[String]) -> Self {
        Self(keys.to_vec())
    }
}

impl From<&Vec<String>> for Keys {
    fn from(keys: &Vec<String>) -> Self {
        Self(keys.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_key_conversions() {
        assert_eq!(Keys::from("db").as_slice(), &["db".to_string()]);
        assert_eq!(Keys::from("db".to_string()).len(), 1);
    }

    #[test]
    fn test_list_conversions() {
        let keys = Keys::from(["a", "b", "c"]);
        assert_eq!(keys.len(), 3);
        assert_eq!(keys.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);

        let empty = Keys::from(Vec::<String>::new());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_blank_keys_are_ordinary_keys() {
        let keys = Keys::from(["", " ", ""]);
        assert_eq!(keys.len(), 3);
        assert_eq!(keys.distinct(), vec!["", " "]);
        assert_eq!(keys.positions("").collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_distinct_preserves_first_appearance() {
        let keys = Keys::from(["b", "a", "b", "c", "a"]);
        assert_eq!(keys.distinct(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_positions() {
        let keys = Keys::from(["x", "y", "x"]);
        assert_eq!(keys.positions("x").collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(keys.positions("y").collect::<Vec<_>>(), vec![1]);
        assert_eq!(keys.positions("z").count(), 0);
    }
}
