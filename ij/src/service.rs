//! Type-erased service values
//!
//! The default registry stores values of unconstrained type. Consumers assert
//! the concrete type they expect at lookup.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

/// A shared, type-erased value published under a key
#[derive(Clone)]
pub struct Service {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Service {
    /// Wrap an owned value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap a value that is already shared
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: type_name::<T>(),
        }
    }

    /// Name of the concrete type held
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Shared handle to the held value if it is a `T`
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// True if both handles point at the same allocation
    pub fn ptr_eq(&self, other: &Service) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service").field("type", &self.type_name).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Pool {
        size: usize,
    }

    #[test]
    fn test_downcast_to_stored_type() {
        let service = Service::new(Pool { size: 4 });
        assert!(service.is::<Pool>());
        assert_eq!(service.downcast_ref::<Pool>(), Some(&Pool { size: 4 }));
        assert_eq!(service.downcast::<Pool>().map(|p| p.size), Some(4));
    }

    #[test]
    fn test_downcast_to_wrong_type() {
        let service = Service::new("conn1".to_string());
        assert!(!service.is::<Pool>());
        assert!(service.downcast_ref::<Pool>().is_none());
        assert!(service.downcast::<u32>().is_none());
    }

    #[test]
    fn test_clones_share_allocation() {
        let shared = Arc::new(Pool { size: 1 });
        let service = Service::from_arc(shared.clone());
        let copy = service.clone();
        assert!(service.ptr_eq(&copy));
        assert!(Arc::ptr_eq(&service.downcast::<Pool>().unwrap(), &shared));
        assert!(service.type_name().ends_with("Pool"));
    }
}
