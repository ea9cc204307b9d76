//! Error types for injector operations
//!
//! Registry operations themselves never fail; only configuration checks, the
//! ambient install and `when_ready` abandonment do. A key that never arrives is
//! not an error: the waiting target simply never fires.

use thiserror::Error;

/// Errors from injector operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    #[error("Invalid event name for {field}: {reason}")]
    InvalidEventName { field: &'static str, reason: String },

    #[error("Invalid event capacity {capacity}: must be between 1 and {max}")]
    InvalidCapacity { capacity: usize, max: usize },

    #[error("Injector dropped before keys were published: {}", keys.join(", "))]
    Abandoned { keys: Vec<String> },

    #[error("Ambient injector already initialized")]
    AmbientAlreadyInitialized,
}

/// Result of injector operations
pub type InjectResult<T> = Result<T, InjectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = InjectError::InvalidCapacity { capacity: 0, max: 16 };
        assert_eq!(err.to_string(), "Invalid event capacity 0: must be between 1 and 16");

        let err = InjectError::Abandoned {
            keys: vec!["db".to_string(), "cache".to_string()],
        };
        assert_eq!(err.to_string(), "Injector dropped before keys were published: db, cache");
    }
}
