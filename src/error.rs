//! Runtime Error Types
//!
//! One error enum covers both subsystems. Every kind is distinct and none
//! is recoverable: the first failure propagates to the driver, which aborts
//! saturation without returning a partial store.

use thiserror::Error;

use crate::ir::{MonoType, SourceLoc};

/// Errors raised by the evaluator, the stores, and the fixed-point driver.
#[derive(Error, Debug)]
pub enum Error {
    /// Division or modulo by zero on an integer type.
    #[error("{loc}: arithmetic error: division or modulo by zero")]
    Arithmetic { loc: SourceLoc },

    /// A match expression covered none of the scrutinee's shapes.
    #[error("{loc}: non-exhaustive match")]
    NonExhaustiveMatch { loc: SourceLoc },

    /// A switch expression with no satisfied branch.
    #[error("{loc}: non-exhaustive switch")]
    NonExhaustiveSwitch { loc: SourceLoc },

    /// An explicit raise written in the source program.
    #[error("{loc}: user error")]
    User { loc: SourceLoc },

    /// Internal: the environment has no binding for a variable. Well-formed
    /// IR never triggers this.
    #[error("{loc}: unbound variable '{name}'")]
    UnboundVariable { name: String, loc: SourceLoc },

    /// Internal: a value had the wrong shape for the operation, e.g. the
    /// callee of an ApplyClosure is not a closure.
    #[error("{loc}: type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        loc: SourceLoc,
    },

    /// A rule with a `False` head produced a derivation.
    #[error("{loc}: integrity violation: a rule with a false head was satisfied")]
    IntegrityViolation { loc: SourceLoc },

    /// A host callback failed.
    #[error("host call failed: {message}")]
    Host { message: String },

    /// A negated atom refers to a table defined in the same or a later
    /// stratum.
    #[error("stratification violation: {message}")]
    Stratification { message: String },

    /// No lattice operator bundle is registered for a lattice table's value
    /// type.
    #[error("no lattice operator bundle registered for type {tpe}")]
    MissingLatticeOps { tpe: MonoType },

    /// The configured saturation safety valve tripped.
    #[error("saturation exceeded the configured limit of {limit} iterations")]
    IterationLimit { limit: usize },

    /// A Root or fact document could not be decoded.
    #[error("import error: {0}")]
    Import(String),

    /// Malformed JSON in an imported document.
    #[error("import error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The source location the error originates from, when one exists.
    pub fn loc(&self) -> Option<&SourceLoc> {
        match self {
            Error::Arithmetic { loc }
            | Error::NonExhaustiveMatch { loc }
            | Error::NonExhaustiveSwitch { loc }
            | Error::User { loc }
            | Error::UnboundVariable { loc, .. }
            | Error::TypeMismatch { loc, .. }
            | Error::IntegrityViolation { loc } => Some(loc),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_source_location() {
        let err = Error::Arithmetic {
            loc: SourceLoc::new("main.src", 4, 9),
        };
        assert_eq!(
            err.to_string(),
            "main.src:4:9: arithmetic error: division or modulo by zero"
        );
        assert_eq!(err.loc().map(ToString::to_string), Some("main.src:4:9".to_string()));
    }

    #[test]
    fn test_non_positional_errors_have_no_location() {
        let err = Error::Host {
            message: "boom".to_string(),
        };
        assert!(err.loc().is_none());
    }
}
