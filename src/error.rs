/**
 * Error Handling Module
 *
 * DESIGN DECISION: Centralized error types using thiserror for consistent error semantics
 * WHY: Library code must never panic; all errors returned as Result so hosts can degrade
 * gracefully (an unparseable file becomes `Unknown`, not a crash)
 *
 * REASONING CHAIN:
 * 1. thiserror provides ergonomic error derive macros without boilerplate
 * 2. Centralized error types enable consistent error handling across all six analyzers
 * 3. Error conversion (From trait) enables ? operator for error propagation
 * 4. Custom error types provide domain-specific context for debugging
 * 5. Analyzers never panic on malformed source text (SPEC_FULL.md §7) — Error is reserved
 *    for genuinely exceptional conditions: a bad registry response, a malformed policy,
 *    an I/O failure the host surfaced to us
 *
 * PATTERN: Rust error handling best practices
 */

use thiserror::Error;

/// Primary error type for the repolens core analyzers.
///
/// DESIGN DECISION: Enum-based error type with structured variants
/// WHY: Type-safe error handling with exhaustive pattern matching; each variant
/// maps to one of the error kinds named in SPEC_FULL.md §7
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Semantic version or registry JSON failed to parse.
    #[error("parse error: {0}")]
    ParseError(String),

    /// The upstream package registry failed, was unreachable, or the fetch was cancelled.
    #[error("registry error: {0}")]
    RegistryError(String),

    /// A package specifier referred to a package the registry has no record of.
    #[error("unknown package: {0}")]
    UnknownPackage(String),

    /// A custom license policy was malformed (empty rule set, conflicting allow/forbid).
    #[error("policy error: {0}")]
    PolicyError(String),

    /// Generic I/O error surfaced by the host (e.g. a config file that could not be read).
    #[error("I/O error: {0}")]
    Io(String),

    /// Unexpected internal error (lock poisoning, invariant violation).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for repolens core operations.
///
/// DESIGN DECISION: Type alias for consistent Result usage across the library
/// WHY: Reduces boilerplate and ensures every public function returns the same error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ParseError(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages_are_readable() {
        let err = Error::UnknownPackage("left-pad".to_string());
        assert_eq!(err.to_string(), "unknown package: left-pad");

        let err = Error::RegistryError("timed out".to_string());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn errors_are_cloneable_and_comparable() {
        let a = Error::PolicyError("empty forbidden_licenses".to_string());
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, Error::Internal("x".to_string()));
    }

    #[test]
    fn json_errors_convert_to_parse_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn io_errors_convert_to_io_variant() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        match err {
            Error::Io(msg) => assert!(msg.contains("missing")),
            _ => panic!("expected Io variant"),
        }
    }
}
