//! Unified error types for the gatesuite workspace.
//!
//! The compose engine and the CLI share this enum; the binary wraps it in
//! `anyhow` at command boundaries.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum SuiteError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The compose text is not valid YAML or has no mapping at its root.
    #[error("parse compose: {message}")]
    Parse {
        /// Description of the parse failure.
        message: String,
    },

    /// The compose document has no usable `services` section.
    #[error("compose missing services")]
    MissingServices,

    /// A topology name does not match any known split definition.
    #[error("unknown topology: {name}")]
    UnknownTopology {
        /// The rejected topology name.
        name: String,
    },

    /// A `gen` mode argument is not one of the accepted values.
    #[error(
        "unknown mode {name:?}. Use: image, build, traefik, traefik-herald, traefik-warden, traefik-stargate, or all"
    )]
    UnknownMode {
        /// The rejected mode argument.
        name: String,
    },

    /// YAML serialization or deserialization failed.
    #[error("yaml error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, SuiteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_topology_names_the_input() {
        let err = SuiteError::UnknownTopology {
            name: "traefik-bogus".into(),
        };
        assert_eq!(err.to_string(), "unknown topology: traefik-bogus");
    }

    #[test]
    fn unknown_mode_lists_accepted_values() {
        let msg = SuiteError::UnknownMode { name: "x".into() }.to_string();
        assert!(msg.contains("traefik-stargate"), "got: {msg}");
        assert!(msg.contains("all"), "got: {msg}");
    }
}
