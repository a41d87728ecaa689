//! Error types for the loanform core.
//!
//! Uses `thiserror` for public API error types. Submission failures are kept
//! as a tagged union so callers can tell transport, decoding and
//! application-reported failures apart without matching on message text.

use std::path::PathBuf;

/// Top-level error type for the loanform core library.
#[derive(Debug, thiserror::Error)]
pub enum LoanformError {
    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a single submission failed to produce a prediction.
///
/// The `Display` output is the bare message: it is what gets interpolated
/// into the rendered `Error: ...` block, so it carries no kind prefix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The request never produced a response (DNS, refused, reset, timeout).
    #[error("{message}")]
    Transport { message: String },

    /// A response arrived but its body was not the expected JSON.
    #[error("{message}")]
    Decode { message: String },

    /// The server answered with `success: false`.
    #[error("{message}")]
    Application { message: String },

    /// A form field could not be turned into a request part.
    #[error("{message}")]
    Payload { message: String },
}

impl SubmitError {
    /// Short machine-readable name of the failure kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitError::Transport { .. } => "transport",
            SubmitError::Decode { .. } => "decode",
            SubmitError::Application { .. } => "application",
            SubmitError::Payload { .. } => "payload",
        }
    }

    /// Whether the server itself reported the failure.
    pub fn is_application(&self) -> bool {
        matches!(self, SubmitError::Application { .. })
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::ParseError {
            message: err.to_string(),
        }
    }
}

/// A type alias for results using the top-level `LoanformError`.
pub type Result<T> = std::result::Result<T, LoanformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_error_display_is_bare_message() {
        let err = SubmitError::Application {
            message: "Invalid income value".into(),
        };
        assert_eq!(err.to_string(), "Invalid income value");

        let err = SubmitError::Transport {
            message: "connection reset".into(),
        };
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn test_submit_error_kinds() {
        let cases = [
            (SubmitError::Transport { message: "x".into() }, "transport"),
            (SubmitError::Decode { message: "x".into() }, "decode"),
            (SubmitError::Application { message: "x".into() }, "application"),
            (SubmitError::Payload { message: "x".into() }, "payload"),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn test_only_application_is_application() {
        assert!(SubmitError::Application { message: "x".into() }.is_application());
        assert!(!SubmitError::Decode { message: "x".into() }.is_application());
    }

    #[test]
    fn test_error_display_wrapped() {
        let err = LoanformError::Submit(SubmitError::Decode {
            message: "expected value at line 1 column 1".into(),
        });
        assert_eq!(
            err.to_string(),
            "Submission error: expected value at line 1 column 1"
        );

        let err = LoanformError::Config(ConfigError::Invalid {
            message: "endpoint.base_url is empty".into(),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid configuration: endpoint.base_url is empty"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LoanformError = io_err.into();
        assert!(matches!(err, LoanformError::Io(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: LoanformError = serde_err.into();
        assert!(matches!(err, LoanformError::Serialization(_)));
    }
}
