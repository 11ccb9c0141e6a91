//! Typed error hierarchy for the jamf-tool crate.
//!
//! `ToolError` gives every failure boundary a structured variant so that
//! callers can:
//! - Distinguish the failure category (unknown object type, terminal HTTP
//!   statuses, transient server trouble, transport failure, parse failure).
//! - Inspect the original cause via `source()` (thiserror derives this
//!   automatically from `#[source]`/`#[from]` fields).
//! - Display a human-readable message carrying the relevant context
//!   (object type, status code, what was being attempted).
//!
//! The HTTP-status variants mirror how the server's responses are treated
//! operationally: `Conflict` and `NotFound` are terminal but reported as
//! warnings by callers, `Permission` is terminal and reported as an error
//! (it usually means fixable credential misconfiguration), and `Transient`
//! is retryable up to a fixed budget before degrading to a warning.
//! `Network` wraps `reqwest::Error` for transport-level failures (DNS, TCP,
//! TLS) that never produced an HTTP status code; it is propagated rather
//! than retried so a systemic outage is not masked by the retry loop.

/// Unified error type for all jamf-tool library operations.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// An object-type string did not match any entry in the endpoint
    /// catalog. This is a programming or configuration error and callers
    /// should fail fast rather than continue.
    #[error("unknown object type '{0}'")]
    UnknownObjectType(String),

    /// Token acquisition at the auth endpoint failed.
    ///
    /// Covers non-2xx responses from `api/v1/auth/token` (bad credentials,
    /// disabled accounts) as well as malformed token responses. The
    /// `message` includes the HTTP status and response body when available.
    #[error("authentication failed: {message}")]
    Auth {
        /// Human-readable description including status and body when known.
        message: String,
        /// The underlying transport or parse error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The server returned 409 for this operation. Terminal, non-retryable.
    #[error("{context}: conflict (409)")]
    Conflict {
        /// What was being attempted when the conflict was reported.
        context: String,
    },

    /// The server returned 404 for this operation. Terminal.
    #[error("{context}: not found (404)")]
    NotFound {
        /// What was being attempted when the object was not found.
        context: String,
    },

    /// The server returned 401 for this operation. Terminal; usually means
    /// the account lacks the required API privilege.
    #[error("{context}: permission denied (401)")]
    Permission {
        /// What was being attempted when access was denied.
        context: String,
    },

    /// The server returned a status outside the classified taxonomy
    /// (commonly a 5xx). Retryable up to the attempt budget.
    #[error("{context}: server returned {status}")]
    Transient {
        /// The unclassified HTTP status code.
        status: u16,
        /// What was being attempted.
        context: String,
    },

    /// JSON deserialization failed when parsing an API response body.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// A network-level failure (DNS resolution, TCP connection, TLS
    /// handshake, request timeout). No HTTP status code is available
    /// because the request did not complete.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Filesystem failure in the shared workspace (cookie jar, response
    /// artifacts) or while writing an export file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failure while writing an export file.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn unknown_object_type_names_the_offender() {
        let err = ToolError::UnknownObjectType("widget".to_string());
        assert!(err.to_string().contains("'widget'"));
    }

    #[test]
    fn auth_error_with_source_chains_correctly() {
        let json_err: serde_json::Error = serde_json::from_str::<String>("not-json").unwrap_err();
        let err = ToolError::Auth {
            message: "failed to parse token response".to_string(),
            source: Some(Box::new(json_err)),
        };
        assert!(
            err.source().is_some(),
            "Auth error with source should have a chained cause"
        );
    }

    #[test]
    fn status_variants_include_context_and_code() {
        let err = ToolError::Permission {
            context: "DELETE policy 42".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DELETE policy 42"));
        assert!(msg.contains("401"));

        let err = ToolError::Transient {
            status: 502,
            context: "GET packages".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("502"));
        assert!(msg.contains("GET packages"));
    }

    #[test]
    fn parse_error_wraps_serde_json() {
        let json_err: serde_json::Error =
            serde_json::from_str::<String>("{{bad json}}").unwrap_err();
        let err = ToolError::Parse(json_err);
        assert!(err.to_string().contains("failed to parse response"));
        assert!(err.source().is_some());
    }

    #[test]
    fn error_is_send_and_sync() {
        // ToolError must be Send + Sync for use across async task boundaries.
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ToolError>();
    }
}
