//! Error taxonomy shared by construction and per-call paths.
//!
//! Construction errors (`MissingArgument`, `InvalidContract`,
//! `UnsupportedType`, `InvalidConfiguration`) are returned synchronously by
//! the factory. Everything else is a per-call outcome delivered through the
//! call's own result channel.

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::validation::ValidationError;

/// Why a call was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The call's cancellation token fired.
    Token,
    /// The call's deadline elapsed.
    Deadline,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelReason::Token => write!(f, "cancellation requested"),
            CancelReason::Deadline => write!(f, "deadline elapsed"),
        }
    }
}

/// Classification of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The transport's own connect/read timeout fired.
    Timeout,
    /// Connection could not be established.
    Connect,
    /// The peer violated HTTP or the body could not be read.
    Protocol,
    /// Admission was refused because the per-host limit is reached.
    ConnectionLimit,
    /// The transport has been closed.
    Closed,
    /// A local resource (e.g. the call executor) could not be used.
    Io,
}

/// Failure of the terminal transport stage.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Protocol
        };
        Self::new(kind, e.to_string())
    }
}

/// Errors produced while building a client or executing a call.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// A required input is absent.
    #[error("missing required argument `{argument}`")]
    MissingArgument { argument: String },

    /// The contract is not a valid capability contract.
    #[error("invalid contract `{contract}`: {reason}")]
    InvalidContract { contract: String, reason: String },

    /// The contract has a shape the request builder cannot express.
    #[error("unsupported contract shape `{contract}`: {reason}")]
    UnsupportedType { contract: String, reason: String },

    /// The configuration failed semantic validation.
    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfiguration(Vec<ValidationError>),

    /// The transport failed to complete the exchange.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The call was cancelled before it completed.
    #[error("call cancelled: {reason}")]
    Cancelled { reason: CancelReason },

    /// The owning client was disposed before the call started.
    #[error("client has been disposed")]
    Disposed,

    /// The server answered with a non-success status.
    #[error("server returned {status}")]
    Status { status: StatusCode, body: String },

    /// An argument could not be encoded.
    #[error("failed to encode argument: {0}")]
    Encode(String),

    /// The response could not be decoded into the declared return type.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub(crate) fn missing(argument: impl Into<String>) -> Self {
        ApiError::MissingArgument {
            argument: argument.into(),
        }
    }

    pub(crate) fn invalid_contract(contract: &str, reason: impl Into<String>) -> Self {
        ApiError::InvalidContract {
            contract: contract.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(contract: &str, reason: impl Into<String>) -> Self {
        ApiError::UnsupportedType {
            contract: contract.to_string(),
            reason: reason.into(),
        }
    }

    /// True for failures worth another attempt: connect errors, transport
    /// timeouts and 5xx answers.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(e) => matches!(
                e.kind,
                TransportErrorKind::Connect | TransportErrorKind::Timeout
            ),
            ApiError::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    /// True if the call was cancelled or hit its deadline.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled { .. })
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let connect = ApiError::Transport(TransportError::new(TransportErrorKind::Connect, "refused"));
        assert!(connect.is_transient());

        let limit = ApiError::Transport(TransportError::new(TransportErrorKind::ConnectionLimit, "full"));
        assert!(!limit.is_transient());

        let unavailable = ApiError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        };
        assert!(unavailable.is_transient());

        let not_found = ApiError::Status {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        };
        assert!(!not_found.is_transient());

        let cancelled = ApiError::Cancelled { reason: CancelReason::Token };
        assert!(!cancelled.is_transient());
        assert!(cancelled.is_cancelled());
    }

    #[test]
    fn configuration_errors_are_joined() {
        let err = ApiError::InvalidConfiguration(vec![
            ValidationError::new("connection_limit", "must be positive"),
            ValidationError::new("timeouts.request_secs", "must be positive"),
        ]);
        let text = err.to_string();
        assert!(text.contains("connection_limit"));
        assert!(text.contains("timeouts.request_secs"));
    }
}
