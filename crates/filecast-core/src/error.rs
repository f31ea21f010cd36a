//! Error taxonomy
//!
//! Every fallible adapter and router operation reports exactly one
//! [`ErrorKind`] from a closed set. Back-end native errors are mapped once,
//! at the adapter boundary, by [`classify`]; the router only adds context.
//!
//! ## Classification table
//!
//! | Native error | Kind |
//! |---|---|
//! | `io::ErrorKind::NotFound` | `FileNotFound` |
//! | `io::ErrorKind::PermissionDenied`, `EROFS` | `AccessDenied` |
//! | `io::ErrorKind::AlreadyExists` | `AlreadyExists` |
//! | `ENOSPC`, `EDQUOT` | `OutOfSpace` |
//! | `EFBIG` | `FileTooLarge` |
//! | `EXDEV`, `ENOTSUP`, `io::ErrorKind::Unsupported` | `OperationNotSupported` |
//! | `BackendStatus` 401 / 403 / 404 / 409 / 429 / 501 / 507 ... | see [`ErrorKind::from_status`] |
//! | `tokio::time::error::Elapsed` | `OperationTimedOut` |
//! | anything else | `Unknown` (message retained) |

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DomainError, ProviderId};

// ============================================================================
// ErrorKind
// ============================================================================

/// Closed set of failure kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProviderNotFound,
    ProviderOffline,
    ProviderUnavailable,
    AuthenticationRequired,
    ConnectionError,
    FileNotFound,
    AccessDenied,
    AlreadyExists,
    Corrupted,
    OperationFailed,
    OperationNotSupported,
    OperationCancelled,
    OperationTimedOut,
    UnsupportedFormat,
    FileTooLarge,
    OutOfSpace,
    Unknown,
}

impl ErrorKind {
    /// Stable machine-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ProviderNotFound => "provider_not_found",
            ErrorKind::ProviderOffline => "provider_offline",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::AuthenticationRequired => "authentication_required",
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::FileNotFound => "file_not_found",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Corrupted => "corrupted",
            ErrorKind::OperationFailed => "operation_failed",
            ErrorKind::OperationNotSupported => "operation_not_supported",
            ErrorKind::OperationCancelled => "operation_cancelled",
            ErrorKind::OperationTimedOut => "operation_timed_out",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::FileTooLarge => "file_too_large",
            ErrorKind::OutOfSpace => "out_of_space",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Map an HTTP-like status code reported by a back-end client
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorKind::AuthenticationRequired,
            403 => ErrorKind::AccessDenied,
            404 | 410 => ErrorKind::FileNotFound,
            408 | 504 => ErrorKind::OperationTimedOut,
            409 | 412 => ErrorKind::AlreadyExists,
            413 => ErrorKind::FileTooLarge,
            415 => ErrorKind::UnsupportedFormat,
            422 => ErrorKind::Corrupted,
            429 | 503 => ErrorKind::ProviderUnavailable,
            405 | 501 => ErrorKind::OperationNotSupported,
            499 => ErrorKind::OperationCancelled,
            507 => ErrorKind::OutOfSpace,
            500..=599 => ErrorKind::OperationFailed,
            _ => ErrorKind::Unknown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// BackendStatus
// ============================================================================

/// Status-coded failure reported by a back-end client
///
/// Back-end clients return `anyhow::Error`; wrapping a failure in this type
/// lets [`classify`] map it precisely instead of falling back to `Unknown`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("back-end returned status {status}: {message}")]
pub struct BackendStatus {
    pub status: u16,
    pub message: String,
}

impl BackendStatus {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

// ============================================================================
// ProviderError
// ============================================================================

/// The only error type that crosses the router boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ErrorKind,
    message: Option<String>,
    provider: Option<ProviderId>,
    operation: Option<&'static str>,
}

/// Result alias used by adapters and the router
pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
            provider: None,
            operation: None,
        }
    }

    pub fn from_kind(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            provider: None,
            operation: None,
        }
    }

    /// Classify a native back-end error, keeping its message for diagnostics
    pub fn from_native(err: &anyhow::Error) -> Self {
        Self::new(classify(err), format!("{err:#}"))
    }

    /// Classify an I/O error, keeping its message for diagnostics
    pub fn from_io(err: &io::Error) -> Self {
        Self::new(classify_io(err), err.to_string())
    }

    pub fn not_supported(operation: &'static str) -> Self {
        Self::from_kind(ErrorKind::OperationNotSupported).in_operation(operation)
    }

    /// Attach the provider the failure happened on; never changes the kind
    #[must_use]
    pub fn on_provider(mut self, provider: &ProviderId) -> Self {
        if self.provider.is_none() {
            self.provider = Some(provider.clone());
        }
        self
    }

    /// Attach the operation that failed; never changes the kind
    #[must_use]
    pub fn in_operation(mut self, operation: &'static str) -> Self {
        if self.operation.is_none() {
            self.operation = Some(operation);
        }
        self
    }

    /// Shorthand for `on_provider(..).in_operation(..)`
    #[must_use]
    pub fn with_context(self, provider: &ProviderId, operation: &'static str) -> Self {
        self.on_provider(provider).in_operation(operation)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Diagnostic text; never use for control flow
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn provider(&self) -> Option<&ProviderId> {
        self.provider.as_ref()
    }

    pub fn operation(&self) -> Option<&'static str> {
        self.operation
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(op) = self.operation {
            write!(f, " during {}", op)?;
        }
        if let Some(provider) = &self.provider {
            write!(f, " on provider {}", provider)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {}

impl From<ErrorKind> for ProviderError {
    fn from(kind: ErrorKind) -> Self {
        Self::from_kind(kind)
    }
}

impl From<DomainError> for ProviderError {
    fn from(err: DomainError) -> Self {
        Self::new(ErrorKind::OperationFailed, err.to_string())
    }
}

impl From<io::Error> for ProviderError {
    fn from(err: io::Error) -> Self {
        Self::from_io(&err)
    }
}

// ============================================================================
// classify
// ============================================================================

/// Map a back-end native error onto the closed taxonomy
///
/// Walks the whole `anyhow` chain so context layers added by a client do not
/// hide the underlying cause.
pub fn classify(err: &anyhow::Error) -> ErrorKind {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<ProviderError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<BackendStatus>() {
            return ErrorKind::from_status(e.status);
        }
        if let Some(e) = cause.downcast_ref::<io::Error>() {
            return classify_io(e);
        }
        if cause.is::<tokio::time::error::Elapsed>() {
            return ErrorKind::OperationTimedOut;
        }
    }
    ErrorKind::Unknown
}

/// Map an I/O error onto the closed taxonomy
pub fn classify_io(err: &io::Error) -> ErrorKind {
    #[cfg(unix)]
    if let Some(code) = err.raw_os_error() {
        match code {
            libc::ENOSPC | libc::EDQUOT => return ErrorKind::OutOfSpace,
            libc::EFBIG => return ErrorKind::FileTooLarge,
            libc::EXDEV | libc::ENOTSUP => return ErrorKind::OperationNotSupported,
            libc::EROFS => return ErrorKind::AccessDenied,
            _ => {}
        }
    }

    match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::FileNotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::AccessDenied,
        io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
        io::ErrorKind::TimedOut => ErrorKind::OperationTimedOut,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe => ErrorKind::ConnectionError,
        io::ErrorKind::Interrupted => ErrorKind::OperationCancelled,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => ErrorKind::Corrupted,
        io::ErrorKind::Unsupported => ErrorKind::OperationNotSupported,
        _ => ErrorKind::Unknown,
    }
}
