//! Error taxonomy / 错误分类
//!
//! Every public wagon operation returns a [`TransportError`]. Failures coming
//! back from the object store are first captured as [`StoreError`] and then
//! translated at the boundary of the operation that observed them.

use thiserror::Error;

/// Boxed error used as the cause of a [`TransportError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced to the driving host / 返回给调用方的错误
#[derive(Error, Debug)]
pub enum TransportError {
    /// Resource or directory does not exist / 资源不存在
    #[error("{message}")]
    NotFound {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Local I/O failure or store write failure / 传输失败
    #[error("{message}")]
    TransferFailed {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// No credential strategy produced usable credentials / 认证失败
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Unrecognized region or malformed repository / 配置无效
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A data operation was issued before connect / 未连接
    #[error("Not connected to a repository")]
    NotConnected,
}

impl TransportError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into(), source: None }
    }

    pub fn transfer_failed(message: impl Into<String>) -> Self {
        Self::TransferFailed { message: message.into(), source: None }
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed { message: message.into(), source: None }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration { message: message.into(), source: None }
    }

    /// Attach the underlying cause / 附加原始错误
    pub fn with_source(mut self, cause: impl Into<BoxError>) -> Self {
        match &mut self {
            Self::NotFound { source, .. }
            | Self::TransferFailed { source, .. }
            | Self::AuthenticationFailed { source, .. }
            | Self::InvalidConfiguration { source, .. } => *source = Some(cause.into()),
            Self::NotConnected => {}
        }
        self
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_transfer_failed(&self) -> bool {
        matches!(self, Self::TransferFailed { .. })
    }

    pub fn is_authentication_failed(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration { .. })
    }
}

/// Result type for wagon operations
pub type WagonResult<T> = Result<T, TransportError>;

/// Errors reported by an object store backend / 对象存储错误
#[derive(Error, Debug)]
pub enum StoreError {
    /// The service answered with an error status (no such key, no such bucket, access denied...)
    #[error("S3 service error (status {status}): {message}")]
    Service { status: u16, message: String },

    /// The request never produced a service answer (network, signing, parsing)
    #[error("S3 client error: {0}")]
    Client(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service { status, message: message.into() }
    }

    /// Whether the store itself rejected the request
    pub fn is_service(&self) -> bool {
        matches!(self, Self::Service { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for object store calls
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_display_carries_message() {
        let error = TransportError::not_found("'com/acme/' does not exist");
        assert_eq!(error.to_string(), "'com/acme/' does not exist");

        let error = TransportError::invalid_configuration("unknown location constraint 'foo'");
        assert_eq!(
            error.to_string(),
            "Invalid configuration: unknown location constraint 'foo'"
        );
    }

    #[test]
    fn test_with_source_keeps_cause() {
        let cause = StoreError::service(404, "NoSuchBucket");
        let error = TransportError::not_found("'x' does not exist").with_source(cause);

        let source = error.source().expect("source attached");
        assert!(source.to_string().contains("NoSuchBucket"));
        assert!(error.is_not_found());
    }

    #[test]
    fn test_not_connected_ignores_source() {
        let error = TransportError::NotConnected.with_source(io::Error::other("boom"));
        assert!(error.source().is_none());
    }

    #[test]
    fn test_store_error_classification() {
        assert!(StoreError::service(403, "AccessDenied").is_service());
        assert_eq!(StoreError::service(404, "NoSuchKey").status(), Some(404));
        assert!(!StoreError::Client("dns".to_string()).is_service());

        let io_error: StoreError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(io_error, StoreError::Io(_)));
        assert_eq!(io_error.status(), None);
    }
}
