use std::fmt;
use std::sync::Arc;

/// Every failure the client can surface.
///
/// Causes are held in `Arc` so one outcome can be handed to every caller
/// waiting on the same refresh.
#[derive(Debug, Clone)]
pub enum Error {
    /// The device answered 401 or 403.
    Auth { path: String, status: u16 },
    /// Timeout, refused connection, DNS failure or a non-2xx status.
    Communication {
        path: String,
        message: String,
        source: Option<Arc<reqwest::Error>>,
    },
    /// A command value was rejected before any request was made.
    Validation { key: String, reason: String },
    /// Anything the other variants don't cover.
    Client {
        message: String,
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },
    InvalidAddress(String),
    NotConnected,
}

impl Error {
    pub(crate) fn communication(path: &str, message: impl Into<String>) -> Self {
        Error::Communication {
            path: path.to_string(),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn validation(key: &str, reason: impl Into<String>) -> Self {
        Error::Validation {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn client(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Client {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Classify a reqwest failure for `path`.
    pub(crate) fn from_reqwest(path: &str, e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            let code = status.as_u16();
            if code == 401 || code == 403 {
                return Error::Auth {
                    path: path.to_string(),
                    status: code,
                };
            }
            return Error::Communication {
                path: path.to_string(),
                message: format!("HTTP {code}"),
                source: Some(Arc::new(e)),
            };
        }

        let message = if e.is_timeout() {
            "timed out"
        } else if e.is_connect() {
            "connection failed"
        } else if e.is_request() || e.is_body() {
            "request failed"
        } else {
            return Error::Client {
                message: format!("unexpected failure on {path}"),
                source: Some(Arc::new(e)),
            };
        };

        Error::Communication {
            path: path.to_string(),
            message: message.to_string(),
            source: Some(Arc::new(e)),
        }
    }

    /// True for failures a later poll may recover from.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Communication { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Auth { path, status } => write!(f, "auth error on {path}: HTTP {status}"),
            Error::Communication {
                path,
                message,
                source,
            } => match source {
                Some(e) => write!(f, "communication error on {path}: {message}: {e}"),
                None => write!(f, "communication error on {path}: {message}"),
            },
            Error::Validation { key, reason } => write!(f, "invalid value for {key}: {reason}"),
            Error::Client { message, source } => match source {
                Some(e) => write!(f, "client error: {message}: {e}"),
                None => write!(f, "client error: {message}"),
            },
            Error::InvalidAddress(addr) => write!(f, "invalid address: {addr:?}"),
            Error::NotConnected => write!(f, "not connected"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Communication { source: Some(e), .. } => Some(e.as_ref()),
            Error::Client { source: Some(e), .. } => Some(e.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
