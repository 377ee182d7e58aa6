use std::path::PathBuf;

use thiserror::Error;

/// Broad category of a command failure, used to pick a remedial hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Validation,
    NotInitialized,
    NotFound,
    Io,
    Other,
}

/// Errors raised by command handlers and continuations.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A remote service answered with a failure or could not be reached.
    #[error("{}", network_message(*status, message))]
    Network { status: Option<u16>, message: String },

    /// The user supplied malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// A credential or connection the command depends on is missing.
    #[error("{0}")]
    NotInitialized(String),

    #[error("{0}")]
    NotFound(String),

    /// A local file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn network_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {}: {}", code, message),
        None => format!("network error: {}", message),
    }
}

impl CommandError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_initialized(message: impl Into<String>) -> Self {
        Self::NotInitialized(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn network(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Network {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotInitialized(_) => ErrorKind::NotInitialized,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Io { .. } => ErrorKind::Io,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Suggestion shown after the error line, if the kind has one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Network { status: Some(429), .. } => {
                Some("Rate limited by the remote service. Wait a moment and retry.")
            }
            Self::Network { .. } => Some("Check your connection and try again."),
            Self::NotInitialized(_) => {
                Some("Connect a wallet first with 'connect', 'create' or 'import'.")
            }
            Self::NotFound(_) => Some("Type 'help' for available commands."),
            Self::Io { .. } => Some("Check that the path exists and is readable."),
            Self::Validation(_) | Self::Other(_) => None,
        }
    }
}
