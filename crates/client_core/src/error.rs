use shared::error::ServerFault;
use thiserror::Error;

/// Why a single location request failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Geolocation is not supported on this device")]
    Unsupported,
    #[error("Unable to get location. Please allow location access.")]
    PermissionDenied,
    #[error("Unable to get location. Location information unavailable.")]
    PositionUnavailable,
    #[error("Unable to get location. Location request timed out.")]
    Timeout,
    #[error("Unable to get location. {0}")]
    Other(String),
}

/// Failure of a round trip to the attendance service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RemoteCallError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error(transparent)]
    Server(#[from] ServerFault),
    #[error("malformed response from attendance service: {0}")]
    Decode(String),
}

impl RemoteCallError {
    /// Message raised by the service's own logic, if it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Server(fault) => fault.server_message.as_deref(),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }

    pub fn generic_message(&self) -> Option<&str> {
        match self {
            Self::Server(fault) => fault.generic_message.as_deref(),
            Self::Transport(message) | Self::Decode(message) => Some(message.as_str()),
        }
    }
}

impl From<reqwest::Error> for RemoteCallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Transport(format!("attendance service returned HTTP {status}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StatusFetchError {
    #[error(transparent)]
    Remote(#[from] RemoteCallError),
    /// The service answered but flagged the status as unusable.
    #[error("{0}")]
    Reported(String),
}

impl StatusFetchError {
    pub fn notification_message(&self) -> String {
        match self {
            Self::Reported(message) => message.clone(),
            Self::Remote(_) => "Failed to load attendance status".to_string(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActionError {
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error(transparent)]
    Remote(#[from] RemoteCallError),
}

impl ActionError {
    /// Server message, then the generic error text, then `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        let candidate = match self {
            Self::Location(err) => Some(err.to_string()),
            Self::Remote(err) => err
                .server_message()
                .or_else(|| err.generic_message())
                .map(str::to_owned),
        };

        candidate
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}
