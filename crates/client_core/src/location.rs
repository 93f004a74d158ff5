use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::domain::Coordinates;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::LocationError;

pub const LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Options handed to the platform capability for each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the platform may return; zero forces a fresh reading.
    pub maximum_age: Duration,
}

impl PositionOptions {
    pub const fn attendance() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: LOCATION_TIMEOUT,
            maximum_age: Duration::ZERO,
        }
    }
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self::attendance()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unknown(u16),
}

impl PositionErrorCode {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            2 => Self::PositionUnavailable,
            3 => Self::Timeout,
            other => Self::Unknown(other),
        }
    }
}

/// Raw failure reported by a platform capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("position error {code:?}: {message}")]
pub struct PositionError {
    pub code: PositionErrorCode,
    pub message: String,
}

impl PositionError {
    pub fn new(code: PositionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<PositionError> for LocationError {
    fn from(err: PositionError) -> Self {
        match err.code {
            PositionErrorCode::PermissionDenied => Self::PermissionDenied,
            PositionErrorCode::PositionUnavailable => Self::PositionUnavailable,
            PositionErrorCode::Timeout => Self::Timeout,
            PositionErrorCode::Unknown(_) => Self::Other(err.message),
        }
    }
}

/// A device's geolocation hardware or service.
#[async_trait]
pub trait GeolocationCapability: Send + Sync {
    async fn request_position(&self, options: PositionOptions)
        -> Result<Coordinates, PositionError>;
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn get_location(&self) -> Result<Coordinates, LocationError>;
}

/// Single-shot location requests against an optional platform capability.
pub struct DeviceLocationProvider {
    capability: Option<Arc<dyn GeolocationCapability>>,
    options: PositionOptions,
}

impl DeviceLocationProvider {
    pub fn new(capability: Arc<dyn GeolocationCapability>) -> Self {
        Self::from_capability(Some(capability))
    }

    pub fn unsupported() -> Self {
        Self::from_capability(None)
    }

    pub fn from_capability(capability: Option<Arc<dyn GeolocationCapability>>) -> Self {
        Self {
            capability,
            options: PositionOptions::attendance(),
        }
    }

    pub fn options(&self) -> PositionOptions {
        self.options
    }
}

#[async_trait]
impl LocationProvider for DeviceLocationProvider {
    async fn get_location(&self) -> Result<Coordinates, LocationError> {
        let Some(capability) = &self.capability else {
            warn!("location: no geolocation capability available");
            return Err(LocationError::Unsupported);
        };

        let request = capability.request_position(self.options);
        match tokio::time::timeout(self.options.timeout, request).await {
            Ok(Ok(coords)) => {
                debug!(
                    latitude = coords.latitude,
                    longitude = coords.longitude,
                    "location: fix acquired"
                );
                Ok(coords)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "location: request failed");
                Err(err.into())
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.options.timeout.as_millis() as u64,
                    "location: capability did not answer in time"
                );
                Err(LocationError::Timeout)
            }
        }
    }
}

/// Capability for stationary terminals whose position is configured by the host.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocation {
    coords: Coordinates,
}

impl FixedGeolocation {
    pub fn new(coords: Coordinates) -> Self {
        Self { coords }
    }
}

#[async_trait]
impl GeolocationCapability for FixedGeolocation {
    async fn request_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinates, PositionError> {
        Ok(self.coords)
    }
}

#[cfg(test)]
#[path = "tests/location_tests.rs"]
mod tests;
