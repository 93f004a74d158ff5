//! Client side of geo-tagged employee attendance: location capture, the JSON-RPC attendance
//! client, and the controller that keeps the observable view state.

pub mod client;
pub mod controller;
pub mod error;
pub mod hours;
pub mod location;
pub mod notify;
pub mod ticker;

pub use client::{AttendanceClient, AttendanceStatus, RpcAttendanceClient};
pub use controller::{ActionOutcome, AttendanceController, ControllerOptions, Phase, UiState};
pub use error::{ActionError, LocationError, RemoteCallError, StatusFetchError};
pub use hours::format_worked_hours;
pub use location::{
    DeviceLocationProvider, FixedGeolocation, GeolocationCapability, LocationProvider,
    PositionError, PositionErrorCode, PositionOptions,
};
pub use notify::{BroadcastNotifier, Notification, Notifier, Severity};
pub use ticker::{ClockTicker, LocalTimeSource, TimeSource};
