use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{AttendanceAction, AttendanceId, Coordinates, EmployeeId};

pub const ATTENDANCE_MODEL: &str = "hr.attendance";
pub const STATUS_METHOD: &str = "get_employee_attendance_status";
pub const CHECK_IN_METHOD: &str = "employee_check_in";
pub const CHECK_OUT_METHOD: &str = "employee_check_out";

pub fn action_method(action: AttendanceAction) -> &'static str {
    match action {
        AttendanceAction::CheckIn => CHECK_IN_METHOD,
        AttendanceAction::CheckOut => CHECK_OUT_METHOD,
    }
}

/// The service encodes "no value" as JSON `false`; treat it like a missing field.
pub fn false_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FalseOr<T> {
        Flag(bool),
        Value(T),
    }

    Ok(match Option::<FalseOr<T>>::deserialize(deserializer)? {
        Some(FalseOr::Value(value)) => Some(value),
        Some(FalseOr::Flag(_)) | None => None,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest<P> {
    pub jsonrpc: String,
    pub method: String,
    pub id: u64,
    pub params: P,
}

impl<P> RpcRequest<P> {
    pub fn call(id: u64, params: P) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: "call".to_string(),
            id,
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallKwParams {
    pub model: String,
    pub method: String,
    pub args: Vec<Value>,
    pub kwargs: Value,
}

impl CallKwParams {
    pub fn new(method: &str, kwargs: Value) -> Self {
        Self {
            model: ATTENDANCE_MODEL.to_string(),
            method: method.to_string(),
            args: Vec::new(),
            kwargs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateParams {
    pub db: String,
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationKwargs {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Coordinates> for LocationKwargs {
    fn from(coords: Coordinates) -> Self {
        Self {
            latitude: coords.latitude,
            longitude: coords.longitude,
        }
    }
}

/// Decodes a field that is present even when its value is `null`, so a `null` result can be
/// told apart from a missing one.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct RpcResponse<T> {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "present")]
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<RpcErrorData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorData {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "false_as_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceStatusPayload {
    #[serde(default, deserialize_with = "false_as_none")]
    pub employee_name: Option<String>,
    #[serde(default)]
    pub is_checked_in: bool,
    #[serde(default, deserialize_with = "false_as_none")]
    pub check_in_time: Option<String>,
    #[serde(default, deserialize_with = "false_as_none")]
    pub attendance_id: Option<AttendanceId>,
    #[serde(default, deserialize_with = "false_as_none")]
    pub worked_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInAck {
    pub id: AttendanceId,
    pub employee_id: EmployeeId,
    #[serde(default, deserialize_with = "false_as_none")]
    pub check_in: Option<String>,
    #[serde(default)]
    pub is_within_geofence: bool,
    #[serde(default, deserialize_with = "false_as_none")]
    pub location_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutAck {
    pub id: AttendanceId,
    #[serde(default, deserialize_with = "false_as_none")]
    pub check_out: Option<String>,
    #[serde(default, deserialize_with = "false_as_none")]
    pub worked_hours: Option<f64>,
}

/// Acknowledgement for either mutating call.
#[derive(Debug, Clone)]
pub enum AttendanceAck {
    CheckIn(CheckInAck),
    CheckOut(CheckOutAck),
}

impl AttendanceAck {
    pub fn attendance_id(&self) -> AttendanceId {
        match self {
            Self::CheckIn(ack) => ack.id,
            Self::CheckOut(ack) => ack.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::{FaultKind, ServerFault};

    #[test]
    fn status_payload_treats_false_as_missing() {
        let payload: AttendanceStatusPayload = serde_json::from_value(json!({
            "employee_name": "Ana",
            "is_checked_in": false,
            "check_in_time": false,
            "attendance_id": false,
            "worked_hours": 0
        }))
        .expect("decode");

        assert_eq!(payload.employee_name.as_deref(), Some("Ana"));
        assert_eq!(payload.check_in_time, None);
        assert_eq!(payload.attendance_id, None);
        assert_eq!(payload.worked_hours, Some(0.0));
        assert_eq!(payload.error, None);
    }

    #[test]
    fn status_payload_with_error_only() {
        let payload: AttendanceStatusPayload =
            serde_json::from_value(json!({ "error": "No employee linked to this user" }))
                .expect("decode");

        assert_eq!(
            payload.error.as_deref(),
            Some("No employee linked to this user")
        );
        assert!(!payload.is_checked_in);
    }

    #[test]
    fn check_in_request_envelope_shape() {
        let request = RpcRequest::call(
            7,
            CallKwParams::new(
                CHECK_IN_METHOD,
                serde_json::to_value(LocationKwargs::from(Coordinates::new(1.5, -2.25)))
                    .expect("kwargs"),
            ),
        );

        assert_eq!(
            serde_json::to_value(&request).expect("encode"),
            json!({
                "jsonrpc": "2.0",
                "method": "call",
                "id": 7,
                "params": {
                    "model": "hr.attendance",
                    "method": "employee_check_in",
                    "args": [],
                    "kwargs": { "latitude": 1.5, "longitude": -2.25 }
                }
            })
        );
    }

    #[test]
    fn error_body_maps_to_fault() {
        let response: RpcResponse<Value> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "error": {
                "code": 200,
                "message": "Odoo Server Error",
                "data": {
                    "name": "odoo.exceptions.UserError",
                    "message": "You are already checked in.",
                    "debug": "Traceback ..."
                }
            }
        }))
        .expect("decode");

        let fault = ServerFault::from(response.error.as_ref().expect("error body"));
        assert_eq!(fault.kind, FaultKind::UserError);
        assert_eq!(
            fault.server_message.as_deref(),
            Some("You are already checked in.")
        );
        assert_eq!(fault.generic_message.as_deref(), Some("Odoo Server Error"));
        assert_eq!(fault.to_string(), "UserError: You are already checked in.");
    }

    #[test]
    fn null_result_is_distinct_from_missing_result() {
        let null: RpcResponse<Value> =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1, "result": null }))
                .expect("decode");
        assert_eq!(null.result, Some(Value::Null));

        let missing: RpcResponse<Value> =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1 })).expect("decode");
        assert_eq!(missing.result, None);
        assert!(missing.error.is_none());
    }

    #[test]
    fn session_expiry_is_classified() {
        assert_eq!(
            FaultKind::from_exception_name("odoo.http.SessionExpiredException"),
            FaultKind::SessionExpired
        );
        assert_eq!(
            FaultKind::from_exception_name("builtins.KeyError"),
            FaultKind::Other
        );
    }
}
