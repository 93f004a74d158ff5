use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use shared::{
    domain::{AttendanceId, Coordinates},
    error::ServerFault,
    protocol::{
        AttendanceStatusPayload, AuthenticateParams, CallKwParams, CheckInAck, CheckOutAck,
        LocationKwargs, RpcRequest, RpcResponse, ATTENDANCE_MODEL, CHECK_IN_METHOD,
        CHECK_OUT_METHOD, STATUS_METHOD,
    },
};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::RemoteCallError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status as the service reports it, with absent values already defaulted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceStatus {
    pub employee_name: String,
    pub is_checked_in: bool,
    pub check_in_time: String,
    pub worked_hours: f64,
    pub attendance_id: Option<AttendanceId>,
    /// When set, the other fields carry no meaning.
    pub error: Option<String>,
}

impl From<AttendanceStatusPayload> for AttendanceStatus {
    fn from(payload: AttendanceStatusPayload) -> Self {
        Self {
            employee_name: payload.employee_name.unwrap_or_default(),
            is_checked_in: payload.is_checked_in,
            check_in_time: payload.check_in_time.unwrap_or_default(),
            worked_hours: payload.worked_hours.unwrap_or(0.0),
            attendance_id: payload.attendance_id,
            error: payload.error,
        }
    }
}

/// Remote attendance service. Eligibility checks happen server-side only.
#[async_trait]
pub trait AttendanceClient: Send + Sync {
    async fn fetch_status(&self) -> Result<AttendanceStatus, RemoteCallError>;
    /// `Ok(None)` when the service accepted the call without an acknowledgement record.
    async fn submit_check_in(&self, coords: Coordinates)
        -> Result<Option<CheckInAck>, RemoteCallError>;
    async fn submit_check_out(
        &self,
        coords: Coordinates,
    ) -> Result<Option<CheckOutAck>, RemoteCallError>;
}

#[derive(Debug, Deserialize)]
struct SessionInfo {
    #[serde(default, deserialize_with = "shared::protocol::false_as_none")]
    uid: Option<i64>,
}

/// JSON-RPC client for the attendance endpoints. The session cookie lives in the HTTP
/// client's cookie store.
pub struct RpcAttendanceClient {
    http: Client,
    server_url: Url,
    next_id: AtomicU64,
}

impl RpcAttendanceClient {
    pub fn new(server_url: Url, request_timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(request_timeout)
            .build()
            .context("failed to build attendance http client")?;
        Ok(Self {
            http,
            server_url: with_trailing_slash(server_url),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    /// Opens a session; returns the authenticated user id.
    pub async fn authenticate(
        &self,
        database: &str,
        login: &str,
        password: &str,
    ) -> Result<i64, RemoteCallError> {
        let url = self.endpoint("web/session/authenticate")?;
        let session: SessionInfo = self
            .post_rpc(
                url,
                AuthenticateParams {
                    db: database.to_string(),
                    login: login.to_string(),
                    password: password.to_string(),
                },
            )
            .await?;
        let uid = session.uid.ok_or_else(|| {
            RemoteCallError::Server(ServerFault::new(
                shared::error::FaultKind::AccessError,
                "Authentication failed: invalid login or password",
            ))
        })?;
        info!(uid, database, login, "attendance: session opened");
        Ok(uid)
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteCallError> {
        self.server_url
            .join(path)
            .map_err(|err| RemoteCallError::Transport(format!("invalid endpoint '{path}': {err}")))
    }

    async fn call_kw<T: DeserializeOwned>(
        &self,
        method: &str,
        kwargs: Value,
    ) -> Result<T, RemoteCallError> {
        let url = self.endpoint(&format!(
            "web/dataset/call_kw/{ATTENDANCE_MODEL}/{method}"
        ))?;
        self.post_rpc(url, CallKwParams::new(method, kwargs)).await
    }

    async fn post_rpc<P, T>(&self, url: Url, params: P) -> Result<T, RemoteCallError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(id, url = %url, "attendance: rpc call");

        let response = self
            .http
            .post(url)
            .json(&RpcRequest::call(id, params))
            .send()
            .await?
            .error_for_status()?;
        let body: RpcResponse<T> = response.json().await?;

        if let Some(error) = body.error.as_ref() {
            let fault = ServerFault::from(error);
            warn!(id, code = error.code, fault = %fault, "attendance: rpc fault");
            return Err(fault.into());
        }

        body.result.ok_or_else(|| {
            RemoteCallError::Decode("response carried neither result nor error".to_string())
        })
    }
}

#[async_trait]
impl AttendanceClient for RpcAttendanceClient {
    async fn fetch_status(&self) -> Result<AttendanceStatus, RemoteCallError> {
        let payload: AttendanceStatusPayload = self.call_kw(STATUS_METHOD, json!({})).await?;
        Ok(payload.into())
    }

    async fn submit_check_in(
        &self,
        coords: Coordinates,
    ) -> Result<Option<CheckInAck>, RemoteCallError> {
        let result: Value = self
            .call_kw(CHECK_IN_METHOD, location_kwargs(coords)?)
            .await?;
        Ok(acknowledgement(CHECK_IN_METHOD, result))
    }

    async fn submit_check_out(
        &self,
        coords: Coordinates,
    ) -> Result<Option<CheckOutAck>, RemoteCallError> {
        let result: Value = self
            .call_kw(CHECK_OUT_METHOD, location_kwargs(coords)?)
            .await?;
        Ok(acknowledgement(CHECK_OUT_METHOD, result))
    }
}

/// Any `result` of a mutating call means it was applied; keep the record only when it parses.
fn acknowledgement<T: DeserializeOwned>(method: &str, result: Value) -> Option<T> {
    if result.is_null() {
        return None;
    }
    match serde_json::from_value(result) {
        Ok(ack) => Some(ack),
        Err(err) => {
            debug!(method, error = %err, "attendance: unrecognised acknowledgement ignored");
            None
        }
    }
}

fn location_kwargs(coords: Coordinates) -> Result<Value, RemoteCallError> {
    serde_json::to_value(LocationKwargs::from(coords))
        .map_err(|err| RemoteCallError::Decode(format!("failed to encode coordinates: {err}")))
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
