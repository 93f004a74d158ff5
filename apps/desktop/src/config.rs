use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::Coordinates;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub database: Option<String>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub http_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    pub live_clock: bool,
    pub worked_hours: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8069".into(),
            database: None,
            login: None,
            password: None,
            latitude: None,
            longitude: None,
            http_timeout_secs: 30,
            refresh_interval_secs: 60,
            live_clock: true,
            worked_hours: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    database: Option<String>,
    login: Option<String>,
    password: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    http_timeout_secs: Option<u64>,
    refresh_interval_secs: Option<u64>,
    live_clock: Option<bool>,
    worked_hours: Option<bool>,
}

impl Settings {
    pub fn server_url(&self) -> anyhow::Result<Url> {
        let url = Url::parse(self.server_url.trim())
            .with_context(|| format!("invalid server url '{}'", self.server_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("server url '{}' must use http or https", self.server_url);
        }
        Ok(url)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(5))
    }

    /// Configured position of this terminal, when both axes are set.
    pub fn fixed_coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }

    pub fn credentials(&self) -> Option<(&str, &str, &str)> {
        Some((
            self.database.as_deref()?,
            self.login.as_deref()?,
            self.password.as_deref()?,
        ))
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.server_url {
            self.server_url = v;
        }
        if file.database.is_some() {
            self.database = file.database;
        }
        if file.login.is_some() {
            self.login = file.login;
        }
        if file.password.is_some() {
            self.password = file.password;
        }
        if file.latitude.is_some() {
            self.latitude = file.latitude;
        }
        if file.longitude.is_some() {
            self.longitude = file.longitude;
        }
        if let Some(v) = file.http_timeout_secs {
            self.http_timeout_secs = v;
        }
        if let Some(v) = file.refresh_interval_secs {
            self.refresh_interval_secs = v;
        }
        if let Some(v) = file.live_clock {
            self.live_clock = v;
        }
        if let Some(v) = file.worked_hours {
            self.worked_hours = v;
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("ATTENDANCE_SERVER_URL").or_else(|| var("APP__SERVER_URL")) {
            self.server_url = v;
        }
        if let Some(v) = var("ATTENDANCE_DB") {
            self.database = Some(v);
        }
        if let Some(v) = var("ATTENDANCE_LOGIN") {
            self.login = Some(v);
        }
        if let Some(v) = var("ATTENDANCE_PASSWORD") {
            self.password = Some(v);
        }
        if let Some(v) = var("ATTENDANCE_LATITUDE").and_then(|v| v.parse().ok()) {
            self.latitude = Some(v);
        }
        if let Some(v) = var("ATTENDANCE_LONGITUDE").and_then(|v| v.parse().ok()) {
            self.longitude = Some(v);
        }
        if let Some(v) = var("ATTENDANCE_HTTP_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.http_timeout_secs = v;
        }
    }
}

/// Defaults, then `path` (if present), then environment variables.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config '{}'", path.display()))?;
        settings.apply_file(file_cfg);
    }

    settings.apply_env(|key| std::env::var(key).ok());
    Ok(settings)
}
