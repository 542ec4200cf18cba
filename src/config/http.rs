//! Viewer-facing HTTP and WebSocket settings, plus log output.

use std::net::{Ipv4Addr, SocketAddr};

use serde::Deserialize;

use super::error::ValidationError;

/// Largest accepted per-viewer queue.
pub const MAX_VIEWER_BUFFER: usize = 4096;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen address, e.g. `127.0.0.1:3001`
    pub bind: SocketAddr,

    /// Messages queued per viewer before deliveries to it are skipped
    pub viewer_buffer: usize,

    /// Comma-separated CORS origins; unset allows any origin
    pub allowed_origins: Option<String>,

    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,

    /// One JSON object per log line instead of the human format
    pub json_logs: bool,
}

impl HttpConfig {
    pub fn origins(&self) -> Vec<String> {
        self.allowed_origins
            .iter()
            .flat_map(|list| list.split(','))
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_VIEWER_BUFFER).contains(&self.viewer_buffer) {
            return Err(ValidationError::InvalidViewerBuffer { max: MAX_VIEWER_BUFFER });
        }
        Ok(())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 3001)),
            viewer_buffer: 64,
            allowed_origins: None,
            log_filter: "info,telemetry_relay=debug".to_string(),
            json_logs: false,
        }
    }
}
