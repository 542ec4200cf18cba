//! Upstream record stream configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Where the `serve` command reads records from
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamSource {
    /// Spawn `command` and read its stdout and stderr
    #[default]
    Command,
    Stdin,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub source: UpstreamSource,
    pub command: String,
    /// Arguments, whitespace-separated
    pub args: String,
    pub read_chunk_bytes: usize,
    /// Upper bound on bytes held for one unfinished record
    pub max_buffer_bytes: usize,
}

impl UpstreamConfig {
    pub fn args_list(&self) -> Vec<String> {
        self.args.split_whitespace().map(str::to_string).collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source == UpstreamSource::Command && self.command.trim().is_empty() {
            return Err(ValidationError::MissingUpstreamCommand);
        }
        if self.read_chunk_bytes == 0 {
            return Err(ValidationError::InvalidReadChunk);
        }
        if self.max_buffer_bytes < self.read_chunk_bytes {
            return Err(ValidationError::BufferSmallerThanChunk);
        }
        Ok(())
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            source: UpstreamSource::Command,
            command: "telemetry-relay".to_string(),
            args: "monitor".to_string(),
            read_chunk_bytes: 8192,
            max_buffer_bytes: 1024 * 1024,
        }
    }
}
