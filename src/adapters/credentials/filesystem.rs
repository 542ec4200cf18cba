//! Filesystem credential resolver.
//!
//! Locates the security root and builds the participant's certificate paths:
//! `{root}/secure_dds/CA/mainca_cert.pem` and
//! `{root}/secure_dds/participants/{host}/{host}_cert.pem` / `_key.pem`.
//!
//! The root is, in order: `DDS_ROOT` when that path exists, the nearest of
//! the working directory and its ancestors (at most six levels) containing
//! both `secure_dds` and `IDL`, otherwise the working directory itself.

use std::path::{Path, PathBuf};

use crate::ports::{CredentialError, CredentialResolver, ParticipantCredentials};

/// Maximum number of directories inspected when walking up.
pub const ROOT_SEARCH_DEPTH: usize = 6;

/// Participant name used when the host name is unavailable.
pub const UNKNOWN_HOST: &str = "UNKNOWN_HOST";

/// Resolves credential paths from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FilesystemCredentialResolver {
    root_override: Option<PathBuf>,
    start_dir: Option<PathBuf>,
    host: Option<String>,
    require_material: bool,
}

impl FilesystemCredentialResolver {
    /// Resolver reading `DDS_ROOT` from the environment and the host name
    /// from the operating system.
    pub fn from_env() -> Self {
        Self {
            root_override: std::env::var_os("DDS_ROOT").map(PathBuf::from),
            host: os_host_name(),
            ..Default::default()
        }
    }

    /// Explicit root candidate, used like `DDS_ROOT`.
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root_override = Some(root.as_ref().to_path_buf());
        self
    }

    /// Directory the upward search starts from instead of the working directory.
    pub fn with_start_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.start_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Fail when the resolved root has no `secure_dds` directory.
    pub fn require_material(mut self, required: bool) -> Self {
        self.require_material = required;
        self
    }

    fn discover_root(&self, start: &Path) -> PathBuf {
        if let Some(root) = self.root_override.as_ref().filter(|p| p.exists()) {
            return root.clone();
        }
        start
            .ancestors()
            .take(ROOT_SEARCH_DEPTH)
            .find(|dir| dir.join("secure_dds").exists() && dir.join("IDL").exists())
            .unwrap_or(start)
            .to_path_buf()
    }
}

#[cfg(unix)]
fn os_host_name() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(name) => Some(name.to_string_lossy().into_owned()).filter(|h| !h.trim().is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, "host name unavailable");
            None
        }
    }
}

#[cfg(not(unix))]
fn os_host_name() -> Option<String> {
    None
}

impl CredentialResolver for FilesystemCredentialResolver {
    fn resolve(&self) -> Result<ParticipantCredentials, CredentialError> {
        let start = match &self.start_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let root = self.discover_root(&start);
        let secure = root.join("secure_dds");
        if self.require_material && !secure.is_dir() {
            return Err(CredentialError::RootNotFound(root));
        }

        let host = self.host.clone().unwrap_or_else(|| UNKNOWN_HOST.to_string());
        let participant_dir = secure.join("participants").join(&host);
        tracing::debug!(root = %root.display(), participant = %host, "credential paths resolved");

        Ok(ParticipantCredentials {
            identity_ca: secure.join("CA").join("mainca_cert.pem"),
            identity_certificate: participant_dir.join(format!("{}_cert.pem", host)),
            private_key: participant_dir.join(format!("{}_key.pem", host)),
            participant: host,
        })
    }
}
