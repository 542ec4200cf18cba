//! CredentialResolver port - authentication material for a participant.
//!
//! Provisioning certificates is outside the relay. The relay only needs
//! to know where the material lives so it can hand the paths to the
//! transport when joining a domain.

use std::path::PathBuf;

/// File locations of one participant's identity material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantCredentials {
    /// Participant directory name (usually the host name).
    pub participant: String,
    pub identity_ca: PathBuf,
    pub identity_certificate: PathBuf,
    pub private_key: PathBuf,
}

impl ParticipantCredentials {
    /// `file://` URIs in the order identity CA, certificate, private key.
    pub fn uris(&self) -> [String; 3] {
        [
            file_uri(&self.identity_ca),
            file_uri(&self.identity_certificate),
            file_uri(&self.private_key),
        ]
    }
}

fn file_uri(path: &std::path::Path) -> String {
    format!("file://{}", path.display())
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("cannot determine working directory: {0}")]
    WorkingDirectory(#[from] std::io::Error),

    #[error("credential root not found: {0}")]
    RootNotFound(PathBuf),
}

/// Port for locating participant credentials.
pub trait CredentialResolver: Send + Sync {
    fn resolve(&self) -> Result<ParticipantCredentials, CredentialError>;
}
