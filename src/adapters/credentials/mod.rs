//! Credential resolver adapters.

mod filesystem;

pub use filesystem::{FilesystemCredentialResolver, ROOT_SEARCH_DEPTH, UNKNOWN_HOST};
