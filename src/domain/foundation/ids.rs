//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Numeric identifier of an isolated communication domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(u32);

impl DomainId {
    /// Creates a DomainId from its numeric value.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DomainId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl FromStr for DomainId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("domain"));
        }
        trimmed
            .parse::<u32>()
            .map(Self)
            .map_err(|e| ValidationError::invalid_format("domain", e.to_string()))
    }
}

/// Unique identifier for a connected viewer.
///
/// Generated server-side when a viewer connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewerId(Uuid);

impl ViewerId {
    /// Creates a new random ViewerId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ViewerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_id_parses_with_whitespace() {
        let id: DomainId = " 12 ".parse().unwrap();
        assert_eq!(id.value(), 12);
    }

    #[test]
    fn domain_id_rejects_negative_and_garbage() {
        assert!("-1".parse::<DomainId>().is_err());
        assert!("abc".parse::<DomainId>().is_err());
        assert!(matches!(
            "".parse::<DomainId>(),
            Err(ValidationError::EmptyField { .. })
        ));
    }

    #[test]
    fn domain_id_displays_number() {
        assert_eq!(DomainId::new(4).to_string(), "4");
    }

    #[test]
    fn viewer_id_display_is_uuid() {
        let display = ViewerId::new().to_string();
        assert_eq!(display.len(), 36);
    }
}
