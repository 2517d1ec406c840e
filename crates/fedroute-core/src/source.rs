use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Routing-service data center names rewritten to the names callers use.
pub const PROVIDER_ALIASES: [(&str, &str); 5] = [
    ("IRISDMC", "IRIS"),
    ("GEOFON", "GFZ"),
    ("SED", "ETH"),
    ("USPC", "USP"),
    ("USPSC", "USP"),
];

/// Data center identifier as announced by a `DATACENTER=` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self(value.trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Applies the fixed alias table, returning the caller-facing name.
    pub fn canonical(&self) -> Self {
        self.remapped(&PROVIDER_ALIASES)
    }

    pub fn remapped(&self, aliases: &[(&str, &str)]) -> Self {
        aliases
            .iter()
            .find(|(from, _)| *from == self.0)
            .map(|(_, to)| Self::new(*to))
            .unwrap_or_else(|| self.clone())
    }

    /// Routing-service names that map onto this id.
    pub fn aliases(&self) -> impl Iterator<Item = Self> + '_ {
        PROVIDER_ALIASES
            .iter()
            .filter(move |(_, to)| *to == self.0)
            .map(|(from, _)| Self::new(*from))
    }

    /// Compares two ids after canonicalization.
    pub fn same_provider(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyProviderId);
        }
        Ok(Self::new(trimmed))
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
