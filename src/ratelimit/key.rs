use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A type-safe representation of a destination for rate limiting purposes.
///
/// A destination key is the *logical* identifier a crawler registers its
/// throttle under — typically a site name such as `bunkrr` or `gofile` —
/// and is not required to match the literal hostname of the request URL.
/// Keys are normalized to lowercase so lookups are consistent regardless
/// of how a crawler spells its hint.
///
/// # Examples
///
/// ```
/// use fetchgate::DestinationKey;
///
/// let key = DestinationKey::from("Site-X");
/// assert_eq!(key.as_str(), "site-x");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DestinationKey(String);

impl<'de> Deserialize<'de> for DestinationKey {
    /// Deserialized keys go through the same lowercase normalization as
    /// programmatic ones
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let key = String::deserialize(deserializer)?;
        Ok(DestinationKey::from(key))
    }
}

impl DestinationKey {
    /// Get the destination key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the destination key as an owned String
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DestinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DestinationKey {
    fn from(key: String) -> Self {
        DestinationKey(key.to_lowercase())
    }
}

impl From<&str> for DestinationKey {
    fn from(key: &str) -> Self {
        DestinationKey(key.to_lowercase())
    }
}
