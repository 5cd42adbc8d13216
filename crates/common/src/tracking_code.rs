use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Prefix applied to every issued tracking code.
const PREFIX: &str = "SW";

/// Number of random characters after the prefix.
const SUFFIX_LEN: usize = 10;

const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Error returned when parsing a malformed tracking code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tracking code: {0:?}")]
pub struct InvalidTrackingCode(pub String);

/// Public, human-facing identifier for a waybill.
///
/// Format: `SW-` followed by ten uppercase alphanumeric characters
/// (e.g. `SW-7K2QX9MRDA`). Issued exactly once at waybill creation and
/// immutable afterwards. Globally unique; the store enforces uniqueness
/// at insert time and collisions are retried by regenerating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingCode(String);

impl TrackingCode {
    /// Generates a fresh random tracking code.
    pub fn generate() -> Self {
        let entropy = Uuid::new_v4().into_bytes();
        let suffix: String = entropy
            .iter()
            .take(SUFFIX_LEN)
            .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
            .collect();
        Self(format!("{PREFIX}-{suffix}"))
    }

    /// Parses and validates a tracking code from user input.
    ///
    /// Leading/trailing whitespace is trimmed and lowercase input is
    /// accepted, matching how codes are typed into the public tracker.
    pub fn parse(input: &str) -> Result<Self, InvalidTrackingCode> {
        let candidate = input.trim().to_ascii_uppercase();

        let suffix = candidate
            .strip_prefix(PREFIX)
            .and_then(|rest| rest.strip_prefix('-'))
            .ok_or_else(|| InvalidTrackingCode(input.to_string()))?;

        if suffix.len() != SUFFIX_LEN
            || !suffix.bytes().all(|b| ALPHABET.contains(&b))
        {
            return Err(InvalidTrackingCode(input.to_string()));
        }

        Ok(Self(candidate))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TrackingCode {
    type Err = InvalidTrackingCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
