//! Stable identifier correlating one client with its server-side history.

use std::fmt;

use serde::{Deserialize, Serialize};

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Longest identifier the backend accepts.
const MAX_LEN: usize = 64;

/// Opaque client identifier.
///
/// Generated once (base-36 millisecond timestamp followed by a base-36 random
/// suffix) and then persisted by the host. A stored value is always used as
/// is, never regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Create a fresh identifier from a wall-clock timestamp and random bits.
    pub fn generate(timestamp_ms: u64, entropy: u64) -> Self {
        let mut id = to_base36(timestamp_ms);
        id.push_str(&to_base36(entropy));
        Self(id)
    }

    /// Wrap a previously persisted identifier.
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the backend's id pattern (`[a-z0-9_-]{1,64}`) accepts this id.
    /// Ids that fail are still used; the server will refuse the socket.
    pub fn is_accepted_by_server(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= MAX_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base36_matches_js_to_string() {
        // (1700000000000).toString(36) === "loyw3v28"
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(0), "0");
    }

    #[test]
    fn generated_id_is_timestamp_then_suffix() {
        let id = ClientId::generate(1_700_000_000_000, 36 * 36);
        assert_eq!(id.as_str(), "loyw3v28100");
        assert!(id.is_accepted_by_server());
    }

    #[test]
    fn generated_ids_fit_server_pattern() {
        let id = ClientId::generate(u64::MAX, u64::MAX);
        assert!(id.as_str().len() <= MAX_LEN);
        assert!(id.is_accepted_by_server());
    }

    #[test]
    fn stored_id_is_kept_verbatim() {
        let id = ClientId::from_stored("Legacy ID".to_string());
        assert_eq!(id.to_string(), "Legacy ID");
        assert!(!id.is_accepted_by_server());
    }
}
