//! WS-Addressing (2004/08) header values carried on every WS-Management
//! request: `To`, `Action`, `MessageID`, `ReplyTo`, `RelatesTo`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A WS-Addressing `EndpointReferenceType`, used for `ReplyTo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointReference {
    #[serde(rename = "a:Address")]
    pub address: String,
}

impl EndpointReference {
    pub fn anonymous() -> Self {
        Self {
            address: crate::action::NS_ANONYMOUS_ROLE.to_string(),
        }
    }
}

/// A WS-Addressing `MessageID`, always a `urn:uuid:...` value per MS-WSMV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "urn:uuid:{}", self.0)
    }
}

impl Serialize for MessageId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let uuid_str = s.strip_prefix("urn:uuid:").unwrap_or(&s);
        Uuid::parse_str(uuid_str)
            .map(MessageId)
            .map_err(serde::de::Error::custom)
    }
}
