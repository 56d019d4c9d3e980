// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::code::JoinCode;
use crate::identity::UserId;

/// Opaque identifier of an event record, issued by the storage collaborator.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Whether an event may be discovered through enumeration or only reached
/// directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Listed in the public directory.
    Public,

    /// Reachable via direct link or code, never enumerated.
    Unlisted,

    /// Reachable via code only, never enumerated. Knowing the code _is_ the
    /// credential.
    Private,
}

/// The gate a requester must pass before joining.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    Open,
    Pin,
    InviteOnly,
}

/// Configuration record of a single event.
///
/// Events have exactly one owning user. Invitations and photos belong to
/// their event and are cascade-deleted with it; that cascade is carried out
/// by the storage collaborator, not here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub code: JoinCode,
    pub visibility: Visibility,
    pub join_mode: JoinMode,
    /// Required iff `join_mode` is [`JoinMode::Pin`].
    #[serde(default)]
    pub pin: Option<String>,
    pub approval_required: bool,
    pub allow_anonymous_uploads: bool,
    pub storage_limit_mb: u64,
    pub owner: UserId,
    /// Unix timestamps, optional schedule metadata.
    #[serde(default)]
    pub start_date: Option<u64>,
    #[serde(default)]
    pub end_date: Option<u64>,
}

impl Event {
    /// Checks the configuration invariants which relate fields to each
    /// other. Field-level validity (non-empty code etc.) is enforced by the
    /// field types themselves.
    pub fn validate(&self) -> Result<(), EventError> {
        if self.join_mode == JoinMode::Pin && self.pin.as_deref().unwrap_or("").is_empty() {
            return Err(EventError::MissingPin);
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("join mode \"pin\" requires a non-empty pin")]
    MissingPin,
}

#[cfg(test)]
pub(crate) mod tests {
    use std::str::FromStr;

    use crate::code::JoinCode;
    use crate::identity::UserId;

    use super::{Event, EventError, EventId, JoinMode, Visibility};

    pub(crate) fn test_event(id: &str, code: &str) -> Event {
        Event {
            id: EventId::new(id),
            name: "Test Event".to_string(),
            description: String::new(),
            code: JoinCode::from_str(code).unwrap(),
            visibility: Visibility::Public,
            join_mode: JoinMode::Open,
            pin: None,
            approval_required: true,
            allow_anonymous_uploads: true,
            storage_limit_mb: 1000,
            owner: UserId::new("owner"),
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn pin_mode_requires_pin() {
        let mut event = test_event("event-1", "CODE1");
        event.join_mode = JoinMode::Pin;

        assert!(matches!(event.validate(), Err(EventError::MissingPin)));

        event.pin = Some("".to_string());
        assert!(matches!(event.validate(), Err(EventError::MissingPin)));

        event.pin = Some("1234".to_string());
        assert!(event.validate().is_ok());
    }

    #[test]
    fn serde_uses_wire_names() {
        let event = test_event("event-1", "CODE1");
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["visibility"], "public");
        assert_eq!(value["join_mode"], "open");

        let mut event = event;
        event.join_mode = JoinMode::InviteOnly;
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["join_mode"], "invite_only");
    }
}
