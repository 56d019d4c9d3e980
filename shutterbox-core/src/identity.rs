// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a user record, issued by the storage collaborator.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A resolvable requester identity.
///
/// Durable identities are regular accounts with a stable e-mail address.
/// Guest identities are provisioned on the fly when a visitor joins an event
/// which allows anonymous participation; they can like and (where permitted)
/// upload, but they carry no e-mail identifier and therefore can never
/// satisfy an invite gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    Durable { id: UserId, email: String },
    Guest { id: UserId },
}

impl Identity {
    pub fn durable(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self::Durable {
            id: UserId::new(id),
            email: email.into(),
        }
    }

    pub fn guest(id: impl Into<String>) -> Self {
        Self::Guest {
            id: UserId::new(id),
        }
    }

    pub fn id(&self) -> &UserId {
        match self {
            Self::Durable { id, .. } => id,
            Self::Guest { id } => id,
        }
    }

    /// E-mail identifier for durable identities, `None` for guests.
    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Durable { email, .. } => Some(email),
            Self::Guest { .. } => None,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest { .. })
    }
}
