// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::{Event, EventId};
use crate::identity::UserId;

/// A single invited identity, owned by exactly one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub event: EventId,
    pub email: String,
}

/// The set of invited identities per invite-gated event.
///
/// The registry is the authority for membership when an event's join mode is
/// "invite only", independent of the event's visibility. Identifiers are
/// normalised on insert (trimmed, lowercased) so that membership queries are
/// effectively case-insensitive; the access policy itself performs no
/// normalisation.
#[derive(Clone, Debug, Default)]
pub struct InvitationRegistry {
    entries: BTreeMap<EventId, BTreeSet<String>>,
}

impl InvitationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invite an identity to an event. Only the event owner may invite.
    pub fn invite(
        &mut self,
        event: &Event,
        actor: &UserId,
        email: &str,
    ) -> Result<Invitation, InvitationError> {
        if *actor != event.owner {
            return Err(InvitationError::NotEventOwner);
        }

        let email = normalize(email);
        if email.is_empty() {
            return Err(InvitationError::EmptyIdentifier);
        }

        self.entries
            .entry(event.id.clone())
            .or_default()
            .insert(email.clone());

        Ok(Invitation {
            event: event.id.clone(),
            email,
        })
    }

    /// Revoke an invitation. Only the event owner may revoke. Revoking an
    /// identity which was never invited is a no-op.
    pub fn revoke(
        &mut self,
        event: &Event,
        actor: &UserId,
        email: &str,
    ) -> Result<(), InvitationError> {
        if *actor != event.owner {
            return Err(InvitationError::NotEventOwner);
        }

        if let Some(entries) = self.entries.get_mut(&event.id) {
            entries.remove(&normalize(email));
        }

        Ok(())
    }

    pub fn is_invited(&self, event_id: &EventId, email: &str) -> bool {
        self.entries
            .get(event_id)
            .is_some_and(|entries| entries.contains(&normalize(email)))
    }

    /// All invited identifiers for an event, in normalised form.
    pub fn entries(&self, event_id: &EventId) -> impl Iterator<Item = &str> {
        self.entries
            .get(event_id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Drop all invitations of an event, mirroring the cascade delete the
    /// storage collaborator performs when the event itself is removed.
    pub fn remove_event(&mut self, event_id: &EventId) {
        self.entries.remove(event_id);
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Error)]
pub enum InvitationError {
    #[error("only the event owner may manage invitations")]
    NotEventOwner,

    #[error("invited identifier is empty")]
    EmptyIdentifier,
}
