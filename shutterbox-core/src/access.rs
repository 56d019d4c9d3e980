// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{self, Display};

use thiserror::Error;

use crate::code::JoinCode;
use crate::event::{Event, JoinMode, Visibility};
use crate::identity::Identity;
use crate::invitation::InvitationRegistry;

/// The additional credential a requester must present beyond resolving the
/// event itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    None,
    Pin,
    Invite,
}

impl Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Pin => "pin",
            Self::Invite => "invite",
        };

        write!(f, "{}", s)
    }
}

/// Credentials and claims a requester presents when attempting to join.
///
/// There is no ambient session state anywhere in the policy: whoever calls
/// it passes the requester identity and gate input explicitly.
#[derive(Clone, Copy, Debug, Default)]
pub struct JoinRequest<'a> {
    pub requester: Option<&'a Identity>,
    /// The join code the requester claims to know. Relevant for private
    /// events, where the code itself is the gate.
    pub code: Option<&'a JoinCode>,
    pub pin: Option<&'a str>,
}

impl<'a> JoinRequest<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requester(mut self, requester: &'a Identity) -> Self {
        self.requester = Some(requester);
        self
    }

    pub fn code(mut self, code: &'a JoinCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn pin(mut self, pin: &'a str) -> Self {
        self.pin = Some(pin);
        self
    }
}

/// Pure evaluator deciding whether join, view, upload and listing are
/// permitted under a given event configuration.
///
/// The policy never panics on well-formed input; every refusal is expressed
/// as an [`AccessDenied`] reason, including the absent-event case.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    /// Decides whether a requester may join `event`, and which gate the
    /// granted access passed through.
    ///
    /// Private events require knowledge of the join code regardless of join
    /// mode. A private event is denied as `NotFound` when the code is not
    /// presented correctly, so its existence is never revealed through the
    /// denial reason.
    pub fn can_join(
        event: Option<&Event>,
        registry: &InvitationRegistry,
        request: &JoinRequest,
    ) -> Result<Gate, AccessDenied> {
        let Some(event) = event else {
            return Err(AccessDenied::NotFound);
        };

        if event.visibility == Visibility::Private && request.code != Some(&event.code) {
            return Err(AccessDenied::NotFound);
        }

        match event.join_mode {
            JoinMode::Open => Ok(Gate::None),
            JoinMode::Pin => {
                let Some(submitted) = request.pin else {
                    return Err(AccessDenied::GateRequired(Gate::Pin));
                };

                // Exact string comparison, no normalisation. Rate limiting
                // is an external concern.
                if Some(submitted) == event.pin.as_deref() {
                    Ok(Gate::Pin)
                } else {
                    Err(AccessDenied::GateFailed)
                }
            }
            JoinMode::InviteOnly => {
                let email = request.requester.and_then(|requester| requester.email());

                let Some(email) = email else {
                    // No durable identifier to check against the registry.
                    return Err(AccessDenied::GateRequired(Gate::Invite));
                };

                if registry.is_invited(&event.id, email) {
                    Ok(Gate::Invite)
                } else {
                    Err(AccessDenied::GateFailed)
                }
            }
        }
    }

    /// Decides whether `requester` may upload to `event`.
    pub fn can_upload(event: &Event, requester: &Identity) -> Result<(), AccessDenied> {
        if !event.allow_anonymous_uploads && requester.is_guest() {
            return Err(AccessDenied::AnonymousDisallowed);
        }

        Ok(())
    }

    /// Upload admission including the storage budget, for callers which
    /// track current usage. A limit of zero means unlimited.
    pub fn can_upload_sized(
        event: &Event,
        requester: &Identity,
        used_mb: u64,
        upload_mb: u64,
    ) -> Result<(), AccessDenied> {
        Self::can_upload(event, requester)?;

        if event.storage_limit_mb > 0 && used_mb.saturating_add(upload_mb) > event.storage_limit_mb
        {
            return Err(AccessDenied::StorageExceeded);
        }

        Ok(())
    }

    /// Whether `event` may appear in a public enumeration. Unlisted and
    /// private events are resolvable only via direct link or code and must
    /// never show up in any listing endpoint.
    pub fn is_listable(event: &Event) -> bool {
        event.visibility == Visibility::Public
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("event not found")]
    NotFound,

    #[error("a \"{0}\" gate must be satisfied before joining")]
    GateRequired(Gate),

    #[error("gate credential does not match")]
    GateFailed,

    #[error("anonymous uploads are disabled for this event")]
    AnonymousDisallowed,

    #[error("event storage budget is exhausted")]
    StorageExceeded,
}
