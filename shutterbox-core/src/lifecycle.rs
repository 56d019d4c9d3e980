// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::Event;
use crate::identity::UserId;
use crate::photo::Photo;

/// Moderation status of a photo.
///
/// `Pending`, `Approved` and `Rejected` are freely transitionable by a party
/// holding moderation rights; hosts correct their own mistakes, so
/// re-moderation (`Approved` -> `Rejected` and back) is an ordinary
/// transition. `Quarantined` sits outside of user moderation entirely and is
/// entered and left only by the external safety operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoStatus {
    Pending,
    Approved,
    Rejected,
    Quarantined,
}

impl Display for PhotoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Quarantined => "quarantined",
        };

        write!(f, "{}", s)
    }
}

/// Status filter of a client view ("approved only", "pending only", ..).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    All,
    Only(PhotoStatus),
}

impl StatusFilter {
    pub fn admits(&self, status: PhotoStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == status,
        }
    }
}

/// The capacity in which an actor attempts a moderation action.
///
/// Ordinary moderation is available to the event owner and to delegates
/// holding a host or staff membership. The operator role belongs to the
/// external safety mechanism and is the only party which may move photos
/// into or out of quarantine; it holds no ordinary moderation rights.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Moderator {
    Owner,
    Host,
    Staff,
    Operator,
}

impl Moderator {
    fn may_moderate(&self) -> bool {
        matches!(self, Self::Owner | Self::Host | Self::Staff)
    }

    fn may_quarantine(&self) -> bool {
        matches!(self, Self::Operator)
    }
}

/// Status a photo carries at creation time.
///
/// Computed exactly once, from the event configuration in effect at upload;
/// later changes to `approval_required` never re-derive existing statuses.
pub fn initial_status(approval_required: bool) -> PhotoStatus {
    if approval_required {
        PhotoStatus::Pending
    } else {
        PhotoStatus::Approved
    }
}

/// Validates a status transition attempted by `moderator`.
pub fn check_transition(
    from: PhotoStatus,
    to: PhotoStatus,
    moderator: Moderator,
) -> Result<(), LifecycleError> {
    if from == to {
        return Err(LifecycleError::InvalidTransition { from, to });
    }

    let touches_quarantine =
        from == PhotoStatus::Quarantined || to == PhotoStatus::Quarantined;

    let allowed = if touches_quarantine {
        moderator.may_quarantine()
    } else {
        moderator.may_moderate()
    };

    if allowed {
        Ok(())
    } else {
        Err(LifecycleError::PermissionDenied)
    }
}

/// Whether `actor` may delete `photo`: its own uploader may, in any state,
/// and the event owner may delete any photo in the event.
pub fn may_delete(photo: &Photo, event: &Event, actor: &UserId) -> bool {
    photo.uploader.as_ref() == Some(actor) || event.owner == *actor
}

/// Whether `actor` may edit the caption. Only the uploader may.
pub fn may_edit_caption(photo: &Photo, actor: &UserId) -> bool {
    photo.uploader.as_ref() == Some(actor)
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: PhotoStatus, to: PhotoStatus },

    #[error("actor does not hold the rights for this transition")]
    PermissionDenied,
}
