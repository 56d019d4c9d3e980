// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data types and pure logic for shutterbox events: who may join, view and
//! upload under a given event configuration, the moderation lifecycle every
//! photo passes through, and the commutative like-set mutation.
//!
//! Everything in this crate is synchronous and side-effect free. The
//! asynchronous parts of the system (talking to the storage collaborator,
//! merging remote change notifications) live in `shutterbox-store` and
//! `shutterbox-engine` and call into the evaluators defined here.
pub mod access;
pub mod code;
pub mod event;
pub mod identity;
pub mod invitation;
pub mod lifecycle;
pub mod likes;
pub mod photo;

pub use access::{AccessDenied, AccessPolicy, Gate, JoinRequest};
pub use code::{JoinCode, JoinCodeError};
pub use event::{Event, EventError, EventId, JoinMode, Visibility};
pub use identity::{Identity, UserId};
pub use invitation::{Invitation, InvitationError, InvitationRegistry};
pub use lifecycle::{LifecycleError, Moderator, PhotoStatus, StatusFilter};
pub use likes::LikeSet;
pub use photo::{Photo, PhotoId};
