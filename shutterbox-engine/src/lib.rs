// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation engine for shutterbox clients.
//!
//! Each client holds one [`ClientView`] per (event, filter): an ordered,
//! filtered projection of the event's photo collection. Two input streams
//! mutate it. Local actions are validated against the access and lifecycle
//! rules, applied to the view optimistically and then submitted to the
//! storage collaborator. Remote change notifications, delivered
//! at-least-once and ordered per record only, are merged in as they arrive.
//!
//! The merge rules are written so that the two streams commute on the
//! surface that matters: regardless of delivery order, duplication or
//! interleaving with local actions, a view converges on the authoritative
//! server state restricted to its filter once the notification stream has
//! caught up for every record.
//!
//! Clients run a single-threaded cooperative loop; one task at a time
//! touches a view, so views need no internal coordination beyond a plain
//! mutex guarding the shared handle.
mod engine;
mod subscription;
mod view;

pub use engine::{EngineError, LocalAction, ReconciliationEngine};
pub use subscription::ViewSubscription;
pub use view::{ClientView, PhotoEntry, ViewChange};
