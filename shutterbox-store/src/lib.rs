// SPDX-License-Identifier: MIT OR Apache-2.0

//! The storage/auth collaborator boundary of shutterbox.
//!
//! Everything the engine knows about the outside world goes through the
//! [`Backend`] trait: record CRUD, filtered listing, identity resolution and
//! a per-event change-notification stream. The stream is at-least-once and
//! ordered per record only; nothing here (or anywhere else) assumes ordering
//! across different records.
//!
//! [`MemoryBackend`] is the in-process reference implementation. It
//! serialises all writes and broadcasts a notification for every committed
//! one, which makes it both the test double for the engine and a living
//! document of the collaborator contract.
mod memory;
mod traits;

pub use memory::{MemoryBackend, MemoryBackendHandle, MemoryEventStream, MemorySubscription};
pub use traits::{
    Backend, RecordAction, StoreError, StreamEvent, Subscription, SubscriptionId,
};
