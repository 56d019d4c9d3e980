// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;
use std::fmt::Debug;
use std::future::Future;

use futures_core::Stream;
use serde::{Deserialize, Serialize};
use shutterbox_core::{Event, EventId, Identity, JoinCode, Photo, PhotoId, StatusFilter};
use thiserror::Error as ThisError;

pub type SubscriptionId = u64;

/// Kind of committed write a change notification reports.
///
/// A hostile or buggy upstream may send actions this client does not know;
/// they decode as [`RecordAction::Unknown`] and are dropped by the consumer
/// instead of failing deserialisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    Create,
    Update,
    Delete,
    #[serde(other)]
    Unknown,
}

/// One message on a subscription's event stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    Subscribed {
        subscription_id: SubscriptionId,
    },
    /// A committed write somewhere in the photo collection. Delivery is
    /// at-least-once; per record the delivery order matches commit order.
    Notification {
        action: RecordAction,
        record: Photo,
    },
    Unsubscribed,
}

/// The external storage and auth collaborator.
///
/// Writes are serialised by the collaborator, not by any caller. Every
/// committed write is echoed back as a [`StreamEvent::Notification`] on all
/// matching subscriptions, including writes the subscribing client itself
/// submitted.
pub trait Backend: Send + Sync + 'static {
    type Error: Error + Send;

    // The Debug bound is strictly speaking redundant (Error implies Debug)
    // but the compiler fails to see that through the generic error types of
    // dependent structs without it.
    type Subscription: Subscription + Debug;

    /// The identity this client is currently authenticated as, if any.
    fn current_identity(&self) -> impl Future<Output = Option<Identity>> + Send;

    /// Provision a throwaway guest identity and authenticate as it.
    fn provision_guest(&self) -> impl Future<Output = Result<Identity, Self::Error>> + Send;

    fn get_event(
        &self,
        id: &EventId,
    ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send;

    /// Resolve an event by join code. Works for any visibility; knowing the
    /// code is exactly what makes unlisted and private events reachable.
    fn find_event_by_code(
        &self,
        code: &JoinCode,
    ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send;

    /// The public directory. Must never contain unlisted or private events.
    fn list_public_events(&self) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send;

    fn create_photo(&self, photo: Photo) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Last-write-wins replacement of the full record.
    fn update_photo(&self, photo: Photo) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn delete_photo(&self, id: &PhotoId) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn get_photo(
        &self,
        id: &PhotoId,
    ) -> impl Future<Output = Result<Option<Photo>, Self::Error>> + Send;

    /// Photos of one event admitted by `filter`, newest first.
    fn list_photos(
        &self,
        event: &EventId,
        filter: StatusFilter,
    ) -> impl Future<Output = Result<Vec<Photo>, Self::Error>> + Send;

    /// Megabytes of storage an event's photos currently occupy. Consulted
    /// at upload admission for events carrying a storage budget.
    fn used_storage_mb(
        &self,
        event: &EventId,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    /// Open a change-notification stream for one event's photo collection.
    fn subscribe(
        &self,
        event: &EventId,
    ) -> impl Future<Output = Result<Self::Subscription, Self::Error>> + Send;
}

pub trait Subscription: Send + Sync {
    type Error: Error + Send;

    type EventStream: Stream<Item = Result<StreamEvent, Self::Error>> + Send + Unpin;

    fn id(&self) -> SubscriptionId;

    /// The stream of events for this subscription. A stream that ends has
    /// stopped delivering for good (torn down, or events were lost beyond
    /// recovery); the consumer must resubscribe and reseed its state.
    fn events(&self) -> Self::EventStream;

    /// Stop delivery. Idempotent; unsubscribing twice is a no-op.
    fn unsubscribe(self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    #[error("photo not found: {0}")]
    PhotoNotFound(PhotoId),

    #[error("photo record already exists: {0}")]
    DuplicatePhoto(PhotoId),
}
