// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures_core::Stream;
use shutterbox_core::{
    AccessPolicy, Event, EventId, Identity, JoinCode, Photo, PhotoId, StatusFilter,
};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::traits::{
    Backend, RecordAction, StoreError, StreamEvent, Subscription, SubscriptionId,
};

#[derive(Debug)]
struct SubscriptionHandle {
    tx: broadcast::Sender<StreamEvent>,
    event_id: EventId,
}

#[derive(Debug, Default)]
struct State {
    events: HashMap<EventId, Event>,
    photos: HashMap<PhotoId, Photo>,
    identity: Option<Identity>,
    next_guest: u64,
    next_subscription_id: SubscriptionId,
    subscriptions: HashMap<SubscriptionId, SubscriptionHandle>,
}

impl State {
    /// Fan a notification out to every active subscription of the record's
    /// event. Called while holding the state lock, so notifications leave in
    /// commit order per record.
    fn notify(&self, action: RecordAction, record: &Photo) {
        for handle in self.subscriptions.values() {
            if handle.event_id == record.event {
                // A send error only means nobody is listening right now.
                let _ = handle.tx.send(StreamEvent::Notification {
                    action,
                    record: record.clone(),
                });
            }
        }
    }
}

/// In-memory implementation of the storage collaborator.
///
/// All writes go through one mutex, which is what gives the collaborator its
/// "writes are serialised" property. Every committed write is broadcast to
/// the matching subscriptions before the write call returns.
#[derive(Debug)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new() -> (Self, MemoryBackendHandle) {
        let state = Arc::new(Mutex::new(State::default()));

        let backend = Self {
            state: state.clone(),
        };

        let handle = MemoryBackendHandle { state };

        (backend, handle)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed or replace an event record.
    pub fn insert_event(&self, event: Event) {
        self.lock().events.insert(event.id.clone(), event);
    }

    /// Authenticate this client as `identity`.
    pub fn authenticate(&self, identity: Identity) {
        self.lock().identity = Some(identity);
    }

    /// Delete an event and cascade-delete its photos. Each removed photo is
    /// announced on the notification stream like any other committed write.
    pub fn delete_event(&self, id: &EventId) -> Result<(), StoreError> {
        let mut state = self.lock();

        if state.events.remove(id).is_none() {
            return Err(StoreError::EventNotFound(id.clone()));
        }

        let removed: Vec<Photo> = {
            let ids: Vec<PhotoId> = state
                .photos
                .values()
                .filter(|photo| photo.event == *id)
                .map(|photo| photo.id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|photo_id| state.photos.remove(&photo_id))
                .collect()
        };

        for photo in &removed {
            state.notify(RecordAction::Delete, photo);
        }

        Ok(())
    }

}

impl Backend for MemoryBackend {
    type Error = StoreError;

    type Subscription = MemorySubscription;

    async fn current_identity(&self) -> Option<Identity> {
        self.lock().identity.clone()
    }

    async fn provision_guest(&self) -> Result<Identity, Self::Error> {
        let mut state = self.lock();

        state.next_guest += 1;
        let identity = Identity::guest(format!("guest-{}", state.next_guest));
        state.identity = Some(identity.clone());

        Ok(identity)
    }

    async fn get_event(&self, id: &EventId) -> Result<Option<Event>, Self::Error> {
        Ok(self.lock().events.get(id).cloned())
    }

    async fn find_event_by_code(&self, code: &JoinCode) -> Result<Option<Event>, Self::Error> {
        Ok(self
            .lock()
            .events
            .values()
            .find(|event| event.code == *code)
            .cloned())
    }

    async fn list_public_events(&self) -> Result<Vec<Event>, Self::Error> {
        let mut events: Vec<Event> = self
            .lock()
            .events
            .values()
            .filter(|event| AccessPolicy::is_listable(event))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(events)
    }

    async fn create_photo(&self, photo: Photo) -> Result<(), Self::Error> {
        let mut state = self.lock();

        if state.photos.contains_key(&photo.id) {
            return Err(StoreError::DuplicatePhoto(photo.id));
        }

        state.photos.insert(photo.id.clone(), photo.clone());
        state.notify(RecordAction::Create, &photo);

        Ok(())
    }

    async fn update_photo(&self, photo: Photo) -> Result<(), Self::Error> {
        let mut state = self.lock();

        if !state.photos.contains_key(&photo.id) {
            return Err(StoreError::PhotoNotFound(photo.id));
        }

        state.photos.insert(photo.id.clone(), photo.clone());
        state.notify(RecordAction::Update, &photo);

        Ok(())
    }

    async fn delete_photo(&self, id: &PhotoId) -> Result<(), Self::Error> {
        let mut state = self.lock();

        let Some(photo) = state.photos.remove(id) else {
            return Err(StoreError::PhotoNotFound(id.clone()));
        };

        state.notify(RecordAction::Delete, &photo);

        Ok(())
    }

    async fn get_photo(&self, id: &PhotoId) -> Result<Option<Photo>, Self::Error> {
        Ok(self.lock().photos.get(id).cloned())
    }

    async fn list_photos(
        &self,
        event: &EventId,
        filter: StatusFilter,
    ) -> Result<Vec<Photo>, Self::Error> {
        let mut photos: Vec<Photo> = self
            .lock()
            .photos
            .values()
            .filter(|photo| photo.event == *event && filter.admits(photo.status))
            .cloned()
            .collect();

        // Newest first; record id breaks timestamp ties deterministically.
        photos.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));

        Ok(photos)
    }

    /// The reference backend has no real files, so every photo counts as
    /// one megabyte; enough to exercise the budget checks.
    async fn used_storage_mb(&self, event: &EventId) -> Result<u64, Self::Error> {
        Ok(self
            .lock()
            .photos
            .values()
            .filter(|photo| photo.event == *event)
            .count() as u64)
    }

    async fn subscribe(&self, event: &EventId) -> Result<Self::Subscription, Self::Error> {
        let mut state = self.lock();

        if !state.events.contains_key(event) {
            return Err(StoreError::EventNotFound(event.clone()));
        }

        state.next_subscription_id += 1;
        let subscription_id = state.next_subscription_id;

        let (tx, _) = broadcast::channel(128);

        state.subscriptions.insert(
            subscription_id,
            SubscriptionHandle {
                tx,
                event_id: event.clone(),
            },
        );

        Ok(MemorySubscription {
            id: subscription_id,
            state: self.state.clone(),
        })
    }
}

#[derive(Debug)]
pub struct MemorySubscription {
    id: SubscriptionId,
    state: Arc<Mutex<State>>,
}

impl Subscription for MemorySubscription {
    type Error = Infallible;

    type EventStream = MemoryEventStream;

    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn events(&self) -> Self::EventStream {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(handle) = state.subscriptions.get(&self.id) else {
            // Subscription was torn down already; yield an ended stream.
            let (tx, rx) = broadcast::channel(1);
            drop(tx);
            return MemoryEventStream::new(rx);
        };

        let rx = handle.tx.subscribe();
        let tx = handle.tx.clone();
        let subscription_id = self.id;
        drop(state);

        let _ = tx.send(StreamEvent::Subscribed { subscription_id });

        MemoryEventStream::new(rx)
    }

    async fn unsubscribe(self) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        // Dropping the handle drops the last sender, which closes the
        // channel once buffered events have been drained.
        if let Some(handle) = state.subscriptions.remove(&self.id) {
            let _ = handle.tx.send(StreamEvent::Unsubscribed);
        }

        Ok(())
    }
}

/// Event stream of one [`MemorySubscription`].
///
/// The stream ends when the subscription is torn down, and also when the
/// subscriber falls so far behind that the broadcast buffer overwrites
/// events it has not yet seen; lost events cannot be recovered, so a lagged
/// subscriber is no better off than an unsubscribed one. Either way, end of
/// stream means: resubscribe and reseed from a fresh listing.
#[derive(Debug)]
pub struct MemoryEventStream {
    stream: BroadcastStream<StreamEvent>,
}

impl MemoryEventStream {
    fn new(rx: broadcast::Receiver<StreamEvent>) -> Self {
        Self {
            stream: BroadcastStream::new(rx),
        }
    }
}

impl Stream for MemoryEventStream {
    type Item = Result<StreamEvent, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.stream).poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => Poll::Ready(Some(Ok(event))),
            // Lagged (events irrecoverably lost) or closed: end the stream
            // so the consumer resubscribes and reseeds.
            Poll::Ready(Some(Err(_))) | Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Test-side handle into the backend, for injecting raw stream events the
/// regular commit path would never produce: duplicates, replays, malformed
/// records, hostile actions.
#[derive(Debug, Clone)]
pub struct MemoryBackendHandle {
    state: Arc<Mutex<State>>,
}

impl MemoryBackendHandle {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send a raw event to one subscription, bypassing the commit path.
    pub fn send_to_subscription(
        &self,
        subscription_id: SubscriptionId,
        event: StreamEvent,
    ) -> Result<(), StreamEvent> {
        let state = self.lock();

        match state.subscriptions.get(&subscription_id) {
            Some(handle) => handle.tx.send(event).map(|_| ()).map_err(|err| err.0),
            None => Err(event),
        }
    }

    /// Send a raw event to all active subscriptions of an event.
    pub fn send_to_event(&self, event_id: &EventId, event: StreamEvent) {
        let state = self.lock();

        for handle in state.subscriptions.values() {
            if handle.event_id == *event_id {
                let _ = handle.tx.send(event.clone());
            }
        }
    }

    /// Authoritative record, as the collaborator currently holds it.
    pub fn photo(&self, id: &PhotoId) -> Option<Photo> {
        self.lock().photos.get(id).cloned()
    }

    pub fn active_subscription_ids(&self) -> Vec<SubscriptionId> {
        self.lock().subscriptions.keys().copied().collect()
    }
}
