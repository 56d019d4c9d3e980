// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use shutterbox_core::{
    AccessDenied, AccessPolicy, Event, EventId, Gate, Identity, Invitation, InvitationError,
    InvitationRegistry, JoinRequest, LifecycleError, Moderator, Photo, PhotoId, PhotoStatus,
    StatusFilter, UserId, lifecycle,
};
use shutterbox_store::{Backend, RecordAction, Subscription, SubscriptionId};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::subscription::ViewSubscription;
use crate::view::{ClientView, PhotoEntry};

pub(crate) type ViewKey = (EventId, StatusFilter);

/// A user-initiated mutation, expressed as data.
///
/// Every action names the acting identity explicitly; the engine carries no
/// ambient session state.
#[derive(Clone, Debug)]
pub enum LocalAction {
    Upload {
        photo_id: PhotoId,
        file: String,
        caption: Option<String>,
        uploader: Identity,
        /// Size of the binary being uploaded, counted against the event's
        /// storage budget.
        size_mb: u64,
        created: u64,
    },
    Moderate {
        photo_id: PhotoId,
        to: PhotoStatus,
        moderator: Moderator,
    },
    EditCaption {
        photo_id: PhotoId,
        caption: Option<String>,
        actor: UserId,
    },
    ToggleLike {
        photo_id: PhotoId,
        user: UserId,
    },
    Delete {
        photo_id: PhotoId,
        actor: UserId,
    },
}

/// Owns the client's views and reconciles the two input streams over them.
///
/// Local actions are validated, applied to every view of the event
/// optimistically and then submitted to the storage collaborator. The
/// submission is not rolled back on failure; the engine's contract is to
/// reflect committed plus locally-intended state, and surfacing a failed
/// submission (retry, explicit rollback) is the caller's business.
///
/// Remote notifications are merged by the [`ViewSubscription`] returned from
/// [`ReconciliationEngine::subscribe`] as its stream is polled.
pub struct ReconciliationEngine<B>
where
    B: Backend,
{
    inner: Arc<Inner<B>>,
}

struct Inner<B>
where
    B: Backend,
{
    backend: Arc<B>,
    registry: Mutex<InvitationRegistry>,
    events: RwLock<HashMap<EventId, Event>>,
    views: RwLock<HashMap<ViewKey, Arc<Mutex<ClientView>>>>,
    subscriptions: RwLock<HashMap<SubscriptionId, (ViewKey, B::Subscription)>>,
}

impl<B> Clone for ReconciliationEngine<B>
where
    B: Backend,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B> ReconciliationEngine<B>
where
    B: Backend,
{
    pub fn new(backend: B) -> Self {
        let inner = Inner {
            backend: Arc::new(backend),
            registry: Mutex::new(InvitationRegistry::new()),
            events: RwLock::new(HashMap::new()),
            views: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn backend(&self) -> &B {
        self.inner.backend.as_ref()
    }

    /// Evaluates whether a requester may join `event`, consulting the
    /// engine's invitation registry. Pure passthrough to the access policy;
    /// exposed so the UI layer has a single entry point.
    pub fn evaluate_access(
        &self,
        event: Option<&Event>,
        request: &JoinRequest,
    ) -> Result<Gate, AccessDenied> {
        let registry = self
            .inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        AccessPolicy::can_join(event, &registry, request)
    }

    /// Invite an identity to an event. Owner-only, like every invitation
    /// mutation.
    pub fn invite(
        &self,
        event: &Event,
        actor: &UserId,
        email: &str,
    ) -> Result<Invitation, InvitationError> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .invite(event, actor, email)
    }

    pub fn revoke_invitation(
        &self,
        event: &Event,
        actor: &UserId,
        email: &str,
    ) -> Result<(), InvitationError> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .revoke(event, actor, email)
    }

    /// Opens a view over `event` restricted to `filter`, seeded with the
    /// collaborator's current state and kept up to date by polling the
    /// returned subscription.
    ///
    /// Subscribing again for the same (event, filter) replaces the engine's
    /// registered view; the older subscription keeps its own projection but
    /// no longer backs [`Self::list_view`].
    pub async fn subscribe(
        &self,
        event: Event,
        filter: StatusFilter,
    ) -> Result<ViewSubscription<B>, EngineError<B>> {
        let backend_subscription = self
            .inner
            .backend
            .subscribe(&event.id)
            .await
            .map_err(EngineError::Backend)?;

        let photos = self
            .inner
            .backend
            .list_photos(&event.id, filter)
            .await
            .map_err(EngineError::Backend)?;

        let mut view = ClientView::new(event.id.clone(), filter);
        view.seed(photos);
        let view = Arc::new(Mutex::new(view));

        let key: ViewKey = (event.id.clone(), filter);
        let subscription_id = backend_subscription.id();
        let event_stream = backend_subscription.events();

        {
            let mut events = self.inner.events.write().await;
            events.insert(event.id.clone(), event);
        }
        {
            let mut views = self.inner.views.write().await;
            views.insert(key.clone(), view.clone());
        }
        {
            let mut subscriptions = self.inner.subscriptions.write().await;
            subscriptions.insert(subscription_id, (key.clone(), backend_subscription));
        }

        Ok(ViewSubscription::new(
            key,
            subscription_id,
            event_stream,
            view,
            self.clone(),
        ))
    }

    /// Tears down a subscription and its view. Idempotent; unknown ids are
    /// a no-op. In-flight local submissions are not cancelled.
    pub async fn unsubscribe(&self, subscription_id: SubscriptionId) -> Result<(), EngineError<B>> {
        let removed = {
            let mut subscriptions = self.inner.subscriptions.write().await;
            subscriptions.remove(&subscription_id)
        };

        let Some((key, backend_subscription)) = removed else {
            return Ok(());
        };

        backend_subscription
            .unsubscribe()
            .await
            .map_err(EngineError::Subscription)?;

        let remaining = {
            let mut views = self.inner.views.write().await;
            views.remove(&key);
            views.keys().any(|(event_id, _)| *event_id == key.0)
        };

        if !remaining {
            let mut events = self.inner.events.write().await;
            events.remove(&key.0);
        }

        Ok(())
    }

    /// Snapshot of the registered view for (event, filter); empty when no
    /// such view exists.
    pub async fn list_view(&self, event_id: &EventId, filter: StatusFilter) -> Vec<PhotoEntry> {
        let views = self.inner.views.read().await;

        match views.get(&(event_id.clone(), filter)) {
            Some(view) => view
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entries()
                .to_vec(),
            None => Vec::new(),
        }
    }

    /// Validates a local action, applies it to every view of the event
    /// optimistically and submits it to the storage collaborator.
    ///
    /// An invalid action fails before any view is touched. A submission
    /// failure is reported as [`EngineError::SubmissionFailed`] with the
    /// optimistic state left in place.
    pub async fn apply_local(
        &self,
        event_id: &EventId,
        action: LocalAction,
    ) -> Result<(), EngineError<B>> {
        let event = {
            let events = self.inner.events.read().await;
            events
                .get(event_id)
                .cloned()
                .ok_or_else(|| EngineError::NotSubscribed(event_id.clone()))?
        };

        match action {
            LocalAction::Upload {
                photo_id,
                file,
                caption,
                uploader,
                size_mb,
                created,
            } => {
                // A budget of zero means unlimited; no point asking the
                // collaborator for usage then.
                let used_mb = if event.storage_limit_mb > 0 {
                    self.inner
                        .backend
                        .used_storage_mb(&event.id)
                        .await
                        .map_err(EngineError::Backend)?
                } else {
                    0
                };
                AccessPolicy::can_upload_sized(&event, &uploader, used_mb, size_mb)?;

                let mut photo = Photo::new(
                    photo_id,
                    event.id.clone(),
                    Some(uploader.id().clone()),
                    file,
                    event.approval_required,
                    created,
                );
                photo.caption = caption;

                let uploader_name = uploader.email().map(str::to_string);
                self.apply_to_views(event_id, RecordAction::Create, &photo, uploader_name)
                    .await;

                self.inner
                    .backend
                    .create_photo(photo)
                    .await
                    .map_err(EngineError::SubmissionFailed)
            }
            LocalAction::Moderate {
                photo_id,
                to,
                moderator,
            } => {
                let mut photo = self.resolve_photo(event_id, &photo_id).await?;
                lifecycle::check_transition(photo.status, to, moderator)?;
                photo.status = to;

                self.submit_update(event_id, photo).await
            }
            LocalAction::EditCaption {
                photo_id,
                caption,
                actor,
            } => {
                let mut photo = self.resolve_photo(event_id, &photo_id).await?;
                if !lifecycle::may_edit_caption(&photo, &actor) {
                    return Err(EngineError::Lifecycle(LifecycleError::PermissionDenied));
                }
                photo.caption = caption;

                self.submit_update(event_id, photo).await
            }
            LocalAction::ToggleLike { photo_id, user } => {
                let mut photo = self.resolve_photo(event_id, &photo_id).await?;
                photo.likes = photo.likes.toggle(&user);

                self.submit_update(event_id, photo).await
            }
            LocalAction::Delete { photo_id, actor } => {
                let photo = self.resolve_photo(event_id, &photo_id).await?;
                if !lifecycle::may_delete(&photo, &event, &actor) {
                    return Err(EngineError::Lifecycle(LifecycleError::PermissionDenied));
                }

                self.apply_to_views(event_id, RecordAction::Delete, &photo, None)
                    .await;

                self.inner
                    .backend
                    .delete_photo(&photo.id)
                    .await
                    .map_err(EngineError::SubmissionFailed)
            }
        }
    }

    async fn submit_update(&self, event_id: &EventId, photo: Photo) -> Result<(), EngineError<B>> {
        self.apply_to_views(event_id, RecordAction::Update, &photo, None)
            .await;

        self.inner
            .backend
            .update_photo(photo)
            .await
            .map_err(EngineError::SubmissionFailed)
    }

    /// The current record as this client knows it: local views first (they
    /// carry optimistic state the collaborator may not have committed yet),
    /// the collaborator as fallback.
    async fn resolve_photo(
        &self,
        event_id: &EventId,
        photo_id: &PhotoId,
    ) -> Result<Photo, EngineError<B>> {
        {
            let views = self.inner.views.read().await;
            for ((view_event, _), view) in views.iter() {
                if view_event != event_id {
                    continue;
                }

                let view = view.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(entry) = view.get(photo_id) {
                    return Ok(entry.photo.clone());
                }
            }
        }

        match self
            .inner
            .backend
            .get_photo(photo_id)
            .await
            .map_err(EngineError::Backend)?
        {
            Some(photo) if photo.event == *event_id => Ok(photo),
            _ => Err(EngineError::UnknownPhoto(photo_id.clone())),
        }
    }

    async fn apply_to_views(
        &self,
        event_id: &EventId,
        action: RecordAction,
        photo: &Photo,
        uploader_name: Option<String>,
    ) {
        let views = self.inner.views.read().await;

        for ((view_event, _), view) in views.iter() {
            if view_event != event_id {
                continue;
            }

            let mut view = view.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = view.apply_expanded(action, photo.clone(), uploader_name.clone());
        }
    }
}

#[derive(Error)]
pub enum EngineError<B>
where
    B: Backend,
{
    #[error(transparent)]
    Access(#[from] AccessDenied),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("not subscribed to event: {0}")]
    NotSubscribed(EventId),

    #[error("unknown photo: {0}")]
    UnknownPhoto(PhotoId),

    /// The optimistic view mutation stands; retrying or rolling back is up
    /// to the caller.
    #[error("remote submission failed: {0}")]
    SubmissionFailed(B::Error),

    #[error("{0}")]
    Backend(B::Error),

    #[error("{0}")]
    Subscription(<B::Subscription as Subscription>::Error),
}

// Derived on a generic enum, Debug would demand `B: Debug` even though no
// variant holds a `B`; spelled out instead so the bound stays on the
// associated error types alone.
impl<B> fmt::Debug for EngineError<B>
where
    B: Backend,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access(err) => f.debug_tuple("Access").field(err).finish(),
            Self::Lifecycle(err) => f.debug_tuple("Lifecycle").field(err).finish(),
            Self::NotSubscribed(event) => f.debug_tuple("NotSubscribed").field(event).finish(),
            Self::UnknownPhoto(photo) => f.debug_tuple("UnknownPhoto").field(photo).finish(),
            Self::SubmissionFailed(err) => f.debug_tuple("SubmissionFailed").field(err).finish(),
            Self::Backend(err) => f.debug_tuple("Backend").field(err).finish(),
            Self::Subscription(err) => f.debug_tuple("Subscription").field(err).finish(),
        }
    }
}
