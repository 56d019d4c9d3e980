// SPDX-License-Identifier: MIT OR Apache-2.0

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::ready;
use shutterbox_store::{Backend, RecordAction, StreamEvent, Subscription, SubscriptionId};
use tracing::{debug, warn};

use crate::engine::{EngineError, ReconciliationEngine, ViewKey};
use crate::view::{ClientView, PhotoEntry, ViewChange};

/// Live handle on one (event, filter) view.
///
/// Polling the subscription drives the remote half of reconciliation: each
/// notification taken off the collaborator's stream is validated and merged
/// into the view, and every merge with a visible effect is yielded to the
/// caller. Notifications without visible effect (duplicates, records
/// outside the filter, foreign events) are absorbed silently; malformed
/// ones are dropped with a log line, never an error; a hostile upstream
/// must not take the client down.
///
/// The cooperative single-consumer model lives here: only the task polling
/// this stream merges remote state into the view, so remote merges never
/// overlap each other.
///
/// When the underlying stream ends the view freezes at its last merged
/// state and stops converging; subscribe again to obtain a freshly seeded
/// view.
pub struct ViewSubscription<B>
where
    B: Backend,
{
    key: ViewKey,
    subscription_id: SubscriptionId,
    engine: ReconciliationEngine<B>,
    event_stream: <B::Subscription as Subscription>::EventStream,
    view: Arc<Mutex<ClientView>>,
}

impl<B> ViewSubscription<B>
where
    B: Backend,
{
    pub(crate) fn new(
        key: ViewKey,
        subscription_id: SubscriptionId,
        event_stream: <B::Subscription as Subscription>::EventStream,
        view: Arc<Mutex<ClientView>>,
        engine: ReconciliationEngine<B>,
    ) -> Self {
        Self {
            key,
            subscription_id,
            engine,
            event_stream,
            view,
        }
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Current contents of this subscription's view, newest first.
    pub fn snapshot(&self) -> Vec<PhotoEntry> {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
            .to_vec()
    }

    /// Stops delivery and tears the view down. Idempotent through the
    /// engine; in-flight local submissions keep running.
    pub async fn unsubscribe(self) -> Result<(), EngineError<B>> {
        self.engine.unsubscribe(self.subscription_id).await
    }
}

impl<B> Stream for ViewSubscription<B>
where
    B: Backend,
{
    type Item = Result<ViewChange, EngineError<B>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let event = match ready!(Pin::new(&mut self.event_stream).poll_next(cx)) {
                Some(Ok(event)) => event,
                Some(Err(err)) => {
                    return Poll::Ready(Some(Err(EngineError::Subscription(err))));
                }
                None => return Poll::Ready(None),
            };

            match event {
                StreamEvent::Subscribed { .. } => continue,
                StreamEvent::Unsubscribed => return Poll::Ready(None),
                StreamEvent::Notification { action, record } => {
                    if record.id.is_empty() {
                        warn!("dropping notification without record identity");
                        continue;
                    }

                    if action == RecordAction::Unknown {
                        warn!(photo = %record.id, "dropping notification with unknown action");
                        continue;
                    }

                    if record.event != self.key.0 {
                        debug!(
                            event = %record.event,
                            "discarding notification for different event"
                        );
                        continue;
                    }

                    let change = {
                        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
                        view.apply(action, record)
                    };

                    match change {
                        Some(change) => return Poll::Ready(Some(Ok(change))),
                        // No visible effect; keep draining.
                        None => continue,
                    }
                }
            }
        }
    }
}
