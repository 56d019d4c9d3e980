// SPDX-License-Identifier: MIT OR Apache-2.0

use shutterbox_core::{EventId, Photo, PhotoId, StatusFilter};
use shutterbox_store::RecordAction;

/// One row of a client view: the photo record plus expansion data the client
/// resolved itself (currently the uploader's display name). Notifications
/// never carry expansion data, so merges preserve whatever the client holds.
#[derive(Clone, Debug, PartialEq)]
pub struct PhotoEntry {
    pub photo: Photo,
    pub uploader_name: Option<String>,
}

/// Visible effect a merge had on a view. Merges without visible effect
/// (duplicate create, delete of an absent record, record outside the
/// filter) produce no change at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewChange {
    Inserted(PhotoId),
    Updated(PhotoId),
    Removed(PhotoId),
}

/// A client-local, filtered, ordered projection of one event's photo
/// collection.
///
/// New entries go in newest first; updates replace in place, keeping the
/// position the entry already has. The same merge function serves both the
/// optimistic local path and the remote notification path, which is what
/// makes the two paths converge by construction.
#[derive(Clone, Debug)]
pub struct ClientView {
    event: EventId,
    filter: StatusFilter,
    entries: Vec<PhotoEntry>,
}

impl ClientView {
    pub fn new(event: EventId, filter: StatusFilter) -> Self {
        Self {
            event,
            filter,
            entries: Vec::new(),
        }
    }

    /// Replaces the view contents with an initial load from the
    /// collaborator, assumed already filtered and sorted newest first.
    pub fn seed(&mut self, photos: Vec<Photo>) {
        self.entries = photos
            .into_iter()
            .filter(|photo| photo.event == self.event && self.filter.admits(photo.status))
            .map(|photo| PhotoEntry {
                photo,
                uploader_name: None,
            })
            .collect();
    }

    pub fn event(&self) -> &EventId {
        &self.event
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn entries(&self) -> &[PhotoEntry] {
        &self.entries
    }

    pub fn get(&self, id: &PhotoId) -> Option<&PhotoEntry> {
        self.entries.iter().find(|entry| entry.photo.id == *id)
    }

    pub fn contains(&self, id: &PhotoId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges one change (local or remote) into the view. See
    /// [`Self::apply_expanded`].
    pub fn apply(&mut self, action: RecordAction, record: Photo) -> Option<ViewChange> {
        self.apply_expanded(action, record, None)
    }

    /// Merges one change into the view, optionally attaching expansion data
    /// (used by the local upload path, which knows the uploader).
    ///
    /// The rules, identical for both input streams:
    ///
    /// - A create for a record already present is a duplicate (an echo of a
    ///   local optimistic insert, or a redelivery) and is suppressed.
    /// - An update replaces fields in place and keeps locally-held expansion
    ///   data; when the new status falls outside the filter the entry is
    ///   removed, and when a previously unseen record newly enters the
    ///   filter it is inserted.
    /// - A delete is idempotent; deleting an absent record does nothing.
    /// - Records of a different event never touch the view.
    pub fn apply_expanded(
        &mut self,
        action: RecordAction,
        record: Photo,
        uploader_name: Option<String>,
    ) -> Option<ViewChange> {
        if record.event != self.event {
            return None;
        }

        let position = self
            .entries
            .iter()
            .position(|entry| entry.photo.id == record.id);
        let admitted = self.filter.admits(record.status);

        match (action, position) {
            (RecordAction::Create, Some(_)) => None,
            (RecordAction::Create, None) | (RecordAction::Update, None) if admitted => {
                let id = record.id.clone();
                self.entries.insert(
                    0,
                    PhotoEntry {
                        photo: record,
                        uploader_name,
                    },
                );
                Some(ViewChange::Inserted(id))
            }
            (RecordAction::Create, None) | (RecordAction::Update, None) => None,
            (RecordAction::Update, Some(index)) => {
                if admitted {
                    let entry = &mut self.entries[index];
                    entry.photo = record;
                    if uploader_name.is_some() {
                        entry.uploader_name = uploader_name;
                    }
                    Some(ViewChange::Updated(entry.photo.id.clone()))
                } else {
                    let entry = self.entries.remove(index);
                    Some(ViewChange::Removed(entry.photo.id))
                }
            }
            (RecordAction::Delete, Some(index)) => {
                let entry = self.entries.remove(index);
                Some(ViewChange::Removed(entry.photo.id))
            }
            (RecordAction::Delete, None) => None,
            (RecordAction::Unknown, _) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use shutterbox_core::{EventId, Photo, PhotoId, PhotoStatus, StatusFilter, UserId};
    use shutterbox_store::RecordAction;

    use super::{ClientView, ViewChange};

    fn photo(id: &str, status: PhotoStatus, created: u64) -> Photo {
        let mut photo = Photo::new(
            id,
            EventId::new("event-1"),
            Some(UserId::new("ada")),
            format!("{id}.jpg"),
            true,
            created,
        );
        photo.status = status;
        photo
    }

    fn approved_view() -> ClientView {
        ClientView::new(
            EventId::new("event-1"),
            StatusFilter::Only(PhotoStatus::Approved),
        )
    }

    #[test]
    fn creates_insert_newest_first_and_deduplicate() {
        let mut view = approved_view();

        view.apply(RecordAction::Create, photo("photo-1", PhotoStatus::Approved, 100));
        view.apply(RecordAction::Create, photo("photo-2", PhotoStatus::Approved, 200));

        assert_eq!(
            view.entries()
                .iter()
                .map(|entry| entry.photo.id.as_str())
                .collect::<Vec<_>>(),
            vec!["photo-2", "photo-1"]
        );

        // Redelivery of an already-present record changes nothing.
        let change = view.apply(RecordAction::Create, photo("photo-1", PhotoStatus::Approved, 100));
        assert_eq!(change, None);
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn creates_outside_the_filter_are_ignored() {
        let mut view = approved_view();

        let change = view.apply(RecordAction::Create, photo("photo-1", PhotoStatus::Pending, 100));
        assert_eq!(change, None);
        assert!(view.is_empty());
    }

    #[test]
    fn updates_follow_filter_admission() {
        let mut view = approved_view();
        view.apply(RecordAction::Create, photo("photo-1", PhotoStatus::Approved, 100));

        // Status change out of the filter removes the entry.
        let change = view.apply(RecordAction::Update, photo("photo-1", PhotoStatus::Rejected, 100));
        assert_eq!(change, Some(ViewChange::Removed(PhotoId::new("photo-1"))));
        assert!(view.is_empty());

        // A record the view has never seen enters through an update once
        // its status is admitted.
        let change = view.apply(RecordAction::Update, photo("photo-1", PhotoStatus::Approved, 100));
        assert_eq!(change, Some(ViewChange::Inserted(PhotoId::new("photo-1"))));
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn updates_preserve_expansion_data() {
        let mut view = approved_view();
        view.apply_expanded(
            RecordAction::Create,
            photo("photo-1", PhotoStatus::Approved, 100),
            Some("ada@example.org".to_string()),
        );

        let mut captioned = photo("photo-1", PhotoStatus::Approved, 100);
        captioned.caption = Some("sunset".to_string());
        view.apply(RecordAction::Update, captioned);

        let entry = view.get(&PhotoId::new("photo-1")).unwrap();
        assert_eq!(entry.photo.caption.as_deref(), Some("sunset"));
        assert_eq!(entry.uploader_name.as_deref(), Some("ada@example.org"));
    }

    #[test]
    fn deletes_are_idempotent() {
        let mut view = approved_view();
        view.apply(RecordAction::Create, photo("photo-1", PhotoStatus::Approved, 100));

        let change = view.apply(RecordAction::Delete, photo("photo-1", PhotoStatus::Approved, 100));
        assert_eq!(change, Some(ViewChange::Removed(PhotoId::new("photo-1"))));

        // Second delivery of the same delete is a no-op.
        let change = view.apply(RecordAction::Delete, photo("photo-1", PhotoStatus::Approved, 100));
        assert_eq!(change, None);
        assert!(view.is_empty());
    }

    #[test]
    fn records_of_other_events_never_touch_the_view() {
        let mut view = approved_view();

        let mut foreign = photo("photo-1", PhotoStatus::Approved, 100);
        foreign.event = EventId::new("event-2");

        assert_eq!(view.apply(RecordAction::Create, foreign), None);
        assert!(view.is_empty());
    }

    #[test]
    fn seed_filters_and_keeps_order() {
        let mut view = approved_view();
        view.seed(vec![
            photo("photo-3", PhotoStatus::Approved, 300),
            photo("photo-2", PhotoStatus::Pending, 200),
            photo("photo-1", PhotoStatus::Approved, 100),
        ]);

        assert_eq!(
            view.entries()
                .iter()
                .map(|entry| entry.photo.id.as_str())
                .collect::<Vec<_>>(),
            vec!["photo-3", "photo-1"]
        );
    }
}
