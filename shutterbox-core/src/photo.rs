// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::event::EventId;
use crate::identity::UserId;
use crate::lifecycle::{PhotoStatus, initial_status};
use crate::likes::LikeSet;

/// Opaque identifier of a photo record.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhotoId(String);

impl PhotoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PhotoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A single uploaded photo record.
///
/// The binary file itself lives with the storage collaborator; the record
/// only carries its name. The uploader is absent for anonymous uploads on
/// events which allow them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub event: EventId,
    #[serde(default)]
    pub uploader: Option<UserId>,
    pub file: String,
    #[serde(default)]
    pub caption: Option<String>,
    pub status: PhotoStatus,
    #[serde(default)]
    pub likes: LikeSet,
    /// Unix timestamp of record creation, used for newest-first sorting.
    pub created: u64,
}

impl Photo {
    /// Creates a new photo record. The initial status is derived exactly
    /// once here, from the `approval_required` flag of the event at upload
    /// time.
    pub fn new(
        id: impl Into<PhotoId>,
        event: EventId,
        uploader: Option<UserId>,
        file: impl Into<String>,
        approval_required: bool,
        created: u64,
    ) -> Self {
        Self {
            id: id.into(),
            event,
            uploader,
            file: file.into(),
            caption: None,
            status: initial_status(approval_required),
            likes: LikeSet::new(),
            created,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::event::EventId;
    use crate::identity::UserId;
    use crate::lifecycle::PhotoStatus;

    use super::Photo;

    #[test]
    fn initial_status_is_derived_at_creation() {
        let moderated = Photo::new(
            "photo-1",
            EventId::new("event-1"),
            Some(UserId::new("ada")),
            "a.jpg",
            true,
            100,
        );
        assert_eq!(moderated.status, PhotoStatus::Pending);

        let unmoderated = Photo::new(
            "photo-2",
            EventId::new("event-1"),
            None,
            "b.jpg",
            false,
            101,
        );
        assert_eq!(unmoderated.status, PhotoStatus::Approved);
    }

    #[test]
    fn deserialises_storage_quirk_shapes() {
        // The likes relation arrives as a scalar, the uploader is missing
        // entirely: both are tolerated.
        let photo: Photo = serde_json::from_str(
            r#"{
                "id": "photo-1",
                "event": "event-1",
                "file": "a.jpg",
                "status": "approved",
                "likes": "ada",
                "created": 100
            }"#,
        )
        .unwrap();

        assert!(photo.uploader.is_none());
        assert_eq!(photo.likes.len(), 1);
        assert_eq!(photo.status, PhotoStatus::Approved);
    }
}
