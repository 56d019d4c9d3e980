// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// The "liked by" relation of a photo: a set of user identities.
///
/// The storage collaborator is sloppy about the wire shape of this relation
/// and may return it as an absent value, a single scalar identity or a
/// collection of identities (possibly with duplicates). All three shapes are
/// normalised into a deduplicated set during deserialisation, before any
/// further operation sees the value. Serialisation always emits the
/// collection shape.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LikeSet(BTreeSet<UserId>);

impl LikeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.0.contains(user)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.0.iter()
    }

    /// Toggle membership of `user`: remove it when present, insert it
    /// otherwise. Involutive, so toggling twice in immediate succession
    /// yields the original set back.
    #[must_use]
    pub fn toggle(&self, user: &UserId) -> LikeSet {
        let mut members = self.0.clone();
        if !members.remove(user) {
            members.insert(user.clone());
        }
        Self(members)
    }
}

impl FromIterator<UserId> for LikeSet {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for LikeSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for user in &self.0 {
            seq.serialize_element(user)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for LikeSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct LikeSetVisitor;

        impl<'de> Visitor<'de> for LikeSetVisitor {
            type Value = LikeSet;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("absent value, single identity or collection of identities")
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(LikeSet::new())
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(LikeSet::new())
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                // A blank scalar stands for "no likes".
                if value.trim().is_empty() {
                    Ok(LikeSet::new())
                } else {
                    Ok(LikeSet(BTreeSet::from([UserId::new(value)])))
                }
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut members = BTreeSet::new();
                while let Some(value) = seq.next_element::<String>()? {
                    if !value.trim().is_empty() {
                        members.insert(UserId::new(value));
                    }
                }
                Ok(LikeSet(members))
            }
        }

        deserializer.deserialize_any(LikeSetVisitor)
    }
}
