// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::de::Visitor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Human-entry join token for an event.
///
/// Codes are matched case-insensitively everywhere. To avoid scattering
/// comparison rules across the codebase the code is normalised to uppercase
/// once, at construction, so that every storage and comparison boundary sees
/// the same canonical form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JoinCode(String);

impl JoinCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for JoinCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JoinCode {
    type Err = JoinCodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(JoinCodeError::Empty);
        }

        if let Some(character) = trimmed.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(JoinCodeError::InvalidCharacter(character));
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }
}

impl TryFrom<&str> for JoinCode {
    type Error = JoinCodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for JoinCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for JoinCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct JoinCodeVisitor;

        impl<'de> Visitor<'de> for JoinCodeVisitor {
            type Value = JoinCode;

            fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
                formatter.write_str("join code encoded as string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                JoinCode::from_str(value).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_str(JoinCodeVisitor)
    }
}

#[derive(Debug, Error)]
pub enum JoinCodeError {
    #[error("join code is empty")]
    Empty,

    #[error("invalid character in join code: {0:?}")]
    InvalidCharacter(char),
}
