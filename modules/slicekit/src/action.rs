//! Tags and the actions that carry them.

use std::borrow::{Borrow, Cow};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use slicekit_engine::ActionLike;

use crate::error::{Result, SlicekitError};

/// Prefix reserved for actions the library itself may emit.
pub const RESERVED_TAG_PREFIX: &str = "@@";

/// Literal discriminant naming one kind of action within a module.
///
/// Borrows as `str`, so tag maps are looked up directly with `&str`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(Cow<'static, str>);

impl Tag {
    pub const fn from_static(tag: &'static str) -> Self {
        Tag(Cow::Borrowed(tag))
    }

    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Tag(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty and outside the reserved namespace.
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() || self.0.starts_with(RESERVED_TAG_PREFIX) {
            return Err(SlicekitError::InvalidTag(self.0.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Tag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Tag {
    fn from(tag: &'static str) -> Self {
        Tag::from_static(tag)
    }
}

impl From<String> for Tag {
    fn from(tag: String) -> Self {
        Tag(Cow::Owned(tag))
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// A payload type bound to one tag.
///
/// `TAG` is the declared output shape of every constructor producing this
/// payload; module construction compares registration keys against it.
pub trait ActionPayload: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TAG: &'static str;
}

/// Immutable tagged payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    tag: Tag,
    #[serde(default)]
    payload: serde_json::Value,
}

impl Action {
    /// Build an action by hand. Mostly useful for actions owned by
    /// external reducers, which have no constructor of their own.
    pub fn new(tag: impl Into<Tag>, payload: serde_json::Value) -> Self {
        Self {
            tag: tag.into(),
            payload,
        }
    }

    pub fn from_payload<P: ActionPayload>(payload: &P) -> Result<Self> {
        let value = serde_json::to_value(payload).map_err(|source| SlicekitError::Encode {
            tag: Tag::from_static(P::TAG),
            source,
        })?;
        Ok(Self::new(P::TAG, value))
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Whether this action carries `P`'s tag.
    pub fn is<P: ActionPayload>(&self) -> bool {
        self.tag == P::TAG
    }

    /// Decode the payload as `P`. The tag is not checked; see [`Action::is`].
    pub fn decode<P: ActionPayload>(&self) -> Result<P> {
        P::deserialize(&self.payload).map_err(|source| SlicekitError::Decode {
            tag: self.tag.clone(),
            source,
        })
    }
}

impl ActionLike for Action {
    fn tag(&self) -> &str {
        self.tag.as_str()
    }

    fn to_payload(&self) -> serde_json::Value {
        self.payload.clone()
    }
}
