use thiserror::Error;

use crate::action::Tag;

#[derive(Error, Debug)]
pub enum SlicekitError {
    #[error("Invalid tag {0:?}: tags must be non-empty and must not start with `@@`")]
    InvalidTag(String),

    #[error("Action group registered as `{key}` produces actions tagged `{tag}`")]
    TagMismatch { key: String, tag: Tag },

    #[error("Tag `{0}` is registered more than once in the same module")]
    DuplicateTag(Tag),

    #[error("Invalid slice name {0:?}: slice names must be non-empty")]
    InvalidSliceName(String),

    #[error("Slice `{0}` is claimed by more than one module or reducer")]
    SliceConflict(String),

    #[error(
        "Tag `{tag}` decodes as `{first_type}` in slice `{first_slice}` but as `{second_type}` in slice `{second_slice}`"
    )]
    TagShapeConflict {
        tag: Tag,
        first_slice: String,
        first_type: &'static str,
        second_slice: String,
        second_type: &'static str,
    },

    #[error("No action creator `{tag}` in slice `{slice}`")]
    UnknownCreator { slice: String, tag: String },

    #[error("Action creator `{tag}` expects arguments of type `{expected}`")]
    CreatorArgs { tag: Tag, expected: &'static str },

    #[error("Failed to encode payload for `{tag}`: {source}")]
    Encode {
        tag: Tag,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed payload for `{tag}`: {source}")]
    Decode {
        tag: Tag,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize slice `{slice}`: {source}")]
    Snapshot {
        slice: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Slice `{0}` does not hold the state type its reducer expects")]
    SliceType(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

pub type Result<T, E = SlicekitError> = std::result::Result<T, E>;
