//! The action-creator table: a read-only mirror of every module's
//! constructors, keyed by slice name and then by tag.

use std::any::{type_name, Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::action::{Action, ActionPayload, Tag};
use crate::error::{Result, SlicekitError};

type CreateFn = Arc<dyn Fn(Box<dyn Any>) -> Result<Action> + Send + Sync>;

/// A constructor with its argument type erased. The argument type is checked
/// when the creator is called.
#[derive(Clone)]
pub struct ActionCreator {
    tag: Tag,
    args_type: &'static str,
    args_id: TypeId,
    create: CreateFn,
}

impl ActionCreator {
    pub(crate) fn new<P, A>(constructor: impl Fn(A) -> P + Send + Sync + 'static) -> Self
    where
        P: ActionPayload,
        A: 'static,
    {
        let tag = Tag::from_static(P::TAG);
        let args_type = type_name::<A>();

        Self {
            tag: tag.clone(),
            args_type,
            args_id: TypeId::of::<A>(),
            create: Arc::new(move |args: Box<dyn Any>| -> Result<Action> {
                let args = args
                    .downcast::<A>()
                    .map_err(|_| SlicekitError::CreatorArgs {
                        tag: tag.clone(),
                        expected: args_type,
                    })?;
                Action::from_payload(&constructor(*args))
            }),
        }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Name of the argument type this creator expects.
    pub fn args_type(&self) -> &'static str {
        self.args_type
    }

    pub fn accepts<A: 'static>(&self) -> bool {
        self.args_id == TypeId::of::<A>()
    }

    /// Build an action. `args` must be exactly the constructor's argument
    /// type; use `()` for constructors without arguments.
    pub fn create<A: 'static>(&self, args: A) -> Result<Action> {
        (self.create)(Box::new(args))
    }
}

impl fmt::Debug for ActionCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCreator")
            .field("tag", &self.tag)
            .field("args", &self.args_type)
            .finish()
    }
}

/// The creators contributed by one module.
#[derive(Debug, Clone)]
pub struct SliceCreators {
    slice: String,
    creators: BTreeMap<Tag, ActionCreator>,
}

impl SliceCreators {
    pub(crate) fn new(slice: impl Into<String>, creators: Vec<ActionCreator>) -> Self {
        Self {
            slice: slice.into(),
            creators: creators
                .into_iter()
                .map(|creator| (creator.tag().clone(), creator))
                .collect(),
        }
    }

    pub fn slice(&self) -> &str {
        &self.slice
    }

    pub fn get(&self, tag: &str) -> Option<&ActionCreator> {
        self.creators.get(tag)
    }

    pub fn create<A: 'static>(&self, tag: &str, args: A) -> Result<Action> {
        self.get(tag)
            .ok_or_else(|| SlicekitError::UnknownCreator {
                slice: self.slice.clone(),
                tag: tag.to_string(),
            })?
            .create(args)
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.creators.keys()
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}

/// `slice -> tag -> creator`. Only modules contribute; external reducers
/// have no constructors and do not appear here.
#[derive(Debug, Clone, Default)]
pub struct ActionCreatorTable {
    slices: BTreeMap<String, SliceCreators>,
}

impl ActionCreatorTable {
    pub(crate) fn insert(&mut self, creators: SliceCreators) {
        self.slices.insert(creators.slice.clone(), creators);
    }

    pub fn slice(&self, slice: &str) -> Option<&SliceCreators> {
        self.slices.get(slice)
    }

    pub fn get(&self, slice: &str, tag: &str) -> Option<&ActionCreator> {
        self.slice(slice)?.get(tag)
    }

    /// Shorthand for `table.slice(slice)?.create(tag, args)`.
    pub fn create<A: 'static>(&self, slice: &str, tag: &str, args: A) -> Result<Action> {
        self.slice(slice)
            .ok_or_else(|| SlicekitError::UnknownCreator {
                slice: slice.to_string(),
                tag: tag.to_string(),
            })?
            .create(tag, args)
    }

    pub fn slice_names(&self) -> impl Iterator<Item = &str> {
        self.slices.keys().map(String::as_str)
    }
}
