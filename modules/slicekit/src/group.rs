//! Action groups: one constructor and one transition bound to one tag.

use std::any::{type_name, TypeId};
use std::sync::Arc;

use crate::action::{Action, ActionPayload, Tag};
use crate::creators::ActionCreator;
use crate::error::Result;

/// A constructor producing `P` from arguments `A` (use a tuple for several
/// arguments), paired with the transition that consumes `P`.
///
/// The transition borrows the slice immutably and returns the next value;
/// it cannot mutate the state it was given.
pub struct ActionGroup<S, P, A> {
    constructor: Arc<dyn Fn(A) -> P + Send + Sync>,
    transition: Arc<dyn Fn(&S, &P) -> S + Send + Sync>,
}

impl<S, P, A> ActionGroup<S, P, A>
where
    S: Send + Sync + 'static,
    P: ActionPayload,
    A: 'static,
{
    pub fn new(
        constructor: impl Fn(A) -> P + Send + Sync + 'static,
        transition: impl Fn(&S, &P) -> S + Send + Sync + 'static,
    ) -> Self {
        Self {
            constructor: Arc::new(constructor),
            transition: Arc::new(transition),
        }
    }

    /// The tag every payload from this group carries.
    pub fn tag(&self) -> Tag {
        Tag::from_static(P::TAG)
    }

    pub fn construct(&self, args: A) -> P {
        (self.constructor)(args)
    }

    pub fn create(&self, args: A) -> Result<Action> {
        Action::from_payload(&self.construct(args))
    }

    pub fn transition(&self, state: &S, payload: &P) -> S {
        (self.transition)(state, payload)
    }
}

impl<S, P, A> Clone for ActionGroup<S, P, A> {
    fn clone(&self) -> Self {
        Self {
            constructor: Arc::clone(&self.constructor),
            transition: Arc::clone(&self.transition),
        }
    }
}

/// Functional spelling of [`ActionGroup::new`].
pub fn build_action_group<S, P, A>(
    constructor: impl Fn(A) -> P + Send + Sync + 'static,
    transition: impl Fn(&S, &P) -> S + Send + Sync + 'static,
) -> ActionGroup<S, P, A>
where
    S: Send + Sync + 'static,
    P: ActionPayload,
    A: 'static,
{
    ActionGroup::new(constructor, transition)
}

type Apply<S> = Arc<dyn Fn(&S, &Action) -> Result<S> + Send + Sync>;

/// The payload type a tag decodes to within one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadShape {
    pub tag: Tag,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

/// An action group with its payload and argument types erased, ready to be
/// stored next to groups of other payload types in one module.
pub struct ActionEntry<S> {
    tag: Tag,
    payload_type: TypeId,
    payload_name: &'static str,
    creator: ActionCreator,
    apply: Apply<S>,
}

impl<S> ActionEntry<S> {
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn creator(&self) -> &ActionCreator {
        &self.creator
    }

    pub fn shape(&self) -> PayloadShape {
        PayloadShape {
            tag: self.tag.clone(),
            type_id: self.payload_type,
            type_name: self.payload_name,
        }
    }

    /// Decode `action`'s payload and run the transition.
    pub fn apply(&self, state: &S, action: &Action) -> Result<S> {
        (self.apply)(state, action)
    }
}

impl<S> Clone for ActionEntry<S> {
    fn clone(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            payload_type: self.payload_type,
            payload_name: self.payload_name,
            creator: self.creator.clone(),
            apply: Arc::clone(&self.apply),
        }
    }
}

impl<S, P, A> From<ActionGroup<S, P, A>> for ActionEntry<S>
where
    S: Send + Sync + 'static,
    P: ActionPayload,
    A: 'static,
{
    fn from(group: ActionGroup<S, P, A>) -> Self {
        let constructor = Arc::clone(&group.constructor);
        let transition = Arc::clone(&group.transition);

        Self {
            tag: group.tag(),
            payload_type: TypeId::of::<P>(),
            payload_name: type_name::<P>(),
            creator: ActionCreator::new::<P, A>(move |args| constructor(args)),
            apply: Arc::new(move |state: &S, action: &Action| -> Result<S> {
                let payload = action.decode::<P>()?;
                Ok(transition(state, &payload))
            }),
        }
    }
}
