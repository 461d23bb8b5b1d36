#![forbid(unsafe_code)]

//! Action registry: binds action types to forward/backward state mutators.
//!
//! An [`ActionRegistry<S>`] maps an [`ActionType`] tag to the pair of
//! functions that apply and revert that action on the caller's state `S`.
//! Registration hands back a typed [`ActionHandle<P>`]; dispatching through
//! the handle is checked against `P` at compile time, and the untyped path
//! ([`HistoryEngine::dispatch_dyn`](crate::HistoryEngine::dispatch_dyn)) is
//! checked at runtime against the registered payload type.
//!
//! # Payload shapes
//!
//! - **Standard** actions carry a [`Standard<T, R>`] payload. The caller
//!   writes one state setter; forward applies `to`, backward applies `from`,
//!   and `rest` is passed to both.
//! - **Custom** actions carry any payload `P`. The caller supplies both
//!   directions through a [`CustomHandler`], optionally with pure projections
//!   that derive the forward and backward sub-payloads from `P`.
//!
//! ```ignore
//! let mut registry = ActionRegistry::<Board>::new();
//! let update_text = registry.register_standard("updateText", |board, text: &String, id: &CardId| {
//!     board.set_text(id, text);
//! })?;
//! let add_card = registry.register_custom(
//!     "addCard",
//!     CustomHandler::new(|board, card: &Card| board.push(card.clone()), |board, card| board.remove(&card.id)),
//! )?;
//! ```

use std::any::{Any, TypeId, type_name};
use std::borrow::{Borrow, Cow};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::branch::HistoryItem;
use crate::error::{HistoryError, Result};

/// Tag identifying a registered action type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionType(Cow<'static, str>);

impl ActionType {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ActionType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ActionType {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ActionType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// How an action's payload encodes its two directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Explicit `from`/`to` pair, see [`Standard`].
    Standard,
    /// Caller-defined payload with explicit forward/backward mutators.
    Custom,
}

/// Replay direction of a single history item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        })
    }
}

/// Payload of a standard action: the value before and after, plus any
/// extra data both directions need.
#[derive(Debug, Clone, PartialEq)]
pub struct Standard<T, R = ()> {
    pub from: T,
    pub to: T,
    pub rest: R,
}

impl<T> Standard<T> {
    /// Payload with no extra data.
    #[must_use]
    pub fn between(from: T, to: T) -> Self {
        Self { from, to, rest: () }
    }
}

impl<T, R> Standard<T, R> {
    #[must_use]
    pub fn new(from: T, to: T, rest: R) -> Self {
        Self { from, to, rest }
    }

    /// The value a replay in `direction` writes.
    #[must_use]
    pub fn side(&self, direction: Direction) -> &T {
        match direction {
            Direction::Forward => &self.to,
            Direction::Backward => &self.from,
        }
    }
}

/// A committed, type-erased action payload.
///
/// Cloning is cheap: the value is shared.
#[derive(Clone)]
pub struct Payload {
    shape: PayloadShape,
    value: Arc<dyn Any + Send + Sync>,
}

impl Payload {
    pub(crate) fn new<P: Any + Send + Sync>(shape: PayloadShape, value: P) -> Self {
        Self {
            shape,
            value: Arc::new(value),
        }
    }

    #[must_use]
    pub fn shape(&self) -> PayloadShape {
        self.shape
    }

    /// Borrow the payload as its concrete type.
    #[must_use]
    pub fn downcast_ref<P: Any>(&self) -> Option<&P> {
        self.value.downcast_ref::<P>()
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        (*self.value).type_id()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// Typed entry point for dispatching one registered action type.
pub struct ActionHandle<P> {
    action: ActionType,
    _payload: PhantomData<fn(P)>,
}

impl<P> ActionHandle<P> {
    fn new(action: ActionType) -> Self {
        Self {
            action,
            _payload: PhantomData,
        }
    }

    #[must_use]
    pub fn action(&self) -> &ActionType {
        &self.action
    }
}

impl<P> Clone for ActionHandle<P> {
    fn clone(&self) -> Self {
        Self::new(self.action.clone())
    }
}

impl<P> fmt::Debug for ActionHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandle")
            .field("action", &self.action)
            .field("payload", &type_name::<P>())
            .finish()
    }
}

/// Callback type for one direction of a custom action.
pub type CustomFn<S, P> = Box<dyn Fn(&mut S, &P)>;

/// Forward and backward mutators of a custom action.
pub struct CustomHandler<S, P> {
    forward: CustomFn<S, P>,
    backward: CustomFn<S, P>,
}

impl<S: 'static, P: 'static> CustomHandler<S, P> {
    /// Mutators that read the committed payload directly.
    pub fn new<F, B>(forward: F, backward: B) -> Self
    where
        F: Fn(&mut S, &P) + 'static,
        B: Fn(&mut S, &P) + 'static,
    {
        Self {
            forward: Box::new(forward),
            backward: Box::new(backward),
        }
    }

    /// Mutators fed by pure projections of the committed payload.
    ///
    /// `to_forward` and `to_backward` derive the sub-payload each direction
    /// needs, e.g. the ids to recolor versus the colors to restore.
    pub fn projected<FP, F, BP, B, FwdIn, BwdIn>(
        to_forward: FP,
        forward: F,
        to_backward: BP,
        backward: B,
    ) -> Self
    where
        FP: Fn(&P) -> FwdIn + 'static,
        F: Fn(&mut S, FwdIn) + 'static,
        BP: Fn(&P) -> BwdIn + 'static,
        B: Fn(&mut S, BwdIn) + 'static,
        FwdIn: 'static,
        BwdIn: 'static,
    {
        Self::new(
            move |state, payload| forward(state, to_forward(payload)),
            move |state, payload| backward(state, to_backward(payload)),
        )
    }
}

impl<S, P> fmt::Debug for CustomHandler<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomHandler")
            .field("payload", &type_name::<P>())
            .finish_non_exhaustive()
    }
}

type Mutator<S> = Box<dyn Fn(&mut S, &Payload) -> Result<()>>;
type StandardApply<S> = Box<dyn Fn(&mut S, &Payload, Direction) -> Result<()>>;
type Describer = Box<dyn Fn(&Payload) -> Option<String>>;

enum Binding<S> {
    Standard { apply: StandardApply<S> },
    Custom { forward: Mutator<S>, backward: Mutator<S> },
}

struct Registration<S> {
    binding: Binding<S>,
    payload_type: TypeId,
    payload_name: &'static str,
    describe: Option<Describer>,
}

impl<S> Registration<S> {
    fn new<P: Any>(binding: Binding<S>) -> Self {
        Self {
            binding,
            payload_type: TypeId::of::<P>(),
            payload_name: type_name::<P>(),
            describe: None,
        }
    }

    fn shape(&self) -> PayloadShape {
        match self.binding {
            Binding::Standard { .. } => PayloadShape::Standard,
            Binding::Custom { .. } => PayloadShape::Custom,
        }
    }
}

fn downcast<'a, P: Any>(action: &ActionType, payload: &'a Payload) -> Result<&'a P> {
    payload
        .downcast_ref::<P>()
        .ok_or_else(|| HistoryError::PayloadMismatch {
            action: action.clone(),
            expected: type_name::<P>(),
        })
}

/// Instance-scoped table of action bindings for state type `S`.
pub struct ActionRegistry<S> {
    registrations: BTreeMap<ActionType, Registration<S>>,
}

impl<S> fmt::Debug for ActionRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.registrations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<S> Default for ActionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ActionRegistry<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registrations: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn contains(&self, action: &str) -> bool {
        self.registrations.contains_key(action)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registered action types in sorted order.
    pub fn action_types(&self) -> impl Iterator<Item = &ActionType> {
        self.registrations.keys()
    }

    /// Shape of a registered action's payload.
    pub fn shape(&self, action: &ActionType) -> Result<PayloadShape> {
        Ok(self.registration(action)?.shape())
    }

    /// Human-readable description of a committed item.
    ///
    /// Uses the describer attached with [`describe_with`](Self::describe_with)
    /// and falls back to the action type name.
    #[must_use]
    pub fn describe(&self, item: &HistoryItem) -> String {
        self.registrations
            .get(item.action())
            .and_then(|registration| registration.describe.as_ref())
            .and_then(|describe| describe(item.payload()))
            .unwrap_or_else(|| item.action().to_string())
    }

    fn registration(&self, action: &ActionType) -> Result<&Registration<S>> {
        self.registrations
            .get(action)
            .ok_or_else(|| HistoryError::UnknownActionType(action.clone()))
    }

    fn insert<P>(&mut self, action: ActionType, registration: Registration<S>) -> Result<ActionHandle<P>> {
        if self.registrations.contains_key(&action) {
            return Err(HistoryError::DuplicateActionType(action));
        }
        tracing::debug!(
            target: "histree.registry",
            action = %action,
            payload = registration.payload_name,
            shape = ?registration.shape(),
            "action registered"
        );
        self.registrations.insert(action.clone(), registration);
        Ok(ActionHandle::new(action))
    }

    /// Wrap a payload for commit after checking it against the registration.
    pub(crate) fn payload_for<P: Any + Send + Sync>(&self, action: &ActionType, value: P) -> Result<Payload> {
        let registration = self.registration(action)?;
        if registration.payload_type != TypeId::of::<P>() {
            return Err(HistoryError::PayloadMismatch {
                action: action.clone(),
                expected: registration.payload_name,
            });
        }
        Ok(Payload::new(registration.shape(), value))
    }

    /// Run the bound mutator for `item` in `direction`.
    pub(crate) fn apply(&self, state: &mut S, item: &HistoryItem, direction: Direction) -> Result<()> {
        let registration = self.registration(item.action())?;
        match &registration.binding {
            Binding::Standard { apply } => apply(state, item.payload(), direction),
            Binding::Custom { forward, backward } => match direction {
                Direction::Forward => forward(state, item.payload()),
                Direction::Backward => backward(state, item.payload()),
            },
        }
    }
}

impl<S: 'static> ActionRegistry<S> {
    /// Register a standard (`from`/`to`) action with a single state setter.
    pub fn register_standard<T, R, F>(
        &mut self,
        action: impl Into<ActionType>,
        setter: F,
    ) -> Result<ActionHandle<Standard<T, R>>>
    where
        T: Any + Send + Sync,
        R: Any + Send + Sync,
        F: Fn(&mut S, &T, &R) + 'static,
    {
        let action = action.into();
        let key = action.clone();
        let apply: StandardApply<S> = Box::new(move |state, payload, direction| {
            let payload = downcast::<Standard<T, R>>(&key, payload)?;
            setter(state, payload.side(direction), &payload.rest);
            Ok(())
        });
        self.insert(
            action,
            Registration::new::<Standard<T, R>>(Binding::Standard { apply }),
        )
    }

    /// Register a custom action with explicit forward and backward mutators.
    pub fn register_custom<P>(
        &mut self,
        action: impl Into<ActionType>,
        handler: CustomHandler<S, P>,
    ) -> Result<ActionHandle<P>>
    where
        P: Any + Send + Sync,
    {
        let action = action.into();
        let CustomHandler {
            forward: apply_forward,
            backward: apply_backward,
        } = handler;

        let key = action.clone();
        let forward: Mutator<S> = Box::new(move |state, payload| {
            apply_forward(state, downcast::<P>(&key, payload)?);
            Ok(())
        });
        let key = action.clone();
        let backward: Mutator<S> = Box::new(move |state, payload| {
            apply_backward(state, downcast::<P>(&key, payload)?);
            Ok(())
        });
        self.insert(
            action,
            Registration::new::<P>(Binding::Custom { forward, backward }),
        )
    }

    /// Attach a payload describer used by [`describe`](Self::describe).
    pub fn describe_with<P, F>(&mut self, handle: &ActionHandle<P>, describe: F) -> Result<()>
    where
        P: Any,
        F: Fn(&P) -> String + 'static,
    {
        let action = handle.action();
        let registration = self
            .registrations
            .get_mut(action)
            .ok_or_else(|| HistoryError::UnknownActionType(action.clone()))?;
        registration.describe = Some(Box::new(move |payload| {
            payload.downcast_ref::<P>().map(|p| describe(p))
        }));
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
