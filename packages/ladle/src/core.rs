//! Message traits for the ladle bus.
//!
//! # Overview
//!
//! Ladle separates **intent** from **facts**:
//! - [`Command`] = Intent (exactly one handler, runs in one unit of work)
//! - [`Event`] = Facts (zero or more handlers, each in its own unit of work)
//!
//! Both travel through the bus as a [`Message`]. Concrete message types are
//! identified by a [`MessageType`] tag, which is also the registry key.
//!
//! # Correlation
//!
//! Every top-level `handle()` call gets a [`CorrelationId`]. It is attached to
//! every log record emitted while the call's queue drains, so the command and
//! all of the event handlers it triggered can be traced together.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Stable identity of a concrete message type.
///
/// Equality and hashing use the `TypeId` only; the name is carried for logs
/// and error messages.
#[derive(Clone, Copy)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    /// Tag for the message type `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name (e.g. `server_core::domains::recipes::events::RecipeCreated`).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name (e.g. `RecipeCreated`).
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageType").field(&self.name).finish()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Correlation ID for tracking everything triggered by one `handle()` call.
///
/// Use `CorrelationId::NONE` for uncorrelated work, or `CorrelationId::new()`
/// to generate a fresh ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Sentinel value for uncorrelated work.
    ///
    /// Uses nil UUID (`00000000-0000-0000-0000-000000000000`).
    pub const NONE: Self = Self(Uuid::nil());

    /// Create a new random correlation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Check if this is the NONE sentinel value.
    pub fn is_none(&self) -> bool {
        self.0.is_nil()
    }

    /// Get the inner UUID value.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A fact - something that already happened.
///
/// Events are immutable descriptions of a state transition. They carry the
/// identifiers of the affected aggregate, its version after the transition,
/// and whatever observers need.
///
/// **Note**: This trait is automatically implemented for any type that is
/// `Clone + Send + Sync + 'static`. You don't need to implement it manually.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// pub struct RecipeCreated {
///     pub recipe_id: RecipeId,
///     pub name: String,
///     pub version: i64,
/// }
/// // Event is automatically implemented!
/// ```
pub trait Event: Any + Send + Sync + 'static {}

// Blanket implementation for any type that meets the requirements
impl<T: Clone + Send + Sync + 'static> Event for T {}

/// An intent to change state.
///
/// Exactly one handler is registered per concrete command type. The handler's
/// return value is the command's `Output`, handed back to the caller of
/// `MessageBus::handle`.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// pub struct CreateRecipe {
///     pub author_id: Uuid,
///     pub name: String,
/// }
///
/// impl Command for CreateRecipe {
///     type Output = RecipeId;
/// }
/// ```
pub trait Command: Send + 'static {
    /// Value returned to the caller once the command (and every event it
    /// caused) has been processed.
    type Output: Send + 'static;
}

/// Envelope wrapping a recorded event.
///
/// The payload is shared (`Arc`) so one event can be handed to several
/// concurrent handlers without cloning the domain value.
#[derive(Clone)]
pub struct EventEnvelope {
    message_type: MessageType,
    payload: Arc<dyn Any + Send + Sync>,
    recorded_at: DateTime<Utc>,
}

impl EventEnvelope {
    /// Wrap an event.
    pub fn new<E: Event>(event: E) -> Self {
        Self {
            message_type: MessageType::of::<E>(),
            payload: Arc::new(event),
            recorded_at: Utc::now(),
        }
    }

    /// The concrete event type.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// When the aggregate recorded the event.
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// Downcast the payload to a concrete event type.
    pub fn downcast_ref<E: Any>(&self) -> Option<&E> {
        self.payload.downcast_ref()
    }

    /// Check whether the payload is an `E`.
    pub fn is<E: Any>(&self) -> bool {
        self.payload.is::<E>()
    }
}

impl fmt::Debug for EventEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEnvelope")
            .field("type", &self.message_type)
            .field("recorded_at", &self.recorded_at)
            .finish_non_exhaustive()
    }
}

/// Envelope wrapping a command on its way to its single handler.
pub struct CommandEnvelope {
    message_type: MessageType,
    payload: Box<dyn Any + Send>,
}

impl CommandEnvelope {
    /// Wrap a command.
    pub fn new<C: Command>(command: C) -> Self {
        Self {
            message_type: MessageType::of::<C>(),
            payload: Box::new(command),
        }
    }

    /// The concrete command type.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub(crate) fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload
    }
}

impl fmt::Debug for CommandEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEnvelope")
            .field("type", &self.message_type)
            .finish_non_exhaustive()
    }
}

/// The unit of work flowing through the bus queue.
#[derive(Debug)]
pub enum Message {
    /// An intent with exactly one handler.
    Command(CommandEnvelope),
    /// A fact with zero or more handlers.
    Event(EventEnvelope),
}

impl Message {
    /// Wrap a command.
    pub fn command<C: Command>(command: C) -> Self {
        Message::Command(CommandEnvelope::new(command))
    }

    /// Wrap an event.
    pub fn event<E: Event>(event: E) -> Self {
        Message::Event(EventEnvelope::new(event))
    }

    /// Tag of the wrapped message.
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Command(command) => command.message_type(),
            Message::Event(event) => event.message_type(),
        }
    }

    /// Returns true if this is a command.
    pub fn is_command(&self) -> bool {
        matches!(self, Message::Command(_))
    }
}

impl From<EventEnvelope> for Message {
    fn from(envelope: EventEnvelope) -> Self {
        Message::Event(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct WidgetCreated {
        id: u32,
    }

    struct CreateWidget;

    impl Command for CreateWidget {
        type Output = u32;
    }

    #[test]
    fn message_type_equality_ignores_name_formatting() {
        assert_eq!(MessageType::of::<WidgetCreated>(), MessageType::of::<WidgetCreated>());
        assert_ne!(MessageType::of::<WidgetCreated>(), MessageType::of::<CreateWidget>());
        assert_eq!(MessageType::of::<WidgetCreated>().short_name(), "WidgetCreated");
    }

    #[test]
    fn envelope_downcasts_to_its_payload() {
        let envelope = EventEnvelope::new(WidgetCreated { id: 7 });

        assert!(envelope.is::<WidgetCreated>());
        assert_eq!(envelope.downcast_ref::<WidgetCreated>(), Some(&WidgetCreated { id: 7 }));
        assert!(envelope.downcast_ref::<String>().is_none());
    }

    #[test]
    fn message_reports_its_kind() {
        let command = Message::command(CreateWidget);
        let event = Message::event(WidgetCreated { id: 1 });

        assert!(command.is_command());
        assert!(!event.is_command());
        assert_eq!(command.message_type(), MessageType::of::<CreateWidget>());
    }

    #[test]
    fn correlation_id_display() {
        assert_eq!(CorrelationId::NONE.to_string(), "NONE");
        assert!(!CorrelationId::new().is_none());
    }
}
