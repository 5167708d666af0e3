//! Handler registry keyed by message type.
//!
//! Built once at startup, immutable afterwards, shared by every bus clone.
//!
//! ```ignore
//! let registry = Registry::builder()
//!     .require_command::<CreateRecipe>()
//!     .command::<CreateRecipe, _>(CreateRecipeHandler)
//!     .event::<RecipeCreated, _>(AuditLog)
//!     .build()?;
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::{Command, Event, MessageType};
use crate::error::RegistryError;
use crate::handler::{
    AnyCommandHandler, AnyEventHandler, CommandHandler, CommandHandlerCell, EventHandler,
    EventHandlerCell,
};
use crate::uow::UnitOfWork;

/// Immutable map from message type to handlers.
pub struct Registry<U> {
    commands: HashMap<TypeId, Arc<dyn AnyCommandHandler<U>>>,
    events: HashMap<TypeId, Vec<Arc<dyn AnyEventHandler<U>>>>,
}

impl<U: UnitOfWork> Registry<U> {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder<U> {
        RegistryBuilder::new()
    }

    /// Returns true if a handler is registered for the command type.
    pub fn has_command<C: Command>(&self) -> bool {
        self.commands.contains_key(&TypeId::of::<C>())
    }

    /// Number of handlers registered for the event type.
    pub fn event_handler_count<E: Event>(&self) -> usize {
        self.events.get(&TypeId::of::<E>()).map_or(0, Vec::len)
    }

    /// Number of registered command types.
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub(crate) fn command_handler(
        &self,
        message_type: MessageType,
    ) -> Option<Arc<dyn AnyCommandHandler<U>>> {
        self.commands.get(&message_type.id()).cloned()
    }

    /// Handlers for an event, in registration order.
    pub(crate) fn event_handlers(&self, message_type: MessageType) -> &[Arc<dyn AnyEventHandler<U>>] {
        self.events
            .get(&message_type.id())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl<U> fmt::Debug for Registry<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("commands", &self.commands.len())
            .field(
                "event_handlers",
                &self.events.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

/// Builder for [`Registry`].
///
/// Registration errors are deferred to [`RegistryBuilder::build`] so the
/// builder chains without `?` at every step; the first error wins.
pub struct RegistryBuilder<U> {
    commands: HashMap<TypeId, Arc<dyn AnyCommandHandler<U>>>,
    events: HashMap<TypeId, Vec<Arc<dyn AnyEventHandler<U>>>>,
    required: Vec<MessageType>,
    error: Option<RegistryError>,
}

impl<U: UnitOfWork> RegistryBuilder<U> {
    fn new() -> Self {
        Self {
            commands: HashMap::new(),
            events: HashMap::new(),
            required: Vec::new(),
            error: None,
        }
    }

    /// Register the single handler for command type `C`.
    pub fn command<C, H>(mut self, handler: H) -> Self
    where
        C: Command,
        H: CommandHandler<C, U>,
    {
        let key = TypeId::of::<C>();
        if self.commands.contains_key(&key) {
            self.error.get_or_insert(RegistryError::DuplicateCommandHandler {
                type_name: std::any::type_name::<C>(),
            });
            return self;
        }
        self.commands
            .insert(key, Arc::new(CommandHandlerCell::<C, H>::new(handler)));
        self
    }

    /// Append a handler for event type `E`.
    pub fn event<E, H>(mut self, handler: H) -> Self
    where
        E: Event,
        H: EventHandler<E, U>,
    {
        self.events
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Arc::new(EventHandlerCell::<E, H>::new(handler)));
        self
    }

    /// Declare that the application sends command `C`.
    ///
    /// `build()` fails if no handler for `C` was registered.
    pub fn require_command<C: Command>(mut self) -> Self {
        self.required.push(MessageType::of::<C>());
        self
    }

    /// Validate and freeze the registry.
    pub fn build(self) -> Result<Registry<U>, RegistryError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if let Some(missing) = self
            .required
            .iter()
            .find(|t| !self.commands.contains_key(&t.id()))
        {
            return Err(RegistryError::MissingCommandHandler {
                type_name: missing.name(),
            });
        }
        Ok(Registry {
            commands: self.commands,
            events: self.events,
        })
    }
}
