//! Command and event handler traits.
//!
//! # Key Properties
//!
//! - **Command handlers**: exactly one per command type. They receive the
//!   command by value and the unit of work the bus opened for them. They must
//!   call `uow.commit()` for their writes to persist; the bus never commits.
//! - **Event handlers**: zero or more per event type. Each invocation gets
//!   its own fresh unit of work, so handlers for the same event never share a
//!   session. They have no defined order relative to each other.
//! - **Stateless**: handlers may hold configuration or clients, but no
//!   per-message state. Messages carry all needed data.

use std::any::Any;
use std::marker::PhantomData;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::core::{Command, Event, EventEnvelope};
use crate::uow::UnitOfWork;

/// Handler for one command type.
///
/// # Example
///
/// ```ignore
/// struct CreateRecipeHandler;
///
/// #[async_trait]
/// impl CommandHandler<CreateRecipe, MenuUnitOfWork> for CreateRecipeHandler {
///     async fn handle(&self, cmd: CreateRecipe, uow: &mut MenuUnitOfWork) -> Result<RecipeId> {
///         let recipe = Recipe::create(cmd.author_id, cmd.name)?;
///         let id = recipe.id;
///         uow.recipes().add(recipe).await?;
///         uow.commit().await?;
///         Ok(id)
///     }
/// }
/// ```
#[async_trait]
pub trait CommandHandler<C: Command, U: UnitOfWork>: Send + Sync + 'static {
    /// Execute the command inside `uow`.
    ///
    /// # Errors
    ///
    /// Any error is returned to the caller unchanged, after rollback.
    async fn handle(&self, command: C, uow: &mut U) -> Result<C::Output>;

    /// Identity used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Handler for one event type.
///
/// Errors are logged and absorbed; they never reach the command's caller.
///
/// Events are only dispatched when the handler returns `Ok`. A handler that
/// commits and then fails keeps its committed writes, but the events those
/// writes recorded are dropped with the failure. Commit last.
///
/// A handler that fails with a write conflict is rerun from the start with a
/// fresh unit of work, up to [`BusConfig::conflict_retries`] times, so it
/// must tolerate running more than once.
///
/// [`BusConfig::conflict_retries`]: crate::BusConfig::conflict_retries
#[async_trait]
pub trait EventHandler<E: Event, U: UnitOfWork>: Send + Sync + 'static {
    /// React to the event inside a fresh `uow`.
    async fn handle(&self, event: &E, uow: &mut U) -> Result<()>;

    /// Identity used in logs and failure reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

// =============================================================================
// Type erasure
// =============================================================================

#[async_trait]
pub(crate) trait AnyCommandHandler<U>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn call(
        &self,
        command: Box<dyn Any + Send>,
        uow: &mut U,
    ) -> Result<Box<dyn Any + Send>>;
}

pub(crate) struct CommandHandlerCell<C, H> {
    handler: H,
    _marker: PhantomData<fn(C)>,
}

impl<C, H> CommandHandlerCell<C, H> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<C, U, H> AnyCommandHandler<U> for CommandHandlerCell<C, H>
where
    C: Command,
    U: UnitOfWork,
    H: CommandHandler<C, U>,
{
    fn name(&self) -> &'static str {
        self.handler.name()
    }

    async fn call(
        &self,
        command: Box<dyn Any + Send>,
        uow: &mut U,
    ) -> Result<Box<dyn Any + Send>> {
        let command = command.downcast::<C>().map_err(|_| {
            anyhow!(
                "command payload is not a {}",
                std::any::type_name::<C>()
            )
        })?;
        let output = self.handler.handle(*command, uow).await?;
        Ok(Box::new(output))
    }
}

#[async_trait]
pub(crate) trait AnyEventHandler<U>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn call(&self, event: &EventEnvelope, uow: &mut U) -> Result<()>;
}

pub(crate) struct EventHandlerCell<E, H> {
    handler: H,
    _marker: PhantomData<fn(E)>,
}

impl<E, H> EventHandlerCell<E, H> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<E, U, H> AnyEventHandler<U> for EventHandlerCell<E, H>
where
    E: Event,
    U: UnitOfWork,
    H: EventHandler<E, U>,
{
    fn name(&self) -> &'static str {
        self.handler.name()
    }

    async fn call(&self, event: &EventEnvelope, uow: &mut U) -> Result<()> {
        let event = event.downcast_ref::<E>().ok_or_else(|| {
            anyhow!(
                "event payload is not a {}",
                std::any::type_name::<E>()
            )
        })?;
        self.handler.handle(event, uow).await
    }
}
