//! The message bus: one command in, a drained event queue out.
//!
//! # Flow
//!
//! ```text
//! handle(command)
//!   │
//!   ▼
//! queue = [command]                          ◄── correlation id + span
//!   │
//!   ▼  pop front
//! Command ──► begin UoW ──► handler (command timeout) ──► collect events
//!   │                                 │
//!   │                                 └── rollback + close, always
//!   ▼
//! Event ──► one task per handler:
//!             permit ──► begin UoW ──► handler (event timeout) ──► collect events
//!                                            │
//!                                            └── rollback + close, always
//!             write conflict ──► rerun with a fresh UoW (conflict_retries)
//!           spawner.run_all(tasks), failures ──► FailureSink
//!   │
//!   ▼
//! produced events appended, loop until the queue is empty
//! ```
//!
//! Only the command phase can fail the call. Once the command's handler has
//! returned, `handle()` resolves to its output no matter what the event
//! handlers do; it just does not resolve until they are all done.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use futures::FutureExt;
use tokio::time::timeout;
use tracing::{debug, debug_span, error, info_span, warn, Instrument};

use crate::config::BusConfig;
use crate::core::{Command, CommandEnvelope, CorrelationId, Event, EventEnvelope, Message};
use crate::error::{is_write_conflict, BusError};
use crate::handler::AnyEventHandler;
use crate::limiter::HandlerLimiter;
use crate::registry::Registry;
use crate::sink::{FailureKind, FailureSink, HandlerFailure, TracingSink};
use crate::spawn::{panic_message, SpawnError, Spawner, Task, TokioSpawner};
use crate::uow::{UnitOfWork, UnitOfWorkFactory};

/// Type-erased output of a command handler.
pub type AnyOutput = Box<dyn Any + Send>;

/// Result of one event handler task, as seen by a [`Spawner`].
#[derive(Debug)]
pub struct HandlerOutcome {
    handler: &'static str,
    elapsed: Duration,
    result: Result<Vec<EventEnvelope>, FailureKind>,
}

/// Routes commands and events to their handlers.
///
/// Cheap to clone; clones share the registry, factory, limiter, spawner and
/// sink.
///
/// # Example
///
/// ```ignore
/// let bus = MessageBus::builder(factory, registry)
///     .with_config(BusConfig::default().with_concurrency_limit(8))
///     .build();
///
/// let recipe_id = bus.handle(CreateRecipe { .. }).await?;
/// ```
pub struct MessageBus<F: UnitOfWorkFactory> {
    factory: Arc<F>,
    registry: Arc<Registry<F::UnitOfWork>>,
    config: BusConfig,
    limiter: HandlerLimiter,
    spawner: Arc<dyn Spawner<HandlerOutcome>>,
    sink: Arc<dyn FailureSink>,
}

impl<F: UnitOfWorkFactory> Clone for MessageBus<F> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            registry: self.registry.clone(),
            config: self.config,
            limiter: self.limiter.clone(),
            spawner: self.spawner.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<F: UnitOfWorkFactory> fmt::Debug for MessageBus<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl<F: UnitOfWorkFactory> MessageBus<F> {
    /// Start building a bus over a unit of work factory and a registry.
    pub fn builder(factory: F, registry: Registry<F::UnitOfWork>) -> MessageBusBuilder<F> {
        MessageBusBuilder {
            factory: Arc::new(factory),
            registry: Arc::new(registry),
            config: BusConfig::default(),
            limiter: None,
            spawner: Arc::new(TokioSpawner),
            sink: Arc::new(TracingSink),
        }
    }

    /// Handle a command and every event it causes.
    ///
    /// Resolves to the command handler's output once the event queue is
    /// empty.
    ///
    /// # Errors
    ///
    /// - [`BusError::UnregisteredCommand`] if no handler exists for `C`
    /// - [`BusError::CommandTimeout`] if the handler exceeds the command timeout
    /// - [`BusError::Handler`] with the handler's own error
    /// - [`BusError::HandlerPanicked`] if the handler panics
    /// - [`BusError::Store`] if the unit of work cannot be opened
    /// - [`BusError::QueueOverflow`] if the event graph does not terminate
    pub async fn handle<C: Command>(&self, command: C) -> Result<C::Output, BusError> {
        let output = self.dispatch(Message::command(command)).await?;
        output
            .and_then(|output| output.downcast::<C::Output>().ok())
            .map(|output| *output)
            .ok_or_else(|| {
                BusError::Handler(anyhow!(
                    "handler for {} returned an unexpected output type",
                    std::any::type_name::<C>()
                ))
            })
    }

    /// Publish an event as a top-level message.
    ///
    /// Runs its handlers (and everything they cause) to completion.
    pub async fn publish<E: Event>(&self, event: E) -> Result<(), BusError> {
        self.dispatch(Message::event(event)).await.map(|_| ())
    }

    /// Process one message and drain the queue it starts.
    ///
    /// Returns the command output, or `None` when the message was an event.
    pub async fn dispatch(&self, message: Message) -> Result<Option<AnyOutput>, BusError> {
        let correlation_id = CorrelationId::new();
        let span = info_span!(
            "bus",
            %correlation_id,
            message = %message.message_type(),
        );
        self.drain(message, correlation_id).instrument(span).await
    }

    /// The factory the bus opens units of work from. Queries share it.
    pub fn unit_of_work_factory(&self) -> &F {
        &self.factory
    }

    pub fn registry(&self) -> &Registry<F::UnitOfWork> {
        &self.registry
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn limiter(&self) -> &HandlerLimiter {
        &self.limiter
    }

    async fn drain(
        &self,
        message: Message,
        correlation_id: CorrelationId,
    ) -> Result<Option<AnyOutput>, BusError> {
        let mut queue = VecDeque::from([message]);
        let mut output = None;
        let mut processed = 0usize;

        while let Some(message) = queue.pop_front() {
            processed += 1;
            if processed > self.config.max_messages {
                error!(
                    limit = self.config.max_messages,
                    remaining = queue.len() + 1,
                    "message limit exceeded, dropping remaining messages"
                );
                return Err(BusError::QueueOverflow {
                    limit: self.config.max_messages,
                });
            }

            match message {
                Message::Command(command) => {
                    let (result, events) = self.handle_command(command).await?;
                    output = Some(result);
                    queue.extend(events.into_iter().map(Message::Event));
                }
                Message::Event(event) => {
                    let events = self.handle_event(event, correlation_id).await;
                    queue.extend(events.into_iter().map(Message::Event));
                }
            }
        }

        debug!(processed, "queue drained");
        Ok(output)
    }

    async fn handle_command(
        &self,
        command: CommandEnvelope,
    ) -> Result<(AnyOutput, Vec<EventEnvelope>), BusError> {
        let message_type = command.message_type();
        let handler = self
            .registry
            .command_handler(message_type)
            .ok_or(BusError::UnregisteredCommand {
                type_name: message_type.name(),
            })?;

        let started = Instant::now();
        let mut uow = self.factory.begin().await?;
        let limit = self.config.command_timeout;

        debug!(command = %message_type, handler = handler.name(), "handling command");
        let outcome = timeout(
            limit,
            AssertUnwindSafe(handler.call(command.into_payload(), &mut uow)).catch_unwind(),
        )
        .await;

        let result = match outcome {
            Ok(Ok(Ok(output))) => Ok((output, uow.collect_new_events())),
            Ok(Ok(Err(e))) => {
                debug!(command = %message_type, error = %e, "command handler returned an error");
                Err(BusError::Handler(e))
            }
            Ok(Err(panic)) => {
                let message = panic_message(&panic);
                error!(command = %message_type, panic = %message, "command handler panicked");
                Err(BusError::HandlerPanicked {
                    type_name: message_type.name(),
                    message,
                })
            }
            Err(_) => {
                warn!(command = %message_type, timeout_ms = limit.as_millis() as u64, "command timed out");
                Err(BusError::CommandTimeout {
                    type_name: message_type.name(),
                    timeout: limit,
                })
            }
        };

        close_scope(&mut uow).await;

        if let Ok((_, events)) = &result {
            debug!(
                command = %message_type,
                events = events.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "command handled"
            );
        }
        result
    }

    async fn handle_event(
        &self,
        event: EventEnvelope,
        correlation_id: CorrelationId,
    ) -> Vec<EventEnvelope> {
        let message_type = event.message_type();
        let handlers = self.registry.event_handlers(message_type);
        if handlers.is_empty() {
            debug!(event = %message_type, "no handlers registered, event dropped");
            return Vec::new();
        }

        debug!(event = %message_type, handlers = handlers.len(), "dispatching event");
        let started = Instant::now();
        let tasks: Vec<Task<HandlerOutcome>> = handlers
            .iter()
            .map(|handler| self.event_task(handler.clone(), event.clone()))
            .collect();
        let results = self.spawner.run_all(tasks).await;

        // Results are index-aligned with handlers, so produced events keep
        // registration order.
        let mut produced = Vec::new();
        for (handler, result) in handlers.iter().zip(results) {
            let (name, elapsed, kind) = match result {
                Ok(HandlerOutcome {
                    result: Ok(events), ..
                }) => {
                    produced.extend(events);
                    continue;
                }
                Ok(HandlerOutcome {
                    handler,
                    elapsed,
                    result: Err(kind),
                }) => (handler, elapsed, kind),
                Err(SpawnError::Panicked(message)) => {
                    (handler.name(), started.elapsed(), FailureKind::Panicked(message))
                }
                Err(SpawnError::Cancelled) => (
                    handler.name(),
                    started.elapsed(),
                    FailureKind::Error("task was cancelled".to_string()),
                ),
            };
            self.sink.handler_failed(&HandlerFailure {
                message_type,
                handler: name,
                correlation_id,
                elapsed,
                kind,
            });
        }
        produced
    }

    fn event_task(
        &self,
        handler: Arc<dyn AnyEventHandler<F::UnitOfWork>>,
        event: EventEnvelope,
    ) -> Task<HandlerOutcome> {
        let factory = self.factory.clone();
        let limiter = self.limiter.clone();
        let limit = self.config.event_timeout;
        let retries = self.config.conflict_retries;
        let span = debug_span!("event_handler", handler = handler.name());

        async move {
            let _permit = limiter.acquire().await;
            let started = Instant::now();
            let result =
                run_event_handler(factory.as_ref(), handler.as_ref(), &event, limit, retries).await;
            HandlerOutcome {
                handler: handler.name(),
                elapsed: started.elapsed(),
                result,
            }
        }
        .instrument(span)
        .boxed()
    }
}

async fn run_event_handler<F: UnitOfWorkFactory>(
    factory: &F,
    handler: &dyn AnyEventHandler<F::UnitOfWork>,
    event: &EventEnvelope,
    limit: Duration,
    retries: usize,
) -> Result<Vec<EventEnvelope>, FailureKind> {
    let mut attempt = 0;
    loop {
        let mut uow = factory
            .begin()
            .await
            .map_err(|e| FailureKind::Store(e.to_string()))?;

        let outcome = timeout(
            limit,
            AssertUnwindSafe(handler.call(event, &mut uow)).catch_unwind(),
        )
        .await;

        let result = match outcome {
            Ok(Ok(Ok(()))) => Ok(uow.collect_new_events()),
            Ok(Ok(Err(e))) if attempt < retries && is_write_conflict(&e) => {
                close_scope(&mut uow).await;
                attempt += 1;
                debug!(attempt, error = %e, "write conflict, rerunning event handler");
                continue;
            }
            Ok(Ok(Err(e))) => Err(FailureKind::Error(format!("{e:#}"))),
            Ok(Err(panic)) => Err(FailureKind::Panicked(panic_message(&panic))),
            Err(_) => Err(FailureKind::TimedOut(limit)),
        };

        close_scope(&mut uow).await;
        return result;
    }
}

/// Rollback then close. Cleanup errors are logged and never replace the
/// handler's own outcome.
async fn close_scope<U: UnitOfWork>(uow: &mut U) {
    if let Err(e) = uow.rollback().await {
        warn!(error = %e, "unit of work rollback failed");
    }
    if let Err(e) = uow.close().await {
        warn!(error = %e, "unit of work close failed");
    }
}

/// Builder for [`MessageBus`].
pub struct MessageBusBuilder<F: UnitOfWorkFactory> {
    factory: Arc<F>,
    registry: Arc<Registry<F::UnitOfWork>>,
    config: BusConfig,
    limiter: Option<HandlerLimiter>,
    spawner: Arc<dyn Spawner<HandlerOutcome>>,
    sink: Arc<dyn FailureSink>,
}

impl<F: UnitOfWorkFactory> MessageBusBuilder<F> {
    pub fn with_config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing limiter instead of creating one from the config.
    pub fn with_limiter(mut self, limiter: HandlerLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_spawner(mut self, spawner: impl Spawner<HandlerOutcome>) -> Self {
        self.spawner = Arc::new(spawner);
        self
    }

    pub fn with_failure_sink(mut self, sink: impl FailureSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn build(self) -> MessageBus<F> {
        let limiter = self
            .limiter
            .unwrap_or_else(|| HandlerLimiter::new(self.config.concurrency_limit));
        MessageBus {
            factory: self.factory,
            registry: self.registry,
            config: self.config,
            limiter,
            spawner: self.spawner,
            sink: self.sink,
        }
    }
}

