//! Structured error types for ladle.
//!
//! `BusError` provides pattern-matchable errors for everything that can go
//! wrong in the command phase. Event-phase failures never become a
//! `BusError`: they are reported to the failure sink and absorbed.
//!
//! # The Error Boundary Rule
//!
//! > **Only command-phase errors reach the caller.**
//!
//! - A command handler's own error is surfaced unchanged inside
//!   [`BusError::Handler`]; callers downcast it with [`BusError::handler_error`].
//! - Event handler errors, timeouts and panics are logged with full context
//!   and never surfaced.
//!
//! # Example
//!
//! ```ignore
//! match bus.handle(CreateRecipe { .. }).await {
//!     Ok(recipe_id) => println!("created {recipe_id}"),
//!     Err(BusError::CommandTimeout { timeout, .. }) => eprintln!("gave up after {timeout:?}"),
//!     Err(e) => match e.handler_error::<DomainError>() {
//!         Some(DomainError::NotFound { .. }) => eprintln!("missing product"),
//!         _ => eprintln!("failed: {e}"),
//!     },
//! }
//! ```

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// Safe Error Categories
// =============================================================================

/// Error category for sanitized, client-facing failures.
///
/// Internal error details are NEVER exposed - only the category and, for the
/// categories that allow it, a safe message.
///
/// # Security Rules
///
/// - `Validation`: Safe to expose details (user input errors)
/// - `NotFound`: Safe to expose (resource not found)
/// - `Conflict`: Safe to expose (state does not allow the operation)
/// - `Unauthorized`: NEVER expose details (auth failure)
/// - `Timeout`: Safe to expose (operation took too long)
/// - `InternalError`: NEVER expose details (server error)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeErrorCategory {
    /// User input validation errors - safe to expose details.
    Validation,
    /// Resource not found - safe to expose.
    NotFound,
    /// Current state conflicts with the request - safe to expose.
    Conflict,
    /// Authentication/authorization failure - NEVER expose details.
    Unauthorized,
    /// The command did not finish within its timeout.
    Timeout,
    /// Internal server error - NEVER expose details.
    InternalError,
}

impl fmt::Display for SafeErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafeErrorCategory::Validation => write!(f, "validation_error"),
            SafeErrorCategory::NotFound => write!(f, "not_found"),
            SafeErrorCategory::Conflict => write!(f, "conflict"),
            SafeErrorCategory::Unauthorized => write!(f, "unauthorized"),
            SafeErrorCategory::Timeout => write!(f, "timeout"),
            SafeErrorCategory::InternalError => write!(f, "internal_error"),
        }
    }
}

/// Trait for errors that can be categorized for safe external exposure.
///
/// # Safe Message Contract
///
/// - `Validation`, `NotFound` and `Conflict` MAY return their Display string verbatim
/// - `Unauthorized` and `InternalError` MUST return generic messages
pub trait Categorizable: std::error::Error {
    /// Return the safe category for this error.
    fn category(&self) -> SafeErrorCategory;

    /// Return a sanitized, user-safe message.
    fn safe_message(&self) -> Cow<'static, str>;
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from a persistence session.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage backend failed (connection, query, constraint).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A document could not be converted to or from its aggregate.
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The session was already closed.
    #[error("session is closed")]
    Closed,

    /// The document changed since this session read it, or was created by
    /// someone else when this session expected it not to exist.
    #[error("{kind} {id} was modified concurrently")]
    Conflict {
        /// The document kind.
        kind: &'static str,
        /// The document id.
        id: Uuid,
    },
}

impl StoreError {
    /// Wrap any backend error.
    pub fn backend(err: impl fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// True when a write conflict is anywhere in the error's chain.
///
/// Handlers usually propagate store errors with `?`, so a conflict reaches
/// the bus wrapped in an [`anyhow::Error`].
pub fn is_write_conflict(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<StoreError>().is_some_and(StoreError::is_conflict))
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors raised while building a handler registry.
///
/// These are boot-time configuration errors: a process with an invalid
/// registry should refuse to start.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A second handler was registered for the same command type.
    #[error("a handler is already registered for command {type_name}")]
    DuplicateCommandHandler {
        /// The command type name.
        type_name: &'static str,
    },

    /// A command declared with `require_command` has no handler.
    #[error("command {type_name} is declared but has no handler")]
    MissingCommandHandler {
        /// The command type name.
        type_name: &'static str,
    },
}

// =============================================================================
// Bus Errors
// =============================================================================

/// Errors surfaced to the caller of `MessageBus::handle`.
#[derive(Debug, Error)]
pub enum BusError {
    /// No handler is registered for the command type.
    ///
    /// This is a configuration error, never retried.
    #[error("no handler registered for command {type_name}")]
    UnregisteredCommand {
        /// The command type name.
        type_name: &'static str,
    },

    /// The command handler did not finish within the command timeout.
    ///
    /// The unit of work was rolled back before this error was returned.
    #[error("command {type_name} timed out after {timeout:?}")]
    CommandTimeout {
        /// The command type name.
        type_name: &'static str,
        /// The timeout that expired.
        timeout: Duration,
    },

    /// The command handler returned an error.
    ///
    /// The unit of work was rolled back; the error is passed through unchanged.
    #[error(transparent)]
    Handler(anyhow::Error),

    /// The command handler panicked.
    #[error("command handler for {type_name} panicked: {message}")]
    HandlerPanicked {
        /// The command type name.
        type_name: &'static str,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// Opening the unit of work failed before any handler ran.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// More messages were processed than the configured limit allows.
    ///
    /// Indicates a cycle in the event graph.
    #[error("message queue exceeded {limit} messages in one call")]
    QueueOverflow {
        /// The configured limit.
        limit: usize,
    },
}

impl BusError {
    /// Returns true if this is a command timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BusError::CommandTimeout { .. })
    }

    /// Returns true if the command lost an optimistic concurrency check.
    pub fn is_write_conflict(&self) -> bool {
        match self {
            BusError::Store(e) => e.is_conflict(),
            BusError::Handler(e) => is_write_conflict(e),
            _ => false,
        }
    }

    /// Downcast the command handler's own error.
    ///
    /// Returns `None` for bus-level errors or when the handler's error is of a
    /// different type.
    pub fn handler_error<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        match self {
            BusError::Handler(e) => e.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl Categorizable for BusError {
    fn category(&self) -> SafeErrorCategory {
        match self {
            BusError::CommandTimeout { .. } => SafeErrorCategory::Timeout,
            _ if self.is_write_conflict() => SafeErrorCategory::Conflict,
            BusError::UnregisteredCommand { .. }
            | BusError::Handler(_)
            | BusError::HandlerPanicked { .. }
            | BusError::Store(_)
            | BusError::QueueOverflow { .. } => SafeErrorCategory::InternalError,
        }
    }

    fn safe_message(&self) -> Cow<'static, str> {
        match self {
            BusError::CommandTimeout { .. } => "The operation timed out".into(),
            _ if self.is_write_conflict() => {
                "The resource was changed by another request, please retry".into()
            }
            _ => "An internal error occurred".into(),
        }
    }
}
