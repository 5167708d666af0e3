//! Audit trail - one structured log record per created aggregate
//!
//! `AuditLog` is a single handler registered for every `*Created` fact; the
//! event types opt in by implementing [`Audited`].

use anyhow::Result;
use async_trait::async_trait;
use ladle::{Event, EventHandler, UnitOfWork};
use tracing::info;
use uuid::Uuid;

use crate::common::UserId;
use crate::domains::clients::events::ClientCreated;
use crate::domains::meals::events::MealCreated;
use crate::domains::menus::events::MenuCreated;
use crate::domains::products::events::ProductAdded;
use crate::domains::recipes::events::RecipeCreated;

/// What the audit trail records about a creation fact.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub kind: &'static str,
    pub id: Uuid,
    pub author_id: Option<UserId>,
    pub version: i64,
}

pub trait Audited: Event {
    fn audit_entry(&self) -> AuditEntry;
}

pub struct AuditLog;

#[async_trait]
impl<E, U> EventHandler<E, U> for AuditLog
where
    E: Audited,
    U: UnitOfWork,
{
    async fn handle(&self, event: &E, _uow: &mut U) -> Result<()> {
        let entry = event.audit_entry();
        info!(
            kind = entry.kind,
            id = %entry.id,
            author_id = ?entry.author_id.map(|a| a.into_uuid()),
            version = entry.version,
            "audit: created"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "AuditLog"
    }
}

impl Audited for ProductAdded {
    fn audit_entry(&self) -> AuditEntry {
        AuditEntry {
            kind: "product",
            id: self.product_id.into_uuid(),
            author_id: None,
            version: self.version,
        }
    }
}

impl Audited for RecipeCreated {
    fn audit_entry(&self) -> AuditEntry {
        AuditEntry {
            kind: "recipe",
            id: self.recipe_id.into_uuid(),
            author_id: Some(self.author_id),
            version: self.version,
        }
    }
}

impl Audited for MealCreated {
    fn audit_entry(&self) -> AuditEntry {
        AuditEntry {
            kind: "meal",
            id: self.meal_id.into_uuid(),
            author_id: Some(self.author_id),
            version: self.version,
        }
    }
}

impl Audited for ClientCreated {
    fn audit_entry(&self) -> AuditEntry {
        AuditEntry {
            kind: "client",
            id: self.client_id.into_uuid(),
            author_id: Some(self.author_id),
            version: self.version,
        }
    }
}

impl Audited for MenuCreated {
    fn audit_entry(&self) -> AuditEntry {
        AuditEntry {
            kind: "menu",
            id: self.menu_id.into_uuid(),
            author_id: Some(self.author_id),
            version: self.version,
        }
    }
}
