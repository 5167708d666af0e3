use chrono::{DateTime, Utc};
use ladle::{Aggregate, EventLedger};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{ClientCreated, MenuAttachedToClient};
use crate::common::{require_name, ClientId, DomainError, MenuId, UserId};

/// Someone menus are planned for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub author_id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub notes: String,
    pub menu_ids: Vec<MenuId>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    ledger: EventLedger,
}

impl Client {
    pub fn create(
        author_id: UserId,
        name: &str,
        email: Option<&str>,
        notes: &str,
    ) -> Result<Self, DomainError> {
        let email = match email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(e) if !is_plausible_email(e) => {
                return Err(DomainError::validation(format!("invalid email address: {e}")))
            }
            other => other.map(str::to_lowercase),
        };

        let now = Utc::now();
        let mut client = Self {
            id: ClientId::new(),
            author_id,
            name: require_name("client name", name)?,
            email,
            notes: notes.trim().to_string(),
            menu_ids: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
            ledger: EventLedger::new(),
        };
        client.ledger.record(ClientCreated {
            client_id: client.id,
            author_id,
            name: client.name.clone(),
            version: client.version,
        });
        Ok(client)
    }

    /// Returns false if the menu was already attached.
    pub fn attach_menu(&mut self, menu_id: MenuId) -> bool {
        if self.menu_ids.contains(&menu_id) {
            return false;
        }
        self.menu_ids.push(menu_id);
        self.version += 1;
        self.updated_at = Utc::now();
        self.ledger.record(MenuAttachedToClient {
            client_id: self.id,
            menu_id,
            version: self.version,
        });
        true
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

impl Aggregate for Client {
    const KIND: &'static str = "client";

    fn id(&self) -> Uuid {
        self.id.into_uuid()
    }

    fn ledger_mut(&mut self) -> &mut EventLedger {
        &mut self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_validated_and_lowercased() {
        let client = Client::create(UserId::new(), "Ana", Some(" Ana@Example.com "), "").unwrap();
        assert_eq!(client.email.as_deref(), Some("ana@example.com"));

        let blank = Client::create(UserId::new(), "Ana", Some("  "), "").unwrap();
        assert_eq!(blank.email, None);

        for bad in ["ana", "@example.com", "ana@localhost", "a@b@c.com"] {
            assert!(
                matches!(
                    Client::create(UserId::new(), "Ana", Some(bad), ""),
                    Err(DomainError::Validation(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_attach_menu_is_idempotent() {
        let mut client = Client::create(UserId::new(), "Ana", None, "").unwrap();
        client.drain_events();
        let menu = MenuId::new();

        assert!(client.attach_menu(menu));
        assert!(!client.attach_menu(menu));
        assert_eq!(client.menu_ids, vec![menu]);
        assert_eq!(client.version, 2);
        assert_eq!(client.drain_events().len(), 1);
    }
}
