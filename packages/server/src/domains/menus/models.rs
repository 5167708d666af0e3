use std::fmt;

use chrono::{DateTime, Utc};
use ladle::{Aggregate, EventLedger};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{MenuCreated, MenuMealAdded, MenuMealRenamed};
use crate::common::{ClientId, DomainError, MealId, MenuId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// One planned slot on a menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuMeal {
    pub meal_id: MealId,
    /// Copy of the meal's name, kept current by `MealUpdated`.
    pub name: String,
    pub week: u32,
    pub weekday: Weekday,
    pub meal_type: MealType,
}

impl MenuMeal {
    fn slot(&self) -> Slot {
        Slot {
            week: self.week,
            weekday: self.weekday,
            meal_type: self.meal_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub week: u32,
    pub weekday: Weekday,
    pub meal_type: MealType,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "week {} {:?} {:?}", self.week, self.weekday, self.meal_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    pub id: MenuId,
    pub author_id: UserId,
    pub client_id: ClientId,
    pub description: String,
    pub meals: Vec<MenuMeal>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    ledger: EventLedger,
}

impl Menu {
    pub fn create(author_id: UserId, client_id: ClientId, description: &str) -> Self {
        let now = Utc::now();
        let mut menu = Self {
            id: MenuId::new(),
            author_id,
            client_id,
            description: description.trim().to_string(),
            meals: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
            ledger: EventLedger::new(),
        };
        menu.ledger.record(MenuCreated {
            menu_id: menu.id,
            client_id,
            author_id,
            version: menu.version,
        });
        menu
    }

    /// Plan `meal_id` into a free slot. A meal appears at most once per menu.
    pub fn add_meal(&mut self, meal_id: MealId, name: &str, slot: Slot) -> Result<(), DomainError> {
        if slot.week == 0 {
            return Err(DomainError::validation("week starts at 1"));
        }
        if self.meals.iter().any(|m| m.meal_id == meal_id) {
            return Err(DomainError::conflict(format!(
                "meal {meal_id} is already on menu {}",
                self.id
            )));
        }
        if self.meals.iter().any(|m| m.slot() == slot) {
            return Err(DomainError::conflict(format!("{slot} is already taken")));
        }

        self.meals.push(MenuMeal {
            meal_id,
            name: name.to_string(),
            week: slot.week,
            weekday: slot.weekday,
            meal_type: slot.meal_type,
        });
        self.touch();
        self.ledger.record(MenuMealAdded {
            menu_id: self.id,
            meal_id,
            week: slot.week,
            weekday: slot.weekday,
            meal_type: slot.meal_type,
            version: self.version,
        });
        Ok(())
    }

    /// Refresh the stored name of `meal_id`. Returns false if nothing changed.
    pub fn rename_meal(&mut self, meal_id: MealId, name: &str) -> bool {
        let Some(entry) = self
            .meals
            .iter_mut()
            .find(|m| m.meal_id == meal_id && m.name != name)
        else {
            return false;
        };
        entry.name = name.to_string();

        self.touch();
        self.ledger.record(MenuMealRenamed {
            menu_id: self.id,
            meal_id,
            name: name.to_string(),
            version: self.version,
        });
        true
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

impl Aggregate for Menu {
    const KIND: &'static str = "menu";

    fn id(&self) -> Uuid {
        self.id.into_uuid()
    }

    fn ledger_mut(&mut self) -> &mut EventLedger {
        &mut self.ledger
    }
}
