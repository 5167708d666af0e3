use chrono::{DateTime, Utc};
use ladle::{Aggregate, EventLedger};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{MealAddedToMenu, MealCreated, MealUpdated, RecipeRemovedFromMeal};
use crate::common::{require_name, DomainError, MealId, MenuId, RecipeId, UserId};

/// A dish served as one slot of a menu, composed of recipes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    pub id: MealId,
    pub author_id: UserId,
    pub name: String,
    pub description: String,
    pub recipe_ids: Vec<RecipeId>,
    /// The menu this meal is planned on, once added to one.
    pub menu_id: Option<MenuId>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    ledger: EventLedger,
}

impl Meal {
    pub fn create(
        author_id: UserId,
        name: &str,
        description: &str,
        recipe_ids: Vec<RecipeId>,
    ) -> Result<Self, DomainError> {
        let mut unique: Vec<RecipeId> = Vec::with_capacity(recipe_ids.len());
        for id in recipe_ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        let now = Utc::now();
        let mut meal = Self {
            id: MealId::new(),
            author_id,
            name: require_name("meal name", name)?,
            description: description.trim().to_string(),
            recipe_ids: unique,
            menu_id: None,
            version: 1,
            created_at: now,
            updated_at: now,
            ledger: EventLedger::new(),
        };
        meal.ledger.record(MealCreated {
            meal_id: meal.id,
            author_id,
            name: meal.name.clone(),
            version: meal.version,
        });
        Ok(meal)
    }

    /// Change name and/or description. Returns false when nothing changed.
    pub fn update(
        &mut self,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool, DomainError> {
        let name = name.map(|n| require_name("meal name", n)).transpose()?;
        let description = description.map(|d| d.trim().to_string());

        let mut changed = false;
        if let Some(name) = name.filter(|n| *n != self.name) {
            self.name = name;
            changed = true;
        }
        if let Some(description) = description.filter(|d| *d != self.description) {
            self.description = description;
            changed = true;
        }
        if !changed {
            return Ok(false);
        }

        self.touch();
        self.ledger.record(MealUpdated {
            meal_id: self.id,
            name: self.name.clone(),
            menu_id: self.menu_id,
            version: self.version,
        });
        Ok(true)
    }

    /// Link the meal to `menu_id`. Idempotent for the same menu.
    pub fn assign_to_menu(&mut self, menu_id: MenuId) -> Result<bool, DomainError> {
        match self.menu_id {
            Some(current) if current == menu_id => return Ok(false),
            Some(current) => {
                return Err(DomainError::conflict(format!(
                    "meal {} is already planned on menu {current}",
                    self.id
                )))
            }
            None => {}
        }

        self.menu_id = Some(menu_id);
        self.touch();
        self.ledger.record(MealAddedToMenu {
            meal_id: self.id,
            menu_id,
            version: self.version,
        });
        Ok(true)
    }

    pub fn remove_recipe(&mut self, recipe_id: RecipeId) -> bool {
        let before = self.recipe_ids.len();
        self.recipe_ids.retain(|id| *id != recipe_id);
        if self.recipe_ids.len() == before {
            return false;
        }

        self.touch();
        self.ledger.record(RecipeRemovedFromMeal {
            meal_id: self.id,
            recipe_id,
            version: self.version,
        });
        true
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

impl Aggregate for Meal {
    const KIND: &'static str = "meal";

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

    fn soup(recipes: Vec<RecipeId>) -> Meal {
        let mut meal = Meal::create(UserId::new(), "Soup night", "", recipes).unwrap();
        meal.drain_events();
        meal
    }

    #[test]
    fn test_create_dedupes_recipes() {
        let r = RecipeId::new();
        let meal = soup(vec![r, r, RecipeId::new()]);
        assert_eq!(meal.recipe_ids.len(), 2);
        assert_eq!(meal.recipe_ids[0], r);
    }

    #[test]
    fn test_update_carries_menu_in_event() {
        let mut meal = soup(vec![]);
        let menu = MenuId::new();
        meal.assign_to_menu(menu).unwrap();
        meal.drain_events();

        assert!(meal.update(Some("Stew night"), None).unwrap());
        assert!(!meal.update(Some("Stew night"), Some("")).unwrap());

        let events = meal.drain_events();
        assert_eq!(events.len(), 1);
        let updated = events[0].downcast_ref::<MealUpdated>().unwrap();
        assert_eq!(updated.name, "Stew night");
        assert_eq!(updated.menu_id, Some(menu));
        assert_eq!(updated.version, 3);
    }

    #[test]
    fn test_assign_to_menu_is_idempotent_but_exclusive() {
        let mut meal = soup(vec![]);
        let menu = MenuId::new();

        assert!(meal.assign_to_menu(menu).unwrap());
        assert!(!meal.assign_to_menu(menu).unwrap());
        assert!(matches!(
            meal.assign_to_menu(MenuId::new()),
            Err(DomainError::Conflict(_))
        ));
        assert_eq!(meal.drain_events().len(), 1);
    }

    #[test]
    fn test_remove_recipe() {
        let keep = RecipeId::new();
        let gone = RecipeId::new();
        let mut meal = soup(vec![keep, gone]);

        assert!(meal.remove_recipe(gone));
        assert!(!meal.remove_recipe(gone));
        assert_eq!(meal.recipe_ids, vec![keep]);
        assert_eq!(meal.drain_events().len(), 1);
    }
}
