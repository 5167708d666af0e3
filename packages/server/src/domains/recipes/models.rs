use chrono::{DateTime, Utc};
use ladle::{Aggregate, EventLedger};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{RecipeCreated, RecipeDeleted, RecipeRated};
use crate::common::{require_name, DomainError, ProductId, RecipeId, UserId};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub product_id: ProductId,
    pub quantity: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub taste: u8,
    pub convenience: u8,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub author_id: UserId,
    pub name: String,
    pub instructions: String,
    pub ingredients: Vec<Ingredient>,
    /// Lowercased, unique, in first-seen order.
    pub tags: Vec<String>,
    pub ratings: Vec<Rating>,
    pub average_taste: Option<f64>,
    pub average_convenience: Option<f64>,
    pub discarded: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    ledger: EventLedger,
}

impl Recipe {
    pub fn create(
        author_id: UserId,
        name: &str,
        instructions: &str,
        ingredients: Vec<Ingredient>,
        tags: Vec<String>,
    ) -> Result<Self, DomainError> {
        for ingredient in &ingredients {
            if !ingredient.quantity.is_finite() || ingredient.quantity <= 0.0 {
                return Err(DomainError::validation(format!(
                    "quantity of product {} must be positive",
                    ingredient.product_id
                )));
            }
        }

        let now = Utc::now();
        let mut recipe = Self {
            id: RecipeId::new(),
            author_id,
            name: require_name("recipe name", name)?,
            instructions: instructions.trim().to_string(),
            ingredients,
            tags: normalize_tags(tags),
            ratings: Vec::new(),
            average_taste: None,
            average_convenience: None,
            discarded: false,
            version: 1,
            created_at: now,
            updated_at: now,
            ledger: EventLedger::new(),
        };
        recipe.ledger.record(RecipeCreated {
            recipe_id: recipe.id,
            author_id,
            name: recipe.name.clone(),
            version: recipe.version,
        });
        Ok(recipe)
    }

    /// Product ids referenced by the ingredient list, without duplicates.
    pub fn product_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = Vec::with_capacity(self.ingredients.len());
        for ingredient in &self.ingredients {
            let id = ingredient.product_id.into_uuid();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Add or replace `rating.user_id`'s rating and recompute the averages.
    pub fn rate(&mut self, rating: Rating) -> Result<(), DomainError> {
        self.ensure_active()?;
        for (field, score) in [("taste", rating.taste), ("convenience", rating.convenience)] {
            if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
                return Err(DomainError::validation(format!(
                    "{field} must be between {MIN_SCORE} and {MAX_SCORE}, got {score}"
                )));
            }
        }

        let user_id = rating.user_id;
        let (taste, convenience) = (rating.taste, rating.convenience);
        match self.ratings.iter_mut().find(|r| r.user_id == user_id) {
            Some(existing) => *existing = rating,
            None => self.ratings.push(rating),
        }
        self.average_taste = average(self.ratings.iter().map(|r| r.taste));
        self.average_convenience = average(self.ratings.iter().map(|r| r.convenience));
        self.touch();

        self.ledger.record(RecipeRated {
            recipe_id: self.id,
            user_id,
            taste,
            convenience,
            version: self.version,
        });
        Ok(())
    }

    pub fn delete(&mut self) -> Result<(), DomainError> {
        self.ensure_active()?;
        self.discarded = true;
        self.touch();
        self.ledger.record(RecipeDeleted {
            recipe_id: self.id,
            version: self.version,
        });
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        if self.discarded {
            return Err(DomainError::conflict(format!(
                "recipe {} has been deleted",
                self.id
            )));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

fn average(scores: impl Iterator<Item = u8>) -> Option<f64> {
    let (sum, count) = scores.fold((0u32, 0u32), |(sum, count), s| (sum + s as u32, count + 1));
    (count > 0).then(|| sum as f64 / count as f64)
}

impl Aggregate for Recipe {
    const KIND: &'static str = "recipe";

    fn id(&self) -> Uuid {
        self.id.into_uuid()
    }

    fn ledger_mut(&mut self) -> &mut EventLedger {
        &mut self.ledger
    }
}
