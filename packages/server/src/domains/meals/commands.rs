use ladle::Command;
use serde::Deserialize;

use crate::common::{MealId, RecipeId, UserId};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMeal {
    pub author_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recipe_ids: Vec<RecipeId>,
}

impl Command for CreateMeal {
    type Output = MealId;
}

#[derive(Debug, Clone)]
pub struct UpdateMeal {
    pub meal_id: MealId,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Command for UpdateMeal {
    /// Whether anything changed.
    type Output = bool;
}
