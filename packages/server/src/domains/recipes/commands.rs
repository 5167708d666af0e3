use ladle::Command;
use serde::Deserialize;

use super::models::Ingredient;
use crate::common::{RecipeId, UserId};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecipe {
    pub author_id: UserId,
    pub name: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Command for CreateRecipe {
    type Output = RecipeId;
}

#[derive(Debug, Clone)]
pub struct RateRecipe {
    pub recipe_id: RecipeId,
    pub user_id: UserId,
    pub taste: u8,
    pub convenience: u8,
    pub comment: Option<String>,
}

impl Command for RateRecipe {
    type Output = ();
}

#[derive(Debug, Clone)]
pub struct DeleteRecipe {
    pub recipe_id: RecipeId,
}

impl Command for DeleteRecipe {
    type Output = ();
}
