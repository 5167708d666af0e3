use crate::common::{RecipeId, UserId};

#[derive(Debug, Clone)]
pub struct RecipeCreated {
    pub recipe_id: RecipeId,
    pub author_id: UserId,
    pub name: String,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct RecipeRated {
    pub recipe_id: RecipeId,
    pub user_id: UserId,
    pub taste: u8,
    pub convenience: u8,
    pub version: i64,
}

/// The recipe was soft-deleted. Meals still referencing it drop it.
#[derive(Debug, Clone)]
pub struct RecipeDeleted {
    pub recipe_id: RecipeId,
    pub version: i64,
}
