use crate::common::{MealId, MenuId, RecipeId, UserId};

#[derive(Debug, Clone)]
pub struct MealCreated {
    pub meal_id: MealId,
    pub author_id: UserId,
    pub name: String,
    pub version: i64,
}

/// Name or description changed. `menu_id` lets the menu refresh its copy.
#[derive(Debug, Clone)]
pub struct MealUpdated {
    pub meal_id: MealId,
    pub name: String,
    pub menu_id: Option<MenuId>,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct MealAddedToMenu {
    pub meal_id: MealId,
    pub menu_id: MenuId,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct RecipeRemovedFromMeal {
    pub meal_id: MealId,
    pub recipe_id: RecipeId,
    pub version: i64,
}
