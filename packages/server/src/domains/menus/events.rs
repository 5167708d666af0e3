use super::models::{MealType, Weekday};
use crate::common::{ClientId, MealId, MenuId, UserId};

#[derive(Debug, Clone)]
pub struct MenuCreated {
    pub menu_id: MenuId,
    pub client_id: ClientId,
    pub author_id: UserId,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct MenuMealAdded {
    pub menu_id: MenuId,
    pub meal_id: MealId,
    pub week: u32,
    pub weekday: Weekday,
    pub meal_type: MealType,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct MenuMealRenamed {
    pub menu_id: MenuId,
    pub meal_id: MealId,
    pub name: String,
    pub version: i64,
}
