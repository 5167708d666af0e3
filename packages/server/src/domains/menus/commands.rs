use ladle::Command;
use serde::Deserialize;

use super::models::{MealType, Weekday};
use crate::common::{ClientId, MealId, MenuId, UserId};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMenu {
    pub author_id: UserId,
    pub client_id: ClientId,
    #[serde(default)]
    pub description: String,
}

impl Command for CreateMenu {
    type Output = MenuId;
}

#[derive(Debug, Clone)]
pub struct AddMealToMenu {
    pub menu_id: MenuId,
    pub meal_id: MealId,
    pub week: u32,
    pub weekday: Weekday,
    pub meal_type: MealType,
}

impl Command for AddMealToMenu {
    type Output = ();
}
