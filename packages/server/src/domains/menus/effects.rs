//! Menu domain effect
//!
//! Cascade flow:
//!   MealUpdated → refresh the meal's name on its menu → MenuMealRenamed (terminal)

use anyhow::Result;
use async_trait::async_trait;
use ladle::{EventHandler, UnitOfWork};

use crate::domains::meals::events::MealUpdated;
use crate::kernel::uow::{MenuUnitOfWork, RepositoryExt};

pub struct RenameMenuMeal;

#[async_trait]
impl EventHandler<MealUpdated, MenuUnitOfWork> for RenameMenuMeal {
    async fn handle(&self, event: &MealUpdated, uow: &mut MenuUnitOfWork) -> Result<()> {
        let Some(menu_id) = event.menu_id else {
            return Ok(());
        };

        let mut menu = uow.menus().require(menu_id.into_uuid()).await?;
        if menu.rename_meal(event.meal_id, &event.name) {
            uow.menus().add(menu).await?;
            uow.commit().await?;
        }
        Ok(())
    }
}
