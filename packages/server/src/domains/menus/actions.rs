//! Menu command handlers.

use anyhow::Result;
use async_trait::async_trait;
use ladle::{CommandHandler, UnitOfWork};
use tracing::info;

use super::commands::{AddMealToMenu, CreateMenu};
use super::models::{Menu, Slot};
use crate::common::{DomainError, MenuId};
use crate::kernel::uow::{MenuUnitOfWork, RepositoryExt};

pub struct CreateMenuHandler;

#[async_trait]
impl CommandHandler<CreateMenu, MenuUnitOfWork> for CreateMenuHandler {
    async fn handle(&self, cmd: CreateMenu, uow: &mut MenuUnitOfWork) -> Result<MenuId> {
        uow.clients().require(cmd.client_id.into_uuid()).await?;

        let menu = Menu::create(cmd.author_id, cmd.client_id, &cmd.description);
        let id = menu.id;
        uow.menus().add(menu).await?;
        uow.commit().await?;

        info!(menu_id = %id, client_id = %cmd.client_id, "menu created");
        Ok(id)
    }
}

pub struct AddMealToMenuHandler;

#[async_trait]
impl CommandHandler<AddMealToMenu, MenuUnitOfWork> for AddMealToMenuHandler {
    async fn handle(&self, cmd: AddMealToMenu, uow: &mut MenuUnitOfWork) -> Result<()> {
        let mut menu = uow.menus().require(cmd.menu_id.into_uuid()).await?;
        let meal = uow.meals().require(cmd.meal_id.into_uuid()).await?;
        if let Some(other) = meal.menu_id.filter(|m| *m != cmd.menu_id) {
            return Err(DomainError::conflict(format!(
                "meal {} is already planned on menu {other}",
                cmd.meal_id
            ))
            .into());
        }

        menu.add_meal(
            meal.id,
            &meal.name,
            Slot {
                week: cmd.week,
                weekday: cmd.weekday,
                meal_type: cmd.meal_type,
            },
        )?;
        uow.menus().add(menu).await?;
        uow.commit().await?;
        Ok(())
    }
}
