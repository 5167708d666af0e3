use anyhow::Result;
use ladle::{UnitOfWork, UnitOfWorkFactory};

use super::models::Meal;
use crate::common::MealId;
use crate::kernel::uow::MenuUnitOfWorkFactory;

pub async fn get_meal(factory: &MenuUnitOfWorkFactory, id: MealId) -> Result<Option<Meal>> {
    let mut uow = factory.begin().await?;
    let meal = uow.meals().get(id.into_uuid()).await;
    uow.close().await?;
    Ok(meal?)
}
