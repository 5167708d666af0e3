//! Product command handlers.

use anyhow::Result;
use async_trait::async_trait;
use ladle::{CommandHandler, UnitOfWork};
use tracing::info;

use super::commands::{AddProduct, UpdateProduct};
use super::models::Product;
use crate::common::ProductId;
use crate::kernel::uow::{MenuUnitOfWork, RepositoryExt};

pub struct AddProductHandler;

#[async_trait]
impl CommandHandler<AddProduct, MenuUnitOfWork> for AddProductHandler {
    async fn handle(&self, cmd: AddProduct, uow: &mut MenuUnitOfWork) -> Result<ProductId> {
        let product = Product::add(&cmd.name, &cmd.category, &cmd.unit, cmd.calories_per_100g)?;
        let id = product.id;

        uow.products().add(product).await?;
        uow.commit().await?;

        info!(product_id = %id, "product added");
        Ok(id)
    }
}

pub struct UpdateProductHandler;

#[async_trait]
impl CommandHandler<UpdateProduct, MenuUnitOfWork> for UpdateProductHandler {
    async fn handle(&self, cmd: UpdateProduct, uow: &mut MenuUnitOfWork) -> Result<bool> {
        let mut product = uow.products().require(cmd.product_id.into_uuid()).await?;
        if !product.update(cmd.changes)? {
            return Ok(false);
        }

        uow.products().add(product).await?;
        uow.commit().await?;
        Ok(true)
    }
}
