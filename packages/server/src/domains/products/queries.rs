//! Product read side.

use anyhow::Result;
use ladle::{Direction, Filter, Query, UnitOfWork, UnitOfWorkFactory};

use super::models::Product;
use crate::common::ProductId;
use crate::kernel::uow::MenuUnitOfWorkFactory;

pub async fn get_product(
    factory: &MenuUnitOfWorkFactory,
    id: ProductId,
) -> Result<Option<Product>> {
    let mut uow = factory.begin().await?;
    let product = uow.products().get(id.into_uuid()).await;
    uow.close().await?;
    Ok(product?)
}

/// Products sorted by name, optionally limited to one category.
pub async fn list_products(
    factory: &MenuUnitOfWorkFactory,
    category: Option<&str>,
) -> Result<Vec<Product>> {
    let mut filter = Filter::new();
    if let Some(category) = category {
        filter = filter.eq("category", category.trim().to_lowercase());
    }
    let query = Query::new()
        .filter(filter)
        .order_by("name", Direction::Asc);

    let mut uow = factory.begin().await?;
    let products = uow.products().query(&query).await;
    uow.close().await?;
    Ok(products?)
}
