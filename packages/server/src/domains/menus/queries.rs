use anyhow::Result;
use ladle::{Direction, Filter, Query, UnitOfWork, UnitOfWorkFactory};

use super::models::Menu;
use crate::common::{ClientId, MenuId};
use crate::kernel::uow::MenuUnitOfWorkFactory;

pub async fn get_menu(factory: &MenuUnitOfWorkFactory, id: MenuId) -> Result<Option<Menu>> {
    let mut uow = factory.begin().await?;
    let menu = uow.menus().get(id.into_uuid()).await;
    uow.close().await?;
    Ok(menu?)
}

/// A client's menus, newest first.
pub async fn list_client_menus(
    factory: &MenuUnitOfWorkFactory,
    client_id: ClientId,
) -> Result<Vec<Menu>> {
    let query = Query::new()
        .filter(Filter::new().eq("client_id", client_id))
        .order_by("created_at", Direction::Desc);

    let mut uow = factory.begin().await?;
    let menus = uow.menus().query(&query).await;
    uow.close().await?;
    Ok(menus?)
}
