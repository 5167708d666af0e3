use anyhow::Result;
use ladle::{UnitOfWork, UnitOfWorkFactory};

use super::models::Client;
use crate::common::ClientId;
use crate::kernel::uow::MenuUnitOfWorkFactory;

pub async fn get_client(factory: &MenuUnitOfWorkFactory, id: ClientId) -> Result<Option<Client>> {
    let mut uow = factory.begin().await?;
    let client = uow.clients().get(id.into_uuid()).await;
    uow.close().await?;
    Ok(client?)
}
