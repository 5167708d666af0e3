//! Client domain effect
//!
//! Cascade flow:
//!   MenuCreated → attach menu to client → MenuAttachedToClient (terminal)

use anyhow::Result;
use async_trait::async_trait;
use ladle::{EventHandler, UnitOfWork};
use tracing::debug;

use crate::domains::menus::events::MenuCreated;
use crate::kernel::uow::{MenuUnitOfWork, RepositoryExt};

pub struct AttachMenuToClient;

#[async_trait]
impl EventHandler<MenuCreated, MenuUnitOfWork> for AttachMenuToClient {
    async fn handle(&self, event: &MenuCreated, uow: &mut MenuUnitOfWork) -> Result<()> {
        let mut client = uow.clients().require(event.client_id.into_uuid()).await?;
        if !client.attach_menu(event.menu_id) {
            return Ok(());
        }

        debug!(client_id = %event.client_id, menu_id = %event.menu_id, "menu attached");
        uow.clients().add(client).await?;
        uow.commit().await?;
        Ok(())
    }
}
