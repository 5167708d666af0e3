use anyhow::Result;
use async_trait::async_trait;
use ladle::{CommandHandler, UnitOfWork};
use tracing::info;

use super::commands::CreateClient;
use super::models::Client;
use crate::common::ClientId;
use crate::kernel::uow::MenuUnitOfWork;

pub struct CreateClientHandler;

#[async_trait]
impl CommandHandler<CreateClient, MenuUnitOfWork> for CreateClientHandler {
    async fn handle(&self, cmd: CreateClient, uow: &mut MenuUnitOfWork) -> Result<ClientId> {
        let client = Client::create(cmd.author_id, &cmd.name, cmd.email.as_deref(), &cmd.notes)?;
        let id = client.id;

        uow.clients().add(client).await?;
        uow.commit().await?;

        info!(client_id = %id, "client created");
        Ok(id)
    }
}
