// Bootstrap - wires every domain into one registry and one bus
//
// The registry is validated here, at boot: a duplicate or missing command
// handler stops the process before it serves anything.

use anyhow::{Context, Result};
use ladle::{BusConfig, MessageBus, Registry};
use tracing::info;

use super::uow::{MenuUnitOfWork, MenuUnitOfWorkFactory};
use crate::domains;

/// The bus the HTTP layer and the tests talk to.
pub type AppBus = MessageBus<MenuUnitOfWorkFactory>;

/// Registry with every domain's command and event handlers.
pub fn build_registry() -> Result<Registry<MenuUnitOfWork>> {
    let builder = Registry::builder();
    let builder = domains::products::register(builder);
    let builder = domains::recipes::register(builder);
    let builder = domains::meals::register(builder);
    let builder = domains::clients::register(builder);
    let builder = domains::menus::register(builder);

    builder.build().context("invalid handler registry")
}

pub fn build_bus(factory: MenuUnitOfWorkFactory, config: BusConfig) -> Result<AppBus> {
    let registry = build_registry()?;
    info!(
        commands = registry.command_count(),
        concurrency_limit = config.concurrency_limit,
        "message bus ready"
    );
    Ok(MessageBus::builder(factory, registry)
        .with_config(config)
        .build())
}
