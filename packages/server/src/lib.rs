// Menu Planner - API Core
//
// Backend for planning weekly menus: product and recipe catalogs, meals built
// from recipes, clients and the menus planned for them.
//
// Writes go through the ladle message bus (one command = one unit of work);
// cross-aggregate reactions are event handlers in domains/*/effects.rs.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
