// Business domains.
//
// Each domain owns its aggregate (models.rs), its commands and the handlers
// for them (commands.rs, actions.rs), the facts it records (events.rs), its
// reactions to other domains' facts (effects.rs) and its read side
// (queries.rs). `register` wires a domain into the handler registry.

pub mod audit;
pub mod clients;
pub mod meals;
pub mod menus;
pub mod products;
pub mod recipes;
