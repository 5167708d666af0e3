use crate::common::{ClientId, MenuId, UserId};

#[derive(Debug, Clone)]
pub struct ClientCreated {
    pub client_id: ClientId,
    pub author_id: UserId,
    pub name: String,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct MenuAttachedToClient {
    pub client_id: ClientId,
    pub menu_id: MenuId,
    pub version: i64,
}
