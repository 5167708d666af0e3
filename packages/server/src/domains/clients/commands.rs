use ladle::Command;
use serde::Deserialize;

use crate::common::{ClientId, UserId};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClient {
    pub author_id: UserId,
    pub name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl Command for CreateClient {
    type Output = ClientId;
}
