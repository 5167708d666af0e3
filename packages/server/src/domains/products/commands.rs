use ladle::Command;
use serde::Deserialize;

use super::models::ProductChanges;
use crate::common::ProductId;

#[derive(Debug, Clone, Deserialize)]
pub struct AddProduct {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub calories_per_100g: Option<f64>,
}

impl Command for AddProduct {
    type Output = ProductId;
}

#[derive(Debug, Clone)]
pub struct UpdateProduct {
    pub product_id: ProductId,
    pub changes: ProductChanges,
}

impl Command for UpdateProduct {
    /// Whether anything changed.
    type Output = bool;
}
