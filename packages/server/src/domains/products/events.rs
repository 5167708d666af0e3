use crate::common::ProductId;

/// A product joined the catalog.
#[derive(Debug, Clone)]
pub struct ProductAdded {
    pub product_id: ProductId,
    pub name: String,
    pub category: String,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct ProductUpdated {
    pub product_id: ProductId,
    pub version: i64,
}
