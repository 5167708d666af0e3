use chrono::{DateTime, Utc};
use ladle::{Aggregate, EventLedger};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{ProductAdded, ProductUpdated};
use crate::common::{require_name, DomainError, ProductId};

/// An ingredient that recipes reference by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    /// Unit recipes measure this product in (e.g. "g", "ml", "piece").
    pub unit: String,
    pub calories_per_100g: Option<f64>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    ledger: EventLedger,
}

/// Fields an update may change; `None` leaves the field as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub calories_per_100g: Option<f64>,
}

impl Product {
    pub fn add(
        name: &str,
        category: &str,
        unit: &str,
        calories_per_100g: Option<f64>,
    ) -> Result<Self, DomainError> {
        let now = Utc::now();
        let mut product = Self {
            id: ProductId::new(),
            name: require_name("product name", name)?,
            category: normalize_category(category)?,
            unit: require_name("unit", unit)?,
            calories_per_100g: check_calories(calories_per_100g)?,
            version: 1,
            created_at: now,
            updated_at: now,
            ledger: EventLedger::new(),
        };
        product.ledger.record(ProductAdded {
            product_id: product.id,
            name: product.name.clone(),
            category: product.category.clone(),
            version: product.version,
        });
        Ok(product)
    }

    /// Apply changes. Records `ProductUpdated` only if something changed.
    pub fn update(&mut self, changes: ProductChanges) -> Result<bool, DomainError> {
        let mut changed = false;
        if let Some(name) = changes.name {
            let name = require_name("product name", &name)?;
            changed |= name != self.name;
            self.name = name;
        }
        if let Some(category) = changes.category {
            let category = normalize_category(&category)?;
            changed |= category != self.category;
            self.category = category;
        }
        if let Some(unit) = changes.unit {
            let unit = require_name("unit", &unit)?;
            changed |= unit != self.unit;
            self.unit = unit;
        }
        if let Some(calories) = changes.calories_per_100g {
            let calories = check_calories(Some(calories))?;
            changed |= calories != self.calories_per_100g;
            self.calories_per_100g = calories;
        }

        if changed {
            self.version += 1;
            self.updated_at = Utc::now();
            self.ledger.record(ProductUpdated {
                product_id: self.id,
                version: self.version,
            });
        }
        Ok(changed)
    }
}

fn normalize_category(category: &str) -> Result<String, DomainError> {
    require_name("category", category).map(|c| c.to_lowercase())
}

fn check_calories(calories: Option<f64>) -> Result<Option<f64>, DomainError> {
    match calories {
        Some(value) if !value.is_finite() || value < 0.0 => Err(DomainError::validation(
            "calories_per_100g must be a non-negative number",
        )),
        other => Ok(other),
    }
}

impl Aggregate for Product {
    const KIND: &'static str = "product";

    fn id(&self) -> Uuid {
        self.id.into_uuid()
    }

    fn ledger_mut(&mut self) -> &mut EventLedger {
        &mut self.ledger
    }
}
