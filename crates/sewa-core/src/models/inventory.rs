//! Inventory and point-of-sale models.

use serde::{Deserialize, Serialize};

/// A medicine (or other retail item) held in stock by one organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medicine {
    pub id: String,
    pub name: String,
    pub generic_name: Option<String>,
    pub category: String,
    pub batch: Option<String>,
    /// Expiry date, BS calendar, "YYYY-MM-DD"
    pub expiry: Option<String>,
    pub unit_price: f64,
    /// Units on hand; the store never lets this go negative
    pub stock: i64,
    /// Reorder threshold
    pub min_stock: i64,
    pub org_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Medicine {
    /// Create a new medicine with required fields.
    pub fn new(name: String, category: String, unit_price: f64, org_id: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            generic_name: None,
            category,
            batch: None,
            expiry: None,
            unit_price,
            stock: 0,
            min_stock: 0,
            org_id,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Whether stock has fallen to or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

/// One line of a sale, with price snapshotted at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleLine {
    /// Inventory reference for stock-deducted lines
    pub medicine_id: Option<String>,
    /// Originating visit for lines imported from a clinical record
    pub visit_id: Option<String>,
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl SaleLine {
    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// A completed sale. Immutable once created; there is no edit or void.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sale {
    pub id: String,
    pub org_id: String,
    pub customer_name: String,
    pub lines: Vec<SaleLine>,
    pub total: f64,
    pub created_at: String,
}

impl Sale {
    /// Create a sale from its lines, computing the total.
    pub fn new(org_id: String, customer_name: String, lines: Vec<SaleLine>) -> Self {
        let total = lines.iter().map(SaleLine::line_total).sum();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            org_id,
            customer_name,
            lines,
            total,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
