//! The billing cart: imported clinical lines plus walk-in items.

use serde::{Deserialize, Serialize};

use super::{BillingError, BillingResult};
use crate::models::Medicine;

/// Where a cart line came from; settlement uses this to mark the originating
/// sub-item billed and to deduct stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LineSource {
    /// Retail catalog line, deducts from inventory
    Inventory { medicine_id: String },
    /// Imported prescription line; deducts stock when it references inventory
    Prescription {
        visit_id: String,
        medicine_id: Option<String>,
    },
    /// Imported lab request (index into the record's lab list)
    Lab { visit_id: String, index: usize },
    /// Imported service request (index into the record's service list)
    Service { visit_id: String, index: usize },
    /// Free-text item, no inventory or visit linkage
    Manual,
}

/// One billable line with snapshotted description and price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub source: LineSource,
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl CartLine {
    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }

    /// Inventory item this line deducts from, if any.
    pub fn medicine_id(&self) -> Option<&str> {
        match &self.source {
            LineSource::Inventory { medicine_id } => Some(medicine_id),
            LineSource::Prescription { medicine_id, .. } => medicine_id.as_deref(),
            _ => None,
        }
    }

    /// Visit record this line was imported from, if any.
    pub fn visit_id(&self) -> Option<&str> {
        match &self.source {
            LineSource::Prescription { visit_id, .. }
            | LineSource::Lab { visit_id, .. }
            | LineSource::Service { visit_id, .. } => Some(visit_id),
            _ => None,
        }
    }
}

/// A cart merging imported clinical lines with walk-in billing.
#[derive(Debug, Clone, Default)]
pub struct BillingCart {
    lines: Vec<CartLine>,
}

impl BillingCart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add lines produced by the pending-import query.
    pub fn add_imported(&mut self, lines: Vec<CartLine>) {
        self.lines.extend(lines);
    }

    /// Add a catalog item, capping the total requested quantity at the stock
    /// recorded on the item.
    ///
    /// Returns the quantity actually granted; asking for more than is on the
    /// shelf grants only what is there, and an item with nothing left to grant
    /// is refused.
    pub fn add_inventory_item(&mut self, medicine: &Medicine, quantity: u32) -> BillingResult<u32> {
        if quantity == 0 {
            return Err(BillingError::InvalidQuantity);
        }
        let stock = medicine.stock.max(0) as u32;

        let existing = self
            .lines
            .iter_mut()
            .find(|line| line.medicine_id() == Some(medicine.id.as_str()));
        let already = existing.as_ref().map(|l| l.quantity).unwrap_or(0);

        let granted = quantity.min(stock.saturating_sub(already));
        if granted == 0 {
            return Err(BillingError::OutOfStock(medicine.name.clone()));
        }

        match existing {
            Some(line) => line.quantity += granted,
            None => self.lines.push(CartLine {
                source: LineSource::Inventory {
                    medicine_id: medicine.id.clone(),
                },
                description: medicine.name.clone(),
                quantity: granted,
                unit_price: medicine.unit_price,
            }),
        }
        Ok(granted)
    }

    /// Add a free-text item (procedure fee, sundries, ...).
    pub fn add_manual_item(
        &mut self,
        description: String,
        quantity: u32,
        unit_price: f64,
    ) -> BillingResult<()> {
        if quantity == 0 {
            return Err(BillingError::InvalidQuantity);
        }
        self.lines.push(CartLine {
            source: LineSource::Manual,
            description,
            quantity,
            unit_price,
        });
        Ok(())
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medicine(stock: i64) -> Medicine {
        let mut med = Medicine::new("Cetrizine 10mg".into(), "Tablet".into(), 3.0, "MAIN".into());
        med.stock = stock;
        med
    }

    #[test]
    fn test_add_caps_at_stock() {
        let mut cart = BillingCart::new();
        let med = medicine(5);

        // Asking for six grants five
        let granted = cart.add_inventory_item(&med, 6).unwrap();
        assert_eq!(granted, 5);
        assert_eq!(cart.lines()[0].quantity, 5);

        // Nothing left to grant
        assert!(matches!(
            cart.add_inventory_item(&med, 1),
            Err(BillingError::OutOfStock(_))
        ));
    }

    #[test]
    fn test_repeat_add_merges_line() {
        let mut cart = BillingCart::new();
        let med = medicine(10);

        cart.add_inventory_item(&med, 4).unwrap();
        cart.add_inventory_item(&med, 4).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 8);

        // Third add caps the merged line at stock
        let granted = cart.add_inventory_item(&med, 4).unwrap();
        assert_eq!(granted, 2);
        assert_eq!(cart.lines()[0].quantity, 10);
    }

    #[test]
    fn test_zero_stock_refused() {
        let mut cart = BillingCart::new();
        assert!(matches!(
            cart.add_inventory_item(&medicine(0), 1),
            Err(BillingError::OutOfStock(_))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut cart = BillingCart::new();
        assert!(matches!(
            cart.add_inventory_item(&medicine(5), 0),
            Err(BillingError::InvalidQuantity)
        ));
        assert!(matches!(
            cart.add_manual_item("Dressing".into(), 0, 100.0),
            Err(BillingError::InvalidQuantity)
        ));
    }

    #[test]
    fn test_total() {
        let mut cart = BillingCart::new();
        cart.add_inventory_item(&medicine(10), 4).unwrap();
        cart.add_manual_item("Dressing".into(), 1, 100.0).unwrap();
        assert_eq!(cart.total(), 4.0 * 3.0 + 100.0);
    }
}
