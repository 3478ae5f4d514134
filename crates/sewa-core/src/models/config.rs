//! Store configuration.

use serde::{Deserialize, Serialize};

/// Immutable store-wide settings.
///
/// Loaded once and passed to whoever needs it; the only write path is
/// `Database::save_config`, gated by the manage-settings capability at the
/// facade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    pub store_name: String,
    pub address: String,
    /// ISO-ish currency label used on receipts
    pub currency: String,
    /// Fractional VAT rate, e.g. 0.13
    pub tax_rate: f64,
    /// Fiscal year label in the BS calendar, e.g. "2081/82"
    pub fiscal_year: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_name: "Sewa Clinic & Pharmacy".into(),
            address: String::new(),
            currency: "NPR".into(),
            tax_rate: 0.13,
            fiscal_year: "2081/82".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.currency, "NPR");
        assert!(config.tax_rate > 0.0 && config.tax_rate < 1.0);
    }
}
