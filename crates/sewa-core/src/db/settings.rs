//! Store settings persistence.

use rusqlite::params;

use super::{Database, DbResult};
use crate::models::StoreConfig;

impl Database {
    /// Load the store configuration.
    pub fn load_config(&self) -> DbResult<StoreConfig> {
        Ok(self.conn.query_row(
            "SELECT store_name, address, currency, tax_rate, fiscal_year FROM settings WHERE id = 1",
            [],
            |row| {
                Ok(StoreConfig {
                    store_name: row.get(0)?,
                    address: row.get(1)?,
                    currency: row.get(2)?,
                    tax_rate: row.get(3)?,
                    fiscal_year: row.get(4)?,
                })
            },
        )?)
    }

    /// Replace the store configuration.
    ///
    /// The single write entry point for settings; callers gate it behind the
    /// manage-settings capability.
    pub fn save_config(&self, config: &StoreConfig) -> DbResult<()> {
        self.conn.execute(
            r#"
            UPDATE settings SET
                store_name = ?1,
                address = ?2,
                currency = ?3,
                tax_rate = ?4,
                fiscal_year = ?5,
                updated_at = datetime('now')
            WHERE id = 1
            "#,
            params![
                config.store_name,
                config.address,
                config.currency,
                config.tax_rate,
                config.fiscal_year,
            ],
        )?;
        Ok(())
    }
}
