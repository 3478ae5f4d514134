//! Medicine and sales database operations.

use rusqlite::{params, Connection, OptionalExtension};
use strsim::{jaro_winkler, normalized_levenshtein};

use super::{Database, DbError, DbResult};
use crate::models::{Medicine, OrgScope, Sale};

/// Number of candidates to retrieve from FTS5 before similarity ranking.
const FTS_CANDIDATE_LIMIT: usize = 30;

impl Database {
    /// Insert a new medicine.
    pub fn insert_medicine(&self, medicine: &Medicine) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO medicines (
                id, name, generic_name, category, batch, expiry,
                unit_price, stock, min_stock, org_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                medicine.id,
                medicine.name,
                medicine.generic_name,
                medicine.category,
                medicine.batch,
                medicine.expiry,
                medicine.unit_price,
                medicine.stock,
                medicine.min_stock,
                medicine.org_id,
                medicine.created_at,
                medicine.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing medicine's descriptive fields and price.
    ///
    /// Stock moves only through `restock` and the sale settlement path.
    pub fn update_medicine(&self, medicine: &Medicine) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medicines SET
                name = ?2,
                generic_name = ?3,
                category = ?4,
                batch = ?5,
                expiry = ?6,
                unit_price = ?7,
                min_stock = ?8,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                medicine.id,
                medicine.name,
                medicine.generic_name,
                medicine.category,
                medicine.batch,
                medicine.expiry,
                medicine.unit_price,
                medicine.min_stock,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a medicine by id.
    pub fn get_medicine(&self, id: &str) -> DbResult<Option<Medicine>> {
        get_medicine_conn(&self.conn, id)
    }

    /// Delete a medicine.
    pub fn delete_medicine(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM medicines WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// List medicines visible in an org scope.
    pub fn list_medicines(&self, scope: &OrgScope) -> DbResult<Vec<Medicine>> {
        let org = scope.org_id();
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {MEDICINE_COLUMNS}
            FROM medicines
            WHERE (?1 IS NULL OR org_id = ?1)
            ORDER BY name
            "#
        ))?;
        let rows = stmt.query_map([org], map_medicine_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Medicines at or below their reorder threshold.
    pub fn low_stock_medicines(&self, scope: &OrgScope) -> DbResult<Vec<Medicine>> {
        let org = scope.org_id();
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {MEDICINE_COLUMNS}
            FROM medicines
            WHERE stock <= min_stock
              AND (?1 IS NULL OR org_id = ?1)
            ORDER BY name
            "#
        ))?;
        let rows = stmt.query_map([org], map_medicine_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Search medicines by name or generic name.
    ///
    /// FTS5 retrieves candidates; string similarity against the query ranks
    /// them, so close misspellings still surface the right item.
    pub fn search_medicines(
        &self,
        query: &str,
        scope: &OrgScope,
        limit: usize,
    ) -> DbResult<Vec<Medicine>> {
        let escaped = escape_fts_query(query);
        if escaped.is_empty() {
            return Ok(Vec::new());
        }

        let org = scope.org_id();
        let mut stmt = self.conn.prepare(
            r#"
            SELECT m.id, m.name, m.generic_name, m.category, m.batch, m.expiry,
                   m.unit_price, m.stock, m.min_stock, m.org_id, m.created_at, m.updated_at
            FROM medicines m
            JOIN medicines_fts fts ON m.rowid = fts.rowid
            WHERE medicines_fts MATCH ?1
              AND (?2 IS NULL OR m.org_id = ?2)
            LIMIT ?3
            "#,
        )?;
        let rows = stmt.query_map(
            params![escaped, org, FTS_CANDIDATE_LIMIT as i64],
            map_medicine_row,
        )?;
        let mut matches: Vec<Medicine> = rows.collect::<Result<Vec<_>, _>>()?;

        matches.sort_by(|a, b| {
            name_similarity(query, b)
                .partial_cmp(&name_similarity(query, a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);
        Ok(matches)
    }

    /// Add received units to stock.
    pub fn restock(&self, id: &str, quantity: i64) -> DbResult<bool> {
        if quantity <= 0 {
            return Err(DbError::Constraint(
                "Restock quantity must be positive".into(),
            ));
        }
        let rows_affected = self.conn.execute(
            "UPDATE medicines SET stock = stock + ?2, updated_at = datetime('now') WHERE id = ?1",
            params![id, quantity],
        )?;
        Ok(rows_affected > 0)
    }

    /// Insert a completed sale.
    pub fn insert_sale(&self, sale: &Sale) -> DbResult<()> {
        insert_sale_conn(&self.conn, sale)
    }

    /// Get a sale by id.
    pub fn get_sale(&self, id: &str) -> DbResult<Option<Sale>> {
        self.conn
            .query_row(
                "SELECT id, org_id, customer_name, lines, total, created_at FROM sales WHERE id = ?",
                [id],
                map_sale_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List sales in an org scope, newest first.
    pub fn list_sales(&self, scope: &OrgScope) -> DbResult<Vec<Sale>> {
        let org = scope.org_id();
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, org_id, customer_name, lines, total, created_at
            FROM sales
            WHERE (?1 IS NULL OR org_id = ?1)
            ORDER BY created_at DESC
            "#,
        )?;
        let rows = stmt.query_map([org], map_sale_row)?;
        let mut sales = Vec::new();
        for row in rows {
            sales.push(row?.try_into()?);
        }
        Ok(sales)
    }

    /// Total sales amount over a Gregorian date range.
    pub fn sales_total(&self, scope: &OrgScope, from: &str, to: &str) -> DbResult<f64> {
        let org = scope.org_id();
        Ok(self.conn.query_row(
            r#"
            SELECT COALESCE(SUM(total), 0)
            FROM sales
            WHERE (?1 IS NULL OR org_id = ?1)
              AND date(created_at) BETWEEN ?2 AND ?3
            "#,
            params![org, from, to],
            |row| row.get(0),
        )?)
    }
}

const MEDICINE_COLUMNS: &str = "id, name, generic_name, category, batch, expiry, unit_price, \
     stock, min_stock, org_id, created_at, updated_at";

pub(crate) fn get_medicine_conn(conn: &Connection, id: &str) -> DbResult<Option<Medicine>> {
    conn.query_row(
        &format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = ?"),
        [id],
        map_medicine_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Deduct sold units inside a settlement transaction.
///
/// The `stock >= quantity` guard makes the decrement atomic: a line that
/// would drive stock negative affects zero rows and the caller aborts.
pub(crate) fn deduct_stock_conn(
    conn: &Connection,
    id: &str,
    org_id: &str,
    quantity: i64,
) -> DbResult<bool> {
    let rows_affected = conn.execute(
        r#"
        UPDATE medicines
        SET stock = stock - ?3, updated_at = datetime('now')
        WHERE id = ?1 AND org_id = ?2 AND stock >= ?3
        "#,
        params![id, org_id, quantity],
    )?;
    Ok(rows_affected > 0)
}

pub(crate) fn insert_sale_conn(conn: &Connection, sale: &Sale) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO sales (id, org_id, customer_name, lines, total, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            sale.id,
            sale.org_id,
            sale.customer_name,
            serde_json::to_string(&sale.lines)?,
            sale.total,
            sale.created_at,
        ],
    )?;
    Ok(())
}

fn map_medicine_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Medicine> {
    Ok(Medicine {
        id: row.get(0)?,
        name: row.get(1)?,
        generic_name: row.get(2)?,
        category: row.get(3)?,
        batch: row.get(4)?,
        expiry: row.get(5)?,
        unit_price: row.get(6)?,
        stock: row.get(7)?,
        min_stock: row.get(8)?,
        org_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Intermediate row struct for database mapping.
struct SaleRow {
    id: String,
    org_id: String,
    customer_name: String,
    lines: String,
    total: f64,
    created_at: String,
}

fn map_sale_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SaleRow> {
    Ok(SaleRow {
        id: row.get(0)?,
        org_id: row.get(1)?,
        customer_name: row.get(2)?,
        lines: row.get(3)?,
        total: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl TryFrom<SaleRow> for Sale {
    type Error = DbError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        Ok(Sale {
            id: row.id,
            org_id: row.org_id,
            customer_name: row.customer_name,
            lines: serde_json::from_str(&row.lines)?,
            total: row.total,
            created_at: row.created_at,
        })
    }
}

/// Similarity of the query against a medicine's brand and generic names.
fn name_similarity(query: &str, medicine: &Medicine) -> f64 {
    let q = query.to_lowercase();
    let score = |name: &str| {
        let n = name.to_lowercase();
        (jaro_winkler(&q, &n) + normalized_levenshtein(&q, &n)) / 2.0
    };
    let brand = score(&medicine.name);
    match medicine.generic_name.as_deref() {
        Some(generic) => brand.max(score(generic)),
        None => brand,
    }
}

/// Escape special FTS5 characters and prepare query for prefix matching.
fn escape_fts_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .map(|word| format!("{}*", word))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn stocked(db: &Database, name: &str, generic: Option<&str>, stock: i64, org: &str) -> Medicine {
        let mut med = Medicine::new(name.into(), "Tablet".into(), 5.0, org.into());
        med.generic_name = generic.map(Into::into);
        med.stock = stock;
        db.insert_medicine(&med).unwrap();
        med
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();
        let med = stocked(&db, "Paracetamol 500mg", Some("paracetamol"), 100, "MAIN");

        let retrieved = db.get_medicine(&med.id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Paracetamol 500mg");
        assert_eq!(retrieved.stock, 100);
    }

    #[test]
    fn test_search_ranks_close_match_first() {
        let db = setup_db();
        stocked(&db, "Paracetamol 500mg", Some("paracetamol"), 10, "MAIN");
        stocked(&db, "Paraffin Gauze", None, 10, "MAIN");

        let scope = OrgScope::Org("MAIN".into());
        let results = db.search_medicines("paracet", &scope, 5).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].name, "Paracetamol 500mg");
    }

    #[test]
    fn test_search_respects_org_scope() {
        let db = setup_db();
        stocked(&db, "Paracetamol 500mg", None, 10, "MAIN");
        stocked(&db, "Paracetamol 650mg", None, 10, "BRANCH-2");

        let results = db
            .search_medicines("paracetamol", &OrgScope::Org("MAIN".into()), 10)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].org_id, "MAIN");
    }

    #[test]
    fn test_search_empty_query() {
        let db = setup_db();
        let results = db
            .search_medicines("  \"*\" ", &OrgScope::All, 10)
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_restock_and_deduct() {
        let db = setup_db();
        let med = stocked(&db, "Cetrizine", None, 5, "MAIN");

        db.restock(&med.id, 10).unwrap();
        assert_eq!(db.get_medicine(&med.id).unwrap().unwrap().stock, 15);

        assert!(deduct_stock_conn(db.conn(), &med.id, "MAIN", 15).unwrap());
        assert_eq!(db.get_medicine(&med.id).unwrap().unwrap().stock, 0);

        // Overdraw affects no rows and leaves stock alone
        assert!(!deduct_stock_conn(db.conn(), &med.id, "MAIN", 1).unwrap());
        assert_eq!(db.get_medicine(&med.id).unwrap().unwrap().stock, 0);
    }

    #[test]
    fn test_deduct_requires_matching_org() {
        let db = setup_db();
        let med = stocked(&db, "Cetrizine", None, 5, "MAIN");
        assert!(!deduct_stock_conn(db.conn(), &med.id, "BRANCH-2", 1).unwrap());
    }

    #[test]
    fn test_negative_restock_rejected() {
        let db = setup_db();
        let med = stocked(&db, "Cetrizine", None, 5, "MAIN");
        assert!(matches!(
            db.restock(&med.id, -3),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_low_stock_listing() {
        let db = setup_db();
        let mut low = Medicine::new("Amoxicillin".into(), "Capsule".into(), 8.0, "MAIN".into());
        low.stock = 3;
        low.min_stock = 10;
        db.insert_medicine(&low).unwrap();
        stocked(&db, "Cetrizine", None, 50, "MAIN");

        let listing = db
            .low_stock_medicines(&OrgScope::Org("MAIN".into()))
            .unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "Amoxicillin");
    }

    #[test]
    fn test_sale_round_trip_and_totals() {
        use crate::models::SaleLine;

        let db = setup_db();
        let sale = Sale::new(
            "MAIN".into(),
            "Walk-in".into(),
            vec![SaleLine {
                medicine_id: None,
                visit_id: None,
                description: "Bandage".into(),
                quantity: 2,
                unit_price: 30.0,
            }],
        );
        db.insert_sale(&sale).unwrap();

        let retrieved = db.get_sale(&sale.id).unwrap().unwrap();
        assert_eq!(retrieved.total, 60.0);
        assert_eq!(retrieved.lines.len(), 1);

        let listed = db.list_sales(&OrgScope::Org("MAIN".into())).unwrap();
        assert_eq!(listed.len(), 1);

        let total = db
            .sales_total(&OrgScope::Org("MAIN".into()), "2000-01-01", "2999-12-31")
            .unwrap();
        assert_eq!(total, 60.0);

        // Other orgs see nothing
        let other = db.list_sales(&OrgScope::Org("BRANCH-2".into())).unwrap();
        assert!(other.is_empty());
    }
}
