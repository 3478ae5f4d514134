//! SQLite schema definition.

/// Complete database schema for the sewa store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Medicines (Inventory)
-- ============================================================================

CREATE TABLE IF NOT EXISTS medicines (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    generic_name TEXT,
    category TEXT NOT NULL,
    batch TEXT,
    expiry TEXT,                                  -- BS date "YYYY-MM-DD"
    unit_price REAL NOT NULL DEFAULT 0,
    stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
    min_stock INTEGER NOT NULL DEFAULT 0,
    org_id TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- FTS5 virtual table for medicine name search
CREATE VIRTUAL TABLE IF NOT EXISTS medicines_fts USING fts5(
    id,
    name,
    generic_name,
    content='medicines',
    content_rowid='rowid'
);

-- Triggers to keep FTS5 in sync with main table
CREATE TRIGGER IF NOT EXISTS medicines_ai AFTER INSERT ON medicines BEGIN
    INSERT INTO medicines_fts(rowid, id, name, generic_name)
    VALUES (new.rowid, new.id, new.name, new.generic_name);
END;

CREATE TRIGGER IF NOT EXISTS medicines_ad AFTER DELETE ON medicines BEGIN
    INSERT INTO medicines_fts(medicines_fts, rowid, id, name, generic_name)
    VALUES ('delete', old.rowid, old.id, old.name, old.generic_name);
END;

CREATE TRIGGER IF NOT EXISTS medicines_au AFTER UPDATE ON medicines BEGIN
    INSERT INTO medicines_fts(medicines_fts, rowid, id, name, generic_name)
    VALUES ('delete', old.rowid, old.id, old.name, old.generic_name);
    INSERT INTO medicines_fts(rowid, id, name, generic_name)
    VALUES (new.rowid, new.id, new.name, new.generic_name);
END;

CREATE INDEX IF NOT EXISTS idx_medicines_org ON medicines(org_id);
CREATE INDEX IF NOT EXISTS idx_medicines_category ON medicines(category);

-- ============================================================================
-- Sales (Append-Only - no edit or void)
-- ============================================================================

CREATE TABLE IF NOT EXISTS sales (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL,
    customer_name TEXT NOT NULL DEFAULT '',
    lines TEXT NOT NULL DEFAULT '[]',             -- JSON array of SaleLine
    total REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_sales_org ON sales(org_id);
CREATE INDEX IF NOT EXISTS idx_sales_created ON sales(created_at);

-- ============================================================================
-- Service Records (one per patient visit to a department)
-- ============================================================================

CREATE TABLE IF NOT EXISTS service_records (
    id TEXT PRIMARY KEY,
    patient_code TEXT NOT NULL,
    department TEXT NOT NULL,
    org_id TEXT NOT NULL,
    patient_name TEXT NOT NULL,
    age INTEGER NOT NULL DEFAULT 0,
    gender TEXT NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT '',
    contact TEXT NOT NULL DEFAULT '',
    ethnicity TEXT,
    status TEXT NOT NULL DEFAULT 'pending',       -- pending, completed, cancelled
    findings TEXT,
    diagnosis TEXT,
    prescriptions TEXT NOT NULL DEFAULT '[]',     -- JSON array of PrescriptionItem
    lab_tests TEXT NOT NULL DEFAULT '[]',         -- JSON array of LabTest
    service_requests TEXT NOT NULL DEFAULT '[]',  -- JSON array of ServiceRequest
    prescription_status TEXT NOT NULL DEFAULT 'billed',  -- pending, billed
    vaccination TEXT,                             -- JSON VaccinationSchedule
    version INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_records_patient_code ON service_records(patient_code);
CREATE INDEX IF NOT EXISTS idx_records_org ON service_records(org_id);
CREATE INDEX IF NOT EXISTS idx_records_status ON service_records(status);
CREATE INDEX IF NOT EXISTS idx_records_department ON service_records(department);

-- Per-department serial for human-readable patient codes
CREATE TABLE IF NOT EXISTS patient_counters (
    department TEXT PRIMARY KEY,
    next_serial INTEGER NOT NULL DEFAULT 0
);

-- ============================================================================
-- Users & Settings
-- ============================================================================

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL,                           -- super_admin, sub_admin, user
    org_id TEXT NOT NULL,
    granted TEXT NOT NULL DEFAULT '[]',           -- JSON array of capability names
    revoked TEXT NOT NULL DEFAULT '[]',           -- JSON array of capability names
    display_name TEXT,
    contact TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Single-row store settings
CREATE TABLE IF NOT EXISTS settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    store_name TEXT NOT NULL,
    address TEXT NOT NULL DEFAULT '',
    currency TEXT NOT NULL,
    tax_rate REAL NOT NULL DEFAULT 0,
    fiscal_year TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

INSERT OR IGNORE INTO settings (id, store_name, address, currency, tax_rate, fiscal_year)
VALUES (1, 'Sewa Clinic & Pharmacy', '', 'NPR', 0.13, '2081/82');

-- ============================================================================
-- Change Signal
-- ============================================================================

-- Single revision counter the UI polls to learn "something changed, refetch"
CREATE TABLE IF NOT EXISTS change_log (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    revision INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO change_log (id, revision) VALUES (1, 0);

CREATE TRIGGER IF NOT EXISTS medicines_rev_i AFTER INSERT ON medicines BEGIN
    UPDATE change_log SET revision = revision + 1 WHERE id = 1;
END;
CREATE TRIGGER IF NOT EXISTS medicines_rev_u AFTER UPDATE ON medicines BEGIN
    UPDATE change_log SET revision = revision + 1 WHERE id = 1;
END;
CREATE TRIGGER IF NOT EXISTS sales_rev_i AFTER INSERT ON sales BEGIN
    UPDATE change_log SET revision = revision + 1 WHERE id = 1;
END;
CREATE TRIGGER IF NOT EXISTS records_rev_i AFTER INSERT ON service_records BEGIN
    UPDATE change_log SET revision = revision + 1 WHERE id = 1;
END;
CREATE TRIGGER IF NOT EXISTS records_rev_u AFTER UPDATE ON service_records BEGIN
    UPDATE change_log SET revision = revision + 1 WHERE id = 1;
END;
CREATE TRIGGER IF NOT EXISTS users_rev_i AFTER INSERT ON users BEGIN
    UPDATE change_log SET revision = revision + 1 WHERE id = 1;
END;
CREATE TRIGGER IF NOT EXISTS users_rev_u AFTER UPDATE ON users BEGIN
    UPDATE change_log SET revision = revision + 1 WHERE id = 1;
END;
"#;
