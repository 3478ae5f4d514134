//! Service record database operations.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::{Database, DbError, DbResult};
use crate::models::{
    BillingStatus, Demographics, OrgScope, ServiceRecord, VisitStatus,
};

impl Database {
    /// Issue the next human-readable patient code for a department.
    ///
    /// Codes come from a per-department serial kept in the store, so they are
    /// unique by construction rather than by random suffix.
    pub fn next_patient_code(&self, department: &str) -> DbResult<String> {
        self.conn.execute(
            r#"
            INSERT INTO patient_counters (department, next_serial) VALUES (?1, 1)
            ON CONFLICT(department) DO UPDATE SET next_serial = next_serial + 1
            "#,
            [department],
        )?;
        let serial: i64 = self.conn.query_row(
            "SELECT next_serial FROM patient_counters WHERE department = ?",
            [department],
            |row| row.get(0),
        )?;

        let prefix: String = department
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(3)
            .collect::<String>()
            .to_uppercase();
        let prefix = if prefix.is_empty() { "GEN".into() } else { prefix };
        Ok(format!("{}-{:05}", prefix, serial))
    }

    /// Insert a new service record.
    pub fn insert_service_record(&self, record: &ServiceRecord) -> DbResult<()> {
        insert_service_record_conn(&self.conn, record)
    }

    /// Get a service record by id.
    pub fn get_service_record(&self, id: &str) -> DbResult<Option<ServiceRecord>> {
        get_service_record_conn(&self.conn, id)
    }

    /// Persist changes to a record, enforcing the optimistic version check.
    ///
    /// On success the in-memory record's version is advanced to the stored
    /// one. A record mutated by someone else since it was read fails with
    /// `DbError::Stale` instead of silently overwriting.
    pub fn update_service_record(&self, record: &mut ServiceRecord) -> DbResult<()> {
        let new_version = update_service_record_conn(&self.conn, record)?;
        record.version = new_version;
        Ok(())
    }

    /// List records visible in an org scope, newest first.
    pub fn list_service_records(&self, scope: &OrgScope) -> DbResult<Vec<ServiceRecord>> {
        let org = scope.org_id();
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {VISIT_COLUMNS}
            FROM service_records
            WHERE (?1 IS NULL OR org_id = ?1)
            ORDER BY created_at DESC
            "#
        ))?;
        let rows = stmt.query_map([org], map_visit_row)?;
        collect_records(rows)
    }

    /// List registered visits still awaiting consultation.
    pub fn list_pending_consultations(
        &self,
        scope: &OrgScope,
        department: Option<&str>,
    ) -> DbResult<Vec<ServiceRecord>> {
        let org = scope.org_id();
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {VISIT_COLUMNS}
            FROM service_records
            WHERE status = 'pending'
              AND (?1 IS NULL OR org_id = ?1)
              AND (?2 IS NULL OR department = ?2)
            ORDER BY created_at ASC
            "#
        ))?;
        let rows = stmt.query_map(params![org, department], map_visit_row)?;
        collect_records(rows)
    }

    /// Full visit history for a patient code, oldest first.
    pub fn history_for_patient(&self, patient_code: &str) -> DbResult<Vec<ServiceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {VISIT_COLUMNS}
            FROM service_records
            WHERE patient_code = ?
            ORDER BY created_at ASC
            "#
        ))?;
        let rows = stmt.query_map([patient_code], map_visit_row)?;
        collect_records(rows)
    }

    /// Number of visits recorded under a patient code.
    pub fn visit_count_for_patient(&self, patient_code: &str) -> DbResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM service_records WHERE patient_code = ?",
            [patient_code],
            |row| row.get(0),
        )?)
    }

    /// Non-cancelled visit counts per department over a date range.
    ///
    /// Dates are Gregorian "YYYY-MM-DD" bounds on the registration timestamp.
    pub fn visit_counts_by_department(
        &self,
        scope: &OrgScope,
        from: &str,
        to: &str,
    ) -> DbResult<Vec<DeptVisitCount>> {
        let org = scope.org_id();
        let mut stmt = self.conn.prepare(
            r#"
            SELECT department, COUNT(*)
            FROM service_records
            WHERE status != 'cancelled'
              AND (?1 IS NULL OR org_id = ?1)
              AND date(created_at) BETWEEN ?2 AND ?3
            GROUP BY department
            ORDER BY department
            "#,
        )?;
        let rows = stmt.query_map(params![org, from, to], |row| {
            Ok(DeptVisitCount {
                department: row.get(0)?,
                visits: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

/// Visit count for one department.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeptVisitCount {
    pub department: String,
    pub visits: i64,
}

const VISIT_COLUMNS: &str = "id, patient_code, department, org_id, patient_name, age, gender, \
     address, contact, ethnicity, status, findings, diagnosis, prescriptions, lab_tests, \
     service_requests, prescription_status, vaccination, version, created_at, updated_at";

pub(crate) fn insert_service_record_conn(conn: &Connection, record: &ServiceRecord) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO service_records (
            id, patient_code, department, org_id, patient_name, age, gender,
            address, contact, ethnicity, status, findings, diagnosis,
            prescriptions, lab_tests, service_requests, prescription_status,
            vaccination, version, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                  ?15, ?16, ?17, ?18, ?19, ?20, ?21)
        "#,
        params![
            record.id,
            record.patient_code,
            record.department,
            record.org_id,
            record.demographics.name,
            record.demographics.age,
            record.demographics.gender,
            record.demographics.address,
            record.demographics.contact,
            record.demographics.ethnicity,
            visit_status_to_string(&record.status),
            record.findings,
            record.diagnosis,
            serde_json::to_string(&record.prescriptions)?,
            serde_json::to_string(&record.lab_tests)?,
            serde_json::to_string(&record.service_requests)?,
            billing_status_to_string(&record.prescription_status),
            record
                .vaccination
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            record.version,
            record.created_at,
            record.updated_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn get_service_record_conn(
    conn: &Connection,
    id: &str,
) -> DbResult<Option<ServiceRecord>> {
    conn.query_row(
        &format!("SELECT {VISIT_COLUMNS} FROM service_records WHERE id = ?"),
        [id],
        map_visit_row,
    )
    .optional()?
    .map(|row| row.try_into())
    .transpose()
}

/// Version-checked update. Returns the new stored version.
pub(crate) fn update_service_record_conn(
    conn: &Connection,
    record: &ServiceRecord,
) -> DbResult<i64> {
    let rows_affected = conn.execute(
        r#"
        UPDATE service_records SET
            patient_name = ?3,
            age = ?4,
            gender = ?5,
            address = ?6,
            contact = ?7,
            ethnicity = ?8,
            status = ?9,
            findings = ?10,
            diagnosis = ?11,
            prescriptions = ?12,
            lab_tests = ?13,
            service_requests = ?14,
            prescription_status = ?15,
            vaccination = ?16,
            version = version + 1,
            updated_at = datetime('now')
        WHERE id = ?1 AND version = ?2
        "#,
        params![
            record.id,
            record.version,
            record.demographics.name,
            record.demographics.age,
            record.demographics.gender,
            record.demographics.address,
            record.demographics.contact,
            record.demographics.ethnicity,
            visit_status_to_string(&record.status),
            record.findings,
            record.diagnosis,
            serde_json::to_string(&record.prescriptions)?,
            serde_json::to_string(&record.lab_tests)?,
            serde_json::to_string(&record.service_requests)?,
            billing_status_to_string(&record.prescription_status),
            record
                .vaccination
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        ],
    )?;

    if rows_affected == 0 {
        let exists: Option<i64> = conn
            .query_row(
                "SELECT version FROM service_records WHERE id = ?",
                [record.id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        return match exists {
            Some(_) => Err(DbError::Stale(record.id.clone())),
            None => Err(DbError::NotFound(record.id.clone())),
        };
    }
    Ok(record.version + 1)
}

/// Intermediate row struct for database mapping.
struct VisitRow {
    id: String,
    patient_code: String,
    department: String,
    org_id: String,
    patient_name: String,
    age: u32,
    gender: String,
    address: String,
    contact: String,
    ethnicity: Option<String>,
    status: String,
    findings: Option<String>,
    diagnosis: Option<String>,
    prescriptions: String,
    lab_tests: String,
    service_requests: String,
    prescription_status: String,
    vaccination: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

fn map_visit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<VisitRow> {
    Ok(VisitRow {
        id: row.get(0)?,
        patient_code: row.get(1)?,
        department: row.get(2)?,
        org_id: row.get(3)?,
        patient_name: row.get(4)?,
        age: row.get(5)?,
        gender: row.get(6)?,
        address: row.get(7)?,
        contact: row.get(8)?,
        ethnicity: row.get(9)?,
        status: row.get(10)?,
        findings: row.get(11)?,
        diagnosis: row.get(12)?,
        prescriptions: row.get(13)?,
        lab_tests: row.get(14)?,
        service_requests: row.get(15)?,
        prescription_status: row.get(16)?,
        vaccination: row.get(17)?,
        version: row.get(18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}

fn collect_records(
    rows: impl Iterator<Item = rusqlite::Result<VisitRow>>,
) -> DbResult<Vec<ServiceRecord>> {
    let mut records = Vec::new();
    for row in rows {
        records.push(row?.try_into()?);
    }
    Ok(records)
}

impl TryFrom<VisitRow> for ServiceRecord {
    type Error = DbError;

    fn try_from(row: VisitRow) -> Result<Self, Self::Error> {
        Ok(ServiceRecord {
            id: row.id,
            patient_code: row.patient_code,
            department: row.department,
            org_id: row.org_id,
            demographics: Demographics {
                name: row.patient_name,
                age: row.age,
                gender: row.gender,
                address: row.address,
                contact: row.contact,
                ethnicity: row.ethnicity,
            },
            status: string_to_visit_status(&row.status)?,
            findings: row.findings,
            diagnosis: row.diagnosis,
            prescriptions: serde_json::from_str(&row.prescriptions)?,
            lab_tests: serde_json::from_str(&row.lab_tests)?,
            service_requests: serde_json::from_str(&row.service_requests)?,
            prescription_status: string_to_billing_status(&row.prescription_status)?,
            vaccination: row
                .vaccination
                .map(|s| serde_json::from_str(&s))
                .transpose()?,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn visit_status_to_string(status: &VisitStatus) -> &'static str {
    match status {
        VisitStatus::Pending => "pending",
        VisitStatus::Completed => "completed",
        VisitStatus::Cancelled => "cancelled",
    }
}

fn string_to_visit_status(s: &str) -> Result<VisitStatus, DbError> {
    match s {
        "pending" => Ok(VisitStatus::Pending),
        "completed" => Ok(VisitStatus::Completed),
        "cancelled" => Ok(VisitStatus::Cancelled),
        _ => Err(DbError::Constraint(format!("Unknown visit status: {}", s))),
    }
}

fn billing_status_to_string(status: &BillingStatus) -> &'static str {
    match status {
        BillingStatus::Pending => "pending",
        BillingStatus::Billed => "billed",
    }
}

fn string_to_billing_status(s: &str) -> Result<BillingStatus, DbError> {
    match s {
        "pending" => Ok(BillingStatus::Pending),
        "billed" => Ok(BillingStatus::Billed),
        _ => Err(DbError::Constraint(format!(
            "Unknown billing status: {}",
            s
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConsultationNote, LabTest, PrescriptionItem, ServiceRequest};

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn register(db: &Database, department: &str, name: &str) -> ServiceRecord {
        let code = db.next_patient_code(department).unwrap();
        let record = ServiceRecord::new(
            code,
            department.into(),
            "MAIN".into(),
            Demographics {
                name: name.into(),
                age: 30,
                gender: "M".into(),
                address: "Itahari".into(),
                contact: "9811111111".into(),
                ethnicity: None,
            },
        );
        db.insert_service_record(&record).unwrap();
        record
    }

    fn make_note() -> ConsultationNote {
        ConsultationNote {
            findings: "Cough".into(),
            diagnosis: "URTI".into(),
            prescriptions: vec![PrescriptionItem {
                medicine_id: None,
                name: "Azithromycin 500mg".into(),
                dosage: "1 tab".into(),
                frequency: "OD".into(),
                duration: "3 days".into(),
                quantity: 3,
                unit_price: 25.0,
            }],
            lab_tests: vec![LabTest::new("CBC".into(), 400.0)],
            service_requests: vec![ServiceRequest::new("X-Ray".into(), "Radiology".into(), 600.0)],
            vaccination: None,
        }
    }

    #[test]
    fn test_patient_code_sequence() {
        let db = setup_db();
        assert_eq!(db.next_patient_code("OPD").unwrap(), "OPD-00001");
        assert_eq!(db.next_patient_code("OPD").unwrap(), "OPD-00002");
        assert_eq!(db.next_patient_code("Dental").unwrap(), "DEN-00001");
        assert_eq!(db.next_patient_code("--").unwrap(), "GEN-00001");
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        let db = setup_db();
        let mut record = register(&db, "OPD", "Hari");
        record.complete_consultation(make_note()).unwrap();
        db.update_service_record(&mut record).unwrap();

        let retrieved = db.get_service_record(&record.id).unwrap().unwrap();
        assert_eq!(retrieved.status, VisitStatus::Completed);
        assert_eq!(retrieved.prescriptions.len(), 1);
        assert_eq!(retrieved.lab_tests[0].name, "CBC");
        assert_eq!(retrieved.service_requests[0].price, 600.0);
        assert_eq!(retrieved.version, 2);
    }

    #[test]
    fn test_stale_write_rejected() {
        let db = setup_db();
        let record = register(&db, "OPD", "Hari");

        // Two staff members load the same record
        let mut first = db.get_service_record(&record.id).unwrap().unwrap();
        let mut second = db.get_service_record(&record.id).unwrap().unwrap();

        first.complete_consultation(make_note()).unwrap();
        db.update_service_record(&mut first).unwrap();

        second.complete_consultation(make_note()).unwrap();
        let err = db.update_service_record(&mut second).unwrap_err();
        assert!(matches!(err, DbError::Stale(_)));

        // The stored record still carries the first write
        let stored = db.get_service_record(&record.id).unwrap().unwrap();
        assert_eq!(stored.version, first.version);
    }

    #[test]
    fn test_update_unknown_record() {
        let db = setup_db();
        let mut record = ServiceRecord::new(
            "OPD-00001".into(),
            "OPD".into(),
            "MAIN".into(),
            Demographics::default(),
        );
        let err = db.update_service_record(&mut record).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_org_scope_filters_lists() {
        let db = setup_db();
        register(&db, "OPD", "Hari");
        let mut other = ServiceRecord::new(
            "OPD-00099".into(),
            "OPD".into(),
            "BRANCH-2".into(),
            Demographics::default(),
        );
        other.demographics.name = "Gita".into();
        db.insert_service_record(&other).unwrap();

        let main = db
            .list_service_records(&OrgScope::Org("MAIN".into()))
            .unwrap();
        assert_eq!(main.len(), 1);
        assert_eq!(main[0].demographics.name, "Hari");

        let all = db.list_service_records(&OrgScope::All).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_pending_consultation_queue() {
        let db = setup_db();
        let mut done = register(&db, "OPD", "Hari");
        register(&db, "OPD", "Gita");
        register(&db, "Dental", "Ram");

        done.complete_consultation(make_note()).unwrap();
        db.update_service_record(&mut done).unwrap();

        let scope = OrgScope::Org("MAIN".into());
        let pending = db.list_pending_consultations(&scope, None).unwrap();
        assert_eq!(pending.len(), 2);

        let opd_only = db
            .list_pending_consultations(&scope, Some("OPD"))
            .unwrap();
        assert_eq!(opd_only.len(), 1);
        assert_eq!(opd_only[0].demographics.name, "Gita");
    }

    #[test]
    fn test_history_is_append_only_per_code() {
        let db = setup_db();
        let first = register(&db, "OPD", "Hari");

        // Returning visit reuses the patient code
        let record = ServiceRecord::new(
            first.patient_code.clone(),
            "OPD".into(),
            "MAIN".into(),
            first.demographics.clone(),
        );
        db.insert_service_record(&record).unwrap();

        let history = db.history_for_patient(&first.patient_code).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(db.visit_count_for_patient(&first.patient_code).unwrap(), 2);
    }

    #[test]
    fn test_visit_counts_by_department() {
        let db = setup_db();
        register(&db, "OPD", "Hari");
        register(&db, "OPD", "Gita");
        let mut cancelled = register(&db, "Dental", "Ram");
        cancelled.cancel().unwrap();
        db.update_service_record(&mut cancelled).unwrap();

        let counts = db
            .visit_counts_by_department(&OrgScope::All, "2000-01-01", "2999-12-31")
            .unwrap();
        assert_eq!(
            counts,
            vec![DeptVisitCount {
                department: "OPD".into(),
                visits: 2
            }]
        );
    }
}
