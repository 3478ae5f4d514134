//! Sewa Core Library
//!
//! Local-first clinic and pharmacy management core: patient visit lifecycle,
//! billing reconciliation, inventory and access control over an embedded
//! SQLite store. The UI shell talks to this crate through the FFI facade.
//!
//! # Workflow
//!
//! ```text
//! Registration ──► ServiceRecord (PENDING)
//!                        │
//!              Consultation save (findings, diagnosis,
//!              prescription / lab / service requests)
//!                        │
//!                 ServiceRecord (COMPLETED)
//!                        │
//!          ┌─────────────▼──────────────┐
//!          │        Billing Desk        │
//!          │  import PENDING sub-items  │
//!          │  + walk-in catalog lines   │
//!          │  settle in ONE transaction │
//!          └─────────────┬──────────────┘
//!          ┌─────────────┼──────────────┐
//!          ▼             ▼              ▼
//!     Sale created   sub-items      stock deducted
//!                   BILLED / PAID
//! ```
//!
//! # Core Invariants
//!
//! **A sub-item is billed at most once, and stock never goes negative.** The
//! pending-import query filters strictly on `Pending` sub-statuses, and the
//! settlement transaction either commits every effect or none.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer with FTS5 medicine search
//! - [`models`]: Domain types (ServiceRecord, Medicine, Sale, User, ...)
//! - [`auth`]: Credentials, sessions and the capability gate
//! - [`billing`]: Pending-request import and transactional settlement
//! - [`calendar`]: Bikram Sambat dates and vaccination schedules

pub mod auth;
pub mod billing;
pub mod calendar;
pub mod db;
pub mod models;

// Re-export commonly used types
pub use auth::{authenticate, seed_default_admin, NewAccount, Session};
pub use billing::{pending_lines, BillingCart, BillingDesk, CartLine, LineSource};
pub use calendar::{BsDate, VaccinationSchedule};
pub use db::Database;
pub use models::{
    BillingStatus, Capability, ConsultationNote, Demographics, LabPaymentStatus, LabTest,
    Medicine, OrgScope, PermissionSet, PrescriptionItem, Role, Sale, ServiceRecord,
    ServiceRequest, StoreConfig, User, VisitStatus,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum SewaError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    AmbiguousOrganization(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("No active session: {0}")]
    NotAuthenticated(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for SewaError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(id) => SewaError::NotFound(id),
            db::DbError::Stale(id) => SewaError::Conflict(format!(
                "Record {} was changed by someone else; reload and retry",
                id
            )),
            other => SewaError::DatabaseError(other.to_string()),
        }
    }
}

impl From<auth::AuthError> for SewaError {
    fn from(e: auth::AuthError) -> Self {
        match e {
            auth::AuthError::Database(db) => db.into(),
            auth::AuthError::InvalidCredentials => {
                SewaError::InvalidCredentials("Username or password incorrect".into())
            }
            auth::AuthError::AmbiguousOrganization => SewaError::AmbiguousOrganization(
                "Select a specific organization first".into(),
            ),
            auth::AuthError::AccessDenied(_) | auth::AuthError::Forbidden(_) => {
                SewaError::AccessDenied(e.to_string())
            }
            auth::AuthError::Session(err) => SewaError::SerializationError(err.to_string()),
        }
    }
}

impl From<billing::BillingError> for SewaError {
    fn from(e: billing::BillingError) -> Self {
        use billing::BillingError::*;
        match e {
            Database(db) => db.into(),
            AmbiguousOrganization => SewaError::AmbiguousOrganization(
                "Select a specific organization first".into(),
            ),
            OutOfStock(_) | InsufficientStock(_) => SewaError::InsufficientStock(e.to_string()),
            VisitNotFound(id) => SewaError::NotFound(id),
            AlreadyBilled(_) => SewaError::Conflict(e.to_string()),
            other => SewaError::InvalidInput(other.to_string()),
        }
    }
}

impl From<models::TransitionError> for SewaError {
    fn from(e: models::TransitionError) -> Self {
        SewaError::InvalidInput(e.to_string())
    }
}

impl From<calendar::CalendarError> for SewaError {
    fn from(e: calendar::CalendarError) -> Self {
        SewaError::InvalidInput(e.to_string())
    }
}

impl From<serde_json::Error> for SewaError {
    fn from(e: serde_json::Error) -> Self {
        SewaError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for SewaError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        SewaError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a store database at the given path.
#[uniffi::export]
pub fn open_store(path: String) -> Result<Arc<SewaCore>, SewaError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(SewaCore {
        db: Arc::new(Mutex::new(db)),
        session: Mutex::new(None),
    }))
}

/// Create an in-memory store (for testing).
#[uniffi::export]
pub fn open_store_in_memory() -> Result<Arc<SewaCore>, SewaError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(SewaCore {
        db: Arc::new(Mutex::new(db)),
        session: Mutex::new(None),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe store handle for the UI shell.
#[derive(uniffi::Object)]
pub struct SewaCore {
    db: Arc<Mutex<Database>>,
    session: Mutex<Option<Session>>,
}

impl SewaCore {
    fn current_session(&self) -> Result<Session, SewaError> {
        self.session
            .lock()?
            .clone()
            .ok_or_else(|| SewaError::NotAuthenticated("log in first".into()))
    }
}

#[uniffi::export]
impl SewaCore {
    // =========================================================================
    // Session Operations
    // =========================================================================

    /// Authenticate and open a session. Seeds the default administrator on a
    /// fresh store.
    pub fn login(&self, username: String, password: String) -> Result<FfiSession, SewaError> {
        let db = self.db.lock()?;
        let session = authenticate(&db, &username, &password)?;
        let ffi = FfiSession::from(&session);
        *self.session.lock()? = Some(session);
        Ok(ffi)
    }

    /// Restore a session previously serialized with `session_json`.
    pub fn restore_session(&self, json: String) -> Result<FfiSession, SewaError> {
        let session = Session::from_json(&json)?;
        let ffi = FfiSession::from(&session);
        *self.session.lock()? = Some(session);
        Ok(ffi)
    }

    /// Serialize the active session for local storage.
    pub fn session_json(&self) -> Result<String, SewaError> {
        Ok(self.current_session()?.to_json()?)
    }

    pub fn logout(&self) -> Result<(), SewaError> {
        *self.session.lock()? = None;
        Ok(())
    }

    /// Switch the organization filter. `None` selects the cross-org view,
    /// which disables every create/mutate operation.
    pub fn select_organization(&self, org_id: Option<String>) -> Result<FfiSession, SewaError> {
        let mut guard = self.session.lock()?;
        let session = guard
            .as_mut()
            .ok_or_else(|| SewaError::NotAuthenticated("log in first".into()))?;
        let scope = match org_id {
            Some(id) => OrgScope::Org(id),
            None => OrgScope::All,
        };
        session.select_scope(scope)?;
        Ok(FfiSession::from(&*session))
    }

    /// Current change-log revision; poll and refetch when it moves.
    pub fn revision(&self) -> Result<i64, SewaError> {
        Ok(self.db.lock()?.revision()?)
    }

    // =========================================================================
    // Visit Operations
    // =========================================================================

    /// Register a patient visit in the active organization.
    pub fn register_patient(
        &self,
        department: String,
        demographics: FfiDemographics,
    ) -> Result<FfiVisitSummary, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::RegisterPatient)?;
        let org = session.writable_org()?.to_string();

        let db = self.db.lock()?;
        let code = db.next_patient_code(&department)?;
        let record = ServiceRecord::new(code, department, org, demographics.into());
        db.insert_service_record(&record)?;
        Ok(FfiVisitSummary::from(&record))
    }

    /// Save (or re-save) a consultation against a pending or completed visit.
    pub fn complete_consultation(
        &self,
        visit_id: String,
        note: FfiConsultationNote,
    ) -> Result<FfiVisitSummary, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::RunConsultation)?;
        let org = session.writable_org()?;

        let db = self.db.lock()?;
        let mut record = db
            .get_service_record(&visit_id)?
            .ok_or(SewaError::NotFound(visit_id))?;
        if record.org_id != org {
            return Err(SewaError::AccessDenied(
                "Visit belongs to another organization".into(),
            ));
        }
        record.complete_consultation(note.try_into()?)?;
        db.update_service_record(&mut record)?;
        Ok(FfiVisitSummary::from(&record))
    }

    pub fn cancel_visit(&self, visit_id: String) -> Result<FfiVisitSummary, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::CancelVisit)?;
        let org = session.writable_org()?;

        let db = self.db.lock()?;
        let mut record = db
            .get_service_record(&visit_id)?
            .ok_or(SewaError::NotFound(visit_id))?;
        if record.org_id != org {
            return Err(SewaError::AccessDenied(
                "Visit belongs to another organization".into(),
            ));
        }
        record.cancel()?;
        db.update_service_record(&mut record)?;
        Ok(FfiVisitSummary::from(&record))
    }

    pub fn record_lab_result(
        &self,
        visit_id: String,
        test_name: String,
        result: String,
    ) -> Result<(), SewaError> {
        let session = self.current_session()?;
        session.require(Capability::EnterLabResults)?;
        let org = session.writable_org()?;

        let db = self.db.lock()?;
        let mut record = db
            .get_service_record(&visit_id)?
            .ok_or(SewaError::NotFound(visit_id))?;
        if record.org_id != org {
            return Err(SewaError::AccessDenied(
                "Visit belongs to another organization".into(),
            ));
        }
        record.record_lab_result(&test_name, result)?;
        db.update_service_record(&mut record)?;
        Ok(())
    }

    /// Mark one dose of a visit's vaccination schedule as administered.
    pub fn record_vaccine_dose(&self, visit_id: String, day_offset: u32) -> Result<(), SewaError> {
        let session = self.current_session()?;
        session.require(Capability::ManageVaccination)?;
        let org = session.writable_org()?;

        let db = self.db.lock()?;
        let mut record = db
            .get_service_record(&visit_id)?
            .ok_or(SewaError::NotFound(visit_id))?;
        if record.org_id != org {
            return Err(SewaError::AccessDenied(
                "Visit belongs to another organization".into(),
            ));
        }
        record.record_dose_given(day_offset)?;
        db.update_service_record(&mut record)?;
        Ok(())
    }

    /// Registered visits still waiting for consultation.
    pub fn pending_consultations(
        &self,
        department: Option<String>,
    ) -> Result<Vec<FfiVisitSummary>, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::ViewVisits)?;

        let db = self.db.lock()?;
        let records = db.list_pending_consultations(&session.org, department.as_deref())?;
        Ok(records.iter().map(FfiVisitSummary::from).collect())
    }

    /// Full visit history under a patient code.
    pub fn patient_history(
        &self,
        patient_code: String,
    ) -> Result<Vec<FfiVisitSummary>, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::ViewVisits)?;

        let db = self.db.lock()?;
        let records = db.history_for_patient(&patient_code)?;
        Ok(records
            .iter()
            .filter(|r| match session.org.org_id() {
                Some(org) => r.org_id == org,
                None => true,
            })
            .map(FfiVisitSummary::from)
            .collect())
    }

    // =========================================================================
    // Billing Operations
    // =========================================================================

    /// Outstanding billable lines for a visit.
    pub fn pending_bill_lines(&self, visit_id: String) -> Result<Vec<FfiBillLine>, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::AccessBilling)?;

        let mut db = self.db.lock()?;
        let desk = BillingDesk::new(&mut db);
        let lines = desk.import_pending(&visit_id)?;
        Ok(lines.iter().map(FfiBillLine::from).collect())
    }

    /// Import a visit's pending requests, merge walk-in extras, and settle.
    pub fn settle_visit_bill(
        &self,
        visit_id: String,
        extras: Vec<FfiCartItem>,
        customer: String,
    ) -> Result<FfiSaleSummary, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::AccessBilling)?;

        let mut db = self.db.lock()?;
        let mut cart = BillingCart::new();
        {
            let desk = BillingDesk::new(&mut db);
            cart.add_imported(desk.import_pending(&visit_id)?);
        }
        add_cart_items(&db, &session, &mut cart, extras)?;

        let mut desk = BillingDesk::new(&mut db);
        let sale = desk.settle(&cart, &session.org, &customer)?;
        Ok(FfiSaleSummary::from(&sale))
    }

    /// Retail point-of-sale checkout, not tied to any visit.
    pub fn checkout_sale(
        &self,
        items: Vec<FfiCartItem>,
        customer: String,
    ) -> Result<FfiSaleSummary, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::ProcessSales)?;

        let mut db = self.db.lock()?;
        let mut cart = BillingCart::new();
        add_cart_items(&db, &session, &mut cart, items)?;

        let mut desk = BillingDesk::new(&mut db);
        let sale = desk.settle(&cart, &session.org, &customer)?;
        Ok(FfiSaleSummary::from(&sale))
    }

    pub fn list_sales(&self) -> Result<Vec<FfiSaleSummary>, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::ViewSales)?;

        let db = self.db.lock()?;
        let sales = db.list_sales(&session.org)?;
        Ok(sales.iter().map(FfiSaleSummary::from).collect())
    }

    // =========================================================================
    // Inventory Operations
    // =========================================================================

    pub fn add_medicine(&self, medicine: FfiNewMedicine) -> Result<FfiMedicine, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::AddInventory)?;
        let org = session.writable_org()?.to_string();

        let mut item = Medicine::new(medicine.name, medicine.category, medicine.unit_price, org);
        item.generic_name = medicine.generic_name;
        item.batch = medicine.batch;
        item.expiry = medicine.expiry;
        item.stock = medicine.initial_stock.max(0);
        item.min_stock = medicine.min_stock.max(0);

        let db = self.db.lock()?;
        db.insert_medicine(&item)?;
        Ok(FfiMedicine::from(&item))
    }

    pub fn restock_medicine(&self, medicine_id: String, quantity: i64) -> Result<(), SewaError> {
        let session = self.current_session()?;
        session.require(Capability::EditInventory)?;
        session.writable_org()?;

        let db = self.db.lock()?;
        if !db.restock(&medicine_id, quantity)? {
            return Err(SewaError::NotFound(medicine_id));
        }
        Ok(())
    }

    pub fn delete_medicine(&self, medicine_id: String) -> Result<(), SewaError> {
        let session = self.current_session()?;
        session.require(Capability::DeleteInventory)?;
        session.writable_org()?;

        let db = self.db.lock()?;
        if !db.delete_medicine(&medicine_id)? {
            return Err(SewaError::NotFound(medicine_id));
        }
        Ok(())
    }

    pub fn search_medicines(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiMedicine>, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::ViewInventory)?;

        let db = self.db.lock()?;
        let items = db.search_medicines(&query, &session.org, limit as usize)?;
        Ok(items.iter().map(FfiMedicine::from).collect())
    }

    pub fn low_stock_medicines(&self) -> Result<Vec<FfiMedicine>, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::ViewInventory)?;

        let db = self.db.lock()?;
        let items = db.low_stock_medicines(&session.org)?;
        Ok(items.iter().map(FfiMedicine::from).collect())
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Non-cancelled visit counts per department over a date range.
    pub fn visit_counts(
        &self,
        from: String,
        to: String,
    ) -> Result<Vec<FfiDeptCount>, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::ViewStatReports)?;

        let db = self.db.lock()?;
        let counts = db.visit_counts_by_department(&session.org, &from, &to)?;
        Ok(counts
            .into_iter()
            .map(|c| FfiDeptCount {
                department: c.department,
                visits: c.visits,
            })
            .collect())
    }

    /// Total sales amount over a date range.
    pub fn sales_total(&self, from: String, to: String) -> Result<f64, SewaError> {
        let session = self.current_session()?;
        session.require(Capability::ViewFinancialReports)?;

        let db = self.db.lock()?;
        Ok(db.sales_total(&session.org, &from, &to)?)
    }

    // =========================================================================
    // Accounts & Settings
    // =========================================================================

    pub fn create_account(&self, account: FfiNewAccount) -> Result<FfiUser, SewaError> {
        let session = self.current_session()?;
        let db = self.db.lock()?;
        let user = auth::create_user(&db, &session, account.try_into()?)?;
        Ok(FfiUser::from(&user))
    }

    pub fn change_password(
        &self,
        old_password: String,
        new_password: String,
    ) -> Result<(), SewaError> {
        let session = self.current_session()?;
        let db = self.db.lock()?;
        auth::change_password(&db, &session, &old_password, &new_password)?;
        Ok(())
    }

    pub fn store_config(&self) -> Result<FfiStoreConfig, SewaError> {
        let db = self.db.lock()?;
        Ok(FfiStoreConfig::from(&db.load_config()?))
    }

    pub fn update_store_config(&self, config: FfiStoreConfig) -> Result<(), SewaError> {
        let session = self.current_session()?;
        session.require(Capability::ManageSettings)?;

        let db = self.db.lock()?;
        db.save_config(&config.into())?;
        Ok(())
    }
}

/// Resolve walk-in cart items against the catalog and add them to the cart.
fn add_cart_items(
    db: &Database,
    session: &Session,
    cart: &mut BillingCart,
    items: Vec<FfiCartItem>,
) -> Result<(), SewaError> {
    let org = session.writable_org()?;
    for item in items {
        match item.medicine_id {
            Some(id) => {
                let medicine = db
                    .get_medicine(&id)?
                    .filter(|m| m.org_id == org)
                    .ok_or(SewaError::NotFound(id))?;
                cart.add_inventory_item(&medicine, item.quantity)?;
            }
            None => {
                let description = item
                    .description
                    .ok_or_else(|| SewaError::InvalidInput("Item needs a description".into()))?;
                let unit_price = item
                    .unit_price
                    .ok_or_else(|| SewaError::InvalidInput("Item needs a price".into()))?;
                cart.add_manual_item(description, item.quantity, unit_price)?;
            }
        }
    }
    Ok(())
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe session view.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSession {
    pub username: String,
    pub role: String,
    /// Active organization id, or "ALL" for the cross-org view
    pub organization: String,
    pub permissions: Vec<String>,
    pub fiscal_year: String,
}

impl From<&Session> for FfiSession {
    fn from(session: &Session) -> Self {
        Self {
            username: session.username.clone(),
            role: session.role.as_str().to_string(),
            organization: session.org.to_string(),
            permissions: session
                .permissions
                .iter()
                .map(|cap| cap.as_str().to_string())
                .collect(),
            fiscal_year: session.fiscal_year.clone(),
        }
    }
}

/// FFI-safe patient demographics.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDemographics {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub address: String,
    pub contact: String,
    pub ethnicity: Option<String>,
}

impl From<FfiDemographics> for Demographics {
    fn from(d: FfiDemographics) -> Self {
        Demographics {
            name: d.name,
            age: d.age,
            gender: d.gender,
            address: d.address,
            contact: d.contact,
            ethnicity: d.ethnicity,
        }
    }
}

/// FFI-safe visit summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitSummary {
    pub id: String,
    pub patient_code: String,
    pub department: String,
    pub patient_name: String,
    pub status: String,
    pub prescription_status: String,
    pub has_pending_billables: bool,
    pub version: i64,
}

impl From<&ServiceRecord> for FfiVisitSummary {
    fn from(record: &ServiceRecord) -> Self {
        Self {
            id: record.id.clone(),
            patient_code: record.patient_code.clone(),
            department: record.department.clone(),
            patient_name: record.demographics.name.clone(),
            status: format!("{:?}", record.status),
            prescription_status: format!("{:?}", record.prescription_status),
            has_pending_billables: record.has_pending_billables(),
            version: record.version,
        }
    }
}

/// FFI-safe prescription line.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescriptionItem {
    pub medicine_id: Option<String>,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl From<FfiPrescriptionItem> for PrescriptionItem {
    fn from(item: FfiPrescriptionItem) -> Self {
        PrescriptionItem {
            medicine_id: item.medicine_id,
            name: item.name,
            dosage: item.dosage,
            frequency: item.frequency,
            duration: item.duration,
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

/// FFI-safe lab request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLabRequest {
    pub name: String,
    pub price: f64,
}

/// FFI-safe service request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiServiceRequest {
    pub name: String,
    pub category: String,
    pub price: f64,
}

/// FFI-safe consultation input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConsultationNote {
    pub findings: String,
    pub diagnosis: String,
    pub prescriptions: Vec<FfiPrescriptionItem>,
    pub lab_tests: Vec<FfiLabRequest>,
    pub service_requests: Vec<FfiServiceRequest>,
    /// BS date "YYYY-MM-DD"; when present, a five-dose schedule is attached
    pub exposure_date: Option<String>,
}

impl TryFrom<FfiConsultationNote> for ConsultationNote {
    type Error = SewaError;

    fn try_from(note: FfiConsultationNote) -> Result<Self, Self::Error> {
        let vaccination = note
            .exposure_date
            .map(|date| -> Result<_, SewaError> {
                let start: BsDate = date.parse()?;
                Ok(VaccinationSchedule::essen_regimen(start))
            })
            .transpose()?;

        Ok(ConsultationNote {
            findings: note.findings,
            diagnosis: note.diagnosis,
            prescriptions: note.prescriptions.into_iter().map(Into::into).collect(),
            lab_tests: note
                .lab_tests
                .into_iter()
                .map(|t| LabTest::new(t.name, t.price))
                .collect(),
            service_requests: note
                .service_requests
                .into_iter()
                .map(|r| ServiceRequest::new(r.name, r.category, r.price))
                .collect(),
            vaccination,
        })
    }
}

/// FFI-safe pending bill line.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBillLine {
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub line_total: f64,
}

impl From<&CartLine> for FfiBillLine {
    fn from(line: &CartLine) -> Self {
        Self {
            description: line.description.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total(),
        }
    }
}

/// FFI-safe walk-in cart item. Catalog items carry a medicine id and take
/// name/price from the shelf; free-text items need both fields.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCartItem {
    pub medicine_id: Option<String>,
    pub description: Option<String>,
    pub quantity: u32,
    pub unit_price: Option<f64>,
}

/// FFI-safe medicine.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicine {
    pub id: String,
    pub name: String,
    pub generic_name: Option<String>,
    pub category: String,
    pub batch: Option<String>,
    pub expiry: Option<String>,
    pub unit_price: f64,
    pub stock: i64,
    pub min_stock: i64,
    pub org_id: String,
}

impl From<&Medicine> for FfiMedicine {
    fn from(med: &Medicine) -> Self {
        Self {
            id: med.id.clone(),
            name: med.name.clone(),
            generic_name: med.generic_name.clone(),
            category: med.category.clone(),
            batch: med.batch.clone(),
            expiry: med.expiry.clone(),
            unit_price: med.unit_price,
            stock: med.stock,
            min_stock: med.min_stock,
            org_id: med.org_id.clone(),
        }
    }
}

/// FFI-safe inputs for adding a medicine.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewMedicine {
    pub name: String,
    pub generic_name: Option<String>,
    pub category: String,
    pub batch: Option<String>,
    pub expiry: Option<String>,
    pub unit_price: f64,
    pub initial_stock: i64,
    pub min_stock: i64,
}

/// FFI-safe sale summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSaleSummary {
    pub id: String,
    pub customer_name: String,
    pub total: f64,
    pub line_count: u32,
    pub created_at: String,
}

impl From<&Sale> for FfiSaleSummary {
    fn from(sale: &Sale) -> Self {
        Self {
            id: sale.id.clone(),
            customer_name: sale.customer_name.clone(),
            total: sale.total,
            line_count: sale.lines.len() as u32,
            created_at: sale.created_at.clone(),
        }
    }
}

/// FFI-safe department visit count.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDeptCount {
    pub department: String,
    pub visits: i64,
}

/// FFI-safe inputs for creating an account.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewAccount {
    pub username: String,
    pub password: String,
    pub role: String,
    pub org_id: String,
    pub granted: Vec<String>,
    pub revoked: Vec<String>,
    pub display_name: Option<String>,
}

impl TryFrom<FfiNewAccount> for NewAccount {
    type Error = SewaError;

    fn try_from(account: FfiNewAccount) -> Result<Self, Self::Error> {
        let role = Role::parse(&account.role)
            .ok_or_else(|| SewaError::InvalidInput(format!("Unknown role: {}", account.role)))?;
        let parse_caps = |names: Vec<String>| -> Result<Vec<Capability>, SewaError> {
            names
                .into_iter()
                .map(|name| {
                    Capability::parse(&name).ok_or_else(|| {
                        SewaError::InvalidInput(format!("Unknown capability: {}", name))
                    })
                })
                .collect()
        };

        Ok(NewAccount {
            username: account.username,
            password: account.password,
            role,
            org_id: account.org_id,
            granted: parse_caps(account.granted)?,
            revoked: parse_caps(account.revoked)?,
            display_name: account.display_name,
        })
    }
}

/// FFI-safe user view.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUser {
    pub id: String,
    pub username: String,
    pub role: String,
    pub org_id: String,
    pub display_name: Option<String>,
}

impl From<&User> for FfiUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            org_id: user.org_id.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

/// FFI-safe store configuration.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStoreConfig {
    pub store_name: String,
    pub address: String,
    pub currency: String,
    pub tax_rate: f64,
    pub fiscal_year: String,
}

impl From<&StoreConfig> for FfiStoreConfig {
    fn from(config: &StoreConfig) -> Self {
        Self {
            store_name: config.store_name.clone(),
            address: config.address.clone(),
            currency: config.currency.clone(),
            tax_rate: config.tax_rate,
            fiscal_year: config.fiscal_year.clone(),
        }
    }
}

impl From<FfiStoreConfig> for StoreConfig {
    fn from(config: FfiStoreConfig) -> Self {
        StoreConfig {
            store_name: config.store_name,
            address: config.address,
            currency: config.currency,
            tax_rate: config.tax_rate,
            fiscal_year: config.fiscal_year,
        }
    }
}
