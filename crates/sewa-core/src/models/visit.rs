//! Visit records and their clinical/financial payloads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::VaccinationSchedule;

/// Clinical status of a visit record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VisitStatus {
    /// Registered, awaiting consultation
    Pending,
    /// Consultation finished
    Completed,
    /// Cancelled before consultation
    Cancelled,
}

/// Billing state of a prescription or an ad-hoc service request.
///
/// Moves `Pending -> Billed` exactly once, via bill settlement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BillingStatus {
    Pending,
    Billed,
}

/// Payment state of a lab request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LabPaymentStatus {
    Pending,
    Paid,
}

/// Errors raised by visit state transitions.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Visit has been cancelled")]
    Cancelled,

    #[error("Only a pending visit can be cancelled")]
    NotPending,

    #[error("Consultation has not been completed yet")]
    NotCompleted,

    #[error("No lab test named '{0}' on this visit")]
    UnknownLabTest(String),

    #[error("No vaccination schedule on this visit")]
    NoSchedule,

    #[error("No vaccine dose at day {0}")]
    UnknownDose(u32),
}

/// Patient demographics captured at registration.
///
/// A snapshot, not a patient master record; specialized consultation flows may
/// correct it later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Demographics {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub address: String,
    pub contact: String,
    pub ethnicity: Option<String>,
}

/// A prescribed medicine line.
///
/// Name and price are copied at prescribe time so later inventory edits never
/// rewrite historical bills.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionItem {
    /// Inventory reference, when dispensed from the store's own stock
    pub medicine_id: Option<String>,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl PrescriptionItem {
    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// A requested lab test with its own payment state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabTest {
    pub name: String,
    /// Snapshotted price
    pub price: f64,
    /// Result text, entered after the sample is processed
    pub result: Option<String>,
    pub billing: LabPaymentStatus,
}

impl LabTest {
    pub fn new(name: String, price: f64) -> Self {
        Self {
            name,
            price,
            result: None,
            billing: LabPaymentStatus::Pending,
        }
    }
}

/// An ad-hoc billable procedure or service (X-ray, dressing, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRequest {
    pub name: String,
    pub category: String,
    /// Snapshotted price
    pub price: f64,
    pub status: BillingStatus,
}

impl ServiceRequest {
    pub fn new(name: String, category: String, price: f64) -> Self {
        Self {
            name,
            category,
            price,
            status: BillingStatus::Pending,
        }
    }
}

/// Everything a clinician enters when closing a consultation.
#[derive(Debug, Clone, Default)]
pub struct ConsultationNote {
    pub findings: String,
    pub diagnosis: String,
    pub prescriptions: Vec<PrescriptionItem>,
    pub lab_tests: Vec<LabTest>,
    pub service_requests: Vec<ServiceRequest>,
    /// Present for exposure visits that need a dose schedule
    pub vaccination: Option<VaccinationSchedule>,
}

/// One patient visit to a department.
///
/// Append-only: records are never deleted, and financial sub-statuses only
/// ever move forward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRecord {
    /// Opaque unique id
    pub id: String,
    /// Human-readable code issued from the per-department sequence
    pub patient_code: String,
    pub department: String,
    pub org_id: String,
    pub demographics: Demographics,
    pub status: VisitStatus,
    pub findings: Option<String>,
    pub diagnosis: Option<String>,
    pub prescriptions: Vec<PrescriptionItem>,
    pub lab_tests: Vec<LabTest>,
    pub service_requests: Vec<ServiceRequest>,
    /// Billing state of the prescription as a whole
    pub prescription_status: BillingStatus,
    pub vaccination: Option<VaccinationSchedule>,
    /// Optimistic-concurrency stamp; bumped on every persisted update
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl ServiceRecord {
    /// Create a freshly registered visit.
    pub fn new(
        patient_code: String,
        department: String,
        org_id: String,
        demographics: Demographics,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_code,
            department,
            org_id,
            demographics,
            status: VisitStatus::Pending,
            findings: None,
            diagnosis: None,
            prescriptions: Vec::new(),
            lab_tests: Vec::new(),
            service_requests: Vec::new(),
            // Nothing prescribed yet, so nothing to bill
            prescription_status: BillingStatus::Billed,
            vaccination: None,
            version: 1,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Close (or re-save) the consultation, overwriting the clinical payload.
    ///
    /// Financial sub-statuses survive a re-save: a lab test or service request
    /// that was already settled keeps its state when the incoming list carries
    /// the same entry, and a billed prescription is never reopened.
    pub fn complete_consultation(&mut self, note: ConsultationNote) -> Result<(), TransitionError> {
        if self.status == VisitStatus::Cancelled {
            return Err(TransitionError::Cancelled);
        }

        let mut lab_tests = note.lab_tests;
        for test in &mut lab_tests {
            if let Some(prev) = self.lab_tests.iter().find(|t| t.name == test.name) {
                test.billing = prev.billing;
                if test.result.is_none() {
                    test.result = prev.result.clone();
                }
            }
        }

        let mut service_requests = note.service_requests;
        for request in &mut service_requests {
            if let Some(prev) = self
                .service_requests
                .iter()
                .find(|r| r.name == request.name && r.category == request.category)
            {
                request.status = prev.status;
            }
        }

        if self.prescription_status != BillingStatus::Billed {
            self.prescription_status = if note.prescriptions.is_empty() {
                BillingStatus::Billed
            } else {
                BillingStatus::Pending
            };
        }

        self.findings = Some(note.findings);
        self.diagnosis = Some(note.diagnosis);
        self.prescriptions = note.prescriptions;
        self.lab_tests = lab_tests;
        self.service_requests = service_requests;
        if let Some(schedule) = note.vaccination {
            self.vaccination = Some(schedule);
        }
        self.status = VisitStatus::Completed;
        self.touch();
        Ok(())
    }

    /// Cancel a visit that never reached consultation.
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        if self.status != VisitStatus::Pending {
            return Err(TransitionError::NotPending);
        }
        self.status = VisitStatus::Cancelled;
        self.touch();
        Ok(())
    }

    /// Enter the result text for one lab test.
    ///
    /// Leaves the test's payment state untouched.
    pub fn record_lab_result(
        &mut self,
        test_name: &str,
        result: String,
    ) -> Result<(), TransitionError> {
        if self.status != VisitStatus::Completed {
            return Err(TransitionError::NotCompleted);
        }
        let test = self
            .lab_tests
            .iter_mut()
            .find(|t| t.name == test_name)
            .ok_or_else(|| TransitionError::UnknownLabTest(test_name.to_string()))?;
        test.result = Some(result);
        self.touch();
        Ok(())
    }

    /// Mark a vaccination dose as administered.
    pub fn record_dose_given(&mut self, day_offset: u32) -> Result<(), TransitionError> {
        let schedule = self
            .vaccination
            .as_mut()
            .ok_or(TransitionError::NoSchedule)?;
        if !schedule.mark_given(day_offset) {
            return Err(TransitionError::UnknownDose(day_offset));
        }
        self.touch();
        Ok(())
    }

    /// Whether any sub-item still awaits settlement.
    pub fn has_pending_billables(&self) -> bool {
        self.prescription_status == BillingStatus::Pending
            || self
                .lab_tests
                .iter()
                .any(|t| t.billing == LabPaymentStatus::Pending)
            || self
                .service_requests
                .iter()
                .any(|r| r.status == BillingStatus::Pending)
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}
