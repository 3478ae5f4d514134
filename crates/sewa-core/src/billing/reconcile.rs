//! Pending-request import and transactional bill settlement.

use std::collections::BTreeMap;

use super::{BillingCart, BillingError, BillingResult, CartLine, LineSource};
use crate::db::{
    deduct_stock_conn, get_medicine_conn, get_service_record_conn, insert_sale_conn,
    update_service_record_conn, Database,
};
use crate::models::{
    BillingStatus, LabPaymentStatus, OrgScope, Sale, SaleLine, ServiceRecord,
};

/// Collect every outstanding billable on a record as cart lines.
///
/// Filters strictly on `Pending` sub-statuses; this is what keeps billing
/// exactly-once, because settlement flips every imported line forward.
pub fn pending_lines(record: &ServiceRecord) -> Vec<CartLine> {
    let mut lines = Vec::new();

    for (index, request) in record.service_requests.iter().enumerate() {
        if request.status == BillingStatus::Pending {
            lines.push(CartLine {
                source: LineSource::Service {
                    visit_id: record.id.clone(),
                    index,
                },
                description: request.name.clone(),
                quantity: 1,
                unit_price: request.price,
            });
        }
    }

    for (index, test) in record.lab_tests.iter().enumerate() {
        if test.billing == LabPaymentStatus::Pending {
            lines.push(CartLine {
                source: LineSource::Lab {
                    visit_id: record.id.clone(),
                    index,
                },
                description: test.name.clone(),
                quantity: 1,
                unit_price: test.price,
            });
        }
    }

    if record.prescription_status == BillingStatus::Pending {
        for item in &record.prescriptions {
            lines.push(CartLine {
                source: LineSource::Prescription {
                    visit_id: record.id.clone(),
                    medicine_id: item.medicine_id.clone(),
                },
                description: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }
    }

    lines
}

/// The billing desk: imports pending requests and settles carts.
pub struct BillingDesk<'a> {
    db: &'a mut Database,
}

impl<'a> BillingDesk<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    /// Outstanding billables for a visit, ready to drop into a cart.
    pub fn import_pending(&self, visit_id: &str) -> BillingResult<Vec<CartLine>> {
        let record = self
            .db
            .get_service_record(visit_id)?
            .ok_or_else(|| BillingError::VisitNotFound(visit_id.to_string()))?;
        Ok(pending_lines(&record))
    }

    /// Settle a cart: create the sale, deduct stock, mark imported sub-items
    /// billed. All of it commits or none of it does.
    pub fn settle(
        &mut self,
        cart: &BillingCart,
        scope: &OrgScope,
        customer: &str,
    ) -> BillingResult<Sale> {
        let org = scope
            .org_id()
            .ok_or(BillingError::AmbiguousOrganization)?
            .to_string();
        if cart.is_empty() {
            return Err(BillingError::EmptyCart);
        }

        let tx = self.db.transaction()?;

        let sale_lines: Vec<SaleLine> = cart
            .lines()
            .iter()
            .map(|line| SaleLine {
                medicine_id: line.medicine_id().map(Into::into),
                visit_id: line.visit_id().map(Into::into),
                description: line.description.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();
        let sale = Sale::new(org.clone(), customer.to_string(), sale_lines);
        insert_sale_conn(&tx, &sale)?;

        for line in cart.lines() {
            let Some(medicine_id) = line.medicine_id() else {
                continue;
            };
            if get_medicine_conn(&tx, medicine_id)?.is_none() {
                return Err(BillingError::UnknownItem(line.description.clone()));
            }
            if !deduct_stock_conn(&tx, medicine_id, &org, line.quantity as i64)? {
                return Err(BillingError::InsufficientStock(line.description.clone()));
            }
        }

        let mut by_visit: BTreeMap<&str, Vec<&CartLine>> = BTreeMap::new();
        for line in cart.lines() {
            if let Some(visit_id) = line.visit_id() {
                by_visit.entry(visit_id).or_default().push(line);
            }
        }

        for (visit_id, lines) in by_visit {
            let mut record = get_service_record_conn(&tx, visit_id)?
                .ok_or_else(|| BillingError::VisitNotFound(visit_id.to_string()))?;
            if record.org_id != org {
                return Err(BillingError::OrgMismatch(visit_id.to_string()));
            }

            // Several prescription lines settle the one record-level status,
            // so the whole prescription moves forward at most once per cart.
            if lines
                .iter()
                .any(|l| matches!(l.source, LineSource::Prescription { .. }))
            {
                if record.prescription_status == BillingStatus::Billed {
                    return Err(BillingError::AlreadyBilled(format!(
                        "prescription of {}",
                        record.patient_code
                    )));
                }
                record.prescription_status = BillingStatus::Billed;
            }

            for line in lines {
                mark_settled(&mut record, line)?;
            }
            update_service_record_conn(&tx, &record)?;
        }

        tx.commit().map_err(crate::db::DbError::from)?;
        Ok(sale)
    }
}

/// Flip one imported sub-item forward, refusing a second settlement.
fn mark_settled(record: &mut ServiceRecord, line: &CartLine) -> BillingResult<()> {
    match &line.source {
        LineSource::Lab { index, .. } => {
            let test = record
                .lab_tests
                .get_mut(*index)
                .ok_or_else(|| BillingError::UnknownItem(line.description.clone()))?;
            if test.billing == LabPaymentStatus::Paid {
                return Err(BillingError::AlreadyBilled(test.name.clone()));
            }
            test.billing = LabPaymentStatus::Paid;
        }
        LineSource::Service { index, .. } => {
            let request = record
                .service_requests
                .get_mut(*index)
                .ok_or_else(|| BillingError::UnknownItem(line.description.clone()))?;
            if request.status == BillingStatus::Billed {
                return Err(BillingError::AlreadyBilled(request.name.clone()));
            }
            request.status = BillingStatus::Billed;
        }
        LineSource::Prescription { .. } | LineSource::Inventory { .. } | LineSource::Manual => {}
    }
    Ok(())
}
