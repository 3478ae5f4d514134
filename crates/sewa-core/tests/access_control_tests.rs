//! Access control and facade integration tests.

use sewa_core::{
    open_store_in_memory, FfiCartItem, FfiConsultationNote, FfiDemographics, FfiLabRequest,
    FfiNewAccount, FfiNewMedicine, FfiPrescriptionItem, SewaError,
};

fn demographics(name: &str) -> FfiDemographics {
    FfiDemographics {
        name: name.into(),
        age: 28,
        gender: "F".into(),
        address: "Itahari-4".into(),
        contact: "9811111111".into(),
        ethnicity: None,
    }
}

fn plain_note() -> FfiConsultationNote {
    FfiConsultationNote {
        findings: "Fever".into(),
        diagnosis: "Viral fever".into(),
        prescriptions: vec![FfiPrescriptionItem {
            medicine_id: None,
            name: "Paracetamol 500mg".into(),
            dosage: "1 tab".into(),
            frequency: "TDS".into(),
            duration: "5 days".into(),
            quantity: 15,
            unit_price: 2.0,
        }],
        lab_tests: vec![FfiLabRequest {
            name: "CBC".into(),
            price: 400.0,
        }],
        service_requests: vec![],
        exposure_date: None,
    }
}

fn new_medicine(name: &str, stock: i64) -> FfiNewMedicine {
    FfiNewMedicine {
        name: name.into(),
        generic_name: None,
        category: "Tablet".into(),
        batch: None,
        expiry: None,
        unit_price: 10.0,
        initial_stock: stock,
        min_stock: 5,
    }
}

#[test]
fn test_bootstrap_login_and_bad_credentials() {
    let core = open_store_in_memory().unwrap();

    // Fresh store: the seeded administrator can log in
    let session = core.login("admin".into(), "admin123".into()).unwrap();
    assert_eq!(session.role, "super_admin");
    assert_eq!(session.organization, "MAIN");

    core.logout().unwrap();
    let err = core.login("admin".into(), "wrong".into()).unwrap_err();
    assert!(matches!(err, SewaError::InvalidCredentials(_)));
}

#[test]
fn test_operations_require_a_session() {
    let core = open_store_in_memory().unwrap();
    let err = core
        .register_patient("OPD".into(), demographics("Puja"))
        .unwrap_err();
    assert!(matches!(err, SewaError::NotAuthenticated(_)));
}

#[test]
fn test_session_restore_round_trip() {
    let core = open_store_in_memory().unwrap();
    core.login("admin".into(), "admin123".into()).unwrap();
    let blob = core.session_json().unwrap();

    // A new process restores the session without re-authenticating
    let restored = core.restore_session(blob).unwrap();
    assert_eq!(restored.username, "admin");
    assert!(core
        .register_patient("OPD".into(), demographics("Puja"))
        .is_ok());
}

#[test]
fn test_all_scope_disables_writes() {
    // A super admin in the cross-org view is refused every create path until
    // a specific organization is selected again.
    let core = open_store_in_memory().unwrap();
    core.login("admin".into(), "admin123".into()).unwrap();
    core.select_organization(None).unwrap();

    let err = core.add_medicine(new_medicine("ORS", 10)).unwrap_err();
    assert!(matches!(err, SewaError::AmbiguousOrganization(_)));
    let err = core
        .register_patient("OPD".into(), demographics("Puja"))
        .unwrap_err();
    assert!(matches!(err, SewaError::AmbiguousOrganization(_)));

    // Inventory is unchanged: back in MAIN, the search finds nothing
    core.select_organization(Some("MAIN".into())).unwrap();
    assert!(core.search_medicines("ORS".into(), 10).unwrap().is_empty());
}

#[test]
fn test_capability_gate_on_staff_account() {
    let core = open_store_in_memory().unwrap();
    core.login("admin".into(), "admin123".into()).unwrap();

    // A regular user with sales revoked and financial reports granted
    core.create_account(FfiNewAccount {
        username: "kabita".into(),
        password: "pass123".into(),
        role: "user".into(),
        org_id: "MAIN".into(),
        granted: vec!["view_financial_reports".into()],
        revoked: vec!["process_sales".into()],
        display_name: None,
    })
    .unwrap();

    core.logout().unwrap();
    core.login("kabita".into(), "pass123".into()).unwrap();

    // Defaults still apply
    assert!(core
        .register_patient("OPD".into(), demographics("Puja"))
        .is_ok());

    // Revoked capability is denied
    let err = core
        .checkout_sale(Vec::new(), "Walk-in".into())
        .unwrap_err();
    assert!(matches!(err, SewaError::AccessDenied(_)));

    // Granted capability works even though user defaults exclude it
    assert_eq!(
        core.sales_total("2000-01-01".into(), "2999-12-31".into())
            .unwrap(),
        0.0
    );

    // Admin-only surfaces stay closed
    let err = core
        .update_store_config(core.store_config().unwrap())
        .unwrap_err();
    assert!(matches!(err, SewaError::AccessDenied(_)));
}

#[test]
fn test_org_isolation_between_branches() {
    let core = open_store_in_memory().unwrap();
    core.login("admin".into(), "admin123".into()).unwrap();

    core.add_medicine(new_medicine("Paracetamol 500mg", 50))
        .unwrap();
    core.register_patient("OPD".into(), demographics("Puja"))
        .unwrap();

    core.create_account(FfiNewAccount {
        username: "branch".into(),
        password: "pass123".into(),
        role: "sub_admin".into(),
        org_id: "BRANCH-2".into(),
        granted: vec![],
        revoked: vec![],
        display_name: None,
    })
    .unwrap();

    core.logout().unwrap();
    core.login("branch".into(), "pass123".into()).unwrap();

    // The branch sees neither MAIN's inventory nor its patient queue
    assert!(core
        .search_medicines("paracetamol".into(), 10)
        .unwrap()
        .is_empty());
    assert!(core.pending_consultations(None).unwrap().is_empty());

    // And cannot pull MAIN's stock into a sale
    let main_med = {
        core.logout().unwrap();
        core.login("admin".into(), "admin123".into()).unwrap();
        let found = core.search_medicines("paracetamol".into(), 1).unwrap();
        core.logout().unwrap();
        core.login("branch".into(), "pass123".into()).unwrap();
        found.into_iter().next().unwrap()
    };
    let err = core
        .checkout_sale(
            vec![FfiCartItem {
                medicine_id: Some(main_med.id),
                description: None,
                quantity: 1,
                unit_price: None,
            }],
            "Walk-in".into(),
        )
        .unwrap_err();
    assert!(matches!(err, SewaError::NotFound(_)));
}

#[test]
fn test_facade_end_to_end_billing() {
    let core = open_store_in_memory().unwrap();
    core.login("admin".into(), "admin123".into()).unwrap();

    let rev_start = core.revision().unwrap();
    let visit = core
        .register_patient("OPD".into(), demographics("Puja"))
        .unwrap();
    assert_eq!(visit.status, "Pending");

    core.complete_consultation(visit.id.clone(), plain_note())
        .unwrap();

    let lines = core.pending_bill_lines(visit.id.clone()).unwrap();
    assert_eq!(lines.len(), 2);

    let sale = core
        .settle_visit_bill(visit.id.clone(), Vec::new(), "Puja".into())
        .unwrap();
    assert_eq!(sale.total, 15.0 * 2.0 + 400.0);

    assert!(core.pending_bill_lines(visit.id.clone()).unwrap().is_empty());
    let history = core.patient_history(visit.patient_code.clone()).unwrap();
    assert_eq!(history.len(), 1);
    assert!(!history[0].has_pending_billables);

    // Every write moved the change signal forward
    assert!(core.revision().unwrap() > rev_start);
}

#[test]
fn test_facade_exposure_schedule() {
    let core = open_store_in_memory().unwrap();
    core.login("admin".into(), "admin123".into()).unwrap();

    let visit = core
        .register_patient("ARC".into(), demographics("Puja"))
        .unwrap();
    let mut note = plain_note();
    note.exposure_date = Some("2081-03-25".into());
    core.complete_consultation(visit.id.clone(), note).unwrap();

    core.record_vaccine_dose(visit.id.clone(), 0).unwrap();
    let err = core.record_vaccine_dose(visit.id.clone(), 5).unwrap_err();
    assert!(matches!(err, SewaError::InvalidInput(_)));

    // A malformed exposure date is rejected up front
    let mut bad = plain_note();
    bad.exposure_date = Some("2081-13-40".into());
    let err = core.complete_consultation(visit.id, bad).unwrap_err();
    assert!(matches!(err, SewaError::InvalidInput(_)));
}
