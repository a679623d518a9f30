use std::sync::Arc;

use chrono::NaiveDate;
use steps_claims::{provision_claim_workflow, Claim, ClaimBook, ClaimContextBuilder, ProvisionOutcome, CLAIM_WORKFLOW_NAME};
use steps_core::{ContextRegistry, InMemoryWorkflowRepository, WorkflowService};

struct Desk {
    book: Arc<ClaimBook>,
    svc: WorkflowService<InMemoryWorkflowRepository>,
}

fn desk() -> Desk {
    let repo = InMemoryWorkflowRepository::new();
    assert_eq!(provision_claim_workflow(&repo, false).unwrap(), ProvisionOutcome::Created);
    let book = Arc::new(ClaimBook::new());
    let contexts = ContextRegistry::new().with(ClaimContextBuilder::new(book.clone()));
    Desk { book,
           svc: WorkflowService::new(repo, contexts) }
}

fn file_claim(desk: &Desk, id: &str) -> Claim {
    let date = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
    let claim = Claim::new(id, "POL-77", "Marta", date, "water damage in kitchen", 2500.0).unwrap();
    desk.book.insert(claim.clone()).unwrap();
    claim
}

fn position(desk: &Desk, id: uuid::Uuid) -> (String, String) {
    let s = desk.svc.describe_instance(id).unwrap();
    (s.step.unwrap_or_default(), s.status.unwrap_or_default())
}

#[test]
fn approved_claim_goes_through_payment() {
    let d = desk();
    let claim = file_claim(&d, "1");
    let inst = d.svc.start_instance(CLAIM_WORKFLOW_NAME, claim.subject()).unwrap().unwrap();
    assert_eq!(position(&d, inst.id), ("Initial Review".into(), "Submitted".into()));

    assert!(d.svc.update_status(inst.id, "Verified", None).unwrap().applied);
    assert_eq!(position(&d, inst.id), ("Claim Review".into(), "In Review".into()));
    assert!(d.svc.update_status(inst.id, "Reviewed", None).unwrap().applied);
    assert_eq!(position(&d, inst.id), ("Claim Approval".into(), "Pending Approval".into()));

    d.book.update("1", |c| c.approve_amount(Some(2000.0))).unwrap();
    assert!(d.svc.update_status(inst.id, "Approved", None).unwrap().applied);
    assert_eq!(position(&d, inst.id), ("Payment Processing".into(), "Ready for Payment".into()));

    let out = d.svc.update_status(inst.id, "Payment Issued", None).unwrap();
    assert!(out.applied);
    assert!(out.instance.completed_at.is_some());
    assert_eq!(position(&d, inst.id), ("Claim Completed".into(), "Completed".into()));
}

#[test]
fn claim_without_approved_amount_skips_payment() {
    let d = desk();
    let claim = file_claim(&d, "2");
    let inst = d.svc.start_instance(CLAIM_WORKFLOW_NAME, claim.subject()).unwrap().unwrap();
    d.svc.update_status(inst.id, "Verified", None).unwrap();
    d.svc.update_status(inst.id, "Reviewed", None).unwrap();

    let out = d.svc.update_status(inst.id, "Rejected", None).unwrap();
    assert!(out.applied);
    let summary = d.svc.describe_instance(inst.id).unwrap();
    assert_eq!(summary.step.as_deref(), Some("Claim Completed"));
    assert!(summary.completed);
}

#[test]
fn zero_amount_counts_as_rejection() {
    let d = desk();
    let claim = file_claim(&d, "3");
    let inst = d.svc.start_instance(CLAIM_WORKFLOW_NAME, claim.subject()).unwrap().unwrap();
    d.svc.update_status(inst.id, "Verified", None).unwrap();
    d.svc.update_status(inst.id, "Reviewed", None).unwrap();
    d.book.update("3", |c| c.approve_amount(Some(0.0))).unwrap();

    d.svc.update_status(inst.id, "Approved", None).unwrap();
    assert_eq!(position(&d, inst.id).0, "Claim Completed");
}

#[test]
fn hold_resume_and_cancel() {
    let d = desk();
    let claim = file_claim(&d, "4");
    let inst = d.svc.start_instance(CLAIM_WORKFLOW_NAME, claim.subject()).unwrap().unwrap();

    assert!(d.svc.hold_instance(inst.id).unwrap().applied);
    assert_eq!(position(&d, inst.id).1, "On Hold");
    assert!(d.svc.resume_instance(inst.id).unwrap().applied);
    assert_eq!(position(&d, inst.id).1, "Submitted");

    let out = d.svc.cancel_instance(inst.id).unwrap();
    assert!(out.applied);
    assert!(out.instance.completed_at.is_some());
    assert_eq!(position(&d, inst.id), ("Claim Completed".into(), "Cancelled".into()));
    assert!(!d.svc.cancel_instance(inst.id).unwrap().applied);
}

#[test]
fn provisioning_is_idempotent_unless_forced() {
    let d = desk();
    let repo = d.svc.repository();
    assert_eq!(provision_claim_workflow(repo, false).unwrap(), ProvisionOutcome::Skipped);
    assert_eq!(provision_claim_workflow(repo, true).unwrap(), ProvisionOutcome::Recreated);

    let claim = file_claim(&d, "5");
    d.svc.start_instance(CLAIM_WORKFLOW_NAME, claim.subject()).unwrap().unwrap();
    // con instancias vivas no se puede recrear
    assert!(provision_claim_workflow(repo, true).is_err());
    assert_eq!(provision_claim_workflow(repo, false).unwrap(), ProvisionOutcome::Skipped);
}

#[test]
fn missing_claim_data_blocks_conditional_branches() {
    let d = desk();
    // sujeto sin registro en el libro: el contexto queda vacío
    let claim = Claim::new("ghost", "POL-1", "Nadie", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), "n/a", 1.0).unwrap();
    let inst = d.svc.start_instance(CLAIM_WORKFLOW_NAME, claim.subject()).unwrap().unwrap();
    d.svc.update_status(inst.id, "Verified", None).unwrap();
    d.svc.update_status(inst.id, "Reviewed", None).unwrap();

    let out = d.svc.update_status(inst.id, "Approved", None).unwrap();
    assert!(!out.applied);
    assert_eq!(position(&d, inst.id), ("Claim Approval".into(), "Approved".into()));
}
