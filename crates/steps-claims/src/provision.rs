//! Alta del workflow "Claim Processing".
use log::{info, warn};
use steps_core::{StatusFlags, StatusSpec, StepSpec, TransitionSpec, ValidationError, WorkflowGraph, WorkflowRepository};
use uuid::Uuid;

use crate::DomainError;

pub const CLAIM_WORKFLOW_NAME: &str = "Claim Processing";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    /// Ya existía y no se pidió `force`.
    Skipped,
    Recreated,
}

// (nombre, descripción, flags)
type StatusRow = (&'static str, &'static str, StatusFlags);

fn plain() -> StatusFlags {
    StatusFlags::default()
}

fn cancelled_midway() -> StatusFlags {
    StatusFlags { is_completion: false,
                  ..StatusFlags::cancellation() }
}

fn add_statuses(graph: &mut WorkflowGraph, step: Uuid, rows: &[StatusRow]) -> Result<(), ValidationError> {
    for (name, description, flags) in rows {
        graph.add_status(step, StatusSpec::new(*name).with_flags(*flags).description(*description))?;
    }
    Ok(())
}

/// Construye el grafo completo: cinco steps en línea con una bifurcación
/// en "Claim Approval" según `claim.amount_approved`.
pub fn claim_processing_workflow() -> Result<WorkflowGraph, ValidationError> {
    let mut g = WorkflowGraph::new(CLAIM_WORKFLOW_NAME, "Standard workflow for processing insurance claims")?;

    let initial_review = g.add_step(StepSpec::new("Initial Review", 1).initial()
                                                                      .description("Initial review of the claim by a claims processor"))?;
    let claim_review = g.add_step(StepSpec::new("Claim Review", 2).description("Detailed review by a claims adjuster"))?;
    let claim_approval = g.add_step(StepSpec::new("Claim Approval", 3).description("Final approval by a supervisor"))?;
    let payment = g.add_step(StepSpec::new("Payment Processing", 4).description("Processing payment for approved claims"))?;
    let completed = g.add_step(StepSpec::new("Claim Completed", 5).final_step()
                                                                   .description("Claim has been fully processed and completed"))?;

    add_statuses(&mut g,
                 initial_review,
                 &[("Submitted", "Claim has been submitted", StatusFlags::default_status()),
                   ("Additional Info Needed", "More information is needed from the claimant", plain()),
                   ("Verified", "Claim has been verified and is ready for detailed review", StatusFlags::completion()),
                   ("On Hold", "Claim review is temporarily on hold", StatusFlags::on_hold()),
                   ("Cancelled", "Claim has been cancelled during initial review", cancelled_midway())])?;
    add_statuses(&mut g,
                 claim_review,
                 &[("In Review", "Claim is being reviewed by an adjuster", StatusFlags::default_status()),
                   ("Reviewed", "Claim has been reviewed and is ready for approval", StatusFlags::completion()),
                   ("On Hold", "Claim review is temporarily on hold", StatusFlags::on_hold()),
                   ("Cancelled", "Claim has been cancelled during review", cancelled_midway())])?;
    add_statuses(&mut g,
                 claim_approval,
                 &[("Pending Approval", "Claim is waiting for supervisor approval", StatusFlags::default_status()),
                   ("Approved", "Claim has been approved for payment", StatusFlags::completion()),
                   ("Rejected", "Claim has been rejected", StatusFlags::completion()),
                   ("On Hold", "Claim approval is temporarily on hold", StatusFlags::on_hold()),
                   ("Cancelled", "Claim has been cancelled during approval", cancelled_midway())])?;
    add_statuses(&mut g,
                 payment,
                 &[("Ready for Payment", "Claim is ready for payment processing", StatusFlags::default_status()),
                   ("Payment Issued", "Payment has been issued", StatusFlags::completion()),
                   ("On Hold", "Payment is temporarily on hold", StatusFlags::on_hold()),
                   ("Cancelled", "Payment has been cancelled", cancelled_midway())])?;
    add_statuses(&mut g,
                 completed,
                 &[("Completed",
                    "Claim has been completed successfully",
                    StatusFlags { is_default: true,
                                  ..StatusFlags::completion() }),
                   ("Rejected", "Claim was rejected", StatusFlags::completion()),
                   ("Cancelled", "Claim was cancelled", StatusFlags::cancellation())])?;

    g.add_transition(TransitionSpec::new(initial_review, claim_review).description("Move to detailed review after initial verification"))?;
    g.add_transition(TransitionSpec::new(claim_review, claim_approval).description("Move to approval after adjuster review"))?;
    g.add_transition(TransitionSpec::new(claim_approval, payment).when("claim.amount_approved != null && claim.amount_approved > 0.0")
                                                                 .priority(1)
                                                                 .description("Move to payment processing for approved claims"))?;
    g.add_transition(TransitionSpec::new(claim_approval, completed).when("claim.amount_approved == null || claim.amount_approved == 0.0")
                                                                   .description("Mark as completed (rejected) if no amount is approved"))?;
    g.add_transition(TransitionSpec::new(payment, completed).description("Mark as completed after payment is issued"))?;
    Ok(g)
}

/// Crea el workflow si no existe. Con `force` borra y recrea el existente;
/// falla si éste todavía tiene instancias.
pub fn provision_claim_workflow<R>(repo: &R, force: bool) -> Result<ProvisionOutcome, DomainError>
    where R: WorkflowRepository
{
    let graph = claim_processing_workflow()?;
    let outcome = repo.transaction(|tx| {
                          let existing = tx.load_workflow(CLAIM_WORKFLOW_NAME)?;
                          let outcome = match existing {
                              Some(_) if !force => return Ok(ProvisionOutcome::Skipped),
                              Some(old) => {
                                  warn!("recreating workflow '{CLAIM_WORKFLOW_NAME}' ({})", old.id());
                                  tx.delete_workflow(old.id())?;
                                  ProvisionOutcome::Recreated
                              }
                              None => ProvisionOutcome::Created,
                          };
                          tx.insert_workflow(&graph)?;
                          Ok(outcome)
                      })?;
    info!("workflow '{CLAIM_WORKFLOW_NAME}' provisioning: {outcome:?}");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_is_valid_and_shaped() {
        let g = claim_processing_workflow().unwrap();
        assert!(g.validate().is_ok());
        assert_eq!(g.steps().len(), 5);
        assert_eq!(g.initial_step().unwrap().name, "Initial Review");
        let last = g.final_step().unwrap();
        assert_eq!(last.name, "Claim Completed");
        let cancelled = g.cancellation_status(last.id).unwrap();
        assert!(cancelled.is_completion());

        let approval = g.step_named("Claim Approval").unwrap().id;
        let out = g.outgoing_transitions(approval);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].priority, 1);
        assert_eq!(g.step(out[0].to_step).unwrap().name, "Payment Processing");

        let review = g.step_named("Initial Review").unwrap().id;
        assert!(!g.cancellation_status(review).unwrap().is_completion());
    }
}
