//! Demo en memoria: un siniestro aprobado recorre todo el workflow.
use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use log::info;
use steps_claims::{provision_claim_workflow, Claim, ClaimBook, ClaimContextBuilder, ClaimPriority, CLAIM_WORKFLOW_NAME};
use steps_core::{ContextRegistry, EngineError, InMemoryWorkflowRepository, InstanceSummary, WorkflowService};

use crate::errors::AppError;

/// Devuelve la traza de resúmenes, uno por paso ejecutado.
pub fn run_claim_demo(out: &mut dyn Write) -> Result<Vec<InstanceSummary>, AppError> {
    let repo = InMemoryWorkflowRepository::new();
    provision_claim_workflow(&repo, false)?;

    let book = Arc::new(ClaimBook::new());
    let svc = WorkflowService::new(repo, ContextRegistry::new().with(ClaimContextBuilder::new(book.clone())));

    let incident = NaiveDate::from_ymd_opt(2024, 5, 20).ok_or_else(|| AppError::InvalidInput("incident date".into()))?;
    let claim = Claim::new("1001", "POL-2024-17", "Lucía Gómez", incident, "Rear-end collision, bumper damage", 1850.0)?
        .with_priority(ClaimPriority::High);
    book.insert(claim.clone())?;
    writeln!(out, "{claim}")?;

    let instance = svc.start_instance(CLAIM_WORKFLOW_NAME, claim.subject())?
                      .ok_or_else(|| EngineError::WorkflowNotFound(CLAIM_WORKFLOW_NAME.to_string()))?;
    let mut trace = vec![svc.describe_instance(instance.id)?];
    writeln!(out, "  start -> {}", trace[0])?;

    for status in ["Verified", "Reviewed"] {
        let outcome = svc.update_status(instance.id, status, None)?;
        let summary = svc.describe_instance(outcome.instance.id)?;
        writeln!(out, "  {status} -> {summary}")?;
        trace.push(summary);
    }

    book.update(&claim.id, |c| c.approve_amount(Some(1600.0)))?;
    info!("claim {} approved for 1600.0", claim.claim_number);

    for status in ["Approved", "Payment Issued"] {
        let outcome = svc.update_status(instance.id, status, None)?;
        let summary = svc.describe_instance(outcome.instance.id)?;
        writeln!(out, "  {status} -> {summary}")?;
        trace.push(summary);
    }
    Ok(trace)
}
