//! Restricciones duras del grafo, verificadas en tiempo de autoría.
use std::collections::{HashMap, HashSet};

use thiserror::Error;
use uuid::Uuid;

use super::WorkflowGraph;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("workflow name must not be empty")]
    EmptyWorkflowName,
    #[error("step name must not be empty")]
    EmptyStepName,
    #[error("status name must not be empty (step '{step}')")]
    EmptyStatusName { step: String },
    #[error("duplicate step order {order} in workflow '{workflow}'")]
    DuplicateStepOrder { workflow: String, order: i32 },
    #[error("step '{step}' already has a status named '{name}'")]
    DuplicateStatusName { step: String, name: String },
    #[error("step '{step}' already has a default status")]
    DuplicateDefaultStatus { step: String },
    #[error("step '{step}' already has a cancellation status")]
    DuplicateCancellationStatus { step: String },
    #[error("step '{step}' already has an on-hold status")]
    DuplicateOnHoldStatus { step: String },
    #[error("duplicate transition priority {priority} from '{from}' to '{to}'")]
    DuplicateTransitionPriority { from: String, to: String, priority: i32 },
    #[error("unknown step {0}")]
    UnknownStep(Uuid),
    #[error("step {0} belongs to another workflow")]
    ForeignStep(Uuid),
}

/// Verifica que un status nuevo con `flags`/`name` puede añadirse al step.
pub(crate) fn check_status_slot(graph: &WorkflowGraph,
                                step_id: Uuid,
                                name: &str,
                                flags: &crate::model::StatusFlags)
                                -> Result<(), ValidationError> {
    let step = graph.step(step_id).ok_or(ValidationError::UnknownStep(step_id))?;
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyStatusName { step: step.name.clone() });
    }
    let existing = graph.statuses_of(step_id);
    if existing.iter().any(|s| s.name == name) {
        return Err(ValidationError::DuplicateStatusName { step: step.name.clone(),
                                                          name: name.to_string() });
    }
    if flags.is_default && existing.iter().any(|s| s.is_default()) {
        return Err(ValidationError::DuplicateDefaultStatus { step: step.name.clone() });
    }
    if flags.is_cancellation && existing.iter().any(|s| s.is_cancellation()) {
        return Err(ValidationError::DuplicateCancellationStatus { step: step.name.clone() });
    }
    if flags.is_on_hold && existing.iter().any(|s| s.is_on_hold()) {
        return Err(ValidationError::DuplicateOnHoldStatus { step: step.name.clone() });
    }
    Ok(())
}

/// Revisa todas las restricciones de un grafo ensamblado externamente.
/// Devuelve todas las violaciones encontradas, no sólo la primera.
pub(crate) fn validate_graph(graph: &WorkflowGraph) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let workflow = graph.workflow();
    if workflow.name.trim().is_empty() {
        errors.push(ValidationError::EmptyWorkflowName);
    }

    let mut orders = HashSet::new();
    for step in graph.steps() {
        if step.workflow_id != workflow.id {
            errors.push(ValidationError::ForeignStep(step.id));
        }
        if step.name.trim().is_empty() {
            errors.push(ValidationError::EmptyStepName);
        }
        if !orders.insert(step.order) {
            errors.push(ValidationError::DuplicateStepOrder { workflow: workflow.name.clone(),
                                                              order: step.order });
        }
    }

    let mut per_step: HashMap<Uuid, Vec<&crate::model::StepStatus>> = HashMap::new();
    for status in graph.statuses() {
        per_step.entry(status.step_id).or_default().push(status);
    }
    for (step_id, statuses) in per_step {
        let Some(step) = graph.step(step_id) else {
            errors.push(ValidationError::UnknownStep(step_id));
            continue;
        };
        let mut names = HashSet::new();
        for s in &statuses {
            if s.name.trim().is_empty() {
                errors.push(ValidationError::EmptyStatusName { step: step.name.clone() });
            }
            if !names.insert(s.name.as_str()) {
                errors.push(ValidationError::DuplicateStatusName { step: step.name.clone(),
                                                                   name: s.name.clone() });
            }
        }
        if statuses.iter().filter(|s| s.is_default()).count() > 1 {
            errors.push(ValidationError::DuplicateDefaultStatus { step: step.name.clone() });
        }
        if statuses.iter().filter(|s| s.is_cancellation()).count() > 1 {
            errors.push(ValidationError::DuplicateCancellationStatus { step: step.name.clone() });
        }
        if statuses.iter().filter(|s| s.is_on_hold()).count() > 1 {
            errors.push(ValidationError::DuplicateOnHoldStatus { step: step.name.clone() });
        }
    }

    let mut edges = HashSet::new();
    for t in graph.transitions() {
        let endpoints = [t.from_step, t.to_step];
        let mut resolved = true;
        for id in endpoints {
            if graph.step(id).is_none() {
                errors.push(ValidationError::UnknownStep(id));
                resolved = false;
            }
        }
        if !resolved {
            continue;
        }
        if !edges.insert((t.from_step, t.to_step, t.priority)) {
            errors.push(ValidationError::DuplicateTransitionPriority { from: graph.step_name(t.from_step),
                                                                       to: graph.step_name(t.to_step),
                                                                       priority: t.priority });
        }
    }
    errors
}
