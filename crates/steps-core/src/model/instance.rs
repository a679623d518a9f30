//! Instancia en ejecución de un workflow.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Step, StepStatus, SubjectRef};
use crate::graph::WorkflowGraph;

/// Una ejecución de un `Workflow` ligada a un sujeto externo.
///
/// Invariantes:
/// - `current_status` pertenece a `current_step` cuando ambos están fijados.
/// - `completed_at` está fijado sii el step actual es final y el status
///   actual es de completitud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: Uuid,
    pub workflow_id: Uuid,
    /// `None` = todavía no iniciada.
    pub current_step: Option<Uuid>,
    pub current_status: Option<Uuid>,
    pub subject: SubjectRef,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Vista del ciclo de vida derivada del grafo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState<'g> {
    Unstarted,
    Running { step: &'g Step, status: Option<&'g StepStatus> },
    Completed { step: &'g Step, status: &'g StepStatus },
}

impl Instance {
    /// Crea una instancia sin iniciar (sin step actual).
    pub fn new(workflow_id: Uuid, subject: SubjectRef) -> Self {
        Self { id: Uuid::new_v4(),
               workflow_id,
               current_step: None,
               current_status: None,
               subject,
               started_at: Utc::now(),
               completed_at: None }
    }

    pub fn is_started(&self) -> bool {
        self.current_step.is_some()
    }

    /// Resuelve el estado actual contra el grafo del workflow.
    ///
    /// Un step actual que ya no existe en el grafo se trata como no iniciado.
    pub fn state<'g>(&self, graph: &'g WorkflowGraph) -> InstanceState<'g> {
        let Some(step) = self.current_step.and_then(|id| graph.step(id)) else {
            return InstanceState::Unstarted;
        };
        let status = self.current_status.and_then(|id| graph.status(id));
        match status {
            Some(status) if step.is_final && status.is_completion() => InstanceState::Completed { step, status },
            _ => InstanceState::Running { step, status },
        }
    }

    pub fn is_completed(&self, graph: &WorkflowGraph) -> bool {
        matches!(self.state(graph), InstanceState::Completed { .. })
    }

    /// Step y status actuales, si la instancia fue iniciada.
    pub fn position<'g>(&self, graph: &'g WorkflowGraph) -> Option<(&'g Step, Option<&'g StepStatus>)> {
        match self.state(graph) {
            InstanceState::Unstarted => None,
            InstanceState::Running { step, status } => Some((step, status)),
            InstanceState::Completed { step, status } => Some((step, Some(status))),
        }
    }
}
