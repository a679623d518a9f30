//! Nodos y aristas del grafo declarativo.
//!
//! Estos tipos son datos planos: las invariantes entre ellos (un único
//! status por defecto por step, prioridades únicas, etc.) las garantiza
//! `WorkflowGraph` en tiempo de autoría y la base de datos en Postgres.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Definición nombrada de un proceso.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    /// Único en todo el storage.
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Nodo del grafo: una etapa del proceso.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub name: String,
    pub description: String,
    /// Único por workflow.
    pub order: i32,
    pub is_initial: bool,
    pub is_final: bool,
}

/// Flags de un `StepStatus`. Un status puede ser a la vez de cancelación y
/// de completitud.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusFlags {
    pub is_default: bool,
    pub is_completion: bool,
    pub is_cancellation: bool,
    pub is_on_hold: bool,
}

impl StatusFlags {
    pub fn default_status() -> Self {
        Self { is_default: true, ..Self::default() }
    }

    pub fn completion() -> Self {
        Self { is_completion: true, ..Self::default() }
    }

    pub fn on_hold() -> Self {
        Self { is_on_hold: true, ..Self::default() }
    }

    /// Cancelación que además cierra el workflow.
    pub fn cancellation() -> Self {
        Self { is_cancellation: true, is_completion: true, ..Self::default() }
    }
}

/// Sub-estado con nombre dentro de un step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStatus {
    pub id: Uuid,
    pub step_id: Uuid,
    /// Único por step.
    pub name: String,
    pub description: String,
    pub flags: StatusFlags,
}

impl StepStatus {
    pub fn is_default(&self) -> bool {
        self.flags.is_default
    }
    pub fn is_completion(&self) -> bool {
        self.flags.is_completion
    }
    pub fn is_cancellation(&self) -> bool {
        self.flags.is_cancellation
    }
    pub fn is_on_hold(&self) -> bool {
        self.flags.is_on_hold
    }
}

/// Arista dirigida y priorizada entre dos steps del mismo workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub from_step: Uuid,
    pub to_step: Uuid,
    /// Guard condition; vacía (o sólo espacios) = incondicional.
    pub condition: String,
    /// Mayor prioridad se evalúa primero. `(from, to, priority)` es único.
    pub priority: i32,
    pub description: String,
}

impl Transition {
    pub fn is_unconditional(&self) -> bool {
        self.condition.trim().is_empty()
    }
}
