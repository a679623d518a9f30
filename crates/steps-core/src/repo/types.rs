//! Contratos de almacenamiento del motor.
//!
//! Toda operación del state machine ocurre dentro de una única transacción:
//! `WorkflowRepository::transaction` confirma si la closure devuelve `Ok` y
//! deshace todo si devuelve `Err`.
use uuid::Uuid;

use crate::errors::EngineError;
use crate::graph::WorkflowGraph;
use crate::model::{Instance, StatusFlags, StepStatus, SubjectRef};

/// Operaciones disponibles dentro de una transacción abierta.
pub trait RepositoryTx {
    fn load_workflow(&mut self, name: &str) -> Result<Option<WorkflowGraph>, EngineError>;
    fn load_workflow_by_id(&mut self, id: Uuid) -> Result<Option<WorkflowGraph>, EngineError>;
    /// Persiste un grafo completo. Falla si el nombre ya existe.
    fn insert_workflow(&mut self, graph: &WorkflowGraph) -> Result<(), EngineError>;
    /// Borra el workflow y su grafo. `WorkflowInUse` si tiene instancias;
    /// `Ok(false)` si no existía.
    fn delete_workflow(&mut self, id: Uuid) -> Result<bool, EngineError>;
    /// Bloquea el workflow hasta el fin de la transacción: serializa los
    /// arranques concurrentes de instancias. `WorkflowNotFound` si no existe.
    fn lock_workflow(&mut self, id: Uuid) -> Result<(), EngineError>;
    /// Lee la instancia y la bloquea en exclusiva hasta el fin de la transacción.
    fn load_instance(&mut self, id: Uuid) -> Result<Option<Instance>, EngineError>;
    fn insert_instance(&mut self, instance: &Instance) -> Result<(), EngineError>;
    fn save_instance(&mut self, instance: &Instance) -> Result<(), EngineError>;
    /// Crea un status nuevo sobre un step existente.
    fn create_status(&mut self,
                     step_id: Uuid,
                     name: &str,
                     description: &str,
                     flags: StatusFlags)
                     -> Result<StepStatus, EngineError>;
    /// Instancias del sujeto, más recientes primero.
    fn find_instances(&mut self,
                      subject: &SubjectRef,
                      workflow_id: Option<Uuid>)
                      -> Result<Vec<Instance>, EngineError>;
}

pub trait WorkflowRepository {
    fn transaction<T, F>(&self, f: F) -> Result<T, EngineError>
        where F: FnOnce(&mut dyn RepositoryTx) -> Result<T, EngineError>;
}
