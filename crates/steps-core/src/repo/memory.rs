//! Repositorio en memoria: un mutex serializa las transacciones y cada una
//! trabaja sobre una copia del estado que sólo se publica al confirmar.
use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;
use uuid::Uuid;

use super::types::{RepositoryTx, WorkflowRepository};
use crate::errors::EngineError;
use crate::graph::WorkflowGraph;
use crate::model::{Instance, StatusFlags, StepStatus, SubjectRef};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    workflows: HashMap<Uuid, WorkflowGraph>,
    instances: HashMap<Uuid, Instance>,
}

#[derive(Debug, Default)]
pub struct InMemoryWorkflowRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_count(&self) -> usize {
        self.state.lock().map(|s| s.instances.len()).unwrap_or(0)
    }
}

impl WorkflowRepository for InMemoryWorkflowRepository {
    fn transaction<T, F>(&self, f: F) -> Result<T, EngineError>
        where F: FnOnce(&mut dyn RepositoryTx) -> Result<T, EngineError>
    {
        let mut guard = self.state
                            .lock()
                            .map_err(|_| EngineError::storage("in-memory repository lock poisoned"))?;
        let mut tx = MemoryTx { state: guard.clone() };
        match f(&mut tx) {
            Ok(value) => {
                *guard = tx.state;
                Ok(value)
            }
            Err(e) => {
                debug!("in-memory transaction rolled back: {e}");
                Err(e)
            }
        }
    }
}

struct MemoryTx {
    state: MemoryState,
}

impl MemoryTx {
    fn has_active_duplicate(&self, instance: &Instance) -> bool {
        instance.completed_at.is_none()
        && self.state.instances.values().any(|other| {
                                                other.id != instance.id
                                                && other.completed_at.is_none()
                                                && other.workflow_id == instance.workflow_id
                                                && other.subject == instance.subject
                                            })
    }
}

impl RepositoryTx for MemoryTx {
    fn load_workflow(&mut self, name: &str) -> Result<Option<WorkflowGraph>, EngineError> {
        Ok(self.state.workflows.values().find(|g| g.name() == name).cloned())
    }

    fn load_workflow_by_id(&mut self, id: Uuid) -> Result<Option<WorkflowGraph>, EngineError> {
        Ok(self.state.workflows.get(&id).cloned())
    }

    fn insert_workflow(&mut self, graph: &WorkflowGraph) -> Result<(), EngineError> {
        if self.state.workflows.values().any(|g| g.name() == graph.name()) {
            return Err(EngineError::storage(format!("workflow '{}' already exists", graph.name())));
        }
        if let Err(mut errors) = graph.validate() {
            return Err(EngineError::Validation(errors.remove(0)));
        }
        self.state.workflows.insert(graph.id(), graph.clone());
        Ok(())
    }

    fn delete_workflow(&mut self, id: Uuid) -> Result<bool, EngineError> {
        let Some(graph) = self.state.workflows.get(&id) else {
            return Ok(false);
        };
        if self.state.instances.values().any(|i| i.workflow_id == id) {
            return Err(EngineError::WorkflowInUse(graph.name().to_string()));
        }
        self.state.workflows.remove(&id);
        Ok(true)
    }

    // Las transacciones en memoria ya están serializadas por el mutex.
    fn lock_workflow(&mut self, id: Uuid) -> Result<(), EngineError> {
        if self.state.workflows.contains_key(&id) {
            Ok(())
        } else {
            Err(EngineError::WorkflowNotFound(id.to_string()))
        }
    }

    fn load_instance(&mut self, id: Uuid) -> Result<Option<Instance>, EngineError> {
        Ok(self.state.instances.get(&id).cloned())
    }

    fn insert_instance(&mut self, instance: &Instance) -> Result<(), EngineError> {
        if !self.state.workflows.contains_key(&instance.workflow_id) {
            return Err(EngineError::WorkflowNotFound(instance.workflow_id.to_string()));
        }
        if self.state.instances.contains_key(&instance.id) {
            return Err(EngineError::storage(format!("instance {} already exists", instance.id)));
        }
        if self.has_active_duplicate(instance) {
            return Err(EngineError::storage(format!("active instance already exists for {}", instance.subject)));
        }
        self.state.instances.insert(instance.id, instance.clone());
        Ok(())
    }

    fn save_instance(&mut self, instance: &Instance) -> Result<(), EngineError> {
        if !self.state.instances.contains_key(&instance.id) {
            return Err(EngineError::InstanceNotFound(instance.id));
        }
        if self.has_active_duplicate(instance) {
            return Err(EngineError::storage(format!("active instance already exists for {}", instance.subject)));
        }
        self.state.instances.insert(instance.id, instance.clone());
        Ok(())
    }

    fn create_status(&mut self,
                     step_id: Uuid,
                     name: &str,
                     description: &str,
                     flags: StatusFlags)
                     -> Result<StepStatus, EngineError> {
        let graph = self.state
                        .workflows
                        .values_mut()
                        .find(|g| g.step(step_id).is_some())
                        .ok_or_else(|| EngineError::storage(format!("step {step_id} not found")))?;
        let status = StepStatus { id: Uuid::new_v4(),
                                  step_id,
                                  name: name.to_string(),
                                  description: description.to_string(),
                                  flags };
        graph.insert_status(status.clone())?;
        Ok(status)
    }

    fn find_instances(&mut self,
                      subject: &SubjectRef,
                      workflow_id: Option<Uuid>)
                      -> Result<Vec<Instance>, EngineError> {
        let mut found: Vec<Instance> = self.state
                                           .instances
                                           .values()
                                           .filter(|i| &i.subject == subject)
                                           .filter(|i| workflow_id.map_or(true, |w| i.workflow_id == w))
                                           .cloned()
                                           .collect();
        found.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{StatusSpec, StepSpec};

    fn graph() -> WorkflowGraph {
        let mut g = WorkflowGraph::new("wf", "").unwrap();
        let s = g.add_step(StepSpec::new("only", 1).initial().final_step()).unwrap();
        g.add_status(s, StatusSpec::new("Open").as_default()).unwrap();
        g
    }

    #[test]
    fn rollback_discards_changes() {
        let repo = InMemoryWorkflowRepository::new();
        let g = graph();
        let res: Result<(), EngineError> = repo.transaction(|tx| {
                                                  tx.insert_workflow(&g)?;
                                                  Err(EngineError::storage("boom"))
                                              });
        assert!(res.is_err());
        let loaded = repo.transaction(|tx| tx.load_workflow("wf")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn duplicate_workflow_name_rejected() {
        let repo = InMemoryWorkflowRepository::new();
        repo.transaction(|tx| tx.insert_workflow(&graph())).unwrap();
        let err = repo.transaction(|tx| tx.insert_workflow(&graph())).unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));
    }

    #[test]
    fn workflow_with_instances_cannot_be_deleted() {
        let repo = InMemoryWorkflowRepository::new();
        let g = graph();
        let inst = Instance::new(g.id(), SubjectRef::new("t", "1"));
        repo.transaction(|tx| {
                tx.insert_workflow(&g)?;
                tx.insert_instance(&inst)
            })
            .unwrap();
        let err = repo.transaction(|tx| tx.delete_workflow(g.id())).unwrap_err();
        assert_eq!(err, EngineError::WorkflowInUse("wf".into()));
    }

    #[test]
    fn lock_workflow_requires_existing_workflow() {
        let repo = InMemoryWorkflowRepository::new();
        let g = graph();
        repo.transaction(|tx| tx.insert_workflow(&g)).unwrap();
        assert_eq!(repo.transaction(|tx| tx.lock_workflow(g.id())), Ok(()));
        let missing = Uuid::new_v4();
        assert_eq!(repo.transaction(|tx| tx.lock_workflow(missing)),
                   Err(EngineError::WorkflowNotFound(missing.to_string())));
    }

    #[test]
    fn single_active_instance_per_subject() {
        let repo = InMemoryWorkflowRepository::new();
        let g = graph();
        let subject = SubjectRef::new("t", "1");
        let first = Instance::new(g.id(), subject.clone());
        let second = Instance::new(g.id(), subject.clone());
        repo.transaction(|tx| {
                tx.insert_workflow(&g)?;
                tx.insert_instance(&first)
            })
            .unwrap();
        assert!(repo.transaction(|tx| tx.insert_instance(&second)).is_err());
        assert_eq!(repo.instance_count(), 1);
    }

    #[test]
    fn created_status_lands_in_stored_graph() {
        let repo = InMemoryWorkflowRepository::new();
        let g = graph();
        let step = g.steps()[0].id;
        repo.transaction(|tx| tx.insert_workflow(&g)).unwrap();
        let created = repo.transaction(|tx| tx.create_status(step, "Cancelled", "", StatusFlags::cancellation()))
                          .unwrap();
        let stored = repo.transaction(|tx| tx.load_workflow_by_id(g.id())).unwrap().unwrap();
        assert_eq!(stored.cancellation_status(step).map(|s| s.id), Some(created.id));
    }
}
