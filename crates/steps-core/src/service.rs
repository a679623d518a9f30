//! Capa de servicio: cada operación pública corre en una sola transacción.
use std::fmt;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::context::{Context, ContextRegistry};
use crate::engine::InstanceMachine;
use crate::errors::EngineError;
use crate::expr::{ConditionEvaluator, GuardEvaluator};
use crate::graph::WorkflowGraph;
use crate::model::{Instance, SubjectRef};
use crate::repo::{RepositoryTx, WorkflowRepository};

/// Resultado de una operación mutante: si se aplicó y la instancia resultante.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub applied: bool,
    pub instance: Instance,
}

/// Representación legible de una instancia.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceSummary {
    pub instance_id: Uuid,
    pub workflow: String,
    pub subject: SubjectRef,
    pub step: Option<String>,
    pub status: Option<String>,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl fmt::Display for InstanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
               "Instance of '{}' for {} - Step: {} - Status: {}",
               self.workflow,
               self.subject,
               self.step.as_deref().unwrap_or("N/A Step"),
               self.status.as_deref().unwrap_or("N/A Status"))
    }
}

pub struct WorkflowService<R> {
    repo: R,
    evaluator: Box<dyn ConditionEvaluator>,
    contexts: ContextRegistry,
}

impl<R> WorkflowService<R> where R: WorkflowRepository
{
    pub fn new(repo: R, contexts: ContextRegistry) -> Self {
        Self { repo,
               evaluator: Box::new(GuardEvaluator::new()),
               contexts }
    }

    pub fn with_evaluator(mut self, evaluator: impl ConditionEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Crea e inicia una instancia. Si ya hay una activa para el sujeto la
    /// devuelve sin crear otra; `None` si el workflow no existe.
    pub fn start_instance(&self, workflow_name: &str, subject: SubjectRef) -> Result<Option<Instance>, EngineError> {
        self.repo.transaction(|tx| {
                     let Some(mut graph) = tx.load_workflow(workflow_name)? else {
                         warn!("workflow '{workflow_name}' not found");
                         return Ok(None);
                     };
                     // en read committed la consulta siguiente ya ve el arranque
                     // que tuviera el lock antes que nosotros
                     tx.lock_workflow(graph.id())?;
                     let existing = tx.find_instances(&subject, Some(graph.id()))?;
                     if let Some(active) = existing.into_iter().find(|i| i.completed_at.is_none()) {
                         warn!("active instance {} of '{workflow_name}' already exists for {subject}", active.id);
                         return Ok(Some(active));
                     }
                     let mut instance = Instance::new(graph.id(), subject.clone());
                     tx.insert_instance(&instance)?;
                     let mut machine = InstanceMachine::new(&mut graph, tx, self.evaluator.as_ref(), &self.contexts);
                     if machine.start(&mut instance)? {
                         Ok(Some(instance))
                     } else {
                         Ok(None)
                     }
                 })
    }

    pub fn update_status(&self,
                         instance_id: Uuid,
                         status_name: &str,
                         context: Option<Context>)
                         -> Result<Outcome, EngineError> {
        self.run(instance_id, |machine, instance| machine.update_status(instance, status_name, context))
    }

    pub fn cancel_instance(&self, instance_id: Uuid) -> Result<Outcome, EngineError> {
        self.run(instance_id, |machine, instance| machine.cancel(instance))
    }

    pub fn hold_instance(&self, instance_id: Uuid) -> Result<Outcome, EngineError> {
        self.run(instance_id, |machine, instance| machine.set_on_hold(instance))
    }

    pub fn resume_instance(&self, instance_id: Uuid) -> Result<Outcome, EngineError> {
        self.run(instance_id, |machine, instance| machine.resume(instance))
    }

    /// Instancia más reciente del sujeto, opcionalmente filtrada por workflow.
    pub fn find_instance(&self,
                         subject: &SubjectRef,
                         workflow_name: Option<&str>)
                         -> Result<Option<Instance>, EngineError> {
        self.repo.transaction(|tx| {
                     let workflow_id = match workflow_name {
                         Some(name) => match tx.load_workflow(name)? {
                             Some(graph) => Some(graph.id()),
                             None => return Ok(None),
                         },
                         None => None,
                     };
                     Ok(tx.find_instances(subject, workflow_id)?.into_iter().next())
                 })
    }

    pub fn describe_instance(&self, instance_id: Uuid) -> Result<InstanceSummary, EngineError> {
        self.repo.transaction(|tx| {
                     let (instance, graph) = load(tx, instance_id)?;
                     let position = instance.position(&graph);
                     Ok(InstanceSummary { instance_id: instance.id,
                                          workflow: graph.name().to_string(),
                                          subject: instance.subject.clone(),
                                          step: position.map(|(step, _)| step.name.clone()),
                                          status: position.and_then(|(_, status)| status.map(|s| s.name.clone())),
                                          completed: instance.is_completed(&graph),
                                          started_at: instance.started_at,
                                          completed_at: instance.completed_at })
                 })
    }

    /// `true` si salir del step actual depende de guards y no hay builder
    /// para el tipo de sujeto: sin contexto explícito ningún guard hará match.
    pub fn needs_explicit_context(&self, instance_id: Uuid) -> Result<bool, EngineError> {
        self.repo.transaction(|tx| {
                     let (instance, graph) = load(tx, instance_id)?;
                     if self.contexts.has_builder(&instance.subject.type_tag) {
                         return Ok(false);
                     }
                     let Some(step_id) = instance.current_step else {
                         return Ok(false);
                     };
                     Ok(graph.outgoing_transitions(step_id).iter().any(|t| !t.is_unconditional()))
                 })
    }

    fn run<F>(&self, instance_id: Uuid, op: F) -> Result<Outcome, EngineError>
        where F: FnOnce(&mut InstanceMachine<'_>, &mut Instance) -> Result<bool, EngineError>
    {
        self.repo.transaction(|tx| {
                     let (mut instance, mut graph) = load(tx, instance_id)?;
                     let mut machine = InstanceMachine::new(&mut graph, tx, self.evaluator.as_ref(), &self.contexts);
                     let applied = op(&mut machine, &mut instance)?;
                     if applied {
                         info!("operation applied to instance {instance_id}");
                     }
                     Ok(Outcome { applied, instance })
                 })
    }
}

fn load(tx: &mut dyn RepositoryTx, instance_id: Uuid) -> Result<(Instance, WorkflowGraph), EngineError> {
    let instance = tx.load_instance(instance_id)?
                     .ok_or(EngineError::InstanceNotFound(instance_id))?;
    let graph = tx.load_workflow_by_id(instance.workflow_id)?
                  .ok_or_else(|| EngineError::WorkflowNotFound(instance.workflow_id.to_string()))?;
    Ok((instance, graph))
}
