//! State machine de una instancia.
//!
//! Cada operación muta la `Instance` en memoria y delega la durabilidad en el
//! `RepositoryTx` abierto por el llamador. Las precondiciones de estado se
//! reportan como `Ok(false)`; un grafo mal configurado produce
//! `Err(EngineError::Configuration)` y el llamador debe deshacer la
//! transacción.
use chrono::Utc;
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::constants::{DEFAULT_CANCELLATION_STATUS_DESCRIPTION, DEFAULT_CANCELLATION_STATUS_NAME};
use crate::context::{Context, ContextRegistry};
use crate::errors::EngineError;
use crate::expr::{is_blank, ConditionEvaluator};
use crate::graph::WorkflowGraph;
use crate::model::{Instance, InstanceState, StatusFlags, StepStatus, Transition};
use crate::repo::RepositoryTx;

pub struct InstanceMachine<'a> {
    graph: &'a mut WorkflowGraph,
    tx: &'a mut dyn RepositoryTx,
    evaluator: &'a dyn ConditionEvaluator,
    contexts: &'a ContextRegistry,
}

impl<'a> InstanceMachine<'a> {
    pub fn new(graph: &'a mut WorkflowGraph,
               tx: &'a mut dyn RepositoryTx,
               evaluator: &'a dyn ConditionEvaluator,
               contexts: &'a ContextRegistry)
               -> Self {
        Self { graph,
               tx,
               evaluator,
               contexts }
    }

    /// Lleva una instancia sin iniciar al step inicial y su status por defecto.
    pub fn start(&mut self, instance: &mut Instance) -> Result<bool, EngineError> {
        self.check_owner(instance)?;
        if instance.is_started() {
            info!("workflow '{}' already started for {}", self.graph.name(), instance.subject);
            return Ok(false);
        }
        let step = self.graph
                       .initial_step()
                       .ok_or_else(|| EngineError::configuration(format!("workflow '{}' has no initial step",
                                                                         self.graph.name())))?;
        let step_id = step.id;
        let status_id = self.default_status_id(step_id)?;
        self.enter(instance, step_id, status_id);
        self.tx.save_instance(instance)?;
        info!("started workflow '{}' for {} at step '{}'",
              self.graph.name(),
              instance.subject,
              self.graph.step_name(step_id));
        Ok(true)
    }

    /// Fija un status del step actual por nombre. Si es de completitud intenta
    /// avanzar; el status queda persistido aunque no haya transición elegible.
    pub fn update_status(&mut self,
                         instance: &mut Instance,
                         status_name: &str,
                         context: Option<Context>)
                         -> Result<bool, EngineError> {
        self.check_owner(instance)?;
        let step_id = match instance.state(self.graph) {
            InstanceState::Unstarted => {
                warn!("cannot update status of unstarted instance {}", instance.id);
                return Ok(false);
            }
            InstanceState::Completed { .. } => {
                warn!("instance {} is already completed", instance.id);
                return Ok(false);
            }
            InstanceState::Running { step, .. } => step.id,
        };
        let Some(status) = self.graph.status_named(step_id, status_name) else {
            warn!("status '{}' does not belong to step '{}'", status_name, self.graph.step_name(step_id));
            return Ok(false);
        };
        let (status_id, is_completion) = (status.id, status.is_completion());
        instance.current_status = Some(status_id);
        self.tx.save_instance(instance)?;
        info!("instance {} status set to '{}'", instance.id, status_name);

        if is_completion {
            return self.advance(instance, context);
        }
        Ok(true)
    }

    fn advance(&mut self, instance: &mut Instance, context: Option<Context>) -> Result<bool, EngineError> {
        let Some(step) = instance.current_step.and_then(|id| self.graph.step(id)) else {
            return Ok(false);
        };
        let (step_id, step_is_final) = (step.id, step.is_final);
        let completion = instance.current_status
                                 .and_then(|id| self.graph.status(id))
                                 .is_some_and(StepStatus::is_completion);

        if step_is_final {
            if completion {
                instance.completed_at = Some(Utc::now());
                self.tx.save_instance(instance)?;
                info!("workflow '{}' completed for {}", self.graph.name(), instance.subject);
                return Ok(true);
            }
            debug!("instance {} is on final step without a completion status", instance.id);
            return Ok(false);
        }

        let transitions: Vec<Transition> = self.graph.outgoing_transitions(step_id).into_iter().cloned().collect();
        let mut context = context.unwrap_or_default();
        if context.is_empty() && transitions.iter().any(|t| !is_blank(&t.condition)) {
            context = self.contexts.build(&instance.subject);
        }

        let Some(chosen) = transitions.iter().find(|t| self.matches(t, &context)) else {
            warn!("no eligible transition from step '{}' for instance {}",
                  self.graph.step_name(step_id),
                  instance.id);
            return Ok(false);
        };
        let target = chosen.to_step;
        let status_id = self.default_status_id(target)?;
        self.enter(instance, target, status_id);
        self.tx.save_instance(instance)?;
        info!("instance {} advanced '{}' -> '{}'",
              instance.id,
              self.graph.step_name(step_id),
              self.graph.step_name(target));
        Ok(true)
    }

    fn matches(&self, transition: &Transition, context: &Context) -> bool {
        if is_blank(&transition.condition) {
            return true;
        }
        match self.evaluator.evaluate(&transition.condition, context) {
            Ok(matched) => {
                debug!("transition {} (priority {}) condition `{}` -> {}",
                       transition.id, transition.priority, transition.condition, matched);
                matched
            }
            Err(e) => {
                error!("error evaluating condition `{}` of transition {}: {e}",
                       transition.condition, transition.id);
                false
            }
        }
    }

    /// Mueve la instancia al step final con un status de cancelación propio
    /// de ese step, creándolo si no existe.
    pub fn cancel(&mut self, instance: &mut Instance) -> Result<bool, EngineError> {
        self.check_owner(instance)?;
        let step_id = match instance.state(self.graph) {
            InstanceState::Completed { .. } => {
                warn!("cannot cancel completed instance {}", instance.id);
                return Ok(false);
            }
            InstanceState::Running { status: Some(status), .. } if status.is_cancellation() => {
                info!("instance {} already in cancellation status", instance.id);
                return Ok(true);
            }
            InstanceState::Unstarted => return Ok(false),
            InstanceState::Running { step, .. } => step.id,
        };
        let final_id = self.graph
                           .final_step()
                           .map(|s| s.id)
                           .ok_or_else(|| EngineError::configuration(format!("workflow '{}' has no final step",
                                                                             self.graph.name())))?;
        let status_id = match self.graph.cancellation_status(final_id) {
            Some(status) if status.is_completion() => status.id,
            Some(status) => {
                return Err(EngineError::configuration(format!("cancellation status '{}' on final step is not a completion status",
                                                              status.name)));
            }
            None => self.create_cancellation_status(final_id)?,
        };
        self.enter(instance, final_id, status_id);
        self.tx.save_instance(instance)?;
        info!("instance {} cancelled from step '{}'", instance.id, self.graph.step_name(step_id));
        Ok(true)
    }

    fn create_cancellation_status(&mut self, final_id: Uuid) -> Result<Uuid, EngineError> {
        let mut name = DEFAULT_CANCELLATION_STATUS_NAME.to_string();
        let mut n = 2;
        while self.graph.status_named(final_id, &name).is_some() {
            name = format!("{DEFAULT_CANCELLATION_STATUS_NAME} ({n})");
            n += 1;
        }
        let status = self.tx.create_status(final_id,
                                           &name,
                                           DEFAULT_CANCELLATION_STATUS_DESCRIPTION,
                                           StatusFlags::cancellation())?;
        let id = status.id;
        self.graph.insert_status(status)?;
        info!("created cancellation status '{}' on final step '{}'", name, self.graph.step_name(final_id));
        Ok(id)
    }

    pub fn set_on_hold(&mut self, instance: &mut Instance) -> Result<bool, EngineError> {
        self.check_owner(instance)?;
        let (step_id, current) = match instance.state(self.graph) {
            InstanceState::Running { step, status } => (step.id, status),
            _ => return Ok(false),
        };
        if current.is_some_and(StepStatus::is_on_hold) {
            debug!("instance {} is already on hold", instance.id);
            return Ok(false);
        }
        let Some(hold) = self.graph.on_hold_status(step_id) else {
            warn!("step '{}' defines no on-hold status", self.graph.step_name(step_id));
            return Ok(false);
        };
        instance.current_status = Some(hold.id);
        self.tx.save_instance(instance)?;
        info!("instance {} put on hold", instance.id);
        Ok(true)
    }

    pub fn resume(&mut self, instance: &mut Instance) -> Result<bool, EngineError> {
        self.check_owner(instance)?;
        let step_id = match instance.state(self.graph) {
            InstanceState::Running { step, status: Some(status) } if status.is_on_hold() => step.id,
            _ => return Ok(false),
        };
        let status_id = self.default_status_id(step_id)?;
        instance.current_status = Some(status_id);
        self.tx.save_instance(instance)?;
        info!("instance {} resumed", instance.id);
        Ok(true)
    }

    fn default_status_id(&self, step_id: Uuid) -> Result<Uuid, EngineError> {
        self.graph
            .default_status(step_id)
            .map(|s| s.id)
            .ok_or_else(|| EngineError::configuration(format!("step '{}' has no default status",
                                                              self.graph.step_name(step_id))))
    }

    /// Fija step + status y mantiene `completed_at` coherente con ambos.
    fn enter(&self, instance: &mut Instance, step_id: Uuid, status_id: Uuid) {
        instance.current_step = Some(step_id);
        instance.current_status = Some(status_id);
        let done = self.graph.step(step_id).is_some_and(|s| s.is_final)
                   && self.graph.status(status_id).is_some_and(StepStatus::is_completion);
        instance.completed_at = if done { Some(Utc::now()) } else { None };
    }

    fn check_owner(&self, instance: &Instance) -> Result<(), EngineError> {
        if instance.workflow_id != self.graph.id() {
            return Err(EngineError::configuration(format!("instance {} does not belong to workflow '{}'",
                                                          instance.id,
                                                          self.graph.name())));
        }
        Ok(())
    }
}
