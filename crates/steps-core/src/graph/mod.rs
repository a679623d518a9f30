//! Grafo declarativo de un workflow: steps, statuses y transiciones.
//!
//! `WorkflowGraph` es a la vez la API de autoría (las operaciones `add_*`
//! validan cada inserción) y la vista de sólo lectura que usa el state
//! machine. Los backends de persistencia reconstruyen el grafo con
//! `from_parts` y pueden revisarlo con `validate`.
mod spec;
mod validation;

pub use spec::{StatusSpec, StepSpec, TransitionSpec};
pub use validation::ValidationError;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Step, StepStatus, Transition, Workflow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    workflow: Workflow,
    steps: Vec<Step>,
    statuses: Vec<StepStatus>,
    transitions: Vec<Transition>,
}

impl WorkflowGraph {
    /// Nuevo workflow vacío. El nombre no puede estar vacío.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyWorkflowName);
        }
        let workflow = Workflow { id: Uuid::new_v4(),
                                  name,
                                  description: description.into(),
                                  created_at: Utc::now() };
        Ok(Self::from_parts(workflow, Vec::new(), Vec::new(), Vec::new()))
    }

    /// Ensambla un grafo sin validar (p.ej. filas leídas de la base de datos).
    pub fn from_parts(workflow: Workflow,
                      mut steps: Vec<Step>,
                      statuses: Vec<StepStatus>,
                      transitions: Vec<Transition>)
                      -> Self {
        steps.sort_by_key(|s| s.order);
        Self { workflow,
               steps,
               statuses,
               transitions }
    }

    /// Todas las violaciones de las restricciones duras; vacío si el grafo es válido.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let errors = validation::validate_graph(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    // --- autoría -------------------------------------------------------

    pub fn add_step(&mut self, spec: StepSpec) -> Result<Uuid, ValidationError> {
        if spec.name.trim().is_empty() {
            return Err(ValidationError::EmptyStepName);
        }
        if self.steps.iter().any(|s| s.order == spec.order) {
            return Err(ValidationError::DuplicateStepOrder { workflow: self.workflow.name.clone(),
                                                             order: spec.order });
        }
        let step = Step { id: Uuid::new_v4(),
                          workflow_id: self.workflow.id,
                          name: spec.name,
                          description: spec.description,
                          order: spec.order,
                          is_initial: spec.is_initial,
                          is_final: spec.is_final };
        let id = step.id;
        let pos = self.steps.partition_point(|s| s.order < step.order);
        self.steps.insert(pos, step);
        Ok(id)
    }

    pub fn add_status(&mut self, step_id: Uuid, spec: StatusSpec) -> Result<Uuid, ValidationError> {
        validation::check_status_slot(self, step_id, &spec.name, &spec.flags)?;
        let status = StepStatus { id: Uuid::new_v4(),
                                  step_id,
                                  name: spec.name,
                                  description: spec.description,
                                  flags: spec.flags };
        let id = status.id;
        self.statuses.push(status);
        Ok(id)
    }

    /// Inserta un status ya construido (creado por el state machine o leído
    /// del storage), aplicando las mismas restricciones que `add_status`.
    pub fn insert_status(&mut self, status: StepStatus) -> Result<(), ValidationError> {
        validation::check_status_slot(self, status.step_id, &status.name, &status.flags)?;
        self.statuses.push(status);
        Ok(())
    }

    pub fn add_transition(&mut self, spec: TransitionSpec) -> Result<Uuid, ValidationError> {
        for id in [spec.from_step, spec.to_step] {
            if self.step(id).is_none() {
                return Err(ValidationError::UnknownStep(id));
            }
        }
        if self.transitions
               .iter()
               .any(|t| t.from_step == spec.from_step && t.to_step == spec.to_step && t.priority == spec.priority)
        {
            return Err(ValidationError::DuplicateTransitionPriority { from: self.step_name(spec.from_step),
                                                                      to: self.step_name(spec.to_step),
                                                                      priority: spec.priority });
        }
        let transition = Transition { id: Uuid::new_v4(),
                                      workflow_id: self.workflow.id,
                                      from_step: spec.from_step,
                                      to_step: spec.to_step,
                                      condition: spec.condition,
                                      priority: spec.priority,
                                      description: spec.description };
        let id = transition.id;
        self.transitions.push(transition);
        Ok(id)
    }

    // --- lectura -------------------------------------------------------

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn id(&self) -> Uuid {
        self.workflow.id
    }

    pub fn name(&self) -> &str {
        &self.workflow.name
    }

    /// Steps ordenados por `order` ascendente.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn statuses(&self) -> &[StepStatus] {
        &self.statuses
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn step(&self, id: Uuid) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn step_named(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Step inicial de menor `order`. Varios steps iniciales se toleran.
    pub fn initial_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.is_initial)
    }

    /// Step final de menor `order`.
    pub fn final_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.is_final)
    }

    pub fn status(&self, id: Uuid) -> Option<&StepStatus> {
        self.statuses.iter().find(|s| s.id == id)
    }

    pub fn statuses_of(&self, step_id: Uuid) -> Vec<&StepStatus> {
        self.statuses.iter().filter(|s| s.step_id == step_id).collect()
    }

    pub fn status_named(&self, step_id: Uuid, name: &str) -> Option<&StepStatus> {
        self.statuses.iter().find(|s| s.step_id == step_id && s.name == name)
    }

    pub fn default_status(&self, step_id: Uuid) -> Option<&StepStatus> {
        self.statuses.iter().find(|s| s.step_id == step_id && s.is_default())
    }

    pub fn cancellation_status(&self, step_id: Uuid) -> Option<&StepStatus> {
        self.statuses.iter().find(|s| s.step_id == step_id && s.is_cancellation())
    }

    pub fn on_hold_status(&self, step_id: Uuid) -> Option<&StepStatus> {
        self.statuses.iter().find(|s| s.step_id == step_id && s.is_on_hold())
    }

    /// Transiciones salientes en orden de evaluación: prioridad descendente,
    /// luego `order` del step destino, luego id.
    pub fn outgoing_transitions(&self, step_id: Uuid) -> Vec<&Transition> {
        let mut out: Vec<&Transition> = self.transitions.iter().filter(|t| t.from_step == step_id).collect();
        out.sort_by(|a, b| {
               b.priority
                .cmp(&a.priority)
                .then_with(|| self.step_order(a.to_step).cmp(&self.step_order(b.to_step)))
                .then_with(|| a.id.cmp(&b.id))
           });
        out
    }

    fn step_order(&self, id: Uuid) -> i32 {
        self.step(id).map(|s| s.order).unwrap_or(i32::MAX)
    }

    pub(crate) fn step_name(&self, id: Uuid) -> String {
        self.step(id).map(|s| s.name.clone()).unwrap_or_else(|| id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatusFlags;

    fn two_steps() -> (WorkflowGraph, Uuid, Uuid) {
        let mut g = WorkflowGraph::new("wf", "").unwrap();
        let a = g.add_step(StepSpec::new("A", 1).initial()).unwrap();
        let b = g.add_step(StepSpec::new("B", 2).final_step()).unwrap();
        (g, a, b)
    }

    #[test]
    fn empty_name_rejected() {
        assert_eq!(WorkflowGraph::new("  ", "x").unwrap_err(), ValidationError::EmptyWorkflowName);
    }

    #[test]
    fn duplicate_order_rejected() {
        let (mut g, _, _) = two_steps();
        let err = g.add_step(StepSpec::new("C", 2)).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateStepOrder { order: 2, .. }));
    }

    #[test]
    fn steps_kept_sorted_by_order() {
        let mut g = WorkflowGraph::new("wf", "").unwrap();
        g.add_step(StepSpec::new("late", 10)).unwrap();
        g.add_step(StepSpec::new("early", 1)).unwrap();
        let names: Vec<_> = g.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[test]
    fn single_default_per_step() {
        let (mut g, a, _) = two_steps();
        g.add_status(a, StatusSpec::new("Open").as_default()).unwrap();
        let err = g.add_status(a, StatusSpec::new("Other").as_default()).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateDefaultStatus { step: "A".into() });
    }

    #[test]
    fn duplicate_status_name_and_unknown_step() {
        let (mut g, a, _) = two_steps();
        g.add_status(a, StatusSpec::new("Open")).unwrap();
        assert!(matches!(g.add_status(a, StatusSpec::new("Open")),
                         Err(ValidationError::DuplicateStatusName { .. })));
        let ghost = Uuid::new_v4();
        assert_eq!(g.add_status(ghost, StatusSpec::new("x")).unwrap_err(), ValidationError::UnknownStep(ghost));
    }

    #[test]
    fn cancellation_and_on_hold_unique() {
        let (mut g, a, _) = two_steps();
        g.add_status(a, StatusSpec::new("C1").with_flags(StatusFlags::cancellation())).unwrap();
        g.add_status(a, StatusSpec::new("H1").as_on_hold()).unwrap();
        assert!(matches!(g.add_status(a, StatusSpec::new("C2").as_cancellation()),
                         Err(ValidationError::DuplicateCancellationStatus { .. })));
        assert!(matches!(g.add_status(a, StatusSpec::new("H2").as_on_hold()),
                         Err(ValidationError::DuplicateOnHoldStatus { .. })));
        assert_eq!(g.cancellation_status(a).unwrap().name, "C1");
        assert_eq!(g.on_hold_status(a).unwrap().name, "H1");
    }

    #[test]
    fn duplicate_transition_priority_rejected() {
        let (mut g, a, b) = two_steps();
        g.add_transition(TransitionSpec::new(a, b).priority(1)).unwrap();
        g.add_transition(TransitionSpec::new(a, b).priority(2)).unwrap();
        assert!(matches!(g.add_transition(TransitionSpec::new(a, b).priority(1)),
                         Err(ValidationError::DuplicateTransitionPriority { priority: 1, .. })));
    }

    #[test]
    fn outgoing_sorted_by_priority_then_target_order() {
        let mut g = WorkflowGraph::new("wf", "").unwrap();
        let a = g.add_step(StepSpec::new("A", 1).initial()).unwrap();
        let c = g.add_step(StepSpec::new("C", 3)).unwrap();
        let b = g.add_step(StepSpec::new("B", 2)).unwrap();
        g.add_transition(TransitionSpec::new(a, c).priority(0)).unwrap();
        g.add_transition(TransitionSpec::new(a, b).priority(0)).unwrap();
        g.add_transition(TransitionSpec::new(a, c).priority(5)).unwrap();
        let targets: Vec<_> = g.outgoing_transitions(a)
                               .iter()
                               .map(|t| (g.step(t.to_step).unwrap().name.clone(), t.priority))
                               .collect();
        assert_eq!(targets, vec![("C".to_string(), 5), ("B".to_string(), 0), ("C".to_string(), 0)]);
    }

    #[test]
    fn validate_collects_every_violation() {
        let (g, a, _) = two_steps();
        let mut steps = g.steps().to_vec();
        steps[1].order = 1;
        let statuses = vec![StepStatus { id: Uuid::new_v4(),
                                         step_id: a,
                                         name: "x".into(),
                                         description: String::new(),
                                         flags: StatusFlags::default_status() },
                            StepStatus { id: Uuid::new_v4(),
                                         step_id: a,
                                         name: "y".into(),
                                         description: String::new(),
                                         flags: StatusFlags::default_status() },];
        let rebuilt = WorkflowGraph::from_parts(g.workflow().clone(), steps, statuses, Vec::new());
        let errors = rebuilt.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateStepOrder { .. })));
        assert!(errors.contains(&ValidationError::DuplicateDefaultStatus { step: "A".into() }));
    }

    #[test]
    fn initial_and_final_lookup() {
        let (g, a, b) = two_steps();
        assert_eq!(g.initial_step().unwrap().id, a);
        assert_eq!(g.final_step().unwrap().id, b);
        assert!(g.validate().is_ok());
    }
}
