//! Especificaciones de autoría: datos de entrada para `WorkflowGraph::add_*`.
use uuid::Uuid;

use crate::model::StatusFlags;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSpec {
    pub name: String,
    pub description: String,
    pub order: i32,
    pub is_initial: bool,
    pub is_final: bool,
}

impl StepSpec {
    pub fn new(name: impl Into<String>, order: i32) -> Self {
        Self { name: name.into(),
               description: String::new(),
               order,
               is_initial: false,
               is_final: false }
    }

    pub fn initial(mut self) -> Self {
        self.is_initial = true;
        self
    }

    pub fn final_step(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSpec {
    pub name: String,
    pub description: String,
    pub flags: StatusFlags,
}

impl StatusSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               description: String::new(),
               flags: StatusFlags::default() }
    }

    pub fn as_default(mut self) -> Self {
        self.flags.is_default = true;
        self
    }

    pub fn as_completion(mut self) -> Self {
        self.flags.is_completion = true;
        self
    }

    pub fn as_cancellation(mut self) -> Self {
        self.flags.is_cancellation = true;
        self
    }

    pub fn as_on_hold(mut self) -> Self {
        self.flags.is_on_hold = true;
        self
    }

    pub fn with_flags(mut self, flags: StatusFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionSpec {
    pub from_step: Uuid,
    pub to_step: Uuid,
    pub condition: String,
    pub priority: i32,
    pub description: String,
}

impl TransitionSpec {
    /// Transición incondicional con prioridad 0.
    pub fn new(from_step: Uuid, to_step: Uuid) -> Self {
        Self { from_step,
               to_step,
               condition: String::new(),
               priority: 0,
               description: String::new() }
    }

    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
