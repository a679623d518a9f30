//! Modelo de datos del motor: definición declarativa (Workflow, Step,
//! StepStatus, Transition) e instancias en ejecución.

mod instance;
mod subject;
mod workflow;

pub use instance::{Instance, InstanceState};
pub use subject::SubjectRef;
pub use workflow::{StatusFlags, Step, StepStatus, Transition, Workflow};
