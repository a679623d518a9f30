//! steps-core: motor genérico de workflows por pasos.
//!
//! Un `WorkflowGraph` declarativo (steps, statuses, transiciones con guards)
//! y un `InstanceMachine` que hace avanzar instancias ligadas a un sujeto
//! externo. El almacenamiento se abstrae tras `WorkflowRepository`.
pub mod constants;
pub mod context;
pub mod engine;
pub mod errors;
pub mod expr;
pub mod graph;
pub mod model;
pub mod repo;
pub mod service;

pub use context::{subject_context, Context, ContextBuilder, ContextError, ContextRegistry, FnContextBuilder};
pub use engine::InstanceMachine;
pub use errors::EngineError;
pub use expr::{ConditionEvaluator, ExprError, GuardEvaluator};
pub use graph::{StatusSpec, StepSpec, TransitionSpec, ValidationError, WorkflowGraph};
pub use model::{Instance, InstanceState, StatusFlags, Step, StepStatus, SubjectRef, Transition, Workflow};
pub use repo::{InMemoryWorkflowRepository, RepositoryTx, WorkflowRepository};
pub use service::{InstanceSummary, Outcome, WorkflowService};
