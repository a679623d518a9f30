//! Repositorio de workflows e instancias.
mod memory;
mod types;

pub use memory::InMemoryWorkflowRepository;
pub use types::{RepositoryTx, WorkflowRepository};
