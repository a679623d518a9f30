//! Errores específicos del core.
//!
//! Sólo se propagan con `Err` los fallos de configuración y de storage. Las
//! precondiciones de estado (instancia ya completada, status desconocido,
//! ninguna transición elegible) se reportan como `Ok(false)`.

use thiserror::Error;
use uuid::Uuid;

use crate::graph::ValidationError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// El grafo no permite completar la operación (sin step inicial, step
    /// sin status por defecto, sin step final...).
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("workflow instance not found: {0}")]
    InstanceNotFound(Uuid),
    /// Una instancia referencia un workflow que ya no existe en el storage.
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),
    /// Borrar un workflow con instancias está prohibido.
    #[error("workflow '{0}' still has instances")]
    WorkflowInUse(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_variant_format() {
        let err = EngineError::configuration("no initial step");
        assert_eq!(err.to_string(), "configuration error: no initial step");
    }

    #[test]
    fn validation_variant_from() {
        let err: EngineError = ValidationError::EmptyWorkflowName.into();
        assert!(matches!(err, EngineError::Validation(ValidationError::EmptyWorkflowName)));
    }
}
