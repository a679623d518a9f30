use steps_claims::DomainError;
use steps_core::EngineError;
use steps_persistence::PersistenceError;
use thiserror::Error;

/// Errores de la aplicación de línea de comandos.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),
    /// La operación era válida pero no cambió la instancia.
    #[error("Operación no aplicada: {0}")]
    NotApplied(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Código de salida del proceso: 2 entrada inválida, 4 no encontrado o no aplicado,
    /// 5 configuración o almacenamiento, 1 el resto.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::InvalidInput(_) | AppError::Json(_) => 2,
            AppError::NotApplied(_)
            | AppError::Engine(EngineError::InstanceNotFound(_))
            | AppError::Engine(EngineError::WorkflowNotFound(_)) => 4,
            AppError::Config(_) | AppError::Persistence(_) | AppError::Engine(EngineError::Storage(_)) => 5,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn exit_codes_by_kind() {
        assert_eq!(AppError::InvalidInput("x".into()).exit_code(), 2);
        assert_eq!(AppError::from(EngineError::InstanceNotFound(Uuid::nil())).exit_code(), 4);
        assert_eq!(AppError::NotApplied("hold".into()).exit_code(), 4);
        assert_eq!(AppError::Config("sin url".into()).exit_code(), 5);
        assert_eq!(AppError::from(EngineError::configuration("no initial step")).exit_code(), 1);
    }

    #[test]
    fn config_variant_format() {
        let err = AppError::Config("mala configuración".into());
        assert_eq!(err.to_string(), "Error de configuración: mala configuración");
    }
}
