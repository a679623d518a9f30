//! Errores del lenguaje de guards.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// La condición no es una expresión válida. `col` es 1-based.
    #[error("syntax error at column {col}: {message}")]
    Syntax { col: usize, message: String },
    /// Campo inexistente, tipos incompatibles o resultado no booleano.
    #[error("evaluation error: {0}")]
    Evaluation(String),
}

impl ExprError {
    pub(crate) fn syntax(col: usize, message: impl Into<String>) -> Self {
        Self::Syntax { col, message: message.into() }
    }

    pub(crate) fn eval(message: impl Into<String>) -> Self {
        Self::Evaluation(message.into())
    }
}

pub type ExprResult<T> = Result<T, ExprError>;
