use std::fmt;

use serde::{Deserialize, Serialize};

/// Referencia opaca a la entidad externa que gobierna una instancia.
///
/// `type_tag` selecciona el `ContextBuilder` registrado para ese tipo;
/// `id` es la clave de la entidad dentro de su propio sistema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
    pub type_tag: String,
    pub id: String,
}

impl SubjectRef {
    pub fn new(type_tag: impl Into<String>, id: impl Into<String>) -> Self {
        Self { type_tag: type_tag.into(), id: id.into() }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_tag, self.id)
    }
}
