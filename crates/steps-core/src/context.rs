//! Construcción del contexto que consumen los guards.
//!
//! Un `ContextBuilder` sabe leer un tipo de sujeto externo; el
//! `ContextRegistry` los indexa por `type_tag` y nunca falla: si no hay
//! builder o éste devuelve error, se registra un warning y se usa un mapa
//! vacío (los guards que dependan de campos simplemente no harán match).
use std::collections::HashMap;

use log::{debug, warn};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::SubjectRef;

/// Snapshot de sólo lectura del sujeto.
pub type Context = Map<String, Value>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("subject not found: {0}")]
    NotFound(String),
    #[error("subject data unavailable: {0}")]
    Unavailable(String),
}

pub trait ContextBuilder: Send + Sync {
    /// Tipo de sujeto que sabe resolver.
    fn type_tag(&self) -> &str;
    fn build(&self, id: &str) -> Result<Context, ContextError>;
}

/// Adapta una closure a `ContextBuilder`.
pub struct FnContextBuilder<F> {
    type_tag: String,
    f: F,
}

impl<F> FnContextBuilder<F> where F: Fn(&str) -> Result<Context, ContextError> + Send + Sync
{
    pub fn new(type_tag: impl Into<String>, f: F) -> Self {
        Self { type_tag: type_tag.into(),
               f }
    }
}

impl<F> ContextBuilder for FnContextBuilder<F> where F: Fn(&str) -> Result<Context, ContextError> + Send + Sync
{
    fn type_tag(&self) -> &str {
        &self.type_tag
    }

    fn build(&self, id: &str) -> Result<Context, ContextError> {
        (self.f)(id)
    }
}

#[derive(Default)]
pub struct ContextRegistry {
    builders: HashMap<String, Box<dyn ContextBuilder>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra (o reemplaza) el builder de su `type_tag`.
    pub fn register(&mut self, builder: Box<dyn ContextBuilder>) {
        let tag = builder.type_tag().to_string();
        if self.builders.insert(tag.clone(), builder).is_some() {
            debug!("context builder for '{tag}' replaced");
        }
    }

    pub fn with(mut self, builder: impl ContextBuilder + 'static) -> Self {
        self.register(Box::new(builder));
        self
    }

    pub fn has_builder(&self, type_tag: &str) -> bool {
        self.builders.contains_key(type_tag)
    }

    pub fn build(&self, subject: &SubjectRef) -> Context {
        let Some(builder) = self.builders.get(&subject.type_tag) else {
            warn!("no context builder registered for subject type '{}'", subject.type_tag);
            return Context::new();
        };
        match builder.build(&subject.id) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("could not build context for {subject}: {e}");
                Context::new()
            }
        }
    }
}

/// Contexto estándar de un sujeto: sus campos (sin `id`) en la raíz y además
/// bajo la clave `type_tag`, para permitir tanto `amount` como `claim.amount`.
pub fn subject_context(type_tag: &str, fields: Value) -> Context {
    let mut flat = match fields {
        Value::Object(map) => map,
        other => {
            warn!("subject '{type_tag}' serialized to a non-object value; ignoring {other}");
            return Context::new();
        }
    };
    flat.remove("id");
    let mut ctx = flat.clone();
    ctx.insert(type_tag.to_string(), Value::Object(flat));
    ctx
}
