//! Lenguaje de guards: predicados booleanos sobre un contexto de sólo lectura.
//!
//! `ConditionEvaluator` es el punto de extensión; `GuardEvaluator` es la
//! implementación por defecto (lexer + parser propios, ASTs cacheados por
//! texto de condición).
mod errors;
mod eval;
mod lexer;
mod parser;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub use errors::{ExprError, ExprResult};
pub use eval::{evaluate, evaluate_bool};
pub use parser::{BinaryOp, Expr, Literal, Parser};

use crate::context::Context;

/// Una condición vacía o sólo con espacios significa "siempre verdadera".
/// El state machine lo comprueba antes de invocar al evaluador.
pub fn is_blank(condition: &str) -> bool {
    condition.trim().is_empty()
}

/// Estrategia enchufable de evaluación de guards.
pub trait ConditionEvaluator: Send + Sync {
    fn evaluate(&self, condition: &str, context: &Context) -> ExprResult<bool>;
}

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

#[derive(Default)]
struct AstCache {
    entries: HashMap<String, Arc<Expr>>,
    // orden de inserción, para desalojar la más antigua
    order: VecDeque<String>,
}

/// Evaluador por defecto. El grafo cambia poco, así que los ASTs se guardan
/// por texto de condición, hasta `capacity` entradas (FIFO).
pub struct GuardEvaluator {
    cache: Mutex<AstCache>,
    capacity: usize,
}

impl Default for GuardEvaluator {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl GuardEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `capacity` 0 desactiva la caché.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { cache: Mutex::new(AstCache::default()),
               capacity }
    }

    pub fn parse(&self, condition: &str) -> ExprResult<Arc<Expr>> {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(expr) = cache.entries.get(condition) {
            return Ok(Arc::clone(expr));
        }
        let expr = Arc::new(Parser::parse(condition)?);
        if self.capacity == 0 {
            return Ok(expr);
        }
        while cache.entries.len() >= self.capacity {
            let Some(oldest) = cache.order.pop_front() else { break };
            cache.entries.remove(&oldest);
        }
        cache.entries.insert(condition.to_string(), Arc::clone(&expr));
        cache.order.push_back(condition.to_string());
        Ok(expr)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().map(|c| c.entries.len()).unwrap_or(0)
    }
}

impl ConditionEvaluator for GuardEvaluator {
    fn evaluate(&self, condition: &str, context: &Context) -> ExprResult<bool> {
        let expr = self.parse(condition)?;
        evaluate_bool(&expr, context)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn blank_conditions() {
        assert!(is_blank(""));
        assert!(is_blank("  \t\n"));
        assert!(!is_blank("x == 1"));
    }

    #[test]
    fn evaluator_caches_parsed_conditions() {
        let ev = GuardEvaluator::new();
        let ctx = json!({"claim": {"is_high_risk": true}}).as_object().cloned().unwrap();
        assert_eq!(ev.evaluate("claim.is_high_risk == true", &ctx), Ok(true));
        assert_eq!(ev.evaluate("claim.is_high_risk == true", &ctx), Ok(true));
        assert_eq!(ev.evaluate("claim.is_high_risk == false", &ctx), Ok(false));
        assert_eq!(ev.cached_len(), 2);
    }

    #[test]
    fn cache_is_bounded_and_evicts_oldest() {
        let ev = GuardEvaluator::with_capacity(2);
        let ctx = json!({"n": 3}).as_object().cloned().unwrap();
        for cond in ["n == 1", "n == 2", "n == 3"] {
            ev.evaluate(cond, &ctx).unwrap();
        }
        assert_eq!(ev.cached_len(), 2);
        // la expulsada se vuelve a parsear sin problema
        assert_eq!(ev.evaluate("n == 1", &ctx), Ok(false));
        assert_eq!(ev.cached_len(), 2);

        let uncached = GuardEvaluator::with_capacity(0);
        assert_eq!(uncached.evaluate("n == 3", &ctx), Ok(true));
        assert_eq!(uncached.cached_len(), 0);
    }

    #[test]
    fn nested_guards_fail_instead_of_overflowing() {
        let ev = GuardEvaluator::new();
        let nested = format!("{}true{}", "(".repeat(1_000), ")".repeat(1_000));
        assert!(matches!(ev.evaluate(&nested, &Context::new()), Err(ExprError::Syntax { .. })));
        let bangs = format!("{}true", "!".repeat(100_000));
        assert!(matches!(ev.evaluate(&bangs, &Context::new()), Err(ExprError::Syntax { .. })));
    }

    #[test]
    fn syntax_errors_are_not_cached() {
        let ev = GuardEvaluator::new();
        let err = ev.evaluate("claim.amount >", &Context::new()).unwrap_err();
        assert!(matches!(err, ExprError::Syntax { .. }));
        assert_eq!(ev.cached_len(), 0);
    }
}
