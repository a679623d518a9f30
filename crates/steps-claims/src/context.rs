use std::sync::Arc;

use steps_core::{subject_context, Context, ContextBuilder, ContextError};

use crate::ClaimBook;

pub const CLAIM_SUBJECT_TYPE: &str = "claim";

/// Expone cada siniestro como `claim.<campo>` (y sus campos en la raíz).
pub struct ClaimContextBuilder {
    book: Arc<ClaimBook>,
}

impl ClaimContextBuilder {
    pub fn new(book: Arc<ClaimBook>) -> Self {
        Self { book }
    }
}

impl ContextBuilder for ClaimContextBuilder {
    fn type_tag(&self) -> &str {
        CLAIM_SUBJECT_TYPE
    }

    fn build(&self, id: &str) -> Result<Context, ContextError> {
        let claim = self.book
                        .get(id)
                        .ok_or_else(|| ContextError::NotFound(format!("claim {id}")))?;
        let fields = serde_json::to_value(&claim).map_err(|e| ContextError::Unavailable(e.to_string()))?;
        Ok(subject_context(CLAIM_SUBJECT_TYPE, fields))
    }
}
