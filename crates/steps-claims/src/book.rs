//! Libro de siniestros en memoria, compartido con el context builder.
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::{Claim, DomainError};

#[derive(Debug, Default)]
pub struct ClaimBook {
    claims: RwLock<BTreeMap<String, Claim>>,
}

impl ClaimBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, claim: Claim) -> Result<(), DomainError> {
        let mut claims = self.claims
                             .write()
                             .map_err(|_| DomainError::ExternalError("claim book lock poisoned".into()))?;
        if claims.contains_key(&claim.id) {
            return Err(DomainError::ValidationError(format!("claim {} already exists", claim.id)));
        }
        claims.insert(claim.id.clone(), claim);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Claim> {
        self.claims.read().ok()?.get(id).cloned()
    }

    /// Aplica `f` sobre el siniestro `id`.
    pub fn update<F>(&self, id: &str, f: F) -> Result<(), DomainError>
        where F: FnOnce(&mut Claim) -> Result<(), DomainError>
    {
        let mut claims = self.claims
                             .write()
                             .map_err(|_| DomainError::ExternalError("claim book lock poisoned".into()))?;
        let claim = claims.get_mut(id)
                          .ok_or_else(|| DomainError::ValidationError(format!("claim {id} not found")))?;
        f(claim)
    }

    pub fn len(&self) -> usize {
        self.claims.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
