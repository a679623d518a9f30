//! Ejemplo de dominio: siniestros de seguros gobernados por el workflow
//! "Claim Processing".
pub mod book;
pub mod claim;
pub mod context;
pub mod error;
pub mod provision;

pub use book::ClaimBook;
pub use claim::{Claim, ClaimPriority};
pub use context::{ClaimContextBuilder, CLAIM_SUBJECT_TYPE};
pub use error::DomainError;
pub use provision::{claim_processing_workflow, provision_claim_workflow, ProvisionOutcome, CLAIM_WORKFLOW_NAME};

