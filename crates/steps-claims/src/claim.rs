use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use steps_core::SubjectRef;

use crate::{DomainError, CLAIM_SUBJECT_TYPE};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClaimPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Siniestro de seguros: el sujeto que gobierna el workflow "Claim Processing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub claim_number: String,
    pub policy_number: String,
    pub customer: String,
    pub incident_date: NaiveDate,
    pub description: String,
    pub amount_claimed: f64,
    pub priority: ClaimPriority,
    /// Se fija durante la aprobación; `None` mientras no se decida.
    pub amount_approved: Option<f64>,
    pub adjuster_notes: String,
    pub supervisor_notes: String,
}

impl Claim {
    pub fn new(id: impl Into<String>,
               policy_number: impl Into<String>,
               customer: impl Into<String>,
               incident_date: NaiveDate,
               description: impl Into<String>,
               amount_claimed: f64)
               -> Result<Self, DomainError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(DomainError::ValidationError("claim description must not be empty".to_string()));
        }
        check_amount("amount_claimed", amount_claimed)?;
        let id = id.into();
        let policy_number = policy_number.into();
        Ok(Self { claim_number: format!("CLM-{policy_number}-{id}"),
                  id,
                  policy_number,
                  customer: customer.into(),
                  incident_date,
                  description,
                  amount_claimed,
                  priority: ClaimPriority::default(),
                  amount_approved: None,
                  adjuster_notes: String::new(),
                  supervisor_notes: String::new() })
    }

    /// Referencia con la que el motor identifica este siniestro.
    pub fn subject(&self) -> SubjectRef {
        SubjectRef::new(CLAIM_SUBJECT_TYPE, self.id.clone())
    }

    pub fn with_priority(mut self, priority: ClaimPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn approve_amount(&mut self, amount: Option<f64>) -> Result<(), DomainError> {
        if let Some(a) = amount {
            check_amount("amount_approved", a)?;
        }
        self.amount_approved = amount;
        Ok(())
    }
}

fn check_amount(field: &str, amount: f64) -> Result<(), DomainError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(DomainError::ValidationError(format!("{field} must be a non-negative amount")));
    }
    Ok(())
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Claim {} - {}", self.claim_number, self.customer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn rejects_negative_amounts() {
        assert!(Claim::new("1", "POL-1", "Ana", date(), "hail damage", -5.0).is_err());
        let mut c = Claim::new("1", "POL-1", "Ana", date(), "hail damage", 5.0).unwrap();
        assert!(c.approve_amount(Some(-1.0)).is_err());
        assert!(c.approve_amount(Some(0.0)).is_ok());
    }

    #[test]
    fn display_and_number() {
        let c = Claim::new("7", "POL-9", "Ana", date(), "flood", 100.0).unwrap();
        assert_eq!(c.to_string(), "Claim CLM-POL-9-7 - Ana");
    }
}
