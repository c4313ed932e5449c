use super::account::AccountId;
use super::money::Amount;
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(Uuid);

impl LoanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for LoanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Repayment period in days. Only a fixed set of terms is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TermDays(u32);

impl TermDays {
    pub const ALLOWED: [u32; 4] = [15, 30, 60, 90];

    pub fn new(days: u32) -> Result<Self, LedgerError> {
        if Self::ALLOWED.contains(&days) {
            Ok(Self(days))
        } else {
            Err(LedgerError::ValidationError(format!(
                "Term must be one of {:?} days, got {days}",
                Self::ALLOWED
            )))
        }
    }

    pub fn days(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for TermDays {
    type Error = LedgerError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TermDays> for u32 {
    fn from(term: TermDays) -> Self {
        term.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Installments(u32);

impl Installments {
    pub const MAX: u32 = 4;

    pub fn new(count: u32) -> Result<Self, LedgerError> {
        if (1..=Self::MAX).contains(&count) {
            Ok(Self(count))
        } else {
            Err(LedgerError::ValidationError(format!(
                "Installments must be between 1 and {}, got {count}",
                Self::MAX
            )))
        }
    }

    pub fn count(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Installments {
    type Error = LedgerError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Installments> for u32 {
    fn from(installments: Installments) -> Self {
        installments.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
}

impl LoanStatus {
    /// Approved and Rejected loans never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoanStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated parameters of a loan request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanRequest {
    pub principal: Amount,
    pub term: TermDays,
    pub installments: Installments,
}

impl LoanRequest {
    pub fn new(principal: rust_decimal::Decimal, term_days: u32, installments: u32) -> Result<Self, LedgerError> {
        Ok(Self {
            principal: Amount::new(principal)?,
            term: TermDays::new(term_days)?,
            installments: Installments::new(installments)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Loan {
    pub id: LoanId,
    pub account_id: AccountId,
    pub principal: Amount,
    pub term: TermDays,
    pub installments: Installments,
    pub status: LoanStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl Loan {
    pub fn pending(id: LoanId, account_id: AccountId, request: LoanRequest, requested_at: DateTime<Utc>) -> Self {
        Self {
            id,
            account_id,
            principal: request.principal,
            term: request.term,
            installments: request.installments,
            status: LoanStatus::Pending,
            requested_at,
            version: 0,
        }
    }

    /// Moves a pending loan to `next`.
    ///
    /// Fails with `ConflictError` when the loan was already resolved.
    pub fn transition(&mut self, next: LoanStatus) -> Result<(), LedgerError> {
        if self.status.is_terminal() {
            return Err(LedgerError::ConflictError(format!(
                "Loan {} is already {}",
                self.id, self.status
            )));
        }
        if next == LoanStatus::Pending {
            return Err(LedgerError::ValidationError(
                "A loan cannot be moved back to pending".to_string(),
            ));
        }
        self.status = next;
        Ok(())
    }
}
