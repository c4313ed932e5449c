//! Loan interest and installment computation.
//!
//! Interest compounds monthly on a 30-day month, with fractional months
//! allowed (a 15-day term is half a month). Nothing here rounds.

use crate::error::{LedgerError, Result};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Monthly interest rate applied when no other rate is configured (1.8%).
pub const DEFAULT_MONTHLY_RATE: Decimal = dec!(0.018);

const DAYS_PER_MONTH: Decimal = dec!(30);

/// The repayment figures for a loan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub total_amount: Decimal,
    pub installment_amount: Decimal,
    pub interest_amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterestCalculator {
    monthly_rate: Decimal,
}

impl Default for InterestCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_MONTHLY_RATE)
    }
}

impl InterestCalculator {
    pub fn new(monthly_rate: Decimal) -> Self {
        Self { monthly_rate }
    }

    pub fn monthly_rate(&self) -> Decimal {
        self.monthly_rate
    }

    /// Computes `principal * (1 + rate)^(term_days / 30)` and splits it into
    /// `installments` equal parts.
    pub fn compute(&self, principal: Decimal, term_days: u32, installments: u32) -> Result<LoanTerms> {
        if principal <= Decimal::ZERO {
            return Err(LedgerError::ValidationError(format!(
                "Principal must be positive, got {principal}"
            )));
        }
        if term_days == 0 {
            return Err(LedgerError::ValidationError(
                "Term must be at least one day".to_string(),
            ));
        }
        if installments == 0 {
            return Err(LedgerError::ValidationError(
                "Installment count must be positive".to_string(),
            ));
        }

        let term_months = Decimal::from(term_days) / DAYS_PER_MONTH;
        let growth = (Decimal::ONE + self.monthly_rate)
            .checked_powd(term_months)
            .ok_or_else(|| {
                LedgerError::ValidationError(format!(
                    "Interest for a {term_days}-day term is out of range"
                ))
            })?;
        let total_amount = principal.checked_mul(growth).ok_or_else(|| {
            LedgerError::ValidationError(format!("Loan total for {principal} is out of range"))
        })?;

        Ok(LoanTerms {
            total_amount,
            installment_amount: total_amount / Decimal::from(installments),
            interest_amount: total_amount - principal,
        })
    }
}

/// Computes loan terms at the default monthly rate.
pub fn compute_loan_terms(principal: Decimal, term_days: u32, installments: u32) -> Result<LoanTerms> {
    InterestCalculator::default().compute(principal, term_days, installments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_month_single_installment() {
        let terms = compute_loan_terms(dec!(1000), 30, 1).unwrap();
        assert_eq!(terms.total_amount, dec!(1018));
        assert_eq!(terms.interest_amount, dec!(18));
        assert_eq!(terms.installment_amount, dec!(1018));
    }

    #[test]
    fn test_three_months_three_installments() {
        let terms = compute_loan_terms(dec!(1000), 90, 3).unwrap();
        assert_eq!(terms.total_amount, dec!(1054.977832));
        assert_eq!(terms.installment_amount.round_dp(2), dec!(351.66));
        assert_eq!(terms.interest_amount, dec!(54.977832));
    }

    #[test]
    fn test_fractional_month_term() {
        // 15 days is half a month: 1000 * sqrt(1.018)
        let terms = compute_loan_terms(dec!(1000), 15, 1).unwrap();
        assert!((terms.total_amount - dec!(1008.9598)).abs() < dec!(0.001));
        assert!(terms.interest_amount > Decimal::ZERO);
    }

    #[test]
    fn test_installments_split_total() {
        let terms = compute_loan_terms(dec!(500), 60, 4).unwrap();
        assert_eq!(terms.installment_amount * dec!(4), terms.total_amount);
    }

    #[test]
    fn test_custom_rate() {
        let calc = InterestCalculator::new(dec!(0.05));
        let terms = calc.compute(dec!(200), 30, 2).unwrap();
        assert_eq!(terms.total_amount, dec!(210));
        assert_eq!(terms.installment_amount, dec!(105));
    }

    #[test]
    fn test_rejects_non_positive_inputs() {
        assert!(matches!(
            compute_loan_terms(dec!(0), 30, 1),
            Err(LedgerError::ValidationError(_))
        ));
        assert!(matches!(
            compute_loan_terms(dec!(-5), 30, 1),
            Err(LedgerError::ValidationError(_))
        ));
        assert!(matches!(
            compute_loan_terms(dec!(100), 0, 1),
            Err(LedgerError::ValidationError(_))
        ));
        assert!(matches!(
            compute_loan_terms(dec!(100), 30, 0),
            Err(LedgerError::ValidationError(_))
        ));
    }
}
