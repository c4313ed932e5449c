use super::locks::LockTable;
use crate::domain::account::{Account, AccountId};
use crate::domain::interest::{InterestCalculator, LoanTerms};
use crate::domain::loan::{Loan, LoanId, LoanRequest, LoanStatus};
use crate::domain::ports::{AccountRepositoryRef, LoanRepositoryRef};
use crate::domain::session::Session;
use crate::domain::transaction::{LoanSnapshot, Transaction};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// The account credited by an approval and the loan in its final state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalOutcome {
    pub account: Account,
    pub loan: Loan,
}

/// Drives loans through `Pending -> Approved | Rejected`.
///
/// Approval holds the loan lock and then the owning account's lock, so a
/// loan is credited at most once and never observed approved-but-uncredited.
pub struct LoanService {
    accounts: AccountRepositoryRef,
    loans: LoanRepositoryRef,
    account_locks: Arc<LockTable<AccountId>>,
    loan_locks: LockTable<LoanId>,
    calculator: InterestCalculator,
    max_retries: u32,
}

impl LoanService {
    pub fn new(
        accounts: AccountRepositoryRef,
        loans: LoanRepositoryRef,
        account_locks: Arc<LockTable<AccountId>>,
        loan_locks: LockTable<LoanId>,
        calculator: InterestCalculator,
        max_retries: u32,
    ) -> Self {
        Self {
            accounts,
            loans,
            account_locks,
            loan_locks,
            calculator,
            max_retries,
        }
    }

    pub fn calculator(&self) -> &InterestCalculator {
        &self.calculator
    }

    /// Terms for a loan at the current rate.
    pub fn terms_for(&self, loan: &Loan) -> Result<LoanTerms> {
        self.calculator.compute(
            loan.principal.value(),
            loan.term.days(),
            loan.installments.count(),
        )
    }

    /// Files a pending loan for the session's account. Balances are untouched.
    pub async fn request_loan(&self, session: &Session, amount: Decimal, term_days: u32, installments: u32) -> Result<Loan> {
        let request = LoanRequest::new(amount, term_days, installments)?;
        self.calculator.compute(amount, term_days, installments)?;
        if self.accounts.get(session.account_id).await?.is_none() {
            return Err(LedgerError::not_found("Account", session.account_id));
        }

        let loan = Loan::pending(LoanId::new(), session.account_id, request, Utc::now());
        let loan = self.loans.create(loan).await?;
        info!(loan = %loan.id, account = %loan.account_id, principal = %loan.principal, "loan requested");
        Ok(loan)
    }

    pub async fn get(&self, id: LoanId) -> Result<Loan> {
        let guard = self.loan_locks.acquire(id).await?;
        let loan = self.loans.get(id).await?;
        drop(guard);
        match loan {
            Some(loan) => Ok(loan),
            None => {
                self.loan_locks.prune().await;
                Err(LedgerError::not_found("Loan", id))
            }
        }
    }

    pub async fn all(&self) -> Result<Vec<Loan>> {
        self.loans.list().await
    }

    /// Every loan with the figures it is reported at.
    ///
    /// Approved loans report the snapshot frozen in their owner's log; the
    /// others are priced at the current rate.
    pub async fn report(&self) -> Result<Vec<(Loan, LoanTerms)>> {
        let mut rows = Vec::new();
        for listed in self.loans.list().await? {
            let _loan_guard = self.loan_locks.acquire(listed.id).await?;
            let Some(loan) = self.loans.get(listed.id).await? else {
                continue;
            };
            let terms = if loan.status == LoanStatus::Approved {
                self.approved_terms(&loan).await?
            } else {
                self.terms_for(&loan)?
            };
            rows.push((loan, terms));
        }
        self.loan_locks.prune().await;
        Ok(rows)
    }

    async fn approved_terms(&self, loan: &Loan) -> Result<LoanTerms> {
        let _account_guard = self.account_locks.acquire(loan.account_id).await?;
        let owner = self
            .accounts
            .get(loan.account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Account", loan.account_id))?;
        owner
            .transactions
            .snapshot_for(loan.id)
            .map(|snapshot| snapshot.terms())
            .ok_or_else(|| {
                LedgerError::repository(format!(
                    "Approved loan {} has no snapshot in the log of account {}",
                    loan.id, loan.account_id
                ))
            })
    }

    /// Loans still awaiting a decision, oldest first.
    pub async fn pending(&self) -> Result<Vec<Loan>> {
        let loans = self.loans.list().await?;
        Ok(loans
            .into_iter()
            .filter(|loan| loan.status == LoanStatus::Pending)
            .collect())
    }

    /// Approves a pending loan and credits its principal to the owner.
    ///
    /// Only the principal reaches the balance; the total with interest is
    /// recorded in the transaction's snapshot.
    pub async fn approve_loan(&self, session: &Session, id: LoanId) -> Result<ApprovalOutcome> {
        session.require_admin("approve loans")?;

        let mut attempt = 0;
        let result = loop {
            match self.try_approve(id).await {
                Err(LedgerError::StaleVersion { entity, id: record }) if attempt < self.max_retries => {
                    attempt += 1;
                    debug!(entity, id = %record, attempt, "stale write during approval, retrying");
                }
                Err(LedgerError::StaleVersion { entity, id: record }) => {
                    break Err(LedgerError::ConflictError(format!(
                        "Approval abandoned after {attempt} retries: {entity} {record} kept changing"
                    )));
                }
                result => break result,
            }
        };
        self.loan_locks.prune().await;
        result
    }

    async fn try_approve(&self, id: LoanId) -> Result<ApprovalOutcome> {
        let _loan_guard = self.loan_locks.acquire(id).await?;
        let loan = self
            .loans
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Loan", id))?;

        let mut approved = loan.clone();
        approved.transition(LoanStatus::Approved)?;

        let _account_guard = self.account_locks.acquire(loan.account_id).await?;
        let account = self
            .accounts
            .get(loan.account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Account", loan.account_id))?;

        let terms = self.terms_for(&loan)?;
        let snapshot = LoanSnapshot {
            loan_id: loan.id,
            amount: loan.principal.value(),
            term_days: loan.term.days(),
            installments: loan.installments.count(),
            total_amount: terms.total_amount,
            installment_amount: terms.installment_amount,
        };
        let mut credited = account.clone();
        credited.record(Transaction::loan_approved(snapshot, Utc::now()))?;

        let stored_loan = self.loans.update(&approved).await?;
        let stored_account = match self.accounts.update(&credited).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(loan = %id, error = %err, "credit failed, returning loan to pending");
                let mut rollback = loan.clone();
                rollback.version = stored_loan.version;
                if let Err(rollback_err) = self.loans.update(&rollback).await {
                    error!(loan = %id, error = %rollback_err, "failed to roll back loan approval");
                }
                return Err(err);
            }
        };

        info!(
            loan = %id,
            account = %stored_account.id,
            principal = %loan.principal,
            total = %terms.total_amount,
            "loan approved"
        );
        Ok(ApprovalOutcome {
            account: stored_account,
            loan: stored_loan,
        })
    }

    /// Rejects a pending loan. No balance changes.
    pub async fn reject_loan(&self, session: &Session, id: LoanId) -> Result<Loan> {
        session.require_admin("reject loans")?;

        let mut attempt = 0;
        let result = loop {
            match self.try_reject(id).await {
                Err(LedgerError::StaleVersion { entity, id: record }) if attempt < self.max_retries => {
                    attempt += 1;
                    debug!(entity, id = %record, attempt, "stale write during rejection, retrying");
                }
                Err(LedgerError::StaleVersion { entity, id: record }) => {
                    break Err(LedgerError::ConflictError(format!(
                        "Rejection abandoned after {attempt} retries: {entity} {record} kept changing"
                    )));
                }
                result => break result,
            }
        };
        self.loan_locks.prune().await;
        result
    }

    async fn try_reject(&self, id: LoanId) -> Result<Loan> {
        let _guard = self.loan_locks.acquire(id).await?;
        let mut loan = self
            .loans
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Loan", id))?;
        loan.transition(LoanStatus::Rejected)?;
        let stored = self.loans.update(&loan).await?;
        info!(loan = %id, "loan rejected");
        Ok(stored)
    }
}
