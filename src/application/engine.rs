use super::accounts::AccountService;
use super::loans::{ApprovalOutcome, LoanService};
use super::locks::LockTable;
use super::transfer::{TransferOutcome, TransferService};
use crate::config::LedgerConfig;
use crate::domain::account::{Account, AccountId};
use crate::domain::interest::{InterestCalculator, LoanTerms};
use crate::domain::loan::{Loan, LoanId};
use crate::domain::money::Balance;
use crate::domain::ports::{AccountRepositoryRef, LoanRepositoryRef};
use crate::domain::session::Session;
use crate::error::Result;
use crate::infrastructure::in_memory::{InMemoryAccountRepository, InMemoryLoanRepository};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The entry point for callers of the ledger and loan engine.
///
/// `Ledger` owns no records itself; all state lives in the repositories it is
/// built with. It is `Send + Sync` and meant to be shared behind an `Arc`
/// between concurrent callers.
pub struct Ledger {
    config: LedgerConfig,
    accounts: AccountService,
    transfers: TransferService,
    loans: LoanService,
}

impl Ledger {
    /// Creates a new `Ledger` over the given repositories.
    ///
    /// # Arguments
    ///
    /// * `accounts` - The repository for accounts and their transaction logs.
    /// * `loans` - The repository for loan requests.
    /// * `config` - Interest rate, retry and lock settings.
    pub fn new(accounts: AccountRepositoryRef, loans: LoanRepositoryRef, config: LedgerConfig) -> Self {
        let account_locks = Arc::new(LockTable::new(config.lock_timeout()));
        let calculator = InterestCalculator::new(config.monthly_interest_rate);

        Self {
            accounts: AccountService::new(accounts.clone(), account_locks.clone(), config.max_retries),
            transfers: TransferService::new(accounts.clone(), account_locks.clone(), config.max_retries),
            loans: LoanService::new(
                accounts,
                loans,
                account_locks,
                LockTable::new(config.lock_timeout()),
                calculator,
                config.max_retries,
            ),
            config,
        }
    }

    /// A ledger backed by fresh in-memory repositories.
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::new(
            Arc::new(InMemoryAccountRepository::new()),
            Arc::new(InMemoryLoanRepository::new()),
            config,
        )
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Makes sure the configured administrator exists.
    pub async fn bootstrap(&self) -> Result<Account> {
        self.accounts.ensure_admin(&self.config.admin).await
    }

    pub async fn register(&self, name: &str, email: &str, group: u8) -> Result<Account> {
        self.accounts.register(name, email, group).await
    }

    pub async fn open_session(&self, email: &str) -> Result<Session> {
        self.accounts.open_session(email).await
    }

    pub async fn transfer(&self, session: &Session, recipient_email: &str, amount: Decimal) -> Result<TransferOutcome> {
        self.transfers.transfer(session, recipient_email, amount).await
    }

    pub async fn request_loan(&self, session: &Session, amount: Decimal, term_days: u32, installments: u32) -> Result<Loan> {
        self.loans.request_loan(session, amount, term_days, installments).await
    }

    pub async fn approve_loan(&self, session: &Session, id: LoanId) -> Result<ApprovalOutcome> {
        self.loans.approve_loan(session, id).await
    }

    pub async fn reject_loan(&self, session: &Session, id: LoanId) -> Result<Loan> {
        self.loans.reject_loan(session, id).await
    }

    /// Loan figures at the configured rate, without touching any record.
    pub fn compute_loan_terms(&self, principal: Decimal, term_days: u32, installments: u32) -> Result<LoanTerms> {
        self.loans.calculator().compute(principal, term_days, installments)
    }

    pub async fn adjust_balance(&self, session: &Session, email: &str, target: Decimal) -> Result<Account> {
        self.accounts.adjust_balance(session, email, target).await
    }

    pub async fn account(&self, id: AccountId) -> Result<Account> {
        self.accounts.get(id).await
    }

    pub async fn account_by_email(&self, email: &str) -> Result<Account> {
        self.accounts.by_email(email).await
    }

    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.accounts.list().await
    }

    pub async fn group_totals(&self) -> Result<BTreeMap<u8, Balance>> {
        self.accounts.group_totals().await
    }

    pub async fn loan(&self, id: LoanId) -> Result<Loan> {
        self.loans.get(id).await
    }

    pub async fn loans(&self) -> Result<Vec<Loan>> {
        self.loans.all().await
    }

    /// Every loan paired with its reported terms. Approved loans keep the
    /// figures frozen at approval.
    pub async fn loan_report(&self) -> Result<Vec<(Loan, LoanTerms)>> {
        self.loans.report().await
    }

    /// Pending loans paired with the terms they would be approved at.
    pub async fn pending_loans(&self) -> Result<Vec<(Loan, LoanTerms)>> {
        self.loans
            .pending()
            .await?
            .into_iter()
            .map(|loan| {
                let terms = self.loans.terms_for(&loan)?;
                Ok((loan, terms))
            })
            .collect()
    }
}
