use super::account::{Account, AccountId, NewAccount};
use super::loan::{Loan, LoanId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable storage for accounts.
///
/// Each call is strongly consistent for the single record it touches; there
/// is no multi-record transaction.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn get(&self, id: AccountId) -> Result<Option<Account>>;
    async fn get_by_email(&self, email: &str) -> Result<Option<Account>>;
    /// Fails with `ConflictError` if the e-mail is already registered.
    async fn create(&self, account: NewAccount) -> Result<Account>;
    /// Writes `account` if the stored version still equals `account.version`,
    /// returning the stored record with its version bumped. Fails with
    /// `StaleVersion` otherwise.
    async fn update(&self, account: &Account) -> Result<Account>;
    async fn list(&self) -> Result<Vec<Account>>;
}

/// Durable storage for loans. Same consistency model as [`AccountRepository`].
#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn get(&self, id: LoanId) -> Result<Option<Loan>>;
    async fn create(&self, loan: Loan) -> Result<Loan>;
    async fn update(&self, loan: &Loan) -> Result<Loan>;
    async fn delete(&self, id: LoanId) -> Result<()>;
    async fn list(&self) -> Result<Vec<Loan>>;
}

pub type AccountRepositoryRef = Arc<dyn AccountRepository>;
pub type LoanRepositoryRef = Arc<dyn LoanRepository>;
