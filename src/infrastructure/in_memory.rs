use crate::domain::account::{Account, AccountId, NewAccount};
use crate::domain::loan::{Loan, LoanId};
use crate::domain::ports::{AccountRepository, LoanRepository};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct AccountTable {
    by_id: HashMap<AccountId, Account>,
    by_email: HashMap<String, AccountId>,
}

/// A thread-safe in-memory account repository.
///
/// Uses `Arc<RwLock<..>>` so clones share the same records. Ideal for
/// testing or when persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryAccountRepository {
    table: Arc<RwLock<AccountTable>>,
}

impl InMemoryAccountRepository {
    /// Creates a new, empty in-memory account repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn get(&self, id: AccountId) -> Result<Option<Account>> {
        let table = self.table.read().await;
        Ok(table.by_id.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        let table = self.table.read().await;
        let email = email.trim().to_lowercase();
        Ok(table
            .by_email
            .get(&email)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn create(&self, new: NewAccount) -> Result<Account> {
        let mut table = self.table.write().await;
        if table.by_email.contains_key(&new.email) {
            return Err(LedgerError::ConflictError(format!(
                "Email already registered: {}",
                new.email
            )));
        }
        let account = Account::open(AccountId::new(), new);
        table.by_email.insert(account.email.clone(), account.id);
        table.by_id.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update(&self, account: &Account) -> Result<Account> {
        let mut table = self.table.write().await;
        let stored = table
            .by_id
            .get_mut(&account.id)
            .ok_or_else(|| LedgerError::not_found("Account", account.id))?;
        if stored.version != account.version {
            return Err(LedgerError::stale("account", account.id));
        }
        let mut next = account.clone();
        next.email = stored.email.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let table = self.table.read().await;
        let mut accounts: Vec<Account> = table.by_id.values().cloned().collect();
        accounts.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(accounts)
    }
}

/// A thread-safe in-memory loan repository.
#[derive(Default, Clone)]
pub struct InMemoryLoanRepository {
    loans: Arc<RwLock<HashMap<LoanId, Loan>>>,
}

impl InMemoryLoanRepository {
    /// Creates a new, empty in-memory loan repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanRepository for InMemoryLoanRepository {
    async fn get(&self, id: LoanId) -> Result<Option<Loan>> {
        let loans = self.loans.read().await;
        Ok(loans.get(&id).cloned())
    }

    async fn create(&self, loan: Loan) -> Result<Loan> {
        let mut loans = self.loans.write().await;
        if loans.contains_key(&loan.id) {
            return Err(LedgerError::ConflictError(format!(
                "Loan already exists: {}",
                loan.id
            )));
        }
        loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn update(&self, loan: &Loan) -> Result<Loan> {
        let mut loans = self.loans.write().await;
        let stored = loans
            .get_mut(&loan.id)
            .ok_or_else(|| LedgerError::not_found("Loan", loan.id))?;
        if stored.version != loan.version {
            return Err(LedgerError::stale("loan", loan.id));
        }
        let mut next = loan.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn delete(&self, id: LoanId) -> Result<()> {
        let mut loans = self.loans.write().await;
        loans
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| LedgerError::not_found("Loan", id))
    }

    async fn list(&self) -> Result<Vec<Loan>> {
        let loans = self.loans.read().await;
        let mut all: Vec<Loan> = loans.values().cloned().collect();
        all.sort_by_key(|loan| loan.requested_at);
        Ok(all)
    }
}
