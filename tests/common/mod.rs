#![allow(dead_code)]

use async_trait::async_trait;
use minibank::application::engine::Ledger;
use minibank::config::LedgerConfig;
use minibank::domain::account::{Account, AccountId, NewAccount};
use minibank::domain::ports::{AccountRepository, AccountRepositoryRef, LoanRepositoryRef};
use minibank::domain::session::Session;
use minibank::error::{LedgerError, Result};
use minibank::infrastructure::in_memory::{InMemoryAccountRepository, InMemoryLoanRepository};
use rust_decimal::Decimal;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;

pub const HEADER: &str = "command,actor,target,amount,term_days,installments,group,loan";

/// Writes a command file with the standard header followed by `rows`.
pub fn command_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file.flush().unwrap();
    file
}

/// A ledger holding the seeded admin plus the given customers, each funded
/// with `balance` taken from the admin.
pub async fn ledger_with(customers: &[(&str, &str)], balance: Decimal) -> (Arc<Ledger>, Session) {
    let ledger = Ledger::in_memory(LedgerConfig::default());
    funded(ledger, customers, balance).await
}

pub async fn funded(ledger: Ledger, customers: &[(&str, &str)], balance: Decimal) -> (Arc<Ledger>, Session) {
    ledger.bootstrap().await.unwrap();
    let admin = ledger.open_session("admin@example.com").await.unwrap();
    for (name, email) in customers {
        ledger.register(name, email, 2).await.unwrap();
        if !balance.is_zero() {
            ledger.transfer(&admin, email, balance).await.unwrap();
        }
    }
    (Arc::new(ledger), admin)
}

/// Account repository whose updates can be slowed down or made to fail,
/// for one chosen account or for all of them.
#[derive(Default, Clone)]
pub struct FlakyAccountRepository {
    inner: InMemoryAccountRepository,
    failing: Arc<Mutex<Option<AccountId>>>,
    fail_all: Arc<AtomicBool>,
    update_delay: Arc<Mutex<Duration>>,
}

impl FlakyAccountRepository {
    pub fn fail_updates_for(&self, id: Option<AccountId>) {
        *self.failing.lock().unwrap() = id;
    }

    pub fn fail_all_updates(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn delay_updates(&self, delay: Duration) {
        *self.update_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl AccountRepository for FlakyAccountRepository {
    async fn get(&self, id: AccountId) -> Result<Option<Account>> {
        self.inner.get(id).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.inner.get_by_email(email).await
    }

    async fn create(&self, account: NewAccount) -> Result<Account> {
        self.inner.create(account).await
    }

    async fn update(&self, account: &Account) -> Result<Account> {
        let delay = *self.update_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let failing = *self.failing.lock().unwrap();
        if failing == Some(account.id) || self.fail_all.load(Ordering::SeqCst) {
            return Err(LedgerError::repository("disk full"));
        }
        self.inner.update(account).await
    }

    async fn list(&self) -> Result<Vec<Account>> {
        self.inner.list().await
    }
}

pub fn flaky_ledger() -> (Ledger, FlakyAccountRepository) {
    let accounts = FlakyAccountRepository::default();
    let account_ref: AccountRepositoryRef = Arc::new(accounts.clone());
    let loan_ref: LoanRepositoryRef = Arc::new(InMemoryLoanRepository::new());
    (
        Ledger::new(account_ref, loan_ref, LedgerConfig::default()),
        accounts,
    )
}
