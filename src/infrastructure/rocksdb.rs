use crate::domain::account::{Account, AccountId, NewAccount};
use crate::domain::loan::{Loan, LoanId};
use crate::domain::ports::{AccountRepository, LoanRepository};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing accounts.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family mapping lower-cased e-mail to account id.
pub const CF_EMAILS: &str = "emails";
/// Column Family for storing loans.
pub const CF_LOANS: &str = "loans";

/// A persistent repository implementation using RocksDB.
///
/// Serves both accounts and loans from separate Column Families. Conditional
/// updates read, compare and write under a store-wide write lock, which gives
/// single-record compare-and-swap without RocksDB transactions.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, making sure
    /// every column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ACCOUNTS, CF_EMAILS, CF_LOANS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::repository(format!("{name} column family not found")))
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl AccountRepository for RocksDBStore {
    async fn get(&self, id: AccountId) -> Result<Option<Account>> {
        self.read(CF_ACCOUNTS, id.as_bytes())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        let email = email.trim().to_lowercase();
        match self.read::<AccountId>(CF_EMAILS, email.as_bytes())? {
            Some(id) => self.read(CF_ACCOUNTS, id.as_bytes()),
            None => Ok(None),
        }
    }

    async fn create(&self, new: NewAccount) -> Result<Account> {
        let _guard = self.write_lock.lock().await;
        let emails = self.cf(CF_EMAILS)?;
        if self.db.get_pinned_cf(emails, new.email.as_bytes())?.is_some() {
            return Err(LedgerError::ConflictError(format!(
                "Email already registered: {}",
                new.email
            )));
        }

        let account = Account::open(AccountId::new(), new);
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_ACCOUNTS)?,
            account.id.as_bytes(),
            serde_json::to_vec(&account)?,
        );
        batch.put_cf(
            emails,
            account.email.as_bytes(),
            serde_json::to_vec(&account.id)?,
        );
        self.db.write(batch)?;
        Ok(account)
    }

    async fn update(&self, account: &Account) -> Result<Account> {
        let _guard = self.write_lock.lock().await;
        let stored: Account = self
            .read(CF_ACCOUNTS, account.id.as_bytes())?
            .ok_or_else(|| LedgerError::not_found("Account", account.id))?;
        if stored.version != account.version {
            return Err(LedgerError::stale("account", account.id));
        }
        let mut next = account.clone();
        next.email = stored.email;
        next.version += 1;
        self.write(CF_ACCOUNTS, next.id.as_bytes(), &next)?;
        Ok(next)
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let mut accounts: Vec<Account> = self.scan(CF_ACCOUNTS)?;
        accounts.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(accounts)
    }
}

#[async_trait]
impl LoanRepository for RocksDBStore {
    async fn get(&self, id: LoanId) -> Result<Option<Loan>> {
        self.read(CF_LOANS, id.as_bytes())
    }

    async fn create(&self, loan: Loan) -> Result<Loan> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_LOANS)?;
        if self.db.get_pinned_cf(cf, loan.id.as_bytes())?.is_some() {
            return Err(LedgerError::ConflictError(format!(
                "Loan already exists: {}",
                loan.id
            )));
        }
        self.write(CF_LOANS, loan.id.as_bytes(), &loan)?;
        Ok(loan)
    }

    async fn update(&self, loan: &Loan) -> Result<Loan> {
        let _guard = self.write_lock.lock().await;
        let stored: Loan = self
            .read(CF_LOANS, loan.id.as_bytes())?
            .ok_or_else(|| LedgerError::not_found("Loan", loan.id))?;
        if stored.version != loan.version {
            return Err(LedgerError::stale("loan", loan.id));
        }
        let mut next = loan.clone();
        next.version += 1;
        self.write(CF_LOANS, next.id.as_bytes(), &next)?;
        Ok(next)
    }

    async fn delete(&self, id: LoanId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_LOANS)?;
        if self.db.get_pinned_cf(cf, id.as_bytes())?.is_none() {
            return Err(LedgerError::not_found("Loan", id));
        }
        self.db.delete_cf(cf, id.as_bytes())?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self.scan(CF_LOANS)?;
        loans.sort_by_key(|loan| loan.requested_at);
        Ok(loans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Group;
    use crate::domain::loan::{LoanRequest, LoanStatus};
    use crate::domain::money::Balance;
    use crate::domain::transaction::Transaction;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_ACCOUNTS).is_some());
        assert!(store.db.cf_handle(CF_EMAILS).is_some());
        assert!(store.db.cf_handle(CF_LOANS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_account_repository() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let new = NewAccount::new("Alice", "alice@example.com", Group::new(1).unwrap()).unwrap();
        let mut account = AccountRepository::create(&store, new.clone()).await.unwrap();
        assert!(matches!(
            AccountRepository::create(&store, new).await,
            Err(LedgerError::ConflictError(_))
        ));

        account.record(Transaction::adjustment("Opening balance", dec!(100), Utc::now())).unwrap();
        let stored = AccountRepository::update(&store, &account).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.balance, Balance::new(dec!(100)));

        let by_email = store.get_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(by_email, stored);
        assert!(matches!(
            AccountRepository::update(&store, &account).await,
            Err(LedgerError::StaleVersion { .. })
        ));

        let all = AccountRepository::list(&store).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_rocksdb_loan_repository() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let request = LoanRequest::new(dec!(250), 60, 2).unwrap();
        let loan = Loan::pending(LoanId::new(), AccountId::new(), request, Utc::now());
        LoanRepository::create(&store, loan.clone()).await.unwrap();

        let mut rejected = LoanRepository::get(&store, loan.id).await.unwrap().unwrap();
        rejected.status = LoanStatus::Rejected;
        let stored = LoanRepository::update(&store, &rejected).await.unwrap();
        assert_eq!(stored.status, LoanStatus::Rejected);

        LoanRepository::delete(&store, loan.id).await.unwrap();
        assert!(LoanRepository::get(&store, loan.id).await.unwrap().is_none());
        assert!(LoanRepository::list(&store).await.unwrap().is_empty());
    }
}
