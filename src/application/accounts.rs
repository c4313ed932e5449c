use super::locks::LockTable;
use crate::config::AdminSeed;
use crate::domain::account::{Account, AccountId, Group, NewAccount};
use crate::domain::money::Balance;
use crate::domain::ports::AccountRepositoryRef;
use crate::domain::session::Session;
use crate::domain::transaction::Transaction;
use crate::error::{LedgerError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Account lifecycle and administrative balance changes.
pub struct AccountService {
    accounts: AccountRepositoryRef,
    locks: Arc<LockTable<AccountId>>,
    max_retries: u32,
}

impl AccountService {
    pub fn new(accounts: AccountRepositoryRef, locks: Arc<LockTable<AccountId>>, max_retries: u32) -> Self {
        Self {
            accounts,
            locks,
            max_retries,
        }
    }

    pub async fn register(&self, name: &str, email: &str, group: u8) -> Result<Account> {
        let new = NewAccount::new(name, email, Group::new(group)?)?;
        let account = self.accounts.create(new).await?;
        info!(account = %account.id, email = %account.email, "account registered");
        Ok(account)
    }

    /// Creates the administrator described by `seed` unless an account with
    /// that e-mail already exists, then records the opening balance if the
    /// administrator has not been funded yet.
    pub async fn ensure_admin(&self, seed: &AdminSeed) -> Result<Account> {
        let admin = match self.accounts.get_by_email(&seed.email).await? {
            Some(existing) => existing,
            None => {
                let new = NewAccount::new(&seed.name, &seed.email, Group::new(seed.group)?)?.admin();
                match self.accounts.create(new).await {
                    Ok(account) => {
                        info!(account = %account.id, "administrator created");
                        account
                    }
                    // Another bootstrap got there first.
                    Err(LedgerError::ConflictError(_)) => self
                        .accounts
                        .get_by_email(&seed.email)
                        .await?
                        .ok_or_else(|| LedgerError::not_found("Account", &seed.email))?,
                    Err(err) => return Err(err),
                }
            }
        };
        if seed.opening_balance.is_zero() || !admin.transactions.is_empty() {
            return Ok(admin);
        }

        let mut attempt = 0;
        loop {
            match self.try_fund(admin.id, seed.opening_balance).await {
                Err(LedgerError::StaleVersion { entity, id: record }) if attempt < self.max_retries => {
                    attempt += 1;
                    debug!(entity, id = %record, attempt, "stale write while funding administrator, retrying");
                }
                Err(LedgerError::StaleVersion { entity, id: record }) => {
                    return Err(LedgerError::ConflictError(format!(
                        "Opening balance abandoned after {attempt} retries: {entity} {record} kept changing"
                    )));
                }
                result => return result,
            }
        }
    }

    async fn try_fund(&self, id: AccountId, opening_balance: Decimal) -> Result<Account> {
        let _guard = self.locks.acquire(id).await?;
        let mut account = self
            .accounts
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Account", id))?;
        if !account.transactions.is_empty() {
            return Ok(account);
        }
        account.record(Transaction::adjustment("Opening balance", opening_balance, Utc::now()))?;
        let stored = self.accounts.update(&account).await?;
        info!(account = %id, %opening_balance, "administrator funded");
        Ok(stored)
    }

    pub async fn get(&self, id: AccountId) -> Result<Account> {
        let guard = self.locks.acquire(id).await?;
        let account = self.accounts.get(id).await?;
        drop(guard);
        match account {
            Some(account) => Ok(account),
            None => {
                self.locks.prune().await;
                Err(LedgerError::not_found("Account", id))
            }
        }
    }

    pub async fn by_email(&self, email: &str) -> Result<Account> {
        let account = self
            .accounts
            .get_by_email(email)
            .await?
            .ok_or_else(|| LedgerError::not_found("Account", email))?;
        self.get(account.id).await
    }

    /// Resolves an already-identified account holder to a session.
    pub async fn open_session(&self, email: &str) -> Result<Session> {
        let account = self.by_email(email).await?;
        Ok(Session::for_account(&account))
    }

    /// Every account, read while holding all of their locks so no transfer
    /// is observed half-applied. Accounts created during the read are left
    /// out.
    pub async fn list(&self) -> Result<Vec<Account>> {
        let ids: Vec<AccountId> = self.accounts.list().await?.iter().map(|a| a.id).collect();
        let _guard = self.locks.acquire_all(&ids).await?;
        let mut accounts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(account) = self.accounts.get(id).await? {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }

    /// Sum of balances per group. Every known group is present.
    pub async fn group_totals(&self) -> Result<BTreeMap<u8, Balance>> {
        let mut totals: BTreeMap<u8, Balance> =
            Group::ALL.iter().map(|g| (*g, Balance::ZERO)).collect();
        for account in self.list().await? {
            *totals.entry(account.group.value()).or_default() += account.balance;
        }
        Ok(totals)
    }

    /// Sets an account's balance to `target` by recording the difference as
    /// an adjustment.
    pub async fn adjust_balance(&self, session: &Session, email: &str, target: Decimal) -> Result<Account> {
        session.require_admin("adjust balances")?;
        if target < Decimal::ZERO {
            return Err(LedgerError::ValidationError(format!(
                "Balance cannot be set below zero, got {target}"
            )));
        }
        let id = self
            .accounts
            .get_by_email(email)
            .await?
            .ok_or_else(|| LedgerError::not_found("Account", email))?
            .id;

        let mut attempt = 0;
        loop {
            match self.try_adjust(id, target).await {
                Err(LedgerError::StaleVersion { entity, id: record }) if attempt < self.max_retries => {
                    attempt += 1;
                    debug!(entity, id = %record, attempt, "stale write during adjustment, retrying");
                }
                Err(LedgerError::StaleVersion { entity, id: record }) => {
                    return Err(LedgerError::ConflictError(format!(
                        "Adjustment abandoned after {attempt} retries: {entity} {record} kept changing"
                    )));
                }
                result => return result,
            }
        }
    }

    async fn try_adjust(&self, id: AccountId, target: Decimal) -> Result<Account> {
        let _guard = self.locks.acquire(id).await?;
        let mut account = self
            .accounts
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Account", id))?;

        let delta = target - account.balance.value();
        if delta.is_zero() {
            return Ok(account);
        }
        account.record(Transaction::adjustment(
            "Balance adjusted by administrator",
            delta,
            Utc::now(),
        ))?;
        let stored = self.accounts.update(&account).await?;
        info!(account = %id, %delta, "balance adjusted");
        Ok(stored)
    }
}
