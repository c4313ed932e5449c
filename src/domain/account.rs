use super::money::{Amount, Balance};
use super::transaction::{Transaction, TransactionLog};
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Customer group an account belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Group(u8);

impl Group {
    pub const ALL: [u8; 4] = [1, 2, 3, 4];

    pub fn new(value: u8) -> Result<Self, LedgerError> {
        if Self::ALL.contains(&value) {
            Ok(Self(value))
        } else {
            Err(LedgerError::ValidationError(format!(
                "Group must be one of {:?}, got {value}",
                Self::ALL
            )))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Group {
    type Error = LedgerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Group> for u8 {
    fn from(group: Group) -> Self {
        group.0
    }
}

/// Fields needed to open an account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub group: Group,
    pub is_admin: bool,
}

impl NewAccount {
    pub fn new(name: impl Into<String>, email: impl Into<String>, group: Group) -> Result<Self, LedgerError> {
        let name = name.into().trim().to_string();
        let email = email.into().trim().to_lowercase();
        if name.is_empty() {
            return Err(LedgerError::ValidationError(
                "Name must not be empty".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(LedgerError::ValidationError(format!(
                "Invalid email address: {email}"
            )));
        }
        Ok(Self {
            name,
            email,
            group,
            is_admin: false,
        })
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// An account holder and their ledger.
///
/// `balance` must always equal the net of `transactions` once an operation
/// has completed. `version` is bumped by the repository on every update and
/// is used for conditional writes.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub balance: Balance,
    pub group: Group,
    pub is_admin: bool,
    pub transactions: TransactionLog,
    #[serde(default)]
    pub version: u64,
}

impl Account {
    pub fn open(id: AccountId, new: NewAccount) -> Self {
        Self {
            id,
            name: new.name,
            email: new.email,
            balance: Balance::ZERO,
            group: new.group,
            is_admin: new.is_admin,
            transactions: TransactionLog::new(),
            version: 0,
        }
    }

    /// Applies a transaction to the balance and records it.
    ///
    /// Fails without touching the account when the new balance would not be
    /// representable.
    pub fn record(&mut self, tx: Transaction) -> Result<(), LedgerError> {
        let balance = self.balance.value().checked_add(tx.amount).ok_or_else(|| {
            LedgerError::ValidationError(format!(
                "Balance of account {} cannot absorb {}",
                self.id, tx.amount
            ))
        })?;
        self.balance = Balance::new(balance);
        self.transactions.append(tx);
        Ok(())
    }

    /// Records a debit after checking the balance covers it.
    pub fn debit(&mut self, amount: Amount, tx: Transaction) -> Result<(), LedgerError> {
        if !self.balance.covers(amount) {
            return Err(LedgerError::InsufficientFundsError {
                requested: amount.value(),
                available: self.balance.value(),
            });
        }
        self.record(tx)
    }

    /// Whether the balance matches the transaction history.
    pub fn is_consistent(&self) -> bool {
        self.balance == self.transactions.net()
    }
}
