use super::locks::LockTable;
use crate::domain::account::{Account, AccountId};
use crate::domain::money::Amount;
use crate::domain::ports::AccountRepositoryRef;
use crate::domain::session::Session;
use crate::domain::transaction::Transaction;
use crate::error::{LedgerError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Both sides of a completed transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferOutcome {
    pub sender: Account,
    pub recipient: Account,
}

/// Moves funds between two accounts.
///
/// Both account locks are held for the whole read-modify-write, so other
/// ledger operations never see one side applied without the other.
pub struct TransferService {
    accounts: AccountRepositoryRef,
    locks: Arc<LockTable<AccountId>>,
    max_retries: u32,
}

impl TransferService {
    pub fn new(accounts: AccountRepositoryRef, locks: Arc<LockTable<AccountId>>, max_retries: u32) -> Self {
        Self {
            accounts,
            locks,
            max_retries,
        }
    }

    /// Transfers `amount` from the session's account to the account
    /// registered under `recipient_email`.
    pub async fn transfer(&self, session: &Session, recipient_email: &str, amount: Decimal) -> Result<TransferOutcome> {
        let amount = Amount::new(amount)?;
        let recipient = self
            .accounts
            .get_by_email(recipient_email)
            .await?
            .ok_or_else(|| LedgerError::not_found("Recipient", recipient_email))?;
        if recipient.id == session.account_id {
            return Err(LedgerError::ValidationError(
                "Cannot transfer to the same account".to_string(),
            ));
        }

        let mut attempt = 0;
        loop {
            match self.try_transfer(session.account_id, recipient.id, amount).await {
                Err(LedgerError::StaleVersion { entity, id }) if attempt < self.max_retries => {
                    attempt += 1;
                    debug!(entity, %id, attempt, "stale write during transfer, retrying");
                }
                Err(LedgerError::StaleVersion { entity, id }) => {
                    return Err(LedgerError::ConflictError(format!(
                        "Transfer abandoned after {attempt} retries: {entity} {id} kept changing"
                    )));
                }
                result => return result,
            }
        }
    }

    async fn try_transfer(&self, sender_id: AccountId, recipient_id: AccountId, amount: Amount) -> Result<TransferOutcome> {
        let _guard = self.locks.acquire_all(&[sender_id, recipient_id]).await?;

        let sender = self
            .accounts
            .get(sender_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Account", sender_id))?;
        let recipient = self
            .accounts
            .get(recipient_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Recipient", recipient_id))?;

        let now = Utc::now();
        let mut debited = sender.clone();
        debited.debit(amount, Transaction::transfer_out(&recipient.name, amount.value(), now))?;
        let mut credited = recipient.clone();
        credited.record(Transaction::transfer_in(&sender.name, amount.value(), now))?;

        let stored_sender = self.accounts.update(&debited).await?;
        let stored_recipient = match self.accounts.update(&credited).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(sender = %sender_id, error = %err, "recipient write failed, restoring sender");
                self.restore(&sender, &stored_sender).await;
                return Err(err);
            }
        };

        info!(
            sender = %sender_id,
            recipient = %recipient_id,
            %amount,
            "transfer completed"
        );
        Ok(TransferOutcome {
            sender: stored_sender,
            recipient: stored_recipient,
        })
    }

    /// Writes `original` back over `written`, undoing a half-applied transfer.
    async fn restore(&self, original: &Account, written: &Account) {
        let mut rollback = original.clone();
        rollback.version = written.version;
        if let Err(err) = self.accounts.update(&rollback).await {
            error!(account = %original.id, error = %err, "failed to roll back transfer debit");
        }
    }
}
