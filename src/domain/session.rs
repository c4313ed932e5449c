use super::account::{Account, AccountId};
use crate::error::LedgerError;

/// The caller on whose behalf a service call runs.
///
/// Built once the presentation layer has identified the account holder and
/// passed explicitly to every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub account_id: AccountId,
    pub is_admin: bool,
}

impl Session {
    pub fn for_account(account: &Account) -> Self {
        Self {
            account_id: account.id,
            is_admin: account.is_admin,
        }
    }

    pub fn require_admin(&self, action: &str) -> Result<(), LedgerError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(LedgerError::PermissionDenied(format!(
                "Only administrators can {action}"
            )))
        }
    }
}
