//! Application layer containing the ledger's business operations.
//!
//! `Ledger` (in `engine`) is the facade callers use. The services behind it
//! share one account lock table so transfers, approvals and adjustments
//! serialize on the accounts they touch.

pub mod accounts;
pub mod engine;
pub mod loans;
pub mod locks;
pub mod transfer;
