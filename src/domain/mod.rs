//! Typed entities, value objects and storage ports.
//!
//! Nothing in here performs I/O; the repositories behind `ports` do.

pub mod account;
pub mod interest;
pub mod loan;
pub mod money;
pub mod ports;
pub mod session;
pub mod transaction;
