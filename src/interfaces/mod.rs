//! Outer surfaces: CSV command input, report output and the command
//! dispatcher used by the binary.

pub mod commands;
pub mod csv;
