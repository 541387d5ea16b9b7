//! Command implementations.

pub mod delete;
pub mod scan;
pub mod slip;
