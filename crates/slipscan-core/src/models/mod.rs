//! Data models for slip scanning.

pub mod config;
pub mod slip;
