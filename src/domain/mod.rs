//! Core domain types and logic.

pub mod config_validation;
pub mod dataset;
pub mod dcf;
pub mod einvoice;
pub mod error;
pub mod ratios;
pub mod risk;
pub mod sales_sync;
pub mod timestamp;
pub mod tools;
pub mod trend;
