//! Payroll computation and periodic import reconciliation engine.
//!
//! This crate turns uploaded attendance, performance and reward/punishment
//! batches into validated period records, reconciles them against canonical
//! employee records, and computes each employee's net salary from a
//! formula-driven salary group with progressive income tax.
//!
//! # Example
//!
//! ```
//! use payroll_engine::calculation::{validate_formula, TaxTable};
//! use rust_decimal::Decimal;
//!
//! assert!(validate_formula("基本工资 + 绩效工资 - 社保"));
//! assert_eq!(TaxTable::default().compute_tax(Decimal::from(5000)).unwrap(), Decimal::from(290));
//! ```

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod store;
