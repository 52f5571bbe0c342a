//! Configuration loading and management for the payroll engine.
//!
//! This module loads engine settings, the progressive tax bracket table and
//! the import column headers from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Tax brackets: {}", config.tax_table().brackets().len());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{EngineSettings, ImportsFile, NegativeIncomePolicy, PayrollConfig, TaxBracketsFile};
