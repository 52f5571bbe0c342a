//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the payroll
//! configuration from YAML files.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::calculation::TaxTable;
use crate::error::{EngineError, EngineResult};
use crate::import::ColumnHeaders;

use super::types::{EngineSettings, ImportsFile, PayrollConfig, TaxBracketsFile};

/// Loads and provides access to the payroll configuration.
///
/// # Directory Structure
///
/// ```text
/// config/default/
/// ├── engine.yaml        # Rounding, negative income policy, workers
/// ├── tax_brackets.yaml  # Progressive tax brackets
/// └── imports.yaml       # Column headers per import kind
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
/// use rust_decimal::Decimal;
///
/// let loader = ConfigLoader::load("./config/default")?;
/// let tax = loader.tax_table().compute_tax(Decimal::from(5000))?;
/// println!("Tax on 5000: {}", tax);
/// # Ok::<(), payroll_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config: PayrollConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ConfigNotFound`] if a file is missing.
    /// - [`EngineError::ConfigParseError`] if a file is not valid YAML for
    ///   its structure.
    /// - [`EngineError::InvalidInput`] if the tax brackets break a table
    ///   invariant.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings = Self::load_yaml::<EngineSettings>(&path.join("engine.yaml"))?;
        let tax_table =
            Self::load_yaml::<TaxBracketsFile>(&path.join("tax_brackets.yaml"))?.into_table()?;
        let imports = Self::load_yaml::<ImportsFile>(&path.join("imports.yaml"))?;

        debug!(
            path = %path.display(),
            brackets = tax_table.brackets().len(),
            amount_scale = settings.amount_scale,
            "Loaded payroll configuration"
        );

        Ok(Self {
            config: PayrollConfig::new(settings, tax_table, imports.headers),
        })
    }

    /// Builds a loader from already-validated parts.
    pub fn from_parts(settings: EngineSettings, tax_table: TaxTable, headers: ColumnHeaders) -> Self {
        Self {
            config: PayrollConfig::new(settings, tax_table, headers),
        }
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the underlying payroll configuration.
    pub fn config(&self) -> &PayrollConfig {
        &self.config
    }

    /// Returns the engine settings.
    pub fn settings(&self) -> &EngineSettings {
        self.config.settings()
    }

    /// Returns the tax table.
    pub fn tax_table(&self) -> &TaxTable {
        self.config.tax_table()
    }

    /// Returns the import column headers.
    pub fn headers(&self) -> &ColumnHeaders {
        self.config.headers()
    }
}
