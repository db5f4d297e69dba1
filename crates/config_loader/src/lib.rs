//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON run blueprints and test suites
//! - Validate configuration legality (first error wins, naming the offending key)
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_blueprint(Path::new("blueprint.toml")).unwrap();
//! let suite = ConfigLoader::load_suite(Path::new("suite.toml"), &blueprint).unwrap();
//! println!("{} rows against topic {}", suite.rows.len(), blueprint.stream.topic);
//! ```

mod parser;
mod validator;

pub use contracts::{RunBlueprint, TestSuite};
pub use parser::ConfigFormat;
pub use validator::{validate_blueprint, validate_suite};

use contracts::ContractError;
use std::path::Path;
use tracing::debug;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a run blueprint
    ///
    /// Automatically detects format from file extension (.toml / .json).
    pub fn load_blueprint(path: &Path) -> Result<RunBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        let blueprint = Self::load_blueprint_from_str(&content, format)?;
        debug!(path = %path.display(), fields = blueprint.schema.fields.len(), "Blueprint loaded");
        Ok(blueprint)
    }

    /// Load a test suite and validate it against the blueprint schema
    pub fn load_suite(path: &Path, blueprint: &RunBlueprint) -> Result<TestSuite, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        let suite = Self::load_suite_from_str(&content, format, blueprint)?;
        debug!(path = %path.display(), rows = suite.rows.len(), "Test suite loaded");
        Ok(suite)
    }

    /// Load a blueprint from string
    pub fn load_blueprint_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RunBlueprint, ContractError> {
        let blueprint: RunBlueprint = parser::parse(content, format)?;
        validator::validate_blueprint(&blueprint)?;
        Ok(blueprint)
    }

    /// Load a test suite from string
    pub fn load_suite_from_str(
        content: &str,
        format: ConfigFormat,
        blueprint: &RunBlueprint,
    ) -> Result<TestSuite, ContractError> {
        let suite: TestSuite = parser::parse(content, format)?;
        validator::validate_suite(&suite, blueprint)?;
        Ok(suite)
    }

    /// Serialize RunBlueprint to TOML string
    pub fn to_toml(blueprint: &RunBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a TestSuite to TOML string (row state is not serialized)
    pub fn suite_to_toml(suite: &TestSuite) -> Result<String, ContractError> {
        toml::to_string_pretty(suite)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize RunBlueprint to JSON string
    pub fn to_json(blueprint: &RunBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}
