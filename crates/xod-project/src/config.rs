//! Configuration for bound-input extraction
//!
//! Loadable from TOML; every field is optional and falls back to the
//! standard library defaults:
//!
//! ```toml
//! placeholder = { x = 0.0, y = 0.0 }
//!
//! [constants]
//! number = "xod/core/constant-number"
//! pulse = "xod/core/constant-boolean"
//! ```

use crate::types::{DataType, PatchPath, Position};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Constant-producer patch used for each primitive type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantPatches {
    pub number: PatchPath,
    pub boolean: PatchPath,
    pub string: PatchPath,
    /// Placeholder policy: pulses are fed from the boolean constant until a
    /// dedicated boot/continuously source is chosen.
    pub pulse: PatchPath,
}

impl Default for ConstantPatches {
    fn default() -> Self {
        Self {
            number: PatchPath::from_static("xod/core/constant-number"),
            boolean: PatchPath::from_static("xod/core/constant-boolean"),
            string: PatchPath::from_static("xod/core/constant-string"),
            pulse: PatchPath::from_static("xod/core/constant-boolean"),
        }
    }
}

/// Extraction settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Type → constant patch table
    pub constants: ConstantPatches,
    /// Where generated constant nodes are placed
    pub placeholder: Position,
}

impl ExtractConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the constant patch for one type
    ///
    /// Custom types have no constant producer and are ignored.
    #[must_use]
    pub fn with_constant(mut self, data_type: &DataType, path: PatchPath) -> Self {
        match data_type {
            DataType::Number => self.constants.number = path,
            DataType::Boolean => self.constants.boolean = path,
            DataType::String => self.constants.string = path,
            DataType::Pulse => self.constants.pulse = path,
            DataType::Custom(_) => {}
        }
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: Position) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Constant patch feeding pins of `data_type`
    #[must_use]
    pub fn constant_for(&self, data_type: &DataType) -> Option<&PatchPath> {
        match data_type {
            DataType::Number => Some(&self.constants.number),
            DataType::Boolean => Some(&self.constants.boolean),
            DataType::String => Some(&self.constants.string),
            DataType::Pulse => Some(&self.constants.pulse),
            DataType::Custom(_) => None,
        }
    }

    /// Parse a TOML document
    ///
    /// # Errors
    /// [`ConfigError::Toml`] on syntax errors or invalid patch paths.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!("Loaded extraction config from {}", path.display());
        Ok(config)
    }
}

/// Errors while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_map_pulse_to_boolean_constant() {
        let config = ExtractConfig::default();
        assert_eq!(
            config.constant_for(&DataType::Pulse),
            config.constant_for(&DataType::Boolean)
        );
        assert_eq!(config.placeholder, Position::ORIGIN);
        assert!(config
            .constant_for(&DataType::Custom(PatchPath::new("xod/color/rgb").unwrap()))
            .is_none());
    }

    #[test]
    fn toml_overrides_single_entry() {
        let config = ExtractConfig::from_toml_str(
            r#"
            placeholder = { x = 5.0, y = -3.0 }

            [constants]
            pulse = "xod/core/boot"
            "#,
        )
        .unwrap();
        assert_eq!(config.constants.pulse.as_str(), "xod/core/boot");
        assert_eq!(config.constants.number.as_str(), "xod/core/constant-number");
        assert_eq!(config.placeholder, Position::new(5.0, -3.0));
    }

    #[test]
    fn toml_rejects_invalid_paths() {
        let err = ExtractConfig::from_toml_str("[constants]\nnumber = \"bad path\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn builder_matches_toml() {
        let built = ExtractConfig::new()
            .with_constant(&DataType::Pulse, PatchPath::new("xod/core/boot").unwrap());
        let parsed = ExtractConfig::from_toml_str("[constants]\npulse = \"xod/core/boot\"\n").unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[constants]\nstring = \"@/my-string\"").unwrap();
        let config = ExtractConfig::from_file(file.path()).unwrap();
        assert_eq!(config.constants.string.as_str(), "@/my-string");

        let missing = ExtractConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
