//! # Core Configuration
//!
//! Bank and structure storage settings, read once at startup from TOML.
//!
//! ```toml
//! [bank]
//! default_segment_size = 32
//! not_expandable = false
//!
//! [structure]
//! storage_bank_size = 256
//!
//! [[structure.types]]
//! id = "frame"
//! storage = "tree"
//! memory = "main"
//! bank_size = 1024
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::memory::{BankFlags, MemoryType, CACHE_LINE_SIZE};
use crate::object::{StorageKind, StructureId};

/// Default cells per segment for structure header banks.
pub const DEFAULT_SEGMENT_SIZE: u32 = 32;

/// Default cells per segment for storage node banks.
pub const DEFAULT_STORAGE_BANK_SIZE: u32 = 256;

/// Root configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Bank defaults.
    pub bank: BankConfig,
    /// Structure storage settings.
    pub structure: StructureConfig,
}

/// Bank defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BankConfig {
    /// Cells per segment when a type doesn't set its own.
    pub default_segment_size: u32,
    /// Expected cache line size. Layout uses the compile-time value; a
    /// mismatch is only reported.
    pub cache_line_size: usize,
    /// Forbids structure header banks from growing past one segment.
    pub not_expandable: bool,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            default_segment_size: DEFAULT_SEGMENT_SIZE,
            cache_line_size: CACHE_LINE_SIZE,
            not_expandable: false,
        }
    }
}

impl BankConfig {
    /// Returns the creation flags matching this configuration.
    #[must_use]
    pub fn flags(&self) -> BankFlags {
        if self.not_expandable {
            BankFlags::NOT_EXPANDABLE
        } else {
            BankFlags::empty()
        }
    }
}

/// Structure storage settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StructureConfig {
    /// Cells per segment of every storage node bank.
    pub storage_bank_size: u32,
    /// Types registered up front.
    pub types: Vec<StructureTypeConfig>,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            storage_bank_size: DEFAULT_STORAGE_BANK_SIZE,
            types: Vec::new(),
        }
    }
}

/// Registration of one structure type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructureTypeConfig {
    /// Structure type.
    pub id: StructureId,
    /// Storage backend.
    pub storage: StorageKind,
    /// Memory tag of the type's banks.
    #[serde(default)]
    pub memory: MemoryType,
    /// Cells per segment of the header bank, `bank.default_segment_size` if unset.
    #[serde(default)]
    pub bank_size: Option<u32>,
}

impl CoreConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys, and
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file can't be read, otherwise the
    /// errors of [`CoreConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        debug!(path = %path.display(), types = config.structure.types.len(), "core config loaded");
        Ok(config)
    }

    /// Checks value ranges and duplicate registrations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.bank.default_segment_size == 0 {
            return Err(ConfigError::Invalid(
                "bank.default_segment_size must be greater than zero".into(),
            ));
        }
        if !self.bank.cache_line_size.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "bank.cache_line_size must be a power of two, got {}",
                self.bank.cache_line_size
            )));
        }
        if self.bank.cache_line_size != CACHE_LINE_SIZE {
            debug!(
                configured = self.bank.cache_line_size,
                actual = CACHE_LINE_SIZE,
                "configured cache line size differs from the target's"
            );
        }
        if self.structure.storage_bank_size == 0 {
            return Err(ConfigError::Invalid(
                "structure.storage_bank_size must be greater than zero".into(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.structure.types {
            if !seen.insert(entry.id) {
                return Err(ConfigError::Invalid(format!(
                    "structure type {} is configured twice",
                    entry.id
                )));
            }
            if entry.bank_size == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "bank_size of structure type {} must be greater than zero",
                    entry.id
                )));
            }
        }
        Ok(())
    }

    /// Returns the header bank segment size of a configured type.
    #[must_use]
    pub fn bank_size_of(&self, entry: &StructureTypeConfig) -> u32 {
        entry.bank_size.unwrap_or(self.bank.default_segment_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.structure.storage_bank_size, 256);
        assert_eq!(config.bank.flags(), BankFlags::empty());
    }

    #[test]
    fn test_types_parse() {
        let config = CoreConfig::from_toml_str(
            r#"
            [bank]
            default_segment_size = 16
            not_expandable = true

            [[structure.types]]
            id = "frame"
            storage = "tree"
            bank_size = 64

            [[structure.types]]
            id = "fx_pointer"
            storage = "list"
            memory = "temp"
            "#,
        )
        .unwrap();

        assert_eq!(config.bank.flags(), BankFlags::NOT_EXPANDABLE);
        let [frame, fx] = config.structure.types.as_slice() else {
            panic!("expected two types");
        };
        assert_eq!((frame.id, frame.storage), (StructureId::Frame, StorageKind::Tree));
        assert_eq!(config.bank_size_of(frame), 64);
        assert_eq!(fx.memory, MemoryType::Temp);
        assert_eq!(config.bank_size_of(fx), 16);
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let result = CoreConfig::from_toml_str(
            r#"
            [[structure.types]]
            id = "body"
            storage = "list"

            [[structure.types]]
            id = "body"
            storage = "tree"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(matches!(
            CoreConfig::from_toml_str("[structure]\nstorage_bank_size = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CoreConfig::from_toml_str("[bank]\ncache_line_size = 48"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            CoreConfig::from_toml_str("[bank]\nsegment = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/orx.toml");
        let config = CoreConfig::load(path).unwrap();
        assert!(!config.structure.types.is_empty());
    }
}
