// Mon Oct 19 2026 - Alex

use crate::memory::{DEFAULT_MAX_PROBE_LEN, WORD_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

const PROBE_LEN_CEILING: usize = 65536;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Heuristic knobs for classification and introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Object addresses must be a multiple of this.
    pub pointer_alignment: usize,
    /// Anything below this is rejected without probing (the null page and its neighbours).
    pub min_object_address: usize,
    /// Applied to the header word before class lookup, for runtimes that pack bits into it.
    pub isa_mask: usize,
    pub max_probe_len: usize,
    pub max_ancestor_depth: usize,
    pub check_allocation_size: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pointer_alignment: WORD_SIZE,
            min_object_address: 4096,
            isa_mask: usize::MAX,
            max_probe_len: DEFAULT_MAX_PROBE_LEN,
            max_ancestor_depth: 64,
            check_allocation_size: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pointer_alignment(mut self, alignment: usize) -> Self {
        self.pointer_alignment = alignment;
        self
    }

    pub fn with_min_object_address(mut self, address: usize) -> Self {
        self.min_object_address = address;
        self
    }

    pub fn with_isa_mask(mut self, mask: usize) -> Self {
        self.isa_mask = mask;
        self
    }

    pub fn with_max_probe_len(mut self, len: usize) -> Self {
        self.max_probe_len = len;
        self
    }

    pub fn with_max_ancestor_depth(mut self, depth: usize) -> Self {
        self.max_ancestor_depth = depth;
        self
    }

    pub fn with_allocation_check(mut self, enabled: bool) -> Self {
        self.check_allocation_size = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.pointer_alignment == 0 || !self.pointer_alignment.is_power_of_two() {
            return Err("pointer_alignment must be a nonzero power of two".to_string());
        }
        if self.max_probe_len < WORD_SIZE || self.max_probe_len > PROBE_LEN_CEILING {
            return Err(format!(
                "max_probe_len must be between {} and {}",
                WORD_SIZE, PROBE_LEN_CEILING
            ));
        }
        if self.max_ancestor_depth == 0 {
            return Err("max_ancestor_depth must be greater than 0".to_string());
        }
        if self.isa_mask == 0 {
            return Err("isa_mask must keep at least one bit".to_string());
        }
        Ok(())
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(Config::new().with_pointer_alignment(3).validate().is_err());
        assert!(Config::new().with_pointer_alignment(0).validate().is_err());
        assert!(Config::new().with_max_probe_len(1).validate().is_err());
        assert!(Config::new().with_max_probe_len(1 << 20).validate().is_err());
        assert!(Config::new().with_max_ancestor_depth(0).validate().is_err());
        assert!(Config::new().with_isa_mask(0).validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = Config::from_json_str(r#"{ "min_object_address": 65536, "check_allocation_size": false }"#).unwrap();
        assert_eq!(config.min_object_address, 65536);
        assert!(!config.check_allocation_size);
        assert_eq!(config.max_ancestor_depth, 64);
    }

    #[test]
    fn test_invalid_json_values() {
        assert!(matches!(
            Config::from_json_str(r#"{ "pointer_alignment": 6 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(Config::from_json_str("{"), Err(ConfigError::Parse(_))));
    }
}
