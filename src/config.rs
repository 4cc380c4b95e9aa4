//! Runtime configuration types.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Output format for `tinyjit dump`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpFormat {
    /// Offset, hex bytes and Intel syntax per line
    #[default]
    Human,
    /// One JSON document
    Json,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Runtime configuration for code generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitConfig {
    /// Minimum size of each executable region in bytes (rounded up to a page)
    pub arena_size: usize,
    /// Log every encoded instruction and memory transition
    pub trace_jit: bool,
    pub dump_format: DumpFormat,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            arena_size: 4096,
            trace_jit: false,
            dump_format: DumpFormat::Human,
        }
    }
}

impl JitConfig {
    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = JitConfig::default();
        assert_eq!(config.arena_size, 4096);
        assert!(!config.trace_jit);
        assert_eq!(config.dump_format, DumpFormat::Human);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: JitConfig = toml::from_str("trace_jit = true").unwrap();
        assert!(config.trace_jit);
        assert_eq!(config.arena_size, 4096);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "arena_size = 8192\ndump_format = \"json\"").unwrap();

        let config = JitConfig::load(file.path()).unwrap();
        assert_eq!(config.arena_size, 8192);
        assert_eq!(config.dump_format, DumpFormat::Json);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = JitConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "arena_size = \"big\"").unwrap();

        let err = JitConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("failed to parse"));
    }

    #[test]
    fn test_round_trip_pretty() {
        let config = JitConfig {
            arena_size: 16384,
            trace_jit: true,
            dump_format: DumpFormat::Json,
        };
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(toml::from_str::<JitConfig>(&text).unwrap(), config);
    }
}
