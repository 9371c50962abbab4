//! Compiler configuration.
//!
//! Loads config from:
//! 1. Global: ~/.config/polygolf/config.toml
//! 2. Per-project: .polygolf/config.toml (overrides global)
//!
//! Example config.toml:
//! ```toml
//! [variants]
//! parallel = true
//! max = 4096
//!
//! [output]
//! target = "lua"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Failure to read or parse a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Variant expansion and selection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VariantsConfig {
    /// Compile concrete programs in parallel.
    pub parallel: bool,
    /// Refuse programs expanding to more concrete programs than this.
    pub max: Option<usize>,
}

impl Default for VariantsConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max: None,
        }
    }
}

/// Output settings used by the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Target language used when none is given.
    pub target: Option<String>,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    pub variants: VariantsConfig,
    pub output: OutputConfig,
}

impl CompileConfig {
    /// Load configuration for a project.
    ///
    /// Reads the global config, then the per-project `.polygolf/config.toml`
    /// under `root`. Missing files are skipped; unreadable or invalid ones are
    /// errors.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::load_optional(&global_path)? {
                config = global;
            }
        }

        let project_path = root.join(".polygolf").join("config.toml");
        if let Some(project) = Self::load_optional(&project_path)? {
            config = config.merge(project);
        }

        Ok(config)
    }

    /// Load a single config file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    fn load_optional(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load_file(path).map(Some)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the global config path.
    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("polygolf").join("config.toml"))
    }

    /// Merge another config into this one; `other` wins field by field
    /// wherever it sets an optional value.
    fn merge(self, other: Self) -> Self {
        Self {
            variants: VariantsConfig {
                parallel: other.variants.parallel,
                max: other.variants.max.or(self.variants.max),
            },
            output: OutputConfig {
                target: other.output.target.or(self.output.target),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_project_config(dir: &TempDir, content: &str) {
        let config_dir = dir.path().join(".polygolf");
        std::fs::create_dir_all(&config_dir).unwrap();
        let mut file = std::fs::File::create(config_dir.join("config.toml")).unwrap();
        writeln!(file, "{content}").unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = CompileConfig::default();
        assert!(config.variants.parallel);
        assert_eq!(config.variants.max, None);
        assert_eq!(config.output.target, None);
    }

    #[test]
    fn test_load_project_config() {
        let dir = TempDir::new().unwrap();
        write_project_config(
            &dir,
            r#"
[variants]
parallel = false
max = 16

[output]
target = "lua"
"#,
        );

        let path = dir.path().join(".polygolf").join("config.toml");
        let config = CompileConfig::load_file(&path).unwrap();
        assert!(!config.variants.parallel);
        assert_eq!(config.variants.max, Some(16));
        assert_eq!(config.output.target.as_deref(), Some("lua"));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        write_project_config(&dir, "[output]\ntarget = \"csharp\"\n");

        let path = dir.path().join(".polygolf").join("config.toml");
        let config = CompileConfig::load_file(&path).unwrap();
        assert!(config.variants.parallel);
        assert_eq!(config.variants.max, None);
        assert_eq!(config.output.target.as_deref(), Some("csharp"));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_project_config(&dir, "[variants]\nparallel = \"yes\"\n");

        let err = CompileConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("Invalid config"));
    }

    #[test]
    fn test_missing_project_config_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".polygolf").join("config.toml");
        assert!(CompileConfig::load_optional(&path).unwrap().is_none());
    }

    #[test]
    fn test_merge_prefers_project_values() {
        let global = CompileConfig {
            variants: VariantsConfig {
                parallel: true,
                max: Some(100),
            },
            output: OutputConfig {
                target: Some("lua".into()),
            },
        };
        let project = CompileConfig {
            variants: VariantsConfig {
                parallel: false,
                max: None,
            },
            output: OutputConfig::default(),
        };
        let merged = global.merge(project);
        assert!(!merged.variants.parallel);
        assert_eq!(merged.variants.max, Some(100));
        assert_eq!(merged.output.target.as_deref(), Some("lua"));
    }
}
