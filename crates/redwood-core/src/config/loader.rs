//! Configuration file discovery and loading

use std::fs;
use std::path::{Path, PathBuf};

use super::tree_config::TreeConfig;
use crate::error::RedwoodError;
use crate::result::Result;

/// Config file names, in priority order
const CONFIG_FILES: &[&str] = &[".redwood.toml", "redwood.json"];

/// Configuration loader for discovering and loading config files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Auto-discover a config file by traversing upward from `start_path`
    ///
    /// In each directory `.redwood.toml` wins over `redwood.json`. Returns
    /// `None` once the filesystem root is reached without a match.
    pub fn auto_discover(start_path: &Path) -> Result<Option<PathBuf>> {
        let mut current = start_path
            .canonicalize()
            .map_err(|e| RedwoodError::config_error(format!("Invalid path: {e}")))?;

        loop {
            for filename in CONFIG_FILES {
                let config_path = current.join(filename);
                if config_path.is_file() {
                    tracing::debug!("Found config: {}", config_path.display());
                    return Ok(Some(config_path));
                }
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    /// Load configuration from a specific file, by extension
    pub fn load_from_file(path: &Path) -> Result<TreeConfig> {
        let content = fs::read_to_string(path).map_err(|e| RedwoodError::io_error(path, e))?;
        let config: TreeConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| {
                RedwoodError::config_error(format!(
                    "Failed to load config from '{}': {e}",
                    path.display()
                ))
            })?,
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                RedwoodError::config_error(format!(
                    "Failed to load config from '{}': {e}",
                    path.display()
                ))
            })?,
            _ => {
                return Err(RedwoodError::config_error(format!(
                    "Unsupported config file '{}' (expected .toml or .json)",
                    path.display()
                )));
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load config from an explicit path, or discover one
    ///
    /// An explicit path must exist. Without one, discovery starts from
    /// `start_dir` (or the current directory) and falls back to defaults when
    /// no file is found.
    pub fn load(custom_path: Option<&Path>, start_dir: Option<&Path>) -> Result<TreeConfig> {
        if let Some(path) = custom_path {
            if !path.exists() {
                return Err(RedwoodError::config_error(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::load_from_file(path);
        }

        let search_dir = start_dir.unwrap_or_else(|| Path::new("."));
        match Self::auto_discover(search_dir)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(TreeConfig::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_temp_config(dir: &Path, filename: &str, content: &str) -> PathBuf {
        let path = dir.join(filename);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_from_file_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_temp_config(temp_dir.path(), ".redwood.toml", "indent_unit = \"  \"\n");

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.indent_unit, "  ");
        assert!(config.single_tuple_comma);
    }

    #[test]
    fn test_load_from_file_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_temp_config(
            temp_dir.path(),
            "redwood.json",
            r#"{"single_tuple_comma": false}"#,
        );

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert!(!config.single_tuple_comma);
    }

    #[test]
    fn test_auto_discover() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("src/nested");
        fs::create_dir_all(&nested).unwrap();
        create_temp_config(temp_dir.path(), "redwood.json", "{}");

        let found = ConfigLoader::auto_discover(&nested).unwrap();
        assert_eq!(found.unwrap().file_name().unwrap(), "redwood.json");
    }

    #[test]
    fn test_auto_discover_priority() {
        let temp_dir = TempDir::new().unwrap();
        create_temp_config(temp_dir.path(), "redwood.json", "{}");
        create_temp_config(temp_dir.path(), ".redwood.toml", "");

        let found = ConfigLoader::auto_discover(temp_dir.path()).unwrap();
        assert_eq!(found.unwrap().file_name().unwrap(), ".redwood.toml");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Some(Path::new("nonexistent.toml")), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_temp_config(temp_dir.path(), "redwood.json", "{ invalid json }");
        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_invalid_indent_unit_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_temp_config(temp_dir.path(), ".redwood.toml", "indent_unit = \"x\"");
        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(matches!(err, RedwoodError::Config { .. }));
    }
}
