use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::extract::rules::{default_registry_expansions, ExtractionRules, NameExpansionTable};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub extraction: ExtractionRules,
    pub validation: ValidationConfig,
}

/// Where the specification document comes from
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Well-known URL of the rendered specification.
    pub url: String,
    /// Local copy; fetched from `url` on first run and reused afterwards.
    pub cache_path: PathBuf,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            cache_path: PathBuf::from("./stix-v2.1-os.html"),
            timeout_secs: 60,
        }
    }
}

fn default_source_url() -> String {
    "https://docs.oasis-open.org/cti/stix/v2.1/os/stix-v2.1-os.html".to_string()
}

/// Adjacency JSON output
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub indent: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data.json"),
            indent: 4,
        }
    }
}

/// Registry cross-check configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Expansion table applied to record names before searching the registry.
    pub name_expansions: NameExpansionTable,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            name_expansions: default_registry_expansions(),
        }
    }
}

const MAX_INDENT: usize = 16;

impl Config {
    /// Load configuration
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config in this order:
    /// 1. Path specified in STIXREL_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory
    /// 3. Built-in defaults
    pub fn load() -> Result<Self> {
        // Optional; missing .env is not an error
        let _ = dotenv::dotenv();

        let config = match std::env::var("STIXREL_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let local = PathBuf::from("config.toml");
                if local.is_file() {
                    Self::from_file(&local)?
                } else {
                    log::debug!("No config file found, using built-in defaults");
                    Config::default()
                }
            }
        };

        config.validate()?;

        Ok(config)
    }

    /// Parse a config file without validating it
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.source.url)
            .with_context(|| format!("source.url is not a valid URL: {}", self.source.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("source.url must use http or https, got {}", url.scheme());
        }

        if self.source.timeout_secs == 0 {
            anyhow::bail!("source.timeout_secs must be greater than 0");
        }

        if self.output.indent > MAX_INDENT {
            anyhow::bail!("output.indent must be at most {}", MAX_INDENT);
        }

        if let Some(selector) = &self.extraction.summary_table_selector {
            scraper::Selector::parse(selector).map_err(|e| {
                anyhow::anyhow!(
                    "extraction.summary_table_selector is invalid ({}): {}",
                    selector,
                    e
                )
            })?;
        }

        Ok(())
    }

    /// Get the document cache path
    pub fn cache_path(&self) -> &Path {
        &self.source.cache_path
    }

    /// Get the adjacency JSON output path
    pub fn output_path(&self) -> &Path {
        &self.output.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide cwd and env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const TEST_CONFIG: &str = r#"
[source]
url = "https://example.org/spec.html"
cache_path = "./cached.html"
timeout_secs = 5

[output]
path = "graph.json"
indent = 2

[extraction]
simple_types = ["hex"]
summary_table_selector = "table.summary"

[validation.name_expansions]
"file" = ["StixFile"]
"#;

    /// Restores cwd when dropped (e.g. on panic).
    struct CwdGuard(PathBuf);
    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.0);
        }
    }

    fn with_config_env(config_path: Option<&Path>, f: impl FnOnce()) {
        let original = std::env::var("STIXREL_CONFIG").ok();
        match config_path {
            Some(p) => std::env::set_var("STIXREL_CONFIG", p.to_str().unwrap()),
            None => std::env::remove_var("STIXREL_CONFIG"),
        }
        f();
        std::env::remove_var("STIXREL_CONFIG");
        if let Some(val) = original {
            std::env::set_var("STIXREL_CONFIG", val);
        }
    }

    #[test]
    fn test_config_load_from_env_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("stixrel.toml");
        fs::write(&config_path, TEST_CONFIG).unwrap();
        with_config_env(Some(&config_path), || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.source.timeout_secs, 5);
            assert_eq!(config.output_path(), Path::new("graph.json"));
            assert_eq!(config.output.indent, 2);
            assert_eq!(config.extraction.simple_types, vec!["hex".to_string()]);
            assert_eq!(
                config.extraction.summary_table_selector.as_deref(),
                Some("table.summary")
            );
            assert_eq!(
                config.validation.name_expansions.get("file"),
                Some(&["StixFile".to_string()][..])
            );
            // Untouched sections keep their defaults
            assert!(!config.extraction.overrides.is_empty());
        });
    }

    #[test]
    fn test_config_defaults_without_file() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        let _cwd = CwdGuard(original_dir);
        std::env::set_current_dir(temp_dir.path()).unwrap();
        with_config_env(None, || {
            let config = Config::load().unwrap();
            assert_eq!(config.output_path(), Path::new("data.json"));
            assert_eq!(config.output.indent, 4);
            assert_eq!(config.cache_path(), Path::new("./stix-v2.1-os.html"));
            assert!(config.source.url.starts_with("https://docs.oasis-open.org/"));
        });
    }

    #[test]
    fn test_config_local_file_is_picked_up() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let local = temp_dir.path().join("config.toml");
        fs::write(local, "[output]\npath = \"local.json\"\n").unwrap();
        let original_dir = std::env::current_dir().unwrap();
        let _cwd = CwdGuard(original_dir);
        std::env::set_current_dir(temp_dir.path()).unwrap();
        with_config_env(None, || {
            let config = Config::load().unwrap();
            assert_eq!(config.output_path(), Path::new("local.json"));
            assert_eq!(config.output.indent, 4);
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_config_env(Some(Path::new("nonexistent.toml")), || {
            let config = Config::load();
            assert!(config.is_err());
            assert!(config.unwrap_err().to_string().contains("nonexistent.toml"));
        });
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let mut config = Config::default();
        config.source.url = "ftp://example.org/spec.html".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.indent = 64;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.extraction.summary_table_selector = Some("table[".to_string());
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        let result: std::result::Result<Config, _> =
            toml::from_str("[output]\nformat = \"yaml\"\n");
        assert!(result.is_err());
    }
}
