use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Represents a parsed dash.toml file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub check: CheckConfig,
}

/// The [schema] section: where the schema description lives.
#[derive(Debug, Default, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Overrides the schema's own `queryType`.
    #[serde(default)]
    pub query_type: Option<String>,
}

/// The [check] section.
#[derive(Debug, Deserialize)]
pub struct CheckConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig {
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Read and parse a dash.toml from a file path.
    pub fn from_file(path: &Path) -> Result<Config, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_str(&content)
    }

    /// Parse a dash.toml from a string.
    pub fn from_str(content: &str) -> Result<Config, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Load `path` if given, else `dash.toml` in the working directory if
    /// present, else the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config, String> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let local = Path::new("dash.toml");
                if local.exists() {
                    Self::from_file(local)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }
}
