//! TOML-based configuration for Tributary.
//!
//! Supports a config file (tributary.toml) with environment variable
//! expansion in site values.
//!
//! Example configuration:
//! ```toml
//! [defaults]
//! item_key = "site"
//! start_date = "2024-01-01"
//! end_date = "2024-01-31"
//! limit = 10000
//!
//! [[sites]]
//! site = "alpha"
//! url = "https://alpha.example.com"
//! cv = "goal_2"
//! token = "${ALPHA_API_TOKEN}"
//!
//! [[sites]]
//! site = "beta"
//! url = "https://beta.example.com"
//! cv = "goal_7"
//! min_impressions = 50
//! ```
//!
//! Site tables are free-form: any key is allowed, and every key is reachable
//! from a query through `site.<key>` field references.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::frame::Value;
use crate::query::{RunOptions, Site};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("unknown site `{0}`")]
    UnknownSite(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Query defaults applied when the caller does not override them.
    pub defaults: Defaults,

    /// The site table.
    pub sites: Vec<Site>,
}

/// Query defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Defaults {
    /// Site-table key carrying each site's identifier.
    pub item_key: String,

    /// Default report window start (inclusive), `YYYY-MM-DD`.
    pub start_date: Option<String>,

    /// Default report window end (inclusive), `YYYY-MM-DD`.
    pub end_date: Option<String>,

    /// Default per-call row limit.
    pub limit: Option<usize>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            item_key: "site".to_string(),
            start_date: None,
            end_date: None,
            limit: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse settings from TOML text and expand environment variables in
    /// site string values.
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = toml::from_str(content)?;
        settings.sites = settings
            .sites
            .iter()
            .map(expand_site)
            .collect::<Result<_, _>>()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `TRIBUTARY_CONFIG`
    /// 2. `./tributary.toml`
    /// 3. `~/.config/tributary/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("TRIBUTARY_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("tributary.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tributary").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Get a site by identifier.
    pub fn site(&self, id: &str) -> Result<&Site, SettingsError> {
        self.sites
            .iter()
            .find(|site| site.identifier(&self.defaults.item_key).as_deref() == Some(id))
            .ok_or_else(|| SettingsError::UnknownSite(id.to_string()))
    }

    /// Select sites by identifier, in the requested order. An empty request
    /// means the whole table.
    pub fn select_sites(&self, ids: &[String]) -> Result<Vec<Site>, SettingsError> {
        if ids.is_empty() {
            return Ok(self.sites.clone());
        }
        ids.iter().map(|id| self.site(id).cloned()).collect()
    }

    /// Run options seeded from the configured defaults.
    pub fn run_options(&self) -> RunOptions {
        let mut options = RunOptions::new().with_item_key(self.defaults.item_key.as_str());
        if let Some(start) = &self.defaults.start_date {
            options = options.with_start_date(start.as_str());
        }
        if let Some(end) = &self.defaults.end_date {
            options = options.with_end_date(end.as_str());
        }
        if let Some(limit) = self.defaults.limit {
            options = options.with_limit(limit);
        }
        options
    }
}

fn expand_site(site: &Site) -> Result<Site, SettingsError> {
    let mut expanded = Site::new();
    for (key, value) in site.entries() {
        let value = match value {
            Value::Str(s) => Value::Str(expand_env_vars(s)?),
            other => other.clone(),
        };
        expanded.insert(key, value);
    }
    Ok(expanded)
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    fn lookup(name: &str) -> Result<String, SettingsError> {
        env::var(name).map_err(|_| SettingsError::MissingEnvVar(name.to_string()))
    }

    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        if chars.peek() == Some(&'{') {
            chars.next();
            let mut name = String::new();
            while let Some(ch) = chars.next() {
                if ch == '}' {
                    break;
                }
                name.push(ch);
            }
            result.push_str(&lookup(&name)?);
        } else {
            // $VAR runs until the first non-alphanumeric/underscore
            let mut name = String::new();
            while let Some(&ch) = chars.peek() {
                if !ch.is_alphanumeric() && ch != '_' {
                    break;
                }
                name.push(ch);
                chars.next();
            }
            if name.is_empty() {
                // lone $
                result.push('$');
            } else {
                result.push_str(&lookup(&name)?);
            }
        }
    }

    Ok(result)
}
