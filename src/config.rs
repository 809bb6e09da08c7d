use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use log::{debug, info};
use serde_json::Value;
use crate::host::{ConfigReader, Dependency, HostEnvironment};
use crate::module::ManagerSettings;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "DEVPANEL_CONFIG";

/// Configuration manager: a parsed TOML document addressed by dotted keys
#[derive(Debug, Clone)]
pub struct ConfigManager {
    root: Value,
    config_file_path: Option<PathBuf>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self {
            root: Value::Object(serde_json::Map::new()),
            config_file_path: None,
        }
    }
}

impl ConfigManager {
    /// Build from an already parsed tree (primarily for testing)
    pub fn from_value(root: Value) -> Self {
        Self {
            root,
            config_file_path: None,
        }
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(Self::from_value(parse_toml_config(content)?))
    }

    /// Load configuration using the discovery hierarchy
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");

        for path in discover_config_files() {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        info!("No configuration file found, using empty configuration");
        Ok(Self::default())
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let root = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded configuration from: {}", path.display());
        Ok(Self {
            root,
            config_file_path: Some(path),
        })
    }

    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }

    /// Resolve a dotted key such as `log.file_level`
    pub fn get_value(&self, dotted_key: &str) -> Option<&Value> {
        let mut current = &self.root;
        for part in dotted_key.split('.') {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Get boolean value; strings "true"/"false" are accepted
    pub fn get_bool(&self, dotted_key: &str) -> Result<Option<bool>> {
        match self.get_value(dotted_key) {
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.to_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}: {}", dotted_key, s)),
            },
            Some(other) => Err(anyhow::anyhow!("Invalid boolean value for {}: {}", dotted_key, other)),
            None => Ok(None),
        }
    }

    /// Get log level value with type conversion
    pub fn get_log_level(&self, dotted_key: &str) -> Result<Option<log::LevelFilter>> {
        match self.get_value(dotted_key).and_then(Value::as_str) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    /// Get path value; relative paths resolve against the config file's directory
    pub fn get_path(&self, dotted_key: &str) -> Option<PathBuf> {
        let raw = PathBuf::from(self.get_value(dotted_key)?.as_str()?);
        match self.config_file_path.as_ref().and_then(|p| p.parent()) {
            Some(base) if raw.is_relative() && !base.as_os_str().is_empty() => Some(base.join(raw)),
            _ => Some(raw),
        }
    }

    /// Typed panel settings
    pub fn panel_settings(&self) -> Result<PanelSettings> {
        PanelSettings::from_config(self)
    }
}

impl ConfigReader for ConfigManager {
    fn get(&self, dotted_key: &str, default: Value) -> Value {
        self.get_value(dotted_key).cloned().unwrap_or(default)
    }
}

/// Settings the binary needs to assemble the host services
#[derive(Debug, Clone)]
pub struct PanelSettings {
    /// Option prefix, core modules, default enablement, dispatcher
    pub manager: ManagerSettings,

    /// JSON option store file; in-memory store when absent
    pub options_file: Option<PathBuf>,

    /// Token accepted for the dispatcher's token action
    pub auth_token: Option<String>,

    /// Capabilities held by the local caller
    pub capabilities: Vec<String>,

    /// Host symbol tables consulted for module dependencies
    pub environment: HostEnvironment,

    /// Extra dependency references declared under `host.requires`
    pub declared_dependencies: Vec<Dependency>,
}

impl PanelSettings {
    pub fn from_config(config: &ConfigManager) -> Result<Self> {
        let declared_dependencies = config.get_string_list("host.requires")
            .unwrap_or_default()
            .iter()
            .map(|reference| reference.parse::<Dependency>()
                .with_context(|| format!("Invalid entry in host.requires: {}", reference)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            manager: ManagerSettings::from_config(config),
            options_file: config.get_path("storage.options_file"),
            auth_token: config.get_value("auth.token").and_then(Value::as_str).map(str::to_string),
            capabilities: config.get_string_list("auth.capabilities").unwrap_or_default(),
            environment: HostEnvironment::from_config(config),
            declared_dependencies,
        })
    }

    /// Declared host requirements the environment cannot satisfy
    pub fn unmet_requirements(&self) -> Vec<&Dependency> {
        use crate::host::DependencyResolver;
        self.declared_dependencies.iter()
            .filter(|d| !self.environment.is_available(d))
            .collect()
    }
}

/// Discover configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Environment variable $DEVPANEL_CONFIG
    if let Ok(env_path) = env::var(CONFIG_ENV) {
        paths.push(PathBuf::from(env_path));
    }

    // 2. XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("devpanel").join("config.toml"));
    }

    // 3. Home directory
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".devpanel.toml"));
    }

    // 4. Project local
    paths.push(PathBuf::from("./.devpanel.toml"));

    debug!("Config discovery paths: {:?}", paths);
    paths
}

/// Parse TOML content into a JSON-shaped tree
fn parse_toml_config(content: &str) -> Result<Value> {
    let table: toml::Table = content.parse()
        .context("Failed to parse TOML content")?;
    serde_json::to_value(table).context("Failed to convert TOML document")
}
