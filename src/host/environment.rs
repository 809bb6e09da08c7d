//! Host Environment
//!
//! Typed dependency references, the symbol tables they resolve against,
//! and detection of a test-execution context.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use super::error::HostError;
use super::traits::{ConfigReader, DependencyResolver};

/// Environment marker that forces the test-execution context
pub const TEST_MODE_ENV: &str = "DEVPANEL_TEST_MODE";

/// Program names of recognized test runners. cargo test harness binaries
/// are named <crate>-<16 hex digit hash>.
const TEST_RUNNER_PATTERN: &str = r"^(phpunit|cargo-nextest|nextest|[A-Za-z0-9_]+-[0-9a-f]{16})$";

static TEST_RUNNER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(TEST_RUNNER_PATTERN).expect("Invalid test runner regex")
});

/// An external resource a module requires in order to run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Dependency {
    /// A callable exposed by the host (`function:X`)
    FunctionAvailable(String),
    /// A type known to the host (`type:X`, legacy `class:X`)
    TypeAvailable(String),
    /// A host plugin that must be active (`host-plugin:X`)
    HostPluginActive(String),
    /// A native extension that must be loaded (`native-extension:X`)
    NativeExtensionLoaded(String),
}

impl Dependency {
    pub fn function<S: Into<String>>(name: S) -> Self {
        Self::FunctionAvailable(name.into())
    }

    pub fn type_name<S: Into<String>>(name: S) -> Self {
        Self::TypeAvailable(name.into())
    }

    pub fn host_plugin<S: Into<String>>(name: S) -> Self {
        Self::HostPluginActive(name.into())
    }

    pub fn native_extension<S: Into<String>>(name: S) -> Self {
        Self::NativeExtensionLoaded(name.into())
    }

    /// Symbol name without the kind prefix
    pub fn name(&self) -> &str {
        match self {
            Self::FunctionAvailable(n)
            | Self::TypeAvailable(n)
            | Self::HostPluginActive(n)
            | Self::NativeExtensionLoaded(n) => n,
        }
    }

    /// Textual kind prefix
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FunctionAvailable(_) => "function",
            Self::TypeAvailable(_) => "type",
            Self::HostPluginActive(_) => "host-plugin",
            Self::NativeExtensionLoaded(_) => "native-extension",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.name())
    }
}

impl FromStr for Dependency {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s.split_once(':')
            .ok_or_else(|| HostError::invalid_dependency(s))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(HostError::invalid_dependency(s));
        }
        match kind.trim().to_lowercase().as_str() {
            "function" => Ok(Self::function(name)),
            "type" | "class" => Ok(Self::type_name(name)),
            "host-plugin" | "plugin" => Ok(Self::host_plugin(name)),
            "native-extension" | "extension" => Ok(Self::native_extension(name)),
            _ => Err(HostError::invalid_dependency(s)),
        }
    }
}

/// Symbol tables of the host, one per dependency kind
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    functions: HashSet<String>,
    types: HashSet<String>,
    active_plugins: HashSet<String>,
    extensions: HashSet<String>,
}

impl HostEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the tables from the `host.*` configuration lists
    pub fn from_config(config: &dyn ConfigReader) -> Self {
        let table = |key: &str| -> HashSet<String> {
            config.get_string_list(key).unwrap_or_default().into_iter().collect()
        };
        Self {
            functions: table("host.functions"),
            types: table("host.types"),
            active_plugins: table("host.plugins"),
            extensions: table("host.extensions"),
        }
    }

    pub fn with_function<S: Into<String>>(mut self, name: S) -> Self {
        self.functions.insert(name.into());
        self
    }

    pub fn with_type<S: Into<String>>(mut self, name: S) -> Self {
        self.types.insert(name.into());
        self
    }

    pub fn with_active_plugin<S: Into<String>>(mut self, name: S) -> Self {
        self.active_plugins.insert(name.into());
        self
    }

    pub fn with_extension<S: Into<String>>(mut self, name: S) -> Self {
        self.extensions.insert(name.into());
        self
    }

    /// Strategy table: which symbol set answers for each dependency kind
    fn table_for(&self, dependency: &Dependency) -> &HashSet<String> {
        match dependency {
            Dependency::FunctionAvailable(_) => &self.functions,
            Dependency::TypeAvailable(_) => &self.types,
            Dependency::HostPluginActive(_) => &self.active_plugins,
            Dependency::NativeExtensionLoaded(_) => &self.extensions,
        }
    }
}

impl DependencyResolver for HostEnvironment {
    fn is_available(&self, dependency: &Dependency) -> bool {
        self.table_for(dependency).contains(dependency.name())
    }
}

/// Whether the process is running under a recognized test harness.
/// Under `Testing`, capability checks in `can_run` are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionContext {
    #[default]
    Normal,
    Testing,
}

impl ExecutionContext {
    /// Detect from the process environment and invocation
    pub fn detect() -> Self {
        let marker = std::env::var(TEST_MODE_ENV).ok();
        let program = std::env::args().next();
        Self::from_markers(marker.as_deref(), program.as_deref())
    }

    /// Classify explicit markers: an env marker value and the program path
    pub fn from_markers(env_marker: Option<&str>, program: Option<&str>) -> Self {
        if let Some(value) = env_marker {
            if matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on") {
                return Self::Testing;
            }
        }

        if let Some(program) = program {
            if is_test_runner_invocation(program) {
                return Self::Testing;
            }
        }

        Self::Normal
    }

    pub fn is_testing(&self) -> bool {
        matches!(self, Self::Testing)
    }
}

fn is_test_runner_invocation(program: &str) -> bool {
    let name = std::path::Path::new(program)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(program);

    TEST_RUNNER_REGEX.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_parsing() {
        assert_eq!("function:cache_flush".parse::<Dependency>().unwrap(), Dependency::function("cache_flush"));
        assert_eq!("type:Renderer".parse::<Dependency>().unwrap(), Dependency::type_name("Renderer"));
        assert_eq!("class:Renderer".parse::<Dependency>().unwrap(), Dependency::type_name("Renderer"));
        assert_eq!("host-plugin:woo".parse::<Dependency>().unwrap(), Dependency::host_plugin("woo"));
        assert_eq!("native-extension:xdebug".parse::<Dependency>().unwrap(), Dependency::native_extension("xdebug"));

        assert!("nonsense".parse::<Dependency>().is_err());
        assert!("function:".parse::<Dependency>().is_err());
        assert!("widget:thing".parse::<Dependency>().is_err());
    }

    #[test]
    fn test_dependency_display() {
        assert_eq!(Dependency::host_plugin("woo").to_string(), "host-plugin:woo");
        assert_eq!(Dependency::type_name("Renderer").to_string(), "type:Renderer");
    }

    #[test]
    fn test_environment_resolution() {
        let env = HostEnvironment::new()
            .with_function("cache_flush")
            .with_type("Renderer")
            .with_active_plugin("woo")
            .with_extension("xdebug");

        assert!(env.is_available(&Dependency::function("cache_flush")));
        assert!(env.is_available(&Dependency::type_name("Renderer")));
        assert!(env.is_available(&Dependency::host_plugin("woo")));
        assert!(env.is_available(&Dependency::native_extension("xdebug")));

        assert!(!env.is_available(&Dependency::function("nonexistent_fn")));
        // Tables are kind-specific
        assert!(!env.is_available(&Dependency::type_name("cache_flush")));
    }

    #[test]
    fn test_execution_context_markers() {
        assert_eq!(ExecutionContext::from_markers(Some("1"), None), ExecutionContext::Testing);
        assert_eq!(ExecutionContext::from_markers(Some("TRUE"), None), ExecutionContext::Testing);
        assert_eq!(ExecutionContext::from_markers(Some("0"), None), ExecutionContext::Normal);
        assert_eq!(ExecutionContext::from_markers(None, Some("/usr/bin/phpunit")), ExecutionContext::Testing);
        assert_eq!(
            ExecutionContext::from_markers(None, Some("target/debug/deps/devpanel-0123456789abcdef")),
            ExecutionContext::Testing
        );
        assert_eq!(ExecutionContext::from_markers(None, Some("/usr/local/bin/devpanel")), ExecutionContext::Normal);
        assert_eq!(ExecutionContext::from_markers(None, None), ExecutionContext::Normal);
    }

    #[test]
    fn test_runner_pattern_compiles() {
        assert!(Regex::new(TEST_RUNNER_PATTERN).is_ok());
        assert!(is_test_runner_invocation("cargo-nextest"));
        assert!(!is_test_runner_invocation("devpanel-0123"));
    }
}
