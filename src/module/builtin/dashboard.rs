//! Dashboard Module
//!
//! Panel overview: liveness ping and a summary of the running build.

use chrono::{DateTime, Local};
use serde_json::{json, Value};
use crate::command::Command;
use crate::host::HostServices;
use crate::module::base::ModuleBehavior;
use crate::module::config::ModuleConfig;
use crate::module::error::ModuleResult;
use crate::module::traits::ModuleInfo;
use crate::module::version::{get_api_version, version_to_date_string};

pub const NAME: &str = "dashboard";

#[derive(Debug, Default)]
pub struct DashboardModule {
    started_at: Option<DateTime<Local>>,
}

impl DashboardModule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModuleBehavior for DashboardModule {
    fn info(&self) -> ModuleInfo {
        ModuleInfo::new(NAME, "Dashboard")
            .with_description("Panel overview and health checks")
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_capability("manage_options")
    }

    fn default_config(&self) -> ModuleConfig {
        ModuleConfig::new().with("show_environment", json!(true))
    }

    fn initialize_module(&mut self, _config: &ModuleConfig, _host: &HostServices) -> ModuleResult<()> {
        self.started_at = Some(Local::now());
        Ok(())
    }

    fn cleanup_module(&mut self) {
        self.started_at = None;
    }

    fn commands(&self, config: &ModuleConfig) -> Vec<Command> {
        let started_at = self.started_at.map(|t| t.to_rfc3339());
        let show_environment = config.get_bool("show_environment").unwrap_or(true);

        vec![
            Command::new("dashboard_ping", |_payload: &Value| {
                Ok(json!({ "pong": true, "time": Local::now().to_rfc3339() }))
            })
            .with_description("Liveness check"),
            Command::new("dashboard_info", move |_payload: &Value| {
                let mut info = json!({
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                    "api_version": get_api_version(),
                    "api_date": version_to_date_string(get_api_version()),
                    "started_at": started_at,
                });
                if show_environment {
                    info["environment"] = json!({
                        "os": std::env::consts::OS,
                        "arch": std::env::consts::ARCH,
                    });
                }
                Ok(info)
            })
            .with_description("Build and runtime summary"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ExecutionContext;
    use crate::module::base::ManagedModule;
    use crate::module::traits::Module;

    fn run(module: &ManagedModule<DashboardModule>, name: &str) -> Value {
        let command = module.commands().into_iter().find(|c| c.name == name).unwrap();
        (command.handler)(&json!({})).unwrap()
    }

    #[test]
    fn test_dashboard_commands() {
        let host = HostServices::in_memory().with_execution(ExecutionContext::Testing);
        let mut module = ManagedModule::new(DashboardModule::new());
        assert!(module.initialize(&host));

        assert_eq!(run(&module, "dashboard_ping")["pong"], json!(true));

        let info = run(&module, "dashboard_info");
        assert_eq!(info["name"], "devpanel");
        assert_eq!(info["api_version"], json!(get_api_version()));
        assert!(info["started_at"].is_string());
        assert_eq!(info["environment"]["os"], std::env::consts::OS);
    }

    #[test]
    fn test_environment_hidden_by_config() {
        let module = ManagedModule::new(DashboardModule::new());
        let config = ModuleConfig::new().with("show_environment", json!(false));
        let command = module.behavior().commands(&config).into_iter()
            .find(|c| c.name == "dashboard_info")
            .unwrap();

        let info = (command.handler)(&json!({})).unwrap();
        assert!(info.get("environment").is_none());
        assert!(info["started_at"].is_null());
    }

    #[test]
    fn test_requires_manage_options() {
        let mut module = ManagedModule::new(DashboardModule::new());
        assert!(!module.initialize(&HostServices::in_memory()));
    }
}
