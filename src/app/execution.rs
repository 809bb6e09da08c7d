//! Subcommand execution against a bootstrapped module manager

use std::io::Write;
use std::sync::Arc;
use anyhow::{Context, Result};
use log::{debug, info};
use prettytable::{format, Cell, Row, Table};
use serde_json::json;
use crate::cli::{self, Commands};
use crate::command::CommandRequest;
use crate::config::{ConfigManager, PanelSettings};
use crate::host::HookRegistry;
use crate::module::builtin::cache::SHUTDOWN_EVENT;
use crate::module::{BuiltinDiscovery, ModuleManager};
use super::initialization::build_services;

/// One invocation: bootstrap, run the subcommand, fire the shutdown hook,
/// clean up. Returns whether the subcommand succeeded.
pub fn run_session(args: &cli::Args, config: &ConfigManager, out: &mut dyn Write) -> Result<bool> {
    let settings = config.panel_settings()?;
    let hooks = Arc::new(HookRegistry::new());
    let services = build_services(args, config, &settings, hooks.clone())?;

    let mut manager = ModuleManager::with_settings(services, Box::new(BuiltinDiscovery), settings.manager.clone());
    if !manager.initialize() {
        return Err(anyhow::anyhow!("Module bootstrap failed; see log for details"));
    }

    let result = run_command(&args.command, &mut manager, &settings, out);

    let fired = hooks.fire(SHUTDOWN_EVENT, &json!({}));
    debug!("Fired '{}' for {} hooks", SHUTDOWN_EVENT, fired);
    manager.cleanup();

    result
}

/// Execute one subcommand
pub fn run_command(
    command: &Commands,
    manager: &mut ModuleManager,
    settings: &PanelSettings,
    out: &mut dyn Write,
) -> Result<bool> {
    match command {
        Commands::Status { json } => {
            if *json {
                let report = serde_json::to_string_pretty(&manager.get_modules_status())
                    .context("Failed to serialize module status")?;
                writeln!(out, "{}", report)?;
            } else {
                write!(out, "{}", format_status_table(manager))?;
            }
            Ok(true)
        }
        Commands::Enable { name } => {
            let enabled = manager.enable_module(name);
            if enabled {
                info!("Module '{}' enabled", name);
                writeln!(out, "Enabled module: {}", name)?;
            } else {
                writeln!(out, "Failed to enable module: {}", name)?;
                print_last_error(manager, name, out)?;
            }
            Ok(enabled)
        }
        Commands::Disable { name } => {
            let disabled = manager.disable_module(name);
            if disabled {
                info!("Module '{}' disabled", name);
                writeln!(out, "Disabled module: {}", name)?;
            } else {
                writeln!(out, "Failed to disable module: {}", name)?;
                print_last_error(manager, name, out)?;
            }
            Ok(disabled)
        }
        Commands::Dispatch { command, payload, token } => {
            let payload = cli::parse_payload(payload)?;
            let token = token.clone()
                .or_else(|| settings.auth_token.clone())
                .unwrap_or_default();
            let request = CommandRequest::new(command.clone(), payload, token);
            let caller = manager.host().caller.clone();

            let envelope = manager.dispatch(&request, caller);
            writeln!(out, "{}", envelope.to_json())?;
            Ok(envelope.success)
        }
    }
}

fn print_last_error(manager: &ModuleManager, name: &str, out: &mut dyn Write) -> Result<()> {
    if let Some(error) = manager.module(name).and_then(|m| m.status().last_error()) {
        writeln!(out, "  {}", error)?;
    }
    Ok(())
}

/// Module status as a clean table with a two-space indent
pub fn format_status_table(manager: &ModuleManager) -> String {
    let status = manager.get_modules_status();
    if status.is_empty() {
        return "  No modules registered\n".to_string();
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);

    let headers = ["MODULE", "TITLE", "STATE", "ENABLED", "COMMANDS", "LAST ERROR"];
    table.add_row(Row::new(headers.iter().map(|h| Cell::new(h)).collect()));

    let owned_commands = |name: &str| {
        manager.dispatcher().command_names().iter()
            .filter(|c| manager.dispatcher().command_owner(c) == Some(name))
            .count()
    };

    for (name, report) in &status {
        let row = [
            name.clone(),
            report.info.title.clone(),
            report.status.state.to_string(),
            if manager.is_enabled(name) { "yes" } else { "no" }.to_string(),
            owned_commands(name).to_string(),
            report.status.last_error().unwrap_or("").to_string(),
        ];
        table.add_row(Row::new(row.iter().map(|c| Cell::new(c)).collect()));
    }

    let mut result = String::new();
    for line in table.to_string().lines() {
        result.push_str("  ");
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}
