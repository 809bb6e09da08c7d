//! Application initialization and configuration

use std::str::FromStr;
use std::sync::Arc;
use anyhow::Result;
use log::{debug, warn, LevelFilter};
use crate::config::{ConfigManager, PanelSettings};
use crate::host::{
    ExecutionContext, HookRegistry, HostServices, JsonFileOptionStore, MemoryOptionStore,
    OptionStore, StaticCaller,
};
use crate::logging::{FacadeLogSink, LogConfig, LogDestination, LogFormat};
use crate::{cli, logging};

pub fn load_configuration(args: &cli::Args) -> Result<ConfigManager> {
    match &args.config_file {
        Some(config_file) => {
            debug!("Loading configuration from explicit file: {}", config_file.display());
            ConfigManager::load_from_file(config_file.clone())
        }
        None => ConfigManager::load(),
    }
}

/// Resolve logger settings. Precedence: CLI flags > `log.*` keys > defaults.
pub fn configure_logging(args: &cli::Args, config: &ConfigManager) -> Result<LogConfig> {
    let console_level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        match config.get_log_level("log.console_level") {
            Ok(Some(level)) => level,
            Ok(None) => LevelFilter::Warn,
            Err(e) => {
                eprintln!("Ignoring log.console_level: {}", e);
                LevelFilter::Warn
            }
        }
    };

    let format = match args.log_format.as_deref()
        .or_else(|| config.get_value("log.format").and_then(|v| v.as_str()))
    {
        Some(format) => LogFormat::from_str(format).map_err(|e| anyhow::anyhow!(e))?,
        None => LogFormat::Text,
    };

    let log_file = args.log_file.clone().or_else(|| config.get_path("log.file"));
    let file_level = match &args.log_file_level {
        Some(level) => Some(logging::parse_log_level(level)?),
        None => config.get_log_level("log.file_level")?,
    };

    let (destination, file_level) = match log_file {
        Some(path) => (LogDestination::Both(path), Some(file_level.unwrap_or(console_level))),
        None => (LogDestination::Console, None),
    };

    Ok(LogConfig {
        console_level,
        file_level,
        format,
        destination,
    })
}

/// Assemble the host collaborators from configuration. `hooks` stays with
/// the caller so it can fire host events.
pub fn build_services(
    args: &cli::Args,
    config: &ConfigManager,
    settings: &PanelSettings,
    hooks: Arc<HookRegistry>,
) -> Result<HostServices> {
    let options: Arc<dyn OptionStore> = match args.options_file.clone().or_else(|| settings.options_file.clone()) {
        Some(path) => {
            debug!("Using option store: {}", path.display());
            Arc::new(JsonFileOptionStore::open(&path)?)
        }
        None => {
            debug!("No storage.options_file configured; enablement changes will not persist");
            Arc::new(MemoryOptionStore::new())
        }
    };

    let mut caller = StaticCaller::new().with_capabilities(settings.capabilities.iter().cloned());
    if let Some(token) = &settings.auth_token {
        caller = caller.with_token(settings.manager.dispatcher.token_action.clone(), token.clone());
    }

    for dependency in settings.unmet_requirements() {
        warn!("Declared host requirement not available: {}", dependency);
    }

    Ok(HostServices::new(
        Arc::new(config.clone()),
        Arc::new(FacadeLogSink),
        options,
        hooks,
        Arc::new(settings.environment.clone()),
        Arc::new(caller),
    )
    .with_execution(ExecutionContext::detect()))
}
