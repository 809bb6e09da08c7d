//! Command Dispatcher
//!
//! Single entry point translating an inbound request into a handler
//! contributed by an active module. Every request walks
//! `received -> authenticated -> authorized -> resolved -> executed` and may
//! short-circuit to an error envelope at each step. No retries, no caching.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use log::debug;
use serde_json::Value;
use crate::host::{CallerAuth, ConfigReader, LogSink};
use crate::module::error::panic_message;
use super::envelope::Envelope;
use super::error::{DispatchError, DispatchResult};
use super::handler::Command;
use super::request::{CommandRequest, RequestContext};

pub const DEFAULT_TOKEN_ACTION: &str = "devpanel_command";
pub const DEFAULT_REQUIRED_CAPABILITY: &str = "manage_options";

/// Progress of a single request through the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Received,
    Authenticated,
    Authorized,
    Resolved,
    Executed,
}

/// Token action and default capability applied to every command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherSettings {
    pub token_action: String,
    pub required_capability: String,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            token_action: DEFAULT_TOKEN_ACTION.to_string(),
            required_capability: DEFAULT_REQUIRED_CAPABILITY.to_string(),
        }
    }
}

impl DispatcherSettings {
    pub fn from_config(config: &dyn ConfigReader) -> Self {
        Self {
            token_action: config.get_str("dispatcher.token_action", DEFAULT_TOKEN_ACTION),
            required_capability: config.get_str("dispatcher.required_capability", DEFAULT_REQUIRED_CAPABILITY),
        }
    }
}

struct RegisteredCommand {
    owner: String,
    command: Command,
}

/// Command name -> handler table
pub struct CommandDispatcher {
    commands: BTreeMap<String, RegisteredCommand>,
    settings: DispatcherSettings,
    logger: Arc<dyn LogSink>,
}

impl CommandDispatcher {
    pub fn new(settings: DispatcherSettings, logger: Arc<dyn LogSink>) -> Self {
        Self {
            commands: BTreeMap::new(),
            settings,
            logger,
        }
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    /// Register `command` for `owner`. A name already present is rejected
    /// and the existing handler keeps serving it.
    pub fn register_command(&mut self, owner: &str, command: Command) -> bool {
        match self.try_register(owner, command) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("{}", e);
                self.logger.log_error(&e.to_string());
                false
            }
        }
    }

    fn try_register(&mut self, owner: &str, command: Command) -> DispatchResult<()> {
        if let Some(existing) = self.commands.get(&command.name) {
            return Err(DispatchError::already_registered(&command.name, &existing.owner));
        }
        debug!("Registered command '{}' for module '{}'", command.name, owner);
        self.commands.insert(command.name.clone(), RegisteredCommand {
            owner: owner.to_string(),
            command,
        });
        Ok(())
    }

    /// Retract every command contributed by `owner`
    pub fn unregister_owner(&mut self, owner: &str) -> usize {
        let before = self.commands.len();
        self.commands.retain(|_, registered| registered.owner != owner);
        let removed = before - self.commands.len();
        if removed > 0 {
            debug!("Retracted {} commands owned by '{}'", removed, owner);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Owning module of `name`, for diagnostics
    pub fn command_owner(&self, name: &str) -> Option<&str> {
        self.commands.get(name).map(|r| r.owner.as_str())
    }

    pub fn command_names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Wire entry point: build the request context and dispatch
    pub fn handle(&self, request: &CommandRequest, caller: Arc<dyn CallerAuth>) -> Envelope {
        let ctx = RequestContext::from_request(request, caller);
        self.dispatch(&ctx, &request.command, &request.payload)
    }

    /// Dispatch `command` and wrap the outcome in an envelope
    pub fn dispatch(&self, ctx: &RequestContext, command: &str, payload: &Value) -> Envelope {
        match self.try_dispatch(ctx, command, payload) {
            Ok(data) => Envelope::success(data),
            Err(e) => {
                self.logger.log_error(&format!("Dispatch of '{}' rejected: {}", command, e));
                Envelope::error(e.to_string())
            }
        }
    }

    /// Dispatch `command`, returning the handler result or the reason it failed
    pub fn try_dispatch(&self, ctx: &RequestContext, command: &str, payload: &Value) -> DispatchResult<Value> {
        let mut stage = DispatchStage::Received;
        debug!("Dispatch '{}': {:?}", command, stage);

        if !ctx.verify_token(&self.settings.token_action) {
            return Err(DispatchError::Authentication);
        }
        stage = DispatchStage::Authenticated;
        debug!("Dispatch '{}': {:?}", command, stage);

        if !ctx.has_capability(&self.settings.required_capability) {
            return Err(DispatchError::authorization(&self.settings.required_capability));
        }
        stage = DispatchStage::Authorized;
        debug!("Dispatch '{}': {:?}", command, stage);

        let registered = self.commands.get(command)
            .ok_or_else(|| DispatchError::command_not_found(command))?;
        if let Some(capability) = &registered.command.capability {
            if !ctx.has_capability(capability) {
                return Err(DispatchError::authorization(capability));
            }
        }
        stage = DispatchStage::Resolved;
        debug!("Dispatch '{}' (owner '{}'): {:?}", command, registered.owner, stage);

        let handler = registered.command.handler.clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(payload)));
        let data = match outcome {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => return Err(DispatchError::handler_execution(command, format!("{:#}", e))),
            Err(payload) => return Err(DispatchError::handler_execution(command, panic_message(payload.as_ref()))),
        };
        stage = DispatchStage::Executed;
        debug!("Dispatch '{}': {:?}", command, stage);

        Ok(data)
    }
}
