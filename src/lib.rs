//! Module lifecycle registry and command dispatcher for an embeddable
//! developer panel.
//!
//! Hosts hand a [`host::HostServices`] bundle to a [`module::ModuleManager`],
//! which bootstraps the discovered modules according to the persisted
//! enablement list and exposes their commands through a
//! [`command::CommandDispatcher`].

pub mod app;
pub mod cli;
pub mod command;
pub mod config;
pub mod host;
pub mod logging;
pub mod module;

pub use command::{Command, CommandDispatcher, CommandRequest, Envelope};
pub use host::HostServices;
pub use module::{Module, ModuleManager};
