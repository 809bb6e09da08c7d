//! Host Collaborators
//!
//! Interfaces the embedding host supplies to the module system (configuration,
//! logging, persisted options, hooks, dependency tables, caller identity),
//! plus in-process reference implementations used by the binary and tests.

pub mod traits;
pub mod error;
pub mod environment;
pub mod options;
pub mod hooks;
pub mod auth;
pub mod services;

pub use traits::{CallerAuth, ConfigReader, DependencyResolver, HookCallback, HookRegistrar, LogSink, OptionStore};
pub use error::{HostError, HostResult};
pub use environment::{Dependency, ExecutionContext, HostEnvironment, TEST_MODE_ENV};
pub use options::{JsonFileOptionStore, MemoryOptionStore};
pub use hooks::HookRegistry;
pub use auth::StaticCaller;
pub use services::{EmptyConfig, HostServices, MemoryLogSink};
