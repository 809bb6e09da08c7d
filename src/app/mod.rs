//! Application orchestration module

pub mod initialization;
pub mod execution;

pub use initialization::{build_services, configure_logging, load_configuration};
pub use execution::{format_status_table, run_command, run_session};
