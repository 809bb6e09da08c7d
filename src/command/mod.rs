//! Command Dispatch
//!
//! Routes named commands contributed by active modules, behind token
//! authentication and capability authorization, and normalizes every
//! outcome into a success/error [`Envelope`].

pub mod error;
pub mod envelope;
pub mod handler;
pub mod request;
pub mod dispatcher;

pub use error::{DispatchError, DispatchResult};
pub use envelope::Envelope;
pub use handler::{Command, CommandHandler};
pub use request::{CommandRequest, RequestContext};
pub use dispatcher::{CommandDispatcher, DispatchStage, DispatcherSettings, DEFAULT_REQUIRED_CAPABILITY, DEFAULT_TOKEN_ACTION};
