//! 核心层：请求协调与客户端编排

mod coordinator;
mod error;
mod orchestrator;
mod state;

pub use coordinator::{PrimaryPayload, RequestCoordinator};
pub use error::SubmitError;
pub use orchestrator::{create_client, spawn_command_loop, Command};
pub use state::{BusyFlags, UiState};
