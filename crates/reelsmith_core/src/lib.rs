pub mod arrange;
pub mod error;
pub mod history;
pub mod library;
pub mod project;
pub mod sequencer;
pub mod session;
pub mod types;
pub mod workbench;

pub use error::{CoreError, Result};
pub use types::*;
pub use workbench::{InteractionMode, TransitionTicket, Workbench};
