pub mod error;
pub mod job;
pub mod mock;
pub mod service;

pub use error::{GenerateError, Result};
pub use job::GenerationJob;
pub use mock::MockGenerator;
pub use service::{
    FootageRequest, GenerationProgress, GenerationService, TransitionRequest,
    MAX_CANDIDATES,
};
