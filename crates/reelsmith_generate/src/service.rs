use crate::error::Result;
use reelsmith_core::types::{Candidate, ClipDescriptor, SourceRef, TimeUs};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::watch;

/// Progress update while a generation runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationProgress {
    pub percent: f64,
}

impl GenerationProgress {
    pub fn is_done(&self) -> bool {
        self.percent >= 100.0
    }
}

/// A transition between two timeline clips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub prompt: String,
    pub duration_us: TimeUs,
    pub max_duration_us: TimeUs,
}

/// Largest candidate batch one footage request may ask for.
pub const MAX_CANDIDATES: usize = 8;

/// A batch of footage candidates for the footage tab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootageRequest {
    pub prompt: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_candidates")]
    pub candidates: usize,
    /// Duration hint in seconds, forwarded to the backend.
    #[serde(default)]
    pub duration_s: Option<u32>,
    #[serde(default)]
    pub ingredients: Vec<SourceRef>,
}

fn default_model() -> String {
    "AnimateDiff-v2".to_string()
}

fn default_candidates() -> usize {
    2
}

/// A backend that turns prompts into media.
///
/// Implementations report progress on the supplied channel and must reject
/// blank prompts with [`crate::GenerateError::EmptyPrompt`].
pub trait GenerationService: Send + Sync + 'static {
    fn generate_transition(
        &self,
        request: TransitionRequest,
        progress: watch::Sender<GenerationProgress>,
    ) -> impl Future<Output = Result<ClipDescriptor>> + Send;

    fn generate_footage(
        &self,
        request: FootageRequest,
        progress: watch::Sender<GenerationProgress>,
    ) -> impl Future<Output = Result<Vec<Candidate>>> + Send;
}
