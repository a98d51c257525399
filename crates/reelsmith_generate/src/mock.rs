//! A stand-in backend. It waits, reports progress, and hands back fixed
//! placeholder assets; nothing is actually generated.

use crate::error::{GenerateError, Result};
use crate::service::{
    FootageRequest, GenerationProgress, GenerationService, TransitionRequest, MAX_CANDIDATES,
};
use reelsmith_core::types::{Candidate, ClipDescriptor, SourceRef};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// Progress climbs to this value during the delay; 100 is sent on completion.
const PROGRESS_CEILING: f64 = 90.0;
const PROGRESS_TICKS: u32 = 6;

pub struct MockGenerator {
    delay: Duration,
    transition_assets: Vec<SourceRef>,
    footage_assets: Vec<SourceRef>,
    thumbnail: SourceRef,
    next: AtomicUsize,
}

impl MockGenerator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            transition_assets: vec![
                "placeholder/transition-1.mp4".into(),
                "placeholder/transition-2.mp4".into(),
            ],
            footage_assets: vec![
                "placeholder/footage-1.mp4".into(),
                "placeholder/footage-2.mp4".into(),
                "placeholder/footage-3.mp4".into(),
            ],
            thumbnail: "placeholder/thumbnail.png".into(),
            next: AtomicUsize::new(0),
        }
    }

    /// Replace the placeholder pools. Empty lists keep the built-in ones.
    pub fn with_assets(mut self, transitions: Vec<SourceRef>, footage: Vec<SourceRef>) -> Self {
        if !transitions.is_empty() {
            self.transition_assets = transitions;
        }
        if !footage.is_empty() {
            self.footage_assets = footage;
        }
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn pick(&self, pool: &[SourceRef]) -> SourceRef {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        pool[n % pool.len()].clone()
    }

    async fn simulate(&self, progress: &watch::Sender<GenerationProgress>) {
        let step = self.delay / PROGRESS_TICKS;
        for tick in 1..=PROGRESS_TICKS {
            tokio::time::sleep(step).await;
            let percent = PROGRESS_CEILING * f64::from(tick) / f64::from(PROGRESS_TICKS);
            let _ = progress.send(GenerationProgress { percent });
        }
        let _ = progress.send(GenerationProgress { percent: 100.0 });
    }
}

fn check_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(GenerateError::EmptyPrompt);
    }
    Ok(())
}

impl GenerationService for MockGenerator {
    async fn generate_transition(
        &self,
        request: TransitionRequest,
        progress: watch::Sender<GenerationProgress>,
    ) -> Result<ClipDescriptor> {
        check_prompt(&request.prompt)?;
        tracing::info!(prompt = %request.prompt, "generating transition");

        self.simulate(&progress).await;

        let source_ref = self.pick(&self.transition_assets);
        tracing::debug!(%source_ref, "transition ready");
        Ok(ClipDescriptor {
            source_ref,
            display_name: "Transition".to_string(),
            duration_us: request.duration_us,
            max_duration_us: Some(request.max_duration_us),
        })
    }

    async fn generate_footage(
        &self,
        request: FootageRequest,
        progress: watch::Sender<GenerationProgress>,
    ) -> Result<Vec<Candidate>> {
        check_prompt(&request.prompt)?;
        if !(1..=MAX_CANDIDATES).contains(&request.candidates) {
            return Err(GenerateError::Failed(format!(
                "candidate count must be between 1 and {MAX_CANDIDATES}, got {}",
                request.candidates
            )));
        }
        tracing::info!(
            prompt = %request.prompt,
            model = %request.model,
            candidates = request.candidates,
            "generating footage"
        );

        self.simulate(&progress).await;

        Ok((0..request.candidates)
            .map(|_| Candidate {
                id: Uuid::new_v4(),
                source_ref: self.pick(&self.footage_assets),
                thumbnail: self.thumbnail.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelsmith_core::types::TimeUs;

    fn transition_request(prompt: &str) -> TransitionRequest {
        TransitionRequest {
            prompt: prompt.to_string(),
            duration_us: TimeUs::from_seconds(3.0),
            max_duration_us: TimeUs::from_seconds(5.0),
        }
    }

    fn footage_request(candidates: usize) -> FootageRequest {
        FootageRequest {
            prompt: "a fox in the snow".to_string(),
            model: "AnimateDiff-v2".to_string(),
            candidates,
            duration_s: Some(4),
            ingredients: Vec::new(),
        }
    }

    #[tokio::test]
    async fn transition_uses_requested_durations() {
        let gen = MockGenerator::new(Duration::from_millis(12));
        let (tx, rx) = watch::channel(GenerationProgress::default());

        let d = gen
            .generate_transition(transition_request("fade to dusk"), tx)
            .await
            .unwrap();
        assert_eq!(d.duration_us, TimeUs::from_seconds(3.0));
        assert_eq!(d.max_duration_us, Some(TimeUs::from_seconds(5.0)));
        assert!(rx.borrow().is_done());
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected() {
        let gen = MockGenerator::new(Duration::from_millis(12));
        let (tx, rx) = watch::channel(GenerationProgress::default());
        let err = gen
            .generate_transition(transition_request("   "), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::EmptyPrompt));
        assert_eq!(rx.borrow().percent, 0.0);
    }

    #[tokio::test]
    async fn assets_rotate_round_robin() {
        let gen = MockGenerator::new(Duration::from_millis(6))
            .with_assets(vec!["t/a.mp4".into(), "t/b.mp4".into()], Vec::new());
        let mut refs = Vec::new();
        for _ in 0..3 {
            let (tx, _rx) = watch::channel(GenerationProgress::default());
            let d = gen
                .generate_transition(transition_request("wipe"), tx)
                .await
                .unwrap();
            refs.push(d.source_ref.as_str().to_string());
        }
        assert_eq!(refs, vec!["t/a.mp4", "t/b.mp4", "t/a.mp4"]);
    }

    #[tokio::test]
    async fn footage_batch_has_requested_size() {
        let gen = MockGenerator::new(Duration::from_millis(6));
        let (tx, _rx) = watch::channel(GenerationProgress::default());
        let batch = gen.generate_footage(footage_request(3), tx).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_ne!(batch[0].id, batch[1].id);
    }

    #[tokio::test]
    async fn candidate_count_outside_limits_fails() {
        let gen = MockGenerator::new(Duration::from_millis(6));
        for count in [0, MAX_CANDIDATES + 1, 1_000_000_000] {
            let (tx, rx) = watch::channel(GenerationProgress::default());
            let err = gen
                .generate_footage(footage_request(count), tx)
                .await
                .unwrap_err();
            assert!(matches!(err, GenerateError::Failed(_)));
            assert_eq!(rx.borrow().percent, 0.0);
        }

        let (tx, _rx) = watch::channel(GenerationProgress::default());
        let batch = gen
            .generate_footage(footage_request(MAX_CANDIDATES), tx)
            .await
            .unwrap();
        assert_eq!(batch.len(), MAX_CANDIDATES);
    }

    #[test]
    fn footage_request_defaults() {
        let req: FootageRequest = serde_json::from_str(r#"{"prompt": "waves"}"#).unwrap();
        assert_eq!(req.candidates, 2);
        assert_eq!(req.model, "AnimateDiff-v2");
        assert!(req.ingredients.is_empty());
    }
}
