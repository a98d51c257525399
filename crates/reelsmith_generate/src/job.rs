use crate::error::{GenerateError, Result};
use crate::service::{FootageRequest, GenerationProgress, GenerationService, TransitionRequest};
use reelsmith_core::types::{Candidate, ClipDescriptor};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

/// A generation running on its own tokio task.
pub struct GenerationJob<T> {
    handle: JoinHandle<Result<T>>,
    progress: watch::Receiver<GenerationProgress>,
}

impl<T: Send + 'static> GenerationJob<T> {
    /// Spawn `work`, handing it the sending half of the progress channel.
    pub fn spawn<F, Fut>(work: F) -> Self
    where
        F: FnOnce(watch::Sender<GenerationProgress>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(GenerationProgress::default());
        Self {
            handle: tokio::spawn(work(tx)),
            progress: rx,
        }
    }

    pub fn progress(&self) -> watch::Receiver<GenerationProgress> {
        self.progress.clone()
    }

    /// Handle that can cancel the job after it has been moved elsewhere.
    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the result. An aborted job yields [`GenerateError::Cancelled`].
    pub async fn finish(self) -> Result<T> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                tracing::info!("generation job cancelled");
                Err(GenerateError::Cancelled)
            }
            Err(e) => Err(GenerateError::Failed(e.to_string())),
        }
    }
}

pub fn transition_job<G: GenerationService>(
    service: Arc<G>,
    request: TransitionRequest,
) -> GenerationJob<ClipDescriptor> {
    GenerationJob::spawn(move |tx| async move { service.generate_transition(request, tx).await })
}

pub fn footage_job<G: GenerationService>(
    service: Arc<G>,
    request: FootageRequest,
) -> GenerationJob<Vec<Candidate>> {
    GenerationJob::spawn(move |tx| async move { service.generate_footage(request, tx).await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGenerator;
    use reelsmith_core::types::TimeUs;
    use std::time::Duration;

    fn request(prompt: &str) -> TransitionRequest {
        TransitionRequest {
            prompt: prompt.to_string(),
            duration_us: TimeUs::from_seconds(3.0),
            max_duration_us: TimeUs::from_seconds(5.0),
        }
    }

    #[tokio::test]
    async fn job_reports_progress_and_result() {
        let gen = Arc::new(MockGenerator::new(Duration::from_millis(30)));
        let job = transition_job(gen, request("dissolve"));
        let mut progress = job.progress();

        let mut seen = Vec::new();
        while progress.changed().await.is_ok() {
            let p = *progress.borrow();
            seen.push(p.percent);
            if p.is_done() {
                break;
            }
        }
        assert_eq!(seen.last().copied(), Some(100.0));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));

        let d = job.finish().await.unwrap();
        assert_eq!(d.duration_us, TimeUs::from_seconds(3.0));
    }

    #[tokio::test]
    async fn cancelled_job_yields_cancelled() {
        let gen = Arc::new(MockGenerator::new(Duration::from_secs(30)));
        let job = transition_job(gen, request("slow pan"));
        job.cancel();
        assert!(matches!(
            job.finish().await.unwrap_err(),
            GenerateError::Cancelled
        ));
    }

    #[tokio::test]
    async fn abort_handle_cancels_detached_job() {
        let gen = Arc::new(MockGenerator::new(Duration::from_secs(30)));
        let job = footage_job(
            gen,
            FootageRequest {
                prompt: "city lights".to_string(),
                model: "AnimateDiff-v2".to_string(),
                candidates: 2,
                duration_s: None,
                ingredients: Vec::new(),
            },
        );
        let abort = job.abort_handle();
        let waiter = tokio::spawn(job.finish());
        abort.abort();
        assert!(matches!(
            waiter.await.unwrap().unwrap_err(),
            GenerateError::Cancelled
        ));
    }

    #[tokio::test]
    async fn service_error_passes_through() {
        let gen = Arc::new(MockGenerator::new(Duration::from_millis(6)));
        let job = transition_job(gen, request(""));
        assert!(matches!(
            job.finish().await.unwrap_err(),
            GenerateError::EmptyPrompt
        ));
    }
}
