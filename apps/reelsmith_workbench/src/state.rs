use crate::config::WorkbenchConfig;
use reelsmith_core::session::{LocalStore, Session};
use reelsmith_core::types::Project;
use reelsmith_core::Workbench;
use reelsmith_generate::MockGenerator;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use uuid::Uuid;

pub struct AppState {
    pub workbench: Mutex<Workbench>,
    pub session: Mutex<Session>,
    pub store: LocalStore,
    pub generator: Arc<MockGenerator>,
    /// Running transition job, keyed by the dialog ticket it belongs to.
    pub transition_job: Mutex<Option<(Uuid, AbortHandle)>>,
    pub footage_job: Mutex<Option<AbortHandle>>,
    output: mpsc::UnboundedSender<Value>,
}

impl AppState {
    /// Build the state for a fresh project. Every response and event line is
    /// sent to `output`.
    pub fn new(config: &WorkbenchConfig, output: mpsc::UnboundedSender<Value>) -> Self {
        let store = LocalStore::new(&config.session_path);
        let session = Session::restore(&store).unwrap_or_else(|e| {
            tracing::warn!("ignoring unreadable session: {e}");
            Session::default()
        });
        if let Some(user) = session.user() {
            tracing::info!(user = %user.name, "restored session");
        }

        let generator = MockGenerator::new(config.generation_delay()).with_assets(
            config.transition_assets.clone(),
            config.footage_assets.clone(),
        );
        let project = Project::new(config.project_name.clone(), config.arrange.clone());

        Self {
            workbench: Mutex::new(Workbench::new(project, config.history_size)),
            session: Mutex::new(session),
            store,
            generator: Arc::new(generator),
            transition_job: Mutex::new(None),
            footage_job: Mutex::new(None),
            output,
        }
    }

    pub fn send(&self, line: Value) {
        let _ = self.output.send(line);
    }

    pub fn emit(&self, event: &str, payload: impl Serialize) {
        match serde_json::to_value(payload) {
            Ok(payload) => self.send(json!({ "event": event, "payload": payload })),
            Err(e) => tracing::error!(event, "failed to encode event: {e}"),
        }
    }

    /// Abort any running generation.
    pub fn cancel_jobs(&self) {
        if let Ok(mut slot) = self.transition_job.lock() {
            if let Some((_, handle)) = slot.take() {
                handle.abort();
            }
        }
        if let Ok(mut slot) = self.footage_job.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}
