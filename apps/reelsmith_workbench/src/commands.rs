use crate::state::AppState;
use reelsmith_core::types::*;
use reelsmith_core::{CoreError, TransitionTicket, Workbench};
use reelsmith_generate::job::{footage_job, transition_job};
use reelsmith_generate::{
    FootageRequest, GenerateError, GenerationProgress, TransitionRequest, MAX_CANDIDATES,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to acquire state lock")]
    LockPoisoned,
}

type CmdResult = std::result::Result<Value, CommandError>;

/// One line of input.
#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Request {
    GetTimeline,
    ImportMedia {
        name: String,
        source_ref: SourceRef,
        #[serde(default)]
        source_duration_s: Option<f64>,
    },
    ListMedia,
    AddMedia {
        media_id: Uuid,
    },
    AddClip {
        source_ref: SourceRef,
        display_name: String,
        duration_s: f64,
        #[serde(default)]
        max_duration_s: Option<f64>,
    },
    RemoveClip {
        clip_id: Uuid,
    },
    SelectClip {
        #[serde(default)]
        clip_id: Option<Uuid>,
    },
    BeginDrag {
        clip_id: Uuid,
    },
    DropClip {
        target_id: Uuid,
    },
    CancelDrag,
    BeginResize {
        clip_id: Uuid,
        pointer_x: f64,
    },
    UpdateResize {
        pointer_x: f64,
    },
    EndResize,
    CancelResize,
    OpenTransitionDialog {
        after_index: usize,
    },
    GenerateTransition {
        prompt: String,
    },
    CloseTransitionDialog,
    PlaybackPosition {
        position_s: f64,
    },
    SetPaused {
        paused: bool,
    },
    Undo,
    Redo,
    AddIngredient {
        name: String,
        image: SourceRef,
        #[serde(default)]
        prompt: Option<String>,
        #[serde(default)]
        hidden: bool,
    },
    RemoveIngredient {
        id: Uuid,
    },
    ListIngredients,
    GenerateFootage(FootageRequest),
    ListCandidates,
    SelectCandidate {
        id: Uuid,
    },
    DeleteCandidate {
        id: Uuid,
    },
    Login(User),
    Logout,
    CurrentUser,
    SetTab {
        #[serde(default)]
        tab: Option<String>,
    },
    NewProject {
        name: String,
    },
    SaveProject {
        path: PathBuf,
    },
    LoadProject {
        path: PathBuf,
    },
}

fn lock<T>(mutex: &Mutex<T>) -> std::result::Result<MutexGuard<'_, T>, CommandError> {
    mutex.lock().map_err(|_| CommandError::LockPoisoned)
}

fn timeline_view(wb: &Workbench) -> CmdResult {
    Ok(serde_json::to_value(wb.view())?)
}

/// Parse and run one input line, producing the response line.
pub fn handle_line(state: &Arc<AppState>, line: &str) -> Value {
    let result = serde_json::from_str::<Request>(line)
        .map_err(|e| CommandError::BadRequest(e.to_string()))
        .and_then(|req| {
            tracing::debug!(?req, "command");
            dispatch(state, req)
        });
    match result {
        Ok(value) => json!({ "ok": value }),
        Err(e) => {
            tracing::warn!("command failed: {e}");
            json!({ "error": e.to_string() })
        }
    }
}

pub fn dispatch(state: &Arc<AppState>, req: Request) -> CmdResult {
    match req {
        // -------------------------------------------------------------------
        // Arrange
        // -------------------------------------------------------------------
        Request::GetTimeline => timeline_view(&*lock(&state.workbench)?),
        Request::AddMedia { media_id } => {
            let mut wb = lock(&state.workbench)?;
            wb.add_media(media_id)?;
            timeline_view(&wb)
        }
        Request::AddClip {
            source_ref,
            display_name,
            duration_s,
            max_duration_s,
        } => {
            let mut wb = lock(&state.workbench)?;
            wb.append_clip(Clip::footage(ClipDescriptor {
                source_ref,
                display_name,
                duration_us: TimeUs::from_seconds(duration_s),
                max_duration_us: max_duration_s.map(TimeUs::from_seconds),
            }))?;
            timeline_view(&wb)
        }
        Request::RemoveClip { clip_id } => {
            let mut wb = lock(&state.workbench)?;
            wb.remove_clip(clip_id)?;
            timeline_view(&wb)
        }
        Request::SelectClip { clip_id } => {
            let mut wb = lock(&state.workbench)?;
            match clip_id {
                Some(id) => wb.select(id)?,
                None => wb.clear_selection(),
            }
            Ok(json!({ "segment": wb.selected_segment(), "preview": wb.preview() }))
        }
        Request::BeginDrag { clip_id } => {
            let mut wb = lock(&state.workbench)?;
            wb.begin_drag(clip_id)?;
            timeline_view(&wb)
        }
        Request::DropClip { target_id } => {
            let mut wb = lock(&state.workbench)?;
            let moved = wb.drop_on(target_id)?;
            Ok(json!({ "moved": moved, "timeline": wb.view() }))
        }
        Request::CancelDrag => {
            let mut wb = lock(&state.workbench)?;
            wb.cancel_drag();
            timeline_view(&wb)
        }
        Request::BeginResize { clip_id, pointer_x } => {
            let mut wb = lock(&state.workbench)?;
            wb.begin_resize(clip_id, pointer_x)?;
            timeline_view(&wb)
        }
        Request::UpdateResize { pointer_x } => {
            let mut wb = lock(&state.workbench)?;
            wb.update_resize(pointer_x)?;
            timeline_view(&wb)
        }
        Request::EndResize => {
            let mut wb = lock(&state.workbench)?;
            wb.end_resize()?;
            timeline_view(&wb)
        }
        Request::CancelResize => {
            let mut wb = lock(&state.workbench)?;
            wb.cancel_resize()?;
            timeline_view(&wb)
        }
        Request::OpenTransitionDialog { after_index } => {
            let mut wb = lock(&state.workbench)?;
            let ticket = wb.open_transition_dialog(after_index)?;
            Ok(json!({ "ticket": ticket }))
        }
        Request::GenerateTransition { prompt } => start_transition(state, prompt),
        Request::CloseTransitionDialog => {
            let closed = lock(&state.workbench)?.close_transition_dialog();
            if let Some((_, handle)) = lock(&state.transition_job)?.take() {
                handle.abort();
            }
            Ok(json!({ "closed": closed }))
        }
        Request::PlaybackPosition { position_s } => {
            let mut wb = lock(&state.workbench)?;
            let position = wb.on_playback_position(TimeUs::from_seconds(position_s));
            Ok(json!({ "position_us": position }))
        }
        Request::SetPaused { paused } => {
            let mut wb = lock(&state.workbench)?;
            wb.set_paused(paused);
            Ok(serde_json::to_value(wb.preview())?)
        }
        Request::Undo => {
            let mut wb = lock(&state.workbench)?;
            wb.undo()?;
            timeline_view(&wb)
        }
        Request::Redo => {
            let mut wb = lock(&state.workbench)?;
            wb.redo()?;
            timeline_view(&wb)
        }

        // -------------------------------------------------------------------
        // Libraries
        // -------------------------------------------------------------------
        Request::ImportMedia {
            name,
            source_ref,
            source_duration_s,
        } => {
            let item = MediaItem {
                id: Uuid::new_v4(),
                name,
                source_ref,
                source_duration_us: source_duration_s.map(TimeUs::from_seconds),
            };
            let value = serde_json::to_value(&item)?;
            lock(&state.workbench)?.add_media_item(item);
            Ok(value)
        }
        Request::ListMedia => {
            let wb = lock(&state.workbench)?;
            Ok(serde_json::to_value(&wb.project().footage)?)
        }
        Request::AddIngredient {
            name,
            image,
            prompt,
            hidden,
        } => {
            let ingredient = Ingredient {
                id: Uuid::new_v4(),
                name,
                image,
                prompt,
                hidden,
            };
            let value = serde_json::to_value(&ingredient)?;
            lock(&state.workbench)?.add_ingredient(ingredient);
            Ok(value)
        }
        Request::RemoveIngredient { id } => {
            let removed = lock(&state.workbench)?.remove_ingredient(id)?;
            Ok(serde_json::to_value(removed)?)
        }
        Request::ListIngredients => {
            let wb = lock(&state.workbench)?;
            let visible: Vec<&Ingredient> = wb.project().ingredients.visible().collect();
            Ok(serde_json::to_value(visible)?)
        }
        Request::GenerateFootage(request) => start_footage(state, request),
        Request::ListCandidates => candidates_value(&*lock(&state.workbench)?),
        Request::SelectCandidate { id } => {
            let mut wb = lock(&state.workbench)?;
            wb.candidates_mut().select(id)?;
            candidates_value(&wb)
        }
        Request::DeleteCandidate { id } => {
            let mut wb = lock(&state.workbench)?;
            wb.candidates_mut().delete(id)?;
            candidates_value(&wb)
        }

        // -------------------------------------------------------------------
        // Session, tabs, project files
        // -------------------------------------------------------------------
        Request::Login(user) => {
            let mut session = lock(&state.session)?;
            session.login(&state.store, user)?;
            tracing::info!(user = ?session.user().map(|u| &u.name), "logged in");
            Ok(serde_json::to_value(session.user())?)
        }
        Request::Logout => {
            lock(&state.session)?.logout(&state.store)?;
            tracing::info!("logged out");
            Ok(Value::Null)
        }
        Request::CurrentUser => Ok(serde_json::to_value(lock(&state.session)?.user())?),
        Request::SetTab { tab } => {
            let tab = WorkbenchTab::from_segment(tab.as_deref());
            lock(&state.workbench)?.set_tab(tab);
            Ok(json!({ "tab": tab }))
        }
        Request::NewProject { name } => {
            let mut wb = lock(&state.workbench)?;
            let settings = wb.settings().clone();
            wb.replace_project(Project::new(name, settings));
            Ok(serde_json::to_value(wb.project())?)
        }
        Request::SaveProject { path } => {
            let wb = lock(&state.workbench)?;
            let written = wb.project().save_to_file(&path)?;
            tracing::info!(path = %written.display(), "project saved");
            Ok(json!({ "path": written }))
        }
        Request::LoadProject { path } => {
            let project = Project::load_from_file(&path)?;
            tracing::info!(path = %path.display(), name = %project.name, "project loaded");
            let mut wb = lock(&state.workbench)?;
            wb.replace_project(project);
            Ok(serde_json::to_value(wb.project())?)
        }
    }
}

fn candidates_value(wb: &Workbench) -> CmdResult {
    let set = wb.candidates();
    Ok(json!({
        "current": set.current(),
        "selected": set.selected(),
        "history": set.history(),
    }))
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

fn start_transition(state: &Arc<AppState>, prompt: String) -> CmdResult {
    if prompt.trim().is_empty() {
        return Err(GenerateError::EmptyPrompt.into());
    }
    let (ticket, request) = {
        let mut wb = lock(&state.workbench)?;
        let ticket = wb.transition_ticket().ok_or_else(|| {
            CoreError::InvalidOperation("transition dialog is not open".into())
        })?;
        wb.mark_generating(&ticket)?;
        let settings = wb.settings();
        let request = TransitionRequest {
            prompt,
            duration_us: settings.transition_start_duration_us,
            max_duration_us: settings.transition_max_duration_us,
        };
        (ticket, request)
    };

    let job = transition_job(state.generator.clone(), request);
    *lock(&state.transition_job)? = Some((ticket.id, job.abort_handle()));
    forward_progress(state.clone(), "transition_progress", job.progress());

    let state = state.clone();
    tokio::spawn(async move {
        let result = job.finish().await;
        if let Err(e) = finish_transition(&state, &ticket, result) {
            tracing::error!("transition completion failed: {e}");
        }
    });
    Ok(json!({ "ticket": ticket }))
}

fn finish_transition(
    state: &AppState,
    ticket: &TransitionTicket,
    result: reelsmith_generate::Result<ClipDescriptor>,
) -> std::result::Result<(), CommandError> {
    {
        let mut slot = lock(&state.transition_job)?;
        if slot.as_ref().is_some_and(|(id, _)| *id == ticket.id) {
            *slot = None;
        }
    }
    let mut wb = lock(&state.workbench)?;
    match result {
        Ok(descriptor) => {
            let clip_id = wb.complete_transition(ticket, descriptor)?;
            if clip_id.is_none() {
                tracing::info!(ticket = %ticket.id, "discarding stale transition");
            }
            state.emit(
                "transition_complete",
                json!({ "ticket": ticket, "clip_id": clip_id, "timeline": wb.view() }),
            );
        }
        Err(GenerateError::Cancelled) => {
            tracing::debug!(ticket = %ticket.id, "transition generation cancelled");
        }
        Err(e) => {
            wb.generation_failed(ticket);
            state.emit(
                "transition_failed",
                json!({ "ticket": ticket, "error": e.to_string() }),
            );
        }
    }
    Ok(())
}

fn start_footage(state: &Arc<AppState>, request: FootageRequest) -> CmdResult {
    if request.prompt.trim().is_empty() {
        return Err(GenerateError::EmptyPrompt.into());
    }
    if !(1..=MAX_CANDIDATES).contains(&request.candidates) {
        return Err(CommandError::BadRequest(format!(
            "candidates must be between 1 and {MAX_CANDIDATES}"
        )));
    }
    let mut slot = lock(&state.footage_job)?;
    if slot.as_ref().is_some_and(|h| !h.is_finished()) {
        return Err(CommandError::BadRequest(
            "footage generation already running".into(),
        ));
    }

    let job = footage_job(state.generator.clone(), request);
    *slot = Some(job.abort_handle());
    drop(slot);
    forward_progress(state.clone(), "footage_progress", job.progress());

    let state = state.clone();
    tokio::spawn(async move {
        match job.finish().await {
            Ok(batch) => match lock(&state.workbench) {
                Ok(mut wb) => {
                    wb.candidates_mut().replace(batch);
                    match candidates_value(&wb) {
                        Ok(value) => state.emit("footage_ready", value),
                        Err(e) => tracing::error!("failed to encode candidates: {e}"),
                    }
                }
                Err(e) => tracing::error!("footage completion failed: {e}"),
            },
            Err(GenerateError::Cancelled) => tracing::debug!("footage generation cancelled"),
            Err(e) => state.emit("footage_failed", json!({ "error": e.to_string() })),
        }
    });
    Ok(json!({ "started": true }))
}

/// Relay progress updates as events until the job reports completion or
/// drops its sender.
fn forward_progress(
    state: Arc<AppState>,
    event: &'static str,
    mut progress: watch::Receiver<GenerationProgress>,
) {
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let update = *progress.borrow();
            state.emit(event, update);
            if update.is_done() {
                break;
            }
        }
    });
}
