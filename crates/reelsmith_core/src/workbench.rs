//! The project workbench: one controller that owns a project's timeline,
//! its edit history, the clip selection and the active interaction mode.
//!
//! Pointer-driven interactions (drag, resize, the transition dialog) live in
//! [`crate::arrange`].

use crate::error::{CoreError, Result};
use crate::history::{AppendClipCommand, History, RemoveClipCommand};
use crate::library::{footage_descriptor, CandidateSet};
use crate::types::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Playback state of the per-clip preview. Non-authoritative: the player
/// reports positions, the workbench only mirrors them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PreviewState {
    pub position_us: TimeUs,
    pub paused: bool,
}

impl Default for PreviewState {
    fn default() -> Self {
        Self {
            position_us: TimeUs::ZERO,
            paused: true,
        }
    }
}

/// Identifies one opening of the transition dialog and the pair of clips it
/// was opened between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTicket {
    pub id: Uuid,
    pub after_clip: Uuid,
    pub before_clip: Uuid,
}

/// Mutually exclusive interaction modes of the arrange tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InteractionMode {
    Idle,
    Dragging {
        clip_id: Uuid,
    },
    Resizing {
        clip_id: Uuid,
        origin_x: f64,
        start_duration_us: TimeUs,
    },
    TransitionDialog {
        ticket: TransitionTicket,
        generating: bool,
    },
}

impl InteractionMode {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionMode::Idle => "idle",
            InteractionMode::Dragging { .. } => "dragging",
            InteractionMode::Resizing { .. } => "resizing",
            InteractionMode::TransitionDialog { .. } => "transition_dialog",
        }
    }
}

/// Serializable snapshot of one clip for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct ClipView {
    pub id: Uuid,
    pub kind: ClipKind,
    pub display_name: String,
    pub source_ref: SourceRef,
    pub start_us: TimeUs,
    pub duration_us: TimeUs,
    pub max_duration_us: Option<TimeUs>,
    pub dragged: bool,
    pub selected: bool,
}

/// Serializable snapshot of the arrange tab.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineView {
    pub clips: Vec<ClipView>,
    pub total_duration_us: TimeUs,
    pub selection: Option<Uuid>,
    pub preview: PreviewState,
    pub mode: InteractionMode,
    pub can_undo: bool,
    pub can_redo: bool,
}

pub struct Workbench {
    pub(crate) project: Project,
    pub(crate) history: History,
    pub(crate) selection: Option<Uuid>,
    pub(crate) preview: PreviewState,
    pub(crate) mode: InteractionMode,
    candidates: CandidateSet,
    tab: WorkbenchTab,
}

impl Workbench {
    pub fn new(project: Project, history_size: usize) -> Self {
        Self {
            project,
            history: History::new(history_size),
            selection: None,
            preview: PreviewState::default(),
            mode: InteractionMode::Idle,
            candidates: CandidateSet::default(),
            tab: WorkbenchTab::default(),
        }
    }

    /// Swap in another project, resetting history, selection and mode.
    pub fn replace_project(&mut self, project: Project) {
        self.project = project;
        self.history.clear();
        self.selection = None;
        self.preview = PreviewState::default();
        self.mode = InteractionMode::Idle;
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn timeline(&self) -> &Timeline {
        &self.project.timeline
    }

    pub fn settings(&self) -> &ArrangeSettings {
        &self.project.settings
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    // -----------------------------------------------------------------------
    // Tabs and libraries
    // -----------------------------------------------------------------------

    pub fn tab(&self) -> WorkbenchTab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: WorkbenchTab) {
        self.tab = tab;
    }

    pub fn add_ingredient(&mut self, ingredient: Ingredient) {
        self.project.ingredients.add(ingredient);
    }

    pub fn remove_ingredient(&mut self, id: Uuid) -> Result<Ingredient> {
        self.project.ingredients.remove(id)
    }

    pub fn add_media_item(&mut self, item: MediaItem) {
        self.project.footage.add(item);
    }

    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut CandidateSet {
        &mut self.candidates
    }

    // -----------------------------------------------------------------------
    // Timeline edits
    // -----------------------------------------------------------------------

    /// Place a footage library item at the end of the timeline.
    pub fn add_media(&mut self, media_id: Uuid) -> Result<Uuid> {
        let item = self
            .project
            .footage
            .get(media_id)
            .ok_or(CoreError::MediaNotFound(media_id))?;
        let descriptor = footage_descriptor(item, &self.project.settings);
        self.append_clip(Clip::footage(descriptor))
    }

    /// Append an already-built clip.
    pub fn append_clip(&mut self, clip: Clip) -> Result<Uuid> {
        self.ensure_idle()?;
        let cmd = AppendClipCommand::new(clip);
        let id = cmd.clip_id();
        self.history
            .execute(Box::new(cmd), &mut self.project.timeline)?;
        Ok(id)
    }

    pub fn remove_clip(&mut self, clip_id: Uuid) -> Result<()> {
        self.ensure_idle()?;
        self.history.execute(
            Box::new(RemoveClipCommand::new(clip_id)),
            &mut self.project.timeline,
        )?;
        if self.selection == Some(clip_id) {
            self.clear_selection();
        }
        Ok(())
    }

    pub fn undo(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.history.undo(&mut self.project.timeline)?;
        self.drop_stale_selection();
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.history.redo(&mut self.project.timeline)?;
        self.drop_stale_selection();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Selection and preview
    // -----------------------------------------------------------------------

    /// Select a clip for preview. The preview restarts paused at 0.
    pub fn select(&mut self, clip_id: Uuid) -> Result<()> {
        if self.project.timeline.get(clip_id).is_none() {
            return Err(CoreError::ClipNotFound(clip_id));
        }
        self.selection = Some(clip_id);
        self.preview = PreviewState::default();
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.preview = PreviewState::default();
    }

    pub fn selection(&self) -> Option<Uuid> {
        self.selection
    }

    pub fn preview(&self) -> PreviewState {
        self.preview
    }

    pub fn selected_segment(&self) -> Option<PlaybackSegment> {
        let id = self.selection?;
        self.project.timeline.get(id).map(Clip::segment)
    }

    pub fn playback_segments(&self) -> Vec<PlaybackSegment> {
        self.project.timeline.playback_segments()
    }

    /// Mirror a position reported by the player, clamped to the selected
    /// clip. Ignored when nothing is selected.
    pub fn on_playback_position(&mut self, position: TimeUs) -> Option<TimeUs> {
        let duration = self.selected_segment()?.duration_us;
        self.preview.position_us = position.clamp(TimeUs::ZERO, duration);
        Some(self.preview.position_us)
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.preview.paused = paused;
    }

    pub fn view(&self) -> TimelineView {
        let dragged = match self.mode {
            InteractionMode::Dragging { clip_id } => Some(clip_id),
            _ => None,
        };
        TimelineView {
            clips: self
                .project
                .timeline
                .clips()
                .iter()
                .map(|c| ClipView {
                    id: c.id,
                    kind: c.kind,
                    display_name: c.display_name.clone(),
                    source_ref: c.source_ref.clone(),
                    start_us: c.start_us(),
                    duration_us: c.duration_us(),
                    max_duration_us: c.max_duration_us(),
                    dragged: dragged == Some(c.id),
                    selected: self.selection == Some(c.id),
                })
                .collect(),
            total_duration_us: self.project.timeline.total_duration(),
            selection: self.selection,
            preview: self.preview,
            mode: self.mode.clone(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        }
    }

    pub(crate) fn ensure_idle(&self) -> Result<()> {
        match self.mode {
            InteractionMode::Idle => Ok(()),
            ref other => Err(CoreError::InvalidOperation(format!(
                "{} in progress",
                other.name()
            ))),
        }
    }

    fn drop_stale_selection(&mut self) {
        if let Some(id) = self.selection {
            if self.project.timeline.get(id).is_none() {
                self.clear_selection();
            }
        }
    }
}
