//! Pointer interactions of the arrange tab: drag to reorder, drag the right
//! edge to resize, and the transition dialog.

use crate::error::{CoreError, Result};
use crate::history::{InsertTransitionCommand, ReorderClipCommand, ResizeClipCommand};
use crate::types::*;
use crate::workbench::{InteractionMode, TransitionTicket, Workbench};
use uuid::Uuid;

impl Workbench {
    // -----------------------------------------------------------------------
    // Drag to reorder
    // -----------------------------------------------------------------------

    pub fn begin_drag(&mut self, clip_id: Uuid) -> Result<()> {
        self.ensure_idle()?;
        if self.project.timeline.get(clip_id).is_none() {
            return Err(CoreError::ClipNotFound(clip_id));
        }
        self.mode = InteractionMode::Dragging { clip_id };
        Ok(())
    }

    pub fn is_dragged(&self, clip_id: Uuid) -> bool {
        matches!(self.mode, InteractionMode::Dragging { clip_id: id } if id == clip_id)
    }

    /// Drop the dragged clip on `target_id`. Returns whether the order
    /// changed; dropping on itself or on an unknown clip cancels the drag.
    pub fn drop_on(&mut self, target_id: Uuid) -> Result<bool> {
        let InteractionMode::Dragging { clip_id } = self.mode else {
            return Err(CoreError::InvalidOperation("no drag in progress".into()));
        };
        self.mode = InteractionMode::Idle;

        if clip_id == target_id || self.project.timeline.get(target_id).is_none() {
            return Ok(false);
        }
        self.history.execute(
            Box::new(ReorderClipCommand::new(clip_id, target_id)),
            &mut self.project.timeline,
        )?;
        Ok(true)
    }

    pub fn cancel_drag(&mut self) -> bool {
        if matches!(self.mode, InteractionMode::Dragging { .. }) {
            self.mode = InteractionMode::Idle;
            true
        } else {
            false
        }
    }

    // -----------------------------------------------------------------------
    // Resize
    // -----------------------------------------------------------------------

    pub fn begin_resize(&mut self, clip_id: Uuid, pointer_x: f64) -> Result<()> {
        self.ensure_idle()?;
        let clip = self
            .project
            .timeline
            .get(clip_id)
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        self.mode = InteractionMode::Resizing {
            clip_id,
            origin_x: pointer_x,
            start_duration_us: clip.duration_us(),
        };
        Ok(())
    }

    /// Apply a pointer move to the clip being resized. The timeline updates
    /// immediately; history is only touched by [`Workbench::end_resize`].
    pub fn update_resize(&mut self, pointer_x: f64) -> Result<TimeUs> {
        let InteractionMode::Resizing {
            clip_id,
            origin_x,
            start_duration_us,
        } = self.mode
        else {
            return Err(CoreError::InvalidOperation("no resize in progress".into()));
        };

        let pps = self.project.settings.pixels_per_second;
        if !(pps > 0.0) {
            return Err(CoreError::InvalidOperation(format!(
                "pixels_per_second must be positive, got {pps}"
            )));
        }
        let delta = TimeUs::from_seconds((pointer_x - origin_x) / pps);
        self.project
            .timeline
            .resize(clip_id, start_duration_us + delta)
            .ok_or(CoreError::ClipNotFound(clip_id))
    }

    /// Finish the resize, recording a single history entry if the duration
    /// changed. Returns the final duration.
    pub fn end_resize(&mut self) -> Result<TimeUs> {
        let InteractionMode::Resizing {
            clip_id,
            start_duration_us,
            ..
        } = self.mode
        else {
            return Err(CoreError::InvalidOperation("no resize in progress".into()));
        };
        self.mode = InteractionMode::Idle;

        let clip = self
            .project
            .timeline
            .get(clip_id)
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        let final_duration = clip.duration_us();
        if final_duration != start_duration_us {
            self.history.record(Box::new(ResizeClipCommand::applied(
                clip_id,
                start_duration_us,
                final_duration,
            )));
        }
        Ok(final_duration)
    }

    pub fn cancel_resize(&mut self) -> Result<()> {
        let InteractionMode::Resizing {
            clip_id,
            start_duration_us,
            ..
        } = self.mode
        else {
            return Err(CoreError::InvalidOperation("no resize in progress".into()));
        };
        self.mode = InteractionMode::Idle;
        self.project
            .timeline
            .restore_duration(clip_id, start_duration_us)
            .ok_or(CoreError::ClipNotFound(clip_id))
    }

    // -----------------------------------------------------------------------
    // Transition dialog
    // -----------------------------------------------------------------------

    /// Open the dialog for the gap between clip `after_index` and the next.
    pub fn open_transition_dialog(&mut self, after_index: usize) -> Result<TransitionTicket> {
        self.ensure_idle()?;
        let clips = self.project.timeline.clips();
        let (Some(after), Some(before)) = (clips.get(after_index), clips.get(after_index + 1))
        else {
            return Err(CoreError::InvalidOperation(format!(
                "no adjacent clips after index {after_index}"
            )));
        };
        let ticket = TransitionTicket {
            id: Uuid::new_v4(),
            after_clip: after.id,
            before_clip: before.id,
        };
        self.mode = InteractionMode::TransitionDialog {
            ticket,
            generating: false,
        };
        Ok(ticket)
    }

    pub fn transition_ticket(&self) -> Option<TransitionTicket> {
        match self.mode {
            InteractionMode::TransitionDialog { ticket, .. } => Some(ticket),
            _ => None,
        }
    }

    /// Whether the dialog is open with no generation pending.
    pub fn can_generate(&self) -> bool {
        matches!(
            self.mode,
            InteractionMode::TransitionDialog {
                generating: false,
                ..
            }
        )
    }

    pub fn mark_generating(&mut self, ticket: &TransitionTicket) -> Result<()> {
        match &mut self.mode {
            InteractionMode::TransitionDialog {
                ticket: open,
                generating,
            } if open.id == ticket.id => {
                if *generating {
                    return Err(CoreError::InvalidOperation(
                        "transition generation already pending".into(),
                    ));
                }
                *generating = true;
                Ok(())
            }
            _ => Err(CoreError::InvalidOperation(
                "transition dialog is not open for this ticket".into(),
            )),
        }
    }

    /// A generation attempt failed; the dialog stays open and can retry.
    pub fn generation_failed(&mut self, ticket: &TransitionTicket) {
        if let InteractionMode::TransitionDialog {
            ticket: open,
            generating,
        } = &mut self.mode
        {
            if open.id == ticket.id {
                *generating = false;
            }
        }
    }

    /// Insert a generated transition for `ticket`. Returns the new clip id,
    /// or `None` when the result is stale and was discarded.
    pub fn complete_transition(
        &mut self,
        ticket: &TransitionTicket,
        descriptor: ClipDescriptor,
    ) -> Result<Option<Uuid>> {
        if self.transition_ticket().map(|t| t.id) != Some(ticket.id) {
            return Ok(None);
        }
        self.mode = InteractionMode::Idle;

        let timeline = &self.project.timeline;
        let Some(after_index) = timeline.index_of(ticket.after_clip) else {
            return Ok(None);
        };
        let still_adjacent = timeline
            .clips()
            .get(after_index + 1)
            .is_some_and(|c| c.id == ticket.before_clip);
        if !still_adjacent {
            return Ok(None);
        }

        let cmd = InsertTransitionCommand::new(after_index, Clip::transition(descriptor));
        let id = cmd.clip_id();
        self.history
            .execute(Box::new(cmd), &mut self.project.timeline)?;
        Ok(Some(id))
    }

    pub fn close_transition_dialog(&mut self) -> Option<TransitionTicket> {
        let ticket = self.transition_ticket()?;
        self.mode = InteractionMode::Idle;
        Some(ticket)
    }
}
