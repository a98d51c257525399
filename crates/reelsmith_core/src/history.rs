use crate::error::{CoreError, Result};
use crate::types::*;
use uuid::Uuid;

/// A reversible timeline edit.
///
/// Commands capture whatever they need for undo while executing, so both
/// methods take `&mut self`.
pub trait Command: std::fmt::Debug + Send {
    fn execute(&mut self, timeline: &mut Timeline) -> Result<()>;
    fn undo(&mut self, timeline: &mut Timeline) -> Result<()>;
    fn description(&self) -> &str;
}

/// Undo/redo history stack.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size,
        }
    }

    /// Execute a command and push it onto the undo stack. Clears redo stack.
    /// A command that fails is dropped and leaves both stacks as they were.
    pub fn execute(&mut self, mut cmd: Box<dyn Command>, timeline: &mut Timeline) -> Result<()> {
        cmd.execute(timeline)?;
        self.push(cmd);
        Ok(())
    }

    /// Push a command whose effect is already on the timeline, such as a
    /// resize applied live while the pointer moved.
    pub fn record(&mut self, cmd: Box<dyn Command>) {
        self.push(cmd);
    }

    /// Undo the last command.
    /// A command that fails to undo stays on the undo stack.
    pub fn undo(&mut self, timeline: &mut Timeline) -> Result<()> {
        let mut cmd = self.undo_stack.pop().ok_or(CoreError::NothingToUndo)?;
        if let Err(e) = cmd.undo(timeline) {
            self.undo_stack.push(cmd);
            return Err(e);
        }
        self.redo_stack.push(cmd);
        Ok(())
    }

    /// Redo the last undone command.
    /// A command that fails to re-execute stays on the redo stack.
    pub fn redo(&mut self, timeline: &mut Timeline) -> Result<()> {
        let mut cmd = self.redo_stack.pop().ok_or(CoreError::NothingToRedo)?;
        if let Err(e) = cmd.execute(timeline) {
            self.redo_stack.push(cmd);
            return Err(e);
        }
        self.undo_stack.push(cmd);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|cmd| cmd.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|cmd| cmd.description())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn push(&mut self, cmd: Box<dyn Command>) {
        self.redo_stack.clear();
        self.undo_stack.push(cmd);
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
    }
}

// ---------------------------------------------------------------------------
// AppendClipCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppendClipCommand {
    clip: Clip,
}

impl AppendClipCommand {
    pub fn new(clip: Clip) -> Self {
        Self { clip }
    }

    pub fn clip_id(&self) -> Uuid {
        self.clip.id
    }
}

impl Command for AppendClipCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> Result<()> {
        timeline.append(self.clip.clone());
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<()> {
        timeline
            .remove(self.clip.id)
            .map(|_| ())
            .ok_or(CoreError::ClipNotFound(self.clip.id))
    }

    fn description(&self) -> &str {
        "Add clip"
    }
}

// ---------------------------------------------------------------------------
// RemoveClipCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RemoveClipCommand {
    clip_id: Uuid,
    removed: Option<(usize, Clip)>,
}

impl RemoveClipCommand {
    pub fn new(clip_id: Uuid) -> Self {
        Self {
            clip_id,
            removed: None,
        }
    }
}

impl Command for RemoveClipCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> Result<()> {
        let index = timeline
            .index_of(self.clip_id)
            .ok_or(CoreError::ClipNotFound(self.clip_id))?;
        let clip = timeline
            .remove(self.clip_id)
            .ok_or(CoreError::ClipNotFound(self.clip_id))?;
        self.removed = Some((index, clip));
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<()> {
        let (index, clip) = self
            .removed
            .clone()
            .ok_or_else(|| CoreError::InvalidOperation("no removed clip saved".into()))?;
        timeline.insert_at(index, clip);
        Ok(())
    }

    fn description(&self) -> &str {
        "Remove clip"
    }
}

// ---------------------------------------------------------------------------
// ReorderClipCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ReorderClipCommand {
    moved_id: Uuid,
    target_id: Uuid,
    original_index: Option<usize>,
}

impl ReorderClipCommand {
    pub fn new(moved_id: Uuid, target_id: Uuid) -> Self {
        Self {
            moved_id,
            target_id,
            original_index: None,
        }
    }
}

impl Command for ReorderClipCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> Result<()> {
        if self.moved_id == self.target_id {
            return Err(CoreError::InvalidOperation(
                "clip dropped onto itself".into(),
            ));
        }
        let index = timeline
            .index_of(self.moved_id)
            .ok_or(CoreError::ClipNotFound(self.moved_id))?;
        if !timeline.reorder(self.moved_id, self.target_id) {
            return Err(CoreError::ClipNotFound(self.target_id));
        }
        self.original_index = Some(index);
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<()> {
        let index = self
            .original_index
            .ok_or_else(|| CoreError::InvalidOperation("no original index saved".into()))?;
        timeline
            .move_to(self.moved_id, index)
            .ok_or(CoreError::ClipNotFound(self.moved_id))
    }

    fn description(&self) -> &str {
        "Reorder clip"
    }
}

// ---------------------------------------------------------------------------
// ResizeClipCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ResizeClipCommand {
    clip_id: Uuid,
    new_duration_us: TimeUs,
    old_duration_us: Option<TimeUs>,
}

impl ResizeClipCommand {
    pub fn new(clip_id: Uuid, new_duration_us: TimeUs) -> Self {
        Self {
            clip_id,
            new_duration_us,
            old_duration_us: None,
        }
    }

    /// A resize that has already been applied, for [`History::record`].
    pub fn applied(clip_id: Uuid, old_duration_us: TimeUs, new_duration_us: TimeUs) -> Self {
        Self {
            clip_id,
            new_duration_us,
            old_duration_us: Some(old_duration_us),
        }
    }
}

impl Command for ResizeClipCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> Result<()> {
        let old = timeline
            .get(self.clip_id)
            .ok_or(CoreError::ClipNotFound(self.clip_id))?
            .duration_us();
        let applied = timeline
            .resize(self.clip_id, self.new_duration_us)
            .ok_or(CoreError::ClipNotFound(self.clip_id))?;
        self.old_duration_us = Some(old);
        self.new_duration_us = applied;
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<()> {
        let old = self
            .old_duration_us
            .ok_or_else(|| CoreError::InvalidOperation("no old duration saved".into()))?;
        timeline
            .restore_duration(self.clip_id, old)
            .ok_or(CoreError::ClipNotFound(self.clip_id))
    }

    fn description(&self) -> &str {
        "Resize clip"
    }
}

// ---------------------------------------------------------------------------
// InsertTransitionCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct InsertTransitionCommand {
    after_index: usize,
    clip: Clip,
}

impl InsertTransitionCommand {
    pub fn new(after_index: usize, clip: Clip) -> Self {
        Self { after_index, clip }
    }

    pub fn clip_id(&self) -> Uuid {
        self.clip.id
    }
}

impl Command for InsertTransitionCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> Result<()> {
        timeline
            .insert_transition(self.after_index, self.clip.clone())
            .map(|_| ())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<()> {
        timeline
            .remove(self.clip.id)
            .map(|_| ())
            .ok_or(CoreError::ClipNotFound(self.clip.id))
    }

    fn description(&self) -> &str {
        "Insert transition"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(name: &str, duration_s: f64) -> Clip {
        Clip::footage(ClipDescriptor {
            source_ref: format!("media/{name}.mp4").into(),
            display_name: name.to_string(),
            duration_us: TimeUs::from_seconds(duration_s),
            max_duration_us: Some(TimeUs::from_seconds(10.0)),
        })
    }

    fn make_test_timeline() -> (Timeline, Vec<Uuid>) {
        let mut tl = Timeline::new();
        let ids = ["a", "b", "c"]
            .iter()
            .map(|n| tl.append(clip(n, 5.0)))
            .collect();
        (tl, ids)
    }

    fn order(tl: &Timeline) -> Vec<Uuid> {
        tl.clips().iter().map(|c| c.id).collect()
    }

    // -----------------------------------------------------------------------
    // AppendClipCommand + undo/redo
    // -----------------------------------------------------------------------

    #[test]
    fn append_undo_redo_keeps_clip_id() {
        let mut tl = Timeline::new();
        let mut history = History::new(100);
        let c = clip("a", 5.0);
        let id = c.id;

        history
            .execute(Box::new(AppendClipCommand::new(c)), &mut tl)
            .unwrap();
        assert_eq!(order(&tl), vec![id]);

        history.undo(&mut tl).unwrap();
        assert!(tl.is_empty());

        history.redo(&mut tl).unwrap();
        assert_eq!(order(&tl), vec![id]);
    }

    // -----------------------------------------------------------------------
    // RemoveClipCommand
    // -----------------------------------------------------------------------

    #[test]
    fn remove_undo_restores_original_position() {
        let (mut tl, ids) = make_test_timeline();
        let mut history = History::new(100);

        history
            .execute(Box::new(RemoveClipCommand::new(ids[1])), &mut tl)
            .unwrap();
        assert_eq!(order(&tl), vec![ids[0], ids[2]]);

        history.undo(&mut tl).unwrap();
        assert_eq!(order(&tl), ids);
        assert_eq!(tl.get(ids[2]).unwrap().start_us(), TimeUs::from_seconds(10.0));
    }

    #[test]
    fn remove_missing_clip_is_not_recorded() {
        let (mut tl, _) = make_test_timeline();
        let mut history = History::new(100);
        let result = history.execute(Box::new(RemoveClipCommand::new(Uuid::new_v4())), &mut tl);
        assert!(matches!(result.unwrap_err(), CoreError::ClipNotFound(_)));
        assert!(!history.can_undo());
    }

    // -----------------------------------------------------------------------
    // ReorderClipCommand
    // -----------------------------------------------------------------------

    #[test]
    fn reorder_undo_redo() {
        let (mut tl, ids) = make_test_timeline();
        let mut history = History::new(100);

        history
            .execute(Box::new(ReorderClipCommand::new(ids[2], ids[0])), &mut tl)
            .unwrap();
        assert_eq!(order(&tl), vec![ids[2], ids[0], ids[1]]);

        history.undo(&mut tl).unwrap();
        assert_eq!(order(&tl), ids);

        history.redo(&mut tl).unwrap();
        assert_eq!(order(&tl), vec![ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn reorder_onto_itself_is_rejected() {
        let (mut tl, ids) = make_test_timeline();
        let mut history = History::new(100);
        let result = history.execute(Box::new(ReorderClipCommand::new(ids[0], ids[0])), &mut tl);
        assert!(matches!(result.unwrap_err(), CoreError::InvalidOperation(_)));
        assert_eq!(order(&tl), ids);
    }

    // -----------------------------------------------------------------------
    // ResizeClipCommand
    // -----------------------------------------------------------------------

    #[test]
    fn resize_undo_restores_duration_and_starts() {
        let (mut tl, ids) = make_test_timeline();
        let mut history = History::new(100);

        history
            .execute(
                Box::new(ResizeClipCommand::new(ids[0], TimeUs::from_seconds(8.0))),
                &mut tl,
            )
            .unwrap();
        assert_eq!(tl.get(ids[1]).unwrap().start_us(), TimeUs::from_seconds(8.0));

        history.undo(&mut tl).unwrap();
        assert_eq!(tl.get(ids[0]).unwrap().duration_us(), TimeUs::from_seconds(5.0));
        assert_eq!(tl.get(ids[1]).unwrap().start_us(), TimeUs::from_seconds(5.0));
    }

    #[test]
    fn recorded_resize_undoes_without_reexecuting() {
        let (mut tl, ids) = make_test_timeline();
        let mut history = History::new(100);

        tl.resize(ids[1], TimeUs::from_seconds(2.0));
        history.record(Box::new(ResizeClipCommand::applied(
            ids[1],
            TimeUs::from_seconds(5.0),
            TimeUs::from_seconds(2.0),
        )));
        assert_eq!(history.undo_description(), Some("Resize clip"));

        history.undo(&mut tl).unwrap();
        assert_eq!(tl.get(ids[1]).unwrap().duration_us(), TimeUs::from_seconds(5.0));

        history.redo(&mut tl).unwrap();
        assert_eq!(tl.get(ids[1]).unwrap().duration_us(), TimeUs::from_seconds(2.0));
        assert_eq!(tl.get(ids[2]).unwrap().start_us(), TimeUs::from_seconds(7.0));
    }

    // -----------------------------------------------------------------------
    // InsertTransitionCommand
    // -----------------------------------------------------------------------

    #[test]
    fn recorded_shrink_of_clip_without_max_undoes_to_full_length() {
        let mut tl = Timeline::new();
        let mut history = History::new(100);
        let id = tl.append(Clip::footage(ClipDescriptor {
            source_ref: "media/open.mp4".into(),
            display_name: "open".to_string(),
            duration_us: TimeUs::from_seconds(6.0),
            max_duration_us: None,
        }));

        tl.resize(id, TimeUs::from_seconds(2.0));
        history.record(Box::new(ResizeClipCommand::applied(
            id,
            TimeUs::from_seconds(6.0),
            TimeUs::from_seconds(2.0),
        )));

        history.undo(&mut tl).unwrap();
        assert_eq!(tl.get(id).unwrap().duration_us(), TimeUs::from_seconds(6.0));

        history.redo(&mut tl).unwrap();
        assert_eq!(tl.get(id).unwrap().duration_us(), TimeUs::from_seconds(2.0));
    }

    #[test]
    fn failed_undo_keeps_command_on_undo_stack() {
        let mut tl = Timeline::new();
        let mut history = History::new(100);
        let cmd = AppendClipCommand::new(clip("a", 5.0));
        let id = cmd.clip_id();
        history.execute(Box::new(cmd), &mut tl).unwrap();

        tl.remove(id);
        assert!(matches!(
            history.undo(&mut tl).unwrap_err(),
            CoreError::ClipNotFound(_)
        ));
        assert!(history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.undo_description(), Some("Add clip"));
    }

    #[test]
    fn failed_redo_keeps_command_on_redo_stack() {
        let (mut tl, ids) = make_test_timeline();
        let mut history = History::new(100);
        history
            .execute(
                Box::new(InsertTransitionCommand::new(1, clip("t", 3.0))),
                &mut tl,
            )
            .unwrap();
        history.undo(&mut tl).unwrap();

        tl.remove(ids[2]);
        assert!(history.redo(&mut tl).is_err());
        assert!(history.can_redo());
        assert_eq!(history.redo_description(), Some("Insert transition"));
        assert_eq!(order(&tl), vec![ids[0], ids[1]]);
    }

    #[test]
    fn insert_transition_undo_removes_it() {
        let (mut tl, ids) = make_test_timeline();
        let mut history = History::new(100);
        let t = clip("t", 3.0);
        let t_id = t.id;

        history
            .execute(Box::new(InsertTransitionCommand::new(1, t)), &mut tl)
            .unwrap();
        assert_eq!(order(&tl), vec![ids[0], ids[1], t_id, ids[2]]);

        history.undo(&mut tl).unwrap();
        assert_eq!(order(&tl), ids);
    }

    // -----------------------------------------------------------------------
    // stack behaviour
    // -----------------------------------------------------------------------

    #[test]
    fn undo_redo_on_empty_history_errors() {
        let (mut tl, _) = make_test_timeline();
        let mut history = History::new(100);
        assert!(matches!(history.undo(&mut tl).unwrap_err(), CoreError::NothingToUndo));
        assert!(matches!(history.redo(&mut tl).unwrap_err(), CoreError::NothingToRedo));
    }

    #[test]
    fn new_action_clears_redo() {
        let (mut tl, ids) = make_test_timeline();
        let mut history = History::new(100);

        history
            .execute(Box::new(RemoveClipCommand::new(ids[0])), &mut tl)
            .unwrap();
        history.undo(&mut tl).unwrap();
        assert!(history.can_redo());

        history
            .execute(Box::new(ReorderClipCommand::new(ids[2], ids[1])), &mut tl)
            .unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.undo_description(), Some("Reorder clip"));
    }

    #[test]
    fn max_size_limits_undo_stack() {
        let mut tl = Timeline::new();
        let mut history = History::new(3);

        for i in 0..5 {
            let cmd = Box::new(AppendClipCommand::new(clip(&format!("c{i}"), 2.0)));
            history.execute(cmd, &mut tl).unwrap();
        }
        assert_eq!(tl.len(), 5);

        assert!(history.undo(&mut tl).is_ok());
        assert!(history.undo(&mut tl).is_ok());
        assert!(history.undo(&mut tl).is_ok());
        assert!(history.undo(&mut tl).is_err());
        assert_eq!(tl.len(), 2);
    }

    #[test]
    fn descriptions_follow_the_stacks() {
        let mut tl = Timeline::new();
        let mut history = History::new(100);
        assert_eq!(history.undo_description(), None);

        history
            .execute(Box::new(AppendClipCommand::new(clip("a", 5.0))), &mut tl)
            .unwrap();
        assert_eq!(history.undo_description(), Some("Add clip"));

        history.undo(&mut tl).unwrap();
        assert_eq!(history.redo_description(), Some("Add clip"));
        assert_eq!(history.undo_description(), None);

        history.clear();
        assert!(!history.can_redo());
    }
}
