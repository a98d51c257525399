use crate::error::{CoreError, Result};
use crate::types::*;
use uuid::Uuid;

impl Timeline {
    pub fn new() -> Self {
        Self { clips: Vec::new() }
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn get(&self, clip_id: Uuid) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }

    pub fn index_of(&self, clip_id: Uuid) -> Option<usize> {
        self.clips.iter().position(|c| c.id == clip_id)
    }

    pub fn total_duration(&self) -> TimeUs {
        self.clips.iter().map(|c| c.duration_us).sum()
    }

    /// Append a clip at the end of the sequence. Returns its id.
    pub fn append(&mut self, mut clip: Clip) -> Uuid {
        clip.start_us = self.clips.last().map_or(TimeUs::ZERO, Clip::end_us);
        let id = clip.id;
        self.clips.push(clip);
        id
    }

    /// Remove a clip by id. Returns `None` and leaves the sequence untouched
    /// if no clip has that id.
    pub fn remove(&mut self, clip_id: Uuid) -> Option<Clip> {
        let idx = self.index_of(clip_id)?;
        let clip = self.clips.remove(idx);
        self.recompute_from(idx);
        Some(clip)
    }

    /// Move `moved_id` so it sits at the target's current index, pushing the
    /// target and everything after it one slot right.
    ///
    /// Returns `false` without touching the sequence when the ids are equal
    /// or either one is missing.
    pub fn reorder(&mut self, moved_id: Uuid, target_id: Uuid) -> bool {
        if moved_id == target_id {
            return false;
        }
        let (Some(from), Some(to)) = (self.index_of(moved_id), self.index_of(target_id)) else {
            return false;
        };
        let clip = self.clips.remove(from);
        self.clips.insert(to, clip);
        self.recompute_from(from.min(to));
        true
    }

    /// Set a clip's duration, clamped into [`Clip::duration_bounds`].
    /// Returns the duration actually applied, or `None` for an unknown id.
    pub fn resize(&mut self, clip_id: Uuid, proposed: TimeUs) -> Option<TimeUs> {
        let idx = self.index_of(clip_id)?;
        let clip = &mut self.clips[idx];
        let (min, max) = clip.duration_bounds();
        clip.duration_us = proposed.clamp(min, max);
        let applied = clip.duration_us;
        self.recompute_from(idx);
        Some(applied)
    }

    /// Put back a duration the clip had before, bypassing the resize clamp.
    /// Used by cancel and undo: a clip without a max cannot otherwise grow
    /// back after being shortened.
    pub(crate) fn restore_duration(&mut self, clip_id: Uuid, duration: TimeUs) -> Option<()> {
        let idx = self.index_of(clip_id)?;
        let clip = &mut self.clips[idx];
        clip.duration_us = duration;
        clip.normalize_duration();
        self.recompute_from(idx);
        Some(())
    }

    /// Insert a generated clip directly after the clip at `after_index`.
    /// There must be a clip after `after_index` for the transition to lead into.
    pub fn insert_transition(&mut self, after_index: usize, clip: Clip) -> Result<Uuid> {
        if after_index + 1 >= self.clips.len() {
            return Err(CoreError::InvalidOperation(format!(
                "transition needs two adjacent clips after index {} (timeline has {} clips)",
                after_index,
                self.clips.len()
            )));
        }
        let id = clip.id;
        self.insert_at(after_index + 1, clip);
        Ok(id)
    }

    /// The clip under a playhead position. Ranges are half-open, so a time
    /// exactly on a boundary belongs to the later clip.
    pub fn segment_at(&self, time: TimeUs) -> Option<PlaybackSegment> {
        self.clips
            .iter()
            .find(|c| time >= c.start_us && time < c.end_us())
            .map(Clip::segment)
    }

    pub fn playback_segments(&self) -> Vec<PlaybackSegment> {
        self.clips.iter().map(Clip::segment).collect()
    }

    /// Insert at an index, clamped to the end of the sequence.
    pub(crate) fn insert_at(&mut self, index: usize, clip: Clip) {
        let index = index.min(self.clips.len());
        self.clips.insert(index, clip);
        self.recompute_from(index);
    }

    /// Move a clip to an absolute index. Used to undo a reorder.
    pub(crate) fn move_to(&mut self, clip_id: Uuid, index: usize) -> Option<()> {
        let from = self.index_of(clip_id)?;
        let clip = self.clips.remove(from);
        let to = index.min(self.clips.len());
        self.clips.insert(to, clip);
        self.recompute_from(from.min(to));
        Some(())
    }

    /// Re-derive start times from `index` onward. Everything before `index`
    /// is already consistent, so the scan seeds from the previous clip's end.
    fn recompute_from(&mut self, index: usize) {
        let mut cursor = match index.checked_sub(1).and_then(|i| self.clips.get(i)) {
            Some(prev) => prev.end_us(),
            None => TimeUs::ZERO,
        };
        for clip in self.clips.iter_mut().skip(index) {
            clip.start_us = cursor;
            cursor += clip.duration_us;
        }
    }

    fn recompute_start_times(&mut self) {
        self.recompute_from(0);
    }
}

impl From<Vec<Clip>> for Timeline {
    fn from(mut clips: Vec<Clip>) -> Self {
        for clip in &mut clips {
            clip.normalize_duration();
        }
        let mut timeline = Self { clips };
        timeline.recompute_start_times();
        timeline
    }
}

impl From<Timeline> for Vec<Clip> {
    fn from(timeline: Timeline) -> Self {
        timeline.clips
    }
}
