use crate::library::{IngredientLibrary, MediaLibrary};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TimeUs
// ---------------------------------------------------------------------------

/// A point or span on the timeline, in microseconds. Arithmetic saturates.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct TimeUs(pub i64);

impl TimeUs {
    pub const ZERO: Self = Self(0);
    pub const ONE_SECOND: Self = Self(1_000_000);

    pub fn from_seconds(s: f64) -> Self {
        Self((s * 1_000_000.0).round() as i64)
    }

    pub fn as_seconds(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }
}

impl Add for TimeUs {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for TimeUs {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for TimeUs {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for TimeUs {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, t| acc + t)
    }
}

impl fmt::Display for TimeUs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_ms = self.0.unsigned_abs() / 1_000;
        let ms = total_ms % 1_000;
        let total_secs = total_ms / 1_000;
        let secs = total_secs % 60;
        let mins = total_secs / 60;
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}{mins:02}:{secs:02}.{ms:03}")
    }
}

/// Shortest duration a clip may be resized to.
pub const MIN_CLIP_DURATION: TimeUs = TimeUs::ONE_SECOND;

// ---------------------------------------------------------------------------
// SourceRef
// ---------------------------------------------------------------------------

/// Opaque reference to the media behind a clip, resolved by the media store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SourceRef(pub String);

impl SourceRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SourceRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Clip
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClipKind {
    Footage,
    Transition,
}

/// Everything needed to place a new clip, before it has an id or position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipDescriptor {
    pub source_ref: SourceRef,
    pub display_name: String,
    pub duration_us: TimeUs,
    pub max_duration_us: Option<TimeUs>,
}

/// A clip on the timeline.
///
/// `start_us` is derived from the clip's position and is only ever written by
/// [`Timeline`]. Duration changes also go through the timeline so the start
/// times downstream stay consistent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clip {
    pub id: Uuid,
    pub kind: ClipKind,
    pub source_ref: SourceRef,
    pub display_name: String,
    pub(crate) duration_us: TimeUs,
    pub(crate) max_duration_us: Option<TimeUs>,
    #[serde(default)]
    pub(crate) start_us: TimeUs,
}

impl Clip {
    /// Build a clip from a descriptor with a fresh id.
    ///
    /// A max below the minimum duration is raised to it, and the starting
    /// duration is clamped into `[MIN_CLIP_DURATION, max]`.
    pub fn new(kind: ClipKind, descriptor: ClipDescriptor) -> Self {
        let mut clip = Self {
            id: Uuid::new_v4(),
            kind,
            source_ref: descriptor.source_ref,
            display_name: descriptor.display_name,
            duration_us: descriptor.duration_us,
            max_duration_us: descriptor.max_duration_us,
            start_us: TimeUs::ZERO,
        };
        clip.normalize_duration();
        clip
    }

    /// Enforce `MIN_CLIP_DURATION <= duration <= max` on a clip whose fields
    /// came from outside, such as a project file.
    pub(crate) fn normalize_duration(&mut self) {
        self.max_duration_us = self.max_duration_us.map(|max| max.max(MIN_CLIP_DURATION));
        let upper = self
            .max_duration_us
            .unwrap_or(self.duration_us.max(MIN_CLIP_DURATION));
        self.duration_us = self.duration_us.clamp(MIN_CLIP_DURATION, upper);
    }

    pub fn footage(descriptor: ClipDescriptor) -> Self {
        Self::new(ClipKind::Footage, descriptor)
    }

    pub fn transition(descriptor: ClipDescriptor) -> Self {
        Self::new(ClipKind::Transition, descriptor)
    }

    pub fn duration_us(&self) -> TimeUs {
        self.duration_us
    }

    pub fn max_duration_us(&self) -> Option<TimeUs> {
        self.max_duration_us
    }

    pub fn start_us(&self) -> TimeUs {
        self.start_us
    }

    pub fn end_us(&self) -> TimeUs {
        self.start_us + self.duration_us
    }

    /// Inclusive range a resize is clamped into. Without a max the clip can
    /// only shrink from its current length.
    pub fn duration_bounds(&self) -> (TimeUs, TimeUs) {
        let upper = self.max_duration_us.unwrap_or(self.duration_us);
        (MIN_CLIP_DURATION, upper.max(MIN_CLIP_DURATION))
    }

    pub fn segment(&self) -> PlaybackSegment {
        PlaybackSegment {
            clip_id: self.id,
            source_ref: self.source_ref.clone(),
            start_us: self.start_us,
            duration_us: self.duration_us,
        }
    }
}

/// What the playback surface needs to render one clip of the timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackSegment {
    pub clip_id: Uuid,
    pub source_ref: SourceRef,
    pub start_us: TimeUs,
    pub duration_us: TimeUs,
}

impl PlaybackSegment {
    pub fn end_us(&self) -> TimeUs {
        self.start_us + self.duration_us
    }
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// The ordered clip sequence. Serialized as a plain array; start times are
/// rebuilt from the order whenever one is deserialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "Vec<Clip>", into = "Vec<Clip>")]
pub struct Timeline {
    pub(crate) clips: Vec<Clip>,
}

// ---------------------------------------------------------------------------
// ArrangeSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArrangeSettings {
    /// Horizontal scale of the timeline strip, used to turn pointer movement
    /// into duration while resizing.
    pub pixels_per_second: f64,
    pub clip_start_duration_us: TimeUs,
    pub clip_max_duration_us: TimeUs,
    pub transition_start_duration_us: TimeUs,
    pub transition_max_duration_us: TimeUs,
}

impl Default for ArrangeSettings {
    fn default() -> Self {
        Self {
            pixels_per_second: 40.0,
            clip_start_duration_us: TimeUs::from_seconds(5.0),
            clip_max_duration_us: TimeUs::from_seconds(10.0),
            transition_start_duration_us: TimeUs::from_seconds(3.0),
            transition_max_duration_us: TimeUs::from_seconds(5.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Library entries
// ---------------------------------------------------------------------------

/// A reference image kept in the project's ingredient library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub image: SourceRef,
    pub prompt: Option<String>,
    /// Kept for other tabs but not listed in the Ingredients tab.
    #[serde(default)]
    pub hidden: bool,
}

/// Footage that can be placed on the timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    pub id: Uuid,
    pub name: String,
    pub source_ref: SourceRef,
    pub source_duration_us: Option<TimeUs>,
}

/// One generated footage candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: Uuid,
    pub source_ref: SourceRef,
    pub thumbnail: SourceRef,
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub name: String,
    pub avatar: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// WorkbenchTab
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkbenchTab {
    #[default]
    Ingredients,
    Footage,
    Arrange,
    Stylization,
    Audio,
    Deliver,
}

impl WorkbenchTab {
    pub const ALL: [WorkbenchTab; 6] = [
        WorkbenchTab::Ingredients,
        WorkbenchTab::Footage,
        WorkbenchTab::Arrange,
        WorkbenchTab::Stylization,
        WorkbenchTab::Audio,
        WorkbenchTab::Deliver,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkbenchTab::Ingredients => "ingredients",
            WorkbenchTab::Footage => "footage",
            WorkbenchTab::Arrange => "arrange",
            WorkbenchTab::Stylization => "stylization",
            WorkbenchTab::Audio => "audio",
            WorkbenchTab::Deliver => "deliver",
        }
    }

    /// Resolve a route segment, falling back to the ingredients tab.
    pub fn from_segment(segment: Option<&str>) -> Self {
        segment.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for WorkbenchTab {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tab| tab.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for WorkbenchTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub settings: ArrangeSettings,
    #[serde(default)]
    pub ingredients: IngredientLibrary,
    #[serde(default)]
    pub footage: MediaLibrary,
    #[serde(default)]
    pub timeline: Timeline,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
