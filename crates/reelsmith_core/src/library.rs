use crate::error::{CoreError, Result};
use crate::types::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// IngredientLibrary
// ---------------------------------------------------------------------------

/// Reference images shared by the workbench tabs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct IngredientLibrary {
    ingredients: Vec<Ingredient>,
}

impl IngredientLibrary {
    pub fn add(&mut self, ingredient: Ingredient) {
        self.ingredients.push(ingredient);
    }

    pub fn remove(&mut self, id: Uuid) -> Result<Ingredient> {
        let pos = self
            .ingredients
            .iter()
            .position(|i| i.id == id)
            .ok_or(CoreError::IngredientNotFound(id))?;
        Ok(self.ingredients.remove(pos))
    }

    pub fn get(&self, id: Uuid) -> Option<&Ingredient> {
        self.ingredients.iter().find(|i| i.id == id)
    }

    pub fn all(&self) -> &[Ingredient] {
        &self.ingredients
    }

    /// Ingredients listed in the Ingredients tab.
    pub fn visible(&self) -> impl Iterator<Item = &Ingredient> {
        self.ingredients.iter().filter(|i| !i.hidden)
    }
}

// ---------------------------------------------------------------------------
// MediaLibrary
// ---------------------------------------------------------------------------

/// Footage that can be dragged onto the timeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MediaLibrary {
    items: Vec<MediaItem>,
}

impl MediaLibrary {
    pub fn add(&mut self, item: MediaItem) {
        self.items.push(item);
    }

    pub fn remove(&mut self, id: Uuid) -> Result<MediaItem> {
        let pos = self
            .items
            .iter()
            .position(|m| m.id == id)
            .ok_or(CoreError::MediaNotFound(id))?;
        Ok(self.items.remove(pos))
    }

    pub fn get(&self, id: Uuid) -> Option<&MediaItem> {
        self.items.iter().find(|m| m.id == id)
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }
}

/// Descriptor for placing library footage on the timeline: the configured
/// starting duration, capped by the source length when it is known and by
/// the configured max otherwise.
pub fn footage_descriptor(item: &MediaItem, settings: &ArrangeSettings) -> ClipDescriptor {
    let max = item
        .source_duration_us
        .unwrap_or(settings.clip_max_duration_us);
    ClipDescriptor {
        source_ref: item.source_ref.clone(),
        display_name: item.name.clone(),
        duration_us: settings.clip_start_duration_us.min(max),
        max_duration_us: Some(max),
    }
}

// ---------------------------------------------------------------------------
// CandidateSet
// ---------------------------------------------------------------------------

/// Generated footage candidates: the latest batch, the one being previewed,
/// and every batch produced so far (newest first).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    current: Vec<Candidate>,
    selected: Option<Uuid>,
    history: Vec<Candidate>,
}

impl CandidateSet {
    /// Replace the current batch with a new one and preview its first entry.
    pub fn replace(&mut self, batch: Vec<Candidate>) {
        self.selected = batch.first().map(|c| c.id);
        self.history.splice(0..0, batch.iter().cloned());
        self.current = batch;
    }

    pub fn select(&mut self, id: Uuid) -> Result<&Candidate> {
        let candidate = self
            .current
            .iter()
            .find(|c| c.id == id)
            .ok_or(CoreError::CandidateNotFound(id))?;
        self.selected = Some(id);
        Ok(candidate)
    }

    /// Drop a candidate from the current batch. Deleting the previewed one
    /// moves the preview to the first remaining candidate.
    pub fn delete(&mut self, id: Uuid) -> Result<Candidate> {
        let pos = self
            .current
            .iter()
            .position(|c| c.id == id)
            .ok_or(CoreError::CandidateNotFound(id))?;
        let removed = self.current.remove(pos);
        if self.selected == Some(id) {
            self.selected = self.current.first().map(|c| c.id);
        }
        Ok(removed)
    }

    pub fn current(&self) -> &[Candidate] {
        &self.current
    }

    pub fn selected(&self) -> Option<&Candidate> {
        let id = self.selected?;
        self.current.iter().find(|c| c.id == id)
    }

    pub fn history(&self) -> &[Candidate] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(name: &str, hidden: bool) -> Ingredient {
        Ingredient {
            id: Uuid::new_v4(),
            name: name.to_string(),
            image: format!("ingredients/{name}.png").into(),
            prompt: Some(format!("{name} reference")),
            hidden,
        }
    }

    fn candidate(n: usize) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            source_ref: format!("candidates/{n}.mp4").into(),
            thumbnail: format!("candidates/{n}.jpg").into(),
        }
    }

    fn media(source_s: Option<f64>) -> MediaItem {
        MediaItem {
            id: Uuid::new_v4(),
            name: "shot".to_string(),
            source_ref: "media/shot.mp4".into(),
            source_duration_us: source_s.map(TimeUs::from_seconds),
        }
    }

    #[test]
    fn ingredient_add_remove() {
        let mut lib = IngredientLibrary::default();
        let leaf = ingredient("leaf", false);
        let leaf_id = leaf.id;
        lib.add(leaf);
        lib.add(ingredient("dog", false));

        assert_eq!(lib.remove(leaf_id).unwrap().name, "leaf");
        assert_eq!(lib.all().len(), 1);
        assert!(matches!(
            lib.remove(leaf_id).unwrap_err(),
            CoreError::IngredientNotFound(_)
        ));
    }

    #[test]
    fn hidden_ingredients_are_not_visible_but_resolvable() {
        let mut lib = IngredientLibrary::default();
        let hidden = ingredient("prediction", true);
        let hidden_id = hidden.id;
        lib.add(ingredient("leaf", false));
        lib.add(hidden);

        let names: Vec<&str> = lib.visible().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["leaf"]);
        assert!(lib.get(hidden_id).is_some());
    }

    #[test]
    fn footage_descriptor_uses_configured_start_and_max() {
        let settings = ArrangeSettings::default();
        let d = footage_descriptor(&media(None), &settings);
        assert_eq!(d.duration_us, TimeUs::from_seconds(5.0));
        assert_eq!(d.max_duration_us, Some(TimeUs::from_seconds(10.0)));
    }

    #[test]
    fn footage_descriptor_caps_start_by_short_source() {
        let settings = ArrangeSettings::default();
        let d = footage_descriptor(&media(Some(3.0)), &settings);
        assert_eq!(d.duration_us, TimeUs::from_seconds(3.0));
        assert_eq!(d.max_duration_us, Some(TimeUs::from_seconds(3.0)));

        let long = footage_descriptor(&media(Some(42.0)), &settings);
        assert_eq!(long.duration_us, TimeUs::from_seconds(5.0));
        assert_eq!(long.max_duration_us, Some(TimeUs::from_seconds(42.0)));
    }

    #[test]
    fn media_library_remove_unknown_fails() {
        let mut lib = MediaLibrary::default();
        lib.add(media(None));
        assert!(matches!(
            lib.remove(Uuid::new_v4()).unwrap_err(),
            CoreError::MediaNotFound(_)
        ));
        assert_eq!(lib.items().len(), 1);
    }

    #[test]
    fn candidate_batches_select_first_and_prepend_history() {
        let mut set = CandidateSet::default();
        let first = vec![candidate(1), candidate(2)];
        set.replace(first.clone());
        assert_eq!(set.selected().unwrap().id, first[0].id);

        let second = vec![candidate(3)];
        set.replace(second.clone());
        assert_eq!(set.current(), second.as_slice());
        assert_eq!(set.history().len(), 3);
        assert_eq!(set.history()[0].id, second[0].id);
        assert_eq!(set.history()[2].id, first[1].id);
    }

    #[test]
    fn deleting_selected_candidate_falls_back_to_first() {
        let mut set = CandidateSet::default();
        let batch = vec![candidate(1), candidate(2), candidate(3)];
        set.replace(batch.clone());
        set.select(batch[1].id).unwrap();

        set.delete(batch[1].id).unwrap();
        assert_eq!(set.selected().unwrap().id, batch[0].id);

        set.delete(batch[2].id).unwrap();
        assert_eq!(set.selected().unwrap().id, batch[0].id);

        set.delete(batch[0].id).unwrap();
        assert!(set.selected().is_none());
        assert_eq!(set.history().len(), 3);
    }

    #[test]
    fn selecting_unknown_candidate_fails() {
        let mut set = CandidateSet::default();
        set.replace(vec![candidate(1)]);
        assert!(matches!(
            set.select(Uuid::new_v4()).unwrap_err(),
            CoreError::CandidateNotFound(_)
        ));
    }
}
