//! Row selection for bulk operations.

use std::collections::BTreeSet;

use roster_api_models::ResourceId;

/// Set of selected ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<ResourceId>,
}

impl Selection {
    /// Add `id` if absent, remove it if present.
    pub fn toggle(&mut self, id: ResourceId) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    /// Select every visible id, or clear if all are already selected.
    pub fn select_all_or_clear(&mut self, visible: &[ResourceId]) {
        let all_selected = !visible.is_empty() && visible.iter().all(|id| self.ids.contains(id));
        if all_selected {
            self.ids.clear();
        } else {
            self.ids = visible.iter().cloned().collect();
        }
    }

    /// Drop every id.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Forget a single id.
    pub fn remove(&mut self, id: &ResourceId) {
        self.ids.remove(id);
    }

    /// Keep only ids still visible.
    pub fn retain_visible(&mut self, visible: &[ResourceId]) {
        self.ids.retain(|id| visible.contains(id));
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.ids.contains(id)
    }

    /// Selected ids in order.
    #[must_use]
    pub fn ids(&self) -> Vec<ResourceId> {
        self.ids.iter().cloned().collect()
    }

    /// Number of selected ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[i64]) -> Vec<ResourceId> {
        values.iter().copied().map(ResourceId::Int).collect()
    }

    #[test]
    fn toggle_adds_and_removes() {
        let mut selection = Selection::default();
        selection.toggle(ResourceId::Int(1));
        selection.toggle(ResourceId::Int(2));
        selection.toggle(ResourceId::Int(1));
        assert_eq!(selection.ids(), ids(&[2]));
    }

    #[test]
    fn select_all_toggles_between_all_and_none() {
        let visible = ids(&[1, 2, 3]);
        let mut selection = Selection::default();
        selection.toggle(ResourceId::Int(2));
        selection.select_all_or_clear(&visible);
        assert_eq!(selection.len(), 3);
        selection.select_all_or_clear(&visible);
        assert!(selection.is_empty());
        selection.select_all_or_clear(&[]);
        assert!(selection.is_empty());
    }

    #[test]
    fn retain_visible_drops_rows_that_left_the_page() {
        let mut selection = Selection::default();
        selection.select_all_or_clear(&ids(&[1, 2, 3]));
        selection.retain_visible(&ids(&[2, 3, 4]));
        assert_eq!(selection.ids(), ids(&[2, 3]));
        assert!(!selection.contains(&ResourceId::Int(1)));
    }
}
