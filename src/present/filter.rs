/// Category and object selection for the result list and overlay.
///
/// `active_object_index` always refers to a position in the service-returned
/// array, never to a position in a sorted or filtered view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterState {
    pub active_category: Option<String>,
    pub active_object_index: Option<usize>,
}

impl FilterState {
    /// Toggle `category` and clear the object selection.
    ///
    /// The old selection may not belong to the new category, so it never survives.
    pub fn select_category(&self, category: &str) -> FilterState {
        let active_category = match &self.active_category {
            Some(active) if active == category => None,
            _ => Some(category.to_string()),
        };
        FilterState {
            active_category,
            active_object_index: None,
        }
    }

    /// Toggle the object at `original_index`, keeping the category filter.
    pub fn select_object(&self, original_index: usize) -> FilterState {
        let active_object_index = match self.active_object_index {
            Some(active) if active == original_index => None,
            _ => Some(original_index),
        };
        FilterState {
            active_category: self.active_category.clone(),
            active_object_index,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_category.is_some() || self.active_object_index.is_some()
    }

    /// Passes the category filter (when set).
    pub fn matches_category(&self, parent: &str) -> bool {
        self.active_category
            .as_deref()
            .map_or(true, |category| category == parent)
    }

    /// Passes both filters; each is independently optional.
    pub fn passes(&self, original_index: usize, parent: &str) -> bool {
        self.matches_category(parent)
            && self
                .active_object_index
                .map_or(true, |active| active == original_index)
    }
}
