use std::collections::HashMap;

use crate::shared::frame::Frame;

use super::filter_id::FilterId;

/// Decoded overlay images, one per filter at most.
///
/// Filled once before the pipeline starts and read on every tick; filters
/// without an entry fall back to their solid-color shape.
#[derive(Clone, Debug, Default)]
pub struct FilterAssets {
    images: HashMap<FilterId, Frame>,
}

impl FilterAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `image` for `id`, replacing any earlier one.
    pub fn insert(&mut self, id: FilterId, image: Frame) {
        self.images.insert(id, image);
    }

    pub fn get(&self, id: FilterId) -> Option<&Frame> {
        self.images.get(&id)
    }

    pub fn contains(&self, id: FilterId) -> bool {
        self.images.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
