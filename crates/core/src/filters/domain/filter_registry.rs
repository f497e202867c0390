use super::filter_drawing::{draw_fn_for, DrawFn};
use super::filter_id::FilterId;

/// One registered filter and whether it is currently shown.
#[derive(Clone, Copy)]
pub struct FilterSpec {
    pub id: FilterId,
    pub enabled: bool,
    pub draw: DrawFn,
}

impl std::fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterSpec")
            .field("id", &self.id)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Maps every [`FilterId`] to its drawing function and tracks the active set.
///
/// Specs are stored in [`FilterId::ALL`] order, so the active filters always
/// come out in the same order no matter how they were toggled.
#[derive(Clone, Debug)]
pub struct FilterRegistry {
    specs: Vec<FilterSpec>,
}

impl FilterRegistry {
    /// Registry with every filter disabled.
    pub fn new() -> Self {
        let specs = FilterId::ALL
            .iter()
            .map(|&id| FilterSpec {
                id,
                enabled: false,
                draw: draw_fn_for(id),
            })
            .collect();
        Self { specs }
    }

    /// Registry with exactly `ids` enabled.
    pub fn with_enabled(ids: &[FilterId]) -> Self {
        let mut registry = Self::new();
        for &id in ids {
            registry.set_enabled(id, true);
        }
        registry
    }

    /// Flips `id` and returns its new state.
    pub fn toggle(&mut self, id: FilterId) -> bool {
        let spec = self.spec_mut(id);
        spec.enabled = !spec.enabled;
        log::debug!(
            "Filter {id} {}",
            if spec.enabled { "enabled" } else { "disabled" }
        );
        spec.enabled
    }

    pub fn set_enabled(&mut self, id: FilterId, enabled: bool) {
        self.spec_mut(id).enabled = enabled;
    }

    pub fn is_enabled(&self, id: FilterId) -> bool {
        self.specs.iter().any(|s| s.id == id && s.enabled)
    }

    /// Enabled filters in enumeration order.
    pub fn active_filters(&self) -> Vec<FilterSpec> {
        self.specs.iter().filter(|s| s.enabled).copied().collect()
    }

    fn spec_mut(&mut self, id: FilterId) -> &mut FilterSpec {
        // Every id is registered in `new`, and ALL is in declaration order.
        &mut self.specs[id as usize]
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_ids(registry: &FilterRegistry) -> Vec<FilterId> {
        registry.active_filters().iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_new_registry_has_nothing_active() {
        let registry = FilterRegistry::new();
        assert!(registry.active_filters().is_empty());
    }

    #[test]
    fn test_toggle_returns_new_state() {
        let mut registry = FilterRegistry::new();
        assert!(registry.toggle(FilterId::Rainbow));
        assert!(registry.is_enabled(FilterId::Rainbow));
        assert!(!registry.toggle(FilterId::Rainbow));
        assert!(!registry.is_enabled(FilterId::Rainbow));
    }

    #[test]
    fn test_double_toggle_restores_state() {
        let mut registry = FilterRegistry::with_enabled(&[FilterId::Mustache]);
        for &id in FilterId::ALL {
            let before = registry.is_enabled(id);
            registry.toggle(id);
            registry.toggle(id);
            assert_eq!(registry.is_enabled(id), before, "{id}");
        }
        assert_eq!(active_ids(&registry), vec![FilterId::Mustache]);
    }

    #[test]
    fn test_active_order_ignores_toggle_order() {
        let mut a = FilterRegistry::new();
        a.toggle(FilterId::Rainbow);
        a.toggle(FilterId::Sunglasses);
        a.toggle(FilterId::ClownNose);

        let mut b = FilterRegistry::new();
        b.toggle(FilterId::ClownNose);
        b.toggle(FilterId::Rainbow);
        b.toggle(FilterId::Sunglasses);

        let expected = vec![FilterId::Sunglasses, FilterId::ClownNose, FilterId::Rainbow];
        assert_eq!(active_ids(&a), expected);
        assert_eq!(active_ids(&b), expected);
    }

    #[test]
    fn test_specs_map_to_their_own_id() {
        let registry = FilterRegistry::with_enabled(FilterId::ALL);
        assert_eq!(active_ids(&registry), FilterId::ALL);
    }
}
