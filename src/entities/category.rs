// 🏷️ Category Entity - top level of the price list
//
// A category is a plain value record. Its identity is the id the store
// assigned; during extraction the name → id mapping lives in an explicit
// run-scoped registry, never in shared object identity.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Store-assigned identifier of a category row.
pub type CategoryId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    pub fn new(id: CategoryId, name: impl Into<String>) -> Self {
        Category {
            id,
            name: name.into(),
        }
    }
}

/// Registry key: lowercase, inner whitespace collapsed, trimmed.
pub fn registry_key(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title-case every whitespace-separated word ("SMOKED  SALMON" → "Smoked Salmon").
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// CATEGORY REGISTRY
// ============================================================================

/// Name → slot mapping for one extraction run.
///
/// Slots are positions in the run's ordered category list, so the same
/// header appearing twice resolves to the first slot.
#[derive(Debug, Default)]
pub struct CategoryRegistry {
    slots: HashMap<String, usize>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        CategoryRegistry {
            slots: HashMap::new(),
        }
    }

    /// Slot already assigned to `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.slots.get(&registry_key(name)).copied()
    }

    /// Returns the existing slot or registers `next_slot`.
    /// The bool is true when a new entry was created.
    pub fn resolve(&mut self, name: &str, next_slot: usize) -> (usize, bool) {
        if let Some(slot) = self.lookup(name) {
            return (slot, false);
        }
        self.slots.insert(registry_key(name), next_slot);
        (next_slot, true)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("SALMON"), "Salmon");
        assert_eq!(title_case("SMOKED  SALMON "), "Smoked Salmon");
        assert_eq!(title_case("white fish"), "White Fish");
    }

    #[test]
    fn test_registry_key_normalizes_case_and_spacing() {
        assert_eq!(registry_key("Smoked   Salmon"), "smoked salmon");
        assert_eq!(registry_key(" SMOKED SALMON"), "smoked salmon");
    }

    #[test]
    fn test_registry_reuses_slot() {
        let mut registry = CategoryRegistry::new();

        let (first, created) = registry.resolve("Salmon", 0);
        assert_eq!(first, 0);
        assert!(created);

        let (second, created) = registry.resolve("Shrimp", 1);
        assert_eq!(second, 1);
        assert!(created);

        let (again, created) = registry.resolve("  salmon ", 2);
        assert_eq!(again, 0);
        assert!(!created);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("SALMON"), Some(0));
        assert_eq!(registry.lookup("Tuna"), None);
    }
}
