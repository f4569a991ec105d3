//! Objective tracking.
//!
//! Agents report their id when they die; pressure plates report the ids they
//! push once their requirements are met. The tracker itself belongs to the
//! level logic and is consumed through [`ObjectiveTracker`].

use std::collections::HashMap;

use tracing::{debug, info};

/// Records collected objective ids.
pub trait ObjectiveTracker {
    /// Marks `id` as collected.
    fn notify_collected(&mut self, id: &str);
    /// Returns true if `id` has been collected.
    fn has_collected(&self, id: &str) -> bool;
}

/// In-memory tracker counting notifications per id.
#[derive(Debug, Clone, Default)]
pub struct ObjectiveLedger {
    counts: HashMap<String, u32>,
}

impl ObjectiveLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `id` was reported.
    #[must_use]
    pub fn count(&self, id: &str) -> u32 {
        self.counts.get(id).copied().unwrap_or(0)
    }

    /// Total number of notifications across all ids.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Number of distinct collected ids.
    #[must_use]
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }
}

impl ObjectiveTracker for ObjectiveLedger {
    fn notify_collected(&mut self, id: &str) {
        let count = self.counts.entry(id.to_string()).or_insert(0);
        *count += 1;
        info!("Objective '{}' collected ({}x)", id, count);
    }

    fn has_collected(&self, id: &str) -> bool {
        self.counts.contains_key(id)
    }
}

/// Floor trigger that reports ids once the right object is pushed onto it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PressurePlate {
    /// Ids reported when the plate fires
    pub pushes_ids: Vec<String>,
    /// Ids that must already be collected for the plate to fire
    pub needs_ids: Vec<String>,
}

impl PressurePlate {
    /// Creates a plate.
    #[must_use]
    pub fn new(pushes_ids: Vec<String>, needs_ids: Vec<String>) -> Self {
        Self {
            pushes_ids,
            needs_ids,
        }
    }

    /// Returns true if every required id is collected. Empty or all-blank
    /// requirements always pass.
    pub fn requirements_met(&self, tracker: &dyn ObjectiveTracker) -> bool {
        if self.needs_ids.iter().all(|id| id.is_empty()) {
            return true;
        }
        self.needs_ids.iter().all(|id| tracker.has_collected(id))
    }

    /// Handles an object entering the plate.
    ///
    /// Fires when `tag` equals `static_tag` and the requirements are met.
    /// Returns true if the plate fired.
    pub fn on_enter(&self, tag: &str, static_tag: &str, tracker: &mut dyn ObjectiveTracker) -> bool {
        if tag != static_tag {
            return false;
        }

        if !self.requirements_met(tracker) {
            debug!("Pressure plate locked, requirements {:?}", self.needs_ids);
            return false;
        }

        for id in &self.pushes_ids {
            tracker.notify_collected(id);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_counts() {
        let mut ledger = ObjectiveLedger::new();
        assert!(!ledger.has_collected("slime-1"));

        ledger.notify_collected("slime-1");
        ledger.notify_collected("slime-1");
        ledger.notify_collected("key-red");

        assert!(ledger.has_collected("slime-1"));
        assert_eq!(ledger.count("slime-1"), 2);
        assert_eq!(ledger.count("other"), 0);
        assert_eq!(ledger.total(), 3);
        assert_eq!(ledger.distinct(), 2);
    }

    #[test]
    fn test_plate_without_requirements() {
        let plate = PressurePlate::new(vec!["door-a".into(), "door-b".into()], Vec::new());
        let mut ledger = ObjectiveLedger::new();

        assert!(plate.on_enter("Static", "Static", &mut ledger));
        assert!(ledger.has_collected("door-a"));
        assert!(ledger.has_collected("door-b"));
    }

    #[test]
    fn test_plate_blank_requirements_pass() {
        let plate = PressurePlate::new(vec!["door".into()], vec![String::new(), String::new()]);
        let ledger = ObjectiveLedger::new();
        assert!(plate.requirements_met(&ledger));
    }

    #[test]
    fn test_plate_wrong_tag_ignored() {
        let plate = PressurePlate::new(vec!["door".into()], Vec::new());
        let mut ledger = ObjectiveLedger::new();

        assert!(!plate.on_enter("Player", "Static", &mut ledger));
        assert_eq!(ledger.total(), 0);
    }

    #[test]
    fn test_plate_requires_all_ids() {
        let plate = PressurePlate::new(vec!["gate".into()], vec!["key-red".into(), "key-blue".into()]);
        let mut ledger = ObjectiveLedger::new();

        ledger.notify_collected("key-red");
        assert!(!plate.on_enter("Static", "Static", &mut ledger));
        assert!(!ledger.has_collected("gate"));

        ledger.notify_collected("key-blue");
        assert!(plate.on_enter("Static", "Static", &mut ledger));
        assert!(ledger.has_collected("gate"));
    }
}
