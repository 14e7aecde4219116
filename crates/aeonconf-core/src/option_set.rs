//! # Option Sets
//!
//! Two views of the same mapping from option name to [`OptionState`]:
//!
//! - [`OptionSet`]: the working copy. Created from the registry defaults plus
//!   requested values, mutated only by the pruning and gating phases.
//! - [`ResolvedOptions`]: the frozen result. No mutating API; every reader
//!   (requirement derivation, variable emission, output) borrows it.
//!
//! Both hold an entry for EVERY declared option. A pruned option stays in
//! the map as `OptionState::Absent`, so "declared but pruned" and "never
//! declared" can always be told apart.

use crate::{OptionState, OptionValue, Removal, ResolveError};
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// WORKING SET
// =============================================================================

/// Mutable option set used while a resolution run is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSet {
    states: BTreeMap<String, OptionState>,
}

impl OptionSet {
    pub(crate) fn from_states(states: BTreeMap<String, OptionState>) -> Self {
        Self { states }
    }

    /// The state of `name`, or `None` if it was never declared.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionState> {
        self.states.get(name)
    }

    /// Whether `name` is present and enabled.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.states.get(name).is_some_and(OptionState::is_enabled)
    }

    /// Whether `name` currently holds a value.
    #[must_use]
    pub fn is_present(&self, name: &str) -> bool {
        self.states.get(name).is_some_and(OptionState::is_present)
    }

    /// Iterate over all declared options in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionState)> {
        self.states.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared options (present or absent).
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Check if no options are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Mark a present option absent. Returns `true` if it was present.
    ///
    /// Removing an already-absent option keeps its original removal cause.
    pub(crate) fn remove(&mut self, name: &str, removal: Removal) -> bool {
        match self.states.get_mut(name) {
            Some(state) if state.is_present() => {
                *state = OptionState::Absent(removal);
                true
            }
            _ => false,
        }
    }

    /// Overwrite the value of a present option. Returns `true` if applied.
    ///
    /// Absent options stay absent.
    pub(crate) fn force(&mut self, name: &str, value: OptionValue) -> bool {
        match self.states.get_mut(name) {
            Some(state) if state.is_present() => {
                *state = OptionState::Present(value);
                true
            }
            _ => false,
        }
    }

    /// Freeze the set. After this no phase can change it.
    #[must_use]
    pub fn freeze(self) -> ResolvedOptions {
        ResolvedOptions {
            states: self.states,
        }
    }
}

// =============================================================================
// FROZEN SET
// =============================================================================

/// The final option set of one resolution run.
///
/// Every accessor takes the two-tier view: an undeclared name is an
/// [`ResolveError::UnknownOption`], a pruned one is simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedOptions {
    states: BTreeMap<String, OptionState>,
}

impl ResolvedOptions {
    /// The state of a declared option.
    pub fn lookup(&self, name: &str) -> Result<&OptionState, ResolveError> {
        self.states
            .get(name)
            .ok_or_else(|| ResolveError::UnknownOption(name.to_string()))
    }

    /// The value of a declared option, `None` when absent.
    pub fn value(&self, name: &str) -> Result<Option<&OptionValue>, ResolveError> {
        Ok(self.lookup(name)?.value())
    }

    /// Whether a declared option is present and enabled.
    pub fn is_enabled(&self, name: &str) -> Result<bool, ResolveError> {
        Ok(self.lookup(name)?.is_enabled())
    }

    /// Whether a declared option is present.
    pub fn is_present(&self, name: &str) -> Result<bool, ResolveError> {
        Ok(self.lookup(name)?.is_present())
    }

    /// Check if `name` was declared at all.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// Iterate over all declared options in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionState)> {
        self.states.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over present options and their values in name order.
    pub fn present(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.states
            .iter()
            .filter_map(|(k, v)| v.value().map(|value| (k.as_str(), value)))
    }

    /// Number of declared options (present or absent).
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Check if no options are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
