//! # Requirement Deriver
//!
//! Maps the frozen option set to the external components it needs, as
//! `name/version` pins for a downstream fetch/link tool.
//!
//! - Rules are pure conjunctions of "option is enabled" checks
//! - Specifiers with the same name and version merge into one entry
//! - The same name at two versions is a `RequirementConflict`, never a pick

use crate::option_set::ResolvedOptions;
use crate::registry::OptionRegistry;
use crate::ResolveError;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// REQUIREMENT SPECIFIER
// =============================================================================

/// An external component pinned to an exact version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequirementSpec {
    pub name: String,
    pub version: String,
}

impl RequirementSpec {
    /// Create a specifier.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for RequirementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

impl FromStr for RequirementSpec {
    type Err = ResolveError;

    /// Parse `name/version`. Both halves must be non-empty and free of spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ResolveError::InvalidManifest(format!("invalid requirement '{}'", s));
        let (name, version) = s.trim().split_once('/').ok_or_else(invalid)?;
        let well_formed = |part: &str| {
            !part.is_empty() && !part.contains('/') && !part.chars().any(char::is_whitespace)
        };
        if !well_formed(name) || !well_formed(version) {
            return Err(invalid());
        }
        Ok(Self::new(name, version))
    }
}

// =============================================================================
// RULES
// =============================================================================

/// When every option in `when` is enabled, `requires` is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementRule {
    pub when: Vec<String>,
    pub requires: Vec<RequirementSpec>,
}

impl RequirementRule {
    /// Create a rule from option names and specifiers.
    #[must_use]
    pub fn new<W, S>(when: W, requires: Vec<RequirementSpec>) -> Self
    where
        W: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            when: when.into_iter().map(Into::into).collect(),
            requires,
        }
    }

    /// Evaluate the predicate. Pruned options read as disabled.
    pub fn holds(&self, options: &ResolvedOptions) -> Result<bool, ResolveError> {
        for option in &self.when {
            if !options.is_enabled(option)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// =============================================================================
// REQUIREMENT SET
// =============================================================================

/// The merged requirement manifest of one run, ordered by component name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementSet {
    specs: BTreeMap<String, RequirementSpec>,
}

impl RequirementSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a specifier, merging with an identical pin.
    ///
    /// # Errors
    /// `RequirementConflict` if the component is already pinned elsewhere.
    pub fn insert(&mut self, spec: RequirementSpec) -> Result<(), ResolveError> {
        match self.specs.entry(spec.name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(spec);
                Ok(())
            }
            Entry::Occupied(existing) if existing.get().version == spec.version => Ok(()),
            Entry::Occupied(existing) => Err(ResolveError::RequirementConflict {
                component: spec.name.clone(),
                first: existing.get().to_string(),
                second: spec.to_string(),
            }),
        }
    }

    /// The pin for a component, if required.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RequirementSpec> {
        self.specs.get(name)
    }

    /// Check if a component is required.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    /// Iterate over pins in component-name order.
    pub fn iter(&self) -> impl Iterator<Item = &RequirementSpec> {
        self.specs.values()
    }

    /// Number of required components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Check if nothing is required.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Serialize for RequirementSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.specs.values())
    }
}

// =============================================================================
// DERIVER
// =============================================================================

/// The requirement rule table of a recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementDeriver {
    rules: Vec<RequirementRule>,
}

impl RequirementDeriver {
    /// Create a deriver with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule.
    pub fn add_rule(&mut self, rule: RequirementRule) {
        self.rules.push(rule);
    }

    /// Append a rule from option names and `name/version` strings.
    pub fn require(&mut self, when: &[&str], requires: &[&str]) -> Result<(), ResolveError> {
        let specs = requires
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<RequirementSpec>, _>>()?;
        self.add_rule(RequirementRule::new(when.iter().copied(), specs));
        Ok(())
    }

    /// Rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[RequirementRule] {
        &self.rules
    }

    /// Check the rule table against the registry.
    ///
    /// # Errors
    /// - `UnknownOption` if a predicate names an undeclared option
    /// - `InvalidManifest` if a rule has an empty predicate or no specifiers
    pub fn validate(&self, registry: &OptionRegistry) -> Result<(), ResolveError> {
        for rule in &self.rules {
            if rule.when.is_empty() || rule.requires.is_empty() {
                return Err(ResolveError::InvalidManifest(format!(
                    "requirement rule needs at least one option and one component (got {:?} -> {:?})",
                    rule.when,
                    rule.requires.iter().map(ToString::to_string).collect::<Vec<_>>()
                )));
            }
            for option in &rule.when {
                registry.require(option)?;
            }
        }
        Ok(())
    }

    /// Evaluate every rule and merge the satisfied specifiers.
    pub fn derive(&self, options: &ResolvedOptions) -> Result<RequirementSet, ResolveError> {
        let mut set = RequirementSet::new();
        for rule in &self.rules {
            if !rule.holds(options)? {
                continue;
            }
            for spec in &rule.requires {
                set.insert(spec.clone())?;
            }
        }
        tracing::debug!(count = set.len(), "derived requirements");
        Ok(set)
    }
}

// =============================================================================
// TESTS
// =============================================================================
