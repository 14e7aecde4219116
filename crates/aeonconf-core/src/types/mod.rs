//! # Core Type Definitions
//!
//! This module contains the value-level types shared by every phase:
//! - Option values and their domains (`OptionValue`, `Domain`)
//! - The tagged resolved state of an option (`OptionState`, `Removal`)
//! - Error types (`ResolveError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Implement `Ord` (or are only ever stored in ordered collections)
//! - Carry no floating point and no interior mutability

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// OPTION VALUES
// =============================================================================

/// A typed option value.
///
/// Serialized untagged so profiles and JSON output read naturally:
/// `shared = true`, `backend = "vulkan"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// A boolean flag value.
    Bool(bool),
    /// One member of an enumerated domain.
    Choice(String),
}

impl OptionValue {
    /// Create a choice value.
    #[must_use]
    pub fn choice(s: impl Into<String>) -> Self {
        Self::Choice(s.into())
    }

    /// Whether this value turns its option "on".
    ///
    /// Booleans are enabled when `true`. A selected enumerator is always an
    /// active value; an enumerated option is disabled only by being pruned.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Choice(_) => true,
        }
    }

    /// The boolean payload, if this is a boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Choice(_) => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Choice(s) => write!(f, "{}", s),
        }
    }
}

// =============================================================================
// DOMAINS
// =============================================================================

/// The set of values an option may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// `true` or `false`.
    Boolean,
    /// A closed list of string choices, in declaration order.
    Enumeration(Vec<String>),
}

impl Domain {
    /// Build an enumeration domain from string-like members.
    #[must_use]
    pub fn enumeration<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enumeration(members.into_iter().map(Into::into).collect())
    }

    /// Check whether `value` belongs to this domain.
    #[must_use]
    pub fn contains(&self, value: &OptionValue) -> bool {
        match (self, value) {
            (Self::Boolean, OptionValue::Bool(_)) => true,
            (Self::Enumeration(members), OptionValue::Choice(c)) => members.contains(c),
            _ => false,
        }
    }

    /// Parse a textual value under this domain.
    ///
    /// Booleans accept `true`/`false` in any letter case (`True`/`False`
    /// included). Enumerations require an exact member name.
    #[must_use]
    pub fn parse(&self, raw: &str) -> Option<OptionValue> {
        let raw = raw.trim();
        match self {
            Self::Boolean => {
                if raw.eq_ignore_ascii_case("true") {
                    Some(OptionValue::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Some(OptionValue::Bool(false))
                } else {
                    None
                }
            }
            Self::Enumeration(members) => members
                .iter()
                .find(|m| m.as_str() == raw)
                .map(|m| OptionValue::Choice(m.clone())),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "true|false"),
            Self::Enumeration(members) => write!(f, "{}", members.join("|")),
        }
    }
}

// =============================================================================
// RESOLVED STATE
// =============================================================================

/// Why an option was removed from the active set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Removal {
    /// Removed by a build-mode rule (e.g. shared builds drop `fPIC`).
    BuildMode { rule: String },
    /// Removed by a platform exclusion rule.
    Platform { rule: String },
    /// Removed because its parent option is absent or disabled.
    Gated { parent: String },
}

impl fmt::Display for Removal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuildMode { rule } => write!(f, "build mode: {}", rule),
            Self::Platform { rule } => write!(f, "platform: {}", rule),
            Self::Gated { parent } => write!(f, "parent '{}' is disabled", parent),
        }
    }
}

/// The state of one declared option during and after resolution.
///
/// Absence is a value, not a missing key: a pruned option is still listed,
/// tagged with the reason it was removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionState {
    /// The option is active with this value.
    Present(OptionValue),
    /// The option was pruned or gated away.
    Absent(Removal),
}

impl OptionState {
    /// Whether the option holds a value.
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// The held value, if present.
    #[must_use]
    pub fn value(&self) -> Option<&OptionValue> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent(_) => None,
        }
    }

    /// Whether the option is present and enabled. Absent reads as disabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.value().is_some_and(OptionValue::is_enabled)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while assembling a recipe or resolving options.
///
/// - No silent failures: every variant halts the run
/// - No partial output is returned alongside an error
/// - Every variant names the offending option or component
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// A requested or referenced option name was never declared.
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// A value lies outside the option's declared domain.
    #[error("Value '{value}' is outside the domain of option '{option}' (expected {expected})")]
    DomainViolation {
        option: String,
        value: String,
        expected: String,
    },

    /// The same option name was declared twice.
    #[error("Duplicate option: {0}")]
    DuplicateOption(String),

    /// Two satisfied requirement rules pin the same component to different versions.
    #[error("Requirement conflict on '{component}': {first} vs {second}")]
    RequirementConflict {
        component: String,
        first: String,
        second: String,
    },

    /// The same build variable (or option-to-variable mapping) was declared twice.
    #[error("Duplicate variable: {0}")]
    DuplicateVariable(String),

    /// A recipe manifest, specifier or platform name could not be understood.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// A well-formed lockfile disagrees with the current resolution.
    #[error("Lockfile mismatch: {0}")]
    LockMismatch(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_domain_parses_any_case() {
        let domain = Domain::Boolean;
        assert_eq!(domain.parse("True"), Some(OptionValue::Bool(true)));
        assert_eq!(domain.parse("FALSE"), Some(OptionValue::Bool(false)));
        assert_eq!(domain.parse(" true "), Some(OptionValue::Bool(true)));
        assert_eq!(domain.parse("yes"), None);
        assert_eq!(domain.parse("1"), None);
    }

    #[test]
    fn enumeration_domain_requires_exact_member() {
        let domain = Domain::enumeration(["gl", "vulkan"]);
        assert_eq!(domain.parse("vulkan"), Some(OptionValue::choice("vulkan")));
        assert_eq!(domain.parse("Vulkan"), None);
        assert!(domain.contains(&OptionValue::choice("gl")));
        assert!(!domain.contains(&OptionValue::Bool(true)));
    }

    #[test]
    fn boolean_domain_rejects_choices() {
        assert!(!Domain::Boolean.contains(&OptionValue::choice("true")));
    }

    #[test]
    fn absent_state_reads_as_disabled() {
        let state = OptionState::Absent(Removal::Gated {
            parent: "with_platform".to_string(),
        });
        assert!(!state.is_present());
        assert!(!state.is_enabled());
        assert_eq!(state.value(), None);
    }

    #[test]
    fn choice_values_are_enabled() {
        assert!(OptionValue::choice("sdl2").is_enabled());
        assert!(!OptionValue::Bool(false).is_enabled());
    }

    #[test]
    fn option_value_serializes_untagged() {
        let json = serde_json::to_string(&OptionValue::Bool(true)).expect("serialize");
        assert_eq!(json, "true");
        let json = serde_json::to_string(&OptionValue::choice("gl")).expect("serialize");
        assert_eq!(json, "\"gl\"");
    }
}
