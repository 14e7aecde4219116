//! # Option Registry
//!
//! Declared options, their value domains, defaults and parents.
//!
//! - Declaration is the only mutation; it happens while a `Recipe` is assembled
//! - A parent must be declared before its children, so parent chains are acyclic
//! - Requested values are validated here, before any pruning happens

use crate::option_set::OptionSet;
use crate::{Domain, OptionState, OptionValue, ResolveError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// DECLARATION
// =============================================================================

/// One declared option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDecl {
    /// Unique option name.
    pub name: String,
    /// Values the option may take.
    pub domain: Domain,
    /// Value used when the option is not requested.
    pub default: OptionValue,
    /// Option that must be present and enabled for this one to exist.
    pub parent: Option<String>,
}

// =============================================================================
// REQUESTED OPTIONS
// =============================================================================

/// Option values asked for by the caller (CLI flags, profile files).
///
/// Unset options fall back to registry defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestedOptions {
    values: BTreeMap<String, OptionValue>,
}

impl RequestedOptions {
    /// Create an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `value` for `name`, replacing any earlier request.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder form of [`RequestedOptions::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Overlay every value of `other` on top of this request.
    pub fn merge(&mut self, other: RequestedOptions) {
        self.values.extend(other.values);
    }

    /// The requested value for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    /// Iterate over requested values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check if nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for RequestedOptions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut requested = Self::new();
        for (k, v) in iter {
            requested.set(k, v);
        }
        requested
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// The declared options of one recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionRegistry {
    decls: Vec<OptionDecl>,
    index: BTreeMap<String, usize>,
}

impl OptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an option.
    ///
    /// # Errors
    /// - `DuplicateOption` if `name` is already declared
    /// - `DomainViolation` if `default` is outside `domain`
    /// - `UnknownOption` if `parent` is given but not yet declared
    ///
    /// A textual boolean default (`"True"`) is parsed the way requested
    /// values are.
    pub fn declare(
        &mut self,
        name: &str,
        domain: Domain,
        default: OptionValue,
        parent: Option<&str>,
    ) -> Result<(), ResolveError> {
        if self.index.contains_key(name) {
            return Err(ResolveError::DuplicateOption(name.to_string()));
        }
        let default = match default {
            OptionValue::Choice(raw) if domain == Domain::Boolean => {
                domain.parse(&raw).unwrap_or(OptionValue::Choice(raw))
            }
            other => other,
        };
        if !domain.contains(&default) {
            return Err(ResolveError::DomainViolation {
                option: name.to_string(),
                value: default.to_string(),
                expected: domain.to_string(),
            });
        }
        if let Some(parent) = parent
            && !self.index.contains_key(parent)
        {
            return Err(ResolveError::UnknownOption(parent.to_string()));
        }

        tracing::trace!(option = name, parent = ?parent, "declared option");

        self.index.insert(name.to_string(), self.decls.len());
        self.decls.push(OptionDecl {
            name: name.to_string(),
            domain,
            default,
            parent: parent.map(str::to_string),
        });
        Ok(())
    }

    /// Declare a top-level boolean option.
    pub fn declare_flag(&mut self, name: &str, default: bool) -> Result<(), ResolveError> {
        self.declare(name, Domain::Boolean, OptionValue::Bool(default), None)
    }

    /// Declare a boolean sub-option of `parent`.
    pub fn declare_child_flag(
        &mut self,
        name: &str,
        default: bool,
        parent: &str,
    ) -> Result<(), ResolveError> {
        self.declare(name, Domain::Boolean, OptionValue::Bool(default), Some(parent))
    }

    /// Look up a declaration.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionDecl> {
        self.index.get(name).and_then(|&i| self.decls.get(i))
    }

    /// Look up a declaration, failing with `UnknownOption`.
    pub fn require(&self, name: &str) -> Result<&OptionDecl, ResolveError> {
        self.get(name)
            .ok_or_else(|| ResolveError::UnknownOption(name.to_string()))
    }

    /// Check if `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterate over declarations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &OptionDecl> {
        self.decls.iter()
    }

    /// Number of declared options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// Check if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// The option set with every option at its default value.
    #[must_use]
    pub fn defaults(&self) -> OptionSet {
        let states = self
            .decls
            .iter()
            .map(|d| (d.name.clone(), OptionState::Present(d.default.clone())))
            .collect();
        OptionSet::from_states(states)
    }

    /// Check that `value` is acceptable for option `name`.
    pub fn check_value(&self, name: &str, value: &OptionValue) -> Result<(), ResolveError> {
        let decl = self.require(name)?;
        if decl.domain.contains(value) {
            Ok(())
        } else {
            Err(ResolveError::DomainViolation {
                option: name.to_string(),
                value: value.to_string(),
                expected: decl.domain.to_string(),
            })
        }
    }

    /// Parse a textual value for option `name` under its domain.
    pub fn parse_value(&self, name: &str, raw: &str) -> Result<OptionValue, ResolveError> {
        let decl = self.require(name)?;
        decl.domain
            .parse(raw)
            .ok_or_else(|| ResolveError::DomainViolation {
                option: name.to_string(),
                value: raw.to_string(),
                expected: decl.domain.to_string(),
            })
    }

    /// Bring a requested value into the option's domain.
    ///
    /// Strings such as `"True"` arriving for a boolean option (profile files
    /// written by hand) are parsed rather than rejected.
    fn coerce(&self, name: &str, value: &OptionValue) -> Result<OptionValue, ResolveError> {
        match value {
            OptionValue::Choice(raw) if self.require(name)?.domain == Domain::Boolean => {
                self.parse_value(name, raw)
            }
            _ => {
                self.check_value(name, value)?;
                Ok(value.clone())
            }
        }
    }

    /// Overlay `requested` onto the defaults.
    ///
    /// # Errors
    /// - `UnknownOption` for a requested name that is not declared
    /// - `DomainViolation` for a requested value outside its domain
    pub fn apply(&self, requested: &RequestedOptions) -> Result<OptionSet, ResolveError> {
        let mut states: BTreeMap<String, OptionState> = self
            .decls
            .iter()
            .map(|d| (d.name.clone(), OptionState::Present(d.default.clone())))
            .collect();

        for (name, value) in requested.iter() {
            let value = self.coerce(name, value)?;
            states.insert(name.to_string(), OptionState::Present(value));
        }

        Ok(OptionSet::from_states(states))
    }
}

// =============================================================================
// TESTS
// =============================================================================
