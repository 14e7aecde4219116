//! # Variable Emitter
//!
//! Maps the frozen option set to the flat variable table handed to the
//! build driver.
//!
//! - Every option-backed variable is always emitted; pruned options emit `false`
//! - Composite flags (`AnyOf`) exist only here, never in gates or requirement rules
//! - Variables have a logical name (table key) and a driver name (what the
//!   build system sees), `<prefix><NAME>` unless overridden

use crate::option_set::ResolvedOptions;
use crate::registry::OptionRegistry;
use crate::{OptionValue, ResolveError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// =============================================================================
// VALUES
// =============================================================================

/// A typed build variable value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Bool(bool),
    Str(String),
}

impl VariableValue {
    /// The value as the build driver spells it (`ON`/`OFF` for booleans).
    #[must_use]
    pub fn to_driver_string(&self) -> String {
        match self {
            Self::Bool(true) => "ON".to_string(),
            Self::Bool(false) => "OFF".to_string(),
            Self::Str(s) => s.clone(),
        }
    }

    /// The boolean payload, if any.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Str(_) => None,
        }
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<&OptionValue> for VariableValue {
    fn from(value: &OptionValue) -> Self {
        match value {
            OptionValue::Bool(b) => Self::Bool(*b),
            OptionValue::Choice(s) => Self::Str(s.clone()),
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

// =============================================================================
// BUILD MODE
// =============================================================================

/// Static or shared library build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Static,
    Shared,
}

impl BuildMode {
    /// Read the build mode from the resolved value of `option`.
    pub fn from_options(options: &ResolvedOptions, option: &str) -> Result<Self, ResolveError> {
        Ok(if options.is_enabled(option)? {
            Self::Shared
        } else {
            Self::Static
        })
    }

    /// Check if this is a shared build.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Shared => write!(f, "shared"),
        }
    }
}

// =============================================================================
// RULES
// =============================================================================

/// One operand of a composite flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// The option is present and enabled.
    Option(String),
    /// The build is shared.
    SharedBuild,
}

/// Where a variable's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableSource {
    /// The option's value; `false` when the option is absent.
    Option(String),
    /// A fixed value.
    Constant(VariableValue),
    /// `true` if any operand holds.
    AnyOf(Vec<Term>),
}

/// Maps one source to one named variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRule {
    pub name: String,
    pub source: VariableSource,
    pub driver_name: Option<String>,
}

impl VariableRule {
    /// Variable mirroring an option.
    #[must_use]
    pub fn option(name: &str, option: &str) -> Self {
        Self {
            name: name.to_string(),
            source: VariableSource::Option(option.to_string()),
            driver_name: None,
        }
    }

    /// Variable with a fixed value.
    #[must_use]
    pub fn constant(name: &str, value: impl Into<VariableValue>) -> Self {
        Self {
            name: name.to_string(),
            source: VariableSource::Constant(value.into()),
            driver_name: None,
        }
    }

    /// Composite flag, true if any term holds.
    #[must_use]
    pub fn any_of(name: &str, terms: Vec<Term>) -> Self {
        Self {
            name: name.to_string(),
            source: VariableSource::AnyOf(terms),
            driver_name: None,
        }
    }

    /// Override the driver-facing name.
    #[must_use]
    pub fn driver(mut self, driver_name: &str) -> Self {
        self.driver_name = Some(driver_name.to_string());
        self
    }

    fn evaluate(
        &self,
        options: &ResolvedOptions,
        mode: BuildMode,
    ) -> Result<VariableValue, ResolveError> {
        match &self.source {
            VariableSource::Option(option) => Ok(options
                .value(option)?
                .map(VariableValue::from)
                .unwrap_or(VariableValue::Bool(false))),
            VariableSource::Constant(value) => Ok(value.clone()),
            VariableSource::AnyOf(terms) => {
                for term in terms {
                    let holds = match term {
                        Term::Option(option) => options.is_enabled(option)?,
                        Term::SharedBuild => mode.is_shared(),
                    };
                    if holds {
                        return Ok(VariableValue::Bool(true));
                    }
                }
                Ok(VariableValue::Bool(false))
            }
        }
    }
}

// =============================================================================
// VARIABLE TABLE
// =============================================================================

/// The flat table handed to the build driver, keyed by logical name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VariableTable {
    values: BTreeMap<String, VariableValue>,
}

impl VariableTable {
    /// The value of a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.values.get(name)
    }

    /// Check if a variable is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate over variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariableValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// EMITTER
// =============================================================================

/// The variable rule table of a recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableEmitter {
    prefix: String,
    rules: Vec<VariableRule>,
}

impl VariableEmitter {
    /// Create an emitter whose default driver names start with `prefix`.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            rules: Vec::new(),
        }
    }

    /// Append a rule.
    pub fn add(&mut self, rule: VariableRule) {
        self.rules.push(rule);
    }

    /// Rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[VariableRule] {
        &self.rules
    }

    /// The driver-name prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The name the build driver sees for `rule`.
    #[must_use]
    pub fn driver_name(&self, rule: &VariableRule) -> String {
        rule.driver_name
            .clone()
            .unwrap_or_else(|| format!("{}{}", self.prefix, rule.name.to_ascii_uppercase()))
    }

    /// Options that feed a variable directly.
    pub fn build_facing_options(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().filter_map(|rule| match &rule.source {
            VariableSource::Option(option) => Some(option.as_str()),
            _ => None,
        })
    }

    /// Check the rule table against the registry.
    ///
    /// # Errors
    /// - `DuplicateVariable` if a logical or driver name repeats, or an
    ///   option feeds two option-backed variables
    /// - `UnknownOption` if a rule names an undeclared option
    pub fn validate(&self, registry: &OptionRegistry) -> Result<(), ResolveError> {
        let mut names = BTreeSet::new();
        let mut driver_names = BTreeSet::new();
        let mut mapped = BTreeSet::new();

        for rule in &self.rules {
            if !names.insert(rule.name.as_str()) {
                return Err(ResolveError::DuplicateVariable(rule.name.clone()));
            }
            let driver = self.driver_name(rule);
            if !driver_names.insert(driver.clone()) {
                return Err(ResolveError::DuplicateVariable(driver));
            }
            match &rule.source {
                VariableSource::Option(option) => {
                    registry.require(option)?;
                    if !mapped.insert(option.as_str()) {
                        return Err(ResolveError::DuplicateVariable(format!(
                            "{} (option '{}' already mapped)",
                            rule.name, option
                        )));
                    }
                }
                VariableSource::AnyOf(terms) => {
                    for term in terms {
                        if let Term::Option(option) = term {
                            registry.require(option)?;
                        }
                    }
                }
                VariableSource::Constant(_) => {}
            }
        }
        Ok(())
    }

    /// Emit one entry per rule.
    pub fn emit(
        &self,
        options: &ResolvedOptions,
        mode: BuildMode,
    ) -> Result<VariableTable, ResolveError> {
        let mut values = BTreeMap::new();
        for rule in &self.rules {
            values.insert(rule.name.clone(), rule.evaluate(options, mode)?);
        }
        tracing::debug!(count = values.len(), mode = %mode, "emitted variables");
        Ok(VariableTable { values })
    }

    /// Render `table` as `-DNAME=VALUE` arguments, in rule order.
    #[must_use]
    pub fn driver_args(&self, table: &VariableTable) -> Vec<String> {
        self.rules
            .iter()
            .filter_map(|rule| {
                table.get(&rule.name).map(|value| {
                    format!("-D{}={}", self.driver_name(rule), value.to_driver_string())
                })
            })
            .collect()
    }

    /// Render `table` as a CMake initial-cache script, in rule order.
    #[must_use]
    pub fn cmake_cache(&self, table: &VariableTable) -> String {
        let mut script = String::new();
        for rule in &self.rules {
            let Some(value) = table.get(&rule.name) else {
                continue;
            };
            let name = self.driver_name(rule);
            match value {
                VariableValue::Bool(_) => script.push_str(&format!(
                    "set({} {} CACHE BOOL \"\")\n",
                    name,
                    value.to_driver_string()
                )),
                VariableValue::Str(s) => script.push_str(&format!(
                    "set({} \"{}\" CACHE STRING \"\")\n",
                    name,
                    s.replace('\\', "\\\\").replace('"', "\\\"")
                )),
            }
        }
        script
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RequestedOptions;
    use crate::{Domain, Removal};

    fn registry() -> OptionRegistry {
        let mut registry = OptionRegistry::new();
        registry.declare_flag("shared", false).expect("declare");
        registry.declare_flag("fPIC", true).expect("declare");
        registry.declare_flag("with_serial", true).expect("declare");
        registry
            .declare(
                "renderer",
                Domain::enumeration(["gl", "vulkan"]),
                OptionValue::choice("gl"),
                None,
            )
            .expect("declare");
        registry
    }

    fn emitter() -> VariableEmitter {
        let mut emitter = VariableEmitter::new("AEON_");
        emitter.add(VariableRule::option("build_shared_libs", "shared").driver("BUILD_SHARED_LIBS"));
        emitter.add(
            VariableRule::any_of(
                "position_independent_code",
                vec![Term::SharedBuild, Term::Option("fPIC".to_string())],
            )
            .driver("CMAKE_POSITION_INDEPENDENT_CODE"),
        );
        emitter.add(VariableRule::option("component_serial", "with_serial"));
        emitter.add(VariableRule::option("renderer", "renderer"));
        emitter.add(VariableRule::constant("namespace", "aeon"));
        emitter
    }

    fn resolved(requested: RequestedOptions, prune: &[&str]) -> ResolvedOptions {
        let mut set = registry().apply(&requested).expect("apply");
        for option in prune {
            set.remove(
                option,
                Removal::Platform {
                    rule: "test".to_string(),
                },
            );
        }
        set.freeze()
    }

    #[test]
    fn shared_build_forces_pic_without_option() {
        let options = resolved(RequestedOptions::new().with("shared", true), &["fPIC"]);
        let mode = BuildMode::from_options(&options, "shared").expect("mode");
        let table = emitter().emit(&options, mode).expect("emit");

        assert_eq!(mode, BuildMode::Shared);
        assert_eq!(table.get("position_independent_code"), Some(&VariableValue::Bool(true)));
        assert_eq!(table.get("build_shared_libs"), Some(&VariableValue::Bool(true)));
    }

    #[test]
    fn static_build_without_pic_is_not_pic() {
        let options = resolved(RequestedOptions::new(), &["fPIC"]);
        let table = emitter().emit(&options, BuildMode::Static).expect("emit");
        assert_eq!(table.get("position_independent_code"), Some(&VariableValue::Bool(false)));
    }

    #[test]
    fn pruned_option_emits_false() {
        let options = resolved(RequestedOptions::new(), &["with_serial", "renderer"]);
        let table = emitter().emit(&options, BuildMode::Static).expect("emit");

        assert_eq!(table.get("component_serial"), Some(&VariableValue::Bool(false)));
        assert_eq!(table.get("renderer"), Some(&VariableValue::Bool(false)));
        assert_eq!(table.len(), emitter().rules().len());
    }

    #[test]
    fn enumerated_option_emits_string() {
        let options = resolved(
            RequestedOptions::new().with("renderer", OptionValue::choice("vulkan")),
            &[],
        );
        let table = emitter().emit(&options, BuildMode::Static).expect("emit");
        assert_eq!(table.get("renderer"), Some(&VariableValue::from("vulkan")));
        assert_eq!(table.get("namespace"), Some(&VariableValue::from("aeon")));
    }

    #[test]
    fn driver_names_use_prefix_or_override() {
        let emitter = emitter();
        let names: Vec<_> = emitter.rules().iter().map(|r| emitter.driver_name(r)).collect();
        assert_eq!(
            names,
            vec![
                "BUILD_SHARED_LIBS",
                "CMAKE_POSITION_INDEPENDENT_CODE",
                "AEON_COMPONENT_SERIAL",
                "AEON_RENDERER",
                "AEON_NAMESPACE",
            ]
        );
    }

    #[test]
    fn driver_renderings() {
        let options = resolved(RequestedOptions::new(), &[]);
        let emitter = emitter();
        let table = emitter.emit(&options, BuildMode::Static).expect("emit");

        let args = emitter.driver_args(&table);
        assert_eq!(args[0], "-DBUILD_SHARED_LIBS=OFF");
        assert_eq!(args[1], "-DCMAKE_POSITION_INDEPENDENT_CODE=ON");
        assert_eq!(args[3], "-DAEON_RENDERER=gl");

        let cache = emitter.cmake_cache(&table);
        assert!(cache.contains("set(AEON_COMPONENT_SERIAL ON CACHE BOOL \"\")\n"));
        assert!(cache.contains("set(AEON_NAMESPACE \"aeon\" CACHE STRING \"\")\n"));
    }

    #[test]
    fn validate_rejects_duplicates() {
        let mut twice = emitter();
        twice.add(VariableRule::option("component_serial", "fPIC"));
        assert_eq!(
            twice.validate(&registry()),
            Err(ResolveError::DuplicateVariable("component_serial".to_string()))
        );

        let mut remapped = emitter();
        remapped.add(VariableRule::option("serial_again", "with_serial"));
        assert!(matches!(
            remapped.validate(&registry()),
            Err(ResolveError::DuplicateVariable(_))
        ));
    }

    #[test]
    fn validate_rejects_unknown_options() {
        let mut emitter = emitter();
        emitter.add(VariableRule::any_of(
            "anything",
            vec![Term::Option("with_midi".to_string())],
        ));
        assert_eq!(
            emitter.validate(&registry()),
            Err(ResolveError::UnknownOption("with_midi".to_string()))
        );
    }

    #[test]
    fn build_facing_options_listed() {
        let options: Vec<_> = emitter().build_facing_options().map(str::to_string).collect();
        assert_eq!(options, vec!["shared", "with_serial", "renderer"]);
    }
}
