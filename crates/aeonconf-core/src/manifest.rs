//! # Recipe Manifest
//!
//! Serde model of a recipe described as data. The text format is the
//! caller's business (the `aeonconf` binary reads TOML); this module only
//! turns the deserialized tables into a validated [`Recipe`].
//!
//! ```toml
//! variable_prefix = "AEON_"
//!
//! [[option]]
//! name = "shared"
//! default = false
//!
//! [[prune]]
//! os = ["windows"]
//! remove = "fPIC"
//!
//! [[requirement]]
//! when = ["with_compression"]
//! requires = ["zlib/1.2.13"]
//!
//! [[variable]]
//! name = "build_shared_libs"
//! option = "shared"
//! driver = "BUILD_SHARED_LIBS"
//! ```

use crate::platform::{Arch, Compiler, Os};
use crate::prune::{PlatformMatch, PlatformPruner, RuleAction};
use crate::recipe::{AEON_BUILD_MODE_OPTION, Recipe};
use crate::registry::OptionRegistry;
use crate::requirements::RequirementDeriver;
use crate::variables::{Term, VariableEmitter, VariableRule, VariableValue};
use crate::{Domain, OptionValue, ResolveError};
use serde::{Deserialize, Serialize};

fn default_build_mode_option() -> String {
    AEON_BUILD_MODE_OPTION.to_string()
}

/// A whole recipe as data. Unknown keys are rejected at every level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeManifest {
    #[serde(default = "default_build_mode_option")]
    pub build_mode_option: String,
    #[serde(default)]
    pub variable_prefix: String,
    #[serde(default, rename = "option")]
    pub options: Vec<OptionEntry>,
    #[serde(default, rename = "prune")]
    pub prune: Vec<PruneEntry>,
    #[serde(default, rename = "requirement")]
    pub requirements: Vec<RequirementEntry>,
    #[serde(default, rename = "variable")]
    pub variables: Vec<VariableEntry>,
}

/// `[[option]]`: boolean unless `values` lists an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionEntry {
    pub name: String,
    pub default: OptionValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Build-mode condition of a `[[prune]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionCondition {
    pub option: String,
    pub value: OptionValue,
}

/// `force = { option = "...", value = ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForceEntry {
    pub option: String,
    pub value: OptionValue,
}

/// `[[prune]]`: a build-mode rule when `when` is set, otherwise a
/// platform rule over the `os`/`compiler`/`arch` lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PruneEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<OptionCondition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub os: Vec<Os>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compiler: Vec<Compiler>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arch: Vec<Arch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<ForceEntry>,
}

/// `[[requirement]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequirementEntry {
    pub when: Vec<String>,
    pub requires: Vec<String>,
}

/// `[[variable]]`: exactly one of `option`, `value`, or a composite
/// (`any_of` and/or `or_shared`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<VariableValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<String>,
    #[serde(default)]
    pub or_shared: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
}

impl PruneEntry {
    fn platform(&self) -> PlatformMatch {
        PlatformMatch {
            os: self.os.clone(),
            compiler: self.compiler.clone(),
            arch: self.arch.clone(),
        }
    }

    fn action(&self) -> Result<RuleAction, ResolveError> {
        match (&self.remove, &self.force) {
            (Some(option), None) => Ok(RuleAction::Remove(option.clone())),
            (None, Some(force)) => Ok(RuleAction::Force {
                option: force.option.clone(),
                value: force.value.clone(),
            }),
            _ => Err(ResolveError::InvalidManifest(
                "prune entry needs exactly one of 'remove' or 'force'".to_string(),
            )),
        }
    }
}

impl VariableEntry {
    fn rule(&self) -> Result<VariableRule, ResolveError> {
        let composite = !self.any_of.is_empty() || self.or_shared;
        let rule = match (&self.option, &self.value, composite) {
            (Some(option), None, false) => VariableRule::option(&self.name, option),
            (None, Some(value), false) => VariableRule::constant(&self.name, value.clone()),
            (None, None, true) => {
                let mut terms = Vec::new();
                if self.or_shared {
                    terms.push(Term::SharedBuild);
                }
                terms.extend(self.any_of.iter().cloned().map(Term::Option));
                VariableRule::any_of(&self.name, terms)
            }
            _ => {
                return Err(ResolveError::InvalidManifest(format!(
                    "variable '{}' needs exactly one of 'option', 'value' or 'any_of'/'or_shared'",
                    self.name
                )));
            }
        };
        Ok(match &self.driver {
            Some(driver) => rule.driver(driver),
            None => rule,
        })
    }
}

impl RecipeManifest {
    /// Assemble and validate the recipe.
    ///
    /// Options are declared in listed order, so a parent must be listed
    /// before its children.
    pub fn into_recipe(self) -> Result<Recipe, ResolveError> {
        let mut registry = OptionRegistry::new();
        for entry in &self.options {
            let domain = match &entry.values {
                Some(values) if values.is_empty() => {
                    return Err(ResolveError::InvalidManifest(format!(
                        "option '{}' lists no values",
                        entry.name
                    )));
                }
                Some(values) => Domain::enumeration(values.iter().cloned()),
                None => Domain::Boolean,
            };
            registry.declare(
                &entry.name,
                domain,
                entry.default.clone(),
                entry.parent.as_deref(),
            )?;
        }

        let mut pruner = PlatformPruner::new();
        for entry in &self.prune {
            let action = entry.action()?;
            let platform = entry.platform();
            match &entry.when {
                Some(_) if platform != PlatformMatch::default() => {
                    return Err(ResolveError::InvalidManifest(format!(
                        "prune entry for '{}' mixes an option condition with platform fields",
                        action.option()
                    )));
                }
                Some(condition) => {
                    pruner.add_build_mode_rule(&condition.option, condition.value.clone(), action);
                }
                None => pruner.add_platform_rule(platform, action),
            }
        }

        let mut requirements = RequirementDeriver::new();
        for entry in &self.requirements {
            let when: Vec<&str> = entry.when.iter().map(String::as_str).collect();
            let requires: Vec<&str> = entry.requires.iter().map(String::as_str).collect();
            requirements.require(&when, &requires)?;
        }

        let mut variables = VariableEmitter::new(&self.variable_prefix);
        for entry in &self.variables {
            variables.add(entry.rule()?);
        }

        Recipe::new(
            registry,
            pruner,
            requirements,
            variables,
            &self.build_mode_option,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformInfo;
    use crate::resolve::Resolver;
    use crate::RequestedOptions;

    fn manifest(json: &str) -> RecipeManifest {
        serde_json::from_str(json).expect("parse manifest")
    }

    const SMALL: &str = r#"{
        "variable_prefix": "DEMO_",
        "option": [
            { "name": "shared", "default": false },
            { "name": "fPIC", "default": true },
            { "name": "renderer", "default": "gl", "values": ["gl", "vulkan"] },
            { "name": "with_gui", "default": true },
            { "name": "with_gui_glfw", "default": true, "parent": "with_gui" }
        ],
        "prune": [
            { "when": { "option": "shared", "value": true }, "remove": "fPIC" },
            { "os": ["windows"], "compiler": ["msvc"], "remove": "fPIC" },
            { "os": ["macos"], "force": { "option": "renderer", "value": "gl" } }
        ],
        "requirement": [
            { "when": ["with_gui", "with_gui_glfw"], "requires": ["glfw/3.3.8"] }
        ],
        "variable": [
            { "name": "pic", "any_of": ["fPIC"], "or_shared": true },
            { "name": "renderer", "option": "renderer" },
            { "name": "vendor", "value": "demo", "driver": "DEMO_VENDOR_NAME" }
        ]
    }"#;

    #[test]
    fn manifest_assembles_recipe() {
        let recipe = manifest(SMALL).into_recipe().expect("valid manifest");

        assert_eq!(recipe.registry().len(), 5);
        assert_eq!(
            recipe.registry().get("renderer").map(|d| &d.domain),
            Some(&Domain::enumeration(["gl", "vulkan"]))
        );
        assert_eq!(recipe.pruner().build_mode_rules().len(), 1);
        assert_eq!(recipe.pruner().platform_rules().len(), 2);
        assert_eq!(
            recipe.pruner().platform_rules()[0].describe(),
            "remove fPIC when os=windows compiler=msvc"
        );
        assert_eq!(recipe.build_mode_option(), "shared");

        let emitter = recipe.variables();
        assert_eq!(emitter.driver_name(&emitter.rules()[0]), "DEMO_PIC");
        assert_eq!(emitter.driver_name(&emitter.rules()[2]), "DEMO_VENDOR_NAME");
        assert_eq!(
            emitter.rules()[0],
            VariableRule::any_of(
                "pic",
                vec![Term::SharedBuild, Term::Option("fPIC".to_string())]
            )
        );
    }

    #[test]
    fn parent_listed_after_child_rejected() {
        let m = manifest(
            r#"{ "option": [
                { "name": "with_gui_glfw", "default": true, "parent": "with_gui" },
                { "name": "with_gui", "default": true }
            ] }"#,
        );
        assert_eq!(
            m.into_recipe(),
            Err(ResolveError::UnknownOption("with_gui".to_string()))
        );
    }

    #[test]
    fn prune_entry_needs_one_action() {
        let m = manifest(
            r#"{ "option": [{ "name": "shared", "default": false }],
                 "prune": [{ "os": ["linux"] }] }"#,
        );
        assert!(matches!(m.into_recipe(), Err(ResolveError::InvalidManifest(_))));
    }

    #[test]
    fn prune_entry_cannot_mix_conditions() {
        let mut m = manifest(SMALL);
        m.prune[0].os = vec![Os::Linux];
        assert!(matches!(m.into_recipe(), Err(ResolveError::InvalidManifest(_))));
    }

    #[test]
    fn variable_entry_needs_one_source() {
        let mut m = manifest(SMALL);
        m.variables[1].value = Some(VariableValue::Bool(true));
        assert!(matches!(m.into_recipe(), Err(ResolveError::InvalidManifest(_))));
    }

    #[test]
    fn bad_requirement_specifier_rejected() {
        let mut m = manifest(SMALL);
        m.requirements[0].requires = vec!["glfw".to_string()];
        assert!(matches!(m.into_recipe(), Err(ResolveError::InvalidManifest(_))));
    }

    #[test]
    fn forced_value_domain_checked() {
        let mut m = manifest(SMALL);
        m.prune[2].force = Some(ForceEntry {
            option: "renderer".to_string(),
            value: OptionValue::choice("metal"),
        });
        assert!(matches!(
            m.into_recipe(),
            Err(ResolveError::DomainViolation { option, .. }) if option == "renderer"
        ));
    }

    #[test]
    fn platform_fields_parse() {
        let m = manifest(SMALL);
        assert_eq!(m.prune[1].os, vec![Os::Windows]);
        assert_eq!(m.prune[1].compiler, vec![Compiler::Msvc]);
        assert!(m.prune[1].arch.is_empty());
    }

    #[test]
    fn misspelled_platform_key_rejected() {
        let parsed = serde_json::from_str::<RecipeManifest>(
            r#"{ "option": [{ "name": "fPIC", "default": true }],
                 "prune": [{ "oss": ["windows"], "remove": "fPIC" }] }"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn misspelled_table_rejected() {
        let parsed = serde_json::from_str::<RecipeManifest>(
            r#"{ "option": [{ "name": "with_net", "default": true }],
                 "requirements": [{ "when": ["with_net"], "requires": ["asio/1.28.0"] }] }"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn platform_rule_only_fires_on_its_platform() {
        let recipe = manifest(SMALL).into_recipe().expect("valid manifest");
        let resolver = Resolver::new(&recipe);
        let requested = RequestedOptions::new();

        let linux = PlatformInfo::new(Os::Linux, Compiler::Gcc, Arch::X86_64);
        let options = resolver.resolve_options(&linux, &requested).expect("linux");
        assert_eq!(options.is_enabled("fPIC"), Ok(true));

        let windows = PlatformInfo::new(Os::Windows, Compiler::Msvc, Arch::X86_64);
        let options = resolver.resolve_options(&windows, &requested).expect("windows");
        assert_eq!(options.is_enabled("fPIC"), Ok(false));
    }
}
