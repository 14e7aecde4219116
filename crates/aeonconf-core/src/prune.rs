//! # Platform Pruner
//!
//! Removes or forces options that are invalid or meaningless for the build
//! mode and the target platform.
//!
//! Rules run in two ordered phases:
//! 1. Build-mode rules, conditioned on option values (`shared = true` drops `fPIC`)
//! 2. Platform rules, conditioned on OS / compiler / arch
//!
//! Within a phase rules apply in declaration order. Removal is absolute: a
//! removed option cannot be forced back by a later rule.

use crate::option_set::OptionSet;
use crate::platform::{Arch, Compiler, Os, PlatformInfo};
use crate::registry::OptionRegistry;
use crate::{OptionState, OptionValue, Removal, ResolveError};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// PLATFORM MATCHING
// =============================================================================

/// A predicate over platform facts.
///
/// Each non-empty field lists the accepted values; an empty field matches
/// anything. All non-empty fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformMatch {
    pub os: Vec<Os>,
    pub compiler: Vec<Compiler>,
    pub arch: Vec<Arch>,
}

impl PlatformMatch {
    /// Match any of the given operating systems.
    #[must_use]
    pub fn os(os: impl IntoIterator<Item = Os>) -> Self {
        Self {
            os: os.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Match any of the given compilers.
    #[must_use]
    pub fn compiler(compiler: impl IntoIterator<Item = Compiler>) -> Self {
        Self {
            compiler: compiler.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Narrow this match to the given architectures.
    #[must_use]
    pub fn and_arch(mut self, arch: impl IntoIterator<Item = Arch>) -> Self {
        self.arch = arch.into_iter().collect();
        self
    }

    /// Check whether `platform` satisfies every constrained field.
    #[must_use]
    pub fn matches(&self, platform: &PlatformInfo) -> bool {
        (self.os.is_empty() || self.os.contains(&platform.os))
            && (self.compiler.is_empty() || self.compiler.contains(&platform.compiler))
            && (self.arch.is_empty() || self.arch.contains(&platform.arch))
    }
}

impl fmt::Display for PlatformMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(items: &[T]) -> String {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("|")
        }

        let mut parts = Vec::new();
        if !self.os.is_empty() {
            parts.push(format!("os={}", join(&self.os)));
        }
        if !self.compiler.is_empty() {
            parts.push(format!("compiler={}", join(&self.compiler)));
        }
        if !self.arch.is_empty() {
            parts.push(format!("arch={}", join(&self.arch)));
        }
        if parts.is_empty() {
            write!(f, "any platform")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

// =============================================================================
// RULES
// =============================================================================

/// What a rule does when its condition holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleAction {
    /// Remove the option from the active set.
    Remove(String),
    /// Set the option to a fixed value, if it is still present.
    Force { option: String, value: OptionValue },
}

impl RuleAction {
    /// The option this action targets.
    #[must_use]
    pub fn option(&self) -> &str {
        match self {
            Self::Remove(option) | Self::Force { option, .. } => option.as_str(),
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remove(option) => write!(f, "remove {}", option),
            Self::Force { option, value } => write!(f, "force {}={}", option, value),
        }
    }
}

/// When a rule fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleCondition {
    /// A (build-mode) option currently holds this value.
    OptionIs { option: String, value: OptionValue },
    /// The target platform matches.
    Platform(PlatformMatch),
}

impl RuleCondition {
    fn holds(&self, options: &OptionSet, platform: &PlatformInfo) -> bool {
        match self {
            Self::OptionIs { option, value } => {
                matches!(options.get(option), Some(OptionState::Present(v)) if v == value)
            }
            Self::Platform(m) => m.matches(platform),
        }
    }
}

impl fmt::Display for RuleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OptionIs { option, value } => write!(f, "{}={}", option, value),
            Self::Platform(m) => write!(f, "{}", m),
        }
    }
}

/// A single pruning rule: condition plus action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneRule {
    pub condition: RuleCondition,
    pub action: RuleAction,
}

impl PruneRule {
    /// Short human description, recorded in removal causes.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} when {}", self.action, self.condition)
    }
}

// =============================================================================
// PRUNER
// =============================================================================

/// Ordered build-mode and platform rule tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformPruner {
    build_mode: Vec<PruneRule>,
    platform: Vec<PruneRule>,
}

impl PlatformPruner {
    /// Create a pruner with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a build-mode rule: when `option` holds `value`, apply `action`.
    pub fn add_build_mode_rule(
        &mut self,
        option: &str,
        value: impl Into<OptionValue>,
        action: RuleAction,
    ) {
        self.build_mode.push(PruneRule {
            condition: RuleCondition::OptionIs {
                option: option.to_string(),
                value: value.into(),
            },
            action,
        });
    }

    /// Append a platform rule: when the platform matches, apply `action`.
    pub fn add_platform_rule(&mut self, when: PlatformMatch, action: RuleAction) {
        self.platform.push(PruneRule {
            condition: RuleCondition::Platform(when),
            action,
        });
    }

    /// Build-mode rules in application order.
    #[must_use]
    pub fn build_mode_rules(&self) -> &[PruneRule] {
        &self.build_mode
    }

    /// Platform rules in application order.
    #[must_use]
    pub fn platform_rules(&self) -> &[PruneRule] {
        &self.platform
    }

    /// Check every rule against the registry.
    ///
    /// # Errors
    /// - `UnknownOption` if a rule names an undeclared option
    /// - `DomainViolation` if a condition or forced value is outside its domain
    pub fn validate(&self, registry: &OptionRegistry) -> Result<(), ResolveError> {
        for rule in self.build_mode.iter().chain(&self.platform) {
            if let RuleCondition::OptionIs { option, value } = &rule.condition {
                registry.check_value(option, value)?;
            }
            match &rule.action {
                RuleAction::Remove(option) => {
                    registry.require(option)?;
                }
                RuleAction::Force { option, value } => registry.check_value(option, value)?,
            }
        }
        Ok(())
    }

    /// Apply build-mode rules, then platform rules.
    #[must_use]
    pub fn prune(&self, mut options: OptionSet, platform: &PlatformInfo) -> OptionSet {
        for rule in &self.build_mode {
            Self::apply(rule, &mut options, platform, |rule| Removal::BuildMode { rule });
        }
        for rule in &self.platform {
            Self::apply(rule, &mut options, platform, |rule| Removal::Platform { rule });
        }
        options
    }

    fn apply(
        rule: &PruneRule,
        options: &mut OptionSet,
        platform: &PlatformInfo,
        cause: impl FnOnce(String) -> Removal,
    ) {
        if !rule.condition.holds(options, platform) {
            return;
        }
        match &rule.action {
            RuleAction::Remove(option) => {
                if options.remove(option, cause(rule.describe())) {
                    tracing::debug!(option = %option, rule = %rule.describe(), "pruned option");
                }
            }
            RuleAction::Force { option, value } => {
                if options.force(option, value.clone()) {
                    tracing::debug!(option = %option, value = %value, "forced option");
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RequestedOptions;

    fn registry() -> OptionRegistry {
        let mut registry = OptionRegistry::new();
        registry.declare_flag("shared", false).expect("declare");
        registry.declare_flag("fPIC", true).expect("declare");
        registry.declare_flag("with_serial", true).expect("declare");
        registry.declare_flag("with_vulkan", true).expect("declare");
        registry
    }

    fn linux() -> PlatformInfo {
        PlatformInfo::new(Os::Linux, Compiler::Gcc, Arch::X86_64)
    }

    fn windows() -> PlatformInfo {
        PlatformInfo::new(Os::Windows, Compiler::Msvc, Arch::X86_64)
    }

    fn pruner() -> PlatformPruner {
        let mut pruner = PlatformPruner::new();
        pruner.add_build_mode_rule("shared", true, RuleAction::Remove("fPIC".to_string()));
        pruner.add_platform_rule(
            PlatformMatch::os([Os::Windows]),
            RuleAction::Remove("fPIC".to_string()),
        );
        pruner.add_platform_rule(
            PlatformMatch::os([Os::Ios, Os::Emscripten]),
            RuleAction::Remove("with_serial".to_string()),
        );
        pruner
    }

    #[test]
    fn shared_build_removes_pic() {
        let registry = registry();
        let set = registry
            .apply(&RequestedOptions::new().with("shared", true))
            .expect("apply");
        let pruned = pruner().prune(set, &linux());

        assert!(!pruned.is_present("fPIC"));
        assert!(matches!(
            pruned.get("fPIC"),
            Some(OptionState::Absent(Removal::BuildMode { .. }))
        ));
    }

    #[test]
    fn static_build_keeps_pic_off_windows() {
        let pruned = pruner().prune(registry().defaults(), &linux());
        assert!(pruned.is_enabled("fPIC"));
    }

    #[test]
    fn build_mode_runs_before_platform() {
        // Both rules target fPIC; the recorded cause must come from the first phase.
        let set = registry()
            .apply(&RequestedOptions::new().with("shared", true))
            .expect("apply");
        let pruned = pruner().prune(set, &windows());
        assert!(matches!(
            pruned.get("fPIC"),
            Some(OptionState::Absent(Removal::BuildMode { .. }))
        ));
    }

    #[test]
    fn os_exclusion_ignores_requested_value() {
        let set = registry()
            .apply(&RequestedOptions::new().with("with_serial", true))
            .expect("apply");
        let ios = PlatformInfo::new(Os::Ios, Compiler::AppleClang, Arch::Armv8);
        let pruned = pruner().prune(set, &ios);
        assert!(!pruned.is_present("with_serial"));
        assert!(pruned.is_present("with_vulkan"));
    }

    #[test]
    fn force_sets_present_option() {
        let mut pruner = PlatformPruner::new();
        pruner.add_platform_rule(
            PlatformMatch::compiler([Compiler::Msvc]),
            RuleAction::Force {
                option: "with_vulkan".to_string(),
                value: OptionValue::Bool(false),
            },
        );
        let pruned = pruner.prune(registry().defaults(), &windows());
        assert!(pruned.is_present("with_vulkan"));
        assert!(!pruned.is_enabled("with_vulkan"));
    }

    #[test]
    fn validate_rejects_unknown_target() {
        let mut pruner = pruner();
        pruner.add_platform_rule(PlatformMatch::default(), RuleAction::Remove("with_midi".to_string()));
        assert_eq!(
            pruner.validate(&registry()),
            Err(ResolveError::UnknownOption("with_midi".to_string()))
        );
    }

    #[test]
    fn validate_rejects_bad_force_value() {
        let mut pruner = PlatformPruner::new();
        pruner.add_platform_rule(
            PlatformMatch::default(),
            RuleAction::Force {
                option: "shared".to_string(),
                value: OptionValue::choice("sometimes"),
            },
        );
        assert!(matches!(
            pruner.validate(&registry()),
            Err(ResolveError::DomainViolation { .. })
        ));
    }

    #[test]
    fn platform_match_wildcards() {
        let any = PlatformMatch::default();
        assert!(any.matches(&linux()));
        assert_eq!(any.to_string(), "any platform");

        let arm_ios = PlatformMatch::os([Os::Ios]).and_arch([Arch::Armv8]);
        assert!(!arm_ios.matches(&linux()));
        assert_eq!(arm_ios.to_string(), "os=ios arch=armv8");
    }
}
