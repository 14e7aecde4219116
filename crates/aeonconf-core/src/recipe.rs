//! # Recipe
//!
//! One package's complete rule set: declared options, pruning rules,
//! requirement rules and variable rules. A recipe is built and validated
//! once, then handed to a [`Resolver`](crate::Resolver) by reference.

use crate::platform::Os;
use crate::prune::{PlatformMatch, PlatformPruner, RuleAction};
use crate::registry::OptionRegistry;
use crate::requirements::RequirementDeriver;
use crate::variables::{Term, VariableEmitter, VariableRule};
use crate::ResolveError;

/// Driver-name prefix of the built-in recipe.
pub const AEON_VARIABLE_PREFIX: &str = "AEON_";

/// Option that selects a shared build in the built-in recipe.
pub const AEON_BUILD_MODE_OPTION: &str = "shared";

/// Component toggles of the built-in recipe, in declaration order.
/// The platform back-end switches are declared separately as children
/// of `with_platform`.
const AEON_COMPONENTS: &[&str] = &[
    "common",
    "compression",
    "crypto",
    "file_container",
    "fonts",
    "imaging",
    "logger",
    "math",
    "platform",
    "plugins",
    "ptree",
    "rdp",
    "reflection",
    "serial",
    "sockets",
    "streams",
    "testing",
    "tracelog",
    "unicode",
    "variant",
    "vulkan",
    "web",
];

/// `(when, requires)` rows of the built-in requirement table.
const AEON_REQUIREMENTS: &[(&[&str], &[&str])] = &[
    (&["enable_unittests"], &["gtest/1.13.0"]),
    (&["enable_benchmarks"], &["benchmark/1.8.3"]),
    (&["with_compression"], &["zlib/1.2.13"]),
    (&["with_fonts"], &["freetype/2.13.0"]),
    (&["with_imaging"], &["libpng/1.6.40", "libjpeg-turbo/2.1.91"]),
    (&["with_platform", "with_platform_glfw"], &["glfw/3.3.8"]),
    (&["with_platform", "with_platform_sdl2"], &["sdl/2.28.3"]),
    (&["with_sockets"], &["asio/1.28.0"]),
    (&["with_vulkan"], &["vulkan-memory-allocator/3.0.1"]),
];

/// A validated rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    registry: OptionRegistry,
    pruner: PlatformPruner,
    requirements: RequirementDeriver,
    variables: VariableEmitter,
    build_mode_option: String,
}

impl Recipe {
    /// Assemble a recipe, validating every rule table against the registry.
    ///
    /// # Errors
    /// - `UnknownOption` if any rule or the build-mode option names an
    ///   undeclared option
    /// - `DomainViolation` if a pruning rule uses an out-of-domain value
    /// - `DuplicateVariable` if the variable table repeats a name
    /// - `InvalidManifest` if a requirement rule is empty
    pub fn new(
        registry: OptionRegistry,
        pruner: PlatformPruner,
        requirements: RequirementDeriver,
        variables: VariableEmitter,
        build_mode_option: &str,
    ) -> Result<Self, ResolveError> {
        registry.require(build_mode_option)?;
        pruner.validate(&registry)?;
        requirements.validate(&registry)?;
        variables.validate(&registry)?;

        tracing::debug!(
            options = registry.len(),
            build_mode_rules = pruner.build_mode_rules().len(),
            platform_rules = pruner.platform_rules().len(),
            requirement_rules = requirements.rules().len(),
            variables = variables.rules().len(),
            "recipe assembled"
        );

        Ok(Self {
            registry,
            pruner,
            requirements,
            variables,
            build_mode_option: build_mode_option.to_string(),
        })
    }

    /// The built-in recipe of the Aeon framework.
    pub fn aeon() -> Result<Self, ResolveError> {
        let mut registry = OptionRegistry::new();
        registry.declare_flag("shared", false)?;
        registry.declare_flag("fPIC", true)?;
        registry.declare_flag("enable_unittests", true)?;
        registry.declare_flag("enable_benchmarks", true)?;
        for component in AEON_COMPONENTS {
            registry.declare_flag(&format!("with_{}", component), true)?;
            if *component == "platform" {
                registry.declare_child_flag("with_platform_glfw", true, "with_platform")?;
                registry.declare_child_flag("with_platform_sdl2", true, "with_platform")?;
            }
        }

        let mut pruner = PlatformPruner::new();
        pruner.add_build_mode_rule("shared", true, RuleAction::Remove("fPIC".to_string()));
        pruner.add_platform_rule(
            PlatformMatch::os([Os::Windows]),
            RuleAction::Remove("fPIC".to_string()),
        );
        pruner.add_platform_rule(
            PlatformMatch::os([Os::Macos, Os::Ios, Os::Emscripten]),
            RuleAction::Remove("with_vulkan".to_string()),
        );
        pruner.add_platform_rule(
            PlatformMatch::os([Os::Ios, Os::Android, Os::Emscripten]),
            RuleAction::Remove("with_serial".to_string()),
        );
        pruner.add_platform_rule(
            PlatformMatch::os([Os::Emscripten]),
            RuleAction::Remove("with_plugins".to_string()),
        );

        let mut requirements = RequirementDeriver::new();
        for (when, requires) in AEON_REQUIREMENTS {
            requirements.require(when, requires)?;
        }

        let mut variables = VariableEmitter::new(AEON_VARIABLE_PREFIX);
        variables.add(VariableRule::option("build_shared_libs", "shared").driver("BUILD_SHARED_LIBS"));
        variables.add(
            VariableRule::any_of(
                "position_independent_code",
                vec![Term::SharedBuild, Term::Option("fPIC".to_string())],
            )
            .driver("CMAKE_POSITION_INDEPENDENT_CODE"),
        );
        variables.add(VariableRule::option("enable_testing", "enable_unittests"));
        variables.add(VariableRule::option("enable_benchmark", "enable_benchmarks"));
        for component in AEON_COMPONENTS {
            variables.add(VariableRule::option(
                &format!("component_{}", component),
                &format!("with_{}", component),
            ));
        }
        variables.add(VariableRule::option("platform_backend_glfw", "with_platform_glfw"));
        variables.add(VariableRule::option("platform_backend_sdl2", "with_platform_sdl2"));

        Self::new(
            registry,
            pruner,
            requirements,
            variables,
            AEON_BUILD_MODE_OPTION,
        )
    }

    /// The declared options.
    #[must_use]
    pub fn registry(&self) -> &OptionRegistry {
        &self.registry
    }

    /// The pruning rules.
    #[must_use]
    pub fn pruner(&self) -> &PlatformPruner {
        &self.pruner
    }

    /// The requirement rules.
    #[must_use]
    pub fn requirements(&self) -> &RequirementDeriver {
        &self.requirements
    }

    /// The variable rules.
    #[must_use]
    pub fn variables(&self) -> &VariableEmitter {
        &self.variables
    }

    /// Name of the option that selects a shared build.
    #[must_use]
    pub fn build_mode_option(&self) -> &str {
        &self.build_mode_option
    }
}
