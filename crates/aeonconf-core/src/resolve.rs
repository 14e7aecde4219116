//! # Resolver
//!
//! Runs one resolution: registry defaults plus requested values, then
//! pruning, gating, freezing, requirement derivation and variable
//! emission, in that order.
//!
//! A run is a pure function of `(recipe, platform, requested)`. Nothing is
//! cached between runs and any error aborts the run with no partial output.

use crate::option_set::ResolvedOptions;
use crate::platform::PlatformInfo;
use crate::recipe::Recipe;
use crate::registry::RequestedOptions;
use crate::requirements::RequirementSet;
use crate::variables::{BuildMode, VariableTable};
use crate::{gate, ResolveError};
use serde::Serialize;

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub platform: PlatformInfo,
    pub build_mode: BuildMode,
    pub options: ResolvedOptions,
    pub requirements: RequirementSet,
    pub variables: VariableTable,
}

/// Resolves requests against one recipe.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    recipe: &'a Recipe,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over `recipe`.
    #[must_use]
    pub fn new(recipe: &'a Recipe) -> Self {
        Self { recipe }
    }

    /// The recipe this resolver uses.
    #[must_use]
    pub fn recipe(&self) -> &'a Recipe {
        self.recipe
    }

    /// Resolve only the option set, without deriving outputs.
    pub fn resolve_options(
        &self,
        platform: &PlatformInfo,
        requested: &RequestedOptions,
    ) -> Result<ResolvedOptions, ResolveError> {
        let registry = self.recipe.registry();

        let options = registry.apply(requested)?;
        let options = self.recipe.pruner().prune(options, platform);
        let options = gate::gate(options, registry);
        let resolved = options.freeze();

        tracing::debug!(
            platform = %platform,
            present = resolved.present().count(),
            declared = resolved.len(),
            "options resolved"
        );
        Ok(resolved)
    }

    /// Run every phase.
    ///
    /// # Errors
    /// - `UnknownOption` / `DomainViolation` for a bad request
    /// - `RequirementConflict` if satisfied rules pin a component twice
    pub fn resolve(
        &self,
        platform: &PlatformInfo,
        requested: &RequestedOptions,
    ) -> Result<Resolution, ResolveError> {
        let options = self.resolve_options(platform, requested)?;
        let build_mode = BuildMode::from_options(&options, self.recipe.build_mode_option())?;
        let requirements = self.recipe.requirements().derive(&options)?;
        let variables = self.recipe.variables().emit(&options, build_mode)?;

        tracing::debug!(
            platform = %platform,
            build_mode = %build_mode,
            requirements = requirements.len(),
            variables = variables.len(),
            "resolution complete"
        );

        Ok(Resolution {
            platform: *platform,
            build_mode,
            options,
            requirements,
            variables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Compiler, Os};
    use crate::Removal;

    const LINUX: PlatformInfo = PlatformInfo::new(Os::Linux, Compiler::Gcc, Arch::X86_64);

    #[test]
    fn defaults_on_linux() {
        let recipe = Recipe::aeon().expect("recipe");
        let resolution = Resolver::new(&recipe)
            .resolve(&LINUX, &RequestedOptions::new())
            .expect("resolve");

        assert_eq!(resolution.build_mode, BuildMode::Static);
        assert_eq!(resolution.options.present().count(), recipe.registry().len());
        assert!(resolution.requirements.contains("glfw"));
        assert!(resolution.requirements.contains("sdl"));
        assert_eq!(resolution.requirements.len(), 10);
        assert_eq!(resolution.variables.len(), recipe.variables().rules().len());
    }

    #[test]
    fn gated_backends_drop_requirements() {
        let recipe = Recipe::aeon().expect("recipe");
        let resolution = Resolver::new(&recipe)
            .resolve(
                &LINUX,
                &RequestedOptions::new().with("with_platform", false),
            )
            .expect("resolve");

        assert_eq!(
            resolution.options.lookup("with_platform_sdl2"),
            Ok(&crate::OptionState::Absent(Removal::Gated {
                parent: "with_platform".to_string()
            }))
        );
        assert!(!resolution.requirements.contains("glfw"));
        assert!(!resolution.requirements.contains("sdl"));
    }

    #[test]
    fn unknown_request_aborts() {
        let recipe = Recipe::aeon().expect("recipe");
        let err = Resolver::new(&recipe)
            .resolve(&LINUX, &RequestedOptions::new().with("with_midi", true))
            .expect_err("undeclared");
        assert_eq!(err, ResolveError::UnknownOption("with_midi".to_string()));
    }

    #[test]
    fn repeated_runs_identical() {
        let recipe = Recipe::aeon().expect("recipe");
        let resolver = Resolver::new(&recipe);
        let requested = RequestedOptions::new().with("shared", true);
        let first = resolver.resolve(&LINUX, &requested).expect("resolve");
        let second = resolver.resolve(&LINUX, &requested).expect("resolve");
        assert_eq!(first, second);
    }
}
