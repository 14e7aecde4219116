//! # aeonconf-core
//!
//! The deterministic configuration resolver for aeonconf - THE LOGIC.
//!
//! Given a [`Recipe`], the target [`PlatformInfo`] and the caller's
//! [`RequestedOptions`], a run produces:
//! - the frozen option set, with every pruned option tagged by its cause
//! - the requirement manifest (`name/version` pins)
//! - the flat variable table for the build driver
//!
//! ## Pipeline
//!
//! ```text
//! registry defaults + requested
//!     -> platform pruner (build-mode rules, then platform rules)
//!     -> dependency gate (fixed point)
//!     -> freeze
//!     -> requirement deriver / variable emitter
//! ```
//!
//! ## Architectural Constraints
//!
//! - No async, no network, no file I/O
//! - BTreeMap only; repeated runs are byte-identical
//! - Every rule table lives in a `Recipe` value, never in a global

// =============================================================================
// MODULES
// =============================================================================

pub mod export;
pub mod gate;
pub mod manifest;
pub mod option_set;
pub mod platform;
pub mod prune;
pub mod recipe;
pub mod registry;
pub mod requirements;
pub mod resolve;
pub mod types;
pub mod variables;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Domain, OptionState, OptionValue, Removal, ResolveError};

// =============================================================================
// RE-EXPORTS: Phases
// =============================================================================

pub use gate::gate;
pub use option_set::{OptionSet, ResolvedOptions};
pub use platform::{Arch, Compiler, Os, PlatformInfo};
pub use prune::{PlatformMatch, PlatformPruner, PruneRule, RuleAction, RuleCondition};
pub use registry::{OptionDecl, OptionRegistry, RequestedOptions};
pub use requirements::{RequirementDeriver, RequirementRule, RequirementSet, RequirementSpec};
pub use variables::{
    BuildMode, Term, VariableEmitter, VariableRule, VariableSource, VariableTable, VariableValue,
};

// =============================================================================
// RE-EXPORTS: Recipe & Resolution
// =============================================================================

pub use manifest::RecipeManifest;
pub use recipe::Recipe;
pub use resolve::{Resolution, Resolver};

// =============================================================================
// RE-EXPORTS: Lockfile
// =============================================================================

#[cfg(feature = "crypto-hash")]
pub use export::canonical_crypto_hash;
pub use export::{
    CanonicalHeader, CanonicalLock, canonical_checksum, export_canonical, import_canonical,
    verify_canonical,
};
