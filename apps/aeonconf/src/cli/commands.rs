//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::VariableFormat;
use crate::config::{
    self, MAX_LOCK_FILE_SIZE, PlatformArgs, Profile, build_request, load_recipe, select_platform,
};
use aeonconf_core::{
    OptionState, Recipe, Resolution, ResolveError, Resolver, canonical_checksum,
    canonical_crypto_hash, export_canonical, import_canonical, verify_canonical,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// INPUTS
// =============================================================================

/// Everything a run is made from, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub recipe: Option<PathBuf>,
    pub profile: Option<PathBuf>,
    pub options: Vec<String>,
    pub platform: PlatformArgs,
}

impl Inputs {
    /// Load the recipe named by the inputs.
    pub fn recipe(&self) -> Result<Recipe, ResolveError> {
        load_recipe(self.recipe.as_deref())
    }

    /// Load files, pick the platform and run every phase.
    pub fn resolve(&self, recipe: &Recipe) -> Result<Resolution, ResolveError> {
        let profile = self.profile.as_deref().map(Profile::load).transpose()?;
        let requested = build_request(recipe, profile.as_ref(), &self.options)?;
        let platform = select_platform(&self.platform, profile.as_ref().map(|p| &p.settings))?;

        tracing::info!(platform = %platform, requested = requested.iter().count(), "resolving");
        Resolver::new(recipe).resolve(&platform, &requested)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ResolveError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ResolveError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// RESOLVE COMMAND
// =============================================================================

/// Run every phase and print the result.
pub fn cmd_resolve(inputs: &Inputs, json_mode: bool) -> Result<(), ResolveError> {
    let recipe = inputs.recipe()?;
    let resolution = inputs.resolve(&recipe)?;

    if json_mode {
        return print_json(&resolution);
    }

    let absent = resolution.options.len() - resolution.options.present().count();
    println!("aeonconf Resolution");
    println!("===================");
    println!("Platform:   {}", resolution.platform);
    println!("Build mode: {}", resolution.build_mode);
    println!(
        "Options:    {} present, {} removed",
        resolution.options.present().count(),
        absent
    );
    println!();
    println!("Requirements ({}):", resolution.requirements.len());
    for spec in resolution.requirements.iter() {
        println!("  {}", spec);
    }
    println!();
    println!("Variables ({}):", resolution.variables.len());
    for arg in recipe.variables().driver_args(&resolution.variables) {
        println!("  {}", arg);
    }

    Ok(())
}

// =============================================================================
// OPTIONS COMMAND
// =============================================================================

/// List declared options.
pub fn cmd_options(inputs: &Inputs, json_mode: bool) -> Result<(), ResolveError> {
    let recipe = inputs.recipe()?;
    let decls: Vec<_> = recipe.registry().iter().collect();

    if json_mode {
        return print_json(&decls);
    }

    let width = decls.iter().map(|d| d.name.len()).max().unwrap_or(0);
    for decl in decls {
        let parent = decl
            .parent
            .as_deref()
            .map(|p| format!("  (requires {})", p))
            .unwrap_or_default();
        println!(
            "{:width$}  [{}] default={}{}",
            decl.name,
            decl.domain,
            decl.default,
            parent,
            width = width
        );
    }

    Ok(())
}

// =============================================================================
// REQUIREMENTS COMMAND
// =============================================================================

/// Print the derived requirement pins.
pub fn cmd_requirements(inputs: &Inputs, json_mode: bool) -> Result<(), ResolveError> {
    let recipe = inputs.recipe()?;
    let resolution = inputs.resolve(&recipe)?;

    if json_mode {
        return print_json(&resolution.requirements);
    }

    for spec in resolution.requirements.iter() {
        println!("{}", spec);
    }
    Ok(())
}

// =============================================================================
// VARIABLES COMMAND
// =============================================================================

/// Print the build variable table.
pub fn cmd_variables(inputs: &Inputs, format: VariableFormat) -> Result<(), ResolveError> {
    let recipe = inputs.recipe()?;
    let resolution = inputs.resolve(&recipe)?;
    let emitter = recipe.variables();

    match format {
        VariableFormat::Json => print_json(&resolution.variables)?,
        VariableFormat::Args => {
            for arg in emitter.driver_args(&resolution.variables) {
                println!("{}", arg);
            }
        }
        VariableFormat::Cmake => print!("{}", emitter.cmake_cache(&resolution.variables)),
    }
    Ok(())
}

// =============================================================================
// EXPLAIN COMMAND
// =============================================================================

/// Show every option's final state, in declaration order.
pub fn cmd_explain(inputs: &Inputs, json_mode: bool) -> Result<(), ResolveError> {
    let recipe = inputs.recipe()?;
    let resolution = inputs.resolve(&recipe)?;

    if json_mode {
        return print_json(&resolution.options);
    }

    println!("Platform: {}", resolution.platform);
    for decl in recipe.registry().iter() {
        match resolution.options.lookup(&decl.name)? {
            OptionState::Present(value) => println!("  {} = {}", decl.name, value),
            OptionState::Absent(removal) => println!("  {} removed ({})", decl.name, removal),
        }
    }
    Ok(())
}

// =============================================================================
// LOCK COMMAND
// =============================================================================

/// Write the resolution as a canonical lockfile.
pub fn cmd_lock(inputs: &Inputs, output: &Path, json_mode: bool) -> Result<(), ResolveError> {
    let validated_output = config::validate_output_path(output)?;

    let recipe = inputs.recipe()?;
    let resolution = inputs.resolve(&recipe)?;
    let data = export_canonical(&resolution)?;
    let checksum = canonical_checksum(&resolution);

    std::fs::write(&validated_output, &data)
        .map_err(|e| ResolveError::IoError(format!("Write file: {}", e)))?;

    tracing::info!(path = %validated_output.display(), bytes = data.len(), "wrote lockfile");

    if json_mode {
        return print_json(&serde_json::json!({
            "path": validated_output.to_string_lossy(),
            "bytes": data.len(),
            "checksum": checksum,
        }));
    }

    println!("Checksum: {}", checksum);
    println!("Wrote {} bytes to {}", data.len(), validated_output.display());
    Ok(())
}

// =============================================================================
// VERIFY COMMAND
// =============================================================================

/// Check a lockfile against a fresh resolution. A mismatch is an error.
pub fn cmd_verify(inputs: &Inputs, input: &Path, json_mode: bool) -> Result<(), ResolveError> {
    let data = config::read_file(input, MAX_LOCK_FILE_SIZE)?;

    let recipe = inputs.recipe()?;
    let resolution = inputs.resolve(&recipe)?;
    let matches = verify_canonical(&resolution, &data)?;

    if json_mode {
        let lock = import_canonical(&data)?;
        print_json(&serde_json::json!({
            "matches": matches,
            "locked_platform": lock.platform,
            "current_platform": resolution.platform.to_string(),
        }))?;
    } else if matches {
        println!("Lockfile matches current resolution");
    }

    if matches {
        Ok(())
    } else {
        Err(ResolveError::LockMismatch(format!(
            "'{}' does not match current resolution",
            input.display()
        )))
    }
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Print the canonical checksum and BLAKE3 digest.
pub fn cmd_hash(inputs: &Inputs, json_mode: bool) -> Result<(), ResolveError> {
    let recipe = inputs.recipe()?;
    let resolution = inputs.resolve(&recipe)?;
    let checksum = canonical_checksum(&resolution);
    let blake3 = canonical_crypto_hash(&resolution)?;

    if json_mode {
        return print_json(&serde_json::json!({
            "checksum": checksum,
            "blake3": blake3,
        }));
    }

    println!("Checksum: {}", checksum);
    println!("BLAKE3:   {}", blake3);
    Ok(())
}
