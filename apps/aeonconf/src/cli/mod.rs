//! # aeonconf CLI Module
//!
//! This module implements the CLI interface for aeonconf.
//!
//! ## Available Commands
//!
//! - `resolve` - Run every phase and print the result (default)
//! - `options` - List declared options
//! - `requirements` - Print the derived `name/version` pins
//! - `variables` - Print the build variable table
//! - `explain` - Show every option's state and why it was removed
//! - `lock` - Write a canonical lockfile
//! - `verify` - Check a lockfile against a fresh resolution
//! - `hash` - Print the canonical checksum and BLAKE3 digest

mod commands;

use crate::config::PlatformArgs;
use aeonconf_core::ResolveError;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// aeonconf - package configuration resolver
///
/// Turns requested build options and the target platform into a pruned
/// option set, a requirement manifest and a build variable table.
#[derive(Parser, Debug)]
#[command(name = "aeonconf")]
#[command(version, about, long_about = None)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Recipe manifest (TOML). Defaults to the built-in recipe
    #[arg(short, long, global = true)]
    pub recipe: Option<PathBuf>,

    /// Option profile (TOML with [settings] and [options] tables)
    #[arg(short, long, global = true)]
    pub profile: Option<PathBuf>,

    /// Request an option value, as name=value (repeatable)
    #[arg(short = 'o', long = "option", global = true, value_name = "NAME=VALUE")]
    pub options: Vec<String>,

    /// Target OS (default: host)
    #[arg(long, global = true)]
    pub os: Option<String>,

    /// Target compiler (default: usual compiler for the OS)
    #[arg(long, global = true)]
    pub compiler: Option<String>,

    /// Target architecture (default: host)
    #[arg(long, global = true)]
    pub arch: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Rendering of the variable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VariableFormat {
    /// `-DNAME=VALUE` arguments, one per line
    Args,
    /// CMake initial-cache script
    Cmake,
    /// JSON object keyed by logical name
    Json,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every phase and print the result
    Resolve,

    /// List declared options with domains, defaults and parents
    Options,

    /// Print the derived requirement pins
    Requirements,

    /// Print the build variable table
    Variables {
        /// Output format
        #[arg(short, long, value_enum, default_value = "args")]
        format: VariableFormat,
    },

    /// Show every option's final state
    Explain,

    /// Write the resolution as a canonical lockfile
    Lock {
        /// Output file path
        #[arg(long, default_value = "aeonconf.lock")]
        output: PathBuf,
    },

    /// Check a lockfile against a fresh resolution
    Verify {
        /// Input file path
        #[arg(short, long, default_value = "aeonconf.lock")]
        input: PathBuf,
    },

    /// Print the canonical checksum and BLAKE3 digest
    Hash,
}

impl Cli {
    fn platform_args(&self) -> PlatformArgs {
        PlatformArgs {
            os: self.os.clone(),
            compiler: self.compiler.clone(),
            arch: self.arch.clone(),
        }
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), ResolveError> {
    let inputs = Inputs {
        recipe: cli.recipe.clone(),
        profile: cli.profile.clone(),
        options: cli.options.clone(),
        platform: cli.platform_args(),
    };
    let json = cli.json;

    match cli.command {
        Some(Commands::Resolve) | None => cmd_resolve(&inputs, json),
        Some(Commands::Options) => cmd_options(&inputs, json),
        Some(Commands::Requirements) => cmd_requirements(&inputs, json),
        Some(Commands::Variables { format }) => {
            let format = if json { VariableFormat::Json } else { format };
            cmd_variables(&inputs, format)
        }
        Some(Commands::Explain) => cmd_explain(&inputs, json),
        Some(Commands::Lock { output }) => cmd_lock(&inputs, &output, json),
        Some(Commands::Verify { input }) => cmd_verify(&inputs, &input, json),
        Some(Commands::Hash) => cmd_hash(&inputs, json),
    }
}
