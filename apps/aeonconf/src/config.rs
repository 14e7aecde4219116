//! # Configuration Loading
//!
//! Everything the binary reads from disk before a run: the recipe
//! manifest, option profiles, and the platform selection that combines
//! command-line flags, profile settings and host detection.
//!
//! ## Profile format
//!
//! ```toml
//! [settings]
//! os = "windows"
//! compiler = "msvc"
//! arch = "x86_64"
//!
//! [options]
//! shared = true
//! with_platform_glfw = false
//! ```

use aeonconf_core::{
    Arch, Compiler, Os, PlatformInfo, Recipe, RecipeManifest, RequestedOptions, ResolveError,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a recipe manifest or profile (1 MB).
const MAX_TEXT_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum size of a lockfile (16 MB).
pub const MAX_LOCK_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), ResolveError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| ResolveError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(ResolveError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve `path` to an existing regular file.
pub fn validate_file_path(path: &Path) -> Result<PathBuf, ResolveError> {
    let canonical = path.canonicalize().map_err(|e| {
        ResolveError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(ResolveError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve the parent of `path` to an existing directory.
pub fn validate_output_path(path: &Path) -> Result<PathBuf, ResolveError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        ResolveError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(ResolveError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| ResolveError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Read a file after validating its path and size.
pub fn read_file(path: &Path, max_size: u64) -> Result<Vec<u8>, ResolveError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_size)?;
    std::fs::read(&validated)
        .map_err(|e| ResolveError::IoError(format!("Read file '{}': {}", path.display(), e)))
}

fn read_text(path: &Path) -> Result<String, ResolveError> {
    let bytes = read_file(path, MAX_TEXT_FILE_SIZE)?;
    String::from_utf8(bytes).map_err(|_| {
        ResolveError::InvalidManifest(format!("'{}' is not valid UTF-8", path.display()))
    })
}

// =============================================================================
// RECIPE
// =============================================================================

/// Load the recipe at `path`, or the built-in recipe when `None`.
pub fn load_recipe(path: Option<&Path>) -> Result<Recipe, ResolveError> {
    let Some(path) = path else {
        return Recipe::aeon();
    };
    let text = read_text(path)?;
    let manifest: RecipeManifest = toml::from_str(&text).map_err(|e| {
        ResolveError::InvalidManifest(format!("{}: {}", path.display(), e))
    })?;
    tracing::debug!(path = %path.display(), options = manifest.options.len(), "loaded recipe manifest");
    manifest.into_recipe()
}

// =============================================================================
// PROFILE
// =============================================================================

/// Platform settings of a profile. Missing fields fall back to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileSettings {
    pub os: Option<String>,
    pub compiler: Option<String>,
    pub arch: Option<String>,
}

/// A saved set of option values and platform settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    pub settings: ProfileSettings,
    pub options: RequestedOptions,
}

impl Profile {
    /// Parse a profile from TOML text.
    pub fn parse(text: &str) -> Result<Self, ResolveError> {
        toml::from_str(text).map_err(|e| ResolveError::InvalidManifest(format!("profile: {}", e)))
    }

    /// Load a profile file.
    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let profile = Self::parse(&read_text(path)?)?;
        tracing::debug!(
            path = %path.display(),
            options = profile.options.iter().count(),
            "loaded profile"
        );
        Ok(profile)
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Split a `name=value` command-line option.
pub fn split_option_arg(arg: &str) -> Result<(&str, &str), ResolveError> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => Err(ResolveError::InvalidManifest(format!(
            "expected name=value, got '{}'",
            arg
        ))),
    }
}

/// Merge profile options with command-line `name=value` pairs.
///
/// Command-line values override the profile and are parsed under the
/// option's declared domain.
pub fn build_request(
    recipe: &Recipe,
    profile: Option<&Profile>,
    args: &[String],
) -> Result<RequestedOptions, ResolveError> {
    let mut requested = profile.map(|p| p.options.clone()).unwrap_or_default();

    let mut overrides = RequestedOptions::new();
    for arg in args {
        let (name, raw) = split_option_arg(arg)?;
        overrides.set(name, recipe.registry().parse_value(name, raw)?);
    }
    requested.merge(overrides);
    Ok(requested)
}

// =============================================================================
// PLATFORM
// =============================================================================

/// Platform names given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformArgs {
    pub os: Option<String>,
    pub compiler: Option<String>,
    pub arch: Option<String>,
}

/// Pick the target platform: flags first, then profile settings, then the
/// host. The compiler defaults to the usual one for the chosen OS.
pub fn select_platform(
    args: &PlatformArgs,
    profile: Option<&ProfileSettings>,
) -> Result<PlatformInfo, ResolveError> {
    let pick = |flag: &Option<String>, setting: Option<&Option<String>>| {
        flag.clone().or_else(|| setting.cloned().flatten())
    };

    let os = match pick(&args.os, profile.map(|p| &p.os)) {
        Some(name) => name.parse::<Os>()?,
        None => Os::current().ok_or_else(|| {
            ResolveError::InvalidManifest("cannot detect host OS; pass --os".to_string())
        })?,
    };
    let compiler = match pick(&args.compiler, profile.map(|p| &p.compiler)) {
        Some(name) => name.parse::<Compiler>()?,
        None => Compiler::default_for(os),
    };
    let arch = match pick(&args.arch, profile.map(|p| &p.arch)) {
        Some(name) => name.parse::<Arch>()?,
        None => Arch::current().ok_or_else(|| {
            ResolveError::InvalidManifest("cannot detect host architecture; pass --arch".to_string())
        })?,
    };

    Ok(PlatformInfo::new(os, compiler, arch))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use aeonconf_core::OptionValue;

    #[test]
    fn profile_parses_settings_and_options() {
        let profile = Profile::parse(
            r#"
            [settings]
            os = "ios"

            [options]
            shared = true
            with_serial = "False"
            "#,
        )
        .expect("profile");

        assert_eq!(profile.settings.os.as_deref(), Some("ios"));
        assert_eq!(profile.options.get("shared"), Some(&OptionValue::Bool(true)));
        assert_eq!(
            profile.options.get("with_serial"),
            Some(&OptionValue::choice("False"))
        );
    }

    #[test]
    fn profile_rejects_unknown_tables() {
        assert!(Profile::parse("[conf]\nx = 1\n").is_err());
    }

    #[test]
    fn command_line_overrides_profile() {
        let recipe = Recipe::aeon().expect("recipe");
        let profile = Profile::parse("[options]\nshared = true\nfPIC = false\n").expect("profile");
        let requested = build_request(&recipe, Some(&profile), &["shared=False".to_string()])
            .expect("request");

        assert_eq!(requested.get("shared"), Some(&OptionValue::Bool(false)));
        assert_eq!(requested.get("fPIC"), Some(&OptionValue::Bool(false)));
    }

    #[test]
    fn bad_option_args_rejected() {
        let recipe = Recipe::aeon().expect("recipe");
        assert!(build_request(&recipe, None, &["shared".to_string()]).is_err());
        assert!(matches!(
            build_request(&recipe, None, &["with_midi=true".to_string()]),
            Err(ResolveError::UnknownOption(name)) if name == "with_midi"
        ));
        assert!(matches!(
            build_request(&recipe, None, &["shared=yes".to_string()]),
            Err(ResolveError::DomainViolation { .. })
        ));
    }

    #[test]
    fn platform_flags_beat_profile() {
        let args = PlatformArgs {
            os: Some("windows".to_string()),
            compiler: None,
            arch: Some("x86_64".to_string()),
        };
        let settings = ProfileSettings {
            os: Some("linux".to_string()),
            compiler: None,
            arch: None,
        };
        let platform = select_platform(&args, Some(&settings)).expect("platform");
        assert_eq!(platform, PlatformInfo::new(Os::Windows, Compiler::Msvc, Arch::X86_64));
    }

    #[test]
    fn unknown_platform_name_rejected() {
        let args = PlatformArgs {
            os: Some("plan9".to_string()),
            ..PlatformArgs::default()
        };
        assert!(select_platform(&args, None).is_err());
    }

    #[test]
    fn recipe_manifest_loads_from_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("recipe.toml");
        std::fs::write(
            &path,
            r#"
            variable_prefix = "DEMO_"

            [[option]]
            name = "shared"
            default = false

            [[option]]
            name = "fPIC"
            default = true

            [[prune]]
            when = { option = "shared", value = true }
            remove = "fPIC"

            [[variable]]
            name = "pic"
            any_of = ["fPIC"]
            or_shared = true
            "#,
        )
        .expect("write");

        let recipe = load_recipe(Some(&path)).expect("recipe");
        assert_eq!(recipe.registry().len(), 2);
        assert_eq!(recipe.pruner().build_mode_rules().len(), 1);
    }

    #[test]
    fn recipe_manifest_with_misspelled_key_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("recipe.toml");
        std::fs::write(
            &path,
            r#"
            [[option]]
            name = "fPIC"
            default = true

            [[prune]]
            oss = ["windows"]
            remove = "fPIC"
            "#,
        )
        .expect("write");

        assert!(matches!(
            load_recipe(Some(&path)),
            Err(ResolveError::InvalidManifest(msg)) if msg.contains("oss")
        ));
    }

    #[test]
    fn output_path_needs_existing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(validate_output_path(&dir.path().join("aeon.lock")).is_ok());
        assert!(validate_output_path(&dir.path().join("missing/aeon.lock")).is_err());
    }
}
