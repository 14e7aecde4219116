//! # Canonical Lockfile
//!
//! Bit-exact `postcard` encoding of a [`Resolution`], used to pin a
//! configuration and to check later that a fresh run still agrees with it.
//!
//! Format:
//! ```text
//! [header_len: u32 LE] [CanonicalHeader (postcard)] [CanonicalLock (postcard)]
//! ```
//!
//! Every list in the body is sorted by name, so equal resolutions always
//! encode to equal bytes.

use crate::resolve::Resolution;
use crate::variables::VariableValue;
use crate::{OptionState, OptionValue, Removal, ResolveError};
use serde::{Deserialize, Serialize};

// =============================================================================
// CANONICAL FORMAT
// =============================================================================

/// Magic bytes for the lockfile format.
pub const CANONICAL_MAGIC: [u8; 4] = *b"AECF"; // AEon ConFig

/// Current lockfile format version.
pub const CANONICAL_VERSION: u8 = 1;

/// Maximum entries of any one list accepted on import.
pub const MAX_IMPORT_ENTRY_COUNT: u64 = 100_000;

/// Header of a lockfile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalHeader {
    pub magic: [u8; 4],
    pub version: u8,
    pub option_count: u64,
    pub requirement_count: u64,
    pub variable_count: u64,
    /// FNV-1a 64 over the body fields.
    pub checksum: u64,
}

impl CanonicalHeader {
    /// Create a header for the given body.
    #[must_use]
    pub fn for_lock(lock: &CanonicalLock) -> Self {
        Self {
            magic: CANONICAL_MAGIC,
            version: CANONICAL_VERSION,
            option_count: lock.options.len() as u64,
            requirement_count: lock.requirements.len() as u64,
            variable_count: lock.variables.len() as u64,
            checksum: lock.checksum(),
        }
    }

    /// Validate magic, version and size limits.
    pub fn validate(&self) -> Result<(), ResolveError> {
        if self.magic != CANONICAL_MAGIC {
            return Err(ResolveError::SerializationError(
                "Invalid file format".to_string(),
            ));
        }
        if self.version != CANONICAL_VERSION {
            return Err(ResolveError::SerializationError(
                "Unsupported file version".to_string(),
            ));
        }
        for (what, count) in [
            ("Option", self.option_count),
            ("Requirement", self.requirement_count),
            ("Variable", self.variable_count),
        ] {
            if count > MAX_IMPORT_ENTRY_COUNT {
                return Err(ResolveError::SerializationError(format!(
                    "{} count {} exceeds maximum allowed {}",
                    what, count, MAX_IMPORT_ENTRY_COUNT
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// CANONICAL ENTRIES
// =============================================================================

/// A value in canonical form. Externally tagged, unlike the untagged
/// [`OptionValue`] / [`VariableValue`], so `postcard` can decode it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum CanonicalValue {
    Bool(bool),
    Text(String),
}

impl From<&OptionValue> for CanonicalValue {
    fn from(value: &OptionValue) -> Self {
        match value {
            OptionValue::Bool(b) => Self::Bool(*b),
            OptionValue::Choice(s) => Self::Text(s.clone()),
        }
    }
}

impl From<&VariableValue> for CanonicalValue {
    fn from(value: &VariableValue) -> Self {
        match value {
            VariableValue::Bool(b) => Self::Bool(*b),
            VariableValue::Str(s) => Self::Text(s.clone()),
        }
    }
}

/// An option state in canonical form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum CanonicalState {
    Present(CanonicalValue),
    BuildMode(String),
    Platform(String),
    Gated(String),
}

impl From<&OptionState> for CanonicalState {
    fn from(state: &OptionState) -> Self {
        match state {
            OptionState::Present(value) => Self::Present(value.into()),
            OptionState::Absent(Removal::BuildMode { rule }) => Self::BuildMode(rule.clone()),
            OptionState::Absent(Removal::Platform { rule }) => Self::Platform(rule.clone()),
            OptionState::Absent(Removal::Gated { parent }) => Self::Gated(parent.clone()),
        }
    }
}

/// One option, sorted by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct CanonicalOption {
    pub name: String,
    pub state: CanonicalState,
}

/// One pinned component, sorted by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct CanonicalRequirement {
    pub name: String,
    pub version: String,
}

/// One build variable, sorted by logical name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct CanonicalVariable {
    pub name: String,
    pub value: CanonicalValue,
}

// =============================================================================
// CANONICAL LOCK
// =============================================================================

/// A resolution in canonical form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalLock {
    /// `arch-os-compiler`, as `PlatformInfo` displays it.
    pub platform: String,
    pub shared: bool,
    pub options: Vec<CanonicalOption>,
    pub requirements: Vec<CanonicalRequirement>,
    pub variables: Vec<CanonicalVariable>,
}

impl CanonicalLock {
    /// Capture a resolution.
    #[must_use]
    pub fn from_resolution(resolution: &Resolution) -> Self {
        let mut options: Vec<CanonicalOption> = resolution
            .options
            .iter()
            .map(|(name, state)| CanonicalOption {
                name: name.to_string(),
                state: state.into(),
            })
            .collect();
        options.sort();

        let mut requirements: Vec<CanonicalRequirement> = resolution
            .requirements
            .iter()
            .map(|spec| CanonicalRequirement {
                name: spec.name.clone(),
                version: spec.version.clone(),
            })
            .collect();
        requirements.sort();

        let mut variables: Vec<CanonicalVariable> = resolution
            .variables
            .iter()
            .map(|(name, value)| CanonicalVariable {
                name: name.to_string(),
                value: value.into(),
            })
            .collect();
        variables.sort();

        Self {
            platform: resolution.platform.to_string(),
            shared: resolution.build_mode.is_shared(),
            options,
            requirements,
            variables,
        }
    }

    /// FNV-1a 64 over every field. Not a cryptographic hash; see
    /// `canonical_crypto_hash` for that.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        let mut hash = Fnv1a::new();
        hash.write_str(&self.platform);
        hash.write(&[u8::from(self.shared)]);

        for option in &self.options {
            hash.write_str(&option.name);
            match &option.state {
                CanonicalState::Present(value) => {
                    hash.write(&[0]);
                    hash.write_value(value);
                }
                CanonicalState::BuildMode(rule) => {
                    hash.write(&[1]);
                    hash.write_str(rule);
                }
                CanonicalState::Platform(rule) => {
                    hash.write(&[2]);
                    hash.write_str(rule);
                }
                CanonicalState::Gated(parent) => {
                    hash.write(&[3]);
                    hash.write_str(parent);
                }
            }
        }
        for requirement in &self.requirements {
            hash.write_str(&requirement.name);
            hash.write_str(&requirement.version);
        }
        for variable in &self.variables {
            hash.write_str(&variable.name);
            hash.write_value(&variable.value);
        }
        hash.finish()
    }
}

struct Fnv1a(u64);

impl Fnv1a {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    fn new() -> Self {
        Self(Self::OFFSET)
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }

    /// Length-prefixed, so adjacent strings cannot run together.
    fn write_str(&mut self, s: &str) {
        self.write(&(s.len() as u64).to_le_bytes());
        self.write(s.as_bytes());
    }

    fn write_value(&mut self, value: &CanonicalValue) {
        match value {
            CanonicalValue::Bool(b) => self.write(&[0, u8::from(*b)]),
            CanonicalValue::Text(s) => {
                self.write(&[1]);
                self.write_str(s);
            }
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

// =============================================================================
// EXPORT FUNCTIONS
// =============================================================================

/// Encode a resolution as a lockfile.
///
/// # Errors
///
/// Returns `ResolveError::SerializationError` if encoding fails.
pub fn export_canonical(resolution: &Resolution) -> Result<Vec<u8>, ResolveError> {
    let lock = CanonicalLock::from_resolution(resolution);
    let header = CanonicalHeader::for_lock(&lock);

    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| ResolveError::SerializationError(format!("Header: {}", e)))?;
    let data_bytes = postcard::to_allocvec(&lock)
        .map_err(|e| ResolveError::SerializationError(format!("Data: {}", e)))?;
    let header_len = u32::try_from(header_bytes.len())
        .map_err(|_| ResolveError::SerializationError("Header too large".to_string()))?;

    let mut result = Vec::with_capacity(4 + header_bytes.len() + data_bytes.len());
    result.extend_from_slice(&header_len.to_le_bytes());
    result.extend_from_slice(&header_bytes);
    result.extend_from_slice(&data_bytes);

    tracing::debug!(
        bytes = result.len(),
        checksum = header.checksum,
        "exported canonical lock"
    );
    Ok(result)
}

/// Decode and check a lockfile.
///
/// # Errors
///
/// Returns `ResolveError::SerializationError` if the data is truncated,
/// has the wrong magic or version, or fails the checksum or count checks.
pub fn import_canonical(data: &[u8]) -> Result<CanonicalLock, ResolveError> {
    let Some((len_bytes, rest)) = data.split_first_chunk::<4>() else {
        return Err(ResolveError::SerializationError(
            "Data too short".to_string(),
        ));
    };
    let header_len = u32::from_le_bytes(*len_bytes) as usize;
    if rest.len() < header_len {
        return Err(ResolveError::SerializationError(
            "Data too short for header".to_string(),
        ));
    }
    let (header_bytes, body) = rest.split_at(header_len);

    let header: CanonicalHeader = postcard::from_bytes(header_bytes)
        .map_err(|e| ResolveError::SerializationError(format!("Header: {}", e)))?;
    header.validate()?;

    let lock: CanonicalLock = postcard::from_bytes(body)
        .map_err(|e| ResolveError::SerializationError(format!("Data: {}", e)))?;

    let computed = lock.checksum();
    if computed != header.checksum {
        return Err(ResolveError::SerializationError(format!(
            "Checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }
    if lock.options.len() as u64 != header.option_count
        || lock.requirements.len() as u64 != header.requirement_count
        || lock.variables.len() as u64 != header.variable_count
    {
        return Err(ResolveError::SerializationError(
            "Entry count mismatch".to_string(),
        ));
    }

    Ok(lock)
}

/// Check whether a lockfile matches `resolution`.
///
/// A malformed lockfile is an error; a well-formed one that disagrees is
/// `Ok(false)`.
pub fn verify_canonical(resolution: &Resolution, canonical_data: &[u8]) -> Result<bool, ResolveError> {
    let imported = import_canonical(canonical_data)?;
    Ok(CanonicalLock::from_resolution(resolution) == imported)
}

/// The canonical checksum of a resolution.
#[must_use]
pub fn canonical_checksum(resolution: &Resolution) -> u64 {
    CanonicalLock::from_resolution(resolution).checksum()
}

// =============================================================================
// CRYPTOGRAPHIC HASH SUPPORT
// =============================================================================

/// BLAKE3 hex digest of the lockfile encoding of `resolution`.
///
/// Only available with the `crypto-hash` feature.
#[cfg(feature = "crypto-hash")]
pub fn canonical_crypto_hash(resolution: &Resolution) -> Result<String, ResolveError> {
    let data = export_canonical(resolution)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================
