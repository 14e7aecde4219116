//! # Platform Facts
//!
//! Read-only description of the target: OS family, compiler family and CPU
//! architecture. These are supplied by whatever probes the build
//! environment; `PlatformInfo::host()` is a convenience for the common case
//! of configuring for the machine we are running on.

use crate::ResolveError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// OPERATING SYSTEM
// =============================================================================

/// Operating system families the recipe distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Windows,
    Linux,
    Macos,
    FreeBsd,
    Android,
    Ios,
    Emscripten,
}

impl Os {
    /// Every supported OS, in a fixed order.
    pub const ALL: [Os; 7] = [
        Os::Windows,
        Os::Linux,
        Os::Macos,
        Os::FreeBsd,
        Os::Android,
        Os::Ios,
        Os::Emscripten,
    ];

    /// Detect the operating system we are running on.
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "windows" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::Macos),
            "freebsd" => Some(Self::FreeBsd),
            "android" => Some(Self::Android),
            "ios" => Some(Self::Ios),
            "emscripten" => Some(Self::Emscripten),
            _ => None,
        }
    }

    /// Returns the lowercase string identifier for this OS.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::FreeBsd => "freebsd",
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Emscripten => "emscripten",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Os {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "darwin" => return Ok(Self::Macos),
            "win32" => return Ok(Self::Windows),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|os| os.as_str() == lowered)
            .ok_or_else(|| ResolveError::InvalidManifest(format!("unknown operating system '{}'", s)))
    }
}

// =============================================================================
// COMPILER
// =============================================================================

/// Compiler families the recipe distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compiler {
    Msvc,
    Gcc,
    Clang,
    AppleClang,
}

impl Compiler {
    /// Every supported compiler family, in a fixed order.
    pub const ALL: [Compiler; 4] = [
        Compiler::Msvc,
        Compiler::Gcc,
        Compiler::Clang,
        Compiler::AppleClang,
    ];

    /// The toolchain a plain install of `os` ships with.
    pub fn default_for(os: Os) -> Self {
        match os {
            Os::Windows => Self::Msvc,
            Os::Macos | Os::Ios => Self::AppleClang,
            Os::Linux => Self::Gcc,
            Os::FreeBsd | Os::Android | Os::Emscripten => Self::Clang,
        }
    }

    /// Returns the lowercase string identifier for this compiler.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Msvc => "msvc",
            Self::Gcc => "gcc",
            Self::Clang => "clang",
            Self::AppleClang => "apple-clang",
        }
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Compiler {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if lowered == "visual studio" || lowered == "cl" {
            return Ok(Self::Msvc);
        }
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| ResolveError::InvalidManifest(format!("unknown compiler '{}'", s)))
    }
}

// =============================================================================
// ARCHITECTURE
// =============================================================================

/// CPU architectures the recipe distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86,
    X86_64,
    Armv7,
    Armv8,
    Wasm,
}

impl Arch {
    /// Every supported architecture, in a fixed order.
    pub const ALL: [Arch; 5] = [Arch::X86, Arch::X86_64, Arch::Armv7, Arch::Armv8, Arch::Wasm];

    /// Detect the current CPU architecture at runtime.
    pub fn current() -> Option<Self> {
        match std::env::consts::ARCH {
            "x86" => Some(Self::X86),
            "x86_64" => Some(Self::X86_64),
            "arm" => Some(Self::Armv7),
            "aarch64" => Some(Self::Armv8),
            "wasm32" => Some(Self::Wasm),
            _ => None,
        }
    }

    /// Returns the lowercase string identifier for this architecture.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
            Self::Armv7 => "armv7",
            Self::Armv8 => "armv8",
            Self::Wasm => "wasm",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Arch {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "aarch64" | "arm64" => return Ok(Self::Armv8),
            "amd64" => return Ok(Self::X86_64),
            "wasm32" => return Ok(Self::Wasm),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == lowered)
            .ok_or_else(|| ResolveError::InvalidManifest(format!("unknown architecture '{}'", s)))
    }
}

// =============================================================================
// PLATFORM INFO
// =============================================================================

/// The full set of platform facts one resolution run is made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub os: Os,
    pub compiler: Compiler,
    pub arch: Arch,
}

impl PlatformInfo {
    /// Create a platform description.
    #[must_use]
    pub const fn new(os: Os, compiler: Compiler, arch: Arch) -> Self {
        Self { os, compiler, arch }
    }

    /// Describe the host, pairing the OS with its usual compiler.
    ///
    /// Returns `None` if the OS or architecture is not one we know.
    pub fn host() -> Option<Self> {
        let os = Os::current()?;
        Some(Self {
            os,
            compiler: Compiler::default_for(os),
            arch: Arch::current()?,
        })
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.arch, self.os, self.compiler)
    }
}

// =============================================================================
// TESTS
// =============================================================================
