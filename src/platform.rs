//! Platform and build configuration facts consumed by the partials.
//!
//! [`PlatformPrerequisites`] is the read-only bundle of everything a partial
//! needs to know about the build it is planning for: which Apple platform,
//! device or simulator, the compilation mode, the configured signing identity
//! and the build-wide user defines.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Apple platform family the target is built for.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    /// iOS and iPadOS
    #[default]
    Ios,
    /// macOS
    Macos,
    /// tvOS
    Tvos,
    /// watchOS
    Watchos,
    /// visionOS
    Visionos,
}

impl PlatformType {
    /// Returns the lowercase identifier used in configuration files.
    pub fn short_name(&self) -> &'static str {
        match self {
            PlatformType::Ios => "ios",
            PlatformType::Macos => "macos",
            PlatformType::Tvos => "tvos",
            PlatformType::Watchos => "watchos",
            PlatformType::Visionos => "visionos",
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

impl FromStr for PlatformType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(PlatformType::Ios),
            "macos" => Ok(PlatformType::Macos),
            "tvos" => Ok(PlatformType::Tvos),
            "watchos" => Ok(PlatformType::Watchos),
            "visionos" => Ok(PlatformType::Visionos),
            _ => Err(Error::Unsupported {
                kind: "platform type",
                value: s.to_string(),
            }),
        }
    }
}

/// Whether the build targets physical hardware or a simulator.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Physical device
    #[default]
    Device,
    /// Simulator
    Simulator,
}

/// Build compilation mode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilationMode {
    /// Fast unoptimized builds (the default)
    #[default]
    Fastbuild,
    /// Debug builds
    Dbg,
    /// Optimized release builds
    Opt,
}

impl CompilationMode {
    /// Returns the mode name as spelled on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilationMode::Fastbuild => "fastbuild",
            CompilationMode::Dbg => "dbg",
            CompilationMode::Opt => "opt",
        }
    }
}

impl fmt::Display for CompilationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompilationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fastbuild" => Ok(CompilationMode::Fastbuild),
            "dbg" => Ok(CompilationMode::Dbg),
            "opt" => Ok(CompilationMode::Opt),
            _ => Err(Error::Unsupported {
                kind: "compilation mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Build-wide user defines (`--define key=value`).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Defines(BTreeMap<String, String>);

impl Defines {
    /// Define controlling whether simulator bundles are code signed.
    pub const CODESIGN_SIMULATOR_BUNDLES: &'static str = "apple.codesign_simulator_bundles";
    /// Define forcing IPA compression for non-optimized builds.
    pub const COMPRESS_IPA: &'static str = "apple.compress_ipa";
    /// Define propagating embedded targets' debug outputs to the top-level target.
    pub const PROPAGATE_EMBEDDED_EXTRA_OUTPUTS: &'static str =
        "apple.propagate_embedded_extra_outputs";
    /// Define selecting the single-directory dSYM representation.
    pub const TREE_ARTIFACT_DSYM_FILES: &'static str = "apple.tree_artifact_dsym_files";

    /// Creates an empty set of defines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a define, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Parses and applies a `key=value` argument.
    pub fn insert_arg(&mut self, arg: &str) -> Result<()> {
        let (name, value) = arg
            .split_once('=')
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| Error::MalformedDefine(arg.to_string()))?;
        self.insert(name, value);
        Ok(())
    }

    /// Raw value of a define, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Interprets a define as a boolean, falling back to `default` when unset.
    ///
    /// Accepts `1|0|true|false|yes|no`, case-insensitively.
    pub fn bool_value(&self, name: &str, default: bool) -> Result<bool> {
        let Some(value) = self.get(name) else {
            return Ok(default);
        };
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(Error::InvalidDefine {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Merges `other` on top of `self`.
    pub fn extend(&mut self, other: &Defines) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Defines {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Immutable platform and configuration facts for one build target.
#[derive(Clone, Debug, Default)]
pub struct PlatformPrerequisites {
    /// Platform family
    pub platform_type: PlatformType,
    /// Device or simulator
    pub environment: Environment,
    /// Signing identity configured for the build (`--ios_signing_cert_name`)
    pub signing_identity: Option<String>,
    /// Compilation mode
    pub compilation_mode: CompilationMode,
    /// User defines
    pub defines: Defines,
    /// Xcode version string, informational
    pub xcode_version: Option<String>,
    /// SDK version string, informational
    pub sdk_version: Option<String>,
    /// Whether dSYM bundles are generated (`--apple_generate_dsym`)
    pub apple_generate_dsym: bool,
    /// Whether linkmaps are collected (`--objc_generate_linkmap`)
    pub objc_generate_linkmap: bool,
}

impl PlatformPrerequisites {
    /// True for builds targeting physical hardware.
    pub fn is_device(&self) -> bool {
        self.environment == Environment::Device
    }
}
