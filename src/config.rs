//! Build configuration file.
//!
//! A TOML file describing the platform facts of a build:
//!
//! ```toml
//! platform_type = "ios"
//! environment = "device"
//! compilation_mode = "opt"
//! signing_identity = "Apple Development: Jane Doe"
//! apple_generate_dsym = true
//!
//! [defines]
//! "apple.codesign_simulator_bundles" = "0"
//! ```

use crate::error::{Context, ErrorExt, Result};
use crate::platform::{CompilationMode, Defines, Environment, PlatformPrerequisites, PlatformType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Deserialized build configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Platform family
    pub platform_type: PlatformType,
    /// Device or simulator
    pub environment: Environment,
    /// Compilation mode
    pub compilation_mode: CompilationMode,
    /// Signing identity; empty means unset
    pub signing_identity: Option<String>,
    /// Xcode version
    pub xcode_version: Option<String>,
    /// SDK version
    pub sdk_version: Option<String>,
    /// Generate dSYM bundles
    pub apple_generate_dsym: bool,
    /// Collect linkmaps
    pub objc_generate_linkmap: bool,
    /// User defines
    pub defines: Defines,
}

impl BuildConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).fs_context("reading build configuration", path)?;
        Self::from_toml(&text)
            .with_context(|| format!("invalid build configuration {}", path.display()))
    }

    /// Freezes the configuration into the facts handed to partials.
    pub fn into_prerequisites(self) -> PlatformPrerequisites {
        PlatformPrerequisites {
            platform_type: self.platform_type,
            environment: self.environment,
            signing_identity: self.signing_identity.filter(|id| !id.is_empty()),
            compilation_mode: self.compilation_mode,
            defines: self.defines,
            xcode_version: self.xcode_version,
            sdk_version: self.sdk_version,
            apple_generate_dsym: self.apple_generate_dsym,
            objc_generate_linkmap: self.objc_generate_linkmap,
        }
    }
}
