//! Signing targets.

use crate::error::{Error, Result};
use serde::Serialize;

/// One path handed to the signing tool.
///
/// Either a single bundle (`is_directory == false`) or a directory whose
/// immediate contents are signed, minus the `signed_frameworks` that were
/// already signed upstream.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PathToSign {
    /// Path to sign; may contain unexpanded `$VAR` references
    pub path: String,
    /// Sign the directory's immediate contents rather than the path itself
    pub is_directory: bool,
    /// Already signed children of `path` to exempt
    pub signed_frameworks: Vec<String>,
    /// Attach the entitlements file when one is available
    pub use_entitlements: bool,
}

impl PathToSign {
    /// A single bundle, signed with entitlements.
    pub fn bundle(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
            signed_frameworks: Vec::new(),
            use_entitlements: true,
        }
    }

    /// A directory of loose items, signed without entitlements.
    pub fn directory(path: impl Into<String>, signed_frameworks: Vec<String>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
            signed_frameworks,
            use_entitlements: false,
        }
    }

    /// Checks the signed-framework invariants.
    ///
    /// Only directories may carry exceptions, and every exception must live
    /// under the directory being signed.
    pub fn validate(&self) -> Result<()> {
        if !self.is_directory && !self.signed_frameworks.is_empty() {
            return Err(Error::SignedFrameworksOnFile {
                path: self.path.clone(),
            });
        }

        if let Some(framework) = self
            .signed_frameworks
            .iter()
            .find(|framework| !framework.starts_with(&self.path))
        {
            return Err(Error::SignedFrameworkOutsidePath {
                path: self.path.clone(),
                framework: framework.clone(),
            });
        }

        Ok(())
    }
}
