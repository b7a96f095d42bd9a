//! Bundle-level signing decisions.
//!
//! Rule policy is evaluated first and is authoritative. The build-wide
//! `apple.codesign_simulator_bundles` define is only consulted afterwards,
//! and only for rules that allow skipping simulator signing.

use super::command::{SigningContext, signing_command_lines};
use super::path::PathToSign;
use crate::error::{Error, Result};
use crate::platform::{Defines, PlatformPrerequisites};
use crate::rule::{CodesignExemption, RuleDescriptor};
use std::collections::BTreeSet;
use std::path::Path;

/// Shell variable holding the directory the archive is unpacked into.
pub const WORK_DIR_VAR: &str = "$WORK_DIR";

/// Whether the rule's exemption class allows signing at all.
pub fn should_sign_bundles(rule: &RuleDescriptor, has_provisioning_profile: bool) -> bool {
    match rule.codesign_exemption {
        CodesignExemption::None => true,
        CodesignExemption::RequireProfile => has_provisioning_profile,
        CodesignExemption::SkipSigning => false,
    }
}

/// Whether a simulator build of this rule is signed.
pub fn should_sign_simulator_bundles(rule: &RuleDescriptor, defines: &Defines) -> Result<bool> {
    if !rule.skip_simulator_signing_allowed {
        return Ok(true);
    }
    defines.bool_value(Defines::CODESIGN_SIMULATOR_BUNDLES, true)
}

/// Aborts device builds of rules that mandate a provisioning profile when none was given.
pub fn validate_provisioning_profile(
    platform: &PlatformPrerequisites,
    rule: &RuleDescriptor,
    provisioning_profile: Option<&Path>,
) -> Result<()> {
    if platform.is_device() && rule.requires_signing_for_device && provisioning_profile.is_none() {
        return Err(Error::MissingProvisioningProfile {
            platform: platform.platform_type.to_string(),
        });
    }
    Ok(())
}

/// Joins path segments with `/`, skipping empty ones.
pub(crate) fn join_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Everything needed to sign the contents of an unpacked archive.
#[derive(Clone, Debug)]
pub struct CodesigningRequest<'a> {
    /// Path to the signing wrapper tool
    pub codesigningtool: &'a Path,
    /// Shared signing inputs
    pub context: SigningContext<'a>,
    /// Rule policy
    pub rule: &'a RuleDescriptor,
    /// Bundle path relative to the work directory (`Payload/App.app`)
    pub bundle_path: &'a str,
    /// Frameworks directory relative to the work directory, if the bundle embeds any
    pub frameworks_path: Option<&'a str>,
    /// Framework names under `frameworks_path` that are already signed
    pub signed_frameworks: &'a BTreeSet<String>,
}

impl CodesigningRequest<'_> {
    /// The paths that will be signed, frameworks directory first.
    pub fn paths_to_sign(&self) -> Result<Vec<PathToSign>> {
        let has_profile = self.context.provisioning_profile.is_some();
        if !should_sign_bundles(self.rule, has_profile) {
            log::debug!(
                "{} does not sign bundles ({:?})",
                self.rule.rule_type,
                self.rule.codesign_exemption
            );
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();

        if let Some(frameworks_path) = self.frameworks_path {
            let framework_root = format!("{}/", join_segments([WORK_DIR_VAR, frameworks_path]));
            let signed = self
                .signed_frameworks
                .iter()
                .map(|name| format!("{framework_root}{}", name.trim_matches('/')))
                .collect();
            paths.push(PathToSign::directory(framework_root, signed));
        }

        let platform = self.context.platform;
        if platform.is_device() || should_sign_simulator_bundles(self.rule, &platform.defines)? {
            paths.push(PathToSign::bundle(join_segments([
                WORK_DIR_VAR,
                self.bundle_path,
            ])));
        } else {
            log::info!("Skipping simulator signing of {}", self.bundle_path);
        }

        Ok(paths)
    }
}

/// Signing command text for an archive's bundle and frameworks.
///
/// Returns an empty string when nothing is signed.
pub fn codesigning_command(request: &CodesigningRequest<'_>) -> Result<String> {
    let paths = request.paths_to_sign()?;
    if paths.is_empty() {
        return Ok(String::new());
    }
    signing_command_lines(request.codesigningtool, &paths, &request.context)
}
