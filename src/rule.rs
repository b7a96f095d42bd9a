//! Static per-rule-kind signing policy.
//!
//! Each kind of bundle rule carries a fixed [`RuleDescriptor`]. The descriptor
//! decides whether device builds must be signed, whether simulator signing may
//! be skipped, and which [`CodesignExemption`] applies.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Code-signing exception class for a rule.
///
/// Exactly one applies per rule.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodesignExemption {
    /// No exemption: the bundle is always signed.
    #[default]
    None,
    /// Sign only when a provisioning profile was supplied.
    RequireProfile,
    /// Never sign.
    SkipSigning,
}

/// Kinds of bundle rules with a known signing policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// `ios_application`
    IosApplication,
    /// `ios_app_clip`
    IosAppClip,
    /// `ios_extension`
    IosExtension,
    /// `ios_framework`
    IosFramework,
    /// `ios_static_framework`
    IosStaticFramework,
    /// `ios_unit_test`
    IosUnitTest,
    /// `ios_ui_test`
    IosUiTest,
    /// `macos_application`
    MacosApplication,
    /// `macos_command_line_application`
    MacosCommandLineApplication,
    /// `macos_bundle`
    MacosBundle,
    /// `tvos_application`
    TvosApplication,
    /// `watchos_application`
    WatchosApplication,
}

impl RuleType {
    /// Every rule type, in declaration order.
    pub const ALL: &'static [RuleType] = &[
        RuleType::IosApplication,
        RuleType::IosAppClip,
        RuleType::IosExtension,
        RuleType::IosFramework,
        RuleType::IosStaticFramework,
        RuleType::IosUnitTest,
        RuleType::IosUiTest,
        RuleType::MacosApplication,
        RuleType::MacosCommandLineApplication,
        RuleType::MacosBundle,
        RuleType::TvosApplication,
        RuleType::WatchosApplication,
    ];

    /// Rule name as written in build files.
    pub fn rule_name(&self) -> &'static str {
        match self {
            RuleType::IosApplication => "ios_application",
            RuleType::IosAppClip => "ios_app_clip",
            RuleType::IosExtension => "ios_extension",
            RuleType::IosFramework => "ios_framework",
            RuleType::IosStaticFramework => "ios_static_framework",
            RuleType::IosUnitTest => "ios_unit_test",
            RuleType::IosUiTest => "ios_ui_test",
            RuleType::MacosApplication => "macos_application",
            RuleType::MacosCommandLineApplication => "macos_command_line_application",
            RuleType::MacosBundle => "macos_bundle",
            RuleType::TvosApplication => "tvos_application",
            RuleType::WatchosApplication => "watchos_application",
        }
    }

    /// The static descriptor for this rule type.
    pub fn descriptor(self) -> RuleDescriptor {
        let ios_app = RuleDescriptor {
            rule_type: self,
            bundle_extension: ".app",
            archive_relative: "Payload",
            contents_relative_frameworks: "Frameworks",
            requires_signing_for_device: true,
            skip_simulator_signing_allowed: true,
            codesign_exemption: CodesignExemption::None,
        };
        let macos_app = RuleDescriptor {
            archive_relative: "",
            contents_relative_frameworks: "Contents/Frameworks",
            requires_signing_for_device: false,
            skip_simulator_signing_allowed: false,
            ..ios_app
        };

        match self {
            RuleType::IosApplication | RuleType::TvosApplication | RuleType::WatchosApplication => {
                ios_app
            }
            RuleType::IosAppClip => ios_app,
            RuleType::IosExtension => RuleDescriptor {
                bundle_extension: ".appex",
                archive_relative: "",
                ..ios_app
            },
            RuleType::IosFramework => RuleDescriptor {
                bundle_extension: ".framework",
                archive_relative: "",
                contents_relative_frameworks: "",
                requires_signing_for_device: false,
                ..ios_app
            },
            RuleType::IosStaticFramework => RuleDescriptor {
                bundle_extension: ".framework",
                archive_relative: "",
                contents_relative_frameworks: "",
                requires_signing_for_device: false,
                codesign_exemption: CodesignExemption::SkipSigning,
                ..ios_app
            },
            RuleType::IosUnitTest | RuleType::IosUiTest => RuleDescriptor {
                bundle_extension: ".xctest",
                archive_relative: "",
                requires_signing_for_device: false,
                skip_simulator_signing_allowed: false,
                codesign_exemption: CodesignExemption::RequireProfile,
                ..ios_app
            },
            RuleType::MacosApplication => macos_app,
            RuleType::MacosCommandLineApplication => RuleDescriptor {
                bundle_extension: "",
                contents_relative_frameworks: "",
                codesign_exemption: CodesignExemption::RequireProfile,
                ..macos_app
            },
            RuleType::MacosBundle => RuleDescriptor {
                bundle_extension: ".bundle",
                ..macos_app
            },
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rule_name())
    }
}

impl FromStr for RuleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RuleType::ALL
            .iter()
            .copied()
            .find(|rule| rule.rule_name() == s)
            .ok_or_else(|| Error::Unsupported {
                kind: "rule type",
                value: s.to_string(),
            })
    }
}

/// Static signing and layout policy of a rule kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct RuleDescriptor {
    /// The rule kind this descriptor belongs to
    pub rule_type: RuleType,
    /// Bundle extension, including the leading dot (empty for bare binaries)
    pub bundle_extension: &'static str,
    /// Directory of the bundle inside its archive (`Payload` for iOS apps)
    pub archive_relative: &'static str,
    /// Frameworks directory relative to the bundle root
    pub contents_relative_frameworks: &'static str,
    /// Device builds must carry a provisioning profile
    pub requires_signing_for_device: bool,
    /// The `apple.codesign_simulator_bundles` define may turn signing off
    pub skip_simulator_signing_allowed: bool,
    /// Code-signing exception class
    pub codesign_exemption: CodesignExemption,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_names_roundtrip() {
        for rule in RuleType::ALL {
            assert_eq!(rule.rule_name().parse::<RuleType>().unwrap(), *rule);
        }
    }

    #[test]
    fn test_static_framework_skips_signing() {
        let descriptor = RuleType::IosStaticFramework.descriptor();
        assert_eq!(descriptor.codesign_exemption, CodesignExemption::SkipSigning);
    }

    #[test]
    fn test_ios_application_layout() {
        let descriptor = RuleType::IosApplication.descriptor();
        assert_eq!(descriptor.bundle_extension, ".app");
        assert_eq!(descriptor.archive_relative, "Payload");
        assert!(descriptor.requires_signing_for_device);
        assert!(descriptor.skip_simulator_signing_allowed);
    }

    #[test]
    fn test_macos_application_layout() {
        let descriptor = RuleType::MacosApplication.descriptor();
        assert_eq!(descriptor.contents_relative_frameworks, "Contents/Frameworks");
        assert!(!descriptor.skip_simulator_signing_allowed);
    }
}
