//! dSYM bundle assembly and debug-output aggregation.
//!
//! The linker leaves one debug binary per architecture. This partial lays
//! them out as a dSYM bundle:
//!
//! ```text
//! App.app.dSYM/
//!   Contents/
//!     Info.plist
//!     Resources/DWARF/
//!       App            <- lipo of all architectures
//!       App_arm64
//!       App_x86_64
//! ```
//!
//! Per-architecture binaries are copied, never symlinked: Spotlight ignores
//! symlinked DWARF data and debuggers rely on Spotlight to find dSYMs.

mod info;

pub use info::{DebugOutputsInfo, DsymBundleInfo};

use crate::action::{
    Action, CopyAction, DSYM_INFO_PLIST, ExecutionRequirements, ExpandTemplateAction, RunAction,
    Template,
};
use crate::error::{Error, ErrorExt, Result};
use crate::platform::{Defines, PlatformPrerequisites};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Version used when no version provider is given.
pub const DEFAULT_BUNDLE_VERSION: &str = "1";

/// Short version used when no version provider is given.
pub const DEFAULT_SHORT_VERSION_STRING: &str = "1.0";

/// Versioning metadata of a bundle.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BundleVersion {
    /// `CFBundleVersion`
    #[serde(default)]
    pub build_version: Option<String>,
    /// `CFBundleShortVersionString`
    #[serde(default)]
    pub short_version_string: Option<String>,
}

impl BundleVersion {
    /// Loads a JSON version file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).fs_context("reading version file", path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Inputs of the debug symbols partial.
#[derive(Clone, Debug)]
pub struct DebugSymbolsRequest {
    /// Bundle name without extension
    pub bundle_name: String,
    /// Bundle extension including the leading dot
    pub bundle_extension: String,
    /// Name of the bundle's executable
    pub executable_name: String,
    /// Debug binary per architecture
    pub dsym_binaries: BTreeMap<String, PathBuf>,
    /// Linkmap per architecture
    pub linkmaps: BTreeMap<String, PathBuf>,
    /// Directory the outputs are declared in
    pub out_dir: PathBuf,
    /// Version provider
    pub version: Option<BundleVersion>,
    /// Info.plist template
    pub dsym_info_plist_template: Template,
    /// dSYM bundle records of dependencies
    pub dependency_dsym_bundles: Vec<DsymBundleInfo>,
    /// Debug output records of dependencies
    pub dependency_debug_outputs: Vec<DebugOutputsInfo>,
}

impl DebugSymbolsRequest {
    /// A request with no artifacts, no version and no dependencies.
    pub fn new(
        bundle_name: impl Into<String>,
        bundle_extension: impl Into<String>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        let bundle_name = bundle_name.into();
        Self {
            executable_name: bundle_name.clone(),
            bundle_name,
            bundle_extension: bundle_extension.into(),
            dsym_binaries: BTreeMap::new(),
            linkmaps: BTreeMap::new(),
            out_dir: out_dir.into(),
            version: None,
            dsym_info_plist_template: Template::Embedded(DSYM_INFO_PLIST),
            dependency_dsym_bundles: Vec::new(),
            dependency_debug_outputs: Vec::new(),
        }
    }

    fn bundle_name_with_extension(&self) -> String {
        format!("{}{}", self.bundle_name, self.bundle_extension)
    }

    fn dsym_bundle_dir(&self) -> PathBuf {
        self.out_dir
            .join(format!("{}.dSYM", self.bundle_name_with_extension()))
    }
}

/// How the dSYM bundle was declared.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DsymOutput {
    /// Individually declared files inside the bundle
    Files {
        /// The bundle directory
        bundle_dir: PathBuf,
        /// Every file declared inside it
        files: Vec<PathBuf>,
    },
    /// The whole bundle as one directory artifact
    Tree {
        /// The bundle directory
        bundle_dir: PathBuf,
    },
}

impl DsymOutput {
    /// The `.dSYM` directory.
    pub fn bundle_dir(&self) -> &Path {
        match self {
            DsymOutput::Files { bundle_dir, .. } | DsymOutput::Tree { bundle_dir } => bundle_dir,
        }
    }

    fn primary_outputs(&self) -> Vec<PathBuf> {
        match self {
            DsymOutput::Files { files, .. } => files.clone(),
            DsymOutput::Tree { bundle_dir } => vec![bundle_dir.clone()],
        }
    }
}

/// Files surfaced to the user for this target.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct OutputGroups {
    /// The `dsyms` output group
    pub dsyms: BTreeSet<PathBuf>,
    /// The `linkmaps` output group
    pub linkmaps: BTreeSet<PathBuf>,
}

/// Everything the debug symbols partial produced.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DebugSymbolsOutputs {
    /// The dSYM bundle, when one was built
    pub dsym_bundle: Option<DsymOutput>,
    /// Linkmaps declared for this target
    pub linkmaps: Vec<PathBuf>,
    /// Output groups for this target
    pub output_groups: OutputGroups,
    /// dSYM bundle locations for dependents
    pub dsym_bundle_info: DsymBundleInfo,
    /// dSYM and linkmap files for dependents
    pub debug_outputs: DebugOutputsInfo,
    /// Actions to run, in order
    pub actions: Vec<Action>,
}

fn dwarf_dir(bundle_dir: &Path) -> PathBuf {
    bundle_dir.join("Contents/Resources/DWARF")
}

fn info_plist_substitutions(request: &DebugSymbolsRequest) -> BTreeMap<String, String> {
    let version = request.version.clone().unwrap_or_default();
    BTreeMap::from([
        (
            "bundle_name_with_extension".to_string(),
            request.bundle_name_with_extension(),
        ),
        (
            "bundle_short_version_string".to_string(),
            version
                .short_version_string
                .unwrap_or_else(|| DEFAULT_SHORT_VERSION_STRING.to_string()),
        ),
        (
            "bundle_version".to_string(),
            version
                .build_version
                .unwrap_or_else(|| DEFAULT_BUNDLE_VERSION.to_string()),
        ),
    ])
}

/// `lipo` arguments merging every per-architecture binary into `output`.
pub fn lipo_arguments(inputs: &[PathBuf], output: &Path) -> Vec<String> {
    let mut args = vec!["-create".to_string()];
    args.extend(inputs.iter().map(|p| p.to_string_lossy().into_owned()));
    args.push("-output".to_string());
    args.push(output.to_string_lossy().into_owned());
    args
}

fn shell_quote(path: &Path) -> Result<String> {
    let raw = path.to_string_lossy();
    shlex::try_quote(&raw)
        .map(|quoted| quoted.into_owned())
        .map_err(|e| Error::GenericError(format!("cannot quote '{raw}': {e}")))
}

/// Plans the bundle as individually declared files.
fn plan_dsym_files(request: &DebugSymbolsRequest, actions: &mut Vec<Action>) -> DsymOutput {
    let bundle_dir = request.dsym_bundle_dir();
    let dwarf = dwarf_dir(&bundle_dir);
    let mut files = Vec::new();

    let mut per_arch = Vec::new();
    for (arch, binary) in &request.dsym_binaries {
        let output = dwarf.join(format!("{}_{arch}", request.executable_name));
        actions.push(Action::Copy(CopyAction {
            src: binary.clone(),
            dst: output.clone(),
            mnemonic: "CopyDebugSymbols".to_string(),
        }));
        per_arch.push(output);
    }
    files.extend(per_arch.iter().cloned());

    let merged = dwarf.join(&request.executable_name);
    actions.push(Action::Run(RunAction {
        executable: PathBuf::from("lipo"),
        arguments: lipo_arguments(&per_arch, &merged),
        inputs: per_arch,
        outputs: vec![merged.clone()],
        mnemonic: "LipoDebugSymbols".to_string(),
        progress_message: format!("Merging debug symbols for {}", request.bundle_name),
        execution_requirements: ExecutionRequirements {
            requires_darwin: true,
            ..Default::default()
        },
    }));
    files.push(merged);

    let plist = bundle_dir.join("Contents/Info.plist");
    actions.push(Action::ExpandTemplate(ExpandTemplateAction {
        template: request.dsym_info_plist_template.clone(),
        output: plist.clone(),
        substitutions: info_plist_substitutions(request),
        is_executable: false,
    }));
    files.push(plist);

    DsymOutput::Files { bundle_dir, files }
}

/// Plans the bundle as one directory artifact built by a single action.
fn plan_dsym_tree(request: &DebugSymbolsRequest, actions: &mut Vec<Action>) -> Result<DsymOutput> {
    let bundle_dir = request.dsym_bundle_dir();
    let dwarf = dwarf_dir(&bundle_dir);

    let plist = request
        .out_dir
        .join("_intermediates")
        .join(format!("{}-dSYM-Info.plist", request.bundle_name_with_extension()));
    actions.push(Action::ExpandTemplate(ExpandTemplateAction {
        template: request.dsym_info_plist_template.clone(),
        output: plist.clone(),
        substitutions: info_plist_substitutions(request),
        is_executable: false,
    }));

    let mut commands = vec![
        "set -e".to_string(),
        format!("rm -rf {}", shell_quote(&bundle_dir)?),
        format!("mkdir -p {}", shell_quote(&dwarf)?),
    ];
    let mut per_arch = Vec::new();
    for (arch, binary) in &request.dsym_binaries {
        let output = dwarf.join(format!("{}_{arch}", request.executable_name));
        commands.push(format!("cp -p {} {}", shell_quote(binary)?, shell_quote(&output)?));
        per_arch.push(output);
    }
    let merged = dwarf.join(&request.executable_name);
    let lipo = lipo_arguments(&per_arch, &merged)
        .iter()
        .map(|arg| shell_quote(Path::new(arg)))
        .collect::<Result<Vec<_>>>()?;
    commands.push(format!("lipo {}", lipo.join(" ")));
    commands.push(format!(
        "cp {} {}",
        shell_quote(&plist)?,
        shell_quote(&bundle_dir.join("Contents/Info.plist"))?
    ));

    let mut inputs: Vec<PathBuf> = request.dsym_binaries.values().cloned().collect();
    inputs.push(plist);

    actions.push(Action::Run(RunAction {
        inputs,
        outputs: vec![bundle_dir.clone()],
        progress_message: format!("Bundling dSYM for {}", request.bundle_name),
        execution_requirements: ExecutionRequirements {
            requires_darwin: true,
            ..Default::default()
        },
        ..RunAction::shell(commands.join("\n"), "BundleDsymTree")
    }));

    Ok(DsymOutput::Tree { bundle_dir })
}

/// Plans the dSYM bundle and linkmaps of a target and aggregates debug metadata.
pub fn debug_symbols(
    request: &DebugSymbolsRequest,
    platform: &PlatformPrerequisites,
) -> Result<DebugSymbolsOutputs> {
    let mut actions = Vec::new();

    let dsym_bundle = if platform.apple_generate_dsym && !request.dsym_binaries.is_empty() {
        let tree = platform
            .defines
            .bool_value(Defines::TREE_ARTIFACT_DSYM_FILES, false)?;
        log::debug!(
            "Assembling {} dSYM for {} from {} architectures",
            if tree { "tree" } else { "file" },
            request.bundle_name,
            request.dsym_binaries.len()
        );
        Some(if tree {
            plan_dsym_tree(request, &mut actions)?
        } else {
            plan_dsym_files(request, &mut actions)
        })
    } else {
        None
    };

    let mut linkmaps = Vec::new();
    if platform.objc_generate_linkmap {
        for (arch, linkmap) in &request.linkmaps {
            let output = request
                .out_dir
                .join(format!("{}_{arch}.linkmap", request.bundle_name));
            actions.push(Action::Copy(CopyAction {
                src: linkmap.clone(),
                dst: output.clone(),
                mnemonic: "CopyLinkmap".to_string(),
            }));
            linkmaps.push(output);
        }
    }

    let direct = DebugOutputsInfo {
        dsyms: dsym_bundle
            .iter()
            .flat_map(DsymOutput::primary_outputs)
            .collect(),
        linkmaps: linkmaps.iter().cloned().collect(),
    };

    let propagate = platform
        .defines
        .bool_value(Defines::PROPAGATE_EMBEDDED_EXTRA_OUTPUTS, false)?;
    let grouped = if propagate {
        DebugOutputsInfo::union(direct.clone(), &request.dependency_debug_outputs)
    } else {
        direct.clone()
    };

    let dsym_bundle_info = DsymBundleInfo::aggregate(
        dsym_bundle
            .iter()
            .map(|bundle| bundle.bundle_dir().to_path_buf()),
        &request.dependency_dsym_bundles,
    );
    let debug_outputs = DebugOutputsInfo::union(direct, &request.dependency_debug_outputs);

    Ok(DebugSymbolsOutputs {
        dsym_bundle,
        linkmaps,
        output_groups: OutputGroups {
            dsyms: grouped.dsyms,
            linkmaps: grouped.linkmaps,
        },
        dsym_bundle_info,
        debug_outputs,
        actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(defines: &[(&str, &str)]) -> PlatformPrerequisites {
        PlatformPrerequisites {
            apple_generate_dsym: true,
            objc_generate_linkmap: true,
            defines: defines.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn two_arch_request() -> DebugSymbolsRequest {
        let mut request = DebugSymbolsRequest::new("App", ".app", "out");
        request.dsym_binaries = BTreeMap::from([
            ("x86_64".to_string(), PathBuf::from("bin/App_x86_64.dwarf")),
            ("arm64".to_string(), PathBuf::from("bin/App_arm64.dwarf")),
        ]);
        request
    }

    #[test]
    fn test_no_binaries_no_bundle() {
        let request = DebugSymbolsRequest::new("App", ".app", "out");
        let outputs = debug_symbols(&request, &platform(&[])).unwrap();
        assert!(outputs.dsym_bundle.is_none());
        assert!(outputs.actions.is_empty());
        assert!(outputs.debug_outputs.is_empty());
        assert!(outputs.dsym_bundle_info.direct_dsyms.is_empty());
    }

    #[test]
    fn test_two_architectures_default_versions() {
        let outputs = debug_symbols(&two_arch_request(), &platform(&[])).unwrap();

        let Some(DsymOutput::Files { bundle_dir, files }) = &outputs.dsym_bundle else {
            panic!("expected a file-form dSYM bundle");
        };
        assert_eq!(bundle_dir, &PathBuf::from("out/App.app.dSYM"));
        assert!(files.contains(&PathBuf::from("out/App.app.dSYM/Contents/Resources/DWARF/App")));

        let lipo = outputs
            .actions
            .iter()
            .find_map(|action| match action {
                Action::Run(run) if run.mnemonic == "LipoDebugSymbols" => Some(run),
                _ => None,
            })
            .unwrap();
        // Architectures are merged in sorted order.
        assert_eq!(
            lipo.arguments,
            vec![
                "-create",
                "out/App.app.dSYM/Contents/Resources/DWARF/App_arm64",
                "out/App.app.dSYM/Contents/Resources/DWARF/App_x86_64",
                "-output",
                "out/App.app.dSYM/Contents/Resources/DWARF/App",
            ]
        );

        let plist = outputs
            .actions
            .iter()
            .find_map(|action| match action {
                Action::ExpandTemplate(expand) => Some(expand.render().unwrap()),
                _ => None,
            })
            .unwrap();
        assert!(plist.contains("<string>1</string>"));
        assert!(plist.contains("<string>1.0</string>"));
        assert!(plist.contains("com.apple.xcode.dsym.App.app"));
    }

    #[test]
    fn test_version_provider_used() {
        let mut request = two_arch_request();
        request.version = Some(BundleVersion {
            build_version: Some("42".into()),
            short_version_string: Some("2.3".into()),
        });
        let outputs = debug_symbols(&request, &platform(&[])).unwrap();
        let plist = outputs
            .actions
            .iter()
            .find_map(|action| match action {
                Action::ExpandTemplate(expand) => Some(expand.render().unwrap()),
                _ => None,
            })
            .unwrap();
        assert!(plist.contains("<string>42</string>"));
        assert!(plist.contains("<string>2.3</string>"));
    }

    #[test]
    fn test_copies_not_symlinks() {
        let outputs = debug_symbols(&two_arch_request(), &platform(&[])).unwrap();
        let copies = outputs
            .actions
            .iter()
            .filter(|action| matches!(action, Action::Copy(c) if c.mnemonic == "CopyDebugSymbols"))
            .count();
        assert_eq!(copies, 2);
    }

    #[test]
    fn test_tree_artifact_form() {
        let outputs = debug_symbols(
            &two_arch_request(),
            &platform(&[(Defines::TREE_ARTIFACT_DSYM_FILES, "1")]),
        )
        .unwrap();
        assert!(matches!(outputs.dsym_bundle, Some(DsymOutput::Tree { .. })));
        assert_eq!(
            outputs.debug_outputs.dsyms,
            BTreeSet::from([PathBuf::from("out/App.app.dSYM")])
        );
        let Action::Run(run) = outputs.actions.last().unwrap() else {
            panic!("expected the bundling action last");
        };
        assert_eq!(run.outputs, vec![PathBuf::from("out/App.app.dSYM")]);
        assert!(run.arguments[1].contains("lipo -create"));
        assert!(run.arguments[1].contains("App_arm64"));
        assert!(run.arguments[1].contains("App_x86_64"));
    }

    #[test]
    fn test_linkmaps_and_propagation() {
        let dep = DebugOutputsInfo {
            dsyms: BTreeSet::from([PathBuf::from("dep/Ext.appex.dSYM/Contents/Info.plist")]),
            linkmaps: BTreeSet::from([PathBuf::from("dep/Ext_arm64.linkmap")]),
        };
        let mut request = DebugSymbolsRequest::new("App", ".app", "out");
        request.linkmaps = BTreeMap::from([("arm64".to_string(), PathBuf::from("App.linkmap"))]);
        request.dependency_debug_outputs = vec![dep.clone()];

        let outputs = debug_symbols(&request, &platform(&[])).unwrap();
        assert_eq!(outputs.linkmaps, vec![PathBuf::from("out/App_arm64.linkmap")]);
        assert_eq!(outputs.output_groups.linkmaps.len(), 1);
        assert_eq!(outputs.debug_outputs.linkmaps.len(), 2);

        let outputs = debug_symbols(
            &request,
            &platform(&[(Defines::PROPAGATE_EMBEDDED_EXTRA_OUTPUTS, "true")]),
        )
        .unwrap();
        assert_eq!(outputs.output_groups.linkmaps.len(), 2);
        assert_eq!(outputs.output_groups.dsyms.len(), 1);
    }

    #[test]
    fn test_generation_disabled_still_aggregates() {
        let dep = DsymBundleInfo::aggregate([PathBuf::from("dep/Ext.appex.dSYM")], []);
        let mut request = two_arch_request();
        request.dependency_dsym_bundles = vec![dep];

        let platform = PlatformPrerequisites::default();
        let outputs = debug_symbols(&request, &platform).unwrap();
        assert!(outputs.dsym_bundle.is_none());
        assert!(outputs.dsym_bundle_info.direct_dsyms.is_empty());
        assert_eq!(outputs.dsym_bundle_info.transitive_dsyms.len(), 1);
    }

    #[test]
    fn test_version_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("version.json");
        std::fs::write(&path, r#"{"build_version": "7"}"#).unwrap();
        let version = BundleVersion::from_file(&path).unwrap();
        assert_eq!(version.build_version.as_deref(), Some("7"));
        assert!(version.short_version_string.is_none());
    }
}
