//! Archive post-processing and signing.
//!
//! An unprocessed archive (an `.ipa` or zipped bundle) may need any of three
//! steps before it is the final output: a user-supplied post-processor,
//! code signing, and recompression. All needed steps run in one generated
//! script. When none is needed the archive is copied as-is.

use crate::action::{
    Action, CopyAction, ExecutionRequirements, ExpandTemplateAction, PROCESS_AND_SIGN, RunAction,
    Template,
};
use crate::codesign::{
    CodesigningRequest, SigningContext, codesigning_command, validate_provisioning_profile,
};
use crate::error::{Error, Result};
use crate::platform::{CompilationMode, Defines, PlatformPrerequisites};
use crate::rule::RuleDescriptor;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

const MNEMONIC: &str = "ProcessAndSign";

/// Inputs of the archive post-processing partial.
#[derive(Clone, Debug)]
pub struct ProcessArchiveRequest {
    /// Target name, used in progress messages
    pub label_name: String,
    /// Rule policy
    pub rule: RuleDescriptor,
    /// Archive to process
    pub input_archive: PathBuf,
    /// Processed archive
    pub output_archive: PathBuf,
    /// Directory the archive is unpacked into while processing
    pub work_dir: PathBuf,
    /// Directory for generated scripts
    pub intermediates_dir: PathBuf,
    /// Bundle path inside the archive (`Payload/App.app`)
    pub bundle_path: String,
    /// Frameworks directory inside the archive, if the bundle embeds frameworks
    pub frameworks_path: Option<String>,
    /// Framework names that were signed when they were built
    pub signed_frameworks: BTreeSet<String>,
    /// Signing wrapper tool
    pub codesigningtool: PathBuf,
    /// Entitlements file
    pub entitlements: Option<PathBuf>,
    /// Provisioning profile
    pub provisioning_profile: Option<PathBuf>,
    /// User post-processing tool, run with the work directory as argument
    pub ipa_post_processor: Option<PathBuf>,
    /// Script template
    pub process_and_sign_template: Template,
    /// Extra files the signing step reads
    pub codesign_inputs: Vec<PathBuf>,
    /// Extra options forwarded to `codesign`
    pub codesign_opts: Vec<String>,
}

impl ProcessArchiveRequest {
    /// A request with the layout defaults of `rule`.
    ///
    /// The bundle is expected at `<archive_relative>/<label_name><extension>`
    /// and its embedded frameworks in the rule's frameworks directory.
    pub fn new(
        label_name: impl Into<String>,
        rule: RuleDescriptor,
        input_archive: impl Into<PathBuf>,
        output_archive: impl Into<PathBuf>,
    ) -> Self {
        let label_name = label_name.into();
        let output_archive = output_archive.into();
        let out_dir = output_archive
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let bundle_name = format!("{label_name}{}", rule.bundle_extension);
        let bundle_path = crate::codesign::policy::join_segments([
            rule.archive_relative,
            bundle_name.as_str(),
        ]);
        let frameworks_path = (!rule.contents_relative_frameworks.is_empty()).then(|| {
            crate::codesign::policy::join_segments([
                bundle_path.as_str(),
                rule.contents_relative_frameworks,
            ])
        });

        Self {
            work_dir: out_dir.join(format!("{label_name}_archive-root")),
            intermediates_dir: out_dir.join("_intermediates").join(&label_name),
            label_name,
            rule,
            input_archive: input_archive.into(),
            output_archive,
            bundle_path,
            frameworks_path,
            signed_frameworks: BTreeSet::new(),
            codesigningtool: PathBuf::from("codesigningtool"),
            entitlements: None,
            provisioning_profile: None,
            ipa_post_processor: None,
            process_and_sign_template: Template::Embedded(PROCESS_AND_SIGN),
            codesign_inputs: Vec::new(),
            codesign_opts: Vec::new(),
        }
    }
}

/// The planned post-processing of one archive.
#[derive(Clone, Debug, Serialize)]
pub struct ArchivePlan {
    /// The processed archive
    pub output_archive: PathBuf,
    /// Signing commands embedded in the script, empty when not signing
    pub signing_command_lines: String,
    /// Whether the archive is recompressed
    pub should_compress: bool,
    /// False when the plan is a plain copy
    pub has_work: bool,
    /// Actions to run, in order
    pub actions: Vec<Action>,
}

/// Whether the archive is compressed: always for `opt`, otherwise on request.
pub fn should_compress(platform: &PlatformPrerequisites) -> Result<bool> {
    Ok(platform.compilation_mode == CompilationMode::Opt
        || platform.defines.bool_value(Defines::COMPRESS_IPA, false)?)
}

fn script_name(output_archive: &Path) -> String {
    let digest = Sha256::digest(output_archive.to_string_lossy().as_bytes());
    format!("process-and-sign-{}.sh", &hex::encode(digest)[..16])
}

/// A path quoted as one shell word, so no character in it is interpreted.
fn shell_path(path: &Path) -> Result<String> {
    let raw = path.to_string_lossy();
    shlex::try_quote(&raw)
        .map(|quoted| quoted.into_owned())
        .map_err(|e| Error::GenericError(format!("cannot quote '{raw}': {e}")))
}

/// Plans post-processing and signing of an archive.
pub fn post_process_and_sign_archive(
    request: &ProcessArchiveRequest,
    platform: &PlatformPrerequisites,
) -> Result<ArchivePlan> {
    validate_provisioning_profile(platform, &request.rule, request.provisioning_profile.as_deref())?;

    let context = SigningContext {
        platform,
        entitlements: request.entitlements.as_deref(),
        provisioning_profile: request.provisioning_profile.as_deref(),
        identity_override: None,
        codesign_opts: &request.codesign_opts,
    };
    let signing_command_lines = codesigning_command(&CodesigningRequest {
        codesigningtool: &request.codesigningtool,
        context,
        rule: &request.rule,
        bundle_path: &request.bundle_path,
        frameworks_path: request.frameworks_path.as_deref(),
        signed_frameworks: &request.signed_frameworks,
    })?;

    let mut inputs = vec![request.input_archive.clone()];
    if !signing_command_lines.is_empty() {
        inputs.push(request.codesigningtool.clone());
        inputs.extend(request.entitlements.iter().cloned());
        inputs.extend(request.provisioning_profile.iter().cloned());
        inputs.extend(request.codesign_inputs.iter().cloned());
    }
    if let Some(processor) = &request.ipa_post_processor {
        inputs.push(processor.clone());
    }

    let should_compress = should_compress(platform)?;
    let has_work =
        !signing_command_lines.is_empty() || request.ipa_post_processor.is_some() || should_compress;

    if !has_work {
        log::debug!(
            "Nothing to process for {}, copying {}",
            request.label_name,
            request.input_archive.display()
        );
        return Ok(ArchivePlan {
            output_archive: request.output_archive.clone(),
            signing_command_lines,
            should_compress,
            has_work,
            actions: vec![Action::Copy(CopyAction {
                src: request.input_archive.clone(),
                dst: request.output_archive.clone(),
                mnemonic: MNEMONIC.to_string(),
            })],
        });
    }

    let script = request
        .intermediates_dir
        .join(script_name(&request.output_archive));

    let substitutions = BTreeMap::from([
        (
            "ipa_post_processor".to_string(),
            match request.ipa_post_processor.as_deref() {
                Some(processor) => shell_path(processor)?,
                None => "''".to_string(),
            },
        ),
        ("output_path".to_string(), shell_path(&request.output_archive)?),
        (
            "should_compress".to_string(),
            if should_compress { "1" } else { "" }.to_string(),
        ),
        ("signing_command_lines".to_string(), signing_command_lines.clone()),
        (
            "unprocessed_archive_path".to_string(),
            shell_path(&request.input_archive)?,
        ),
        ("work_dir".to_string(), shell_path(&request.work_dir)?),
    ]);

    let run_on_darwin = !signing_command_lines.is_empty() || request.ipa_post_processor.is_some();
    let execution_requirements = if run_on_darwin {
        ExecutionRequirements::signing()
    } else {
        ExecutionRequirements::default()
    };

    log::info!(
        "Planned {} for {} (sign: {}, post-process: {}, compress: {})",
        MNEMONIC,
        request.label_name,
        !signing_command_lines.is_empty(),
        request.ipa_post_processor.is_some(),
        should_compress
    );

    inputs.push(script.clone());
    let actions = vec![
        Action::ExpandTemplate(ExpandTemplateAction {
            template: request.process_and_sign_template.clone(),
            output: script.clone(),
            substitutions,
            is_executable: true,
        }),
        Action::Run(RunAction {
            executable: script,
            arguments: Vec::new(),
            inputs,
            outputs: vec![request.output_archive.clone()],
            mnemonic: MNEMONIC.to_string(),
            progress_message: format!("Processing and signing {}", request.label_name),
            execution_requirements,
        }),
    ];

    Ok(ArchivePlan {
        output_archive: request.output_archive.clone(),
        signing_command_lines,
        should_compress,
        has_work,
        actions,
    })
}
