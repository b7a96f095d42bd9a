//! Command line argument parsing.
//!
//! Global flags describe the build (platform facts and defines) and apply to
//! every subcommand. A `--config` file supplies the base values and the
//! flags override them.

use crate::config::BuildConfig;
use crate::platform::{CompilationMode, Environment, PlatformPrerequisites};
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Apple bundle build partials
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_apple",
    version,
    about = "Plan and run Apple bundle signing, archive processing and dSYM assembly",
    long_about = "Plan and run the signing, archive post-processing and dSYM steps of an Apple bundle build.

Usage:
  kodegen_bundler_apple --device sign-command --rule ios_application --bundle-path Payload/App.app
  kodegen_bundler_apple --config build.toml process-archive --label App --rule ios_application \\
      --input App.unprocessed.zip --output App.ipa --provisioning-profile App.mobileprovision
  kodegen_bundler_apple --dry-run dsym --bundle-name App --bundle-extension .app \\
      --binary arm64=App_arm64.dwarf --binary x86_64=App_x86_64.dwarf --out-dir out"
)]
pub struct Args {
    /// Build configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE", env = "KODEGEN_APPLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Build-wide define, may be repeated
    #[arg(long = "define", global = true, value_name = "KEY=VALUE")]
    pub defines: Vec<String>,

    /// Compilation mode: fastbuild, dbg or opt
    #[arg(long, global = true, value_name = "MODE")]
    pub compilation_mode: Option<String>,

    /// Build for the simulator
    #[arg(long, global = true, conflicts_with = "device")]
    pub simulator: bool,

    /// Build for a physical device
    #[arg(long, global = true)]
    pub device: bool,

    /// Signing identity configured for the build
    #[arg(long, global = true, value_name = "IDENTITY")]
    pub signing_identity: Option<String>,

    /// Print the planned actions as JSON instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Directory relative paths are resolved against
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    pub exec_root: PathBuf,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Signing inputs shared by `sign-command` and `process-archive`.
#[derive(clap::Args, Debug, Clone)]
pub struct SigningArgs {
    /// Rule the bundle is built by, e.g. ios_application
    #[arg(long, value_name = "RULE")]
    pub rule: String,

    /// Entitlements file
    #[arg(long, value_name = "FILE")]
    pub entitlements: Option<PathBuf>,

    /// Provisioning profile
    #[arg(long, value_name = "FILE")]
    pub provisioning_profile: Option<PathBuf>,

    /// Framework already signed by its own target, may be repeated
    #[arg(long = "signed-framework", value_name = "NAME")]
    pub signed_frameworks: Vec<String>,

    /// Signing helper invoked by the generated commands
    #[arg(long, value_name = "TOOL", default_value = "codesigningtool")]
    pub codesigningtool: PathBuf,

    /// Extra option forwarded to codesign, may be repeated
    #[arg(long = "codesign-opt", value_name = "OPT", allow_hyphen_values = true)]
    pub codesign_opts: Vec<String>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the signing command lines for a bundle
    SignCommand {
        #[command(flatten)]
        signing: SigningArgs,

        /// Bundle path inside the signing work directory
        #[arg(long, value_name = "PATH")]
        bundle_path: String,

        /// Frameworks directory inside the signing work directory
        #[arg(long, value_name = "PATH")]
        frameworks_path: Option<String>,
    },

    /// Post-process and sign an unprocessed archive
    ProcessArchive {
        #[command(flatten)]
        signing: SigningArgs,

        /// Target name; the bundle is <label><extension>
        #[arg(long, value_name = "NAME")]
        label: String,

        /// Unprocessed archive
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Final archive
        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        /// Frameworks directory inside the archive, defaults to the rule's layout
        #[arg(long, value_name = "PATH", conflicts_with = "no_frameworks")]
        frameworks_path: Option<String>,

        /// The bundle has no embedded frameworks directory to sign
        #[arg(long)]
        no_frameworks: bool,

        /// Executable run on the extracted archive before signing
        #[arg(long, value_name = "TOOL")]
        ipa_post_processor: Option<PathBuf>,

        /// Replacement for the built-in processing script template
        #[arg(long, value_name = "FILE")]
        template: Option<PathBuf>,
    },

    /// Assemble a dSYM bundle from per-architecture debug binaries
    Dsym {
        /// Bundle name without extension
        #[arg(long, value_name = "NAME")]
        bundle_name: String,

        /// Bundle extension, e.g. .app
        #[arg(long, value_name = "EXT", allow_hyphen_values = true)]
        bundle_extension: String,

        /// Executable name, defaults to the bundle name
        #[arg(long, value_name = "NAME")]
        executable_name: Option<String>,

        /// Debug binary for an architecture, may be repeated
        #[arg(long = "binary", value_name = "ARCH=FILE", value_parser = parse_arch_path)]
        binaries: Vec<(String, PathBuf)>,

        /// Linkmap for an architecture, may be repeated
        #[arg(long = "linkmap", value_name = "ARCH=FILE", value_parser = parse_arch_path)]
        linkmaps: Vec<(String, PathBuf)>,

        /// Directory outputs are declared in
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,

        /// JSON file with build_version and short_version_string
        #[arg(long, value_name = "FILE")]
        version_file: Option<PathBuf>,

        /// Replacement for the built-in Info.plist template
        #[arg(long, value_name = "FILE")]
        info_plist_template: Option<PathBuf>,
    },
}

impl Command {
    /// Subcommand name, for messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SignCommand { .. } => "sign-command",
            Command::ProcessArchive { .. } => "process-archive",
            Command::Dsym { .. } => "dsym",
        }
    }
}

fn parse_arch_path(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((arch, path)) if !arch.is_empty() && !path.is_empty() => {
            Ok((arch.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected ARCH=FILE, got '{s}'")),
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Builds the platform facts from the config file and the override flags.
    pub fn platform(&self) -> anyhow::Result<PlatformPrerequisites> {
        let mut config = match &self.config {
            Some(path) => BuildConfig::load(path)?,
            None => BuildConfig::default(),
        };

        if let Some(mode) = &self.compilation_mode {
            config.compilation_mode = mode.parse::<CompilationMode>()?;
        }
        if self.simulator {
            config.environment = Environment::Simulator;
        } else if self.device {
            config.environment = Environment::Device;
        }
        if let Some(identity) = &self.signing_identity {
            config.signing_identity = Some(identity.clone());
        }
        for define in &self.defines {
            config
                .defines
                .insert_arg(define)
                .with_context(|| format!("invalid --define {define}"))?;
        }

        Ok(config.into_prerequisites())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
    platform: PlatformPrerequisites,
    exec_root: PathBuf,
    dry_run: bool,
}

impl RuntimeConfig {
    /// Resolves the runtime configuration of a parsed command line.
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        Ok(Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
            platform: args.platform()?,
            exec_root: args.exec_root.clone(),
            dry_run: args.dry_run,
        })
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Platform facts for this run
    pub fn platform(&self) -> &PlatformPrerequisites {
        &self.platform
    }

    /// Execution root
    pub fn exec_root(&self) -> &std::path::Path {
        &self.exec_root
    }

    /// True when actions are printed rather than run
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}
