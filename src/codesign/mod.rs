//! Code-signing support for Apple bundles.
//!
//! This module assembles invocations of the signing wrapper tool, which in
//! turn drives `/usr/bin/codesign`.
//!
//! # Layout
//!
//! - [`path`] - signing targets and their invariants
//! - [`command`] - argument vector and shell command assembly
//! - [`policy`] - rule and environment signing decisions
//!
//! # Identity Resolution
//!
//! | Build | Configured identity | Profile | Result |
//! |-------|---------------------|---------|--------|
//! | device | yes | any | `--identity <id>` |
//! | device | no | yes | `--mobileprovision <profile>` |
//! | device | no | no | `--identity -` |
//! | simulator | any | any | `--identity -` |

pub mod command;
pub mod path;
pub mod policy;

pub use command::{
    ADHOC_IDENTITY, SigningContext, codesign_args, codesign_command_line, codesign_shell_args,
    signing_command_lines,
};
pub use path::PathToSign;
pub use policy::{
    CodesigningRequest, WORK_DIR_VAR, codesigning_command, should_sign_bundles,
    should_sign_simulator_bundles, validate_provisioning_profile,
};
