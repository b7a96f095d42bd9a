//! `sign-command`: print the signing command lines for a bundle.

use crate::cli::args::SigningArgs;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::codesign::{
    CodesigningRequest, SigningContext, codesigning_command, validate_provisioning_profile,
};
use crate::rule::RuleType;
use anyhow::Result;
use std::collections::BTreeSet;

pub(super) fn execute_sign_command(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::SignCommand {
        signing,
        bundle_path,
        frameworks_path,
    } = &args.command
    else {
        unreachable!("execute_sign_command called with non-SignCommand command");
    };
    let SigningArgs {
        rule,
        entitlements,
        provisioning_profile,
        signed_frameworks,
        codesigningtool,
        codesign_opts,
    } = signing;

    let platform = config.platform();
    let rule = rule.parse::<RuleType>()?.descriptor();
    validate_provisioning_profile(platform, &rule, provisioning_profile.as_deref())?;

    let signed_frameworks: BTreeSet<String> = signed_frameworks.iter().cloned().collect();
    let command = codesigning_command(&CodesigningRequest {
        codesigningtool,
        context: SigningContext {
            entitlements: entitlements.as_deref(),
            provisioning_profile: provisioning_profile.as_deref(),
            codesign_opts,
            ..SigningContext::new(platform)
        },
        rule: &rule,
        bundle_path,
        frameworks_path: frameworks_path.as_deref(),
        signed_frameworks: &signed_frameworks,
    })?;

    if command.is_empty() {
        config
            .output()
            .info(&format!("Nothing to sign for {} on this platform", rule.rule_type))?;
    } else {
        config.output().result(&command)?;
    }
    Ok(0)
}
