//! `process-archive`: post-process and sign an archive.

use super::run_or_print;
use crate::action::Template;
use crate::archive::{ProcessArchiveRequest, post_process_and_sign_archive};
use crate::cli::{Args, Command, RuntimeConfig};
use crate::rule::RuleType;
use anyhow::Result;

pub(super) async fn execute_process_archive(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::ProcessArchive {
        signing,
        label,
        input,
        output,
        frameworks_path,
        no_frameworks,
        ipa_post_processor,
        template,
    } = &args.command
    else {
        unreachable!("execute_process_archive called with non-ProcessArchive command");
    };

    let rule = signing.rule.parse::<RuleType>()?.descriptor();
    let mut request = ProcessArchiveRequest::new(label, rule, input, output);
    request.signed_frameworks = signing.signed_frameworks.iter().cloned().collect();
    request.codesigningtool = signing.codesigningtool.clone();
    request.entitlements = signing.entitlements.clone();
    request.provisioning_profile = signing.provisioning_profile.clone();
    request.codesign_opts = signing.codesign_opts.clone();
    if *no_frameworks {
        request.frameworks_path = None;
    } else if let Some(path) = frameworks_path {
        request.frameworks_path = Some(path.clone());
    }
    request.ipa_post_processor = ipa_post_processor.clone();
    if let Some(template) = template {
        request.process_and_sign_template = Template::File(template.clone());
    }

    let plan = post_process_and_sign_archive(&request, config.platform())?;
    run_or_print(config, &plan, &plan.actions).await?;

    if !config.is_dry_run() {
        config
            .output()
            .success(&format!("Wrote {}", plan.output_archive.display()))?;
    }
    Ok(0)
}
