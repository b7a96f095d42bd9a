//! `dsym`: assemble a dSYM bundle and collect linkmaps.

use super::run_or_print;
use crate::action::Template;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::dsym::{BundleVersion, DebugSymbolsRequest, debug_symbols};
use anyhow::Result;

pub(super) async fn execute_dsym(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let Command::Dsym {
        bundle_name,
        bundle_extension,
        executable_name,
        binaries,
        linkmaps,
        out_dir,
        version_file,
        info_plist_template,
    } = &args.command
    else {
        unreachable!("execute_dsym called with non-Dsym command");
    };

    let mut request = DebugSymbolsRequest::new(bundle_name, bundle_extension, out_dir);
    if let Some(executable_name) = executable_name {
        request.executable_name = executable_name.clone();
    }
    request.dsym_binaries = binaries.iter().cloned().collect();
    request.linkmaps = linkmaps.iter().cloned().collect();
    if let Some(path) = version_file {
        request.version = Some(BundleVersion::from_file(&config.exec_root().join(path))?);
    }
    if let Some(template) = info_plist_template {
        request.dsym_info_plist_template = Template::File(template.clone());
    }

    // A flag on the command line implies the switches of the build config.
    let mut platform = config.platform().clone();
    platform.apple_generate_dsym |= !request.dsym_binaries.is_empty();
    platform.objc_generate_linkmap |= !request.linkmaps.is_empty();

    let outputs = debug_symbols(&request, &platform)?;
    run_or_print(config, &outputs, &outputs.actions).await?;

    if !config.is_dry_run() {
        match &outputs.dsym_bundle {
            Some(bundle) => config
                .output()
                .success(&format!("Assembled {}", bundle.bundle_dir().display()))?,
            None => config.output().info("No debug binaries given, no dSYM bundle")?,
        }
        for linkmap in &outputs.linkmaps {
            config.output().indent(&linkmap.display().to_string())?;
        }
    }
    Ok(0)
}
