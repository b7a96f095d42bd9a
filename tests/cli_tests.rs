#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn bin() -> Command {
        Command::cargo_bin("kodegen_bundler_apple").unwrap()
    }

    #[test]
    fn test_sign_command_with_profile() {
        bin()
            .args([
                "--device",
                "--quiet",
                "sign-command",
                "--rule",
                "ios_application",
                "--bundle-path",
                "Payload/App.app",
                "--provisioning-profile",
                "App.mobileprovision",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("--mobileprovision \"App.mobileprovision\""))
            .stdout(predicate::str::contains("--target_to_sign \"$WORK_DIR/Payload/App.app\""));
    }

    #[test]
    fn test_sign_command_missing_profile_fails() {
        bin()
            .args([
                "--device",
                "sign-command",
                "--rule",
                "ios_application",
                "--bundle-path",
                "Payload/App.app",
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("provisioning_profile attribute must be set"));
    }

    #[test]
    fn test_sign_command_static_framework_signs_nothing() {
        bin()
            .args([
                "--simulator",
                "sign-command",
                "--rule",
                "ios_static_framework",
                "--bundle-path",
                "Static.framework",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to sign"));
    }

    #[test]
    fn test_process_archive_dry_run_prints_plan() {
        bin()
            .args([
                "--simulator",
                "--compilation-mode",
                "opt",
                "--dry-run",
                "process-archive",
                "--label",
                "App",
                "--rule",
                "ios_application",
                "--input",
                "out/App.zip",
                "--output",
                "out/App.ipa",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"should_compress\": true"))
            .stdout(predicate::str::contains("\"ProcessAndSign\""));
    }

    #[test]
    fn test_process_archive_without_frameworks_is_a_copy() {
        bin()
            .args([
                "--simulator",
                "--compilation-mode",
                "dbg",
                "--define",
                "apple.codesign_simulator_bundles=0",
                "--dry-run",
                "process-archive",
                "--label",
                "App",
                "--rule",
                "ios_application",
                "--input",
                "out/App.zip",
                "--output",
                "out/App.ipa",
                "--no-frameworks",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"has_work\": false"))
            .stdout(predicate::str::contains("\"kind\": \"copy\""));
    }

    #[test]
    fn test_process_archive_frameworks_flags_conflict() {
        bin()
            .args([
                "--dry-run",
                "process-archive",
                "--label",
                "App",
                "--rule",
                "ios_application",
                "--input",
                "out/App.zip",
                "--output",
                "out/App.ipa",
                "--frameworks-path",
                "Payload/App.app/Frameworks",
                "--no-frameworks",
            ])
            .assert()
            .failure();
    }

    #[cfg(unix)]
    #[test]
    fn test_process_archive_template_resolved_against_exec_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("t.sh"), "#!/bin/bash\necho done > {{output_path}}\n").unwrap();

        bin()
            .current_dir(tmp.path())
            .args([
                "--exec-root",
                "ws",
                "--device",
                "--compilation-mode",
                "opt",
                "--quiet",
                "process-archive",
                "--label",
                "Tool",
                "--rule",
                "macos_command_line_application",
                "--input",
                "in.zip",
                "--output",
                "out/Tool.zip",
                "--template",
                "t.sh",
            ])
            .assert()
            .success();

        let written = std::fs::read_to_string(root.join("out/Tool.zip")).unwrap();
        assert_eq!(written, "done\n");
    }

    #[test]
    fn test_dsym_dry_run_prints_lipo() {
        bin()
            .args([
                "--dry-run",
                "dsym",
                "--bundle-name",
                "App",
                "--bundle-extension",
                ".app",
                "--binary",
                "arm64=bin/App_arm64",
                "--binary",
                "x86_64=bin/App_x86_64",
                "--out-dir",
                "out",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("LipoDebugSymbols"))
            .stdout(predicate::str::contains("out/App.app.dSYM/Contents/Info.plist"));
    }

    #[test]
    fn test_config_file_and_invalid_define() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("build.toml");
        std::fs::write(&config, "environment = \"simulator\"\n").unwrap();

        bin()
            .arg("--config")
            .arg(&config)
            .args([
                "--define",
                "apple.codesign_simulator_bundles=sometimes",
                "sign-command",
                "--rule",
                "ios_application",
                "--bundle-path",
                "App.app",
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Valid values for --define=apple.codesign_simulator_bundles"));
    }

    #[test]
    fn test_unknown_rule_rejected() {
        bin()
            .args(["sign-command", "--rule", "android_binary", "--bundle-path", "x"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("android_binary"));
    }
}
