#[cfg(test)]
mod tests {
    use kodegen_bundler_apple::action::{Action, LocalExecutor};
    use kodegen_bundler_apple::dsym::{BundleVersion, DebugSymbolsRequest, DsymOutput, debug_symbols};
    use kodegen_bundler_apple::{
        CompilationMode, Defines, Environment, PlatformPrerequisites, ProcessArchiveRequest,
        RuleType, post_process_and_sign_archive,
    };
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn device_with_identity() -> PlatformPrerequisites {
        PlatformPrerequisites {
            signing_identity: Some("Apple Development: Jane Doe".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_ios_device_archive_signs_frameworks_then_bundle() {
        let mut request = ProcessArchiveRequest::new(
            "App",
            RuleType::IosApplication.descriptor(),
            "bazel-out/App.unprocessed.ipa",
            "bazel-out/App.ipa",
        );
        request.provisioning_profile = Some(PathBuf::from("App.mobileprovision"));
        request.entitlements = Some(PathBuf::from("App.entitlements"));
        request.signed_frameworks = ["Shared.framework".to_string()].into();

        let plan = post_process_and_sign_archive(&request, &device_with_identity()).unwrap();
        let lines: Vec<&str> = plan.signing_command_lines.lines().collect();
        assert_eq!(lines.len(), 2);

        assert!(lines[0].contains("--directory_to_sign \"$WORK_DIR/Payload/App.app/Frameworks/\""));
        assert!(lines[0].contains(
            "--signed_path \"$WORK_DIR/Payload/App.app/Frameworks/Shared.framework\""
        ));
        assert!(!lines[0].contains("--entitlements"));

        assert!(lines[1].contains("--identity "));
        assert!(lines[1].contains("Apple Development: Jane Doe"));
        assert!(lines[1].contains("--entitlements \"App.entitlements\""));
        assert!(lines[1].contains("--target_to_sign \"$WORK_DIR/Payload/App.app\""));
        assert!(!lines[1].contains("--disable_timestamp"));

        assert!(plan.has_work);
        assert_eq!(plan.actions.len(), 2);
        let Action::Run(run) = &plan.actions[1] else {
            panic!("expected the processing script to run");
        };
        assert!(run.execution_requirements.requires_darwin);
        assert!(run.inputs.contains(&PathBuf::from("App.mobileprovision")));
    }

    #[test]
    fn test_simulator_signing_disabled_by_define() {
        let platform = PlatformPrerequisites {
            environment: Environment::Simulator,
            defines: [(Defines::CODESIGN_SIMULATOR_BUNDLES, "no")].into_iter().collect(),
            ..Default::default()
        };
        let request = ProcessArchiveRequest::new(
            "App",
            RuleType::IosApplication.descriptor(),
            "out/App.zip",
            "out/App.ipa",
        );
        let plan = post_process_and_sign_archive(&request, &platform).unwrap();

        // Frameworks are still signed, the bundle is not.
        assert_eq!(plan.signing_command_lines.lines().count(), 1);
        assert!(plan.signing_command_lines.contains("--identity -"));
        assert!(plan.signing_command_lines.contains("--disable_timestamp"));
        assert!(!plan.signing_command_lines.contains("--target_to_sign"));
    }

    #[test]
    fn test_invalid_define_value_is_reported() {
        let platform = PlatformPrerequisites {
            environment: Environment::Simulator,
            defines: [(Defines::CODESIGN_SIMULATOR_BUNDLES, "maybe")].into_iter().collect(),
            ..Default::default()
        };
        let request = ProcessArchiveRequest::new(
            "App",
            RuleType::IosApplication.descriptor(),
            "out/App.zip",
            "out/App.ipa",
        );
        let err = post_process_and_sign_archive(&request, &platform).unwrap_err();
        assert!(err.to_string().contains("1|0|true|false|yes|no"));
        assert!(err.to_string().contains("maybe"));
    }

    #[tokio::test]
    async fn test_unsigned_macos_archive_is_copied() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("in")).unwrap();
        std::fs::write(tmp.path().join("in/Tool.zip"), b"PK\x05\x06").unwrap();

        let request = ProcessArchiveRequest::new(
            "Tool",
            RuleType::MacosCommandLineApplication.descriptor(),
            "in/Tool.zip",
            "out/Tool.zip",
        );
        let platform = PlatformPrerequisites {
            platform_type: kodegen_bundler_apple::PlatformType::Macos,
            compilation_mode: CompilationMode::Dbg,
            ..Default::default()
        };
        let plan = post_process_and_sign_archive(&request, &platform).unwrap();
        assert!(!plan.has_work);

        LocalExecutor::new(tmp.path())
            .execute_all(&plan.actions)
            .await
            .unwrap();
        assert_eq!(
            std::fs::read(tmp.path().join("out/Tool.zip")).unwrap(),
            b"PK\x05\x06"
        );
    }

    #[tokio::test]
    async fn test_dsym_layout_and_info_plist() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("bin")).unwrap();
        std::fs::write(tmp.path().join("bin/App_arm64"), b"arm64").unwrap();
        std::fs::write(tmp.path().join("bin/App_x86_64"), b"x86_64").unwrap();

        let mut request = DebugSymbolsRequest::new("App", ".app", "out");
        request.dsym_binaries = BTreeMap::from([
            ("arm64".to_string(), PathBuf::from("bin/App_arm64")),
            ("x86_64".to_string(), PathBuf::from("bin/App_x86_64")),
        ]);
        request.version = Some(BundleVersion {
            build_version: Some("12".to_string()),
            short_version_string: None,
        });
        let platform = PlatformPrerequisites {
            apple_generate_dsym: true,
            ..Default::default()
        };
        let outputs = debug_symbols(&request, &platform).unwrap();
        assert!(matches!(outputs.dsym_bundle, Some(DsymOutput::Files { .. })));

        // lipo needs a Darwin host; the copies and the plist do not.
        let portable: Vec<Action> = outputs
            .actions
            .iter()
            .filter(|action| !matches!(action, Action::Run(_)))
            .cloned()
            .collect();
        LocalExecutor::new(tmp.path())
            .execute_all(&portable)
            .await
            .unwrap();

        let dwarf = tmp.path().join("out/App.app.dSYM/Contents/Resources/DWARF");
        assert_eq!(std::fs::read(dwarf.join("App_arm64")).unwrap(), b"arm64");
        assert_eq!(std::fs::read(dwarf.join("App_x86_64")).unwrap(), b"x86_64");
        assert!(!std::fs::symlink_metadata(dwarf.join("App_arm64")).unwrap().file_type().is_symlink());

        let plist_path = tmp.path().join("out/App.app.dSYM/Contents/Info.plist");
        let info: plist::Dictionary = plist::from_file(&plist_path).unwrap();
        assert_eq!(
            info.get("CFBundleIdentifier").and_then(|v| v.as_string()),
            Some("com.apple.xcode.dsym.App.app")
        );
        assert_eq!(info.get("CFBundleVersion").and_then(|v| v.as_string()), Some("12"));
        assert_eq!(
            info.get("CFBundleShortVersionString").and_then(|v| v.as_string()),
            Some("1.0")
        );
        assert_eq!(info.get("CFBundlePackageType").and_then(|v| v.as_string()), Some("dSYM"));
    }
}
