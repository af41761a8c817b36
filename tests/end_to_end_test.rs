//! End-to-end tests for the library API over real directories
//!
//! Each test lays out a project in a temporary directory, then scans,
//! resolves and renders it through `ConfigService`.

use std::fs;
use std::path::Path;
use stepinit::options::AutoChooser;
use stepinit::output::{DEPLOY_WORKFLOW, PRIMARY_WORKFLOW};
use stepinit::{ConfigService, InitError, ScanError, StepinitConfig};
use tempfile::TempDir;

const CORDOVA_WIDGET: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<widget id="io.cordova.hellocordova" version="1.0.0" xmlns="http://www.w3.org/ns/widgets" xmlns:cdv="http://cordova.apache.org/ns/1.0">
    <name>HelloCordova</name>
</widget>"#;

const IOS_PBXPROJ: &str = r#"
/* Begin PBXNativeTarget section */
		13B07F861A680F5B00A75B9A /* Sample */ = {
			isa = PBXNativeTarget;
			name = Sample;
			productType = "com.apple.product-type.application";
		};
		00E356ED1AD99517003FC87E /* SampleTests */ = {
			isa = PBXNativeTarget;
			name = SampleTests;
			productType = "com.apple.product-type.bundle.unit-test";
		};
/* End PBXNativeTarget section */
				SDKROOT = iphoneos;
"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(path, content).expect("Failed to write fixture file");
}

fn service() -> ConfigService {
    ConfigService::new(&StepinitConfig {
        max_depth: 10,
        ..StepinitConfig::default()
    })
}

#[test]
fn test_android_project() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "build.gradle", "buildscript {}\n");
    write(dir.path(), "gradlew", "#!/bin/sh\n");
    write(dir.path(), "app/build.gradle", "apply plugin: 'com.android.application'\n");

    let generated = service()
        .generate(dir.path(), &mut AutoChooser::new())
        .unwrap();

    assert_eq!(generated.platform, "android");
    assert_eq!(generated.resolution.config_id, "android-config");
    assert_eq!(
        generated.resolution.substitutions.get("GRADLE_BUILD_FILE_PATH"),
        Some("build.gradle")
    );
    assert!(generated.definition.workflows.contains_key(PRIMARY_WORKFLOW));
    assert!(generated.definition.app.contains_key("GRADLE_TASK"));
}

#[test]
fn test_dependency_directories_are_ignored() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "node_modules/some-lib/android/build.gradle", "");
    write(dir.path(), "node_modules/some-lib/android/gradlew", "");

    let err = service().scan(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        InitError::Scan(ScanError::NoPlatformDetected { .. })
    ));
}

#[test]
fn test_cordova_project_hides_native_platforms() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "config.xml", CORDOVA_WIDGET);
    write(dir.path(), "package.json", r#"{"dependencies": {"cordova-android": "7.0.0"}}"#);
    write(dir.path(), "platforms/android/build.gradle", "");
    write(dir.path(), "platforms/android/gradlew", "");

    let scan = service().scan(dir.path()).unwrap();
    assert_eq!(scan.platform_names(), vec!["cordova"]);

    let generated = service()
        .resolve_config(scan, &mut AutoChooser::new())
        .unwrap();
    assert_eq!(generated.definition.project_type, "cordova");
}

#[test]
fn test_ios_project_with_missing_shared_schemes() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "Sample.xcodeproj/project.pbxproj", IOS_PBXPROJ);

    let scan = service().scan(dir.path()).unwrap();
    assert_eq!(scan.platform_names(), vec!["ios"]);
    let ios = scan.platform("ios").unwrap();
    assert!(!ios.warnings.is_empty());

    let generated = service()
        .resolve_config(scan, &mut AutoChooser::new())
        .unwrap();
    assert_eq!(
        generated.resolution.config_id,
        "ios-test-missing-shared-schemes-config"
    );
    assert_eq!(
        generated.resolution.substitutions.get("BITRISE_SCHEME"),
        Some("Sample")
    );

    let step_ids: Vec<&str> = generated.definition.workflows[PRIMARY_WORKFLOW]
        .steps
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    assert!(step_ids.contains(&"recreate-user-schemes"));
    assert!(step_ids.contains(&"xcode-test"));
    assert!(generated.definition.workflows.contains_key(DEPLOY_WORKFLOW));
}

#[test]
fn test_expo_project_excludes_native_platforms() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{"dependencies": {"expo": "^32.0.0"}, "scripts": {"test": "jest"}}"#,
    );
    write(
        dir.path(),
        "app.json",
        r#"{"expo": {"name": "sample", "ios": {"bundleIdentifier": "com.example.sample"}, "android": {"package": "com.example.sample"}}}"#,
    );
    write(dir.path(), "android/build.gradle", "");
    write(dir.path(), "android/gradlew", "");

    let scan = service().scan(dir.path()).unwrap();
    assert_eq!(scan.platform_names(), vec!["react-native"]);

    let generated = service()
        .resolve_config(scan, &mut AutoChooser::new())
        .unwrap();
    assert_eq!(generated.resolution.config_id, "react-native-expo-config-publish");
    assert_eq!(
        generated.resolution.substitutions.get("BITRISE_SCHEME"),
        Some("sample")
    );
}

#[test]
fn test_scan_result_document() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "build.gradle", "");
    write(dir.path(), "gradlew", "");

    let scan = service().scan(dir.path()).unwrap();
    let yaml = serde_yaml::to_string(&scan).unwrap();
    let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

    assert!(value["options"]["android"].is_mapping());
    assert!(value["configs"]["android"]["android-config"].is_string());
    assert!(value["warnings"]["android"].is_sequence());
}
