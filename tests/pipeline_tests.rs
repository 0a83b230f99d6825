//! End-to-end tests for template resolution.
//!
//! Each test lays out a project in a temp directory, resolves options the
//! way the CLI does, and runs the full pipeline with static collaborators.

use boxen_deploy::config::Settings;
use boxen_deploy::context::ProjectContext;
use boxen_deploy::error::{BoxenError, ErrorKind, Result};
use boxen_deploy::options::{CredentialPolicy, Options, RawOptions, resolve_options};
use boxen_deploy::providers::{
    CommitIdProvider, KeyLookup, NoDecryption, Providers, StaticCommitId, StaticKey,
};
use boxen_deploy::template::{overlay, raw_document, resolve};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn providers() -> Providers {
    Providers {
        commit: Box::new(StaticCommitId("abc1234".to_string())),
        key: Box::new(StaticKey("4f:0b:aa:19".to_string())),
        decryptor: Box::new(NoDecryption),
    }
}

/// Reports a commit id that is not a short hash.
struct DetachedCheckout;

impl CommitIdProvider for DetachedCheckout {
    fn current_commit_id(&self) -> Result<String> {
        Err(BoxenError::InvalidCommitId("HEAD".to_string()))
    }
}

/// A machine without `ssh-keygen` or a public key.
struct NoKey;

impl KeyLookup for NoKey {
    fn deploy_key_fingerprint(&self) -> Result<String> {
        Err(BoxenError::collaborator("ssh-keygen", "not installed"))
    }
}

fn context(root: &Path) -> ProjectContext {
    ProjectContext::new(root, HashMap::new())
}

fn options(ctx: &ProjectContext, raw: RawOptions) -> Options {
    resolve_options(
        &raw,
        ctx,
        &Settings::default(),
        &NoDecryption,
        CredentialPolicy::Optional,
    )
    .expect("Failed to resolve options")
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(path, content).expect("Failed to write fixture");
}

fn resolve_project(root: &Path, raw: RawOptions) -> Result<Value> {
    let ctx = context(root);
    let options = options(&ctx, raw);
    resolve(&ctx, &options, &Settings::default(), &providers())
}

#[test]
fn test_legacy_shorthand_becomes_default_box() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "boxen.yaml", "processes:\n  - server.js\n");

    let doc = resolve_project(temp.path(), RawOptions::new()).unwrap();

    let boxen = doc["Boxen"].as_object().unwrap();
    assert_eq!(boxen.len(), 1);
    assert_eq!(boxen["Default"]["Type"], json!("Boxen::BuildScript"));
    assert_eq!(boxen["Default"]["Properties"]["processes"], json!(["server.js"]));

    let resources = doc["Resources"].as_object().unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources["BoxenSecurityGroup"]["Type"], json!("AWS::EC2::SecurityGroup"));
    assert_eq!(resources["DefaultInstance"]["Type"], json!("AWS::EC2::Instance"));
    // No image built yet, so the reference waits for the orchestration service
    assert_eq!(
        resources["DefaultInstance"]["Properties"]["ImageId"],
        json!({"Ref": "DefaultImage"})
    );
    assert!(doc.get("processes").is_none());
}

#[test]
fn test_profile_overrides_one_property() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "boxen.yaml",
        r#"
Resources:
  WebHead:
    Type: AWS::EC2::Instance
    Properties:
      InstanceType: m1.small
      ImageId: ami-base
      KeyName: deploy
Profiles:
  Production:
    Resources:
      WebHead:
        Properties:
          InstanceType: m1.large
"#,
    );

    let doc = resolve_project(temp.path(), RawOptions::new().with("--profile", "Production"))
        .unwrap();

    let web = &doc["Resources"]["WebHead"];
    assert_eq!(web["Type"], json!("AWS::EC2::Instance"));
    assert_eq!(
        web["Properties"],
        json!({"InstanceType": "m1.large", "ImageId": "ami-base", "KeyName": "deploy"})
    );
    assert!(doc.get("Profiles").is_none());
    assert_eq!(doc["Outputs"]["BoxenProfile"]["Value"], json!("Production"));
}

#[test]
fn test_parameter_sources_layer_in_order() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "boxen.yaml", "Resources:\n  Queue:\n    Type: AWS::SQS::Queue\n    Properties:\n      QueueName:\n        Ref: X\n");
    write(temp.path(), "params/first.json", r#"{"X": "1"}"#);
    write(temp.path(), "params/second.json", r#"{"X": "2"}"#);

    let raw = RawOptions::new()
        .with("--params-file", "params/first.json,params/second.json")
        .with("--define", "X=3");
    let doc = resolve_project(temp.path(), raw).unwrap();

    assert_eq!(doc["Resources"]["Queue"]["Properties"]["QueueName"], json!("3"));
}

#[test]
fn test_later_parameter_file_wins_without_definitions() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "boxen.json", r#"{"Outputs": {"X": {"Value": {"Ref": "X"}}}}"#);
    write(temp.path(), "first.json", r#"{"X": "1"}"#);
    write(temp.path(), "second.json", r#"{"X": "2"}"#);

    let raw = RawOptions::new().with("--params-file", json!(["first.json", "second.json"]));
    let doc = resolve_project(temp.path(), raw).unwrap();
    assert_eq!(doc["Outputs"]["X"]["Value"], json!("2"));
}

#[test]
fn test_directory_config_merges_in_name_order() {
    let temp = TempDir::new().unwrap();
    // Created out of order on purpose
    write(temp.path(), "boxen/Resources/Web.json", r#"{"Type": "AWS::EC2::Instance"}"#);
    write(temp.path(), "boxen/Resources/DB.json", r#"{"Type": "AWS::RDS::DBInstance"}"#);

    let doc = resolve_project(temp.path(), RawOptions::new()).unwrap();

    assert_eq!(
        doc["Resources"],
        json!({
            "DB": {"Type": "AWS::RDS::DBInstance"},
            "Web": {"Type": "AWS::EC2::Instance"}
        })
    );
}

#[test]
fn test_explicit_configs_override_in_given_order() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "z-base.yaml", "Description: base\nMappings:\n  A: {b: {c: 1}}\n");
    write(temp.path(), "a-override.yaml", "Description: override\n");

    let ctx = context(temp.path());
    let options = options(
        &ctx,
        RawOptions::new().with("--config", json!(["z-base.yaml", "a-override.yaml"])),
    );
    let doc = raw_document(&ctx, &options, &Settings::default()).unwrap();
    assert_eq!(doc, json!({"Description": "override", "Mappings": {"A": {"b": {"c": 1}}}}));
}

#[test]
fn test_unknown_reference_survives_resolution() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "boxen.yaml",
        "Resources:\n  Web:\n    Type: AWS::EC2::Instance\n    Properties:\n      Subnet: {Ref: \"Undeclared::Thing\"}\n",
    );

    let doc = resolve_project(temp.path(), RawOptions::new()).unwrap();
    assert_eq!(
        doc["Resources"]["Web"]["Properties"]["Subnet"],
        json!({"Ref": "Undeclared::Thing"})
    );
}

#[test]
fn test_pseudo_parameters_and_lookups() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "boxen.yaml",
        r#"
Mappings:
  Images:
    eu-west-1: {Ubuntu: ami-eu}
Resources:
  Web:
    Type: AWS::EC2::Instance
    Properties:
      ImageId:
        Fn::FindInMap: [Images, {Ref: "AWS::Region"}, Ubuntu]
      Tags:
        - {Key: Stack, Value: {Ref: "AWS::StackName"}}
"#,
    );

    let raw = RawOptions::new()
        .with("--region", "eu-west-1")
        .with("<stack-name>", "shop-staging");
    let doc = resolve_project(temp.path(), raw).unwrap();

    let properties = &doc["Resources"]["Web"]["Properties"];
    assert_eq!(properties["ImageId"], json!("ami-eu"));
    assert_eq!(properties["Tags"][0]["Value"], json!("shop-staging"));
}

#[test]
fn test_boot_script_is_expanded() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "boxen.yaml",
        r#"
Resources:
  Web:
    Type: AWS::EC2::Instance
    Properties:
      UserData:
        Boxen::BootScript:
          Files:
            /etc/app/env: "PORT=80"
          Run: [systemctl restart app]
"#,
    );

    let doc = resolve_project(temp.path(), RawOptions::new()).unwrap();
    let user_data = doc["Resources"]["Web"]["Properties"]["UserData"]
        .as_str()
        .expect("UserData should be encoded");
    // gzip magic, base64 encoded
    assert!(user_data.starts_with("H4sI"));
}

#[test]
fn test_profile_deletes_a_box() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "boxen.yaml",
        r#"
Boxen:
  Web: {processes: [web.js]}
  Worker: {processes: [worker.js]}
Profiles:
  Lite:
    Boxen:
      Worker: null
"#,
    );

    let doc = resolve_project(temp.path(), RawOptions::new().with("--profile", "Lite")).unwrap();
    assert_eq!(
        doc["Boxen"].as_object().unwrap().keys().collect::<Vec<_>>(),
        vec!["Web"]
    );
    assert!(doc["Resources"].get("WorkerInstance").is_none());
    assert!(doc["Parameters"].get("WorkerImage").is_none());
}

#[test]
fn test_default_profile_without_catalog_is_noop() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "boxen.yaml", "Description: shop\nBoxen:\n  Web: {Type: Boxen::Helper}\n");

    let ctx = context(temp.path());
    let options = options(&ctx, RawOptions::new());
    let doc = overlay(&ctx, &options, &Settings::default()).unwrap();
    assert_eq!(doc, json!({"Description": "shop", "Boxen": {"Web": {"Type": "Boxen::Helper"}}}));
}

#[test]
fn test_unknown_profile_aborts() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "boxen.yaml", "Profiles:\n  Production: {}\n");

    let err = resolve_project(temp.path(), RawOptions::new().with("--profile", "Qa")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownProfile);
}

#[test]
fn test_missing_config_aborts() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "README.md", "nothing here");

    let err = resolve_project(temp.path(), RawOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoConfigFound);
}

#[test]
fn test_duplicate_yaml_keys_abort() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "boxen.yaml", "Description: a\nDescription: b\n");

    let err = resolve_project(temp.path(), RawOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParseError);
}

#[test]
fn test_provenance_parameters() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "aws-boxen.json", "{}");

    let doc = resolve_project(temp.path(), RawOptions::new()).unwrap();
    assert_eq!(doc["Parameters"]["BoxenCommit"]["Default"], json!("abc1234"));
    assert_eq!(doc["Parameters"]["DeployKey"]["Default"], json!("4f:0b:aa:19"));
    assert_eq!(doc["Outputs"]["BoxenCommit"]["Value"], json!("abc1234"));
    assert_eq!(doc["AWSTemplateFormatVersion"], json!("2010-09-09"));
}

#[test]
fn test_legacy_profile_keeps_base_box_kind() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "boxen.yaml",
        r#"
port: 80
Boxen:
  Default: {Type: Boxen::Helper}
Profiles:
  Production:
    instanceCount: 3
"#,
    );

    let ctx = context(temp.path());
    let options = options(&ctx, RawOptions::new().with("--profile", "Production"));
    let doc = overlay(&ctx, &options, &Settings::default()).unwrap();
    assert_eq!(
        doc["Boxen"]["Default"],
        json!({"Type": "Boxen::Helper", "Properties": {"port": 80, "instanceCount": 3}})
    );
}

#[test]
fn test_box_added_by_profile_gets_default_kind() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "boxen.yaml",
        "Boxen:\n  Web: {Type: Boxen::Helper}\nProfiles:\n  Full:\n    Boxen:\n      Worker: {queue: jobs}\n",
    );

    let ctx = context(temp.path());
    let options = options(&ctx, RawOptions::new().with("--profile", "Full"));
    let doc = overlay(&ctx, &options, &Settings::default()).unwrap();
    assert_eq!(
        doc["Boxen"]["Worker"],
        json!({"Type": "Boxen::BuildScript", "Properties": {"queue": "jobs"}})
    );
    assert_eq!(doc["Boxen"]["Web"]["Type"], json!("Boxen::Helper"));
}

#[test]
fn test_bad_commit_id_aborts_resolution() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "boxen.yaml", "processes:\n  - server.js\n");

    let ctx = context(temp.path());
    let options = options(&ctx, RawOptions::new());
    let providers = Providers {
        commit: Box::new(DetachedCheckout),
        ..providers()
    };
    let err = resolve(&ctx, &options, &Settings::default(), &providers).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCommitId);
}

#[test]
fn test_declared_deploy_key_skips_key_lookup() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "boxen.yaml",
        "Parameters:\n  DeployKey:\n    Type: String\n    Default: ops-key\n",
    );

    let ctx = context(temp.path());
    let options = options(&ctx, RawOptions::new());
    let providers = Providers {
        key: Box::new(NoKey),
        ..providers()
    };
    let doc = resolve(&ctx, &options, &Settings::default(), &providers).unwrap();
    assert_eq!(doc["Parameters"]["DeployKey"]["Default"], json!("ops-key"));

    write(temp.path(), "boxen.yaml", "Description: no key declared\n");
    let err = resolve(&ctx, &options, &Settings::default(), &providers).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CollaboratorFailed);
}
