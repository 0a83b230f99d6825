//! Default sections for a merged document.
//!
//! Fills in whatever the project left out so the template is deployable on
//! its own: provenance parameters and outputs, one image parameter per box,
//! and a minimal network and compute stack when no resources are declared.

use crate::document::{
    BOXEN, DESCRIPTION, Document, FORMAT_VERSION, OUTPUTS, PARAMETERS, RESOURCES, ensure_object,
    is_canonical_key, is_falsy,
};
use serde_json::{Map, Value, json};
use tracing::debug;

pub const DEPLOY_KEY_PARAMETER: &str = "DeployKey";
pub const PROFILE_PARAMETER: &str = "BoxenProfile";
pub const COMMIT_PARAMETER: &str = "BoxenCommit";
pub const SECURITY_GROUP: &str = "BoxenSecurityGroup";
pub const DEFAULT_INSTANCE_TYPE: &str = "t2.micro";
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Ports opened by the synthesized security group.
const INGRESS_PORTS: &[u16] = &[22, 80, 443];

/// Values the default sections are built from.
#[derive(Debug, Clone)]
pub struct DefaultInputs {
    pub profile: String,
    pub commit_id: String,
    /// Fingerprint for the `DeployKey` parameter; `None` when the document
    /// already declares one.
    pub deploy_key: Option<String>,
    pub project_name: String,
}

/// Parameter holding the image id built for `box_name`.
pub fn image_parameter(box_name: &str) -> String {
    format!("{box_name}Image")
}

/// Resource synthesized to run `box_name`.
pub fn instance_resource(box_name: &str) -> String {
    format!("{box_name}Instance")
}

/// Whether `doc` declares its own `DeployKey` parameter.
pub fn declares_deploy_key(doc: &Document) -> bool {
    doc.get(PARAMETERS)
        .and_then(|parameters| parameters.get(DEPLOY_KEY_PARAMETER))
        .is_some_and(|parameter| !parameter.is_null())
}

/// Fill missing sections of `doc` in place.
pub fn fill_defaults(doc: &mut Document, inputs: &DefaultInputs) {
    if !doc.is_object() {
        *doc = json!({});
    }
    let Some(root) = doc.as_object_mut() else {
        return;
    };

    ensure_object(root, PARAMETERS);
    ensure_object(root, OUTPUTS);
    ensure_object(root, BOXEN);

    add_provenance(root, inputs);
    add_image_parameters(root);

    if !root.contains_key(RESOURCES) {
        let resources = synthesize_resources(root);
        root.insert(RESOURCES.to_string(), Value::Object(resources));
    }
    ensure_object(root, RESOURCES);

    root.retain(|key, _| {
        let keep = is_canonical_key(key);
        if !keep {
            debug!(key = %key, "Dropping unrecognized top-level key");
        }
        keep
    });

    for section in [BOXEN, RESOURCES] {
        ensure_object(root, section).retain(|name, value| {
            let keep = !is_falsy(value);
            if !keep {
                debug!(section, name = %name, "Dropping empty declaration");
            }
            keep
        });
    }

    root.entry(DESCRIPTION.to_string())
        .or_insert_with(|| json!(format!("{} (deployed by boxen)", inputs.project_name)));
    root.entry(FORMAT_VERSION.to_string())
        .or_insert_with(|| json!(TEMPLATE_FORMAT_VERSION));
}

fn add_provenance(root: &mut Map<String, Value>, inputs: &DefaultInputs) {
    let parameters = ensure_object(root, PARAMETERS);
    if let Some(fingerprint) = &inputs.deploy_key {
        parameters
            .entry(DEPLOY_KEY_PARAMETER.to_string())
            .or_insert_with(|| {
                json!({
                    "Type": "String",
                    "Description": "Fingerprint of the key used to deploy boxen",
                    "Default": fingerprint,
                })
            });
    }
    parameters.insert(
        PROFILE_PARAMETER.to_string(),
        json!({
            "Type": "String",
            "Description": "Profile this stack was resolved with",
            "Default": inputs.profile,
        }),
    );
    parameters.insert(
        COMMIT_PARAMETER.to_string(),
        json!({
            "Type": "String",
            "Description": "Commit this stack was built from",
            "Default": inputs.commit_id,
        }),
    );

    let outputs = ensure_object(root, OUTPUTS);
    for name in [PROFILE_PARAMETER, COMMIT_PARAMETER] {
        outputs.insert(name.to_string(), json!({ "Value": { "Ref": name } }));
    }
}

fn add_image_parameters(root: &mut Map<String, Value>) {
    let boxes: Vec<String> = declared_boxes(root);
    let parameters = ensure_object(root, PARAMETERS);
    for name in boxes {
        parameters.entry(image_parameter(&name)).or_insert_with(|| {
            json!({
                "Type": "String",
                "Description": format!("Image built for box {name}"),
            })
        });
    }
}

/// Boxes that survived merging (null and other falsy entries excluded).
fn declared_boxes(root: &Map<String, Value>) -> Vec<String> {
    let Some(Value::Object(boxen)) = root.get(BOXEN) else {
        return Vec::new();
    };
    boxen
        .iter()
        .filter(|(_, declaration)| !is_falsy(declaration))
        .map(|(name, _)| name.clone())
        .collect()
}

/// Security group plus one instance (and public address output) per box.
fn synthesize_resources(root: &mut Map<String, Value>) -> Map<String, Value> {
    let boxes = declared_boxes(root);
    debug!(boxes = boxes.len(), "Synthesizing default resources");

    let ingress: Vec<Value> = INGRESS_PORTS
        .iter()
        .map(|port| {
            json!({
                "IpProtocol": "tcp",
                "FromPort": port.to_string(),
                "ToPort": port.to_string(),
                "CidrIp": "0.0.0.0/0",
            })
        })
        .collect();

    let mut resources = Map::new();
    resources.insert(
        SECURITY_GROUP.to_string(),
        json!({
            "Type": "AWS::EC2::SecurityGroup",
            "Properties": {
                "GroupDescription": "SSH, HTTP and HTTPS access",
                "SecurityGroupIngress": ingress,
            }
        }),
    );

    let outputs = ensure_object(root, OUTPUTS);
    for name in &boxes {
        let instance = instance_resource(name);
        resources.insert(
            instance.clone(),
            json!({
                "Type": "AWS::EC2::Instance",
                "Properties": {
                    "ImageId": { "Ref": image_parameter(name) },
                    "InstanceType": DEFAULT_INSTANCE_TYPE,
                    "SecurityGroups": [{ "Ref": SECURITY_GROUP }],
                }
            }),
        );
        outputs.insert(
            format!("{name}PublicDnsName"),
            json!({ "Value": { "Fn::GetAtt": [instance, "PublicDnsName"] } }),
        );
    }

    resources
}
