//! Handing a resolved template to the build and deploy collaborators.

use crate::document::{BOXEN, BOXEN_VERSION, Document, PARAMETERS, box_names, ensure_object};
use crate::error::{BoxenError, Result};
use crate::options::Options;
use crate::providers::{Deployer, ImageBuilder};
use crate::template::image_parameter;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// The template as submitted to the orchestration service, without the
/// boxen-only sections.
pub fn stack_body(doc: &Document) -> Document {
    let mut body = doc.clone();
    if let Some(root) = body.as_object_mut() {
        root.remove(BOXEN);
        root.remove(BOXEN_VERSION);
    }
    body
}

/// Set the default of each box's image parameter to its built image id.
pub fn inject_image_ids(doc: &mut Document, images: &BTreeMap<String, String>) {
    let Some(root) = doc.as_object_mut() else {
        return;
    };
    let parameters = ensure_object(root, PARAMETERS);
    for (name, image) in images {
        let parameter = parameters
            .entry(image_parameter(name))
            .or_insert_with(|| json!({"Type": "String"}));
        match parameter.as_object_mut() {
            Some(parameter) => {
                parameter.insert("Default".to_string(), Value::String(image.clone()));
            }
            None => *parameter = json!({"Type": "String", "Default": image}),
        }
    }
}

/// Build the selected boxen, then deploy the stack with their image ids.
///
/// Nothing is deployed when a build fails. Returns the submitted body.
pub fn publish(
    doc: &Document,
    options: &Options,
    builder: &dyn ImageBuilder,
    deployer: &dyn Deployer,
) -> Result<Document> {
    if options.credentials.is_none() {
        return Err(BoxenError::MissingCredential {
            option: "access-key-id",
            env: "AWS_ACCESS_KEY_ID",
        });
    }

    let declared = box_names(doc);
    let selected = if options.boxen.is_empty() {
        declared.clone()
    } else {
        for name in &options.boxen {
            if !declared.contains(name) {
                return Err(BoxenError::UnknownBox {
                    name: name.clone(),
                    declared,
                });
            }
        }
        options.boxen.clone()
    };

    let mut images = BTreeMap::new();
    for name in &selected {
        let declaration = &doc[BOXEN][name.as_str()];
        info!(name = %name, "Building box");
        let image = builder.build(name, declaration)?;
        info!(name = %name, image = %image, "Built box");
        images.insert(name.clone(), image);
    }

    let mut resolved = doc.clone();
    inject_image_ids(&mut resolved, &images);
    let body = stack_body(&resolved);

    info!(stack = %options.stack_name, "Deploying stack");
    deployer.deploy(&options.stack_name, &body)?;
    Ok(body)
}

/// Images that were built elsewhere, identified on the command line.
#[derive(Debug, Clone, Default)]
pub struct PrebuiltImages {
    images: BTreeMap<String, String>,
}

impl PrebuiltImages {
    pub fn new(images: BTreeMap<String, String>) -> Self {
        Self { images }
    }

    /// Parse `BOX=IMAGE` pairs.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        let mut images = BTreeMap::new();
        for pair in pairs {
            let pair = pair.as_ref();
            match pair.split_once('=') {
                Some((name, image)) if !name.is_empty() && !image.is_empty() => {
                    images.insert(name.to_string(), image.to_string());
                }
                _ => return Err(BoxenError::InvalidParameterDefinition(pair.to_string())),
            }
        }
        Ok(Self { images })
    }

    pub fn images(&self) -> &BTreeMap<String, String> {
        &self.images
    }
}

impl ImageBuilder for PrebuiltImages {
    fn build(&self, name: &str, _declaration: &Value) -> Result<String> {
        self.images.get(name).cloned().ok_or_else(|| {
            BoxenError::collaborator("build", format!("no image given for box {name}"))
        })
    }
}

/// Writes the stack body as pretty JSON to a file, or stdout.
#[derive(Debug, Clone, Default)]
pub struct FileDeployer {
    output: Option<PathBuf>,
}

impl FileDeployer {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }
}

impl Deployer for FileDeployer {
    fn deploy(&self, stack_name: &str, body: &Value) -> Result<()> {
        let rendered = serde_json::to_string_pretty(body)
            .map_err(|e| BoxenError::collaborator("deploy", e.to_string()))?;
        match &self.output {
            Some(path) => {
                std::fs::write(path, format!("{rendered}\n")).map_err(|e| BoxenError::io(path, e))?;
                info!(stack = %stack_name, path = %path.display(), "Wrote stack body");
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{rendered}").map_err(|e| BoxenError::io("<stdout>", e))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::options::Credentials;
    use serde_json::Map;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingDeployer {
        deployed: RefCell<Vec<(String, Value)>>,
    }

    impl Deployer for RecordingDeployer {
        fn deploy(&self, stack_name: &str, body: &Value) -> Result<()> {
            self.deployed
                .borrow_mut()
                .push((stack_name.to_string(), body.clone()));
            Ok(())
        }
    }

    fn options(boxen: &[&str]) -> Options {
        Options {
            region: "us-east-1".to_string(),
            profile: "default".to_string(),
            stack_name: "shop".to_string(),
            config_paths: Vec::new(),
            boxen: boxen.iter().map(|b| b.to_string()).collect(),
            parameters: Map::new(),
            credentials: Some(Credentials {
                access_key_id: "AKIA".to_string(),
                secret_access_key: "secret".to_string(),
            }),
        }
    }

    fn template() -> Document {
        json!({
            "AWSBoxenVersion": ">=0.3",
            "Boxen": {"Web": {"Type": "Boxen::BuildScript"}, "Worker": {"Type": "Boxen::BuildScript"}},
            "Parameters": {"WebImage": {"Type": "String"}},
            "Resources": {"WebInstance": {"Type": "AWS::EC2::Instance"}}
        })
    }

    fn images() -> PrebuiltImages {
        PrebuiltImages::from_pairs(&["Web=ami-web", "Worker=ami-worker"]).unwrap()
    }

    #[test]
    fn test_stack_body_drops_boxen_sections() {
        let body = stack_body(&template());
        assert!(body.get("Boxen").is_none());
        assert!(body.get("AWSBoxenVersion").is_none());
        assert!(body.get("Resources").is_some());
    }

    #[test]
    fn test_publish_builds_all_and_injects_ids() {
        let deployer = RecordingDeployer::default();
        let body = publish(&template(), &options(&[]), &images(), &deployer).unwrap();

        assert_eq!(body["Parameters"]["WebImage"], json!({"Type": "String", "Default": "ami-web"}));
        assert_eq!(body["Parameters"]["WorkerImage"]["Default"], json!("ami-worker"));
        let deployed = deployer.deployed.borrow();
        assert_eq!(deployed.len(), 1);
        assert_eq!(deployed[0].0, "shop");
        assert_eq!(deployed[0].1, body);
    }

    #[test]
    fn test_publish_selected_box_only() {
        let deployer = RecordingDeployer::default();
        let body = publish(&template(), &options(&["Web"]), &images(), &deployer).unwrap();
        assert!(body["Parameters"].get("WorkerImage").is_none());
    }

    #[test]
    fn test_unknown_box_fails_before_building() {
        let deployer = RecordingDeployer::default();
        let err = publish(&template(), &options(&["Db"]), &images(), &deployer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownBox);
        assert!(err.to_string().contains("Web, Worker"));
        assert!(deployer.deployed.borrow().is_empty());
    }

    #[test]
    fn test_failed_build_deploys_nothing() {
        let deployer = RecordingDeployer::default();
        let partial = PrebuiltImages::from_pairs(&["Web=ami-web"]).unwrap();
        let err = publish(&template(), &options(&[]), &partial, &deployer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CollaboratorFailed);
        assert!(deployer.deployed.borrow().is_empty());
    }

    #[test]
    fn test_publish_requires_credentials() {
        let mut options = options(&[]);
        options.credentials = None;
        let deployer = RecordingDeployer::default();
        let err = publish(&template(), &options, &images(), &deployer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingCredential);
    }

    #[test]
    fn test_image_pairs() {
        assert_eq!(images().images().len(), 2);
        let err = PrebuiltImages::from_pairs(&["Web"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameterDefinition);
    }

    #[test]
    fn test_file_deployer_writes_json() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("stack.json");
        FileDeployer::new(Some(path.clone()))
            .deploy("shop", &json!({"Resources": {}}))
            .unwrap();
        let written: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, json!({"Resources": {}}));
    }
}
