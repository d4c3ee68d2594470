use infradoc_core::{
    upgrade::{self, Transition},
    Document, DocumentError, MarkerLocation, Rule, SchemaDescriptor, Scope, Validate,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Config, Meta, CONFIG_SCHEMA, STATE_KIND, STATE_VERSION};
use crate::status::Status;

pub const STATE_SCHEMA: SchemaDescriptor = SchemaDescriptor {
    kind: STATE_KIND,
    version: STATE_VERSION,
    marker: MarkerLocation::Meta,
    upgrades: &[Transition {
        from: "v0.0.1",
        to: "v0.0.2",
        step: upgrade_embedded_config,
    }],
};

fn upgrade_embedded_config(tree: &mut Value) -> Result<(), DocumentError> {
    upgrade::run_at(&CONFIG_SCHEMA, tree, "/config")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub meta: Option<Meta>,
    pub status: Option<String>,
    /// The configuration last applied.
    pub config: Option<Config>,
    /// What the last apply produced. Not validated.
    pub output: Option<Output>,
    #[serde(skip)]
    pub unused: Vec<String>,
}

impl State {
    pub fn status(&self) -> Option<Status> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub rg_name: Option<String>,
    pub vnet_name: Option<String>,
    pub vm_groups: Option<Vec<OutputVmGroup>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputVmGroup {
    #[serde(rename = "vm_group_name")]
    pub name: Option<String>,
    pub vms: Option<Vec<OutputVm>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputVm {
    #[serde(rename = "vm_name")]
    pub name: Option<String>,
    pub private_ips: Option<Vec<String>>,
    pub public_ip: Option<String>,
    pub data_disks: Option<Vec<OutputDataDisk>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDataDisk {
    pub size: Option<i64>,
    pub lun: Option<i64>,
}

impl Document for State {
    const SCHEMA: &'static SchemaDescriptor = &STATE_SCHEMA;
    const ROOT: &'static str = "State";

    fn init(module_version: &str) -> Self {
        State {
            meta: Some(Meta::new(STATE_KIND, STATE_VERSION, module_version)),
            status: Some(Status::Initialized.to_string()),
            config: None,
            output: None,
            unused: vec![],
        }
    }

    fn unused(&self) -> &[String] {
        &self.unused
    }

    fn set_unused(&mut self, unused: Vec<String>) {
        self.unused = unused;
    }
}

impl Validate for State {
    fn validate(&self, v: &mut Scope<'_>) {
        v.record("Meta", &self.meta, &[Rule::Required]);
        v.check(
            "Status",
            &self.status,
            &[Rule::Filled, Rule::OneOf(Status::ALLOWED)],
        );
        v.embedded("Config", &self.config, &[Rule::OmitEmpty]);
    }
}
