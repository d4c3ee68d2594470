//! Aggregate state shared by the AzKS and AwsBI modules, schema generation 0.
//!
//! Each module owns one optional section holding its status, the
//! configuration it last applied and what that produced.

use infradoc_core::{Document, MarkerLocation, Rule, SchemaDescriptor, Scope, Validate};
use serde::{Deserialize, Serialize};

use crate::{awsbi, azks, status::Status};

pub const KIND: &str = "state";
pub const VERSION: &str = "v0.0.5";

pub const SCHEMA: SchemaDescriptor = SchemaDescriptor {
    kind: KIND,
    version: VERSION,
    marker: MarkerLocation::TopLevel,
    upgrades: &[],
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub kind: Option<String>,
    pub version: Option<String>,
    pub azks: Option<AzKsState>,
    pub awsbi: Option<AwsBiState>,
    #[serde(skip)]
    pub unused: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzKsState {
    pub status: Option<String>,
    pub config: Option<azks::v0::Config>,
    pub output: Option<azks::v0::Output>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsBiState {
    pub status: Option<String>,
    pub config: Option<awsbi::v0::Config>,
    pub output: Option<awsbi::v0::Output>,
}

impl State {
    pub fn azks_config(&self) -> Option<&azks::v0::Config> {
        self.azks.as_ref().and_then(|s| s.config.as_ref())
    }

    pub fn azks_output(&self) -> Option<&azks::v0::Output> {
        self.azks.as_ref().and_then(|s| s.output.as_ref())
    }

    pub fn awsbi_config(&self) -> Option<&awsbi::v0::Config> {
        self.awsbi.as_ref().and_then(|s| s.config.as_ref())
    }

    pub fn awsbi_output(&self) -> Option<&awsbi::v0::Output> {
        self.awsbi.as_ref().and_then(|s| s.output.as_ref())
    }
}

impl AzKsState {
    pub fn status(&self) -> Option<Status> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }
}

impl AwsBiState {
    pub fn status(&self) -> Option<Status> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }
}

impl Document for State {
    const SCHEMA: &'static SchemaDescriptor = &SCHEMA;
    const ROOT: &'static str = "State";

    /// Module sections are added by the modules themselves.
    fn init(_module_version: &str) -> Self {
        State {
            kind: Some(KIND.to_string()),
            version: Some(VERSION.to_string()),
            azks: None,
            awsbi: None,
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
        v.check("Kind", &self.kind, &[Rule::Required, Rule::OneOf(&[KIND])]);
        v.check(
            "Version",
            &self.version,
            &[Rule::Required, Rule::Version { major: 0 }],
        );
        v.record("AzKS", &self.azks, &[Rule::OmitEmpty]);
        v.record("AwsBI", &self.awsbi, &[Rule::OmitEmpty]);
    }
}

const STATUS_RULES: [Rule; 2] = [Rule::Filled, Rule::OneOf(Status::ALLOWED)];

impl Validate for AzKsState {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check("Status", &self.status, &STATUS_RULES);
        v.embedded("Config", &self.config, &[Rule::OmitEmpty]);
    }
}

impl Validate for AwsBiState {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check("Status", &self.status, &STATUS_RULES);
        v.embedded("Config", &self.config, &[Rule::OmitEmpty]);
    }
}
