//! AzBI (Azure basic infrastructure) documents, schema generation 0.
//!
//! Both documents keep their kind and version in a `meta` object, together
//! with the version of the module that wrote them.

mod config;
mod state;

pub use config::*;
pub use state::*;

use infradoc_core::{Rule, Scope, Validate};
use serde::{Deserialize, Serialize};

pub const CONFIG_KIND: &str = "azbiConfig";
pub const CONFIG_VERSION: &str = "v0.2.1";
pub const STATE_KIND: &str = "azbiState";
pub const STATE_VERSION: &str = "v0.0.2";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub kind: Option<String>,
    pub version: Option<String>,
    pub module_version: Option<String>,
}

impl Meta {
    fn new(kind: &str, version: &str, module_version: &str) -> Self {
        Meta {
            kind: Some(kind.to_string()),
            version: Some(version.to_string()),
            module_version: Some(module_version.to_string()),
        }
    }
}

impl Validate for Meta {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check(
            "Kind",
            &self.kind,
            &[Rule::Required, Rule::OneOf(&[CONFIG_KIND, STATE_KIND])],
        );
        v.check(
            "Version",
            &self.version,
            &[Rule::Required, Rule::Version { major: 0 }],
        );
        v.check("ModuleVersion", &self.module_version, &[Rule::Required]);
    }
}
