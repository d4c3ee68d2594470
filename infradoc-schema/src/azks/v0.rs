//! AzKS (Azure Kubernetes service) configuration, schema generation 0.

use infradoc_core::{Document, MarkerLocation, Rule, SchemaDescriptor, Scope, Validate};
use serde::{Deserialize, Serialize};

pub const KIND: &str = "azks";
pub const VERSION: &str = "v0.0.3";

pub const SCHEMA: SchemaDescriptor = SchemaDescriptor {
    kind: KIND,
    version: VERSION,
    marker: MarkerLocation::TopLevel,
    upgrades: &[],
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub kind: Option<String>,
    pub version: Option<String>,
    pub params: Option<Params>,
    #[serde(skip)]
    pub unused: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub name: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "rsa_pub_path")]
    pub rsa_public_key_path: Option<String>,
    pub rg_name: Option<String>,
    pub vnet_name: Option<String>,
    pub subnet_name: Option<String>,
    pub kubernetes_version: Option<String>,
    pub enable_node_public_ip: Option<bool>,
    pub enable_rbac: Option<bool>,
    pub default_node_pool: Option<DefaultNodePool>,
    pub auto_scaler_profile: Option<AutoScalerProfile>,
    pub azure_ad: Option<AzureAd>,
    pub identity_type: Option<String>,
    pub admin_username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultNodePool {
    pub size: Option<i64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub vm_size: Option<String>,
    pub disk_gb_size: Option<i64>,
    pub auto_scaling: Option<bool>,
    #[serde(rename = "type")]
    pub pool_type: Option<String>,
}

/// Cluster autoscaler settings. Durations and thresholds are kept as the
/// strings the provider expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoScalerProfile {
    pub balance_similar_node_groups: Option<bool>,
    pub max_graceful_termination_sec: Option<String>,
    pub scale_down_delay_after_add: Option<String>,
    pub scale_down_delay_after_delete: Option<String>,
    pub scale_down_delay_after_failure: Option<String>,
    pub scan_interval: Option<String>,
    pub scale_down_unneeded: Option<String>,
    pub scale_down_unready: Option<String>,
    pub scale_down_utilization_threshold: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureAd {
    pub managed: Option<bool>,
    pub tenant_id: Option<String>,
    pub admin_group_object_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub kubeconfig: Option<String>,
}

fn text(s: &str) -> Option<String> {
    Some(s.to_string())
}

impl Document for Config {
    const SCHEMA: &'static SchemaDescriptor = &SCHEMA;
    const ROOT: &'static str = "Config";

    fn init(_module_version: &str) -> Self {
        Config {
            kind: text(KIND),
            version: text(VERSION),
            params: Some(Params {
                name: text("epiphany"),
                location: text("northeurope"),
                rsa_public_key_path: text("/shared/vms_rsa.pub"),
                rg_name: text("epiphany-rg"),
                vnet_name: text("epiphany-vnet"),
                subnet_name: text("azks"),
                kubernetes_version: text("1.18.14"),
                enable_node_public_ip: Some(false),
                enable_rbac: Some(false),
                default_node_pool: Some(DefaultNodePool {
                    size: Some(2),
                    min: Some(2),
                    max: Some(5),
                    vm_size: text("Standard_DS2_v2"),
                    disk_gb_size: Some(36),
                    auto_scaling: Some(true),
                    pool_type: text("VirtualMachineScaleSets"),
                }),
                auto_scaler_profile: Some(AutoScalerProfile {
                    balance_similar_node_groups: Some(false),
                    max_graceful_termination_sec: text("600"),
                    scale_down_delay_after_add: text("10m"),
                    scale_down_delay_after_delete: text("10s"),
                    scale_down_delay_after_failure: text("10m"),
                    scan_interval: text("10s"),
                    scale_down_unneeded: text("10m"),
                    scale_down_unready: text("10m"),
                    scale_down_utilization_threshold: text("0.5"),
                }),
                azure_ad: None,
                identity_type: text("SystemAssigned"),
                admin_username: text("operations"),
            }),
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

impl Validate for Config {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check("Kind", &self.kind, &[Rule::Required, Rule::OneOf(&[KIND])]);
        v.check(
            "Version",
            &self.version,
            &[Rule::Required, Rule::Version { major: 0 }],
        );
        v.record("Params", &self.params, &[Rule::Required]);
    }
}

impl Validate for Params {
    fn validate(&self, v: &mut Scope<'_>) {
        let text = [Rule::Required, Rule::Min(1)];
        v.check("Name", &self.name, &text);
        v.check("Location", &self.location, &text);
        v.check("RsaPublicKeyPath", &self.rsa_public_key_path, &text);
        v.check("RgName", &self.rg_name, &text);
        v.check("VnetName", &self.vnet_name, &text);
        v.check("SubnetName", &self.subnet_name, &text);
        v.check("KubernetesVersion", &self.kubernetes_version, &text);
        v.check(
            "EnableNodePublicIp",
            &self.enable_node_public_ip,
            &[Rule::Required],
        );
        v.check("EnableRbac", &self.enable_rbac, &[Rule::Required]);
        v.record(
            "DefaultNodePool",
            &self.default_node_pool,
            &[Rule::Required],
        );
        v.record(
            "AutoScalerProfile",
            &self.auto_scaler_profile,
            &[Rule::Required],
        );
        v.record("AzureAd", &self.azure_ad, &[Rule::OmitEmpty]);
        v.check("IdentityType", &self.identity_type, &text);
        v.check("AdminUsername", &self.admin_username, &text);
    }
}

impl Validate for DefaultNodePool {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check(
            "Size",
            &self.size,
            &[
                Rule::Required,
                Rule::Min(0),
                Rule::GteField(self.min),
                Rule::LteField(self.max),
            ],
        );
        v.check("Min", &self.min, &[Rule::Required, Rule::Min(0)]);
        v.check(
            "Max",
            &self.max,
            &[Rule::Required, Rule::Min(0), Rule::GteField(self.min)],
        );
        v.check("VmSize", &self.vm_size, &[Rule::Required, Rule::Min(1)]);
        v.check(
            "DiskGbSize",
            &self.disk_gb_size,
            &[Rule::Required, Rule::Min(1)],
        );
        v.check("AutoScaling", &self.auto_scaling, &[Rule::Required]);
        v.check("Type", &self.pool_type, &[Rule::Required, Rule::Min(1)]);
    }
}

impl Validate for AutoScalerProfile {
    fn validate(&self, v: &mut Scope<'_>) {
        let text = [Rule::Required, Rule::Min(1)];
        v.check(
            "BalanceSimilarNodeGroups",
            &self.balance_similar_node_groups,
            &[Rule::Required],
        );
        v.check(
            "MaxGracefulTerminationSec",
            &self.max_graceful_termination_sec,
            &text,
        );
        v.check(
            "ScaleDownDelayAfterAdd",
            &self.scale_down_delay_after_add,
            &text,
        );
        v.check(
            "ScaleDownDelayAfterDelete",
            &self.scale_down_delay_after_delete,
            &text,
        );
        v.check(
            "ScaleDownDelayAfterFailure",
            &self.scale_down_delay_after_failure,
            &text,
        );
        v.check("ScanInterval", &self.scan_interval, &text);
        v.check("ScaleDownUnneeded", &self.scale_down_unneeded, &text);
        v.check("ScaleDownUnready", &self.scale_down_unready, &text);
        v.check(
            "ScaleDownUtilizationThreshold",
            &self.scale_down_utilization_threshold,
            &text,
        );
    }
}

impl Validate for AzureAd {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check("Managed", &self.managed, &[Rule::Required]);
        v.check("TenantId", &self.tenant_id, &[Rule::Required, Rule::Min(1)]);
        v.items(
            "AdminGroupObjectIds",
            &self.admin_group_object_ids,
            &[Rule::Required, Rule::Min(1)],
            &[Rule::Required, Rule::Min(1)],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infradoc_core::DocumentError;

    fn pool_violations(size: Option<i64>, min: Option<i64>, max: Option<i64>) -> Vec<(String, String)> {
        let mut config = Config::init("");
        let pool = config
            .params
            .as_mut()
            .unwrap()
            .default_node_pool
            .as_mut()
            .unwrap();
        pool.size = size;
        pool.min = min;
        pool.max = max;
        match config.check() {
            Ok(()) => vec![],
            Err(e) => e
                .violations()
                .unwrap()
                .iter()
                .map(|v| {
                    (
                        v.namespace
                            .trim_start_matches("Config.Params.DefaultNodePool.")
                            .to_string(),
                        v.tag.clone(),
                    )
                })
                .collect(),
        }
    }

    fn pair(field: &str, tag: &str) -> (String, String) {
        (field.to_string(), tag.to_string())
    }

    #[test]
    fn test_init_is_valid() {
        Config::init("").check().unwrap();
    }

    #[test]
    fn test_node_pool_bounds() {
        assert_eq!(pool_violations(Some(2), Some(2), Some(5)), vec![]);
        assert_eq!(
            pool_violations(Some(4), Some(2), Some(3)),
            vec![pair("Size", "ltefield")]
        );
        assert_eq!(
            pool_violations(Some(2), Some(3), Some(2)),
            vec![pair("Size", "gtefield"), pair("Max", "gtefield")]
        );
        assert_eq!(
            pool_violations(Some(2), None, Some(3)),
            vec![
                pair("Size", "gtefield"),
                pair("Min", "required"),
                pair("Max", "gtefield"),
            ]
        );
        assert_eq!(
            pool_violations(Some(2), Some(1), None),
            vec![pair("Size", "ltefield"), pair("Max", "required")]
        );
        assert_eq!(
            pool_violations(Some(-1), Some(-1), Some(-1)),
            vec![pair("Size", "min"), pair("Min", "min"), pair("Max", "min")]
        );
    }

    #[test]
    fn test_empty_object() {
        let err = Config::unmarshal(b"{}").unwrap_err();
        let tags: Vec<_> = err
            .violations()
            .unwrap()
            .iter()
            .map(|v| format!("{} {}", v.namespace, v.tag))
            .collect();
        assert_eq!(
            tags,
            vec![
                "Config.Kind required",
                "Config.Version required",
                "Config.Params required"
            ]
        );
    }

    #[test]
    fn test_azure_ad() {
        let mut config = Config::init("");
        config.params.as_mut().unwrap().azure_ad = Some(AzureAd {
            managed: Some(true),
            tenant_id: Some("".to_string()),
            admin_group_object_ids: Some(vec!["group".to_string(), "".to_string()]),
        });
        let err = config.check().unwrap_err();
        let tags: Vec<_> = err
            .violations()
            .unwrap()
            .iter()
            .map(|v| format!("{} {}", v.namespace, v.tag))
            .collect();
        assert_eq!(
            tags,
            vec![
                "Config.Params.AzureAd.TenantId min",
                "Config.Params.AzureAd.AdminGroupObjectIds[1] required",
            ]
        );
    }

    #[test]
    fn test_wrong_kind_and_version() {
        let mut config = Config::init("");
        config.kind = Some("azbi".to_string());
        config.version = Some("0.0.3".to_string());
        match config.marshal() {
            Err(DocumentError::ValidationFailed(found)) => {
                let tags: Vec<_> = found.iter().map(|v| v.tag.as_str()).collect();
                assert_eq!(tags, vec!["eq=azks", "version"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_print_layout() {
        let printed = String::from_utf8(Config::init("").print().unwrap()).unwrap();
        assert!(printed.contains(
            "\t\t\"default_node_pool\": {\n\t\t\t\"size\": 2,\n\t\t\t\"min\": 2,\n\t\t\t\"max\": 5,"
        ));
        assert!(printed.contains("\t\t\"azure_ad\": null,\n\t\t\"identity_type\": \"SystemAssigned\","));
        assert!(!printed.ends_with('\n'));
    }
}
