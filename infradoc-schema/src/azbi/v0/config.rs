use infradoc_core::{
    upgrade::{self, Transition},
    validation::{ReferencePolicy, ReferenceRule},
    Document, DocumentError, MarkerLocation, Rule, SchemaDescriptor, Scope, Validate,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Meta, CONFIG_KIND, CONFIG_VERSION};

pub const CONFIG_SCHEMA: SchemaDescriptor = SchemaDescriptor {
    kind: CONFIG_KIND,
    version: CONFIG_VERSION,
    marker: MarkerLocation::Meta,
    upgrades: &[Transition {
        from: "v0.2.0",
        to: "v0.2.1",
        step: add_admin_username,
    }],
};

/// v0.2.1 made the VM admin user configurable.
fn add_admin_username(tree: &mut Value) -> Result<(), DocumentError> {
    upgrade::set(tree, &["params", "admin_username"], Value::from("operations"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub meta: Option<Meta>,
    pub params: Option<Params>,
    #[serde(skip)]
    pub unused: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub name: Option<String>,
    pub location: Option<String>,
    pub address_space: Option<Vec<String>>,
    pub subnets: Option<Vec<Subnet>>,
    pub vm_groups: Option<Vec<VmGroup>>,
    pub admin_username: Option<String>,
    #[serde(rename = "rsa_pub_path")]
    pub rsa_public_key_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub name: Option<String>,
    pub address_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmGroup {
    pub name: Option<String>,
    pub vm_count: Option<i64>,
    pub vm_size: Option<String>,
    pub use_public_ip: Option<bool>,
    pub subnet_names: Option<Vec<String>>,
    pub vm_image: Option<VmImage>,
    pub data_disks: Option<Vec<DataDisk>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmImage {
    pub publisher: Option<String>,
    pub offer: Option<String>,
    pub sku: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDisk {
    #[serde(rename = "disk_size_gb")]
    pub gb_size: Option<i64>,
    pub storage_type: Option<String>,
}

pub const STORAGE_TYPES: &[&str] = &[
    "Standard_LRS",
    "Premium_LRS",
    "StandardSSD_LRS",
    "UltraSSD_LRS",
];

impl Params {
    /// Subnets that no VM group refers to, in declaration order.
    pub fn unused_subnets(&self) -> Vec<&Subnet> {
        let Some(subnets) = &self.subnets else {
            return vec![];
        };
        let referenced: Vec<&str> = self
            .vm_groups
            .iter()
            .flatten()
            .flat_map(|g| g.subnet_names.iter().flatten())
            .map(String::as_str)
            .collect();
        subnets
            .iter()
            .filter(|s| {
                s.name
                    .as_deref()
                    .map_or(true, |name| !referenced.contains(&name))
            })
            .collect()
    }
}

fn str_owned(s: &str) -> Option<String> {
    Some(s.to_string())
}

impl Document for Config {
    const SCHEMA: &'static SchemaDescriptor = &CONFIG_SCHEMA;
    const ROOT: &'static str = "Config";

    fn init(module_version: &str) -> Self {
        Config {
            meta: Some(Meta::new(CONFIG_KIND, CONFIG_VERSION, module_version)),
            params: Some(Params {
                name: str_owned("unknown"),
                location: str_owned("northeurope"),
                address_space: Some(vec!["10.0.0.0/16".to_string()]),
                subnets: Some(vec![Subnet {
                    name: str_owned("main"),
                    address_prefixes: Some(vec!["10.0.1.0/24".to_string()]),
                }]),
                vm_groups: Some(vec![VmGroup {
                    name: str_owned("vm-group-0"),
                    vm_count: Some(1),
                    vm_size: str_owned("Standard_DS2_v2"),
                    use_public_ip: Some(true),
                    subnet_names: Some(vec!["main".to_string()]),
                    vm_image: Some(VmImage {
                        publisher: str_owned("Canonical"),
                        offer: str_owned("UbuntuServer"),
                        sku: str_owned("18.04-LTS"),
                        version: str_owned("18.04.202006101"),
                    }),
                    data_disks: Some(vec![DataDisk {
                        gb_size: Some(10),
                        storage_type: str_owned("Premium_LRS"),
                    }]),
                }]),
                admin_username: str_owned("operations"),
                rsa_public_key_path: str_owned("/shared/vms_rsa.pub"),
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
        v.record("Meta", &self.meta, &[Rule::Required]);
        v.record("Params", &self.params, &[Rule::Required]);
    }
}

impl Validate for Params {
    fn validate(&self, v: &mut Scope<'_>) {
        use infradoc_core::validation::FieldValue as _;

        v.check("Name", &self.name, &[Rule::Required, Rule::Min(1)]);
        v.check("Location", &self.location, &[Rule::Required, Rule::Min(1)]);
        v.items(
            "AddressSpace",
            &self.address_space,
            &[Rule::OmitEmpty, Rule::Min(1)],
            &[Rule::Min(1), Rule::Cidr],
        );
        let has_address_space = self.address_space.is_present();
        v.records(
            "Subnets",
            &self.subnets,
            &[
                Rule::RequiredWith(has_address_space),
                Rule::ExcludedWithout(has_address_space),
                Rule::OmitEmpty,
                Rule::Min(1),
            ],
        );
        v.records("VmGroups", &self.vm_groups, &[Rule::Required]);
        v.check(
            "AdminUsername",
            &self.admin_username,
            &[Rule::Required, Rule::Min(1)],
        );
        v.check(
            "RsaPublicKeyPath",
            &self.rsa_public_key_path,
            &[Rule::Required, Rule::Min(1)],
        );

        if !v.custom_rules() {
            return;
        }
        let known: Vec<&str> = self
            .subnets
            .iter()
            .flatten()
            .filter_map(|s| s.name.as_deref())
            .collect();
        ReferenceRule {
            groups: "VmGroups",
            names: "SubnetNames",
            tag: "insubnets",
            policy: ReferencePolicy::FailFast,
        }
        .apply(
            v,
            &known,
            self.vm_groups
                .iter()
                .flatten()
                .map(|g| g.subnet_names.as_ref()),
        );
    }
}

impl Validate for Subnet {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check("Name", &self.name, &[Rule::Required, Rule::Min(1)]);
        v.items(
            "AddressPrefixes",
            &self.address_prefixes,
            &[Rule::Required, Rule::Min(1)],
            &[Rule::Required, Rule::Cidr],
        );
    }
}

impl Validate for VmGroup {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check("Name", &self.name, &[Rule::Required, Rule::Min(1)]);
        v.check("VmCount", &self.vm_count, &[Rule::Required, Rule::Min(1)]);
        v.check("VmSize", &self.vm_size, &[Rule::Required, Rule::Min(1)]);
        v.check("UsePublicIP", &self.use_public_ip, &[Rule::Required]);
        v.items(
            "SubnetNames",
            &self.subnet_names,
            &[Rule::OmitEmpty, Rule::Min(1)],
            &[Rule::Required],
        );
        v.record("VmImage", &self.vm_image, &[Rule::Required]);
        v.records("DataDisks", &self.data_disks, &[Rule::Required]);
    }
}

impl Validate for VmImage {
    fn validate(&self, v: &mut Scope<'_>) {
        let rules = [Rule::Required, Rule::Min(1)];
        v.check("Publisher", &self.publisher, &rules);
        v.check("Offer", &self.offer, &rules);
        v.check("Sku", &self.sku, &rules);
        v.check("Version", &self.version, &rules);
    }
}

impl Validate for DataDisk {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check("GbSize", &self.gb_size, &[Rule::Required, Rule::Min(1)]);
        v.check(
            "StorageType",
            &self.storage_type,
            &[Rule::Required, Rule::OneOf(STORAGE_TYPES)],
        );
    }
}
