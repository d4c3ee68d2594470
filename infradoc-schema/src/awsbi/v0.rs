//! AwsBI (AWS basic infrastructure) configuration, schema generation 0.
//!
//! Kind and version sit at the top level. The matching state lives in the
//! aggregate [`crate::state::v0::State`] document.

use infradoc_core::{
    validation::{FieldValue as _, ReferencePolicy, ReferenceRule},
    Document, MarkerLocation, Rule, SchemaDescriptor, Scope, Validate,
};
use serde::{Deserialize, Serialize};

pub const KIND: &str = "awsbi";
pub const VERSION: &str = "v0.0.1";

pub const SCHEMA: SchemaDescriptor = SchemaDescriptor {
    kind: KIND,
    version: VERSION,
    marker: MarkerLocation::TopLevel,
    upgrades: &[],
};

pub const DISK_TYPES: &[&str] = &["standard", "gp2", "gp3", "io1", "io2", "sc1", "st1"];

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
    pub region: Option<String>,
    pub nat_gateway_count: Option<i64>,
    pub virtual_private_gateway: Option<bool>,
    #[serde(rename = "rsa_pub_path")]
    pub rsa_public_key_path: Option<String>,
    pub vpc_address_space: Option<String>,
    pub subnets: Option<Subnets>,
    pub security_groups: Option<Vec<SecurityGroup>>,
    pub vm_groups: Option<Vec<VmGroup>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnets {
    pub private: Option<Vec<Subnet>>,
    pub public: Option<Vec<Subnet>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub name: Option<String>,
    pub availability_zone: Option<String>,
    /// A single network, despite the plural key.
    pub address_prefixes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub name: Option<String>,
    pub rules: Option<Rules>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    pub ingress: Option<Vec<SecurityRule>>,
    pub egress: Option<Vec<SecurityRule>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRule {
    pub protocol: Option<String>,
    pub from_port: Option<i64>,
    pub to_port: Option<i64>,
    pub cidr_blocks: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmGroup {
    pub name: Option<String>,
    pub vm_count: Option<i64>,
    pub vm_size: Option<String>,
    pub use_public_ip: Option<bool>,
    pub subnet_names: Option<Vec<String>>,
    #[serde(rename = "sg_names")]
    pub security_group_names: Option<Vec<String>>,
    pub vm_image: Option<VmImage>,
    #[serde(rename = "root_volume_size")]
    pub root_volume_gb_size: Option<i64>,
    pub data_disks: Option<Vec<DataDisk>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmImage {
    pub ami: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDisk {
    pub device_name: Option<String>,
    #[serde(rename = "disk_size_gb")]
    pub gb_size: Option<i64>,
    #[serde(rename = "type")]
    pub disk_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub vpc_id: Option<String>,
    pub private_subnet_ids: Option<Vec<String>>,
    pub public_subnet_ids: Option<Vec<String>>,
    pub private_route_table: Option<String>,
    pub vm_groups: Option<Vec<OutputVmGroup>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputVmGroup {
    pub name: Option<String>,
    pub vms: Option<Vec<OutputVm>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputVm {
    pub name: Option<String>,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
    pub data_disks: Option<Vec<OutputDataDisk>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDataDisk {
    pub size: Option<i64>,
    pub device_name: Option<String>,
}

fn text(s: &str) -> Option<String> {
    Some(s.to_string())
}

fn texts(items: &[&str]) -> Option<Vec<String>> {
    Some(items.iter().map(|s| s.to_string()).collect())
}

fn security_rule(protocol: &str, port: i64, cidr: &str) -> SecurityRule {
    SecurityRule {
        protocol: text(protocol),
        from_port: Some(port),
        to_port: Some(port),
        cidr_blocks: texts(&[cidr]),
    }
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
                region: text("eu-central-1"),
                nat_gateway_count: Some(1),
                virtual_private_gateway: Some(false),
                rsa_public_key_path: text("/shared/vms_rsa.pub"),
                vpc_address_space: text("10.1.0.0/20"),
                subnets: Some(Subnets {
                    private: Some(vec![Subnet {
                        name: text("first_private_subnet"),
                        availability_zone: text("any"),
                        address_prefixes: text("10.1.1.0/24"),
                    }]),
                    public: Some(vec![Subnet {
                        name: text("first_public_subnet"),
                        availability_zone: text("any"),
                        address_prefixes: text("10.1.2.0/24"),
                    }]),
                }),
                security_groups: Some(vec![SecurityGroup {
                    name: text("default_sg"),
                    rules: Some(Rules {
                        ingress: Some(vec![
                            security_rule("-1", 0, "10.1.0.0/20"),
                            security_rule("tcp", 22, "0.0.0.0/0"),
                        ]),
                        egress: Some(vec![security_rule("-1", 0, "0.0.0.0/0")]),
                    }),
                }]),
                vm_groups: Some(vec![VmGroup {
                    name: text("vm-group0"),
                    vm_count: Some(1),
                    vm_size: text("t3.medium"),
                    use_public_ip: Some(false),
                    subnet_names: texts(&["first_private_subnet"]),
                    security_group_names: texts(&["default_sg"]),
                    vm_image: Some(VmImage {
                        ami: text("RHEL-7.8_HVM_GA-20200225-x86_64-1-Hourly2-GP2"),
                        owner: text("309956199498"),
                    }),
                    root_volume_gb_size: Some(30),
                    data_disks: Some(vec![DataDisk {
                        device_name: text("/dev/sdf"),
                        gb_size: Some(16),
                        disk_type: text("gp2"),
                    }]),
                }]),
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
        v.check("Name", &self.name, &[Rule::Required, Rule::Min(1)]);
        v.check("Region", &self.region, &[Rule::Required, Rule::Min(1)]);
        v.check(
            "NatGatewayCount",
            &self.nat_gateway_count,
            &[Rule::Required, Rule::Min(0)],
        );
        v.check(
            "VirtualPrivateGateway",
            &self.virtual_private_gateway,
            &[Rule::Required],
        );
        v.check(
            "RsaPublicKeyPath",
            &self.rsa_public_key_path,
            &[Rule::Required, Rule::Min(1)],
        );
        v.check(
            "VpcAddressSpace",
            &self.vpc_address_space,
            &[Rule::Required, Rule::Min(1), Rule::Cidr],
        );
        v.record("Subnets", &self.subnets, &[Rule::Required]);
        v.records("SecurityGroups", &self.security_groups, &[Rule::Required]);
        v.records("VmGroups", &self.vm_groups, &[Rule::Required]);

        if !v.custom_rules() {
            return;
        }
        self.check_references(v);
        if let Some(subnets) = &self.subnets {
            subnets.check_elements(v);
        }
    }
}

impl Params {
    /// Each VM group's subnet names, then its security group names, before
    /// the next group.
    fn check_references(&self, v: &mut Scope<'_>) {
        let subnets: Vec<&str> = self
            .subnets
            .iter()
            .flat_map(|s| s.private.iter().flatten().chain(s.public.iter().flatten()))
            .filter_map(|s| s.name.as_deref())
            .collect();
        let security_groups: Vec<&str> = self
            .security_groups
            .iter()
            .flatten()
            .filter_map(|g| g.name.as_deref())
            .collect();
        let in_subnets = ReferenceRule {
            groups: "VmGroups",
            names: "SubnetNames",
            tag: "insubnets",
            policy: ReferencePolicy::CollectAll,
        };
        let in_security_groups = ReferenceRule {
            groups: "VmGroups",
            names: "SecurityGroupNames",
            tag: "insecuritygroups",
            policy: ReferencePolicy::CollectAll,
        };
        for (i, group) in self.vm_groups.iter().flatten().enumerate() {
            in_subnets.apply_group(v, &subnets, i, group.subnet_names.as_ref());
            in_security_groups.apply_group(
                v,
                &security_groups,
                i,
                group.security_group_names.as_ref(),
            );
        }
    }
}

impl Subnets {
    /// Subnet elements are validated on their own and filed under
    /// `Subnets.Private[i].Subnet.*` and `Subnets.Public[i].Subnet.*`.
    fn check_elements(&self, v: &mut Scope<'_>) {
        if self.private.is_blank() && self.public.is_blank() {
            v.report("Subnets", "Subnets", "private_or_public");
        }
        for (list, name) in [(&self.private, "Private"), (&self.public, "Public")] {
            for (i, subnet) in list.iter().flatten().enumerate() {
                v.nested(&format!("Subnets.{}[{}]", name, i), "Subnet", subnet);
            }
        }
    }
}

impl Validate for Subnets {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check(
            "Private",
            &self.private,
            &[Rule::RequiredWithout(self.public.is_present())],
        );
        v.check(
            "Public",
            &self.public,
            &[Rule::RequiredWithout(self.private.is_present())],
        );
    }
}

impl Validate for Subnet {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check("Name", &self.name, &[Rule::Required, Rule::Min(1)]);
        v.check(
            "AvailabilityZone",
            &self.availability_zone,
            &[Rule::Required, Rule::Min(1)],
        );
        v.check(
            "AddressPrefixes",
            &self.address_prefixes,
            &[Rule::Required, Rule::Min(1), Rule::Cidr],
        );
    }
}

impl Validate for SecurityGroup {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check("Name", &self.name, &[Rule::Required, Rule::Min(1)]);
        v.record("Rules", &self.rules, &[Rule::Required]);
    }
}

impl Validate for Rules {
    fn validate(&self, v: &mut Scope<'_>) {
        v.records("Ingress", &self.ingress, &[Rule::OmitEmpty, Rule::Min(1)]);
        v.records("Egress", &self.egress, &[Rule::OmitEmpty, Rule::Min(1)]);
    }
}

impl Validate for SecurityRule {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check("Protocol", &self.protocol, &[Rule::Required, Rule::Min(1)]);
        v.check("FromPort", &self.from_port, &[Rule::Required, Rule::Min(0)]);
        v.check("ToPort", &self.to_port, &[Rule::Required, Rule::Min(0)]);
        v.items(
            "CidrBlocks",
            &self.cidr_blocks,
            &[Rule::OmitEmpty, Rule::Min(1)],
            &[Rule::Required, Rule::Cidr],
        );
    }
}

impl Validate for VmGroup {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check("Name", &self.name, &[Rule::Required, Rule::Min(1)]);
        v.check("VmCount", &self.vm_count, &[Rule::Required, Rule::Min(1)]);
        v.check("VmSize", &self.vm_size, &[Rule::Required, Rule::Min(1)]);
        v.check("UsePublicIp", &self.use_public_ip, &[Rule::Required]);
        v.items(
            "SubnetNames",
            &self.subnet_names,
            &[Rule::OmitEmpty, Rule::Min(1)],
            &[Rule::Required],
        );
        v.items(
            "SecurityGroupNames",
            &self.security_group_names,
            &[Rule::OmitEmpty, Rule::Min(1)],
            &[Rule::Required],
        );
        v.record("VmImage", &self.vm_image, &[Rule::Required]);
        v.check(
            "RootVolumeGbSize",
            &self.root_volume_gb_size,
            &[Rule::Required, Rule::Min(1)],
        );
        v.records("DataDisks", &self.data_disks, &[Rule::OmitEmpty]);
    }
}

impl Validate for VmImage {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check("AMI", &self.ami, &[Rule::Required, Rule::Min(1)]);
        v.check("Owner", &self.owner, &[Rule::Required, Rule::Min(1)]);
    }
}

impl Validate for DataDisk {
    fn validate(&self, v: &mut Scope<'_>) {
        v.check(
            "DeviceName",
            &self.device_name,
            &[Rule::Required, Rule::Min(1)],
        );
        v.check("GbSize", &self.gb_size, &[Rule::Required, Rule::Min(1)]);
        v.check(
            "Type",
            &self.disk_type,
            &[Rule::Required, Rule::OneOf(DISK_TYPES)],
        );
    }
}
