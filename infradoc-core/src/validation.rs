//! Accumulating validation engine.
//!
//! Each record type implements [`Validate`] by walking its fields through a
//! [`Scope`], giving every field an ordered rule list. Rules for one field
//! run in order and stop at the first failure, so a field yields at most one
//! violation from its declarative rules. Custom cross-field rules report
//! through the same scope and run after the declarative ones. A document
//! embedded in another one (a config kept inside a state) gets only the
//! declarative rules, see [`Scope::embedded`].
//!
//! Namespaces use the record's type-level names (`Config.Params.VmGroups[0].Name`),
//! not the JSON keys.

use std::{fmt, net::IpAddr};

use crate::version::Version;

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Full path of the offending field, e.g. `Config.Params.Subnets[0].Name`.
    pub namespace: String,
    /// Local name of the field, or for custom rules the path relative to the
    /// record the rule is attached to.
    pub field: String,
    /// Name of the failed rule, e.g. `required`, `min`, `insubnets`.
    pub tag: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: field '{}' failed on the '{}' rule",
            self.namespace, self.field, self.tag
        )
    }
}

/// All violations found in one document, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Violation> {
        self.0
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}", v)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A record that knows how to validate its own fields.
pub trait Validate {
    fn validate(&self, scope: &mut Scope<'_>);
}

/// Validate `value` as a root record named `root`.
pub fn run<T: Validate + ?Sized>(root: &str, value: &T) -> Result<(), Violations> {
    let mut found = Vec::new();
    value.validate(&mut Scope::root(root, &mut found));
    if found.is_empty() {
        Ok(())
    } else {
        Err(Violations(found))
    }
}

/// A declarative field rule.
///
/// Rules that relate a field to a sibling carry the sibling's state, computed
/// by the caller when it builds the rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Stop checking this field, without a violation, when it is absent.
    OmitEmpty,
    /// The field must be present. An empty string or list counts as present.
    Required,
    /// The field must be present and non-empty. Reported as `required`, for
    /// plain values where an empty string means unset.
    Filled,
    /// String length, list length or integer value must be at least this.
    Min(i64),
    /// The string must be an `<address>/<prefix>` network.
    Cidr,
    /// The string must parse as a version with this major component.
    Version { major: u64 },
    /// The string must equal one of these.
    OneOf(&'static [&'static str]),
    /// The value must be at least the sibling's value. Fails when the sibling
    /// is absent.
    GteField(Option<i64>),
    /// The value must be at most the sibling's value. Fails when the sibling
    /// is absent.
    LteField(Option<i64>),
    /// Carries whether the sibling is present; the field must then be present too.
    RequiredWith(bool),
    /// Carries whether the sibling is present; when it is not, the field must
    /// be present. An empty list counts as present.
    RequiredWithout(bool),
    /// Carries whether the sibling is present; when it is not, the field must
    /// be absent.
    ExcludedWithout(bool),
}

impl Rule {
    pub fn tag(&self) -> String {
        match self {
            Rule::OmitEmpty => "omitempty".to_string(),
            Rule::Required | Rule::Filled => "required".to_string(),
            Rule::Min(_) => "min".to_string(),
            Rule::Cidr => "cidr".to_string(),
            Rule::Version { .. } => "version".to_string(),
            Rule::OneOf(set) => set
                .iter()
                .map(|s| format!("eq={}", s))
                .collect::<Vec<_>>()
                .join("|"),
            Rule::GteField(_) => "gtefield".to_string(),
            Rule::LteField(_) => "ltefield".to_string(),
            Rule::RequiredWith(_) => "required_with".to_string(),
            Rule::RequiredWithout(_) => "required_without".to_string(),
            Rule::ExcludedWithout(_) => "excluded_without".to_string(),
        }
    }

    fn holds<V: FieldValue + ?Sized>(&self, value: &V) -> bool {
        match *self {
            Rule::OmitEmpty => true,
            Rule::Required => value.is_present(),
            Rule::Filled => !value.is_blank(),
            Rule::Min(n) => value.measure().map_or(true, |m| m >= n),
            Rule::Cidr => value.text().is_some_and(is_cidr),
            Rule::Version { major } => value
                .text()
                .and_then(|s| s.parse::<Version>().ok())
                .is_some_and(|v| v.major == major),
            Rule::OneOf(set) => value.text().is_some_and(|s| set.contains(&s)),
            Rule::GteField(other) => matches!((value.measure(), other), (Some(v), Some(o)) if v >= o),
            Rule::LteField(other) => matches!((value.measure(), other), (Some(v), Some(o)) if v <= o),
            Rule::RequiredWith(sibling) => !sibling || value.is_present(),
            Rule::RequiredWithout(sibling) => sibling || value.is_present(),
            Rule::ExcludedWithout(sibling) => sibling || !value.is_present(),
        }
    }
}

/// Whether `s` is an IPv4 or IPv6 network in `<address>/<prefix>` form.
pub fn is_cidr(s: &str) -> bool {
    let Some((address, prefix)) = s.split_once('/') else {
        return false;
    };
    if prefix.is_empty() || prefix.len() > 3 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => prefix <= 32,
        Ok(IpAddr::V6(_)) => prefix <= 128,
        Err(_) => false,
    }
}

/// How a field value looks to the rules.
pub trait FieldValue {
    fn is_present(&self) -> bool;

    /// Absent, or present but empty.
    fn is_blank(&self) -> bool {
        !self.is_present()
    }

    /// Length for strings and lists, the value itself for integers.
    fn measure(&self) -> Option<i64> {
        None
    }

    fn text(&self) -> Option<&str> {
        None
    }
}

impl FieldValue for Option<String> {
    fn is_present(&self) -> bool {
        self.is_some()
    }
    fn is_blank(&self) -> bool {
        self.as_deref().map_or(true, str::is_empty)
    }
    fn measure(&self) -> Option<i64> {
        self.as_deref().and_then(<str as FieldValue>::measure)
    }
    fn text(&self) -> Option<&str> {
        self.as_deref()
    }
}

impl FieldValue for Option<i64> {
    fn is_present(&self) -> bool {
        self.is_some()
    }
    fn measure(&self) -> Option<i64> {
        *self
    }
}

impl FieldValue for Option<bool> {
    fn is_present(&self) -> bool {
        self.is_some()
    }
}

impl<T> FieldValue for Option<Vec<T>> {
    fn is_present(&self) -> bool {
        self.is_some()
    }
    fn is_blank(&self) -> bool {
        self.as_ref().map_or(true, Vec::is_empty)
    }
    fn measure(&self) -> Option<i64> {
        self.as_ref().map(|v| v.len() as i64)
    }
}

/// A list element. Present when non-empty.
impl FieldValue for str {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
    fn measure(&self) -> Option<i64> {
        Some(self.chars().count() as i64)
    }
    fn text(&self) -> Option<&str> {
        Some(self)
    }
}

/// Presence of a nested record.
struct RecordPresence(bool);

impl FieldValue for RecordPresence {
    fn is_present(&self) -> bool {
        self.0
    }
}

/// A position in the document being validated, plus the violation sink.
pub struct Scope<'a> {
    namespace: String,
    violations: &'a mut Vec<Violation>,
    custom_rules: bool,
}

impl<'a> Scope<'a> {
    pub fn root(name: &str, violations: &'a mut Vec<Violation>) -> Self {
        Scope {
            namespace: name.to_string(),
            violations,
            custom_rules: true,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// A scope for the field `name` of the current record.
    pub fn child(&mut self, name: &str) -> Scope<'_> {
        Scope {
            namespace: format!("{}.{}", self.namespace, name),
            violations: &mut *self.violations,
            custom_rules: self.custom_rules,
        }
    }

    /// Whether records should run their custom cross-field rules here. False
    /// below [`Scope::embedded`].
    pub fn custom_rules(&self) -> bool {
        self.custom_rules
    }

    /// Record a violation at `relative`, below the current record.
    pub fn report(&mut self, relative: &str, field: &str, tag: &str) {
        self.violations.push(Violation {
            namespace: format!("{}.{}", self.namespace, relative),
            field: field.to_string(),
            tag: tag.to_string(),
        });
    }

    /// Run `rules` against a scalar or list field. Returns whether the field
    /// should be looked into further.
    pub fn check<V: FieldValue + ?Sized>(&mut self, name: &str, value: &V, rules: &[Rule]) -> bool {
        for rule in rules {
            if *rule == Rule::OmitEmpty {
                if !value.is_present() {
                    return false;
                }
                continue;
            }
            if !rule.holds(value) {
                self.report(name, name, &rule.tag());
                return false;
            }
        }
        true
    }

    /// Run `rules` against a nested record and, if they pass, validate it.
    pub fn record<T: Validate>(&mut self, name: &str, value: &Option<T>, rules: &[Rule]) {
        if self.check(name, &RecordPresence(value.is_some()), rules) {
            if let Some(inner) = value {
                inner.validate(&mut self.child(name));
            }
        }
    }

    /// Like [`Scope::record`], for a document embedded in another one: only
    /// the declarative field rules apply to it and its descendants.
    pub fn embedded<T: Validate>(&mut self, name: &str, value: &Option<T>, rules: &[Rule]) {
        if self.check(name, &RecordPresence(value.is_some()), rules) {
            if let Some(inner) = value {
                let mut child = self.child(name);
                child.custom_rules = false;
                inner.validate(&mut child);
            }
        }
    }

    /// Run `rules` against a list of records and, if they pass, validate each
    /// element as `name[i]`.
    pub fn records<T: Validate>(&mut self, name: &str, value: &Option<Vec<T>>, rules: &[Rule]) {
        if self.check(name, value, rules) {
            for (i, item) in value.iter().flatten().enumerate() {
                item.validate(&mut self.child(&format!("{}[{}]", name, i)));
            }
        }
    }

    /// Run `rules` against a list of strings and, if they pass, `item_rules`
    /// against each element as `name[i]`.
    pub fn items(
        &mut self,
        name: &str,
        value: &Option<Vec<String>>,
        rules: &[Rule],
        item_rules: &[Rule],
    ) {
        if self.check(name, value, rules) {
            for (i, item) in value.iter().flatten().enumerate() {
                self.check(&format!("{}[{}]", name, i), item.as_str(), item_rules);
            }
        }
    }

    /// Validate `value` as a separate root named `root` and file its
    /// violations under `relative`, e.g. `Subnets.Private[0].Subnet.Name`.
    pub fn nested<T: Validate + ?Sized>(&mut self, relative: &str, root: &str, value: &T) {
        let mut found = Vec::new();
        value.validate(&mut Scope::root(root, &mut found));
        for v in found {
            self.violations.push(Violation {
                namespace: format!("{}.{}.{}", self.namespace, relative, v.namespace),
                field: v.field,
                tag: v.tag,
            });
        }
    }
}

/// Whether a reference rule stops at the first unresolved name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePolicy {
    FailFast,
    CollectAll,
}

/// Checks that names listed by each element of a collection resolve against
/// a set of declared names, e.g. VM group subnet names against subnets.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceRule<'a> {
    /// Field holding the referencing records, e.g. `VmGroups`.
    pub groups: &'a str,
    /// Field of each record holding the names, e.g. `SubnetNames`.
    pub names: &'a str,
    /// Tag reported for a name that does not resolve.
    pub tag: &'a str,
    pub policy: ReferencePolicy,
}

impl ReferenceRule<'_> {
    /// An empty name reports `required`, an unknown one reports the rule's
    /// tag. Returns false when the rule stopped early.
    pub fn apply<'g>(
        &self,
        scope: &mut Scope<'_>,
        known: &[&str],
        groups: impl IntoIterator<Item = Option<&'g Vec<String>>>,
    ) -> bool {
        for (i, names) in groups.into_iter().enumerate() {
            if !self.apply_group(scope, known, i, names) {
                return false;
            }
        }
        true
    }

    /// Like [`ReferenceRule::apply`], for the names of the single record at
    /// index `i`.
    pub fn apply_group(
        &self,
        scope: &mut Scope<'_>,
        known: &[&str],
        i: usize,
        names: Option<&Vec<String>>,
    ) -> bool {
        let fail_fast = self.policy == ReferencePolicy::FailFast;
        for (j, name) in names.into_iter().flatten().enumerate() {
            let path = format!("{}[{}].{}[{}]", self.groups, i, self.names, j);
            if name.is_empty() {
                scope.report(&path, &path, "required");
                if fail_fast {
                    return false;
                }
            }
            if !known.contains(&name.as_str()) {
                scope.report(&path, &path, self.tag);
                if fail_fast {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Disk {
        size: Option<i64>,
        kind: Option<String>,
    }

    impl Validate for Disk {
        fn validate(&self, v: &mut Scope<'_>) {
            v.check("Size", &self.size, &[Rule::Required, Rule::Min(1)]);
            v.check("Kind", &self.kind, &[Rule::Required, Rule::OneOf(&["ssd", "hdd"])]);
        }
    }

    struct Machine {
        name: Option<String>,
        tags: Option<Vec<String>>,
        disks: Option<Vec<Disk>>,
        boot: Option<Disk>,
    }

    impl Validate for Machine {
        fn validate(&self, v: &mut Scope<'_>) {
            v.check("Name", &self.name, &[Rule::Required, Rule::Min(1)]);
            v.items(
                "Tags",
                &self.tags,
                &[Rule::OmitEmpty, Rule::Min(1)],
                &[Rule::Required],
            );
            v.records("Disks", &self.disks, &[Rule::Required]);
            v.record("Boot", &self.boot, &[Rule::OmitEmpty]);
        }
    }

    fn tags(found: Result<(), Violations>) -> Vec<(String, String)> {
        found
            .err()
            .map(Violations::into_inner)
            .unwrap_or_default()
            .into_iter()
            .map(|v| (v.namespace, v.tag))
            .collect()
    }

    fn pair(ns: &str, tag: &str) -> (String, String) {
        (ns.to_string(), tag.to_string())
    }

    #[test]
    fn test_valid() {
        let m = Machine {
            name: Some("m".to_string()),
            tags: None,
            disks: Some(vec![Disk {
                size: Some(3),
                kind: Some("ssd".to_string()),
            }]),
            boot: None,
        };
        assert_eq!(run("Machine", &m), Ok(()));
    }

    #[test]
    fn test_first_failing_rule_only() {
        let m = Machine {
            name: Some("".to_string()),
            tags: Some(vec![]),
            disks: Some(vec![]),
            boot: Some(Disk {
                size: None,
                kind: Some("tape".to_string()),
            }),
        };
        assert_eq!(
            tags(run("Machine", &m)),
            vec![
                pair("Machine.Name", "min"),
                pair("Machine.Tags", "min"),
                pair("Machine.Boot.Size", "required"),
                pair("Machine.Boot.Kind", "eq=ssd|eq=hdd"),
            ]
        );
    }

    #[test]
    fn test_elements() {
        let m = Machine {
            name: None,
            tags: Some(vec!["a".to_string(), "".to_string()]),
            disks: Some(vec![
                Disk {
                    size: Some(1),
                    kind: Some("hdd".to_string()),
                },
                Disk {
                    size: Some(0),
                    kind: None,
                },
            ]),
            boot: None,
        };
        let found = run("Machine", &m).unwrap_err();
        assert_eq!(
            tags(Err(found.clone())),
            vec![
                pair("Machine.Name", "required"),
                pair("Machine.Tags[1]", "required"),
                pair("Machine.Disks[1].Size", "min"),
                pair("Machine.Disks[1].Kind", "required"),
            ]
        );
        let fields: Vec<_> = found.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["Name", "Tags[1]", "Size", "Kind"]);
    }

    #[test]
    fn test_sibling_rules() {
        let mut found = Vec::new();
        let mut scope = Scope::root("R", &mut found);
        let empty: Option<Vec<String>> = Some(vec![]);
        let none: Option<Vec<String>> = None;
        assert!(scope.check("A", &empty, &[Rule::RequiredWith(true)]));
        assert!(!scope.check("B", &none, &[Rule::RequiredWith(true)]));
        assert!(!scope.check("C", &none, &[Rule::RequiredWithout(false)]));
        assert!(scope.check("D", &empty, &[Rule::RequiredWithout(false)]));
        assert!(scope.check("D", &none, &[Rule::RequiredWithout(true)]));
        assert!(!scope.check("E", &empty, &[Rule::ExcludedWithout(false)]));
        assert!(scope.check("F", &none, &[Rule::ExcludedWithout(false)]));
        assert!(!scope.check("G", &Some(3i64), &[Rule::GteField(None)]));
        assert!(!scope.check("G", &Some(String::new()), &[Rule::Filled]));
        assert!(scope.check("G", &Some(String::new()), &[Rule::Required]));
        assert!(scope.check("H", &Some(3i64), &[Rule::LteField(Some(3))]));
        let tags: Vec<_> = found.iter().map(|v| v.tag.as_str()).collect();
        assert_eq!(
            tags,
            vec![
                "required_with",
                "required_without",
                "excluded_without",
                "gtefield",
                "required"
            ]
        );
    }

    #[test]
    fn test_version_rule() {
        let mut found = Vec::new();
        let mut scope = Scope::root("R", &mut found);
        let rules = [Rule::Required, Rule::Version { major: 0 }];
        assert!(scope.check("A", &Some("v0.3.1".to_string()), &rules));
        assert!(!scope.check("B", &Some("v1.0.0".to_string()), &rules));
        assert!(!scope.check("C", &Some("0.1.0".to_string()), &rules));
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|v| v.tag == "version"));
    }

    #[test]
    fn test_cidr() {
        for ok in ["10.0.0.0/16", "10.1.1.0/24", "0.0.0.0/0", "fd00::/8", "::1/128"] {
            assert!(is_cidr(ok), "{}", ok);
        }
        for bad in [
            "10.0.0.0", "10.0.0.0/33", "10.0.0/16", "abc/8", "10.0.0.0/", "/16", "::1/129",
            "10.0.0.0/+8", "",
        ] {
            assert!(!is_cidr(bad), "{}", bad);
        }
    }

    #[test]
    fn test_nested() {
        let mut found = Vec::new();
        let mut scope = Scope::root("Config", &mut found);
        let mut params = scope.child("Params");
        params.nested(
            "Disks.Extra[0]",
            "Disk",
            &Disk {
                size: Some(1),
                kind: None,
            },
        );
        assert_eq!(
            found,
            vec![Violation {
                namespace: "Config.Params.Disks.Extra[0].Disk.Kind".to_string(),
                field: "Kind".to_string(),
                tag: "required".to_string(),
            }]
        );
    }

    struct Pair {
        low: Option<i64>,
        high: Option<i64>,
    }

    impl Validate for Pair {
        fn validate(&self, v: &mut Scope<'_>) {
            v.check("Low", &self.low, &[Rule::Required]);
            if v.custom_rules() && self.low > self.high {
                v.report("Low", "Low", "ordered");
            }
        }
    }

    struct Holder {
        own: Option<Pair>,
        copy: Option<Pair>,
    }

    impl Validate for Holder {
        fn validate(&self, v: &mut Scope<'_>) {
            v.record("Own", &self.own, &[Rule::OmitEmpty]);
            v.embedded("Copy", &self.copy, &[Rule::OmitEmpty]);
        }
    }

    #[test]
    fn test_embedded_skips_custom_rules() {
        let swapped = || Pair {
            low: Some(2),
            high: Some(1),
        };
        let holder = Holder {
            own: Some(swapped()),
            copy: Some(swapped()),
        };
        assert_eq!(
            tags(run("H", &holder)),
            vec![pair("H.Own.Low", "ordered")]
        );

        let holder = Holder {
            own: None,
            copy: Some(Pair {
                low: None,
                high: None,
            }),
        };
        assert_eq!(
            tags(run("H", &holder)),
            vec![pair("H.Copy.Low", "required")]
        );
    }

    fn names(list: &[&str]) -> Option<Vec<String>> {
        Some(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_references() {
        let groups = [names(&["a", "x", ""]), None, names(&["y"])];
        let known = ["a", "b"];
        let rule = ReferenceRule {
            groups: "Groups",
            names: "Refs",
            tag: "inrefs",
            policy: ReferencePolicy::CollectAll,
        };

        let mut found = Vec::new();
        let complete = rule.apply(
            &mut Scope::root("P", &mut found),
            &known,
            groups.iter().map(Option::as_ref),
        );
        assert!(complete);
        let got: Vec<_> = found
            .iter()
            .map(|v| (v.namespace.as_str(), v.field.as_str(), v.tag.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("P.Groups[0].Refs[1]", "Groups[0].Refs[1]", "inrefs"),
                ("P.Groups[0].Refs[2]", "Groups[0].Refs[2]", "required"),
                ("P.Groups[0].Refs[2]", "Groups[0].Refs[2]", "inrefs"),
                ("P.Groups[2].Refs[0]", "Groups[2].Refs[0]", "inrefs"),
            ]
        );

        let mut found = Vec::new();
        let rule = ReferenceRule {
            policy: ReferencePolicy::FailFast,
            ..rule
        };
        let complete = rule.apply(
            &mut Scope::root("P", &mut found),
            &known,
            groups.iter().map(Option::as_ref),
        );
        assert!(!complete);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].namespace, "P.Groups[0].Refs[1]");
    }

    #[test]
    fn test_reference_single_group() {
        let rule = ReferenceRule {
            groups: "Groups",
            names: "Refs",
            tag: "inrefs",
            policy: ReferencePolicy::CollectAll,
        };
        let mut found = Vec::new();
        let mut scope = Scope::root("P", &mut found);
        assert!(rule.apply_group(&mut scope, &["a"], 3, names(&["a", "b"]).as_ref()));
        assert!(rule.apply_group(&mut scope, &["a"], 4, None));
        assert_eq!(
            found,
            vec![Violation {
                namespace: "P.Groups[3].Refs[1]".to_string(),
                field: "Groups[3].Refs[1]".to_string(),
                tag: "inrefs".to_string(),
            }]
        );
    }
}
