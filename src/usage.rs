//! Usage resolver: classifies objects as used or unused.
//!
//! For each object type that supports usage analysis, the resolver runs
//! two phases:
//!
//! 1. **Gather** — fetch every referencing collection relevant to the
//!    type (policy scopes, smart-group criteria, patch title versions,
//!    prestage package lists, …) and extract the set of referenced names
//!    into a [`ReferenceSet`]. A collection that legitimately has no items
//!    produces an empty set — that is a meaningful value, not an error. A
//!    *failed* fetch propagates a `ToolError` instead, so it can never
//!    masquerade as non-usage.
//! 2. **Classify** — a candidate is Unused iff its name appears in none
//!    of the gathered sets. An empty set is vacuously non-blocking: the
//!    feature that contributed it simply had nothing referencing anything.
//!
//! Matching is exact set membership on names. The free-text substring
//! search elsewhere in the tool is a separate, unrelated matching mode.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::info;

use crate::catalog::ObjectType;
use crate::error::Result;
use crate::fetch::{list_objects, object_detail, value_at_path, Resource};
use crate::transport::{ApiRequest, Transport};

/// Names gathered from one referencing collection.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    source: String,
    names: BTreeSet<String>,
}

impl ReferenceSet {
    /// Creates an empty set labelled with the collection it came from.
    pub fn new(source: impl Into<String>) -> Self {
        ReferenceSet {
            source: source.into(),
            names: BTreeSet::new(),
        }
    }

    /// Adds a referenced name.
    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    /// Exact membership test.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Whether the collection referenced nothing at all.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of distinct referenced names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Label of the collection this set was gathered from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// The used/unused partition of all candidates, keyed by id.
#[derive(Debug, Default)]
pub struct UsageReport {
    /// Candidates referenced by at least one collection (id -> name).
    pub used: BTreeMap<String, String>,
    /// Candidates referenced by no collection (id -> name).
    pub unused: BTreeMap<String, String>,
}

/// Partitions candidates against the gathered reference sets.
///
/// Every candidate lands in exactly one partition. Adding a non-empty set
/// can only move a candidate from unused to used, never the reverse.
pub fn classify_usage(candidates: &[Resource], sets: &[ReferenceSet]) -> UsageReport {
    let mut report = UsageReport::default();
    for candidate in candidates {
        let referenced = sets.iter().any(|set| set.contains(&candidate.name));
        if referenced {
            report.used.insert(candidate.id.clone(), candidate.name.clone());
        } else {
            report
                .unused
                .insert(candidate.id.clone(), candidate.name.clone());
        }
    }
    report
}

/// The object types usage analysis is defined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageTarget {
    /// Packages, referenced by policies, patch titles and prestages.
    Package,
    /// Scripts, referenced by policies.
    Script,
    /// Extension attributes, referenced by smart-group and
    /// advanced-search criteria.
    ExtensionAttribute,
    /// Computer groups, referenced by seven collections.
    ComputerGroup,
    /// Mobile device groups, referenced by four collections.
    MobileDeviceGroup,
}

impl UsageTarget {
    /// The catalog type whose listing provides the candidates.
    pub fn object_type(self) -> ObjectType {
        match self {
            UsageTarget::Package => ObjectType::Package,
            UsageTarget::Script => ObjectType::Script,
            UsageTarget::ExtensionAttribute => ObjectType::ExtensionAttribute,
            UsageTarget::ComputerGroup => ObjectType::ComputerGroup,
            UsageTarget::MobileDeviceGroup => ObjectType::MobileDeviceGroup,
        }
    }

    /// Maps a catalog type onto its usage target, if analysis is defined.
    pub fn for_object_type(object_type: ObjectType) -> Option<Self> {
        match object_type {
            ObjectType::Package => Some(UsageTarget::Package),
            ObjectType::Script => Some(UsageTarget::Script),
            ObjectType::ExtensionAttribute => Some(UsageTarget::ExtensionAttribute),
            ObjectType::ComputerGroup => Some(UsageTarget::ComputerGroup),
            ObjectType::MobileDeviceGroup => Some(UsageTarget::MobileDeviceGroup),
            _ => None,
        }
    }
}

/// Runs both phases for one target: list candidates, gather every relevant
/// reference collection, classify.
pub async fn resolve_usage(transport: &Transport, target: UsageTarget) -> Result<UsageReport> {
    let candidates = list_objects(transport, target.object_type()).await?;
    let sets = gather_for(transport, target).await?;
    Ok(classify_usage(&candidates, &sets))
}

/// Gathers every reference collection relevant to the target type.
pub async fn gather_for(transport: &Transport, target: UsageTarget) -> Result<Vec<ReferenceSet>> {
    match target {
        UsageTarget::Package => Ok(vec![
            packages_in_policies(transport).await?,
            packages_in_patch_titles(transport).await?,
            packages_in_prestages(transport).await?,
        ]),
        UsageTarget::Script => Ok(vec![scripts_in_policies(transport).await?]),
        UsageTarget::ExtensionAttribute => Ok(vec![
            criteria_in_computer_groups(transport).await?,
            names_in_advanced_searches(transport).await?,
        ]),
        UsageTarget::ComputerGroup => Ok(vec![
            criteria_in_computer_groups(transport).await?,
            names_in_advanced_searches(transport).await?,
            groups_in_scoped_objects(transport, ObjectType::Policy).await?,
            groups_in_scoped_objects(transport, ObjectType::MacApplication).await?,
            groups_in_scoped_objects(transport, ObjectType::OsxConfigurationProfile).await?,
            groups_in_patch_policies(transport).await?,
            groups_in_scoped_objects(transport, ObjectType::RestrictedSoftware).await?,
        ]),
        UsageTarget::MobileDeviceGroup => Ok(vec![
            criteria_in_mobile_device_groups(transport).await?,
            names_in_mobile_advanced_searches(transport).await?,
            groups_in_mobile_scoped_objects(transport, ObjectType::MobileDeviceApplication)
                .await?,
            groups_in_mobile_scoped_objects(
                transport,
                ObjectType::MobileDeviceConfigurationProfile,
            )
            .await?,
        ]),
    }
}

/// Object types whose usage is defined by their own scope rather than by
/// references from other collections: a policy or configuration profile
/// deploys to targets, so one with an empty scope deploys to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeTarget {
    /// Policies, scoped to all computers or to computer groups.
    Policy,
    /// macOS configuration profiles, scoped like policies.
    ComputerProfile,
    /// Mobile device configuration profiles, scoped to all mobile devices
    /// or to mobile device groups.
    MobileDeviceProfile,
}

impl ScopeTarget {
    /// The catalog type whose listing provides the candidates.
    pub fn object_type(self) -> ObjectType {
        match self {
            ScopeTarget::Policy => ObjectType::Policy,
            ScopeTarget::ComputerProfile => ObjectType::OsxConfigurationProfile,
            ScopeTarget::MobileDeviceProfile => ObjectType::MobileDeviceConfigurationProfile,
        }
    }

    /// Maps a catalog type onto its scope target, if scope-based analysis
    /// is defined for it.
    pub fn for_object_type(object_type: ObjectType) -> Option<Self> {
        match object_type {
            ObjectType::Policy => Some(ScopeTarget::Policy),
            ObjectType::OsxConfigurationProfile => Some(ScopeTarget::ComputerProfile),
            ObjectType::MobileDeviceConfigurationProfile => {
                Some(ScopeTarget::MobileDeviceProfile)
            }
            _ => None,
        }
    }

    fn all_key(self) -> &'static str {
        match self {
            ScopeTarget::Policy | ScopeTarget::ComputerProfile => "all_computers",
            ScopeTarget::MobileDeviceProfile => "all_mobile_devices",
        }
    }

    fn groups_key(self) -> &'static str {
        match self {
            ScopeTarget::Policy | ScopeTarget::ComputerProfile => "computer_groups",
            ScopeTarget::MobileDeviceProfile => "mobile_device_groups",
        }
    }
}

/// A scope deploys to nothing when it is not aimed at everything and its
/// target group list is empty or absent. Exclusions never make a scope
/// non-empty.
fn scope_is_empty(scope: Option<&Value>, all_key: &str, groups_key: &str) -> bool {
    let Some(scope) = scope else {
        return true;
    };
    if is_true(scope.get(all_key)) {
        return false;
    }
    scope
        .get(groups_key)
        .and_then(Value::as_array)
        .map_or(true, |groups| groups.is_empty())
}

/// Classifies policies or profiles by their own scope: an object whose
/// scope targets nothing is unused, regardless of exclusions.
pub async fn resolve_scope_usage(
    transport: &Transport,
    target: ScopeTarget,
) -> Result<UsageReport> {
    let object_type = target.object_type();
    let candidates = list_objects(transport, object_type).await?;
    let mut report = UsageReport::default();
    info!(total = candidates.len(), %object_type, "checking scopes");
    for candidate in &candidates {
        let detail = object_detail(transport, object_type, &candidate.id).await?;
        let empty = scope_is_empty(
            value_at_path(&detail, "scope"),
            target.all_key(),
            target.groups_key(),
        );
        if empty {
            report
                .unused
                .insert(candidate.id.clone(), candidate.name.clone());
        } else {
            report.used.insert(candidate.id.clone(), candidate.name.clone());
        }
    }
    Ok(report)
}

/// Collects `name` fields from arrays found at the given paths inside
/// every object's detail document. The workhorse behind most gathers.
async fn names_at_paths(
    transport: &Transport,
    object_type: ObjectType,
    paths: &[&str],
    source: &str,
) -> Result<ReferenceSet> {
    let objects = list_objects(transport, object_type).await?;
    let mut set = ReferenceSet::new(source);
    info!(
        total = objects.len(),
        source, "gathering references, please wait"
    );
    for object in &objects {
        let detail = object_detail(transport, object_type, &object.id).await?;
        for path in paths {
            insert_names_from_array(&mut set, value_at_path(&detail, path));
        }
    }
    Ok(set)
}

fn insert_names_from_array(set: &mut ReferenceSet, value: Option<&Value>) {
    let Some(items) = value.and_then(Value::as_array) else {
        return;
    };
    for item in items {
        if let Some(name) = item.get("name").and_then(Value::as_str) {
            if !name.is_empty() && name != "None" {
                set.insert(name);
            }
        }
    }
}

/// `true` for both the boolean and the classic stringly-typed spelling.
fn is_true(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

/// Packages named in any policy's package configuration.
pub async fn packages_in_policies(transport: &Transport) -> Result<ReferenceSet> {
    names_at_paths(
        transport,
        ObjectType::Policy,
        &["package_configuration/packages"],
        "policies",
    )
    .await
}

/// Packages attached to any patch software title version.
pub async fn packages_in_patch_titles(transport: &Transport) -> Result<ReferenceSet> {
    let titles = list_objects(transport, ObjectType::PatchSoftwareTitle).await?;
    let mut set = ReferenceSet::new("patch software titles");
    info!(total = titles.len(), "gathering packages in patch titles");
    for title in &titles {
        let detail = object_detail(transport, ObjectType::PatchSoftwareTitle, &title.id).await?;
        let Some(versions) = value_at_path(&detail, "versions").and_then(Value::as_array) else {
            continue;
        };
        for version in versions {
            if let Some(name) = value_at_path(version, "package/name").and_then(Value::as_str) {
                // Unassigned versions report a null or literal "None" package.
                if !name.is_empty() && name != "None" {
                    set.insert(name);
                }
            }
        }
    }
    Ok(set)
}

/// Packages enrolled in any computer PreStage.
///
/// Prestages carry package ids, not names, so each referenced id is
/// resolved to its name through the package detail endpoint.
pub async fn packages_in_prestages(transport: &Transport) -> Result<ReferenceSet> {
    let url = ObjectType::ComputerPrestage.list_url(transport.base_url());
    let response = transport
        .execute(ApiRequest::get(url))
        .await?
        .require_success("GET computer prestages")?;

    let mut set = ReferenceSet::new("prestage enrollments");
    let Some(document) = response.json::<Value>()? else {
        return Ok(set);
    };
    let Some(prestages) = document.get("results").and_then(Value::as_array) else {
        return Ok(set);
    };
    info!(total = prestages.len(), "gathering packages in prestages");
    for prestage in prestages {
        let Some(pkg_ids) = prestage.get("customPackageIds").and_then(Value::as_array) else {
            continue;
        };
        for pkg_id in pkg_ids {
            let id = match pkg_id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let detail = object_detail(transport, ObjectType::Package, &id).await?;
            if let Some(name) = value_at_path(&detail, "name").and_then(Value::as_str) {
                if !name.is_empty() {
                    set.insert(name);
                }
            }
        }
    }
    Ok(set)
}

/// Scripts named in any policy.
pub async fn scripts_in_policies(transport: &Transport) -> Result<ReferenceSet> {
    names_at_paths(transport, ObjectType::Policy, &["scripts"], "policies").await
}

/// Criterion names used by any smart computer group.
///
/// Criteria cannot distinguish extension attributes from other fields, so
/// the set holds every criterion name.
pub async fn criteria_in_computer_groups(transport: &Transport) -> Result<ReferenceSet> {
    names_at_paths(
        transport,
        ObjectType::ComputerGroup,
        &["criteria"],
        "smart group criteria",
    )
    .await
}

/// Criterion and display-field names used by any advanced computer search.
pub async fn names_in_advanced_searches(transport: &Transport) -> Result<ReferenceSet> {
    names_at_paths(
        transport,
        ObjectType::AdvancedComputerSearch,
        &["criteria", "display_fields"],
        "advanced searches",
    )
    .await
}

/// Criterion names used by any smart mobile device group.
pub async fn criteria_in_mobile_device_groups(transport: &Transport) -> Result<ReferenceSet> {
    names_at_paths(
        transport,
        ObjectType::MobileDeviceGroup,
        &["criteria"],
        "mobile smart group criteria",
    )
    .await
}

/// Criterion and display-field names used by any advanced mobile device
/// search.
pub async fn names_in_mobile_advanced_searches(transport: &Transport) -> Result<ReferenceSet> {
    names_at_paths(
        transport,
        ObjectType::AdvancedMobileDeviceSearch,
        &["criteria", "display_fields"],
        "mobile advanced searches",
    )
    .await
}

/// Computer groups targeted or excluded by the scope of the given object
/// type (policies, Mac App Store apps, configuration profiles, restricted
/// software).
///
/// Objects scoped to all computers reference no group and are skipped.
pub async fn groups_in_scoped_objects(
    transport: &Transport,
    object_type: ObjectType,
) -> Result<ReferenceSet> {
    scoped_groups(
        transport,
        object_type,
        "all_computers",
        "computer_groups",
        &format!("{object_type} scope"),
    )
    .await
}

/// Mobile device groups targeted or excluded by the scope of the given
/// mobile object type (App Store apps, configuration profiles).
pub async fn groups_in_mobile_scoped_objects(
    transport: &Transport,
    object_type: ObjectType,
) -> Result<ReferenceSet> {
    scoped_groups(
        transport,
        object_type,
        "all_mobile_devices",
        "mobile_device_groups",
        &format!("{object_type} scope"),
    )
    .await
}

async fn scoped_groups(
    transport: &Transport,
    object_type: ObjectType,
    all_key: &str,
    groups_key: &str,
    source: &str,
) -> Result<ReferenceSet> {
    let objects = list_objects(transport, object_type).await?;
    let mut set = ReferenceSet::new(source);
    info!(total = objects.len(), source, "gathering scoped groups");
    for object in &objects {
        let detail = object_detail(transport, object_type, &object.id).await?;
        let Some(scope) = value_at_path(&detail, "scope") else {
            continue;
        };
        if is_true(scope.get(all_key)) {
            continue;
        }
        insert_names_from_array(&mut set, scope.get(groups_key));
        insert_names_from_array(
            &mut set,
            scope.get("exclusions").and_then(|e| e.get(groups_key)),
        );
    }
    Ok(set)
}

/// Computer groups targeted or excluded by any patch policy.
pub async fn groups_in_patch_policies(transport: &Transport) -> Result<ReferenceSet> {
    names_at_paths(
        transport,
        ObjectType::PatchPolicy,
        &["scope/computer_groups", "scope/exclusions/computer_groups"],
        "patch policy scope",
    )
    .await
}
