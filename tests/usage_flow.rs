//! Integration tests for the usage resolver using wiremock.
//!
//! Exercise the gather phase against mocked collections and check that the
//! classification honors exact matching, vacuous empty sets, and error
//! propagation for failed gathers.

use jamf_tool::auth::Credentials;
use jamf_tool::catalog::ObjectType;
use jamf_tool::transport::Transport;
use jamf_tool::usage::{
    groups_in_scoped_objects, packages_in_patch_titles, resolve_scope_usage, resolve_usage,
    scripts_in_policies, ScopeTarget, UsageTarget,
};
use jamf_tool::workspace::Workspace;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_transport(server: &MockServer, dir: &tempfile::TempDir) -> Transport {
    let workspace = Workspace::open(dir.path().join("ws")).unwrap();
    let credentials = Credentials {
        base_url: server.uri(),
        username: "admin".to_string(),
        password: "secret".to_string(),
    };
    Transport::new(workspace, credentials, "mock-token")
}

async fn mount_listing(server: &MockServer, url_path: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── script usage, end to end ───────────────────────────────────────────

#[tokio::test]
async fn script_usage_partitions_referenced_and_orphaned() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = mock_transport(&server, &dir);

    mount_listing(
        &server,
        "/uapi/v1/scripts",
        json!({
            "results": [
                {"id": "10", "name": "install.sh"},
                {"id": "11", "name": "orphan.sh"}
            ]
        }),
    )
    .await;
    mount_listing(
        &server,
        "/JSSResource/policies",
        json!({"policies": [{"id": 1, "name": "Install things"}]}),
    )
    .await;
    mount_listing(
        &server,
        "/JSSResource/policies/id/1",
        json!({
            "policy": {
                "scripts": [{"id": 10, "name": "install.sh"}]
            }
        }),
    )
    .await;

    let report = resolve_usage(&transport, UsageTarget::Script).await.unwrap();
    assert_eq!(report.used.get("10").map(String::as_str), Some("install.sh"));
    assert_eq!(report.unused.get("11").map(String::as_str), Some("orphan.sh"));
}

// ── package usage across collections ───────────────────────────────────

#[tokio::test]
async fn package_usage_combines_policies_titles_and_prestages() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = mock_transport(&server, &dir);

    mount_listing(
        &server,
        "/JSSResource/packages",
        json!({
            "packages": [
                {"id": 1, "name": "Chrome.pkg"},
                {"id": 2, "name": "Firefox.pkg"},
                {"id": 3, "name": "Orphan.pkg"}
            ]
        }),
    )
    .await;

    // Chrome.pkg is referenced by a policy.
    mount_listing(
        &server,
        "/JSSResource/policies",
        json!({"policies": [{"id": 10, "name": "Install Chrome"}]}),
    )
    .await;
    mount_listing(
        &server,
        "/JSSResource/policies/id/10",
        json!({
            "policy": {
                "package_configuration": {
                    "packages": [{"id": 1, "name": "Chrome.pkg"}]
                }
            }
        }),
    )
    .await;

    // No patch titles.
    mount_listing(
        &server,
        "/JSSResource/patchsoftwaretitles",
        json!({"patch_software_titles": []}),
    )
    .await;

    // Firefox.pkg is enrolled through a prestage, referenced by id.
    mount_listing(
        &server,
        "/api/v2/computer-prestages",
        json!({
            "results": [
                {"id": "p1", "displayName": "Default", "customPackageIds": ["2"]}
            ]
        }),
    )
    .await;
    mount_listing(
        &server,
        "/JSSResource/packages/id/2",
        json!({"package": {"id": 2, "name": "Firefox.pkg"}}),
    )
    .await;

    let report = resolve_usage(&transport, UsageTarget::Package).await.unwrap();
    assert!(report.used.contains_key("1"), "policy reference counts");
    assert!(report.used.contains_key("2"), "prestage reference counts");
    assert_eq!(
        report.unused.get("3").map(String::as_str),
        Some("Orphan.pkg")
    );
}

#[tokio::test]
async fn patch_title_placeholder_packages_are_skipped() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = mock_transport(&server, &dir);

    mount_listing(
        &server,
        "/JSSResource/patchsoftwaretitles",
        json!({"patch_software_titles": [{"id": 5, "name": "Google Chrome"}]}),
    )
    .await;
    mount_listing(
        &server,
        "/JSSResource/patchsoftwaretitles/id/5",
        json!({
            "patch_software_title": {
                "versions": [
                    {"software_version": "120.0", "package": {"name": "Chrome-120.pkg"}},
                    {"software_version": "119.0", "package": {"name": "None"}},
                    {"software_version": "118.0", "package": {"name": ""}}
                ]
            }
        }),
    )
    .await;

    let set = packages_in_patch_titles(&transport).await.unwrap();
    assert_eq!(set.len(), 1);
    assert!(set.contains("Chrome-120.pkg"));
    assert!(!set.contains("None"));
}

// ── scope handling ─────────────────────────────────────────────────────

#[tokio::test]
async fn all_computers_scope_references_no_group() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = mock_transport(&server, &dir);

    mount_listing(
        &server,
        "/JSSResource/policies",
        json!({
            "policies": [
                {"id": 1, "name": "Everyone"},
                {"id": 2, "name": "Targeted"}
            ]
        }),
    )
    .await;
    // Scoped to all computers: its group list is ignored even if present.
    // The classic API spells the flag as a string.
    mount_listing(
        &server,
        "/JSSResource/policies/id/1",
        json!({
            "policy": {
                "scope": {
                    "all_computers": "true",
                    "computer_groups": [{"name": "Stale Group"}]
                }
            }
        }),
    )
    .await;
    mount_listing(
        &server,
        "/JSSResource/policies/id/2",
        json!({
            "policy": {
                "scope": {
                    "all_computers": false,
                    "computer_groups": [{"name": "Marketing"}],
                    "exclusions": {
                        "computer_groups": [{"name": "Executives"}]
                    }
                }
            }
        }),
    )
    .await;

    let set = groups_in_scoped_objects(&transport, ObjectType::Policy)
        .await
        .unwrap();
    assert!(set.contains("Marketing"), "targeted groups count");
    assert!(set.contains("Executives"), "excluded groups count");
    assert!(
        !set.contains("Stale Group"),
        "all-computers scope must not contribute groups"
    );
}

// ── scope-based usage ──────────────────────────────────────────────────

#[tokio::test]
async fn policy_scoped_to_nothing_is_unused() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = mock_transport(&server, &dir);

    mount_listing(
        &server,
        "/JSSResource/policies",
        json!({
            "policies": [
                {"id": 1, "name": "Everyone"},
                {"id": 2, "name": "Targeted"},
                {"id": 3, "name": "Orphaned"}
            ]
        }),
    )
    .await;
    mount_listing(
        &server,
        "/JSSResource/policies/id/1",
        json!({"policy": {"scope": {"all_computers": true, "computer_groups": []}}}),
    )
    .await;
    mount_listing(
        &server,
        "/JSSResource/policies/id/2",
        json!({
            "policy": {
                "scope": {
                    "all_computers": false,
                    "computer_groups": [{"name": "Marketing"}]
                }
            }
        }),
    )
    .await;
    // Only excluded, never targeted: deploys to nothing.
    mount_listing(
        &server,
        "/JSSResource/policies/id/3",
        json!({
            "policy": {
                "scope": {
                    "all_computers": false,
                    "computer_groups": [],
                    "exclusions": {"computer_groups": [{"name": "Executives"}]}
                }
            }
        }),
    )
    .await;

    let report = resolve_scope_usage(&transport, ScopeTarget::Policy)
        .await
        .unwrap();
    assert!(report.used.contains_key("1"), "all-computers policy is used");
    assert!(report.used.contains_key("2"), "group-scoped policy is used");
    assert_eq!(report.unused.get("3").map(String::as_str), Some("Orphaned"));
}

#[tokio::test]
async fn mobile_profile_scope_uses_mobile_device_keys() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = mock_transport(&server, &dir);

    mount_listing(
        &server,
        "/JSSResource/mobiledeviceconfigurationprofiles",
        json!({
            "configuration_profiles": [
                {"id": 1, "name": "Wifi"},
                {"id": 2, "name": "Empty"}
            ]
        }),
    )
    .await;
    mount_listing(
        &server,
        "/JSSResource/mobiledeviceconfigurationprofiles/id/1",
        json!({
            "configuration_profile": {
                "scope": {"all_mobile_devices": true, "mobile_device_groups": []}
            }
        }),
    )
    .await;
    mount_listing(
        &server,
        "/JSSResource/mobiledeviceconfigurationprofiles/id/2",
        json!({
            "configuration_profile": {
                "scope": {"all_mobile_devices": false, "mobile_device_groups": []}
            }
        }),
    )
    .await;

    let report = resolve_scope_usage(&transport, ScopeTarget::MobileDeviceProfile)
        .await
        .unwrap();
    assert!(report.used.contains_key("1"));
    assert!(report.unused.contains_key("2"));
}

// ── error propagation ──────────────────────────────────────────────────

#[tokio::test]
async fn failed_gather_propagates_instead_of_reporting_unused() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = mock_transport(&server, &dir);

    Mock::given(method("GET"))
        .and(path("/JSSResource/policies"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    // A broken collection must never silently classify everything as
    // unused: the error surfaces to the caller.
    let result = scripts_in_policies(&transport).await;
    assert!(result.is_err());
}
