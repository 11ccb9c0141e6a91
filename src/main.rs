//! CLI entry point for jamf-tool — a Jamf Pro administration client.
//!
//! Acquires a bearer token from the server, then dispatches on the selected
//! object type and mode: list everything, search names, classify
//! used/unused, or run the interactive deletion flow.
//!
//! Exit codes:
//! - 0: success
//! - 1: runtime error (auth failure, API error, unsupported mode)
//! - 2: argument validation error (clap handles this automatically)

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use jamf_tool::auth::{Credentials, TokenProvider};
use jamf_tool::catalog::ObjectType;
use jamf_tool::delete::TokioSleeper;
use jamf_tool::error::{Result, ToolError};
use jamf_tool::fetch::{filter_by_substring, list_objects, policies_in_category, Resource};
use jamf_tool::inventory::{computer_checkin_report, STALE_AFTER_DAYS};
use jamf_tool::orchestrate::{
    run_deletions, InteractiveConfirmer, NoShareCleaner, RunSummary, SlackNotifier,
};
use jamf_tool::report::write_csv;
use jamf_tool::transport::Transport;
use jamf_tool::usage::{resolve_scope_usage, resolve_usage, ScopeTarget, UsageTarget};
use jamf_tool::workspace::Workspace;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server base URL, e.g. https://example.jamfcloud.com.
    #[arg(long, env = "JSS_URL")]
    url: String,

    /// API account username.
    #[arg(long, env = "JSS_USER")]
    user: String,

    /// API account password. Prefer setting via the JSS_PASSWORD
    /// environment variable to keep the secret out of process listings
    /// and shell history.
    #[arg(long = "pass", env = "JSS_PASSWORD")]
    password: String,

    #[command(flatten)]
    target: TargetFlags,

    /// List every object of the selected type (the default mode).
    #[arg(long)]
    all: bool,

    /// Keep only objects whose name contains one of these terms.
    #[arg(long, num_args = 1..)]
    search: Vec<String>,

    /// Restrict the listing to policies in one category (policies only).
    #[arg(long)]
    category: Option<String>,

    /// Classify objects as used or unused by scanning every collection
    /// that can reference them.
    #[arg(long)]
    unused: bool,

    /// Offer the selected objects for deletion, with interactive
    /// confirmation. Combined with --unused, offers the unused set.
    #[arg(long)]
    delete: bool,

    /// Write the results to a CSV file at this path.
    #[arg(long)]
    csv: Option<std::path::PathBuf>,

    /// Incoming-webhook URL for delete notifications.
    #[arg(long, env = "SLACK_WEBHOOK")]
    slack_webhook: Option<String>,
}

/// Object-type flags — exactly one must be set per invocation, enforced by
/// clap at parse time via the `group` attribute.
#[derive(clap::Args)]
#[group(required = true, multiple = false)]
struct TargetFlags {
    /// Operate on policies.
    #[arg(long)]
    policies: bool,

    /// Operate on computer inventory records.
    #[arg(long)]
    computers: bool,

    /// Operate on packages.
    #[arg(long)]
    packages: bool,

    /// Operate on scripts.
    #[arg(long)]
    scripts: bool,

    /// Operate on computer extension attributes.
    #[arg(long)]
    ea: bool,

    /// Operate on computer groups.
    #[arg(long)]
    groups: bool,

    /// Operate on mobile device groups.
    #[arg(long = "ios-groups")]
    ios_groups: bool,

    /// Operate on macOS configuration profiles.
    #[arg(long)]
    profiles: bool,

    /// Operate on mobile device configuration profiles.
    #[arg(long = "ios-profiles")]
    ios_profiles: bool,

    /// Operate on advanced computer searches.
    #[arg(long = "advanced-searches")]
    advanced_searches: bool,
}

impl TargetFlags {
    fn object_type(&self) -> ObjectType {
        if self.policies {
            ObjectType::Policy
        } else if self.computers {
            ObjectType::Computer
        } else if self.packages {
            ObjectType::Package
        } else if self.scripts {
            ObjectType::Script
        } else if self.ea {
            ObjectType::ExtensionAttribute
        } else if self.groups {
            ObjectType::ComputerGroup
        } else if self.ios_groups {
            ObjectType::MobileDeviceGroup
        } else if self.profiles {
            ObjectType::OsxConfigurationProfile
        } else if self.ios_profiles {
            ObjectType::MobileDeviceConfigurationProfile
        } else {
            ObjectType::AdvancedComputerSearch
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let object_type = args.target.object_type();

    if args.unused
        && UsageTarget::for_object_type(object_type).is_none()
        && ScopeTarget::for_object_type(object_type).is_none()
    {
        eprintln!("Error: usage analysis is not available for {object_type}");
        return ExitCode::FAILURE;
    }

    match run(&args, object_type).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Cli, object_type: ObjectType) -> Result<()> {
    let credentials = Credentials {
        base_url: args.url.clone(),
        username: args.user.clone(),
        password: args.password.clone(),
    };

    let mut provider = TokenProvider::new(credentials.clone());
    provider.refresh_token().await?;
    let token = provider.token().ok_or_else(|| ToolError::Auth {
        message: "no token available after refresh".to_string(),
        source: None,
    })?;

    let workspace = Workspace::open(Workspace::default_root())?;
    let transport = Transport::new(workspace, credentials, token);

    if args.unused {
        return run_usage(args, object_type, &transport).await;
    }

    if object_type == ObjectType::Computer && args.all {
        return run_checkins(args, &transport).await;
    }

    let mut resources = match (&args.category, object_type) {
        (Some(category), ObjectType::Policy) => {
            policies_in_category(&transport, category).await?
        }
        _ => list_objects(&transport, object_type).await?,
    };

    if !args.search.is_empty() {
        resources = filter_by_substring(&resources, &args.search);
    }

    println!("{} {object_type} object(s):", resources.len());
    for resource in &resources {
        println!("{:>8}  {}", resource.id, resource.name);
    }

    if let Some(path) = &args.csv {
        let rows = resources
            .iter()
            .map(|r| vec![r.id.clone(), r.name.clone()]);
        write_csv(path, &["id", "name"], rows)?;
    }

    if args.delete {
        let summary = delete_flow(args, object_type, &transport, &resources).await?;
        print_summary(&summary);
    }

    Ok(())
}

async fn run_checkins(args: &Cli, transport: &Transport) -> Result<()> {
    let now = chrono::Utc::now().naive_utc();
    let report = computer_checkin_report(transport, now).await?;

    println!(
        "{} computer(s) checked in within the past {STALE_AFTER_DAYS} days:",
        report.recent.len()
    );
    for record in &report.recent {
        print_checkin(record, now);
    }
    println!(
        "{} stale computer(s) (no check-in for {STALE_AFTER_DAYS}+ days):",
        report.stale.len()
    );
    for record in &report.stale {
        print_checkin(record, now);
    }

    if let Some(path) = &args.csv {
        let rows = report.recent.iter().chain(report.stale.iter()).map(|r| {
            vec![
                r.id.clone(),
                r.name.clone(),
                r.os_version.clone(),
                r.enrolled_via_dep.to_string(),
                r.days_since_contact(now)
                    .map_or_else(|| "unknown".to_string(), |d| d.to_string()),
            ]
        });
        write_csv(
            path,
            &["id", "name", "os_version", "enrolled_via_dep", "days_since_contact"],
            rows,
        )?;
    }

    Ok(())
}

fn print_checkin(record: &jamf_tool::inventory::ComputerRecord, now: chrono::NaiveDateTime) {
    let seen = record
        .days_since_contact(now)
        .map_or_else(|| "unknown".to_string(), |d| format!("{d} days ago"));
    println!(
        "{:>8}  {}  {}  dep: {}  seen: {}",
        record.id, record.name, record.os_version, record.enrolled_via_dep, seen
    );
}

async fn run_usage(args: &Cli, object_type: ObjectType, transport: &Transport) -> Result<()> {
    // Availability checked in main before dispatch.
    let report = if let Some(target) = UsageTarget::for_object_type(object_type) {
        resolve_usage(transport, target).await?
    } else if let Some(target) = ScopeTarget::for_object_type(object_type) {
        resolve_scope_usage(transport, target).await?
    } else {
        return Ok(());
    };

    println!("Used {object_type} objects ({}):", report.used.len());
    for (id, name) in &report.used {
        println!("{id:>8}  {name}");
    }
    println!("Unused {object_type} objects ({}):", report.unused.len());
    for (id, name) in &report.unused {
        println!("{id:>8}  {name}");
    }

    if let Some(path) = &args.csv {
        let rows = report
            .used
            .iter()
            .map(|(id, name)| vec![id.clone(), name.clone(), "used".to_string()])
            .chain(
                report
                    .unused
                    .iter()
                    .map(|(id, name)| vec![id.clone(), name.clone(), "unused".to_string()]),
            );
        write_csv(path, &["id", "name", "status"], rows)?;
    }

    if args.delete {
        let candidates: Vec<Resource> = report
            .unused
            .iter()
            .map(|(id, name)| Resource {
                id: id.clone(),
                name: name.clone(),
                object_type,
            })
            .collect();
        let summary = delete_flow(args, object_type, transport, &candidates).await?;
        print_summary(&summary);
    }

    Ok(())
}

async fn delete_flow(
    args: &Cli,
    object_type: ObjectType,
    transport: &Transport,
    candidates: &[Resource],
) -> Result<RunSummary> {
    let mut confirmer = InteractiveConfirmer;
    let notifier = SlackNotifier::new(
        args.slack_webhook.clone(),
        args.url.clone(),
        args.user.clone(),
    );
    run_deletions(
        transport,
        object_type,
        candidates,
        &mut confirmer,
        &TokioSleeper,
        &notifier,
        &NoShareCleaner,
    )
    .await
}

fn print_summary(summary: &RunSummary) {
    if summary.aborted {
        println!("Deletion run aborted; no further objects were touched.");
    }
    for deleted in &summary.deleted {
        println!(
            "deleted {:>8}  {} (HTTP {})",
            deleted.id, deleted.name, deleted.status
        );
    }
    if !summary.skipped.is_empty() {
        println!("skipped: {}", summary.skipped.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Base arguments that satisfy all mandatory fields.
    fn base_args() -> Vec<&'static str> {
        vec![
            "jamf-tool",
            "--url",
            "https://jamf.example.com",
            "--user",
            "admin",
            "--pass",
            "secret",
        ]
    }

    #[test]
    fn missing_object_type_flag_is_rejected() {
        let result = Cli::try_parse_from(base_args());
        assert!(
            result.is_err(),
            "parsing should fail when no object-type flag is provided"
        );
    }

    #[test]
    fn conflicting_object_type_flags_are_rejected() {
        let mut args = base_args();
        args.extend_from_slice(&["--packages", "--scripts"]);
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn each_flag_maps_to_its_object_type() {
        let cases = [
            ("--policies", ObjectType::Policy),
            ("--computers", ObjectType::Computer),
            ("--packages", ObjectType::Package),
            ("--scripts", ObjectType::Script),
            ("--ea", ObjectType::ExtensionAttribute),
            ("--groups", ObjectType::ComputerGroup),
            ("--ios-groups", ObjectType::MobileDeviceGroup),
            ("--profiles", ObjectType::OsxConfigurationProfile),
            (
                "--ios-profiles",
                ObjectType::MobileDeviceConfigurationProfile,
            ),
            ("--advanced-searches", ObjectType::AdvancedComputerSearch),
        ];
        for (flag, expected) in cases {
            let mut args = base_args();
            args.push(flag);
            let cli = Cli::try_parse_from(args).unwrap();
            assert_eq!(cli.target.object_type(), expected, "flag {flag}");
        }
    }

    #[test]
    fn search_collects_multiple_terms() {
        let mut args = base_args();
        args.extend_from_slice(&["--packages", "--search", "Chrome", "Firefox"]);
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.search, vec!["Chrome", "Firefox"]);
    }

    #[test]
    fn unused_and_delete_combine() {
        let mut args = base_args();
        args.extend_from_slice(&["--packages", "--unused", "--delete"]);
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.unused);
        assert!(cli.delete);
    }

    #[test]
    fn csv_path_is_optional() {
        let mut args = base_args();
        args.extend_from_slice(&["--packages", "--csv", "/tmp/report.csv"]);
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(
            cli.csv.as_ref().unwrap().to_str().unwrap(),
            "/tmp/report.csv"
        );
    }
}
