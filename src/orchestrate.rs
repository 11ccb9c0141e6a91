//! Deletion orchestrator: confirmation flow around bulk deletes.
//!
//! The flow over a candidate list:
//!
//! 1. One bulk prompt ("delete all?"). Yes skips every later prompt.
//! 2. If bulk was declined, an optional allow-list of ids narrows what the
//!    per-item prompts will even offer. A blank allow-list means no
//!    narrowing.
//! 3. Per item: allowed candidates get an individual yes/no/quit prompt.
//!    Quit abandons the rest of the run immediately; already-performed
//!    deletes stay done.
//!
//! Each confirmed delete goes through the retrying executor. A deleted
//! package additionally gets its file removed from the distribution share,
//! and every delete is announced to the chat webhook. Cleanup and
//! notification failures are warnings only: the server-side delete already
//! happened and must be reported either way.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use serde_json::json;
use tracing::{info, warn};

use crate::catalog::ObjectType;
use crate::delete::{delete_object, Sleeper};
use crate::error::Result;
use crate::fetch::Resource;
use crate::transport::{classify, ApiRequest, Outcome, Transport};

/// Reply to a yes/no/quit prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// Proceed with this item (or, on the bulk prompt, with everything).
    Yes,
    /// Skip this item.
    No,
    /// Abandon the rest of the run.
    Quit,
}

/// Source of confirmation decisions.
///
/// The interactive implementation asks on the terminal; the scripted one
/// replays canned answers so flows can run unattended and be tested.
pub trait Confirmer {
    /// Answers one yes/no/quit prompt.
    fn confirm(&mut self, prompt: &str) -> Answer;

    /// Collects the allow-list of ids. An empty list means "no
    /// restriction".
    fn request_ids(&mut self, prompt: &str) -> Vec<String>;
}

/// Terminal-backed confirmer. Unrecognized input reprompts; a bare enter
/// is a No.
pub struct InteractiveConfirmer;

impl InteractiveConfirmer {
    fn read_line(&self) -> String {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            warn!("failed to read from stdin, treating as 'no'");
        }
        line.trim().to_string()
    }
}

impl Confirmer for InteractiveConfirmer {
    fn confirm(&mut self, prompt: &str) -> Answer {
        loop {
            print!("{prompt} (y/n/q) : ");
            let _ = io::stdout().flush();
            match self.read_line().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Answer::Yes,
                "n" | "no" | "" => return Answer::No,
                "q" | "quit" => return Answer::Quit,
                other => {
                    println!("'{other}' not understood, answer y, n or q");
                }
            }
        }
    }

    fn request_ids(&mut self, prompt: &str) -> Vec<String> {
        print!("{prompt} : ");
        let _ = io::stdout().flush();
        self.read_line()
            .split([' ', ','])
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Replays a fixed sequence of answers; once exhausted, every further
/// prompt is a No.
pub struct ScriptedConfirmer {
    answers: VecDeque<Answer>,
    ids: Vec<String>,
}

impl ScriptedConfirmer {
    /// Creates a confirmer replaying `answers` in order, with `ids` as the
    /// allow-list reply.
    pub fn new(answers: Vec<Answer>, ids: Vec<String>) -> Self {
        ScriptedConfirmer {
            answers: answers.into(),
            ids,
        }
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&mut self, _prompt: &str) -> Answer {
        self.answers.pop_front().unwrap_or(Answer::No)
    }

    fn request_ids(&mut self, _prompt: &str) -> Vec<String> {
        self.ids.clone()
    }
}

/// One performed delete, for notification and the run summary.
#[derive(Debug)]
pub struct DeleteEvent<'a> {
    /// Type of the deleted object.
    pub object_type: ObjectType,
    /// Display name of the deleted object.
    pub name: &'a str,
    /// Id of the deleted object.
    pub id: &'a str,
    /// The action performed, e.g. "delete".
    pub action: &'a str,
    /// Terminal HTTP status of the action.
    pub status: u16,
}

/// Announces performed deletes to an external channel.
pub trait Notifier {
    /// Reports one delete. Failures are the caller's to downgrade.
    fn notify(
        &self,
        transport: &Transport,
        event: &DeleteEvent<'_>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Posts delete announcements to a Slack-compatible incoming webhook.
///
/// Without a webhook URL every notification is a silent no-op.
pub struct SlackNotifier {
    webhook_url: Option<String>,
    instance: String,
    user: String,
}

impl SlackNotifier {
    /// Creates a notifier for the given instance URL (shown as the
    /// message username) and the API account performing the actions.
    pub fn new(
        webhook_url: Option<String>,
        instance: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        SlackNotifier {
            webhook_url,
            instance: instance.into(),
            user: user.into(),
        }
    }
}

fn slack_payload(instance: &str, user: &str, event: &DeleteEvent<'_>) -> String {
    format!(
        "*jamf-tool*\n*API {} {} action*\nUser: {}\nObject Name: *{}*\nInstance: {}\nHTTP Response: {}",
        event.object_type, event.action, user, event.name, instance, event.status
    )
}

impl Notifier for SlackNotifier {
    async fn notify(&self, transport: &Transport, event: &DeleteEvent<'_>) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            return Ok(());
        };
        let body = json!({
            "username": self.instance,
            "text": slack_payload(&self.instance, &self.user, event),
        });
        transport
            .execute(ApiRequest::post_json(url.clone(), body))
            .await?
            .require_success("POST webhook notification")?;
        Ok(())
    }
}

/// Removes deleted package files from the distribution share.
pub trait ShareCleaner {
    /// Removes one package file by name.
    fn remove_package(&self, package_name: &str) -> Result<()>;
}

/// Cleaner used when no distribution share is configured.
pub struct NoShareCleaner;

impl ShareCleaner for NoShareCleaner {
    fn remove_package(&self, package_name: &str) -> Result<()> {
        info!(package_name, "no distribution share configured, skipping file removal");
        Ok(())
    }
}

/// Outcome of one orchestrated run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Deletes that were attempted, with their terminal status.
    pub deleted: Vec<DeletedObject>,
    /// Candidates skipped by the allow-list or a No answer.
    pub skipped: Vec<String>,
    /// Whether the run was abandoned by a Quit answer.
    pub aborted: bool,
}

/// One attempted delete in the summary.
#[derive(Debug)]
pub struct DeletedObject {
    /// Object id.
    pub id: String,
    /// Object display name.
    pub name: String,
    /// Terminal HTTP status.
    pub status: u16,
}

fn is_allowed(allow: &[String], id: &str) -> bool {
    allow.is_empty() || allow.iter().any(|a| a == id)
}

/// Runs the confirmation flow and deletes the confirmed candidates.
///
/// Network-level failures abort the run with an error; per-object HTTP
/// failure statuses are recorded in the summary instead.
pub async fn run_deletions<S, C, N, P>(
    transport: &Transport,
    object_type: ObjectType,
    targets: &[Resource],
    confirmer: &mut C,
    sleeper: &S,
    notifier: &N,
    cleaner: &P,
) -> Result<RunSummary>
where
    S: Sleeper,
    C: Confirmer,
    N: Notifier,
    P: ShareCleaner,
{
    let mut summary = RunSummary::default();
    if targets.is_empty() {
        info!(%object_type, "nothing to delete");
        return Ok(summary);
    }

    let bulk = match confirmer.confirm(&format!(
        "Delete ALL {} {object_type} objects?",
        targets.len()
    )) {
        Answer::Yes => true,
        Answer::No => false,
        Answer::Quit => {
            summary.aborted = true;
            return Ok(summary);
        }
    };

    let allow = if bulk {
        Vec::new()
    } else {
        confirmer.request_ids("Ids to offer for deletion (blank for all)")
    };

    for target in targets {
        let confirmed = bulk
            || (is_allowed(&allow, &target.id) && {
                match confirmer.confirm(&format!("Delete {} (id {})?", target.name, target.id)) {
                    Answer::Yes => true,
                    Answer::No => false,
                    Answer::Quit => {
                        summary.aborted = true;
                        return Ok(summary);
                    }
                }
            });

        if !confirmed {
            summary.skipped.push(target.name.clone());
            continue;
        }

        let status = delete_object(transport, object_type, &target.id, sleeper).await?;

        if object_type == ObjectType::Package && classify(status) == Outcome::Success {
            if let Err(e) = cleaner.remove_package(&target.name) {
                warn!(package = %target.name, error = %e, "package file removal failed");
            }
        }

        let event = DeleteEvent {
            object_type,
            name: &target.name,
            id: &target.id,
            action: "delete",
            status: status.as_u16(),
        };
        if let Err(e) = notifier.notify(transport, &event).await {
            warn!(error = %e, "webhook notification failed");
        }

        summary.deleted.push(DeletedObject {
            id: target.id.clone(),
            name: target.name.clone(),
            status: status.as_u16(),
        });
    }

    Ok(summary)
}
