//! Explicit temp workspace holding per-run HTTP artifacts.
//!
//! A `Workspace` owns a directory containing:
//!
//! - the **cookie jar**: the last sticky-session cookie captured from a
//!   response, reattached to every subsequent request so that all calls in
//!   a run land on the same backend node behind a load balancer;
//! - the most recent response **headers** and **body**, persisted for
//!   postmortem inspection after a failed run.
//!
//! Creation is idempotent: constructing a `Workspace` over an existing
//! directory succeeds and reuses it. The design assumes a single process
//! per workspace path; two concurrent instances sharing a path will race on
//! the cookie jar, and nothing here prevents that.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Header/cookie marker used by the load balancer for session stickiness.
pub const SESSION_COOKIE_MARKER: &str = "APBALANCEID";

const COOKIE_JAR_FILE: &str = "cookie_jar.txt";
const HEADERS_FILE: &str = "last_response_headers.txt";
const BODY_FILE: &str = "last_response_body.txt";

/// A directory scoped to one run of the tool, created idempotently.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Opens (or creates) a workspace rooted at `root`. Succeeds if the
    /// directory already exists.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Workspace { root })
    }

    /// The default workspace location under the system temp directory.
    pub fn default_root() -> PathBuf {
        std::env::temp_dir().join("jamf_tool")
    }

    /// The workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cookie_jar_path(&self) -> PathBuf {
        self.root.join(COOKIE_JAR_FILE)
    }

    /// Returns the persisted sticky-session cookie as a `name=value` pair,
    /// or `None` when no session has been captured yet.
    pub fn session_cookie(&self) -> Option<String> {
        let contents = fs::read_to_string(self.cookie_jar_path()).ok()?;
        for line in contents.lines() {
            if line.contains(SESSION_COOKIE_MARKER) {
                // The jar stores the raw Set-Cookie value; the cookie pair
                // is everything before the first attribute separator.
                let pair = line.split(';').next()?.trim();
                if !pair.is_empty() {
                    debug!(cookie = pair, "existing session cookie found");
                    return Some(pair.to_string());
                }
            }
        }
        None
    }

    /// Persists a sticky-session cookie from a response's `Set-Cookie`
    /// value. Values without the session marker are ignored.
    pub fn store_session_cookie(&self, set_cookie: &str) -> Result<()> {
        if !set_cookie.contains(SESSION_COOKIE_MARKER) {
            return Ok(());
        }
        fs::write(self.cookie_jar_path(), set_cookie)?;
        debug!("session cookie persisted to jar");
        Ok(())
    }

    /// Records the most recent response's headers and body for inspection.
    pub fn record_response(&self, headers: &str, body: &str) -> Result<()> {
        fs::write(self.root.join(HEADERS_FILE), headers)?;
        fs::write(self.root.join(BODY_FILE), body)?;
        Ok(())
    }

    /// Removes the workspace directory and everything in it.
    pub fn clear(self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::open(dir.path().join("ws")).unwrap();
        (dir, ws)
    }

    #[test]
    fn open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ws");
        Workspace::open(&path).unwrap();
        // Opening again over the existing directory must not fail.
        Workspace::open(&path).unwrap();
    }

    #[test]
    fn cookie_round_trips_through_jar() {
        let (_dir, ws) = temp_workspace();
        assert!(ws.session_cookie().is_none(), "fresh jar must be empty");

        ws.store_session_cookie("APBALANCEID=balancer.node17; Path=/; HttpOnly")
            .unwrap();
        assert_eq!(
            ws.session_cookie().as_deref(),
            Some("APBALANCEID=balancer.node17")
        );
    }

    #[test]
    fn unrelated_cookies_are_not_persisted() {
        let (_dir, ws) = temp_workspace();
        ws.store_session_cookie("JSESSIONID=abc; Path=/").unwrap();
        assert!(ws.session_cookie().is_none());
    }

    #[test]
    fn later_cookie_replaces_earlier_one() {
        let (_dir, ws) = temp_workspace();
        ws.store_session_cookie("APBALANCEID=node1; Path=/").unwrap();
        ws.store_session_cookie("APBALANCEID=node2; Path=/").unwrap();
        assert_eq!(ws.session_cookie().as_deref(), Some("APBALANCEID=node2"));
    }

    #[test]
    fn record_response_writes_artifacts() {
        let (_dir, ws) = temp_workspace();
        ws.record_response("HTTP/1.1 200 OK", "{\"ok\":true}").unwrap();
        let headers = fs::read_to_string(ws.root().join(HEADERS_FILE)).unwrap();
        assert!(headers.contains("200 OK"));
    }

    #[test]
    fn clear_removes_the_directory() {
        let (_dir, ws) = temp_workspace();
        let root = ws.root().to_path_buf();
        ws.clear().unwrap();
        assert!(!root.exists());
    }
}
