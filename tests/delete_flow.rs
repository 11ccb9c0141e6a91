//! Integration tests for the delete executor using wiremock.
//!
//! Verify the retry/stop taxonomy end to end: terminal statuses stop after
//! one request, unclassified statuses retry up to five times with linear
//! backoff, and a recovery mid-loop stops the loop.

use std::sync::Mutex;
use std::time::Duration;

use jamf_tool::auth::Credentials;
use jamf_tool::catalog::ObjectType;
use jamf_tool::delete::{delete_object, Sleeper, MAX_DELETE_ATTEMPTS};
use jamf_tool::transport::Transport;
use jamf_tool::workspace::Workspace;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sleeper that records requested delays instead of waiting.
#[derive(Default)]
struct RecordingSleeper {
    slept: Mutex<Vec<u64>>,
}

impl RecordingSleeper {
    fn seconds(&self) -> Vec<u64> {
        self.slept.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration.as_secs());
    }
}

fn mock_transport(server: &MockServer, dir: &tempfile::TempDir) -> Transport {
    let workspace = Workspace::open(dir.path().join("ws")).unwrap();
    let credentials = Credentials {
        base_url: server.uri(),
        username: "admin".to_string(),
        password: "secret".to_string(),
    };
    Transport::new(workspace, credentials, "mock-token")
}

#[tokio::test]
async fn success_stops_after_one_attempt() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = mock_transport(&server, &dir);
    let sleeper = RecordingSleeper::default();

    Mock::given(method("DELETE"))
        .and(path("/JSSResource/packages/id/12"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let status = delete_object(&transport, ObjectType::Package, "12", &sleeper)
        .await
        .unwrap();
    assert_eq!(status.as_u16(), 200);
    assert!(sleeper.seconds().is_empty(), "success must not back off");
}

#[tokio::test]
async fn conflict_stops_immediately_without_retry() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = mock_transport(&server, &dir);
    let sleeper = RecordingSleeper::default();

    Mock::given(method("DELETE"))
        .and(path("/JSSResource/computergroups/id/4"))
        .respond_with(ResponseTemplate::new(409))
        .expect(1)
        .mount(&server)
        .await;

    let status = delete_object(&transport, ObjectType::ComputerGroup, "4", &sleeper)
        .await
        .unwrap();
    assert_eq!(status.as_u16(), 409);
    assert!(sleeper.seconds().is_empty());
}

#[tokio::test]
async fn not_found_stops_immediately() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = mock_transport(&server, &dir);
    let sleeper = RecordingSleeper::default();

    Mock::given(method("DELETE"))
        .and(path("/JSSResource/packages/id/999"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let status = delete_object(&transport, ObjectType::Package, "999", &sleeper)
        .await
        .unwrap();
    assert_eq!(status.as_u16(), 404);
    assert!(sleeper.seconds().is_empty());
}

#[tokio::test]
async fn permission_denial_stops_immediately() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = mock_transport(&server, &dir);
    let sleeper = RecordingSleeper::default();

    Mock::given(method("DELETE"))
        .and(path("/uapi/v1/scripts/17"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let status = delete_object(&transport, ObjectType::Script, "17", &sleeper)
        .await
        .unwrap();
    assert_eq!(status.as_u16(), 401);
    assert!(sleeper.seconds().is_empty());
}

#[tokio::test]
async fn unclassified_status_retries_five_times_with_linear_backoff() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = mock_transport(&server, &dir);
    let sleeper = RecordingSleeper::default();

    Mock::given(method("DELETE"))
        .and(path("/JSSResource/packages/id/12"))
        .respond_with(ResponseTemplate::new(500))
        .expect(u64::from(MAX_DELETE_ATTEMPTS))
        .mount(&server)
        .await;

    let status = delete_object(&transport, ObjectType::Package, "12", &sleeper)
        .await
        .unwrap();
    assert_eq!(status.as_u16(), 500, "last observed status is reported");
    // One sleep after every failed attempt, growing linearly.
    assert_eq!(sleeper.seconds(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn recovery_mid_loop_stops_the_retries() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = mock_transport(&server, &dir);
    let sleeper = RecordingSleeper::default();

    // First attempt hits a bad gateway, the second succeeds.
    Mock::given(method("DELETE"))
        .and(path("/JSSResource/packages/id/12"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/JSSResource/packages/id/12"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let status = delete_object(&transport, ObjectType::Package, "12", &sleeper)
        .await
        .unwrap();
    assert_eq!(status.as_u16(), 200);
    assert_eq!(sleeper.seconds(), vec![1], "one backoff before the retry");
}
