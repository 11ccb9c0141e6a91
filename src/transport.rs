//! Retrying HTTP transport for the Jamf Pro API.
//!
//! `Transport` is the single point every higher layer calls through. For
//! each request it:
//!
//! - selects the authentication scheme from the URL (Basic for the token
//!   endpoint, nothing for the external webhook host, Bearer otherwise);
//! - negotiates content: GET/DELETE carry an `Accept` header per the
//!   caller's declared kind, POST/PUT bodies are JSON for the modern API
//!   and XML for the classic API, file uploads go as multipart form data,
//!   and webhook posts are always JSON;
//! - maintains load-balancer session affinity: a sticky cookie captured
//!   from any response is persisted to the [`Workspace`] jar and attached
//!   to every subsequent request in the run;
//! - records the response headers and body to the workspace;
//! - classifies the status code into the small retry/stop taxonomy
//!   ([`Outcome`]) that the delete executor and fetch helpers act on.
//!
//! A reqwest-level failure (DNS, TCP, TLS, timeout) surfaces as
//! `ToolError::Network`, which is distinct from any HTTP status: callers
//! propagate it rather than retrying, so a systemic outage is not masked.
//! An empty body on an otherwise successful response means "no data", not
//! an error.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::Credentials;
use crate::error::{Result, ToolError};
use crate::workspace::{Workspace, SESSION_COOKIE_MARKER};

/// External chat-webhook host. Requests to it carry no authorization
/// header; the webhook URL itself is the secret.
pub const WEBHOOK_HOST: &str = "hooks.slack.com";

/// Connect timeout for API calls. Covers TCP + TLS handshake only.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout. Full listings of large collections can run
/// long on busy instances, so this is deliberately generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Which representation a GET/DELETE asks the server for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptKind {
    /// `Accept: application/json`. Both API generations serve JSON.
    Json,
    /// `Accept: application/xml`. Classic-API callers that need the XML
    /// representation ask for it explicitly.
    Xml,
}

/// Request payload variants the transport knows how to send.
#[derive(Debug)]
pub enum RequestBody {
    /// JSON document, for modern-API and webhook posts.
    Json(serde_json::Value),
    /// XML document, for classic-API posts.
    Xml(String),
    /// File upload as `multipart/form-data` with a `name` part.
    FileUpload(PathBuf),
}

/// One fully-formed request to execute.
#[derive(Debug)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Representation requested on GET/DELETE.
    pub accept: AcceptKind,
    /// Optional payload for POST/PUT.
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    /// GET asking for JSON.
    pub fn get(url: impl Into<String>) -> Self {
        ApiRequest {
            method: Method::GET,
            url: url.into(),
            accept: AcceptKind::Json,
            body: None,
        }
    }

    /// GET asking for XML. The classic API's native representation;
    /// needed when a caller wants the exact XML the server would accept
    /// back on a PUT, rather than the JSON projection.
    pub fn get_xml(url: impl Into<String>) -> Self {
        ApiRequest {
            accept: AcceptKind::Xml,
            ..ApiRequest::get(url)
        }
    }

    /// DELETE (JSON accept; delete responses carry no meaningful body).
    pub fn delete(url: impl Into<String>) -> Self {
        ApiRequest {
            method: Method::DELETE,
            url: url.into(),
            accept: AcceptKind::Json,
            body: None,
        }
    }

    /// POST with a JSON body (modern API, and all webhook posts).
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        ApiRequest {
            method: Method::POST,
            url: url.into(),
            accept: AcceptKind::Json,
            body: Some(RequestBody::Json(body)),
        }
    }

    /// PUT with an XML body. Classic-API writes (renames, scope edits)
    /// only accept XML; modern-API writes go through [`ApiRequest::post_json`].
    pub fn put_xml(url: impl Into<String>, body: String) -> Self {
        ApiRequest {
            method: Method::PUT,
            url: url.into(),
            accept: AcceptKind::Xml,
            body: Some(RequestBody::Xml(body)),
        }
    }

    /// POST uploading a file as multipart form data. Used for the
    /// server's package/icon upload endpoints, which take form data
    /// instead of a document body.
    pub fn upload(url: impl Into<String>, file: PathBuf) -> Self {
        ApiRequest {
            method: Method::POST,
            url: url.into(),
            accept: AcceptKind::Json,
            body: Some(RequestBody::FileUpload(file)),
        }
    }
}

/// Caller-visible classification of a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 200/201/204: the operation took effect.
    Success,
    /// 409: terminal; reported as a warning.
    Conflict,
    /// 404: terminal; reported as a warning.
    NotFound,
    /// 401: terminal; reported as an error.
    Permission,
    /// Anything else: the caller may retry.
    Transient,
}

impl Outcome {
    /// Whether this outcome terminates a retry loop.
    pub fn is_stop(self) -> bool {
        !matches!(self, Outcome::Transient)
    }
}

/// Maps a status code onto the retry/stop taxonomy.
pub fn classify(status: StatusCode) -> Outcome {
    match status.as_u16() {
        200 | 201 | 204 => Outcome::Success,
        409 => Outcome::Conflict,
        404 => Outcome::NotFound,
        401 => Outcome::Permission,
        _ => Outcome::Transient,
    }
}

/// One executed response: status, headers, and the body text (if any).
#[derive(Debug)]
pub struct Response {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers as name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Body text; `None` when the server sent nothing.
    pub body: Option<String>,
}

impl Response {
    /// The classification of this response's status.
    pub fn outcome(&self) -> Outcome {
        classify(self.status)
    }

    /// Deserializes the JSON body. `Ok(None)` when the body is empty —
    /// an empty body on a successful status means "no data".
    pub fn json<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.body {
            Some(text) => Ok(Some(serde_json::from_str(text)?)),
            None => Ok(None),
        }
    }

    /// Converts a non-success classification into the matching typed
    /// error, passing the response through unchanged on success.
    pub fn require_success(self, context: &str) -> Result<Response> {
        match self.outcome() {
            Outcome::Success => Ok(self),
            Outcome::Conflict => Err(ToolError::Conflict {
                context: context.to_string(),
            }),
            Outcome::NotFound => Err(ToolError::NotFound {
                context: context.to_string(),
            }),
            Outcome::Permission => Err(ToolError::Permission {
                context: context.to_string(),
            }),
            Outcome::Transient => Err(ToolError::Transient {
                status: self.status.as_u16(),
                context: context.to_string(),
            }),
        }
    }
}

/// Which authorization the transport attaches, derived from the URL.
#[derive(Debug, PartialEq, Eq)]
enum AuthMode {
    Bearer,
    Basic,
    None,
}

fn auth_mode(url: &str) -> AuthMode {
    if url.contains(WEBHOOK_HOST) {
        AuthMode::None
    } else if url.contains("/token") {
        // Token acquisition itself cannot use a bearer token.
        AuthMode::Basic
    } else {
        AuthMode::Bearer
    }
}

/// Executes structured requests against one server instance.
///
/// Holds the HTTP client, the bearer token for the run, the Basic
/// credentials (needed only by the token endpoint), and the workspace that
/// persists session-affinity state. All access is sequential; the
/// workspace cookie is read before and written after every call.
pub struct Transport {
    client: Client,
    credentials: Credentials,
    token: String,
    workspace: Workspace,
}

impl Transport {
    /// Creates a transport over the given workspace.
    pub fn new(workspace: Workspace, credentials: Credentials, token: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Transport {
            client,
            credentials,
            token: token.into(),
            workspace,
        }
    }

    /// The server base URL this transport talks to.
    pub fn base_url(&self) -> &str {
        &self.credentials.base_url
    }

    /// Executes one request and returns the classified response.
    ///
    /// Transport-level failures surface as `ToolError::Network`; any HTTP
    /// status, including non-2xx, produces an `Ok(Response)` so callers
    /// can apply the retry/stop taxonomy themselves.
    pub async fn execute(&self, request: ApiRequest) -> Result<Response> {
        let ApiRequest {
            method,
            url,
            accept,
            body,
        } = request;

        let mut req = self.client.request(method.clone(), &url);

        req = match auth_mode(&url) {
            AuthMode::Bearer => req.bearer_auth(&self.token),
            AuthMode::Basic => {
                req.basic_auth(&self.credentials.username, Some(&self.credentials.password))
            }
            AuthMode::None => req,
        };

        if method == Method::GET || method == Method::DELETE {
            let accept_value = match accept {
                AcceptKind::Json => "application/json",
                AcceptKind::Xml => "application/xml",
            };
            req = req.header(ACCEPT, accept_value);
        }

        match body {
            Some(RequestBody::Json(value)) => {
                req = req.json(&value);
            }
            Some(RequestBody::Xml(text)) => {
                req = req.header(CONTENT_TYPE, "application/xml").body(text);
            }
            Some(RequestBody::FileUpload(path)) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let bytes = std::fs::read(&path)?;
                let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                req = req.multipart(reqwest::multipart::Form::new().part("name", part));
            }
            None => {}
        }

        // Reattach any sticky-session cookie captured earlier in the run so
        // the load balancer keeps routing us to the same backend node.
        if let Some(cookie) = self.workspace.session_cookie() {
            req = req.header(COOKIE, cookie);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let headers: Vec<(String, String)> = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        for (name, value) in &headers {
            if name.eq_ignore_ascii_case("set-cookie") && value.contains(SESSION_COOKIE_MARKER) {
                self.workspace.store_session_cookie(value)?;
            }
        }

        let text = resp.text().await?;
        let headers_text = headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\n");
        self.workspace.record_response(&headers_text, &text)?;

        debug!(%method, %url, status = status.as_u16(), "request executed");

        let body = if text.is_empty() { None } else { Some(text) };
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_the_status_taxonomy() {
        assert_eq!(classify(StatusCode::OK), Outcome::Success);
        assert_eq!(classify(StatusCode::CREATED), Outcome::Success);
        assert_eq!(classify(StatusCode::NO_CONTENT), Outcome::Success);
        assert_eq!(classify(StatusCode::CONFLICT), Outcome::Conflict);
        assert_eq!(classify(StatusCode::NOT_FOUND), Outcome::NotFound);
        assert_eq!(classify(StatusCode::UNAUTHORIZED), Outcome::Permission);
        assert_eq!(classify(StatusCode::INTERNAL_SERVER_ERROR), Outcome::Transient);
        assert_eq!(classify(StatusCode::BAD_GATEWAY), Outcome::Transient);
        assert_eq!(classify(StatusCode::FORBIDDEN), Outcome::Transient);
    }

    #[test]
    fn stop_outcomes_are_everything_but_transient() {
        assert!(Outcome::Success.is_stop());
        assert!(Outcome::Conflict.is_stop());
        assert!(Outcome::NotFound.is_stop());
        assert!(Outcome::Permission.is_stop());
        assert!(!Outcome::Transient.is_stop());
    }

    #[test]
    fn auth_mode_selection() {
        assert_eq!(
            auth_mode("https://jamf.example.com/JSSResource/policies"),
            AuthMode::Bearer
        );
        assert_eq!(
            auth_mode("https://jamf.example.com/api/v1/auth/token"),
            AuthMode::Basic
        );
        assert_eq!(
            auth_mode("https://hooks.slack.com/services/T000/B000/XXXX"),
            AuthMode::None
        );
    }

    #[test]
    fn empty_body_is_no_data_not_an_error() {
        let resp = Response {
            status: StatusCode::NO_CONTENT,
            headers: vec![],
            body: None,
        };
        let parsed: Option<serde_json::Value> = resp.json().unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn require_success_maps_statuses_to_typed_errors() {
        let make = |status| Response {
            status,
            headers: vec![],
            body: None,
        };
        assert!(make(StatusCode::OK).require_success("op").is_ok());
        assert!(matches!(
            make(StatusCode::CONFLICT).require_success("op"),
            Err(ToolError::Conflict { .. })
        ));
        assert!(matches!(
            make(StatusCode::NOT_FOUND).require_success("op"),
            Err(ToolError::NotFound { .. })
        ));
        assert!(matches!(
            make(StatusCode::UNAUTHORIZED).require_success("op"),
            Err(ToolError::Permission { .. })
        ));
        assert!(matches!(
            make(StatusCode::SERVICE_UNAVAILABLE).require_success("op"),
            Err(ToolError::Transient { status: 503, .. })
        ));
    }
}
