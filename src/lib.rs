//! Async Rust client library for administering a Jamf Pro server over its
//! REST APIs.
//!
//! Provides bearer-token authentication, a retrying transport with
//! load-balancer session affinity, listing/search over both API
//! generations, usage analysis (which packages, scripts, extension
//! attributes and groups are actually referenced), and a confirmation-gated
//! bulk deletion flow.
//!
//! # Modules
//!
//! - [`auth`] — Basic-to-bearer token exchange with expiry tracking.
//! - [`catalog`] — Static endpoint catalog mapping object types to API paths.
//! - [`delete`] — Bounded-retry DELETE executor with linear backoff.
//! - [`error`] — Typed error hierarchy (`ToolError`) for all operations.
//! - [`fetch`] — Listing, detail retrieval, and name/substring lookup.
//! - [`inventory`] — Computer check-in recency report.
//! - [`orchestrate`] — Confirmation flow, webhook notification, share cleanup.
//! - [`report`] — CSV report output.
//! - [`transport`] — Authenticated HTTP wrapper with status classification.
//! - [`usage`] — Used/unused classification against reference collections.
//! - [`workspace`] — Per-run artifact directory and sticky-session cookie jar.
//!
//! # Quick Start
//!
//! ```ignore
//! use jamf_tool::auth::{Credentials, TokenProvider};
//! use jamf_tool::catalog::ObjectType;
//! use jamf_tool::fetch::list_objects;
//! use jamf_tool::transport::Transport;
//! use jamf_tool::workspace::Workspace;
//!
//! let creds = Credentials {
//!     base_url: "https://example.jamfcloud.com".into(),
//!     username: "api-user".into(),
//!     password: "secret".into(),
//! };
//! let mut provider = TokenProvider::new(creds.clone());
//! provider.refresh_token().await?;
//! let workspace = Workspace::open(Workspace::default_root())?;
//! let transport = Transport::new(workspace, creds, provider.token().unwrap_or_default());
//! let packages = list_objects(&transport, ObjectType::Package).await?;
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod catalog;
pub mod delete;
pub mod error;
pub mod fetch;
pub mod inventory;
pub mod orchestrate;
pub mod report;
pub mod transport;
pub mod usage;
pub mod workspace;
