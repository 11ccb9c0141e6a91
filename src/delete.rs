//! Delete executor: a bounded retry loop around DELETE requests.
//!
//! A delete either stops on the first classified response (success,
//! conflict, not-found, permission) or retries on anything unclassified
//! with linear backoff: 1s after the first attempt, 2s after the second,
//! and so on. After five attempts without a stop classification the loop
//! gives up with a warning and reports the last observed status, bounding
//! worst-case retry latency at 15 sleep-seconds and guaranteeing
//! termination.
//!
//! The backoff delay goes through the [`Sleeper`] capability so tests can
//! drive five failed attempts without wall-clock time.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, error, info, warn};

use crate::catalog::ObjectType;
use crate::error::Result;
use crate::transport::{ApiRequest, Outcome, Transport};

/// Maximum number of DELETE attempts before giving up.
pub const MAX_DELETE_ATTEMPTS: u32 = 5;

/// Clock capability for the backoff delay.
pub trait Sleeper {
    /// Waits for the given duration.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}

/// Real sleeper backed by the tokio timer.
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deletes one object by id, retrying unclassified responses.
///
/// Returns the terminal status code. Stop classifications are reported on
/// the way out: success as info, conflict/not-found as warnings, and
/// permission denial as an error (it usually means the account lacks the
/// privilege and every further delete would fail the same way).
///
/// Transport-level failures propagate immediately as `ToolError::Network`
/// rather than being retried.
pub async fn delete_object<S: Sleeper>(
    transport: &Transport,
    object_type: ObjectType,
    id: &str,
    sleeper: &S,
) -> Result<StatusCode> {
    let url = object_type.object_url(transport.base_url(), id);
    let mut last_status = StatusCode::INTERNAL_SERVER_ERROR;

    for attempt in 1..=MAX_DELETE_ATTEMPTS {
        debug!(%object_type, id, attempt, "delete attempt");
        let response = transport.execute(ApiRequest::delete(url.clone())).await?;
        last_status = response.status;

        let outcome = response.outcome();
        if outcome.is_stop() {
            match outcome {
                Outcome::Success => info!(%object_type, id, "delete successful"),
                Outcome::Conflict => warn!(%object_type, id, "delete failed due to a conflict"),
                Outcome::NotFound => warn!(%object_type, id, "object not found"),
                Outcome::Permission => {
                    error!(%object_type, id, "delete failed due to a permissions error");
                }
                Outcome::Transient => unreachable!("transient outcomes do not stop"),
            }
            return Ok(last_status);
        }

        debug!(
            status = last_status.as_u16(),
            wait_secs = attempt,
            "unclassified response, waiting to try again"
        );
        sleeper.sleep(Duration::from_secs(u64::from(attempt))).await;
    }

    warn!(
        %object_type,
        id,
        status = last_status.as_u16(),
        "delete did not succeed after {MAX_DELETE_ATTEMPTS} attempts"
    );
    Ok(last_status)
}
