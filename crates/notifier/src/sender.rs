//! Batched broadcast sender with partial-failure retry.

use url::Url;

use crate::client::ApiClient;
use crate::error::DispatchFailure;
use crate::response::{ParseOutcome, batch_detail, post_and_parse};
use crate::types::{DeliveryOutcome, ResolvedCard, SendPayload};

/// Listings longer than this are abbreviated in log lines.
const LOG_USERS_FULL_LIMIT: usize = 10;

/// Number of ids kept at each end of an abbreviated listing.
const LOG_USERS_EDGE: usize = 3;

/// One batch of a broadcast, ready to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub users: Vec<String>,
    pub message: String,
    pub api_url: Url,
    /// `None` sends plain text.
    pub card: Option<ResolvedCard>,
    pub retry_times: u32,
}

/// Send one batch, narrowing to the failed recipients on each retry round.
///
/// Stops on success or on a failure that retrying cannot fix. At least one
/// attempt is made even when `retry_times` is zero. Ids the API reports that
/// are not part of the batch are never retried.
pub async fn send_batch(client: &ApiClient, request: BatchRequest) -> DeliveryOutcome {
    let BatchRequest {
        users,
        message,
        api_url,
        card,
        retry_times,
    } = request;

    let secret = client.config().hasher.encode(&message);
    let mut payload = SendPayload {
        touser: users.clone(),
        content: message,
        toall: true,
        secret,
        card: card.as_ref().map(|_| true),
        url: card.as_ref().and_then(|c| c.url.clone()),
        btntxt: card.and_then(|c| c.btntxt),
    };

    let max_attempts = retry_times.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        match post_and_parse(client.http(), &api_url, &payload, Some(&batch_detail)).await {
            ParseOutcome::Delivered => {
                tracing::info!(
                    recipients = %log_users(&users),
                    attempt,
                    "Message sent"
                );
                return DeliveryOutcome::Delivered { attempts: attempt };
            }
            ParseOutcome::Failed(error) => {
                tracing::warn!(
                    recipients = %log_users(&users),
                    attempt,
                    error = %error,
                    "Message sending failed"
                );
                return DeliveryOutcome::Failed {
                    attempts: attempt,
                    error,
                };
            }
            ParseOutcome::Retry {
                error,
                mut recipients,
            } => {
                tracing::warn!(
                    recipients = %log_users(&users),
                    failed = %log_users(&recipients),
                    attempt,
                    error = %error,
                    "Message partially failed"
                );
                // Retries never reach beyond the filtered batch.
                recipients.retain(|u| users.contains(u));
                if recipients.is_empty() {
                    let error = DispatchFailure::Malformed(format!(
                        "no retry recipient belongs to the batch: {error}"
                    ));
                    tracing::warn!(
                        recipients = %log_users(&users),
                        attempt,
                        error = %error,
                        "Message sending failed"
                    );
                    return DeliveryOutcome::Failed {
                        attempts: attempt,
                        error,
                    };
                }
                payload.touser = recipients;
                last_error = error;
            }
        }
    }

    tracing::warn!(
        pending = %log_users(&payload.touser),
        attempts = max_attempts,
        error = %last_error,
        "Giving up on recipients after retries"
    );
    DeliveryOutcome::Abandoned {
        attempts: max_attempts,
        error: last_error,
        pending: payload.touser,
    }
}

/// Human-readable recipient listing for log lines.
///
/// Up to ten ids are listed in full; longer lists show the first three, `...`,
/// the last three and the total count.
pub fn log_users(users: &[String]) -> String {
    if users.len() <= LOG_USERS_FULL_LIMIT {
        return users.join(", ");
    }
    let head = &users[..LOG_USERS_EDGE];
    let tail = &users[users.len() - LOG_USERS_EDGE..];
    format!(
        "{}, ..., {} ({} users)",
        head.join(", "),
        tail.join(", "),
        users.len()
    )
}
