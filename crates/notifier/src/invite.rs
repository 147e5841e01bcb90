//! Invitations to join the enterprise WeChat organisation.

use serde_json::Value;
use yppf_common::urls::build_full_url;

use crate::client::ApiClient;
use crate::error::DispatchFailure;
use crate::response::{ParseOutcome, post_and_parse, value_text};
use crate::types::{DeliveryOutcome, InvitePayload};

/// Invite endpoint, relative to the API root.
pub const INVITE_PATH: &str = "/invite_user";

/// Invite a single user, retrying while the API reports a failure detail.
///
/// The request is signed with the hash of the user id rather than of a
/// message body.
pub async fn invite_user(client: &ApiClient, user: String, retry_times: u32) -> DeliveryOutcome {
    let url = match build_full_url(INVITE_PATH, &client.config().api_url) {
        Ok(url) => url,
        Err(e) => {
            let error = DispatchFailure::InvalidUrl(e.to_string());
            tracing::warn!(user = %user, error = %error, "Invitation not sent");
            return DeliveryOutcome::Failed { attempts: 0, error };
        }
    };

    let payload = InvitePayload {
        secret: client.config().hasher.encode(&user),
        user,
    };
    let retry_user = payload.user.clone();
    let parse_detail = move |detail: &Value| -> Option<(String, Vec<String>)> {
        Some((value_text(detail), vec![retry_user.clone()]))
    };

    let max_attempts = retry_times.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        match post_and_parse(client.http(), &url, &payload, Some(&parse_detail)).await {
            ParseOutcome::Delivered => {
                tracing::info!(user = %payload.user, attempt, "Invitation sent");
                return DeliveryOutcome::Delivered { attempts: attempt };
            }
            ParseOutcome::Failed(error) => {
                tracing::warn!(user = %payload.user, attempt, error = %error, "Invitation failed");
                return DeliveryOutcome::Failed {
                    attempts: attempt,
                    error,
                };
            }
            ParseOutcome::Retry { error, .. } => {
                tracing::warn!(user = %payload.user, attempt, error = %error, "Invitation failed");
                last_error = error;
            }
        }
    }

    tracing::warn!(
        user = %payload.user,
        attempts = max_attempts,
        error = %last_error,
        "Giving up on invitation after retries"
    );
    DeliveryOutcome::Abandoned {
        attempts: max_attempts,
        error: last_error,
        pending: vec![payload.user],
    }
}
