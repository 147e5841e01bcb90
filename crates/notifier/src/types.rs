use serde::Serialize;

use crate::error::DispatchFailure;

/// Body of a broadcast-style send request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendPayload {
    pub touser: Vec<String>,
    pub content: String,
    pub toall: bool,
    pub secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub btntxt: Option<String>,
}

/// Body of an invite request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitePayload {
    pub user: String,
    pub secret: String,
}

/// Card attachment after defaults and URL resolution have been applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCard {
    pub url: Option<String>,
    pub btntxt: Option<String>,
}

/// Final result of a send after all retry rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The API accepted the message for every remaining recipient.
    Delivered { attempts: u32 },
    /// A non-retryable failure ended the send.
    Failed {
        attempts: u32,
        error: DispatchFailure,
    },
    /// Retries ran out while some recipients were still failing.
    Abandoned {
        attempts: u32,
        error: String,
        pending: Vec<String>,
    },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Delivered { attempts }
            | DeliveryOutcome::Failed { attempts, .. }
            | DeliveryOutcome::Abandoned { attempts, .. } => *attempts,
        }
    }
}
