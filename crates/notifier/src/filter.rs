//! Recipient filtering.
//!
//! Callers pass user ids as whatever they have at hand (student numbers as
//! integers, usernames as strings). Ids are compared in their string form
//! against the configured allow-list and block-list.

use std::collections::BTreeSet;
use std::fmt::Display;

use yppf_common::config::WechatConfig;

/// Normalise, deduplicate and filter recipients.
///
/// The result is sorted so batches are deterministic. An empty result means
/// nobody may be messaged; callers treat that as a no-op.
pub fn available_users<I>(users: I, config: &WechatConfig) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Display,
{
    let mut users: BTreeSet<String> = users.into_iter().map(|u| u.to_string()).collect();

    if let Some(receivers) = &config.receivers {
        users.retain(|u| receivers.contains(u));
    }
    if !config.blacklist.is_empty() {
        users.retain(|u| !config.blacklist.contains(u));
    }

    users.into_iter().collect()
}
