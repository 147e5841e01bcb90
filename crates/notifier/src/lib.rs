//! Push notifications to users through the enterprise WeChat messaging API.
//!
//! Recipients are filtered against the configured allow/block lists, split
//! into batches and posted with retry of partially failed recipients. Sends can
//! run inline or be handed to a [`scheduler::JobScheduler`] so callers are not
//! blocked on the API.

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod invite;
pub mod notifier;
pub mod response;
pub mod scheduler;
pub mod sender;
pub mod types;

pub use client::ApiClient;
pub use dispatcher::{Dispatched, Dispatcher, RunAt};
pub use error::DispatchFailure;
pub use notifier::{CardOptions, InviteOptions, SendOptions, WechatNotifier};
pub use scheduler::{JobScheduler, ScheduledJob, TokioScheduler};
pub use types::DeliveryOutcome;
