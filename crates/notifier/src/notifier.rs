//! Public entry points for sending WeChat notifications.

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Local};
use url::Url;

use yppf_common::AppResult;
use yppf_common::config::WechatConfig;
use yppf_common::urls::build_full_url;

use crate::client::ApiClient;
use crate::dispatcher::{Dispatched, Dispatcher, RunAt};
use crate::filter::available_users;
use crate::invite::invite_user;
use crate::scheduler::JobScheduler;
use crate::sender::{BatchRequest, send_batch};
use crate::types::{DeliveryOutcome, ResolvedCard};

/// Page a verification-code card links to unless told otherwise.
pub const VERIFY_CODE_PATH: &str = "/forgetpw/";

/// Button label on verification-code cards.
pub const VERIFY_CODE_BUTTON: &str = "登录";

/// Card attachment requested by the caller.
///
/// With `use_defaults`, a missing link points at the site root and a missing
/// button label falls back to the configured default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardOptions {
    pub card: bool,
    /// Absolute, or relative to the site root.
    pub url: Option<String>,
    /// Short label, at most four characters in the WeChat client.
    pub btntxt: Option<String>,
    pub use_defaults: bool,
}

impl Default for CardOptions {
    fn default() -> Self {
        Self {
            card: true,
            url: None,
            btntxt: None,
            use_defaults: true,
        }
    }
}

impl CardOptions {
    /// Plain text message without a card.
    pub fn plain() -> Self {
        Self {
            card: false,
            ..Self::default()
        }
    }

    pub fn link(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_button(mut self, btntxt: impl Into<String>) -> Self {
        self.btntxt = Some(btntxt.into());
        self
    }

    pub fn without_defaults(mut self) -> Self {
        self.use_defaults = false;
        self
    }
}

/// Options for [`WechatNotifier::send_wechat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    /// Endpoint relative to the API root; empty posts to the root itself.
    pub api_path: String,
    pub card: CardOptions,
    /// Hand batches to the scheduler when configuration allows it.
    pub multithread: bool,
    /// Attempts per batch; forced to 1 when retry is disabled in configuration.
    pub retry_times: u32,
    pub run_at: RunAt,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            api_path: String::new(),
            card: CardOptions::default(),
            multithread: true,
            retry_times: 1,
            run_at: RunAt::Soon,
        }
    }
}

/// Options for [`WechatNotifier::invite_to_wechat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InviteOptions {
    pub retry_times: u32,
    pub multithread: bool,
    pub run_at: RunAt,
}

impl Default for InviteOptions {
    fn default() -> Self {
        Self {
            retry_times: 3,
            multithread: true,
            run_at: RunAt::Soon,
        }
    }
}

/// Sends messages and invitations through the enterprise WeChat API.
///
/// None of the entry points fail: problems are logged and reported in the
/// returned outcomes. With a scheduler installed and multithreading enabled,
/// outcomes only say that the work was scheduled.
#[derive(Clone)]
pub struct WechatNotifier {
    client: ApiClient,
    scheduler: Option<Arc<dyn JobScheduler>>,
    default_url: Url,
}

impl WechatNotifier {
    pub fn new(config: WechatConfig) -> AppResult<Self> {
        let default_url = build_full_url("/", &config.base_url)?;
        let client = ApiClient::new(Arc::new(config))?;
        Ok(Self {
            client,
            scheduler: None,
            default_url,
        })
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn JobScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn config(&self) -> &WechatConfig {
        self.client.config()
    }

    /// Send `message` to `users`, one request per batch.
    ///
    /// The first line of `message` is shown as the title. Returns one entry
    /// per batch; empty when no recipient survives filtering.
    pub async fn send_wechat<I>(
        &self,
        users: I,
        message: &str,
        options: SendOptions,
    ) -> Vec<Dispatched<DeliveryOutcome>>
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let config = self.client.config();
        let users = available_users(users, config);
        if users.is_empty() {
            tracing::warn!("No available recipients, message not sent");
            return Vec::new();
        }

        let api_url = match build_full_url(&options.api_path, &config.api_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    api_path = %options.api_path,
                    error = %e,
                    "Invalid API path, message not sent"
                );
                return Vec::new();
            }
        };
        let card = self.resolve_card(&options.card);
        let retry_times = if config.retry { options.retry_times } else { 1 };
        let dispatcher = Dispatcher::select(
            options.multithread,
            config,
            self.scheduler.as_ref(),
            options.run_at,
        );

        tracing::debug!(
            recipients = users.len(),
            batch_size = config.send_batch,
            deferred = dispatcher.is_deferred(),
            "Dispatching message"
        );

        let mut results = Vec::new();
        for batch in users.chunks(config.send_batch) {
            let request = BatchRequest {
                users: batch.to_vec(),
                message: message.to_string(),
                api_url: api_url.clone(),
                card: card.clone(),
                retry_times,
            };
            let client = self.client.clone();
            let result = dispatcher
                .dispatch("send_wechat", async move { send_batch(&client, request).await })
                .await;
            results.push(result);
        }
        results
    }

    /// Send a login verification code, with a card linking to the password
    /// recovery page.
    pub async fn send_verify_code(
        &self,
        user: impl Display,
        captcha: &str,
    ) -> Vec<Dispatched<DeliveryOutcome>> {
        self.send_verify_code_with_url(user, captcha, Some(VERIFY_CODE_PATH))
            .await
    }

    /// Send a login verification code. Without `url` (or with an empty one)
    /// the card uses the default link and label.
    pub async fn send_verify_code_with_url(
        &self,
        user: impl Display,
        captcha: &str,
        url: Option<&str>,
    ) -> Vec<Dispatched<DeliveryOutcome>> {
        let message = verify_code_message(captcha, Local::now());
        let card = match url.filter(|u| !u.is_empty()) {
            Some(url) => CardOptions::link(url).with_button(VERIFY_CODE_BUTTON),
            None => CardOptions::default(),
        };
        let options = SendOptions {
            card,
            ..SendOptions::default()
        };
        self.send_wechat([user.to_string()], &message, options).await
    }

    /// Invite `user` to join the organisation.
    pub async fn invite_to_wechat(
        &self,
        user: impl Display,
        options: InviteOptions,
    ) -> Dispatched<DeliveryOutcome> {
        let dispatcher = Dispatcher::select(
            options.multithread,
            self.client.config(),
            self.scheduler.as_ref(),
            options.run_at,
        );
        let client = self.client.clone();
        let user = user.to_string();
        dispatcher
            .dispatch("invite_to_wechat", async move {
                invite_user(&client, user, options.retry_times).await
            })
            .await
    }

    fn resolve_card(&self, options: &CardOptions) -> Option<ResolvedCard> {
        if !options.card {
            return None;
        }
        let config = self.client.config();

        let url = match &options.url {
            Some(url) => match build_full_url(url, &config.base_url) {
                Ok(full) => Some(full.to_string()),
                Err(e) => {
                    tracing::warn!(
                        url = %url,
                        error = %e,
                        "Card link is not a valid URL, sending as given"
                    );
                    Some(url.clone())
                }
            },
            None if options.use_defaults => Some(self.default_url.to_string()),
            None => None,
        };
        let btntxt = options.btntxt.clone().or_else(|| {
            options
                .use_defaults
                .then(|| config.default_button_text.clone())
        });

        Some(ResolvedCard { url, btntxt })
    }
}

impl std::fmt::Debug for WechatNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatNotifier")
            .field("client", &self.client)
            .field("scheduler", &self.scheduler.is_some())
            .field("default_url", &self.default_url)
            .finish()
    }
}

/// Text of a login verification message.
pub fn verify_code_message(captcha: &str, sent_at: DateTime<Local>) -> String {
    format!(
        "YPPF登录验证\n\
         您的账号正在进行企业微信验证\n本次请求的验证码为：\
         <div class=\"highlight\">{}</div>\
         发送时间：{}",
        captcha,
        sent_at.format("%m月%d日 %H:%M:%S")
    )
}
