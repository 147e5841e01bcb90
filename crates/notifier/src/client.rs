use std::sync::Arc;

use reqwest::Client;
use yppf_common::AppResult;
use yppf_common::config::WechatConfig;

/// HTTP client bound to the messaging API configuration.
///
/// Cheap to clone; deferred jobs carry their own clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: Arc<WechatConfig>,
}

impl ApiClient {
    pub fn new(config: Arc<WechatConfig>) -> AppResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &WechatConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }
}
