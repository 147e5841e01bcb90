use std::collections::BTreeSet;
use std::time::Duration;

use url::Url;

use crate::hasher::MessageHasher;

/// Default card button label shown next to the link.
pub const DEFAULT_BUTTON_TEXT: &str = "详情";

/// Messaging API configuration loaded from environment variables.
///
/// Built once at startup and shared read-only by every notifier clone.
#[derive(Debug, Clone)]
pub struct WechatConfig {
    /// Public root of the web application; relative card links resolve against it
    pub base_url: Url,

    /// Root of the enterprise messaging API
    pub api_url: Url,

    /// Per-request HTTP timeout (default: 15s)
    pub timeout: Duration,

    /// Maximum recipients per request (default: 500)
    pub send_batch: usize,

    /// Allow handing sends to the job scheduler (default: true)
    pub multithread: bool,

    /// Allow retrying partially failed sends (default: true)
    pub retry: bool,

    /// Allow-list of recipients; `None` lets everyone through
    pub receivers: Option<BTreeSet<String>>,

    /// Recipients that never receive messages
    pub blacklist: BTreeSet<String>,

    /// Label for card buttons when the caller gives none
    pub default_button_text: String,

    /// Signs request payloads with the shared API key
    pub hasher: MessageHasher,
}

impl WechatConfig {
    /// Configuration with defaults for everything but the two URLs and the API key.
    pub fn new(base_url: Url, api_url: Url, secret: impl Into<String>) -> Self {
        Self {
            base_url,
            api_url,
            timeout: Duration::from_secs(15),
            send_batch: 500,
            multithread: true,
            retry: true,
            receivers: None,
            blacklist: BTreeSet::new(),
            default_button_text: DEFAULT_BUTTON_TEXT.to_string(),
            hasher: MessageHasher::new(secret),
        }
    }

    /// Load configuration from environment variables (and `.env`, if present).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("SITE_BASE_URL")
            .unwrap_or_else(|| "http://localhost:8000/".to_string());
        let base_url = Url::parse(&base_url)
            .map_err(|e| anyhow::anyhow!("SITE_BASE_URL must be a valid URL: {}", e))?;

        let api_url = lookup("WECHAT_API_URL")
            .ok_or_else(|| anyhow::anyhow!("WECHAT_API_URL environment variable is required"))?;
        let api_url = Url::parse(&api_url)
            .map_err(|e| anyhow::anyhow!("WECHAT_API_URL must be a valid URL: {}", e))?;

        let secret = lookup("WECHAT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("WECHAT_SECRET environment variable is required"))?;

        let timeout_secs: f64 = lookup("WECHAT_TIMEOUT_SECS")
            .unwrap_or_else(|| "15".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("WECHAT_TIMEOUT_SECS must be a number"))?;
        let timeout = Duration::try_from_secs_f64(timeout_secs)
            .ok()
            .filter(|t| !t.is_zero())
            .ok_or_else(|| anyhow::anyhow!("WECHAT_TIMEOUT_SECS must be positive"))?;

        let send_batch: usize = lookup("WECHAT_SEND_BATCH")
            .unwrap_or_else(|| "500".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("WECHAT_SEND_BATCH must be a valid usize"))?;
        if send_batch == 0 {
            anyhow::bail!("WECHAT_SEND_BATCH must be at least 1");
        }

        Ok(Self {
            base_url,
            api_url,
            timeout,
            send_batch,
            multithread: parse_flag("WECHAT_MULTITHREAD", lookup("WECHAT_MULTITHREAD"), true)?,
            retry: parse_flag("WECHAT_RETRY", lookup("WECHAT_RETRY"), true)?,
            receivers: lookup("WECHAT_RECEIVERS").map(|raw| parse_list(&raw)),
            blacklist: lookup("WECHAT_BLACKLIST")
                .map(|raw| parse_list(&raw))
                .unwrap_or_default(),
            default_button_text: lookup("WECHAT_DEFAULT_BUTTON")
                .unwrap_or_else(|| DEFAULT_BUTTON_TEXT.to_string()),
            hasher: MessageHasher::new(secret),
        })
    }
}

fn parse_flag(name: &str, raw: Option<String>, default: bool) -> anyhow::Result<bool> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("{} must be a boolean, got {:?}", name, other)),
    }
}

fn parse_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<WechatConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WechatConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("WECHAT_API_URL", "http://wechat.local/api/"),
            ("WECHAT_SECRET", "k"),
        ])
        .unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.send_batch, 500);
        assert!(config.multithread);
        assert!(config.retry);
        assert!(config.receivers.is_none());
        assert!(config.blacklist.is_empty());
        assert_eq!(config.default_button_text, DEFAULT_BUTTON_TEXT);
    }

    #[test]
    fn test_lists_and_flags() {
        let config = load(&[
            ("WECHAT_API_URL", "http://wechat.local/api/"),
            ("WECHAT_SECRET", "k"),
            ("WECHAT_RECEIVERS", " 1, 2,,3 "),
            ("WECHAT_BLACKLIST", "2"),
            ("WECHAT_MULTITHREAD", "off"),
            ("WECHAT_RETRY", "0"),
            ("WECHAT_TIMEOUT_SECS", "2.5"),
            ("WECHAT_SEND_BATCH", "50"),
        ])
        .unwrap();
        let receivers: Vec<_> = config.receivers.unwrap().into_iter().collect();
        assert_eq!(receivers, vec!["1", "2", "3"]);
        assert!(config.blacklist.contains("2"));
        assert!(!config.multithread);
        assert!(!config.retry);
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.send_batch, 50);
    }

    #[test]
    fn test_empty_receivers_blocks_everyone() {
        let config = load(&[
            ("WECHAT_API_URL", "http://wechat.local/api/"),
            ("WECHAT_SECRET", "k"),
            ("WECHAT_RECEIVERS", ""),
        ])
        .unwrap();
        assert_eq!(config.receivers, Some(BTreeSet::new()));
    }

    #[test]
    fn test_missing_required() {
        assert!(load(&[("WECHAT_SECRET", "k")]).is_err());
        assert!(load(&[("WECHAT_API_URL", "http://wechat.local/")]).is_err());
    }

    #[test]
    fn test_invalid_values() {
        let base = [
            ("WECHAT_API_URL", "http://wechat.local/"),
            ("WECHAT_SECRET", "k"),
        ];
        for bad in [
            ("WECHAT_SEND_BATCH", "0"),
            ("WECHAT_SEND_BATCH", "many"),
            ("WECHAT_TIMEOUT_SECS", "0"),
            ("WECHAT_TIMEOUT_SECS", "-1"),
            ("WECHAT_RETRY", "maybe"),
            ("SITE_BASE_URL", "not a url"),
        ] {
            let mut vars = base.to_vec();
            vars.push(bad);
            assert!(load(&vars).is_err(), "{:?} should be rejected", bad);
        }
    }
}
