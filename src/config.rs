use anyhow::{anyhow, Context, Result};

use crate::time::parse_tz;
use crate::usage::DEFAULT_USAGE_KEY;

#[derive(Clone)]
pub struct Config {
    // Chat
    pub groq_api_key: Option<String>,
    pub groq_base_url: String,
    pub groq_model: String,
    pub groq_max_tokens: u32,

    // Quota
    pub daily_limit: u64,
    pub tz: Option<String>,

    // Persistence
    pub usage_store_path: String,
    pub usage_key: String,

    // Public APIs
    pub joke_url: String,
    pub cat_url: String,

    // Runtime
    pub log_json: bool,
}

// keeps the API key out of `?cfg` log lines
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("groq_api_key", &self.groq_api_key.as_ref().map(|_| "<redacted>"))
            .field("groq_base_url", &self.groq_base_url)
            .field("groq_model", &self.groq_model)
            .field("groq_max_tokens", &self.groq_max_tokens)
            .field("daily_limit", &self.daily_limit)
            .field("tz", &self.tz)
            .field("usage_store_path", &self.usage_store_path)
            .field("usage_key", &self.usage_key)
            .field("joke_url", &self.joke_url)
            .field("cat_url", &self.cat_url)
            .field("log_json", &self.log_json)
            .finish()
    }
}

fn parse_bool(raw: Option<String>, default: bool) -> bool {
    match raw.map(|s| s.trim().to_lowercase()) {
        None => default,
        Some(v) if v.is_empty() => default,
        Some(v) if v == "1" || v == "true" || v == "yes" || v == "y" || v == "on" => true,
        Some(v) if v == "0" || v == "false" || v == "no" || v == "n" || v == "off" => false,
        Some(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parse_u64 = |key: &str, default: u64| -> Result<u64> {
            match var(key) {
                None => Ok(default),
                Some(v) => v.trim().parse().with_context(|| format!("{key} must be an integer, got {v:?}")),
            }
        };

        // Chat
        let groq_api_key = var("GROQ_API_KEY");
        let groq_base_url = var("GROQ_BASE_URL")
            .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string());
        let groq_model = var("GROQ_MODEL").unwrap_or_else(|| "llama-3.3-70b-versatile".to_string());
        let groq_max_tokens = u32::try_from(parse_u64("GROQ_MAX_TOKENS", 512)?)
            .map_err(|_| anyhow!("GROQ_MAX_TOKENS out of range"))?;
        if groq_max_tokens == 0 {
            return Err(anyhow!("GROQ_MAX_TOKENS must be positive"));
        }

        // Quota
        let daily_limit = parse_u64("QUOTA_DAILY_LIMIT", 20)?;
        if daily_limit == 0 {
            return Err(anyhow!("QUOTA_DAILY_LIMIT must be positive"));
        }
        let tz = var("QUOTA_TZ");
        if let Some(tz) = tz.as_deref() {
            parse_tz(tz)?;
        }

        // Persistence
        let usage_store_path = var("QUOTA_STORE_PATH").unwrap_or_else(|| "./usage.json".to_string());
        let usage_key = var("QUOTA_KEY").unwrap_or_else(|| DEFAULT_USAGE_KEY.to_string());

        // Public APIs
        let joke_url = var("JOKE_URL").unwrap_or_else(|| "https://v2.jokeapi.dev/joke/Any?safe-mode".to_string());
        let cat_url = var("CAT_URL").unwrap_or_else(|| "https://api.thecatapi.com/v1/images/search".to_string());

        let log_json = parse_bool(lookup("QUOTA_LOG_JSON"), false);

        Ok(Self {
            groq_api_key,
            groq_base_url,
            groq_model,
            groq_max_tokens,
            daily_limit,
            tz,
            usage_store_path,
            usage_key,
            joke_url,
            cat_url,
            log_json,
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.groq_api_key
            .as_deref()
            .ok_or_else(|| anyhow!("GROQ_API_KEY is required for chat"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.daily_limit, 20);
        assert_eq!(cfg.groq_max_tokens, 512);
        assert_eq!(cfg.groq_model, "llama-3.3-70b-versatile");
        assert_eq!(cfg.usage_key, "groq_usage");
        assert_eq!(cfg.tz, None);
        assert!(!cfg.log_json);
        assert!(cfg.require_api_key().is_err());
    }

    #[test]
    fn overrides() {
        let cfg = load(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("QUOTA_DAILY_LIMIT", "5"),
            ("QUOTA_TZ", "Europe/Berlin"),
            ("QUOTA_LOG_JSON", "yes"),
            ("QUOTA_KEY", ""),
        ])
        .unwrap();
        assert_eq!(cfg.daily_limit, 5);
        assert_eq!(cfg.tz.as_deref(), Some("Europe/Berlin"));
        assert!(cfg.log_json);
        assert_eq!(cfg.usage_key, "groq_usage");
        assert_eq!(cfg.require_api_key().unwrap(), "gsk_test");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load(&[("QUOTA_DAILY_LIMIT", "0")]).is_err());
        assert!(load(&[("QUOTA_DAILY_LIMIT", "many")]).is_err());
        assert!(load(&[("GROQ_MAX_TOKENS", "0")]).is_err());
        assert!(load(&[("QUOTA_TZ", "Nowhere/Special")]).is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let cfg = load(&[("GROQ_API_KEY", "gsk_secret")]).unwrap();
        assert!(!format!("{cfg:?}").contains("gsk_secret"));
    }
}
