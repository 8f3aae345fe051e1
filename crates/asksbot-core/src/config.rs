use std::{env, fs, net::SocketAddr, path::Path, time::Duration};

use crate::{domain::ChatUserId, errors::Error, Result};

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Slack
    pub slack_bot_token: String,
    pub slack_signing_secret: Option<String>,
    /// Chat identity of the bot itself. Resolved to an API user for every
    /// comment the bot mirrors.
    pub slack_bot_user_id: ChatUserId,
    pub slack_timeout: Duration,

    // Signal API
    pub api_base_url: String,
    pub api_key: String,
    pub signal_source: String,
    pub api_timeout: Duration,

    // Command server
    pub http_bind: SocketAddr,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            get(key).and_then(non_empty).ok_or_else(|| {
                Error::Config(format!("{key} environment variable is required"))
            })
        };

        let slack_bot_token = required("SLACK_BOT_TOKEN")?;
        let slack_bot_user_id = ChatUserId(required("SLACK_BOT_USER_ID")?);
        let slack_signing_secret = get("SLACK_SIGNING_SECRET").and_then(non_empty);
        let slack_timeout =
            Duration::from_millis(parse_u64(&get, "SLACK_TIMEOUT_MS")?.unwrap_or(10_000));

        let api_base_url = required("API_BASE_URL")?.trim_end_matches('/').to_string();
        let api_key = required("API_KEY")?;
        let signal_source = get("SIGNAL_SOURCE")
            .and_then(non_empty)
            .unwrap_or_else(|| "chat".to_string());
        let api_timeout =
            Duration::from_millis(parse_u64(&get, "API_TIMEOUT_MS")?.unwrap_or(10_000));

        let http_bind = get("HTTP_BIND")
            .and_then(non_empty)
            .unwrap_or_else(|| "0.0.0.0:8000".to_string());
        let http_bind = http_bind
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("HTTP_BIND is not a socket address: {e}")))?;

        Ok(Self {
            slack_bot_token,
            slack_signing_secret,
            slack_bot_user_id,
            slack_timeout,
            api_base_url,
            api_key,
            signal_source,
            api_timeout,
            http_bind,
        })
    }
}

fn parse_u64(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    match get(key).and_then(non_empty) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{key} must be an integer: {e}"))),
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
