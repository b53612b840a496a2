use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};

use crate::{sync::heartbeat::Heartbeat, utils::token::Credentials};

const DEFAULT_BIND: &str         = "0.0.0.0:3000";
const DEFAULT_DB: &str           = "sqlite://playlist_sync.db?mode=rwc";
const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_API_URL: &str      = "https://api.spotify.com/v1";

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr:    String,
    pub static_dir:   PathBuf,
    pub heartbeat:    Heartbeat,
    pub database_url: String,
    /// `None` unless both id and secret are set.
    pub spotify:      Option<Credentials>,
    pub accounts_url: String,
    pub api_url:      String,
}

impl Config {
    /// Read after `dotenvy` has loaded `.env`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_owned());
        let secs = |key: &str, default: u64| -> Result<Duration> {
            let n = match get(key) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{key}={v:?} is not a whole number of seconds"))?,
                None => default,
            };
            Ok(Duration::from_secs(n))
        };

        let spotify = match (get("SPOTIFY_CLIENT_ID"), get("SPOTIFY_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(Credentials { client_id, client_secret }),
            _ => None,
        };

        Ok(Self {
            bind_addr:    or("BIND_ADDR", DEFAULT_BIND),
            static_dir:   PathBuf::from(or("STATIC_DIR", "static")),
            heartbeat:    Heartbeat {
                recv_timeout: secs("RECV_TIMEOUT_SECS", 30)?,
                pong_timeout: secs("PONG_TIMEOUT_SECS", 10)?,
            },
            database_url: or("DATABASE_URL", DEFAULT_DB),
            spotify,
            accounts_url: or("SPOTIFY_ACCOUNTS_URL", DEFAULT_ACCOUNTS_URL),
            api_url:      or("SPOTIFY_API_URL", DEFAULT_API_URL),
        })
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
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.heartbeat, Heartbeat::default());
        assert_eq!(cfg.heartbeat.recv_timeout, Duration::from_secs(30));
        assert_eq!(cfg.heartbeat.pong_timeout, Duration::from_secs(10));
        assert!(cfg.spotify.is_none());
    }

    #[test]
    fn overrides() {
        let cfg = load(&[
            ("BIND_ADDR", "127.0.0.1:6789"),
            ("RECV_TIMEOUT_SECS", " 5 "),
            ("SPOTIFY_CLIENT_ID", "id"),
            ("SPOTIFY_CLIENT_SECRET", "secret"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:6789");
        assert_eq!(cfg.heartbeat.recv_timeout, Duration::from_secs(5));
        assert_eq!(cfg.spotify.unwrap().client_id, "id");
    }

    #[test]
    fn half_credentials_are_ignored() {
        let cfg = load(&[("SPOTIFY_CLIENT_ID", "id")]).unwrap();
        assert!(cfg.spotify.is_none());
    }

    #[test]
    fn bad_timeout_is_an_error() {
        let err = load(&[("PONG_TIMEOUT_SECS", "ten")]).unwrap_err();
        assert!(err.to_string().contains("PONG_TIMEOUT_SECS"));
    }
}
