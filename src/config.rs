// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::{CostError, Result};

const DEV_JWT_SECRET: &str = "costdesk-development-secret";

#[derive(Clone, Debug)]
pub struct Config {
    /// `None` selects the platform data directory.
    pub database_path: Option<PathBuf>,
    pub server_address: SocketAddr,

    // JWT
    pub jwt_secret: String,
    pub access_token_expire_in_minute: i64,

    // CLIENT
    pub api_base_url: String,
    pub unread_poll_interval: Duration,

    pub alert_check_interval: Duration,
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            server_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            access_token_expire_in_minute: 720,
            api_base_url: "http://127.0.0.1:8080".to_string(),
            unread_poll_interval: Duration::from_secs(60),
            alert_check_interval: Duration::from_secs(300),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

impl Config {
    /// Reads `COSTDESK_*` variables (after loading `.env`), falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let database_path = lookup("COSTDESK_DB")
            .filter(|v| !v.trim().is_empty())
            .map(|v| PathBuf::from(v.trim()));
        let server_address =
            get_config_value(&lookup, "COSTDESK_ADDR", defaults.server_address)?;

        let jwt_secret = match lookup("COSTDESK_JWT_SECRET").filter(|v| !v.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("COSTDESK_JWT_SECRET not set, using the development secret");
                defaults.jwt_secret
            }
        };
        let access_token_expire_in_minute = get_config_value(
            &lookup,
            "COSTDESK_TOKEN_TTL_MINUTES",
            defaults.access_token_expire_in_minute,
        )?;
        if access_token_expire_in_minute <= 0 {
            return Err(CostError::Config(
                "COSTDESK_TOKEN_TTL_MINUTES must be positive".to_string(),
            ));
        }

        let api_base_url = lookup("COSTDESK_API_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.api_base_url);

        let alert_secs: u64 = get_config_value(
            &lookup,
            "COSTDESK_ALERT_INTERVAL_SECS",
            defaults.alert_check_interval.as_secs(),
        )?;
        let poll_secs: u64 = get_config_value(
            &lookup,
            "COSTDESK_POLL_INTERVAL_SECS",
            defaults.unread_poll_interval.as_secs(),
        )?;
        if alert_secs == 0 || poll_secs == 0 {
            return Err(CostError::Config("intervals must be at least 1 second".to_string()));
        }

        let cors_origins: Vec<String> = match lookup("COSTDESK_CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.cors_origins,
        };
        // credentialed CORS needs explicit origins
        if cors_origins.iter().any(|o| o.contains('*')) {
            return Err(CostError::Config(
                "COSTDESK_CORS_ORIGINS must list explicit origins, not '*'".to_string(),
            ));
        }

        Ok(Self {
            database_path,
            server_address,
            jwt_secret,
            access_token_expire_in_minute,
            api_base_url,
            unread_poll_interval: Duration::from_secs(poll_secs),
            alert_check_interval: Duration::from_secs(alert_secs),
            cors_origins,
        })
    }
}

fn get_config_value<F, T>(lookup: &F, name: &str, fallback: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| CostError::Config(format!("{name} has an invalid value '{raw}'"))),
        _ => Ok(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(cfg.server_address.port(), 8080);
        assert_eq!(cfg.unread_poll_interval, Duration::from_secs(60));
        assert!(cfg.database_path.is_none());
    }

    #[test]
    fn api_url_loses_trailing_slash() {
        let cfg =
            Config::from_lookup(lookup_from(&[("COSTDESK_API_URL", "https://api.example.al/")]))
                .unwrap();
        assert_eq!(cfg.api_base_url, "https://api.example.al");
    }

    #[test]
    fn malformed_values_are_config_errors() {
        let err = Config::from_lookup(lookup_from(&[("COSTDESK_ADDR", "nowhere")])).unwrap_err();
        assert!(matches!(err, CostError::Config(_)));
        let err =
            Config::from_lookup(lookup_from(&[("COSTDESK_POLL_INTERVAL_SECS", "0")])).unwrap_err();
        assert!(matches!(err, CostError::Config(_)));
    }

    #[test]
    fn wildcard_cors_origin_is_a_config_error() {
        for raw in ["*", "https://app.example.al, *"] {
            let err = Config::from_lookup(lookup_from(&[("COSTDESK_CORS_ORIGINS", raw)]))
                .unwrap_err();
            assert!(matches!(err, CostError::Config(_)), "{raw}");
        }
        let cfg = Config::from_lookup(lookup_from(&[(
            "COSTDESK_CORS_ORIGINS",
            "https://app.example.al",
        )]))
        .unwrap();
        assert_eq!(cfg.cors_origins, vec!["https://app.example.al".to_string()]);
    }
}
