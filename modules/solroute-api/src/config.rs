use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use pump_client::PumpOptions;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Server
    pub host: String,
    pub port: u16,
    pub shutdown_grace: Duration,

    // Platform client
    pub pump: PumpOptions,

    // CORS
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = PumpOptions::default();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: env_number("DATABASE_MAX_CONNECTIONS", "10")?,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_number("PORT", "80")?,
            shutdown_grace: Duration::from_secs(env_number("SHUTDOWN_GRACE_SECS", "30")?),
            pump: PumpOptions {
                site_url: std::env::var("PUMP_SITE_URL").unwrap_or(defaults.site_url),
                frontend_api_url: std::env::var("PUMP_FRONTEND_API_URL")
                    .unwrap_or(defaults.frontend_api_url),
                proxy_api_url: std::env::var("PUMP_PROXY_API_URL")
                    .unwrap_or(defaults.proxy_api_url),
                user_agent: std::env::var("PUMP_USER_AGENT").unwrap_or(defaults.user_agent),
                http_proxy: std::env::var("PUMP_HTTP_PROXY").ok().filter(|s| !s.is_empty()),
                timeout: std::env::var("PUMP_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .map(|s| parse_number::<u64>("PUMP_REQUEST_TIMEOUT_SECS", &s))
                    .transpose()?
                    .map(Duration::from_secs),
            },
            allowed_origins: parse_origins(&std::env::var("ALLOWED_ORIGINS").unwrap_or_default()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_number<T: FromStr>(name: &str, default: &str) -> Result<T> {
    parse_number(name, std::env::var(name).ok().as_deref().unwrap_or(default))
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow!("{name} must be a number, got {raw:?}"))
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
