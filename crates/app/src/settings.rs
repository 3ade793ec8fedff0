//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and from `STOCKROOM__*` environment variables,
//! the latter winning (e.g. `STOCKROOM__DATABASE__URL`).
use std::{net::SocketAddr, time::Duration};

use config::{Config, ConfigError, Environment, File};
use sea_orm::ConnectOptions;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Server {
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|err| ConfigError::Message(format!("invalid server address: {err}")))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Database URL and pool sizing.
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub min_idle: Option<u32>,
    pub max_open: Option<u32>,
    pub max_idle_time_secs: Option<u64>,
    pub max_lifetime_secs: Option<u64>,
    pub acquire_timeout_secs: Option<u64>,
}

impl DatabaseSettings {
    pub fn connect_options(&self) -> ConnectOptions {
        let mut options = ConnectOptions::new(self.url.clone());
        if let Some(min) = self.min_idle {
            options.min_connections(min);
        }
        if let Some(max) = self.max_open {
            options.max_connections(max);
        }
        if let Some(secs) = self.max_idle_time_secs {
            options.idle_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.max_lifetime_secs {
            options.max_lifetime(Duration::from_secs(secs));
        }
        if let Some(secs) = self.acquire_timeout_secs {
            options.acquire_timeout(Duration::from_secs(secs));
        }
        options.sqlx_logging(false);
        options
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub server: Server,
    pub database: DatabaseSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(
                Environment::with_prefix("STOCKROOM")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(raw: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let settings = from_toml(
            r#"
            [database]
            url = "sqlite::memory:"
            "#,
        );
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(
            settings.server.addr().unwrap(),
            SocketAddr::from(([127, 0, 0, 1], 3000))
        );
        assert_eq!(settings.server.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn pool_settings_reach_connect_options() {
        let settings = from_toml(
            r#"
            [database]
            url = "postgres://stock@localhost/stock"
            min_idle = 2
            max_open = 16
            acquire_timeout_secs = 5
            "#,
        );
        let options = settings.database.connect_options();
        assert_eq!(options.get_url(), "postgres://stock@localhost/stock");
        assert_eq!(options.get_min_connections(), Some(2));
        assert_eq!(options.get_max_connections(), Some(16));
        assert_eq!(options.get_acquire_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn bad_bind_is_reported() {
        let server = Server {
            bind: "not an address".to_string(),
            ..Server::default()
        };
        assert!(server.addr().is_err());
    }
}
