//! Server configuration, read once from the environment at startup.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::cli;
use crate::errors::{Error, Result};

/// Everything the server binary needs to wire itself up.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds, `<host>:<port>`.
    pub address: String,
    /// Path of the SQLite database file.
    pub database_path: String,
    /// Hour of the day (0-23) from which first orders are rejected.
    pub cutoff_hour: u32,
    /// Base URL embedded in the announcement's ordering link.
    pub public_url: String,
    /// Username guaranteed to exist with the admin role after startup.
    pub admin_username: String,
    /// Messaging credentials. Announcements fail with guidance when absent.
    pub slack: Option<SlackConfig>,
    /// Bound on the announcement HTTP call.
    pub notify_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub token: String,
    pub channel: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            address: cli::DEFAULT_ADDRESS.to_string(),
            database_path: "cafeteria.db".to_string(),
            cutoff_hour: 15,
            public_url: format!("http://{}", cli::DEFAULT_ADDRESS),
            admin_username: "nora".to_string(),
            slack: None,
            notify_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load the configuration from the environment.
    ///
    /// A missing variable falls back to its default and says so in the log;
    /// a present but malformed one refuses to start the server, a silently
    /// corrected typo being worse than no server.
    pub fn load() -> Result<Config> {
        let defaults = Config::default();

        let address = var_or("CAFETERIA_ADDRESS", defaults.address);
        cli::validate_address(&address)
            .map_err(|err| Error::Config(format!("CAFETERIA_ADDRESS: {}", err)))?;

        let cutoff_hour = parsed_var_or("CAFETERIA_CUTOFF_HOUR", defaults.cutoff_hour)?;
        if cutoff_hour > 23 {
            return Err(Error::Config(format!(
                "CAFETERIA_CUTOFF_HOUR must be an hour of the day, got {}",
                cutoff_hour
            )));
        }

        let public_url = var_or("CAFETERIA_PUBLIC_URL", format!("http://{}", address));
        let timeout_secs = parsed_var_or("SLACK_TIMEOUT_SECS", 10u64)?;

        Ok(Config {
            database_path: var_or("CAFETERIA_DB", defaults.database_path),
            cutoff_hour,
            public_url,
            admin_username: var_or("CAFETERIA_ADMIN", defaults.admin_username),
            slack: slack_from_env()?,
            notify_timeout: Duration::from_secs(timeout_secs),
            address,
        })
    }
}

/// The messaging credentials come as a pair; half a pair is a
/// misconfiguration, not a disabled integration.
fn slack_from_env() -> Result<Option<SlackConfig>> {
    let token = env::var("SLACK_API_TOKEN").ok();
    let channel = env::var("SLACK_CHANNEL").ok();
    match (token, channel) {
        (Some(token), Some(channel)) => Ok(Some(SlackConfig { token, channel })),
        (None, None) => {
            log::info!("SLACK_API_TOKEN/SLACK_CHANNEL not set, notifications disabled");
            Ok(None)
        }
        (Some(_), None) => Err(Error::Config(
            "SLACK_API_TOKEN is set but SLACK_CHANNEL is not".to_string(),
        )),
        (None, Some(_)) => Err(Error::Config(
            "SLACK_CHANNEL is set but SLACK_API_TOKEN is not".to_string(),
        )),
    }
}

fn var_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or_else(|_| {
        log::info!("{} not set, using default: {}", key, default);
        default
    })
}

fn parsed_var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|err| Error::Config(format!("{}: {}", key, err))),
        Err(_) => {
            log::info!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}
