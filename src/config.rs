//! Patch configuration
//!
//! Settings are read from CLI arguments and environment variables so the host
//! application can flatten them into its own parser.

use std::ffi::OsString;

use clap::{Args, Parser};
use thiserror::Error;

/// Name of the cookie the affiliate extension stores the referring code in.
pub const DEFAULT_AFFILIATE_COOKIE: &str = "current_affiliate_account_code";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Arguments or environment variables could not be parsed.
    #[error(transparent)]
    Parse(#[from] clap::Error),

    /// The affiliate cookie name is blank.
    #[error("affiliate cookie name must not be empty")]
    EmptyCookieName,
}

/// Cookie fallback settings.
#[derive(Clone, Debug, Args)]
pub struct FallbackConfig {
    /// Cookie holding the affiliate referring code.
    #[arg(
        long = "affiliate-cookie-name",
        env = "AFFILIATE_COOKIE_NAME",
        default_value = DEFAULT_AFFILIATE_COOKIE
    )]
    pub cookie_name: String,
}

impl FallbackConfig {
    /// Check the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyCookieName`] if the cookie name is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cookie_name.trim().is_empty() {
            return Err(ConfigError::EmptyCookieName);
        }

        Ok(())
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_AFFILIATE_COOKIE.to_string(),
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Affiliate attribution patch configuration
#[derive(Clone, Debug, Parser)]
#[command(name = "affiliate-attribution", about = "Affiliate attribution patch", long_about = None)]
pub struct PatchConfig {
    /// Cookie fallback settings.
    #[command(flatten)]
    pub fallback: FallbackConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}

impl PatchConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed or is invalid
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::from_args(std::env::args_os())
    }

    /// Parse and validate configuration from explicit arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed or is invalid
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = Self::try_parse_from(args)?;

        config.fallback.validate()?;

        Ok(config)
    }
}
