//! Shared configuration for the plugin bridge library and its binaries.
//!
//! [`BridgeConfig`] carries the frame identity stamped on every outbound
//! envelope, the listener failure policy used by the inbound router, and the
//! logging settings honoured by the binaries. Values resolve with the
//! precedence command line, then environment, then built-in defaults.

mod defaults;
mod isolation;
mod logging;

use std::ffi::OsString;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::defaults::{
    DEFAULT_FRAME_NAME, DEFAULT_LOG_FILTER, default_frame_name, default_listener_isolation,
    default_log_filter, default_log_filter_string, default_log_format,
};
pub use self::isolation::ListenerIsolation;
pub use self::logging::{LogFormat, LogFormatParseError};

/// Runtime configuration for one plugin session.
#[derive(Debug, Clone, PartialEq, Eq, Parser, Serialize, Deserialize)]
#[command(name = "plugin-bridge", about = "Plugin frame bridge configuration")]
#[serde(default)]
pub struct BridgeConfig {
    /// Frame identity placed in the `name` field of every outbound envelope.
    #[arg(long, env = "PLUGIN_BRIDGE_FRAME_NAME", default_value = DEFAULT_FRAME_NAME)]
    pub frame_name: String,
    /// `tracing` filter expression used by the binaries.
    #[arg(long, env = "PLUGIN_BRIDGE_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
    /// Output format for the binaries' log lines.
    #[arg(long, env = "PLUGIN_BRIDGE_LOG_FORMAT", default_value_t = default_log_format())]
    pub log_format: LogFormat,
    /// Policy applied when a listener callback panics during dispatch.
    #[arg(
        long,
        env = "PLUGIN_BRIDGE_LISTENER_ISOLATION",
        default_value_t = default_listener_isolation()
    )]
    pub listener_isolation: ListenerIsolation,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            frame_name: default_frame_name(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            listener_isolation: default_listener_isolation(),
        }
    }
}

impl BridgeConfig {
    /// Parses configuration from command-line style arguments, falling back
    /// to `PLUGIN_BRIDGE_*` environment variables and then to defaults.
    ///
    /// The first item is treated as the program name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when an argument or environment value
    /// cannot be parsed.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(ConfigError::Parse)
    }

    /// Returns a copy of this configuration with the given frame identity.
    #[must_use]
    pub fn with_frame_name(mut self, frame_name: impl Into<String>) -> Self {
        self.frame_name = frame_name.into();
        self
    }

    /// Returns a copy of this configuration with the given listener policy.
    #[must_use]
    pub const fn with_listener_isolation(mut self, isolation: ListenerIsolation) -> Self {
        self.listener_isolation = isolation;
        self
    }

    /// Frame identity stamped on outbound envelopes.
    #[must_use]
    pub const fn frame_name(&self) -> &str {
        self.frame_name.as_str()
    }

    /// Log filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Listener failure policy.
    #[must_use]
    pub const fn listener_isolation(&self) -> ListenerIsolation {
        self.listener_isolation
    }
}

/// Errors raised while resolving a [`BridgeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An argument or environment value could not be parsed.
    #[error("invalid plugin bridge configuration: {0}")]
    Parse(#[source] clap::Error),
}
