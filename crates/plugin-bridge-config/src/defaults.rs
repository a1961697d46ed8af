use crate::isolation::ListenerIsolation;
use crate::logging::LogFormat;

/// Frame identity used when the embedding context does not name the frame.
pub const DEFAULT_FRAME_NAME: &str = "";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Owned frame name used where allocation is required (e.g. serde).
#[must_use]
pub fn default_frame_name() -> String {
    DEFAULT_FRAME_NAME.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default listener failure policy.
#[must_use]
pub const fn default_listener_isolation() -> ListenerIsolation {
    ListenerIsolation::Isolate
}
