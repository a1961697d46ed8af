//! Listener failure policy applied by the inbound router.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the router treats a listener callback that panics.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ListenerIsolation {
    /// Catch the panic, log it, and keep delivering to the remaining
    /// listeners.
    #[default]
    Isolate,
    /// Let the panic unwind through the router to the caller.
    Propagate,
}

impl ListenerIsolation {
    /// Returns `true` when listener panics are caught by the router.
    #[must_use]
    pub const fn is_isolating(self) -> bool {
        matches!(self, Self::Isolate)
    }
}
