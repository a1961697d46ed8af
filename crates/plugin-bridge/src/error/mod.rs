//! Errors raised while sending messages to the host.
//!
//! Inbound handling never fails: malformed host messages are dropped and
//! listener panics are isolated by the router. The only failures a plugin
//! author can observe are on the outbound side, when the host channel
//! rejects a message. I/O errors are wrapped in `Arc` to keep the error
//! types cheap to clone into logs and test doubles.

use std::sync::Arc;

use thiserror::Error;

/// Failures of a [`HostTransport`](crate::transport::HostTransport).
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The outbound message could not be serialised.
    #[error("failed to serialise outbound message: {0}")]
    Serialize(#[source] Arc<serde_json::Error>),

    /// Writing to the host channel failed.
    #[error("I/O error writing to the host channel: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The host channel no longer accepts messages.
    #[error("host channel is closed")]
    Closed,
}

impl From<serde_json::Error> for TransportError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialize(Arc::new(error))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            source: Arc::new(error),
        }
    }
}

/// Errors returned by the plugin-facing API.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// An outbound message could not be delivered to the host channel.
    #[error("failed to send {kind} to the host: {source}")]
    Send {
        /// Wire name of the message that was being sent.
        kind: &'static str,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
}
