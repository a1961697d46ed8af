//! Outbound channel from the plugin frame to its host.
//!
//! The browser channel is `postMessage` to the parent frame with no origin
//! restriction. [`HostTransport`] abstracts that single operation so the
//! facade can run against any channel: [`JsonlTransport`] writes one JSON
//! envelope per line for out-of-process plugins, and `RecordingTransport`
//! (behind the `test-support` feature) keeps envelopes in memory.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::error::TransportError;
use crate::protocol::Envelope;

/// Delivers envelopes to the host. Delivery is fire-and-forget: there is no
/// reply and no correlation identifier.
///
/// # Example
///
/// ```
/// use plugin_bridge::protocol::Envelope;
/// use plugin_bridge::transport::HostTransport;
/// use plugin_bridge::TransportError;
///
/// struct Discard;
///
/// impl HostTransport for Discard {
///     fn post(&self, _envelope: &Envelope) -> Result<(), TransportError> {
///         Ok(())
///     }
/// }
/// ```
pub trait HostTransport {
    /// Posts one envelope to the host.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the envelope cannot be encoded or the
    /// channel rejects it.
    fn post(&self, envelope: &Envelope) -> Result<(), TransportError>;
}

impl<T: HostTransport + ?Sized> HostTransport for Rc<T> {
    fn post(&self, envelope: &Envelope) -> Result<(), TransportError> {
        (**self).post(envelope)
    }
}

impl<T: HostTransport + ?Sized> HostTransport for Box<T> {
    fn post(&self, envelope: &Envelope) -> Result<(), TransportError> {
        (**self).post(envelope)
    }
}

/// Writes each envelope as a single JSON line and flushes the writer.
#[derive(Debug)]
pub struct JsonlTransport<W> {
    writer: RefCell<W>,
}

impl<W: Write> JsonlTransport<W> {
    /// Wraps `writer`.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self {
            writer: RefCell::new(writer),
        }
    }

    /// Returns the wrapped writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> HostTransport for JsonlTransport<W> {
    fn post(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let line = serde_json::to_string(envelope)?;
        let mut writer = self.writer.borrow_mut();
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use self::recording::RecordingTransport;

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use std::cell::RefCell;

    use super::HostTransport;
    use crate::error::TransportError;
    use crate::protocol::{Envelope, OutboundMessage};

    /// Keeps every posted envelope in memory.
    #[derive(Debug, Default)]
    pub struct RecordingTransport {
        sent: RefCell<Vec<Envelope>>,
    }

    impl RecordingTransport {
        /// Creates an empty recorder.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Returns a copy of every envelope posted so far.
        #[must_use]
        pub fn envelopes(&self) -> Vec<Envelope> {
            self.sent.borrow().clone()
        }

        /// Returns a copy of every message posted so far, without envelopes.
        #[must_use]
        pub fn messages(&self) -> Vec<OutboundMessage> {
            self.sent
                .borrow()
                .iter()
                .map(|envelope| envelope.message().clone())
                .collect()
        }

        /// Returns the most recent message, if any.
        #[must_use]
        pub fn last_message(&self) -> Option<OutboundMessage> {
            self.sent
                .borrow()
                .last()
                .map(|envelope| envelope.message().clone())
        }

        /// Removes and returns every envelope posted so far.
        pub fn take(&self) -> Vec<Envelope> {
            self.sent.take()
        }
    }

    impl HostTransport for RecordingTransport {
        fn post(&self, envelope: &Envelope) -> Result<(), TransportError> {
            self.sent.borrow_mut().push(envelope.clone());
            Ok(())
        }
    }
}
