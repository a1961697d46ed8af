//! Client side of the plugin-frame message protocol.
//!
//! A plugin is rendered inside an isolated frame and talks to its host
//! application only by exchanging structured messages. This crate gives the
//! plugin a small API for that conversation:
//!
//! - [`PluginBridge`] sends requests to the host: registration, height
//!   reports, data and event subscriptions, event calls, notifications,
//!   visibility changes and removal.
//! - [`InboundRouter`] classifies every message the host sends and delivers
//!   it to the callbacks stored in the session's
//!   [`SubscriptionRegistry`](registry::SubscriptionRegistry).
//!
//! The protocol is fire-and-forget. Answers are matched to subscriptions by
//! message `type` and data `path` only, so a plugin registers its callbacks
//! first and then lets the router feed them.
//!
//! # Architecture
//!
//! The registry is shared between the bridge and its router. Delivery is
//! single-threaded and ordered: listeners run in registration order, a
//! panicking listener is isolated from the others (see
//! [`ListenerIsolation`]), and callbacks may freely call back into the
//! bridge while a message is being delivered.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use plugin_bridge::transport::HostTransport;
//! use plugin_bridge::{BridgeConfig, Envelope, OutboundMessage, PluginBridge, RouteOutcome};
//! use plugin_bridge::TransportError;
//!
//! #[derive(Default)]
//! struct Outbox(RefCell<Vec<OutboundMessage>>);
//!
//! impl HostTransport for Outbox {
//!     fn post(&self, envelope: &Envelope) -> Result<(), TransportError> {
//!         self.0.borrow_mut().push(envelope.message().clone());
//!         Ok(())
//!     }
//! }
//!
//! let outbox = Rc::new(Outbox::default());
//! let bridge = PluginBridge::new(&BridgeConfig::default(), Rc::clone(&outbox));
//! let router = bridge.router();
//!
//! let handle = bridge.clone();
//! bridge
//!     .on_ready(move |_| handle.set_height(Some(200)).expect("height"))
//!     .expect("register");
//!
//! let outcome = router.route_json(r#"{"type":"ReadyToRender","config":{"config":{"slot":"header"}}}"#);
//! assert_eq!(outcome, RouteOutcome::Initialised { ready_callback_invoked: true });
//! assert_eq!(
//!     outbox.0.borrow().last(),
//!     Some(&OutboundMessage::PluginHeightCheck { height: 200 })
//! );
//! ```

pub mod bridge;
pub mod error;
pub mod measure;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod transport;

#[cfg(test)]
mod tests;

pub use plugin_bridge_config::{BridgeConfig, ListenerIsolation};

pub use self::bridge::PluginBridge;
pub use self::error::{BridgeError, TransportError};
pub use self::protocol::{
    DataPath, DataUpdate, Envelope, EventUpdate, InboundMessage, Notification, OutboundMessage,
    VersionInfo,
};
pub use self::registry::{PluginIdentity, ReadyPayload, SubscriptionRegistry};
pub use self::router::{Delivery, InboundRouter, RouteOutcome};
