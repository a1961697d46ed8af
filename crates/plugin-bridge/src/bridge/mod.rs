//! Plugin-facing API.
//!
//! A [`PluginBridge`] is the object a plugin author works with. It owns the
//! session's [`SubscriptionRegistry`](crate::registry::SubscriptionRegistry),
//! the outbound [`HostTransport`] and a [`ContentMeasure`] for automatic
//! height reporting. Every operation either records a listener, sends one
//! message to the host, or both; answers arrive later through the
//! [`InboundRouter`] returned by [`PluginBridge::router`].
//!
//! The bridge is a cheap, clonable handle. Callbacks that need to talk back
//! to the host capture a clone. Such a clone stored inside one of the
//! bridge's own listeners keeps the session alive for the life of the
//! process, matching the append-only listener model.
//!
//! The handle is `!Send`: one plugin session lives on one thread, which keeps
//! delivery in registration order.

use std::cell::Ref;
use std::fmt;
use std::rc::Rc;

use plugin_bridge_config::{BridgeConfig, ListenerIsolation};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{BridgeError, TransportError};
use crate::measure::{ContentMeasure, FixedContent};
use crate::protocol::{
    DataPath, DataUpdate, Envelope, EventUpdate, Notification, OutboundMessage,
    SEND_NOTIFICATION_EVENT, UPDATE_PLUGIN_EVENT, VersionInfo, VisibilityUpdate,
};
use crate::registry::{PluginIdentity, ReadyPayload, SharedRegistry, SubscriptionRegistry};
use crate::router::InboundRouter;
use crate::transport::HostTransport;

/// Handle to one plugin session.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
///
/// use plugin_bridge::{BridgeConfig, PluginBridge};
/// use plugin_bridge::protocol::OutboundMessage;
/// use plugin_bridge::transport::JsonlTransport;
///
/// let config = BridgeConfig::default().with_frame_name("card-frame");
/// let bridge = PluginBridge::new(&config, JsonlTransport::new(Vec::new()));
/// let router = bridge.router();
///
/// bridge
///     .subscribe_to_metadata(|update| println!("metadata: {}", update.data()))
///     .expect("subscribe");
/// router.route_json(r#"{"type":"DataUpdate","path":"metadata","data":{"x":1}}"#);
/// ```
pub struct PluginBridge<T> {
    inner: Rc<Session<T>>,
}

struct Session<T> {
    frame_name: String,
    transport: T,
    measure: Box<dyn ContentMeasure>,
    registry: SharedRegistry,
    isolation: ListenerIsolation,
}

impl<T> Clone for PluginBridge<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for PluginBridge<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginBridge")
            .field("frame_name", &self.inner.frame_name)
            .field("registry", &self.inner.registry)
            .field("isolation", &self.inner.isolation)
            .finish_non_exhaustive()
    }
}

impl<T: HostTransport> PluginBridge<T> {
    /// Starts a session for the frame described by `config`. Automatic
    /// height measurement reports zero until a measure is supplied with
    /// [`PluginBridge::with_measure`].
    #[must_use]
    pub fn new(config: &BridgeConfig, transport: T) -> Self {
        Self::with_measure(config, transport, FixedContent::default())
    }

    /// Starts a session that measures content with `measure`.
    #[must_use]
    pub fn with_measure<M>(config: &BridgeConfig, transport: T, measure: M) -> Self
    where
        M: ContentMeasure + 'static,
    {
        Self {
            inner: Rc::new(Session {
                frame_name: config.frame_name().to_owned(),
                transport,
                measure: Box::new(measure),
                registry: SubscriptionRegistry::shared(),
                isolation: config.listener_isolation(),
            }),
        }
    }

    /// Returns a router delivering host messages to this session.
    #[must_use]
    pub fn router(&self) -> InboundRouter {
        InboundRouter::new(Rc::clone(&self.inner.registry), self.inner.isolation)
    }

    /// Frame identity stamped on outbound envelopes.
    #[must_use]
    pub fn frame_name(&self) -> &str {
        self.inner.frame_name.as_str()
    }

    /// Outbound transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Read access to the session registry.
    ///
    /// Do not hold the guard across calls that register listeners.
    #[must_use]
    pub fn registry(&self) -> Ref<'_, SubscriptionRegistry> {
        self.inner.registry.borrow()
    }

    /// Returns `true` once the host's first `ReadyToRender` was handled.
    #[must_use]
    pub fn is_initialised(&self) -> bool {
        self.registry().is_initialised()
    }

    /// Plugin parameters; an empty object before initialization.
    #[must_use]
    pub fn parameters(&self) -> Value {
        self.registry().payload().parameters().clone()
    }

    /// Resource identifiers; an empty object before initialization.
    #[must_use]
    pub fn resource(&self) -> Value {
        self.registry().payload().resource().clone()
    }

    /// Host settings; `null` before initialization.
    #[must_use]
    pub fn settings(&self) -> Value {
        self.registry().payload().settings().clone()
    }

    /// Slot and manifest of the plugin; empty before initialization.
    #[must_use]
    pub fn identity(&self) -> PluginIdentity {
        self.registry().identity().clone()
    }

    /// Stores `callback` as the ready callback and announces the plugin to
    /// the host.
    ///
    /// The callback runs once, when the first `ReadyToRender` arrives. A
    /// callback stored after that point is never run.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the announcement cannot be posted.
    /// The callback is stored either way.
    pub fn on_ready<F>(&self, callback: F) -> Result<(), BridgeError>
    where
        F: FnOnce(&ReadyPayload) + 'static,
    {
        self.inner
            .registry
            .borrow_mut()
            .set_ready_callback(callback);
        self.send(OutboundMessage::PluginRegisterEvent {
            version: VersionInfo::current(),
        })
    }

    /// Alias of [`PluginBridge::on_ready`] kept for older plugins. The
    /// settings argument is ignored and nothing happens without a callback.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the announcement cannot be posted.
    pub fn register<F>(&self, _settings: Value, callback: Option<F>) -> Result<(), BridgeError>
    where
        F: FnOnce(&ReadyPayload) + 'static,
    {
        match callback {
            Some(callback) => self.on_ready(callback),
            None => Ok(()),
        }
    }

    /// Reports the plugin's height to the host.
    ///
    /// A non-zero `fixed_height` is sent verbatim. Otherwise the content is
    /// measured and the largest of its scroll, offset and client heights is
    /// sent.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the message cannot be posted.
    pub fn set_height(&self, fixed_height: Option<u32>) -> Result<(), BridgeError> {
        let height = match fixed_height.filter(|height| *height > 0) {
            Some(height) => height,
            None => self.inner.measure.dimensions().max_extent(),
        };
        self.send(OutboundMessage::PluginHeightCheck { height })
    }

    /// Registers `callback` for updates on any of `paths` and asks the host
    /// for them.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the request cannot be posted. The
    /// listener stays registered either way.
    pub fn subscribe<I, S, F>(&self, paths: I, callback: F) -> Result<(), BridgeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(&DataUpdate) + 'static,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        self.inner
            .registry
            .borrow_mut()
            .register_data_listener(paths.clone(), callback);
        self.send(OutboundMessage::PluginSubscribeToData { paths })
    }

    /// Registers `callback` for events and asks the host for `events`.
    ///
    /// The event names only filter on the host side: the callback receives
    /// every event delivered to this plugin.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the request cannot be posted. The
    /// listener stays registered either way.
    pub fn on<I, S, F>(&self, events: I, callback: F) -> Result<(), BridgeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(&EventUpdate) + 'static,
    {
        let events: Vec<String> = events.into_iter().map(Into::into).collect();
        self.inner
            .registry
            .borrow_mut()
            .register_event_listener(callback);
        self.send(OutboundMessage::PluginSubscribeToEvent { events })
    }

    /// Raises `event` with `data` in the host application.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the message cannot be posted.
    pub fn call(&self, event: impl Into<String>, data: Value) -> Result<(), BridgeError> {
        self.send(OutboundMessage::PluginCallEvent {
            event: event.into(),
            data,
        })
    }

    /// Shows a notification in the host application.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the message cannot be posted.
    pub fn send_notification(&self, message: impl Into<Notification>) -> Result<(), BridgeError> {
        self.call_with(SEND_NOTIFICATION_EVENT, &message.into())
    }

    /// Shows or hides the plugin. The plugin stays mounted either way.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the message cannot be posted.
    pub fn set_visibility(&self, visible: bool) -> Result<(), BridgeError> {
        let update = {
            let registry = self.registry();
            let identity = registry.identity();
            VisibilityUpdate::new(
                identity.slot().map(ToOwned::to_owned),
                identity.name().map(ToOwned::to_owned),
                visible,
            )
        };
        self.call_with(UPDATE_PLUGIN_EVENT, &update)
    }

    /// Asks the host to remove this plugin.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the message cannot be posted.
    pub fn remove(&self) -> Result<(), BridgeError> {
        self.send(OutboundMessage::PluginRemoveRequest)
    }

    /// Subscribes to one well-known data path.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the request cannot be posted.
    pub fn subscribe_to<F>(&self, path: DataPath, callback: F) -> Result<(), BridgeError>
    where
        F: FnMut(&DataUpdate) + 'static,
    {
        self.subscribe([path.as_path()], callback)
    }

    /// Subscribes to the `metadata` path.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the request cannot be posted.
    pub fn subscribe_to_metadata<F>(&self, callback: F) -> Result<(), BridgeError>
    where
        F: FnMut(&DataUpdate) + 'static,
    {
        self.subscribe_to(DataPath::Metadata, callback)
    }

    /// Subscribes to the `info` path.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the request cannot be posted.
    pub fn subscribe_to_info<F>(&self, callback: F) -> Result<(), BridgeError>
    where
        F: FnMut(&DataUpdate) + 'static,
    {
        self.subscribe_to(DataPath::Info, callback)
    }

    /// Subscribes to the `task-info` path.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the request cannot be posted.
    pub fn subscribe_to_task_info<F>(&self, callback: F) -> Result<(), BridgeError>
    where
        F: FnMut(&DataUpdate) + 'static,
    {
        self.subscribe_to(DataPath::TaskInfo, callback)
    }

    /// Subscribes to the `run-metadata` path.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the request cannot be posted.
    pub fn subscribe_to_run_metadata<F>(&self, callback: F) -> Result<(), BridgeError>
    where
        F: FnMut(&DataUpdate) + 'static,
    {
        self.subscribe_to(DataPath::RunMetadata, callback)
    }

    /// Subscribes to the `run-info` path.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] if the request cannot be posted.
    pub fn subscribe_to_run_info<F>(&self, callback: F) -> Result<(), BridgeError>
    where
        F: FnMut(&DataUpdate) + 'static,
    {
        self.subscribe_to(DataPath::RunInfo, callback)
    }

    fn call_with<P: Serialize>(&self, event: &str, payload: &P) -> Result<(), BridgeError> {
        let data = serde_json::to_value(payload).map_err(|error| BridgeError::Send {
            kind: "PluginCallEvent",
            source: TransportError::from(error),
        })?;
        self.call(event, data)
    }

    fn send(&self, message: OutboundMessage) -> Result<(), BridgeError> {
        let kind = message.kind();
        debug!(frame = %self.inner.frame_name, kind, "posting message to host");
        let envelope = Envelope::new(self.inner.frame_name.as_str(), message);
        self.inner
            .transport
            .post(&envelope)
            .map_err(|source| BridgeError::Send { kind, source })
    }
}
