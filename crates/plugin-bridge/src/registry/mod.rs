//! Subscription bookkeeping for one plugin session.
//!
//! The [`SubscriptionRegistry`] holds the data and event listeners registered
//! through the plugin-facing API, the single ready callback, and the
//! initialization state populated by the first `ReadyToRender` message. It is
//! owned by one session and shared between the facade and the router through
//! a [`SharedRegistry`] handle; nothing here is process-global.
//!
//! Listener lists are append-only. Data listeners are matched by path at
//! dispatch time; event listeners are not filtered at all, because the event
//! names given at subscription are only forwarded to the host.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::protocol::{DataUpdate, EventUpdate};

/// Registry handle shared by the facade and the router of one session.
pub type SharedRegistry = Rc<RefCell<SubscriptionRegistry>>;

/// Callback invoked once with the initialization payload.
pub type ReadyCallback = Box<dyn FnOnce(&ReadyPayload)>;

pub(crate) type SharedCallback<M> = Rc<RefCell<dyn FnMut(&M)>>;

/// A data listener and the paths it was registered for.
pub struct DataListener {
    paths: Vec<String>,
    callback: SharedCallback<DataUpdate>,
}

impl DataListener {
    /// Paths this listener was registered for, as given.
    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Returns `true` when `path` is one of the listener's paths.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.paths.iter().any(|candidate| candidate == path)
    }
}

impl fmt::Debug for DataListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataListener")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

/// An event listener. Receives every inbound event.
pub struct EventListener {
    callback: SharedCallback<EventUpdate>,
}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener").finish_non_exhaustive()
    }
}

/// The three payload fields handed to the ready callback and exposed on the
/// facade as `parameters`, `resource` and `settings`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyPayload {
    parameters: Value,
    resource: Value,
    settings: Value,
}

impl Default for ReadyPayload {
    fn default() -> Self {
        Self {
            parameters: Value::Object(Map::new()),
            resource: Value::Object(Map::new()),
            settings: Value::Null,
        }
    }
}

impl ReadyPayload {
    /// Plugin parameters (the `config` of the `ReadyToRender` message).
    #[must_use]
    pub const fn parameters(&self) -> &Value {
        &self.parameters
    }

    /// Identifiers of the resource the plugin is rendered for.
    #[must_use]
    pub const fn resource(&self) -> &Value {
        &self.resource
    }

    /// Host-provided settings.
    #[must_use]
    pub const fn settings(&self) -> &Value {
        &self.settings
    }
}

/// Where the plugin is mounted and what it was configured with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginIdentity {
    slot: Option<String>,
    manifest: Option<Value>,
}

impl PluginIdentity {
    /// Derives the identity from a `ReadyToRender` config.
    ///
    /// The slot is read from `config.config.slot`; any missing level, or a
    /// slot that is not a string, yields `None`.
    ///
    /// # Example
    ///
    /// ```
    /// use plugin_bridge::registry::PluginIdentity;
    /// use serde_json::json;
    ///
    /// let identity = PluginIdentity::from_config(&json!({"config": {"slot": "S"}}));
    /// assert_eq!(identity.slot(), Some("S"));
    ///
    /// let empty = PluginIdentity::from_config(&json!({"config": {}}));
    /// assert_eq!(empty.slot(), None);
    /// ```
    #[must_use]
    pub fn from_config(config: &Value) -> Self {
        let slot = config
            .get("config")
            .and_then(|inner| inner.get("slot"))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        let manifest = (!config.is_null()).then(|| config.clone());
        Self { slot, manifest }
    }

    /// Slot the plugin is mounted in.
    #[must_use]
    pub fn slot(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    /// Full manifest (the `ReadyToRender` config).
    #[must_use]
    pub const fn manifest(&self) -> Option<&Value> {
        self.manifest.as_ref()
    }

    /// Plugin name taken from the manifest's `name` field.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.manifest
            .as_ref()
            .and_then(|manifest| manifest.get("name"))
            .and_then(Value::as_str)
    }
}

/// Listener lists, ready callback, and initialization state of a session.
///
/// # Example
///
/// ```
/// use plugin_bridge::registry::SubscriptionRegistry;
/// use serde_json::json;
///
/// let mut registry = SubscriptionRegistry::new();
/// registry.register_data_listener(vec!["metadata".into()], |_update| {});
/// assert_eq!(registry.data_listeners().len(), 1);
///
/// assert!(registry.try_set_ready(json!({"config": {"slot": "S"}}), json!({}), json!(null)));
/// assert!(!registry.try_set_ready(json!({}), json!({}), json!(null)));
/// assert_eq!(registry.identity().slot(), Some("S"));
/// ```
#[derive(Default)]
pub struct SubscriptionRegistry {
    data_listeners: Vec<DataListener>,
    event_listeners: Vec<EventListener>,
    initialised: bool,
    payload: ReadyPayload,
    identity: PluginIdentity,
    ready_callback: Option<ReadyCallback>,
}

impl SubscriptionRegistry {
    /// Creates an empty, uninitialised registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry wrapped for sharing within one session.
    #[must_use]
    pub fn shared() -> SharedRegistry {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Appends a data listener. Paths are not validated: empty lists,
    /// duplicates and unknown names are all accepted.
    pub fn register_data_listener<F>(&mut self, paths: Vec<String>, callback: F)
    where
        F: FnMut(&DataUpdate) + 'static,
    {
        let callback: SharedCallback<DataUpdate> = Rc::new(RefCell::new(callback));
        self.data_listeners.push(DataListener { paths, callback });
    }

    /// Appends an event listener. It will receive every inbound event.
    pub fn register_event_listener<F>(&mut self, callback: F)
    where
        F: FnMut(&EventUpdate) + 'static,
    {
        let callback: SharedCallback<EventUpdate> = Rc::new(RefCell::new(callback));
        self.event_listeners.push(EventListener { callback });
    }

    /// Records the initialization payload the first time it is called.
    ///
    /// Returns `false` without changing anything once the registry has been
    /// initialised.
    pub fn try_set_ready(&mut self, config: Value, resource: Value, settings: Value) -> bool {
        if self.initialised {
            return false;
        }
        self.identity = PluginIdentity::from_config(&config);
        self.payload = ReadyPayload {
            parameters: config,
            resource,
            settings,
        };
        self.initialised = true;
        true
    }

    /// Stores the ready callback, replacing any previous one.
    pub fn set_ready_callback<F>(&mut self, callback: F)
    where
        F: FnOnce(&ReadyPayload) + 'static,
    {
        self.ready_callback = Some(Box::new(callback));
    }

    /// Removes and returns the ready callback.
    pub fn take_ready_callback(&mut self) -> Option<ReadyCallback> {
        self.ready_callback.take()
    }

    /// Returns `true` when a ready callback is stored.
    #[must_use]
    pub const fn has_ready_callback(&self) -> bool {
        self.ready_callback.is_some()
    }

    /// Returns `true` once a `ReadyToRender` payload has been recorded.
    #[must_use]
    pub const fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// Initialization payload, or the defaults before initialization.
    #[must_use]
    pub const fn payload(&self) -> &ReadyPayload {
        &self.payload
    }

    /// Plugin identity, empty before initialization.
    #[must_use]
    pub const fn identity(&self) -> &PluginIdentity {
        &self.identity
    }

    /// Registered data listeners in registration order.
    #[must_use]
    pub fn data_listeners(&self) -> &[DataListener] {
        &self.data_listeners
    }

    /// Registered event listeners in registration order.
    #[must_use]
    pub fn event_listeners(&self) -> &[EventListener] {
        &self.event_listeners
    }

    /// Snapshot of the callbacks whose listeners match `path`, in
    /// registration order.
    pub(crate) fn data_callbacks_for(&self, path: &str) -> Vec<SharedCallback<DataUpdate>> {
        self.data_listeners
            .iter()
            .filter(|listener| listener.matches(path))
            .map(|listener| Rc::clone(&listener.callback))
            .collect()
    }

    /// Snapshot of every event callback, in registration order.
    pub(crate) fn event_callbacks(&self) -> Vec<SharedCallback<EventUpdate>> {
        self.event_listeners
            .iter()
            .map(|listener| Rc::clone(&listener.callback))
            .collect()
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("data_listeners", &self.data_listeners)
            .field("event_listeners", &self.event_listeners.len())
            .field("initialised", &self.initialised)
            .field("identity", &self.identity)
            .field("has_ready_callback", &self.ready_callback.is_some())
            .finish_non_exhaustive()
    }
}
