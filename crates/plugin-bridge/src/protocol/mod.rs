//! Wire types for the plugin-frame message protocol.
//!
//! The host and the plugin exchange plain structured records over a
//! `postMessage`-style channel. Every record carries a `type` discriminator.
//! Inbound records (host to plugin) decode into [`InboundMessage`]; records
//! with a missing or unknown `type`, or that are not objects at all, decode
//! into [`InboundMessage::Ignored`] instead of failing. Outbound records
//! (plugin to host) are [`OutboundMessage`] values wrapped in an
//! [`Envelope`] that names the sending frame.
//!
//! The protocol has no correlation identifiers: a reply cannot be tied to
//! the request that caused it, only to its `type` and `path`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, IntoStaticStr};

/// Protocol version reported to the host at registration time.
pub const API_VERSION: &str = "1.2.0";

/// Event name used by [`OutboundMessage::PluginCallEvent`] for notifications.
pub const SEND_NOTIFICATION_EVENT: &str = "SEND_NOTIFICATION";

/// Event name used by [`OutboundMessage::PluginCallEvent`] for visibility
/// updates.
pub const UPDATE_PLUGIN_EVENT: &str = "UPDATE_PLUGIN";

/// Version block sent with [`OutboundMessage::PluginRegisterEvent`].
///
/// # Example
///
/// ```
/// use plugin_bridge::protocol::{API_VERSION, VersionInfo};
///
/// let version = VersionInfo::current();
/// assert_eq!(version.api(), API_VERSION);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    api: String,
}

impl VersionInfo {
    /// Returns the version block for this implementation of the protocol.
    #[must_use]
    pub fn current() -> Self {
        Self {
            api: API_VERSION.to_owned(),
        }
    }

    /// Returns the API version string.
    #[must_use]
    pub const fn api(&self) -> &str {
        self.api.as_str()
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A message received from the host, discriminated by its `type` field.
///
/// # Example
///
/// ```
/// use plugin_bridge::protocol::InboundMessage;
///
/// let message = InboundMessage::from_json(r#"{"type":"DataUpdate","path":"metadata"}"#);
/// assert!(matches!(message, InboundMessage::DataUpdate(_)));
///
/// let unknown = InboundMessage::from_json(r#"{"type":"Heartbeat"}"#);
/// assert_eq!(unknown, InboundMessage::Ignored);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, IntoStaticStr)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Initialization payload; only the first one of a session is honoured.
    ReadyToRender(ReadyToRender),
    /// New data for a subscribed path.
    DataUpdate(DataUpdate),
    /// An event broadcast by the host or by another plugin.
    EventUpdate(EventUpdate),
    /// Anything without a recognised `type`.
    #[serde(other)]
    Ignored,
}

impl InboundMessage {
    /// Decodes a structured value, mapping malformed input to
    /// [`InboundMessage::Ignored`].
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        // Serde also accepts variant indices as tags; the wire uses names only.
        if !value.get("type").is_some_and(Value::is_string) {
            return Self::Ignored;
        }
        serde_json::from_value(value).unwrap_or(Self::Ignored)
    }

    /// Decodes JSON text, mapping invalid JSON or malformed records to
    /// [`InboundMessage::Ignored`].
    #[must_use]
    pub fn from_json(text: &str) -> Self {
        serde_json::from_str::<Value>(text).map_or(Self::Ignored, Self::from_value)
    }

    /// Returns the wire name of the message kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Initialization payload sent by the host once the frame is ready.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReadyToRender {
    #[serde(default)]
    config: Value,
    #[serde(default)]
    resource: Value,
    #[serde(default)]
    settings: Value,
}

impl ReadyToRender {
    /// Creates a payload from its three parts.
    #[must_use]
    pub const fn new(config: Value, resource: Value, settings: Value) -> Self {
        Self {
            config,
            resource,
            settings,
        }
    }

    /// Plugin configuration (the manifest), exposed to plugins as
    /// `parameters`.
    #[must_use]
    pub const fn config(&self) -> &Value {
        &self.config
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

    /// Splits the payload into `(config, resource, settings)`.
    #[must_use]
    pub fn into_parts(self) -> (Value, Value, Value) {
        (self.config, self.resource, self.settings)
    }
}

/// Data pushed by the host for a subscribed path.
///
/// Fields other than `path` and `data` are kept verbatim in
/// [`DataUpdate::extra`] so listeners receive the full message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(default)]
    data: Value,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl DataUpdate {
    /// Creates an update for `path` carrying `data`.
    #[must_use]
    pub fn new(path: impl Into<String>, data: Value) -> Self {
        Self {
            path: Some(path.into()),
            data,
            extra: Map::new(),
        }
    }

    /// Creates an update without a path. Routers never deliver these.
    #[must_use]
    pub fn without_path(data: Value) -> Self {
        Self {
            path: None,
            data,
            extra: Map::new(),
        }
    }

    /// Returns the data path, if present.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns the data payload (`null` when absent).
    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    /// Returns any additional fields sent with the update.
    #[must_use]
    pub const fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// An event message; its shape is defined by whoever raised the event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventUpdate {
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl EventUpdate {
    /// Creates an event from its fields.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Returns a single field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the conventional `data` field, if present.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.get("data")
    }

    /// Returns every field of the event.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A message sent from the plugin to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Announces the plugin and its protocol version.
    PluginRegisterEvent {
        /// Protocol version block.
        version: VersionInfo,
    },
    /// Reports the height the plugin wants to be rendered at.
    PluginHeightCheck {
        /// Height in pixels.
        height: u32,
    },
    /// Requests updates for the named data paths.
    PluginSubscribeToData {
        /// Data paths, forwarded exactly as given.
        paths: Vec<String>,
    },
    /// Requests the named events.
    PluginSubscribeToEvent {
        /// Event names, used by the host for filtering.
        events: Vec<String>,
    },
    /// Raises an event in the host application.
    PluginCallEvent {
        /// Event name.
        event: String,
        /// Event payload.
        data: Value,
    },
    /// Asks the host to remove this plugin.
    PluginRemoveRequest,
}

impl OutboundMessage {
    /// Returns the wire name of the message kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// An outbound message stamped with the sending frame's identity.
///
/// Serialises flat: `{ "name": ..., "type": ..., ...fields }`.
///
/// # Example
///
/// ```
/// use plugin_bridge::protocol::{Envelope, OutboundMessage};
///
/// let envelope = Envelope::new("frame-1", OutboundMessage::PluginRemoveRequest);
/// let json = serde_json::to_value(&envelope).expect("serialise");
/// assert_eq!(json["name"], "frame-1");
/// assert_eq!(json["type"], "PluginRemoveRequest");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    name: String,
    #[serde(flatten)]
    message: OutboundMessage,
}

impl Envelope {
    /// Wraps `message` for the frame called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, message: OutboundMessage) -> Self {
        Self {
            name: name.into(),
            message,
        }
    }

    /// Returns the sending frame's identity.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the wrapped message.
    #[must_use]
    pub const fn message(&self) -> &OutboundMessage {
        &self.message
    }

    /// Consumes the envelope, returning the wrapped message.
    #[must_use]
    pub fn into_message(self) -> OutboundMessage {
        self.message
    }
}

/// Payload of a [`SEND_NOTIFICATION_EVENT`] call.
///
/// Serialises either as a bare string or as `{ "type": ..., "message": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Notification {
    /// Plain notification text.
    Text(String),
    /// Notification with a host-defined kind such as `success` or `danger`.
    Structured {
        /// Notification kind understood by the host.
        #[serde(rename = "type")]
        kind: String,
        /// Notification text.
        message: String,
    },
}

impl Notification {
    /// Creates a notification with an explicit kind.
    #[must_use]
    pub fn structured(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structured {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<&str> for Notification {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Notification {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Payload of an [`UPDATE_PLUGIN_EVENT`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityUpdate {
    slot: Option<String>,
    name: Option<String>,
    visible: bool,
}

impl VisibilityUpdate {
    /// Creates a visibility update for the plugin in `slot` named `name`.
    #[must_use]
    pub const fn new(slot: Option<String>, name: Option<String>, visible: bool) -> Self {
        Self {
            slot,
            name,
            visible,
        }
    }

    /// Slot the plugin is mounted in.
    #[must_use]
    pub fn slot(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    /// Plugin name from its manifest.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Requested visibility.
    #[must_use]
    pub const fn visible(&self) -> bool {
        self.visible
    }
}

/// Well-known data paths offered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum DataPath {
    /// Metadata of the resource the plugin is shown for.
    Metadata,
    /// General information about the resource.
    Info,
    /// Information about the current task.
    TaskInfo,
    /// Metadata of the current run.
    RunMetadata,
    /// Information about the current run.
    RunInfo,
}

impl DataPath {
    /// Returns the path name used on the wire.
    #[must_use]
    pub fn as_path(self) -> &'static str {
        self.into()
    }
}
