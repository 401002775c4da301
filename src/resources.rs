//! Bridge, endpoint, playback and application resources.
//!
//! Resources reference each other only by id: a [`Bridge`] lists channel ids,
//! never channel snapshots. Asterisk is authoritative for resource state, so
//! a caller that needs the channels behind those ids asks the server again.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::constants::FIELD_TYPE;
use crate::error::MalformedPayloadError;
use crate::event::AriEventType;
use crate::payload::{FromPayload, PayloadFields};

/// Error returned when parsing an unknown bridge type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBridgeTypeError(pub String);

impl std::fmt::Display for ParseBridgeTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown bridge type: {}", self.0)
    }
}

impl std::error::Error for ParseBridgeTypeError {}

define_wire_enum! {
    error_type: ParseBridgeTypeError,
    /// Bridge media type (`Bridge.bridge_type`).
    pub enum BridgeType {
        Mixing => "mixing",
        Holding => "holding",
    }
}

/// Error returned when parsing an unknown playback state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePlaybackStateError(pub String);

impl std::fmt::Display for ParsePlaybackStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown playback state: {}", self.0)
    }
}

impl std::error::Error for ParsePlaybackStateError {}

define_wire_enum! {
    error_type: ParsePlaybackStateError,
    /// Playback lifecycle state (`Playback.state`).
    pub enum PlaybackState {
        Queued => "queued",
        Playing => "playing",
        Continuing => "continuing",
        Done => "done",
        Failed => "failed",
        Canceled => "canceled",
    }
}

/// Error returned when parsing an unknown endpoint state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEndpointStateError(pub String);

impl std::fmt::Display for ParseEndpointStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown endpoint state: {}", self.0)
    }
}

impl std::error::Error for ParseEndpointStateError {}

define_wire_enum! {
    error_type: ParseEndpointStateError,
    /// Endpoint registration state (`Endpoint.state`).
    pub enum EndpointState {
        Unknown => "unknown",
        Offline => "offline",
        Online => "online",
    }
}

/// A bridge snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bridge {
    id: String,
    technology: String,
    bridge_type: String,
    channels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bridge_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    creationtime: Option<String>,
}

impl Bridge {
    /// Unique bridge id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Bridging technology in use, e.g. `simple_bridge` or `softmix`.
    pub fn technology(&self) -> &str {
        &self.technology
    }

    /// Raw bridge type string.
    pub fn bridge_type(&self) -> &str {
        &self.bridge_type
    }

    /// Parse [`Bridge::bridge_type`] into a [`BridgeType`].
    pub fn kind(&self) -> Option<BridgeType> {
        self.bridge_type
            .parse()
            .ok()
    }

    /// Ids of the channels currently in the bridge.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Whether the channel id is in the bridge.
    pub fn contains_channel(&self, channel_id: &str) -> bool {
        self.channels
            .iter()
            .any(|c| c == channel_id)
    }

    /// Bridge class (`stasis`, `base`, ...).
    pub fn bridge_class(&self) -> Option<&str> {
        self.bridge_class
            .as_deref()
    }

    /// Entity that created the bridge.
    pub fn creator(&self) -> Option<&str> {
        self.creator
            .as_deref()
    }

    /// Name given at creation.
    pub fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
    }

    /// Video mode (`none`, `talker`, `sfu`, `single`).
    pub fn video_mode(&self) -> Option<&str> {
        self.video_mode
            .as_deref()
    }

    /// Channel id of the video source in `single` mode.
    pub fn video_source_id(&self) -> Option<&str> {
        self.video_source_id
            .as_deref()
    }

    /// Creation timestamp.
    pub fn creationtime(&self) -> Option<&str> {
        self.creationtime
            .as_deref()
    }
}

impl FromPayload for Bridge {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            id: f.required_str("id")?,
            technology: f.required_str("technology")?,
            bridge_type: f.required_str("bridge_type")?,
            channels: f.required_string_list("channels")?,
            bridge_class: f.optional_str("bridge_class")?,
            creator: f.optional_str("creator")?,
            name: f.optional_str("name")?,
            video_mode: f.optional_str("video_mode")?,
            video_source_id: f.optional_str("video_source_id")?,
            creationtime: f.optional_str("creationtime")?,
        })
    }
}

/// An endpoint (e.g. `PJSIP/alice`) snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    technology: String,
    resource: String,
    channel_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<String>,
}

impl Endpoint {
    /// Technology, e.g. `PJSIP`.
    pub fn technology(&self) -> &str {
        &self.technology
    }

    /// Resource name within the technology.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Ids of channels associated with the endpoint.
    pub fn channel_ids(&self) -> &[String] {
        &self.channel_ids
    }

    /// Raw state string.
    pub fn state(&self) -> Option<&str> {
        self.state
            .as_deref()
    }

    /// Parse [`Endpoint::state`] into an [`EndpointState`].
    pub fn endpoint_state(&self) -> Option<EndpointState> {
        self.state
            .as_deref()?
            .parse()
            .ok()
    }

    /// `technology/resource`, the form used in dial strings.
    pub fn address(&self) -> String {
        format!("{}/{}", self.technology, self.resource)
    }
}

impl FromPayload for Endpoint {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            technology: f.required_str("technology")?,
            resource: f.required_str("resource")?,
            channel_ids: f.required_string_list("channel_ids")?,
            state: f.optional_str("state")?,
        })
    }
}

/// A media playback snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Playback {
    id: String,
    media_uri: String,
    target_uri: String,
    state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_media_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

impl Playback {
    /// Playback id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Media being played, e.g. `sound:hello-world`.
    pub fn media_uri(&self) -> &str {
        &self.media_uri
    }

    /// Target of the playback, e.g. `channel:1700000000.42`.
    pub fn target_uri(&self) -> &str {
        &self.target_uri
    }

    /// Raw state string.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Parse [`Playback::state`] into a [`PlaybackState`].
    pub fn playback_state(&self) -> Option<PlaybackState> {
        self.state
            .parse()
            .ok()
    }

    /// Next media in a playlist playback.
    pub fn next_media_uri(&self) -> Option<&str> {
        self.next_media_uri
            .as_deref()
    }

    /// Language used for sound lookups.
    pub fn language(&self) -> Option<&str> {
        self.language
            .as_deref()
    }
}

impl FromPayload for Playback {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            id: f.required_str("id")?,
            media_uri: f.required_str("media_uri")?,
            target_uri: f.required_str("target_uri")?,
            state: f.required_str("state")?,
            next_media_uri: f.optional_str("next_media_uri")?,
            language: f.optional_str("language")?,
        })
    }
}

/// One entry of an application's event filter.
///
/// Asterisk defines no schema for filter entries beyond matching on `type`;
/// any other keys are kept as sent.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFilter {
    type_name: Option<String>,
    body: Map<String, Value>,
}

impl EventFilter {
    /// Event type this entry matches, if it names one.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name
            .as_deref()
    }

    /// Typed discriminant, `None` when absent or outside the event table.
    pub fn event_type(&self) -> Option<AriEventType> {
        self.type_name()?
            .parse()
            .ok()
    }

    /// Whether this entry matches events of `type_name`.
    pub fn matches(&self, type_name: &str) -> bool {
        self.type_name() == Some(type_name)
    }

    /// The entry as sent.
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }
}

impl FromPayload for EventFilter {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        Ok(Self {
            type_name: PayloadFields::new(obj).optional_str(FIELD_TYPE)?,
            body: obj.clone(),
        })
    }
}

impl Serialize for EventFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body
            .serialize(serializer)
    }
}

/// A Stasis application and what it is subscribed to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Application {
    name: String,
    channel_ids: Vec<String>,
    bridge_ids: Vec<String>,
    endpoint_ids: Vec<String>,
    device_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    events_allowed: Option<Vec<EventFilter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    events_disallowed: Option<Vec<EventFilter>>,
}

impl Application {
    /// Application name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribed channel ids.
    pub fn channel_ids(&self) -> &[String] {
        &self.channel_ids
    }

    /// Subscribed bridge ids.
    pub fn bridge_ids(&self) -> &[String] {
        &self.bridge_ids
    }

    /// Subscribed endpoints, as `technology/resource`.
    pub fn endpoint_ids(&self) -> &[String] {
        &self.endpoint_ids
    }

    /// Subscribed device names.
    pub fn device_names(&self) -> &[String] {
        &self.device_names
    }

    /// Event filter allow-list, if one is set.
    pub fn events_allowed(&self) -> Option<&[EventFilter]> {
        self.events_allowed
            .as_deref()
    }

    /// Event filter deny-list, if one is set.
    pub fn events_disallowed(&self) -> Option<&[EventFilter]> {
        self.events_disallowed
            .as_deref()
    }

    /// Whether the application's filters let events of `type_name` through.
    ///
    /// A non-empty allow-list admits only the types it names; the deny-list
    /// is applied after it.
    pub fn allows(&self, type_name: &str) -> bool {
        let allowed = match self.events_allowed() {
            Some(list) if !list.is_empty() => list
                .iter()
                .any(|f| f.matches(type_name)),
            _ => true,
        };
        allowed
            && !self
                .events_disallowed()
                .unwrap_or_default()
                .iter()
                .any(|f| f.matches(type_name))
    }
}

impl FromPayload for Application {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            name: f.required_str("name")?,
            channel_ids: f.required_string_list("channel_ids")?,
            bridge_ids: f.required_string_list("bridge_ids")?,
            endpoint_ids: f.required_string_list("endpoint_ids")?,
            device_names: f.required_string_list("device_names")?,
            events_allowed: f.optional_list("events_allowed")?,
            events_disallowed: f.optional_list("events_disallowed")?,
        })
    }
}
