//! ARI event variants and discriminant-driven projection

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::channel::Channel;
use crate::constants::{FIELD_APPLICATION, FIELD_ASTERISK_ID, FIELD_TIMESTAMP};
use crate::error::{AriResult, MalformedPayloadError};
use crate::payload::{AriMessage, FromPayload, PayloadFields, RawMessage};
use crate::resources::{Bridge, Playback};

/// Error returned when parsing an unknown event type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEventTypeError(pub String);

impl std::fmt::Display for ParseEventTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for ParseEventTypeError {}

/// Fields carried by every ARI event besides the discriminant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    application: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    asterisk_id: Option<String>,
}

impl EventMetadata {
    /// Stasis application the event was delivered to.
    pub fn application(&self) -> Option<&str> {
        self.application
            .as_deref()
    }

    /// Time the event was raised (ISO-8601 as sent).
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp
            .as_deref()
    }

    /// Id of the Asterisk instance that raised the event.
    pub fn asterisk_id(&self) -> Option<&str> {
        self.asterisk_id
            .as_deref()
    }
}

impl FromPayload for EventMetadata {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            application: f.optional_str(FIELD_APPLICATION)?,
            timestamp: f.optional_str(FIELD_TIMESTAMP)?,
            asterisk_id: f.optional_str(FIELD_ASTERISK_ID)?,
        })
    }
}

/// A typed event struct that corresponds to exactly one [`AriEventType`].
///
/// Used by [`EventRouter::on`](crate::EventRouter::on) to hand handlers the
/// concrete variant instead of the [`AriEvent`] enum.
pub trait EventVariant: FromPayload + Send + Sync + 'static {
    /// Discriminant of this variant.
    const EVENT_TYPE: AriEventType;

    /// Borrow this variant out of an [`AriEvent`], if it matches.
    fn from_event(event: &AriEvent) -> Option<&Self>;

    /// Common event fields.
    fn metadata(&self) -> &EventMetadata;
}

/// Generates `AriEventType`, the `AriEvent` sum type, the projection table and
/// the `EventVariant` impls from one list.
macro_rules! ari_events {
    (
        $(
            $(#[$attr:meta])*
            $variant:ident => $wire:literal
        ),+ $(,)?
    ) => {
        define_wire_enum! {
            error_type: ParseEventTypeError,
            /// Event discriminants with a typed projection.
            ///
            /// Matching is exact and case-sensitive, as sent by Asterisk in the
            /// `type` field. Anything else projects to [`AriEvent::Other`].
            pub enum AriEventType {
                $(
                    $(#[$attr])*
                    $variant => $wire,
                )+
            }
        }

        /// A projected ARI event: one typed arm per [`AriEventType`] plus a
        /// generic fallback for discriminants outside the table.
        #[derive(Debug, Clone, PartialEq)]
        #[non_exhaustive]
        pub enum AriEvent {
            $(
                $(#[$attr])*
                $variant($variant),
            )+
            /// Any event whose `type` is not in the table.
            Other(GenericEvent),
        }

        impl AriEvent {
            /// Project `body` as the variant named by `event_type`.
            pub fn project(
                event_type: AriEventType,
                body: &Map<String, Value>,
            ) -> Result<Self, MalformedPayloadError> {
                match event_type {
                    $( AriEventType::$variant => $variant::from_payload(body).map(AriEvent::$variant), )+
                }
            }

            /// Typed discriminant, `None` for [`AriEvent::Other`].
            pub fn event_type(&self) -> Option<AriEventType> {
                match self {
                    $( AriEvent::$variant(_) => Some(AriEventType::$variant), )+
                    AriEvent::Other(_) => None,
                }
            }

            /// Wire discriminant, including unknown ones.
            pub fn type_name(&self) -> &str {
                match self {
                    $( AriEvent::$variant(_) => $wire, )+
                    AriEvent::Other(e) => e.event_type(),
                }
            }

            /// Common event fields.
            pub fn metadata(&self) -> &EventMetadata {
                match self {
                    $( AriEvent::$variant(e) => &e.meta, )+
                    AriEvent::Other(e) => &e.meta,
                }
            }
        }

        impl Serialize for AriEvent {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                #[derive(Serialize)]
                #[serde(tag = "type")]
                enum Tagged<'a> {
                    $(
                        #[serde(rename = $wire)]
                        $variant(&'a $variant),
                    )+
                }

                match self {
                    $( AriEvent::$variant(e) => Tagged::$variant(e).serialize(serializer), )+
                    AriEvent::Other(e) => e.serialize(serializer),
                }
            }
        }

        $(
            impl EventVariant for $variant {
                const EVENT_TYPE: AriEventType = AriEventType::$variant;

                fn from_event(event: &AriEvent) -> Option<&Self> {
                    match event {
                        AriEvent::$variant(e) => Some(e),
                        _ => None,
                    }
                }

                fn metadata(&self) -> &EventMetadata {
                    &self.meta
                }
            }

            impl From<$variant> for AriEvent {
                fn from(e: $variant) -> Self {
                    AriEvent::$variant(e)
                }
            }
        )+
    };
}

ari_events! {
    /// A channel entered the Stasis application.
    StasisStart => "StasisStart",
    /// A channel left the Stasis application.
    StasisEnd => "StasisEnd",
    /// A DTMF digit was received on a channel.
    ChannelDtmfReceived => "ChannelDtmfReceived",
    /// A hangup was requested on a channel.
    ChannelHangupRequest => "ChannelHangupRequest",
    /// A channel (or global) variable changed.
    ChannelVarset => "ChannelVarset",
    /// A channel's caller id changed.
    ChannelCallerId => "ChannelCallerId",
    /// A channel was destroyed.
    ChannelDestroyed => "ChannelDestroyed",
    /// A bridge was destroyed.
    BridgeDestroyed => "BridgeDestroyed",
    /// Two bridges merged.
    BridgeMerged => "BridgeMerged",
    /// Dialing state changed.
    Dial => "Dial",
    /// A playback finished.
    PlaybackFinished => "PlaybackFinished",
}

impl AriEvent {
    /// Project an already decoded message, falling back to
    /// [`AriEvent::Other`] for discriminants outside the table.
    pub fn from_message(message: AriMessage) -> AriResult<Self> {
        match message.event_type() {
            Some(event_type) => {
                trace!("[PROJECT] Projecting {} event", event_type);
                Ok(Self::project(event_type, message.body())?)
            }
            None => {
                trace!(
                    "[PROJECT] No typed projection for {}, using generic event",
                    message.message_type()
                );
                Ok(AriEvent::Other(GenericEvent::from_message(message)?))
            }
        }
    }

    /// Application the event was delivered to.
    pub fn application(&self) -> Option<&str> {
        self.metadata()
            .application()
    }

    /// Primary channel of a channel-scoped event.
    ///
    /// For [`Dial`] this is the peer channel; for [`ChannelVarset`] it is
    /// `None` when the variable is global.
    pub fn channel(&self) -> Option<&Channel> {
        match self {
            AriEvent::StasisStart(e) => Some(&e.channel),
            AriEvent::StasisEnd(e) => Some(&e.channel),
            AriEvent::ChannelDtmfReceived(e) => Some(&e.channel),
            AriEvent::ChannelHangupRequest(e) => Some(&e.channel),
            AriEvent::ChannelVarset(e) => e
                .channel
                .as_ref(),
            AriEvent::ChannelCallerId(e) => Some(&e.channel),
            AriEvent::ChannelDestroyed(e) => Some(&e.channel),
            AriEvent::Dial(e) => Some(&e.peer),
            AriEvent::BridgeDestroyed(_)
            | AriEvent::BridgeMerged(_)
            | AriEvent::PlaybackFinished(_)
            | AriEvent::Other(_) => None,
        }
    }

    /// Borrow the event as a concrete variant.
    pub fn downcast_ref<E: EventVariant>(&self) -> Option<&E> {
        E::from_event(self)
    }
}

/// Project an inbound event message.
///
/// Unknown discriminants always fall back to [`AriEvent::Other`]; use an
/// [`EventRouter`](crate::EventRouter) configured with
/// [`UnknownEventPolicy::Reject`](crate::UnknownEventPolicy::Reject) to
/// reject them instead.
///
/// ```
/// use asterisk_ari_events::{project_event, AriEvent};
///
/// let event = project_event(
///     r##"{"type":"ChannelDtmfReceived","channel":{"id":"2","name":"SIP/bar-1","state":"Up"},"digit":"#","duration_ms":120}"##,
/// ).unwrap();
/// match event {
///     AriEvent::ChannelDtmfReceived(dtmf) => {
///         assert_eq!(dtmf.digit(), "#");
///         assert_eq!(dtmf.duration_ms(), 120);
///     }
///     other => panic!("unexpected {:?}", other.event_type()),
/// }
/// ```
pub fn project_event(raw: impl Into<RawMessage>) -> AriResult<AriEvent> {
    AriEvent::from_message(AriMessage::parse(raw)?)
}

/// Fallback for event types without a typed projection.
///
/// Keeps the discriminant, the common metadata and the full decoded object.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericEvent {
    event_type: String,
    meta: EventMetadata,
    body: Map<String, Value>,
}

impl GenericEvent {
    /// Wrap a decoded message.
    pub fn from_message(message: AriMessage) -> Result<Self, MalformedPayloadError> {
        let meta = EventMetadata::from_payload(message.body())?;
        let event_type = message
            .message_type()
            .to_string();
        Ok(Self {
            event_type,
            meta,
            body: message.into_body(),
        })
    }

    /// Wire discriminant.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Common event fields.
    pub fn metadata(&self) -> &EventMetadata {
        &self.meta
    }

    /// The decoded message, `type` included.
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// One field of the decoded message.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body
            .get(name)
    }

    /// Project one nested field of the unknown event into a typed entity,
    /// e.g. the `channel` of a `ChannelStateChange`.
    pub fn project_field<T: FromPayload>(&self, name: &str) -> Result<Option<T>, MalformedPayloadError> {
        PayloadFields::new(&self.body).optional(name)
    }
}

impl Serialize for GenericEvent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body
            .serialize(serializer)
    }
}

/// `StasisStart`: a channel entered the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StasisStart {
    #[serde(flatten)]
    meta: EventMetadata,
    channel: Channel,
    args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replace_channel: Option<Channel>,
}

impl StasisStart {
    /// The channel entering Stasis.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Arguments from the `Stasis(app,args...)` dialplan call.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Channel being replaced, for masquerades.
    pub fn replace_channel(&self) -> Option<&Channel> {
        self.replace_channel
            .as_ref()
    }
}

impl FromPayload for StasisStart {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            meta: EventMetadata::from_payload(obj)?,
            channel: f.required("channel")?,
            args: f.required_string_list("args")?,
            replace_channel: f.optional("replace_channel")?,
        })
    }
}

/// `StasisEnd`: a channel left the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StasisEnd {
    #[serde(flatten)]
    meta: EventMetadata,
    channel: Channel,
}

impl StasisEnd {
    /// The channel leaving Stasis.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }
}

impl FromPayload for StasisEnd {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            meta: EventMetadata::from_payload(obj)?,
            channel: f.required("channel")?,
        })
    }
}

/// `ChannelDtmfReceived`: a DTMF digit ended on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelDtmfReceived {
    #[serde(flatten)]
    meta: EventMetadata,
    channel: Channel,
    digit: String,
    duration_ms: i64,
}

impl ChannelDtmfReceived {
    /// Channel the digit was received on.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// The digit: `0`-`9`, `A`-`E`, `#` or `*`.
    pub fn digit(&self) -> &str {
        &self.digit
    }

    /// Key press duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }
}

impl FromPayload for ChannelDtmfReceived {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            meta: EventMetadata::from_payload(obj)?,
            channel: f.required("channel")?,
            digit: f.required_str("digit")?,
            duration_ms: f.required_i64("duration_ms")?,
        })
    }
}

/// `ChannelHangupRequest`: someone asked the channel to hang up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelHangupRequest {
    #[serde(flatten)]
    meta: EventMetadata,
    channel: Channel,
    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    soft: Option<bool>,
}

impl ChannelHangupRequest {
    /// Channel being hung up.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Q.850 cause code, if given.
    pub fn cause(&self) -> Option<i64> {
        self.cause
    }

    /// Whether this was a soft hangup request.
    pub fn soft(&self) -> Option<bool> {
        self.soft
    }
}

impl FromPayload for ChannelHangupRequest {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            meta: EventMetadata::from_payload(obj)?,
            channel: f.required("channel")?,
            cause: f.optional_i64("cause")?,
            soft: f.optional_bool("soft")?,
        })
    }
}

/// `ChannelVarset`: a variable was set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelVarset {
    #[serde(flatten)]
    meta: EventMetadata,
    variable: String,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<Channel>,
}

impl ChannelVarset {
    /// Variable name.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// New value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Channel the variable belongs to; `None` for global variables.
    pub fn channel(&self) -> Option<&Channel> {
        self.channel
            .as_ref()
    }
}

impl FromPayload for ChannelVarset {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            meta: EventMetadata::from_payload(obj)?,
            variable: f.required_str("variable")?,
            value: f.required_str("value")?,
            channel: f.optional("channel")?,
        })
    }
}

/// `ChannelCallerId`: caller id presentation changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelCallerId {
    #[serde(flatten)]
    meta: EventMetadata,
    channel: Channel,
    caller_presentation: i64,
    caller_presentation_txt: String,
}

impl ChannelCallerId {
    /// Channel whose caller id changed; [`Channel::caller`] holds the new value.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Numeric presentation indicator.
    pub fn caller_presentation(&self) -> i64 {
        self.caller_presentation
    }

    /// Presentation indicator as text, e.g. `Presentation Allowed, Not Screened`.
    pub fn caller_presentation_txt(&self) -> &str {
        &self.caller_presentation_txt
    }
}

impl FromPayload for ChannelCallerId {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            meta: EventMetadata::from_payload(obj)?,
            channel: f.required("channel")?,
            caller_presentation: f.required_i64("caller_presentation")?,
            caller_presentation_txt: f.required_str("caller_presentation_txt")?,
        })
    }
}

/// `ChannelDestroyed`: the channel is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelDestroyed {
    #[serde(flatten)]
    meta: EventMetadata,
    channel: Channel,
    cause: i64,
    cause_txt: String,
}

impl ChannelDestroyed {
    /// Last snapshot of the destroyed channel.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Q.850 hangup cause.
    pub fn cause(&self) -> i64 {
        self.cause
    }

    /// Hangup cause as text, e.g. `Normal Clearing`.
    pub fn cause_txt(&self) -> &str {
        &self.cause_txt
    }
}

impl FromPayload for ChannelDestroyed {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            meta: EventMetadata::from_payload(obj)?,
            channel: f.required("channel")?,
            cause: f.required_i64("cause")?,
            cause_txt: f.required_str("cause_txt")?,
        })
    }
}

/// `BridgeDestroyed`: the bridge is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeDestroyed {
    #[serde(flatten)]
    meta: EventMetadata,
    bridge: Bridge,
}

impl BridgeDestroyed {
    /// Last snapshot of the destroyed bridge.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }
}

impl FromPayload for BridgeDestroyed {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            meta: EventMetadata::from_payload(obj)?,
            bridge: f.required("bridge")?,
        })
    }
}

/// `BridgeMerged`: `bridge_from` was merged into `bridge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeMerged {
    #[serde(flatten)]
    meta: EventMetadata,
    bridge: Bridge,
    bridge_from: Bridge,
}

impl BridgeMerged {
    /// The surviving bridge.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// The bridge that was merged away.
    pub fn bridge_from(&self) -> &Bridge {
        &self.bridge_from
    }
}

impl FromPayload for BridgeMerged {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            meta: EventMetadata::from_payload(obj)?,
            bridge: f.required("bridge")?,
            bridge_from: f.required("bridge_from")?,
        })
    }
}

/// `Dial`: progress of a dial operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dial {
    #[serde(flatten)]
    meta: EventMetadata,
    peer: Channel,
    dialstatus: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    caller: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    forwarded: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    forward: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dialstring: Option<String>,
}

impl Dial {
    /// The channel being dialed.
    pub fn peer(&self) -> &Channel {
        &self.peer
    }

    /// Dial status, e.g. `RINGING`, `ANSWER`, `BUSY`; empty when dialing starts.
    pub fn dialstatus(&self) -> &str {
        &self.dialstatus
    }

    /// The calling channel, if any.
    pub fn caller(&self) -> Option<&Channel> {
        self.caller
            .as_ref()
    }

    /// Channel the call was forwarded to.
    pub fn forwarded(&self) -> Option<&Channel> {
        self.forwarded
            .as_ref()
    }

    /// Forwarding target, if the call was forwarded.
    pub fn forward(&self) -> Option<&str> {
        self.forward
            .as_deref()
    }

    /// Dial string used to reach the peer.
    pub fn dialstring(&self) -> Option<&str> {
        self.dialstring
            .as_deref()
    }
}

impl FromPayload for Dial {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            meta: EventMetadata::from_payload(obj)?,
            peer: f.required("peer")?,
            dialstatus: f.required_str("dialstatus")?,
            caller: f.optional("caller")?,
            forwarded: f.optional("forwarded")?,
            forward: f.optional_str("forward")?,
            dialstring: f.optional_str("dialstring")?,
        })
    }
}

/// `PlaybackFinished`: a playback completed or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackFinished {
    #[serde(flatten)]
    meta: EventMetadata,
    playback: Playback,
}

impl PlaybackFinished {
    /// Final playback snapshot.
    pub fn playback(&self) -> &Playback {
        &self.playback
    }
}

impl FromPayload for PlaybackFinished {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            meta: EventMetadata::from_payload(obj)?,
            playback: f.required("playback")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AriError, JsonShape, MalformedKind};
    use crate::resources::PlaybackState;
    use serde_json::json;

    fn channel_json(id: &str) -> Value {
        json!({"id": id, "name": format!("PJSIP/{id}"), "state": "Up"})
    }

    fn bridge_json(id: &str) -> Value {
        json!({"id": id, "technology": "simple_bridge", "bridge_type": "mixing", "channels": []})
    }

    #[test]
    fn event_type_table_is_exact() {
        let wire = [
            "StasisStart",
            "StasisEnd",
            "ChannelDtmfReceived",
            "ChannelHangupRequest",
            "ChannelVarset",
            "ChannelCallerId",
            "ChannelDestroyed",
            "BridgeDestroyed",
            "BridgeMerged",
            "Dial",
            "PlaybackFinished",
        ];
        assert_eq!(AriEventType::ALL.len(), wire.len());
        for name in wire {
            let parsed: AriEventType = name
                .parse()
                .unwrap();
            assert_eq!(parsed.as_str(), name);
        }
        assert!("stasisstart"
            .parse::<AriEventType>()
            .is_err());
        assert_eq!(
            "ChannelStateChange"
                .parse::<AriEventType>()
                .unwrap_err()
                .to_string(),
            "unknown event type: ChannelStateChange"
        );
    }

    #[test]
    fn stasis_start_scenario() {
        let event = project_event(
            r#"{"type":"StasisStart","channel":{"id":"1","name":"SIP/foo-1","state":"Up","caller":{"name":"Alice","number":"100"}},"args":["dialed"]}"#,
        )
        .unwrap();
        assert_eq!(event.event_type(), Some(AriEventType::StasisStart));
        let start = event
            .downcast_ref::<StasisStart>()
            .unwrap();
        assert_eq!(
            start
                .channel()
                .id(),
            "1"
        );
        assert_eq!(
            start
                .channel()
                .name(),
            "SIP/foo-1"
        );
        assert_eq!(start.args(), ["dialed"]);
        assert!(start
            .replace_channel()
            .is_none());
        assert!(event
            .application()
            .is_none());
    }

    #[test]
    fn dtmf_scenario() {
        let event = project_event(json!({
            "type": "ChannelDtmfReceived",
            "channel": channel_json("2"),
            "digit": "#",
            "duration_ms": 120,
            "application": "demo",
            "timestamp": "2024-05-01T10:00:00.000+0000"
        }))
        .unwrap();
        let AriEvent::ChannelDtmfReceived(dtmf) = &event else {
            panic!("wrong variant: {}", event.type_name());
        };
        assert_eq!(dtmf.digit(), "#");
        assert_eq!(dtmf.duration_ms(), 120);
        assert_eq!(
            dtmf.metadata()
                .application(),
            Some("demo")
        );
        assert_eq!(
            event
                .metadata()
                .timestamp(),
            Some("2024-05-01T10:00:00.000+0000")
        );
        assert_eq!(
            event
                .channel()
                .map(Channel::id),
            Some("2")
        );
    }

    #[test]
    fn dtmf_duration_wrong_shape() {
        let err = project_event(json!({
            "type": "ChannelDtmfReceived",
            "channel": channel_json("2"),
            "digit": "1",
            "duration_ms": "120"
        }))
        .unwrap_err();
        let malformed = err
            .as_malformed()
            .unwrap();
        assert_eq!(malformed.field(), "duration_ms");
        assert_eq!(
            malformed.kind(),
            &MalformedKind::WrongShape {
                expected: JsonShape::Integer,
                actual: JsonShape::String
            }
        );
    }

    #[test]
    fn missing_embedded_channel() {
        let err = project_event(json!({"type": "StasisEnd"})).unwrap_err();
        assert_eq!(
            err.as_malformed()
                .unwrap()
                .field(),
            "channel"
        );

        let err = project_event(json!({
            "type": "StasisEnd",
            "channel": {"id": "1", "state": "Up"}
        }))
        .unwrap_err();
        assert_eq!(
            err.as_malformed()
                .unwrap()
                .field(),
            "channel.name"
        );
    }

    #[test]
    fn hangup_request_optionals() {
        let event = project_event(json!({
            "type": "ChannelHangupRequest",
            "channel": channel_json("3"),
            "cause": 16
        }))
        .unwrap();
        let req = event
            .downcast_ref::<ChannelHangupRequest>()
            .unwrap();
        assert_eq!(req.cause(), Some(16));
        assert_eq!(req.soft(), None);
    }

    #[test]
    fn global_varset_has_no_channel() {
        let event = project_event(json!({
            "type": "ChannelVarset",
            "variable": "GLOBAL_FLAG",
            "value": "1"
        }))
        .unwrap();
        let varset = event
            .downcast_ref::<ChannelVarset>()
            .unwrap();
        assert_eq!(varset.variable(), "GLOBAL_FLAG");
        assert!(varset
            .channel()
            .is_none());
        assert!(event
            .channel()
            .is_none());
    }

    #[test]
    fn caller_id_and_destroyed() {
        let event = project_event(json!({
            "type": "ChannelCallerId",
            "channel": channel_json("4"),
            "caller_presentation": 0,
            "caller_presentation_txt": "Presentation Allowed, Not Screened"
        }))
        .unwrap();
        let cid = event
            .downcast_ref::<ChannelCallerId>()
            .unwrap();
        assert_eq!(cid.caller_presentation(), 0);

        let event = project_event(json!({
            "type": "ChannelDestroyed",
            "channel": channel_json("4"),
            "cause": 16,
            "cause_txt": "Normal Clearing"
        }))
        .unwrap();
        let destroyed = event
            .downcast_ref::<ChannelDestroyed>()
            .unwrap();
        assert_eq!(destroyed.cause(), 16);
        assert_eq!(destroyed.cause_txt(), "Normal Clearing");
    }

    #[test]
    fn bridge_events() {
        let event = project_event(json!({
            "type": "BridgeMerged",
            "bridge": bridge_json("b-1"),
            "bridge_from": bridge_json("b-2")
        }))
        .unwrap();
        let merged = event
            .downcast_ref::<BridgeMerged>()
            .unwrap();
        assert_eq!(
            merged
                .bridge()
                .id(),
            "b-1"
        );
        assert_eq!(
            merged
                .bridge_from()
                .id(),
            "b-2"
        );
        assert!(event
            .channel()
            .is_none());

        let err = project_event(json!({
            "type": "BridgeDestroyed",
            "bridge": {"id": "b-3", "technology": "x", "bridge_type": "mixing"}
        }))
        .unwrap_err();
        assert_eq!(
            err.as_malformed()
                .unwrap()
                .field(),
            "bridge.channels"
        );
    }

    #[test]
    fn dial_event() {
        let event = project_event(json!({
            "type": "Dial",
            "peer": channel_json("5"),
            "caller": channel_json("4"),
            "dialstatus": "RINGING",
            "dialstring": "PJSIP/bob"
        }))
        .unwrap();
        let dial = event
            .downcast_ref::<Dial>()
            .unwrap();
        assert_eq!(
            dial.peer()
                .id(),
            "5"
        );
        assert_eq!(
            dial.caller()
                .map(Channel::id),
            Some("4")
        );
        assert_eq!(dial.dialstatus(), "RINGING");
        assert!(dial
            .forwarded()
            .is_none());
        assert_eq!(
            event
                .channel()
                .map(Channel::id),
            Some("5")
        );
    }

    #[test]
    fn playback_finished() {
        let event = project_event(json!({
            "type": "PlaybackFinished",
            "playback": {
                "id": "pb-1",
                "media_uri": "sound:tt-monkeys",
                "target_uri": "channel:1",
                "state": "done"
            }
        }))
        .unwrap();
        let finished = event
            .downcast_ref::<PlaybackFinished>()
            .unwrap();
        assert_eq!(
            finished
                .playback()
                .playback_state(),
            Some(PlaybackState::Done)
        );
    }

    #[test]
    fn unknown_type_falls_back_to_generic() {
        let event = project_event(json!({
            "type": "ChannelStateChange",
            "application": "demo",
            "channel": channel_json("6")
        }))
        .unwrap();
        assert_eq!(event.event_type(), None);
        assert_eq!(event.type_name(), "ChannelStateChange");
        assert_eq!(event.application(), Some("demo"));
        let AriEvent::Other(generic) = &event else {
            panic!("expected generic event");
        };
        let channel: Channel = generic
            .project_field("channel")
            .unwrap()
            .unwrap();
        assert_eq!(channel.id(), "6");
        assert!(generic
            .field("missing")
            .is_none());
    }

    #[test]
    fn downcast_mismatch_is_none() {
        let event = project_event(json!({"type": "StasisEnd", "channel": channel_json("1")})).unwrap();
        assert!(event
            .downcast_ref::<StasisStart>()
            .is_none());
        assert!(event
            .downcast_ref::<StasisEnd>()
            .is_some());
    }

    #[test]
    fn metadata_wrong_shape_is_malformed() {
        let err = project_event(json!({
            "type": "StasisEnd",
            "application": 5,
            "channel": channel_json("1")
        }))
        .unwrap_err();
        assert!(matches!(err, AriError::MalformedPayload(ref e) if e.field() == "application"));
    }

    #[test]
    fn serialized_event_carries_discriminant() {
        let event = project_event(json!({
            "type": "StasisEnd",
            "application": "demo",
            "channel": channel_json("1")
        }))
        .unwrap();
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "StasisEnd");
        assert_eq!(value["application"], "demo");
        assert_eq!(value["channel"]["id"], "1");

        let raw = json!({"type": "ChannelTalkingStarted", "channel": channel_json("1")});
        let event = project_event(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&event).unwrap(), raw);
    }
}
