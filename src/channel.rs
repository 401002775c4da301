//! Channel resource and its nested caller-id / dialplan entities.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::MalformedPayloadError;
use crate::payload::{FromPayload, PayloadFields};

/// Error returned when parsing an unknown channel state string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseChannelStateError(pub String);

impl std::fmt::Display for ParseChannelStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown channel state: {}", self.0)
    }
}

impl std::error::Error for ParseChannelStateError {}

define_wire_enum! {
    error_type: ParseChannelStateError,
    /// Channel state as reported in `Channel.state` (`ast_state2str`).
    pub enum ChannelState {
        Down => "Down",
        Rsrved => "Rsrved",
        OffHook => "OffHook",
        Dialing => "Dialing",
        Ring => "Ring",
        Ringing => "Ringing",
        Up => "Up",
        Busy => "Busy",
        DialingOffhook => "Dialing Offhook",
        PreRing => "Pre-ring",
        Unknown => "Unknown",
    }
}

/// Caller identification (`CallerID` in the ARI data model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerId {
    name: String,
    number: String,
}

impl CallerId {
    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number.
    pub fn number(&self) -> &str {
        &self.number
    }
}

impl FromPayload for CallerId {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            name: f.required_str("name")?,
            number: f.required_str("number")?,
        })
    }
}

/// Dialplan location: context, extension and priority (`DialplanCEP`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialplanCep {
    context: String,
    exten: String,
    priority: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_data: Option<String>,
}

impl DialplanCep {
    /// Dialplan context.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Extension.
    pub fn exten(&self) -> &str {
        &self.exten
    }

    /// Priority within the extension.
    pub fn priority(&self) -> i64 {
        self.priority
    }

    /// Application currently executing, if reported.
    pub fn app_name(&self) -> Option<&str> {
        self.app_name
            .as_deref()
    }

    /// Arguments of the executing application, if reported.
    pub fn app_data(&self) -> Option<&str> {
        self.app_data
            .as_deref()
    }
}

impl FromPayload for DialplanCep {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            context: f.required_str("context")?,
            exten: f.required_str("exten")?,
            priority: f.required_i64("priority")?,
            app_name: f.optional_str("app_name")?,
            app_data: f.optional_str("app_data")?,
        })
    }
}

/// A channel snapshot.
///
/// Immutable: to observe a later state, project a fresh payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    id: String,
    name: String,
    state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    caller: Option<CallerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    connected: Option<CallerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accountcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dialplan: Option<DialplanCep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    creationtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channelvars: Option<BTreeMap<String, String>>,
}

impl Channel {
    /// Unique channel id (Asterisk uniqueid).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Channel name, e.g. `PJSIP/alice-00000001`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw state string as sent by Asterisk.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Parse [`Channel::state`] into a [`ChannelState`].
    pub fn channel_state(&self) -> Option<ChannelState> {
        self.state
            .parse()
            .ok()
    }

    /// Calling party.
    pub fn caller(&self) -> Option<&CallerId> {
        self.caller
            .as_ref()
    }

    /// Connected party.
    pub fn connected(&self) -> Option<&CallerId> {
        self.connected
            .as_ref()
    }

    /// Account code.
    pub fn accountcode(&self) -> Option<&str> {
        self.accountcode
            .as_deref()
    }

    /// Current dialplan location.
    pub fn dialplan(&self) -> Option<&DialplanCep> {
        self.dialplan
            .as_ref()
    }

    /// Creation timestamp (ISO-8601 as sent).
    pub fn creationtime(&self) -> Option<&str> {
        self.creationtime
            .as_deref()
    }

    /// Default language.
    pub fn language(&self) -> Option<&str> {
        self.language
            .as_deref()
    }

    /// Protocol-specific call id (e.g. the SIP Call-ID).
    pub fn protocol_id(&self) -> Option<&str> {
        self.protocol_id
            .as_deref()
    }

    /// Channel variables requested via `ari.conf` `channelvars`.
    pub fn channelvars(&self) -> Option<&BTreeMap<String, String>> {
        self.channelvars
            .as_ref()
    }

    /// Look up one channel variable.
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.channelvars
            .as_ref()?
            .get(name)
            .map(String::as_str)
    }
}

impl FromPayload for Channel {
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
        let f = PayloadFields::new(obj);
        Ok(Self {
            id: f.required_str("id")?,
            name: f.required_str("name")?,
            state: f.required_str("state")?,
            caller: f.optional("caller")?,
            connected: f.optional("connected")?,
            accountcode: f.optional_str("accountcode")?,
            dialplan: f.optional("dialplan")?,
            creationtime: f.optional_str("creationtime")?,
            language: f.optional_str("language")?,
            protocol_id: f.optional_str("protocol_id")?,
            channelvars: f.optional_string_map("channelvars")?,
        })
    }
}
