//! Inbound message decoding and typed field access for projection

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::trace;

use crate::constants::FIELD_TYPE;
use crate::error::{AriError, AriResult, JsonShape, MalformedPayloadError};
use crate::event::AriEventType;

/// A message as handed over by the transport: raw text or an already decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMessage {
    /// JSON text, e.g. a WebSocket text frame.
    Text(String),
    /// A decoded JSON value.
    Value(Value),
}

impl RawMessage {
    /// Decode into a JSON value, parsing text if needed.
    pub fn into_value(self) -> AriResult<Value> {
        match self {
            RawMessage::Text(text) => {
                trace!("[DECODE] Parsing {} bytes of JSON text", text.len());
                Ok(serde_json::from_str(&text)?)
            }
            RawMessage::Value(value) => Ok(value),
        }
    }

    /// Decode and require a JSON object at the root.
    pub fn into_object(self) -> AriResult<Map<String, Value>> {
        match self.into_value()? {
            Value::Object(obj) => Ok(obj),
            other => Err(AriError::UnexpectedRoot {
                expected: JsonShape::Object,
                actual: JsonShape::of(&other),
            }),
        }
    }
}

impl From<String> for RawMessage {
    fn from(text: String) -> Self {
        RawMessage::Text(text)
    }
}

impl From<&str> for RawMessage {
    fn from(text: &str) -> Self {
        RawMessage::Text(text.to_string())
    }
}

impl From<Value> for RawMessage {
    fn from(value: Value) -> Self {
        RawMessage::Value(value)
    }
}

impl From<Map<String, Value>> for RawMessage {
    fn from(obj: Map<String, Value>) -> Self {
        RawMessage::Value(Value::Object(obj))
    }
}

/// A decoded ARI message with its `type` discriminant extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct AriMessage {
    message_type: String,
    body: Map<String, Value>,
}

impl AriMessage {
    /// Decode a raw message and read its discriminant.
    ///
    /// Fails with [`AriError::MalformedPayload`] naming `type` when the field
    /// is absent or not a string.
    pub fn parse(raw: impl Into<RawMessage>) -> AriResult<Self> {
        Self::from_object(
            raw.into()
                .into_object()?,
        )
    }

    /// Wrap an already decoded object.
    pub fn from_object(body: Map<String, Value>) -> AriResult<Self> {
        let message_type = PayloadFields::new(&body).required_str(FIELD_TYPE)?;
        Ok(Self { message_type, body })
    }

    /// The `type` discriminant as sent by Asterisk.
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Discriminant mapped through the fixed event table, if known.
    pub fn event_type(&self) -> Option<AriEventType> {
        self.message_type
            .parse()
            .ok()
    }

    /// The full decoded object, `type` included.
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Consume the message, returning the decoded object.
    pub fn into_body(self) -> Map<String, Value> {
        self.body
    }
}

/// A typed entity that can be projected from a JSON object.
///
/// Implementations read their declared fields through [`PayloadFields`] so
/// that missing and mis-shaped fields are reported uniformly.
pub trait FromPayload: Sized {
    /// Project `obj` into `Self`.
    fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError>;
}

/// Project a single resource payload (e.g. a `GET /channels/{id}` response).
///
/// ```
/// use asterisk_ari_events::{project_response, Channel};
///
/// let channel: Channel = project_response(
///     r#"{"id":"1","name":"PJSIP/alice-00000001","state":"Ring"}"#,
/// ).unwrap();
/// assert_eq!(channel.id(), "1");
/// assert!(channel.caller().is_none());
/// ```
pub fn project_response<T: FromPayload>(raw: impl Into<RawMessage>) -> AriResult<T> {
    let obj = raw
        .into()
        .into_object()?;
    Ok(T::from_payload(&obj)?)
}

/// Project a list payload (e.g. a `GET /bridges` response).
///
/// The field path of a failure starts with the element index: `[1].id`.
pub fn project_list<T: FromPayload>(raw: impl Into<RawMessage>) -> AriResult<Vec<T>> {
    let items = match raw
        .into()
        .into_value()?
    {
        Value::Array(items) => items,
        other => {
            return Err(AriError::UnexpectedRoot {
                expected: JsonShape::Array,
                actual: JsonShape::of(&other),
            })
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items
        .iter()
        .enumerate()
    {
        let obj = item
            .as_object()
            .ok_or_else(|| {
                MalformedPayloadError::wrong_shape(
                    format!("[{}]", index),
                    JsonShape::Object,
                    JsonShape::of(item),
                )
            })?;
        out.push(T::from_payload(obj).map_err(|e| e.within_index(index))?);
    }
    Ok(out)
}

/// Typed, shape-checked access to the fields of one JSON object.
///
/// JSON `null` is treated the same as an absent field: optional accessors
/// return `None`, required accessors fail with [`MalformedKind::Missing`].
///
/// [`MalformedKind::Missing`]: crate::error::MalformedKind::Missing
#[derive(Debug, Clone, Copy)]
pub struct PayloadFields<'a> {
    obj: &'a Map<String, Value>,
}

impl<'a> PayloadFields<'a> {
    /// Wrap an object.
    pub fn new(obj: &'a Map<String, Value>) -> Self {
        Self { obj }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        match self
            .obj
            .get(name)
        {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    fn require(&self, name: &str) -> Result<&'a Value, MalformedPayloadError> {
        self.get(name)
            .ok_or_else(|| MalformedPayloadError::missing(name))
    }

    /// Required string field.
    pub fn required_str(&self, name: &str) -> Result<String, MalformedPayloadError> {
        as_string(name, self.require(name)?)
    }

    /// Optional string field.
    pub fn optional_str(&self, name: &str) -> Result<Option<String>, MalformedPayloadError> {
        self.get(name)
            .map(|v| as_string(name, v))
            .transpose()
    }

    /// Required integer field.
    pub fn required_i64(&self, name: &str) -> Result<i64, MalformedPayloadError> {
        as_i64(name, self.require(name)?)
    }

    /// Optional integer field.
    pub fn optional_i64(&self, name: &str) -> Result<Option<i64>, MalformedPayloadError> {
        self.get(name)
            .map(|v| as_i64(name, v))
            .transpose()
    }

    /// Optional boolean field.
    pub fn optional_bool(&self, name: &str) -> Result<Option<bool>, MalformedPayloadError> {
        self.get(name)
            .map(|v| {
                v.as_bool()
                    .ok_or_else(|| {
                        MalformedPayloadError::wrong_shape(name, JsonShape::Bool, JsonShape::of(v))
                    })
            })
            .transpose()
    }

    /// Required array-of-strings field.
    pub fn required_string_list(&self, name: &str) -> Result<Vec<String>, MalformedPayloadError> {
        as_string_list(name, self.require(name)?)
    }

    /// Required nested entity, projected recursively.
    pub fn required<T: FromPayload>(&self, name: &str) -> Result<T, MalformedPayloadError> {
        nested(name, self.require(name)?)
    }

    /// Optional nested entity, projected recursively when present.
    pub fn optional<T: FromPayload>(&self, name: &str) -> Result<Option<T>, MalformedPayloadError> {
        self.get(name)
            .map(|v| nested(name, v))
            .transpose()
    }

    /// Optional object whose values are all strings (e.g. `channelvars`).
    pub fn optional_string_map(
        &self,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, MalformedPayloadError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        let obj = value
            .as_object()
            .ok_or_else(|| {
                MalformedPayloadError::wrong_shape(name, JsonShape::Object, JsonShape::of(value))
            })?;
        let mut map = BTreeMap::new();
        for (key, v) in obj {
            let s = as_string(key, v).map_err(|e| e.within(name))?;
            map.insert(key.clone(), s);
        }
        Ok(Some(map))
    }

    /// Optional array of nested entities, each projected recursively.
    pub fn optional_list<T: FromPayload>(
        &self,
        name: &str,
    ) -> Result<Option<Vec<T>>, MalformedPayloadError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        let items = value
            .as_array()
            .ok_or_else(|| {
                MalformedPayloadError::wrong_shape(name, JsonShape::Array, JsonShape::of(value))
            })?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let obj = item
                    .as_object()
                    .ok_or_else(|| {
                        MalformedPayloadError::wrong_shape(
                            format!("{}[{}]", name, i),
                            JsonShape::Object,
                            JsonShape::of(item),
                        )
                    })?;
                T::from_payload(obj).map_err(|e| {
                    e.within_index(i)
                        .within(name)
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

fn as_string(name: &str, value: &Value) -> Result<String, MalformedPayloadError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| MalformedPayloadError::wrong_shape(name, JsonShape::String, JsonShape::of(value)))
}

fn as_i64(name: &str, value: &Value) -> Result<i64, MalformedPayloadError> {
    value
        .as_i64()
        .ok_or_else(|| MalformedPayloadError::wrong_shape(name, JsonShape::Integer, JsonShape::of(value)))
}

fn as_string_list(name: &str, value: &Value) -> Result<Vec<String>, MalformedPayloadError> {
    let items = value
        .as_array()
        .ok_or_else(|| {
            MalformedPayloadError::wrong_shape(name, JsonShape::StringArray, JsonShape::of(value))
        })?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| as_string(&format!("{}[{}]", name, i), item))
        .collect()
}

fn nested<T: FromPayload>(name: &str, value: &Value) -> Result<T, MalformedPayloadError> {
    let obj = value
        .as_object()
        .ok_or_else(|| MalformedPayloadError::wrong_shape(name, JsonShape::Object, JsonShape::of(value)))?;
    T::from_payload(obj).map_err(|e| e.within(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MalformedKind;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(o) => o,
            _ => panic!("test payload must be an object"),
        }
    }

    #[derive(Debug, PartialEq)]
    struct Pair {
        a: String,
        b: Option<i64>,
    }

    impl FromPayload for Pair {
        fn from_payload(obj: &Map<String, Value>) -> Result<Self, MalformedPayloadError> {
            let f = PayloadFields::new(obj);
            Ok(Self {
                a: f.required_str("a")?,
                b: f.optional_i64("b")?,
            })
        }
    }

    #[test]
    fn message_type_from_text() {
        let msg = AriMessage::parse(r#"{"type":"StasisEnd","channel":{}}"#).unwrap();
        assert_eq!(msg.message_type(), "StasisEnd");
        assert_eq!(msg.event_type(), Some(AriEventType::StasisEnd));
        assert!(msg
            .body()
            .contains_key("channel"));
    }

    #[test]
    fn message_type_unknown_discriminant() {
        let msg = AriMessage::parse(json!({"type": "ChannelTalkingStarted"})).unwrap();
        assert_eq!(msg.message_type(), "ChannelTalkingStarted");
        assert_eq!(msg.event_type(), None);
    }

    #[test]
    fn message_without_type_is_malformed() {
        let err = AriMessage::parse(json!({"channel": {}})).unwrap_err();
        let malformed = err
            .as_malformed()
            .expect("should be malformed payload");
        assert_eq!(malformed.field(), "type");
        assert_eq!(malformed.kind(), &MalformedKind::Missing);
    }

    #[test]
    fn message_with_numeric_type_is_malformed() {
        let err = AriMessage::parse(json!({"type": 7})).unwrap_err();
        let malformed = err
            .as_malformed()
            .unwrap();
        assert_eq!(
            malformed.kind(),
            &MalformedKind::WrongShape {
                expected: JsonShape::String,
                actual: JsonShape::Integer
            }
        );
    }

    #[test]
    fn invalid_json_text() {
        let err = AriMessage::parse("{not json").unwrap_err();
        assert!(matches!(err, AriError::Json(_)));
    }

    #[test]
    fn non_object_root() {
        let err = AriMessage::parse("[1,2]").unwrap_err();
        assert!(matches!(
            err,
            AriError::UnexpectedRoot {
                expected: JsonShape::Object,
                actual: JsonShape::Array
            }
        ));
    }

    #[test]
    fn null_counts_as_absent() {
        let o = obj(json!({"a": "x", "b": null}));
        let pair = Pair::from_payload(&o).unwrap();
        assert_eq!(
            pair,
            Pair {
                a: "x".into(),
                b: None
            }
        );

        let o = obj(json!({"a": null}));
        let err = Pair::from_payload(&o).unwrap_err();
        assert_eq!(err.field(), "a");
        assert_eq!(err.kind(), &MalformedKind::Missing);
    }

    #[test]
    fn string_list_reports_bad_element() {
        let o = obj(json!({"ids": ["a", 2, "c"]}));
        let err = PayloadFields::new(&o)
            .required_string_list("ids")
            .unwrap_err();
        assert_eq!(err.field(), "ids[1]");
    }

    #[test]
    fn string_map_rejects_non_string_values() {
        let o = obj(json!({"vars": {"X": "1", "Y": 2}}));
        let err = PayloadFields::new(&o)
            .optional_string_map("vars")
            .unwrap_err();
        assert_eq!(err.field(), "vars.Y");
    }

    #[test]
    fn nested_errors_carry_parent_path() {
        let o = obj(json!({"inner": {"b": 1}}));
        let err = PayloadFields::new(&o)
            .required::<Pair>("inner")
            .unwrap_err();
        assert_eq!(err.field(), "inner.a");

        let o = obj(json!({"inner": "nope"}));
        let err = PayloadFields::new(&o)
            .optional::<Pair>("inner")
            .unwrap_err();
        assert_eq!(
            err,
            MalformedPayloadError::wrong_shape("inner", JsonShape::Object, JsonShape::String)
        );
    }

    #[test]
    fn nested_list_projects_each_element() {
        let o = obj(json!({"pairs": [{"a": "x"}, {"a": "y", "b": 2}], "none": null}));
        let f = PayloadFields::new(&o);
        let pairs = f
            .optional_list::<Pair>("pairs")
            .unwrap()
            .unwrap();
        assert_eq!(pairs[1], Pair { a: "y".into(), b: Some(2) });
        assert!(f
            .optional_list::<Pair>("none")
            .unwrap()
            .is_none());

        let o = obj(json!({"pairs": [{"a": "x"}, {"b": 2}]}));
        let err = PayloadFields::new(&o)
            .optional_list::<Pair>("pairs")
            .unwrap_err();
        assert_eq!(err.field(), "pairs[1].a");

        let o = obj(json!({"pairs": [{"a": "x"}, 7]}));
        let err = PayloadFields::new(&o)
            .optional_list::<Pair>("pairs")
            .unwrap_err();
        assert_eq!(err.field(), "pairs[1]");
    }

    #[test]
    fn list_projection_indexes_failures() {
        let pairs: Vec<Pair> = project_list(r#"[{"a":"x"},{"a":"y","b":3}]"#).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].b, Some(3));

        let err = project_list::<Pair>(r#"[{"a":"x"},{"b":3}]"#).unwrap_err();
        assert_eq!(
            err.as_malformed()
                .unwrap()
                .field(),
            "[1].a"
        );

        let err = project_list::<Pair>(r#"[{"a":"x"}, 4]"#).unwrap_err();
        assert_eq!(
            err.as_malformed()
                .unwrap()
                .field(),
            "[1]"
        );

        let err = project_list::<Pair>(r#"{"a":"x"}"#).unwrap_err();
        assert!(matches!(
            err,
            AriError::UnexpectedRoot {
                expected: JsonShape::Array,
                ..
            }
        ));
    }
}
