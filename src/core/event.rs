// src/core/event.rs

//! The two-field wire envelope that tags every inbound and outbound payload.

use crate::core::ConnectorError;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

/// An event as it travels over the wire: `{"type": <integer>, "data": <raw JSON>}`.
///
/// `data` is kept as an unparsed sub-document so the handler decides how to
/// interpret it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type", default)]
    pub event_type: i64,
    /// `None` only when the field is absent; an explicit `null` is kept raw.
    #[serde(
        default,
        deserialize_with = "present_raw",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Box<RawValue>>,
}

/// Captures any present value, `null` included, as a raw sub-document.
fn present_raw<'de, D>(deserializer: D) -> Result<Option<Box<RawValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Box::<RawValue>::deserialize(deserializer).map(Some)
}

impl Event {
    pub fn new(event_type: i64, data: Box<RawValue>) -> Self {
        Self {
            event_type,
            data: Some(data),
        }
    }

    /// Serializes `data` into a raw sub-document and wraps it in an envelope.
    pub fn encode<T: Serialize + ?Sized>(
        event_type: i64,
        data: &T,
    ) -> Result<Self, ConnectorError> {
        let raw = serde_json::value::to_raw_value(data)?;
        Ok(Self::new(event_type, raw))
    }

    /// Parses a raw inbound frame as an envelope.
    pub fn decode(frame: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(frame)
    }

    /// The raw bytes of the `data` sub-document, e.g. `null` for an explicit
    /// null. Empty when the field was absent.
    pub fn data_bytes(&self) -> Bytes {
        self.data
            .as_ref()
            .map(|raw| Bytes::copy_from_slice(raw.get().as_bytes()))
            .unwrap_or_default()
    }
}
