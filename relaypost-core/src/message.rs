//! Wire messages.
//!
//! One JSON object per websocket message, in both directions:
//!
//! ```text
//! register-host  {"app_id":3,"action":1}
//! host-poll      {"app_id":3,"action":2,"key":"..","data":{"p":{"indexes":[..],"broadcast":"..","answer":[{"idx":7,"answer":".."}]}}}
//! client-poll    {"app_id":3,"action":3,"path":"p","ask":"..","tickets":[7],"indexes":[..]}
//! ```
//!
//! Absent fields are omitted on output, never written as `null`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cursor::SeenRange;
use crate::error::RelayError;

/// Ticket id reported to clients for collected answers.
pub const ANSWER_MARKER: i64 = -1;

/// Action discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum Action {
    /// Issue (or fetch) the application key.
    RegisterHost = 1,
    /// Authorized host exchange: publish, answer, list pending asks.
    HostPoll = 2,
    /// Anonymous client exchange: ask, collect answers, read broadcasts.
    ClientPoll = 3,
}

impl Action {
    /// Parse an action code. Unknown codes have no fallback.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::RegisterHost),
            2 => Some(Self::HostPoll),
            3 => Some(Self::ClientPoll),
            _ => None,
        }
    }

    /// Wire code.
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// An inbound request.
///
/// Every field is optional at the decoding layer; which ones are required
/// depends on the action and is enforced by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Target application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<i64>,
    /// Action code, see [`Action`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<i64>,
    /// Host-poll: the application key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Host-poll: per-path instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HostPaths>,
    /// Client-poll: the channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Client-poll: question text for a new ticket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<String>,
    /// Client-poll: tickets to collect answers for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickets: Option<Vec<i64>>,
    /// Client-poll: broadcast serials already read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Vec<SeenRange>>,
}

/// Host-poll instructions for one path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPathData {
    /// Dialog serials the host has already seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Vec<SeenRange>>,
    /// Text to publish on the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast: Option<String>,
    /// Answers to pending tickets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Vec<AnswerEntry>>,
}

/// Host-poll instructions keyed by path, in the order they appear on the
/// wire.
///
/// Encoded as a JSON object. Members are processed in document order, and
/// a path repeated in the object is processed once per occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostPaths(Vec<(String, HostPathData)>);

impl HostPaths {
    /// Empty instruction set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append instructions for `path`.
    pub fn push(&mut self, path: impl Into<String>, data: HostPathData) {
        self.0.push((path.into(), data));
    }

    /// Instructions for `path`. The last occurrence wins if repeated.
    pub fn get(&self, path: &str) -> Option<&HostPathData> {
        self.0.iter().rev().find(|(p, _)| p == path).map(|(_, data)| data)
    }

    /// Paths in document order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(path, _)| path.as_str())
    }

    /// Number of members, repeats included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the object had no members.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, HostPathData)> for HostPaths {
    fn from_iter<I: IntoIterator<Item = (String, HostPathData)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for HostPaths {
    type Item = (String, HostPathData);
    type IntoIter = std::vec::IntoIter<(String, HostPathData)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Serialize for HostPaths {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (path, data) in &self.0 {
            map.serialize_entry(path, data)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HostPaths {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PathsVisitor;

        impl<'de> Visitor<'de> for PathsVisitor {
            type Value = HostPaths;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of per-path instructions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<HostPaths, A::Error> {
                let mut paths = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(member) = access.next_entry::<String, HostPathData>()? {
                    paths.push(member);
                }
                Ok(HostPaths(paths))
            }
        }

        deserializer.deserialize_map(PathsVisitor)
    }
}

/// A host's answer to one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    /// Ticket being answered.
    pub idx: i64,
    /// Answer text.
    pub answer: String,
}

/// One `{idx, text}` item in a reply list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Serial, or `ANSWER_MARKER` for a collected answer.
    pub idx: i64,
    /// Ask, answer or broadcast text.
    pub text: String,
}

impl Entry {
    /// Build an entry.
    pub fn new(idx: i64, text: impl Into<String>) -> Self {
        Self {
            idx,
            text: text.into(),
        }
    }
}

/// An outbound reply.
///
/// `Response::default()` is the empty envelope `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Echoed application id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<i64>,
    /// Echoed action code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<i64>,
    /// Register-host: the application key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Host-poll: pending asks keyed by path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<BTreeMap<String, Vec<Entry>>>,
    /// Client-poll: id of the ticket created by this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<i64>,
    /// Client-poll: ticket ids whose answers were collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered: Option<Vec<i64>>,
    /// Client-poll: collected answers followed by unseen broadcasts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Entry>>,
}

impl Request {
    /// Decode a request from JSON text.
    ///
    /// Anything that is not a JSON object of the expected shape is
    /// `MalformedRequest`.
    pub fn decode(raw: &str) -> Result<Self, RelayError> {
        // Derived struct decoding also accepts arrays; requests must be objects.
        // Decoding straight from the text keeps host-poll member order.
        if !raw.trim_start().starts_with('{') {
            return Err(RelayError::MalformedRequest("not a JSON object".into()));
        }
        Ok(serde_json::from_str(raw)?)
    }

    /// Encode to JSON text.
    pub fn encode(&self) -> String {
        // Serializing plain structs with string keys cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// The required `(app_id, action)` envelope.
    pub fn envelope(&self) -> Result<(i64, i64), RelayError> {
        let app_id = self.app_id.ok_or(RelayError::MissingField("app_id"))?;
        let action = self.action.ok_or(RelayError::MissingField("action"))?;
        Ok((app_id, action))
    }
}

impl Response {
    /// Reply echoing the request envelope.
    pub fn echo(app_id: i64, action: i64) -> Self {
        Self {
            app_id: Some(app_id),
            action: Some(action),
            ..Self::default()
        }
    }

    /// Decode a reply from JSON text.
    pub fn decode(raw: &str) -> Result<Self, RelayError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Encode to JSON text.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// True for the bare `{}` envelope.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_rejects_non_objects() {
        for raw in ["[3, 1]", "3", "\"x\"", "null", "{not json"] {
            assert!(
                matches!(Request::decode(raw), Err(RelayError::MalformedRequest(_))),
                "{raw} should be malformed"
            );
        }
        assert_eq!(Request::decode("{}").unwrap(), Request::default());
    }

    #[test]
    fn test_host_paths_keep_document_order_and_repeats() {
        let raw = r#"{"app_id":3,"action":2,"key":"k","data":{
            "zeta":{"broadcast":"z"},
            "alpha":{"broadcast":"a1"},
            "alpha":{"broadcast":"a2"}}}"#;
        let data = Request::decode(raw).unwrap().data.unwrap();
        assert_eq!(data.paths().collect::<Vec<_>>(), vec!["zeta", "alpha", "alpha"]);
        assert_eq!(data.get("alpha").unwrap().broadcast.as_deref(), Some("a2"));

        let encoded = serde_json::to_string(&data).unwrap();
        assert!(encoded.find("zeta").unwrap() < encoded.find("alpha").unwrap());
    }

    #[test]
    fn test_host_paths_reject_non_object() {
        let raw = r#"{"app_id":3,"action":2,"data":[1,2]}"#;
        assert!(matches!(Request::decode(raw), Err(RelayError::MalformedRequest(_))));
    }

    #[test]
    fn test_action_codes() {
        assert_eq!(Action::from_code(1), Some(Action::RegisterHost));
        assert_eq!(Action::from_code(2), Some(Action::HostPoll));
        assert_eq!(Action::from_code(3), Some(Action::ClientPoll));
        assert_eq!(Action::from_code(0), None);
        assert_eq!(Action::from_code(4), None);
        assert_eq!(Action::ClientPoll.code(), 3);
    }

    #[test]
    fn test_decode_host_poll() {
        let raw = json!({
            "app_id": 3,
            "action": 2,
            "key": "k",
            "data": {
                "p": {
                    "indexes": [{"offset": 1, "length": 2}],
                    "broadcast": "hello",
                    "answer": [{"idx": 4, "answer": "yes"}]
                }
            }
        })
        .to_string();
        let req = Request::decode(&raw).unwrap();
        assert_eq!(req.envelope().unwrap(), (3, 2));
        let data = req.data.unwrap();
        let p = data.get("p").unwrap();
        assert_eq!(p.indexes.as_deref(), Some(&[SeenRange::new(1, 2)][..]));
        assert_eq!(p.broadcast.as_deref(), Some("hello"));
        assert_eq!(p.answer.as_ref().unwrap()[0].idx, 4);
    }

    #[test]
    fn test_decode_rejects_wrong_types() {
        let err = Request::decode(r#"{"app_id":"three","action":1}"#).unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn test_missing_envelope_fields() {
        let req = Request::decode(r#"{"action":1}"#).unwrap();
        assert_eq!(req.envelope(), Err(RelayError::MissingField("app_id")));
        let req = Request::decode(r#"{"app_id":1}"#).unwrap();
        assert_eq!(req.envelope(), Err(RelayError::MissingField("action")));
    }

    #[test]
    fn test_empty_response_encodes_as_empty_object() {
        assert_eq!(Response::default().encode(), "{}");
        assert!(Response::default().is_empty());
    }

    #[test]
    fn test_response_omits_absent_fields() {
        let mut reply = Response::echo(3, 3);
        reply.answered = Some(vec![]);
        let value: serde_json::Value = serde_json::from_str(&reply.encode()).unwrap();
        assert_eq!(value, json!({"app_id": 3, "action": 3, "answered": []}));
    }
}
