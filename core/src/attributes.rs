//! Declarative, bidirectional field mapping between models and wire JSON.
//!
//! # Design
//! Each model type registers a static table of [`Attribute`] descriptors,
//! built once on first use. A descriptor names the field, its wire key and
//! whether it is read-only, and is bound to the struct field through a pair
//! of accessor functions. The [`Model`] trait then derives everything else:
//! `to_json`, `apply_json` (partial update), and `save_request_body`, which
//! skips read-only fields.
//!
//! Incoming values are coerced leniently, the way the API's older payloads
//! require: numbers arrive as strings, booleans as `"true"`, empty fields as
//! `null`. The coercion rules live in the free functions of this module so
//! they can be tested and reused on their own.
//!
//! ```rust
//! use std::sync::LazyLock;
//! use nylas_core::{ApiClient, Attribute, AttributeSet, Model};
//!
//! #[derive(Debug, Default)]
//! struct Folder {
//!     client: Option<ApiClient>,
//!     id: String,
//!     name: String,
//!     total_count: Option<f64>,
//! }
//!
//! impl Model for Folder {
//!     const OBJECT: &'static str = "folder";
//!
//!     fn new(client: Option<ApiClient>) -> Self {
//!         Folder { client, ..Default::default() }
//!     }
//!
//!     fn client(&self) -> Option<&ApiClient> {
//!         self.client.as_ref()
//!     }
//!
//!     fn attributes() -> &'static [Attribute<Self>] {
//!         static ATTRIBUTES: LazyLock<Vec<Attribute<Folder>>> = LazyLock::new(|| {
//!             AttributeSet::<Folder>::new()
//!                 .string("id", |f| &f.id, |f| &mut f.id)
//!                 .read_only()
//!                 .string("name", |f| &f.name, |f| &mut f.name)
//!                 .number("totalCount", |f| &f.total_count, |f| &mut f.total_count)
//!                 .build()
//!         });
//!         &ATTRIBUTES
//!     }
//! }
//! ```

use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::client::ApiClient;

/// Largest integer an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Discriminator key added to every serialized model.
pub const OBJECT_KEY: &str = "object";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    #[error("cannot read {model} from JSON {found}, expected an object")]
    NotAnObject {
        model: &'static str,
        found: &'static str,
    },
    #[error("attribute '{model_key}' holds a non-finite number")]
    NonFiniteNumber { model_key: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Number,
    NumberList,
    Boolean,
    String,
    StringList,
    Date,
    DateTime,
    Object,
    Collection,
    Json,
    Enum,
    EnumList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Full,
    RequestBody,
}

type Encoder<M> = Box<dyn Fn(&M, Mode) -> Result<Value, AttributeError> + Send + Sync>;
type Decoder<M> = Box<dyn Fn(&mut M, &Value, Option<&ApiClient>) + Send + Sync>;

/// Descriptor for one field of model `M`.
pub struct Attribute<M> {
    model_key: &'static str,
    json_key: &'static str,
    read_only: bool,
    kind: AttributeKind,
    encode: Encoder<M>,
    decode: Decoder<M>,
}

impl<M> Attribute<M> {
    pub fn model_key(&self) -> &'static str {
        self.model_key
    }

    pub fn json_key(&self) -> &'static str {
        self.json_key
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn to_json(&self, model: &M) -> Result<Value, AttributeError> {
        (self.encode)(model, Mode::Full)
    }

    /// Wire value for a write request; `None` for read-only fields.
    pub fn save_request_body(&self, model: &M) -> Result<Option<Value>, AttributeError> {
        if self.read_only {
            return Ok(None);
        }
        (self.encode)(model, Mode::RequestBody).map(Some)
    }

    pub fn from_json(&self, model: &mut M, raw: &Value, client: Option<&ApiClient>) {
        (self.decode)(model, raw, client)
    }
}

impl<M> fmt::Debug for Attribute<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("model_key", &self.model_key)
            .field("json_key", &self.json_key)
            .field("read_only", &self.read_only)
            .field("kind", &self.kind)
            .finish()
    }
}

/// String-valued enumeration usable with [`AttributeSet::enumeration`].
pub trait EnumValue: Sized + Copy + PartialEq + Send + Sync + 'static {
    fn values() -> &'static [Self];
    fn as_str(&self) -> &'static str;

    fn parse(raw: &str) -> Option<Self> {
        Self::values().iter().copied().find(|v| v.as_str() == raw)
    }
}

/// A type whose JSON shape is defined by its attribute table.
pub trait Model: Sized + Send + Sync + 'static {
    /// Type name written under the `object` key.
    const OBJECT: &'static str;

    /// A blank instance bound to `client`.
    fn new(client: Option<ApiClient>) -> Self;

    fn client(&self) -> Option<&ApiClient>;

    fn attributes() -> &'static [Attribute<Self>];

    fn from_json(client: Option<ApiClient>, json: &Value) -> Result<Self, AttributeError> {
        let mut model = Self::new(client);
        model.apply_json(json)?;
        Ok(model)
    }

    /// Overwrite the fields present in `json`; absent keys keep their value
    /// and unknown keys are ignored.
    fn apply_json(&mut self, json: &Value) -> Result<(), AttributeError> {
        let map = json.as_object().ok_or(AttributeError::NotAnObject {
            model: Self::OBJECT,
            found: json_type_name(json),
        })?;
        apply_map(self, map);
        Ok(())
    }

    fn to_json(&self) -> Result<Value, AttributeError> {
        let mut map = Map::new();
        for attribute in Self::attributes() {
            map.insert(attribute.json_key.to_string(), attribute.to_json(self)?);
        }
        map.insert(OBJECT_KEY.to_string(), Value::from(Self::OBJECT));
        Ok(Value::Object(map))
    }

    /// JSON for create/update payloads: read-only fields are dropped, at
    /// every nesting level.
    fn save_request_body(&self) -> Result<Value, AttributeError> {
        let mut map = Map::new();
        for attribute in Self::attributes() {
            if let Some(value) = attribute.save_request_body(self)? {
                map.insert(attribute.json_key.to_string(), value);
            }
        }
        Ok(Value::Object(map))
    }
}

fn apply_map<M: Model>(model: &mut M, map: &Map<String, Value>) {
    let client = model.client().cloned();
    for attribute in M::attributes() {
        if let Some(raw) = map.get(attribute.json_key) {
            attribute.from_json(model, raw, client.as_ref());
        }
    }
}

/// Builds an attribute table for model `M`.
///
/// `read_only` and `json_key` modify the attribute added just before them.
pub struct AttributeSet<M> {
    attributes: Vec<Attribute<M>>,
}

impl<M: 'static> Default for AttributeSet<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: 'static> AttributeSet<M> {
    pub fn new() -> Self {
        Self {
            attributes: Vec::new(),
        }
    }

    pub fn build(self) -> Vec<Attribute<M>> {
        self.attributes
    }

    pub fn read_only(mut self) -> Self {
        if let Some(last) = self.attributes.last_mut() {
            last.read_only = true;
        }
        self
    }

    pub fn json_key(mut self, json_key: &'static str) -> Self {
        if let Some(last) = self.attributes.last_mut() {
            last.json_key = json_key;
        }
        self
    }

    fn push(
        mut self,
        model_key: &'static str,
        kind: AttributeKind,
        encode: Encoder<M>,
        decode: Decoder<M>,
    ) -> Self {
        self.attributes.push(Attribute {
            model_key,
            json_key: model_key,
            read_only: false,
            kind,
            encode,
            decode,
        });
        self
    }

    pub fn number(
        self,
        model_key: &'static str,
        get: fn(&M) -> &Option<f64>,
        get_mut: fn(&mut M) -> &mut Option<f64>,
    ) -> Self {
        self.push(
            model_key,
            AttributeKind::Number,
            Box::new(move |m: &M, _: Mode| number_to_json(model_key, *get(m))),
            Box::new(move |m: &mut M, raw: &Value, _: Option<&ApiClient>| {
                *get_mut(m) = number_from_json(raw);
            }),
        )
    }

    /// Elements that are not numeric are dropped on the way in.
    pub fn number_list(
        self,
        model_key: &'static str,
        get: fn(&M) -> &Vec<f64>,
        get_mut: fn(&mut M) -> &mut Vec<f64>,
    ) -> Self {
        self.push(
            model_key,
            AttributeKind::NumberList,
            Box::new(move |m: &M, _: Mode| {
                get(m)
                    .iter()
                    .map(|n| number_to_json(model_key, Some(*n)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }),
            Box::new(move |m: &mut M, raw: &Value, _: Option<&ApiClient>| {
                *get_mut(m) = number_list_from_json(raw);
            }),
        )
    }

    pub fn boolean(
        self,
        model_key: &'static str,
        get: fn(&M) -> &bool,
        get_mut: fn(&mut M) -> &mut bool,
    ) -> Self {
        self.push(
            model_key,
            AttributeKind::Boolean,
            Box::new(move |m: &M, _: Mode| Ok(Value::Bool(*get(m)))),
            Box::new(move |m: &mut M, raw: &Value, _: Option<&ApiClient>| {
                *get_mut(m) = boolean_from_json(raw);
            }),
        )
    }

    pub fn string(
        self,
        model_key: &'static str,
        get: fn(&M) -> &String,
        get_mut: fn(&mut M) -> &mut String,
    ) -> Self {
        self.push(
            model_key,
            AttributeKind::String,
            Box::new(move |m: &M, _: Mode| Ok(Value::String(get(m).clone()))),
            Box::new(move |m: &mut M, raw: &Value, _: Option<&ApiClient>| {
                *get_mut(m) = string_from_json(raw);
            }),
        )
    }

    pub fn string_list(
        self,
        model_key: &'static str,
        get: fn(&M) -> &Vec<String>,
        get_mut: fn(&mut M) -> &mut Vec<String>,
    ) -> Self {
        self.push(
            model_key,
            AttributeKind::StringList,
            Box::new(move |m: &M, _: Mode| Ok(Value::from(get(m).clone()))),
            Box::new(move |m: &mut M, raw: &Value, _: Option<&ApiClient>| {
                *get_mut(m) = string_list_from_json(raw);
            }),
        )
    }

    /// ISO-8601 string on the wire.
    pub fn date(
        self,
        model_key: &'static str,
        get: fn(&M) -> &Option<DateTime<Utc>>,
        get_mut: fn(&mut M) -> &mut Option<DateTime<Utc>>,
    ) -> Self {
        self.push(
            model_key,
            AttributeKind::Date,
            Box::new(move |m: &M, _: Mode| Ok(date_to_json(*get(m)))),
            Box::new(move |m: &mut M, raw: &Value, _: Option<&ApiClient>| {
                *get_mut(m) = date_from_json(raw);
            }),
        )
    }

    /// Unix seconds on the wire.
    pub fn date_time(
        self,
        model_key: &'static str,
        get: fn(&M) -> &Option<DateTime<Utc>>,
        get_mut: fn(&mut M) -> &mut Option<DateTime<Utc>>,
    ) -> Self {
        self.push(
            model_key,
            AttributeKind::DateTime,
            Box::new(move |m: &M, _: Mode| Ok(date_time_to_json(*get(m)))),
            Box::new(move |m: &mut M, raw: &Value, _: Option<&ApiClient>| {
                *get_mut(m) = date_time_from_json(raw);
            }),
        )
    }

    /// Nested model, built with the owner's client.
    pub fn object<N: Model>(
        self,
        model_key: &'static str,
        get: fn(&M) -> &Option<N>,
        get_mut: fn(&mut M) -> &mut Option<N>,
    ) -> Self {
        self.push(
            model_key,
            AttributeKind::Object,
            Box::new(move |m: &M, mode: Mode| match get(m) {
                None => Ok(Value::Null),
                Some(nested) => encode_nested(nested, mode),
            }),
            Box::new(move |m: &mut M, raw: &Value, client: Option<&ApiClient>| {
                *get_mut(m) = raw.as_object().map(|map| nested_from_map(map, client));
            }),
        )
    }

    pub fn collection<N: Model>(
        self,
        model_key: &'static str,
        get: fn(&M) -> &Vec<N>,
        get_mut: fn(&mut M) -> &mut Vec<N>,
    ) -> Self {
        self.push(
            model_key,
            AttributeKind::Collection,
            Box::new(move |m: &M, mode: Mode| {
                get(m)
                    .iter()
                    .map(|nested| encode_nested(nested, mode))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }),
            Box::new(move |m: &mut M, raw: &Value, client: Option<&ApiClient>| {
                *get_mut(m) = match raw.as_array() {
                    Some(items) => items
                        .iter()
                        .map(|item| match item.as_object() {
                            Some(map) => nested_from_map(map, client),
                            None => N::new(client.cloned()),
                        })
                        .collect(),
                    None => Vec::new(),
                };
            }),
        )
    }

    /// Untyped value passed through as-is in both directions.
    pub fn json(
        self,
        model_key: &'static str,
        get: fn(&M) -> &Value,
        get_mut: fn(&mut M) -> &mut Value,
    ) -> Self {
        self.push(
            model_key,
            AttributeKind::Json,
            Box::new(move |m: &M, _: Mode| Ok(get(m).clone())),
            Box::new(move |m: &mut M, raw: &Value, _: Option<&ApiClient>| {
                *get_mut(m) = raw.clone();
            }),
        )
    }

    pub fn enumeration<E: EnumValue>(
        self,
        model_key: &'static str,
        get: fn(&M) -> &Option<E>,
        get_mut: fn(&mut M) -> &mut Option<E>,
    ) -> Self {
        self.push(
            model_key,
            AttributeKind::Enum,
            Box::new(move |m: &M, _: Mode| {
                Ok(get(m).map_or(Value::Null, |e| Value::from(e.as_str())))
            }),
            Box::new(move |m: &mut M, raw: &Value, _: Option<&ApiClient>| {
                *get_mut(m) = raw.as_str().and_then(E::parse);
            }),
        )
    }

    /// Unknown values are dropped on the way in.
    pub fn enum_list<E: EnumValue>(
        self,
        model_key: &'static str,
        get: fn(&M) -> &Vec<E>,
        get_mut: fn(&mut M) -> &mut Vec<E>,
    ) -> Self {
        self.push(
            model_key,
            AttributeKind::EnumList,
            Box::new(move |m: &M, _: Mode| {
                Ok(get(m).iter().map(|e| Value::from(e.as_str())).collect())
            }),
            Box::new(move |m: &mut M, raw: &Value, _: Option<&ApiClient>| {
                *get_mut(m) = enum_list_from_json(raw);
            }),
        )
    }
}

fn encode_nested<N: Model>(nested: &N, mode: Mode) -> Result<Value, AttributeError> {
    match mode {
        Mode::Full => nested.to_json(),
        Mode::RequestBody => nested.save_request_body(),
    }
}

fn nested_from_map<N: Model>(map: &Map<String, Value>, client: Option<&ApiClient>) -> N {
    let mut nested = N::new(client.cloned());
    apply_map(&mut nested, map);
    nested
}

/// JavaScript-style falsiness: `null`, `false`, `0`, `""`.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coerce a wire value to a number; `None` when it is not numeric.
pub fn number_from_json(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Some(0.0);
            }
            s.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Anything but an array yields an empty list.
pub fn number_list_from_json(raw: &Value) -> Vec<f64> {
    match raw {
        Value::Array(items) => items.iter().filter_map(number_from_json).collect(),
        _ => Vec::new(),
    }
}

pub fn number_to_json(
    model_key: &'static str,
    value: Option<f64>,
) -> Result<Value, AttributeError> {
    let Some(n) = value else {
        return Ok(Value::Null);
    };
    if !n.is_finite() {
        return Err(AttributeError::NonFiniteNumber { model_key });
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Ok(Value::from(n as i64));
    }
    Ok(serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number))
}

/// Only `true` and `"true"` are true.
pub fn boolean_from_json(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        _ => false,
    }
}

pub fn string_from_json(raw: &Value) -> String {
    if is_falsy(raw) {
        return String::new();
    }
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `null` elements are dropped; other non-strings keep their JSON text.
pub fn string_list_from_json(raw: &Value) -> Vec<String> {
    if is_falsy(raw) {
        return Vec::new();
    }
    match raw {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}

pub fn enum_list_from_json<E: EnumValue>(raw: &Value) -> Vec<E> {
    match raw {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().and_then(E::parse))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn date_to_json(value: Option<DateTime<Utc>>) -> Value {
    value.map_or(Value::Null, |d| {
        Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
    })
}

/// Accepts RFC 3339 timestamps, plain `YYYY-MM-DD` dates and epoch
/// milliseconds.
pub fn date_from_json(raw: &Value) -> Option<DateTime<Utc>> {
    if is_falsy(raw) {
        return None;
    }
    match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|d| d.and_utc())
            }),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

pub fn date_time_to_json(value: Option<DateTime<Utc>>) -> Value {
    let Some(d) = value else {
        return Value::Null;
    };
    let millis = d.timestamp_millis();
    if millis % 1000 == 0 {
        Value::from(millis / 1000)
    } else {
        serde_json::Number::from_f64(millis as f64 / 1000.0).map_or(Value::Null, Value::Number)
    }
}

pub fn date_time_from_json(raw: &Value) -> Option<DateTime<Utc>> {
    if is_falsy(raw) {
        return None;
    }
    let seconds = number_from_json(raw)?;
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::LazyLock;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Status {
        Confirmed,
        Cancelled,
    }

    impl EnumValue for Status {
        fn values() -> &'static [Self] {
            &[Status::Confirmed, Status::Cancelled]
        }

        fn as_str(&self) -> &'static str {
            match self {
                Status::Confirmed => "confirmed",
                Status::Cancelled => "cancelled",
            }
        }
    }

    #[derive(Debug, Default, Clone)]
    struct Participant {
        client: Option<ApiClient>,
        email: String,
        status: Option<Status>,
        comment: String,
    }

    impl Model for Participant {
        const OBJECT: &'static str = "participant";

        fn new(client: Option<ApiClient>) -> Self {
            Participant {
                client,
                ..Default::default()
            }
        }

        fn client(&self) -> Option<&ApiClient> {
            self.client.as_ref()
        }

        fn attributes() -> &'static [Attribute<Self>] {
            static ATTRIBUTES: LazyLock<Vec<Attribute<Participant>>> = LazyLock::new(|| {
                AttributeSet::<Participant>::new()
                    .string("email", |p| &p.email, |p| &mut p.email)
                    .enumeration("status", |p| &p.status, |p| &mut p.status)
                    .read_only()
                    .string("comment", |p| &p.comment, |p| &mut p.comment)
                    .build()
            });
            &ATTRIBUTES
        }
    }

    #[derive(Debug, Default)]
    struct Event {
        client: Option<ApiClient>,
        id: String,
        title: String,
        busy: bool,
        capacity: Option<f64>,
        reminders: Vec<f64>,
        tags: Vec<String>,
        states: Vec<Status>,
        created_at: Option<DateTime<Utc>>,
        starts_on: Option<DateTime<Utc>>,
        organizer: Option<Participant>,
        participants: Vec<Participant>,
        metadata: Value,
    }

    impl Model for Event {
        const OBJECT: &'static str = "event";

        fn new(client: Option<ApiClient>) -> Self {
            Event {
                client,
                ..Default::default()
            }
        }

        fn client(&self) -> Option<&ApiClient> {
            self.client.as_ref()
        }

        fn attributes() -> &'static [Attribute<Self>] {
            static ATTRIBUTES: LazyLock<Vec<Attribute<Event>>> = LazyLock::new(|| {
                AttributeSet::<Event>::new()
                    .string("id", |e| &e.id, |e| &mut e.id)
                    .read_only()
                    .string("title", |e| &e.title, |e| &mut e.title)
                    .boolean("busy", |e| &e.busy, |e| &mut e.busy)
                    .number("capacity", |e| &e.capacity, |e| &mut e.capacity)
                    .number_list("reminders", |e| &e.reminders, |e| &mut e.reminders)
                    .string_list("tags", |e| &e.tags, |e| &mut e.tags)
                    .enum_list("states", |e| &e.states, |e| &mut e.states)
                    .date_time("createdAt", |e| &e.created_at, |e| &mut e.created_at)
                    .read_only()
                    .date("startsOn", |e| &e.starts_on, |e| &mut e.starts_on)
                    .json_key("startDate")
                    .object("organizer", |e| &e.organizer, |e| &mut e.organizer)
                    .collection("participants", |e| &e.participants, |e| &mut e.participants)
                    .json("metadata", |e| &e.metadata, |e| &mut e.metadata)
                    .build()
            });
            &ATTRIBUTES
        }
    }

    fn sample_json() -> Value {
        json!({
            "id": "evt_1",
            "title": "Standup",
            "busy": "true",
            "capacity": "12",
            "reminders": [10, "15", null, "soon"],
            "tags": ["daily"],
            "states": ["confirmed", "tentative", "cancelled", 3],
            "createdAt": 1_700_000_000,
            "startDate": "2024-05-01T09:30:00.000Z",
            "organizer": {"email": "boss@example.com", "status": "confirmed"},
            "participants": [
                {"email": "a@example.com", "status": "cancelled", "comment": null},
                {"email": "b@example.com", "status": "maybe"}
            ],
            "metadata": {"team_key": "infra"},
            "unknownField": 42
        })
    }

    #[test]
    fn boolean_coercion() {
        assert!(boolean_from_json(&json!(true)));
        assert!(boolean_from_json(&json!("true")));
        assert!(!boolean_from_json(&json!(1)));
        assert!(!boolean_from_json(&json!("1")));
        assert!(!boolean_from_json(&Value::Null));
        assert!(!boolean_from_json(&json!(false)));
    }

    #[test]
    fn number_coercion() {
        assert_eq!(number_from_json(&json!("4")), Some(4.0));
        assert_eq!(number_from_json(&json!("lolz")), None);
        assert_eq!(number_from_json(&json!(0)), Some(0.0));
        assert_eq!(number_from_json(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(number_from_json(&json!("NaN")), None);
        assert_eq!(number_from_json(&json!([1])), None);
    }

    #[test]
    fn numbers_serialize_integral_values_as_integers() {
        assert_eq!(number_to_json("n", Some(4.0)).unwrap(), json!(4));
        assert_eq!(number_to_json("n", Some(4.5)).unwrap(), json!(4.5));
        assert_eq!(number_to_json("n", None).unwrap(), Value::Null);
        assert_eq!(
            number_to_json("n", Some(f64::INFINITY)),
            Err(AttributeError::NonFiniteNumber { model_key: "n" })
        );
    }

    #[test]
    fn number_round_trip() {
        for n in [0.0, -3.0, 4.25, 1e12, -0.001] {
            let wire = number_to_json("n", Some(n)).unwrap();
            assert_eq!(number_from_json(&wire), Some(n));
        }
    }

    #[test]
    fn string_coercion() {
        assert_eq!(string_from_json(&Value::Null), "");
        assert_eq!(string_from_json(&json!("")), "");
        assert_eq!(string_from_json(&json!("abc")), "abc");
        assert_eq!(string_from_json(&json!(7)), "7");
    }

    #[test]
    fn string_list_coercion() {
        assert!(string_list_from_json(&Value::Null).is_empty());
        assert_eq!(string_list_from_json(&json!(["a", "b"])), vec!["a", "b"]);
        assert_eq!(string_list_from_json(&json!(["a", null, "b"])), vec!["a", "b"]);
        assert_eq!(string_list_from_json(&json!("solo")), vec!["solo"]);
    }

    #[test]
    fn number_list_coercion() {
        assert!(number_list_from_json(&Value::Null).is_empty());
        assert!(number_list_from_json(&json!("5")).is_empty());
        assert_eq!(
            number_list_from_json(&json!([1, "2.5", null, "x", {"n": 3}])),
            vec![1.0, 2.5]
        );
    }

    #[test]
    fn enum_list_keeps_known_values() {
        let states: Vec<Status> = enum_list_from_json(&json!(["cancelled", "maybe", null]));
        assert_eq!(states, vec![Status::Cancelled]);
        assert!(enum_list_from_json::<Status>(&json!("confirmed")).is_empty());
    }

    #[test]
    fn list_attributes_serialize_as_arrays() {
        let event = Event::from_json(None, &sample_json()).unwrap();
        let json = event.to_json().unwrap();
        assert_eq!(json["reminders"], json!([10, 15]));
        assert_eq!(json["states"], json!(["confirmed", "cancelled"]));

        let mut event = event;
        event.reminders.push(f64::NAN);
        assert_eq!(
            event.to_json(),
            Err(AttributeError::NonFiniteNumber {
                model_key: "reminders"
            })
        );
    }

    #[test]
    fn date_round_trip() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let wire = date_to_json(Some(date));
        assert_eq!(wire, json!("2024-05-01T09:30:00.000Z"));
        assert_eq!(date_from_json(&wire), Some(date));
        assert_eq!(date_from_json(&Value::Null), None);
        assert_eq!(
            date_from_json(&json!("2024-05-01")),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn date_time_bridges_seconds_and_milliseconds() {
        let date = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        let wire = date_time_to_json(Some(date));
        assert_eq!(wire, json!(1_700_000_000));
        assert_eq!(date_time_from_json(&wire), Some(date));
        assert_eq!(date_time_from_json(&json!("1700000000")), Some(date));
        assert_eq!(date_time_to_json(None), Value::Null);
    }

    #[test]
    fn from_json_coerces_every_kind() {
        let event = Event::from_json(None, &sample_json()).unwrap();
        assert_eq!(event.id, "evt_1");
        assert!(event.busy);
        assert_eq!(event.capacity, Some(12.0));
        assert_eq!(event.reminders, vec![10.0, 15.0]);
        assert_eq!(event.tags, vec!["daily"]);
        assert_eq!(event.states, vec![Status::Confirmed, Status::Cancelled]);
        assert_eq!(event.created_at.map(|d| d.timestamp()), Some(1_700_000_000));
        assert_eq!(
            event.starts_on,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap())
        );
        let organizer = event.organizer.as_ref().unwrap();
        assert_eq!(organizer.email, "boss@example.com");
        assert_eq!(organizer.status, Some(Status::Confirmed));
        assert_eq!(event.participants.len(), 2);
        assert_eq!(event.participants[0].status, Some(Status::Cancelled));
        assert_eq!(event.participants[1].status, None);
        assert_eq!(event.metadata, json!({"team_key": "infra"}));
    }

    #[test]
    fn to_json_is_the_union_of_wire_keys_plus_object() {
        let event = Event::from_json(None, &sample_json()).unwrap();
        let json = event.to_json().unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "busy",
                "capacity",
                "createdAt",
                "id",
                "metadata",
                "object",
                "organizer",
                "participants",
                "reminders",
                "startDate",
                "states",
                "tags",
                "title"
            ]
        );
        assert_eq!(json["object"], "event");
        assert_eq!(json["organizer"]["object"], "participant");
        assert!(json.get("unknownField").is_none());
    }

    #[test]
    fn serialized_model_reads_back_identically() {
        let event = Event::from_json(None, &sample_json()).unwrap();
        let again = Event::from_json(None, &event.to_json().unwrap()).unwrap();
        assert_eq!(again.to_json().unwrap(), event.to_json().unwrap());
    }

    #[test]
    fn missing_keys_leave_fields_untouched() {
        let mut event = Event::from_json(None, &sample_json()).unwrap();
        event.apply_json(&json!({"title": "Retro"})).unwrap();
        assert_eq!(event.title, "Retro");
        assert_eq!(event.id, "evt_1");
        assert_eq!(event.capacity, Some(12.0));
    }

    #[test]
    fn save_request_body_drops_read_only_fields() {
        let event = Event::from_json(None, &sample_json()).unwrap();
        let body = event.save_request_body().unwrap();
        assert!(body.get("id").is_none());
        assert!(body.get("createdAt").is_none());
        assert!(body.get("object").is_none());
        assert_eq!(body["title"], "Standup");
        // nested read-only fields are dropped too
        assert!(body["organizer"].get("status").is_none());
        assert_eq!(body["participants"][0]["email"], "a@example.com");
    }

    #[test]
    fn collection_of_non_array_is_empty() {
        let mut event = Event::from_json(None, &sample_json()).unwrap();
        event.apply_json(&json!({"participants": "nope"})).unwrap();
        assert!(event.participants.is_empty());
    }

    #[test]
    fn apply_json_rejects_non_objects() {
        let err = Event::from_json(None, &json!([1, 2])).unwrap_err();
        assert_eq!(
            err,
            AttributeError::NotAnObject {
                model: "event",
                found: "array"
            }
        );
    }

    #[test]
    fn descriptors_expose_their_metadata() {
        let start = Event::attributes()
            .iter()
            .find(|a| a.model_key() == "startsOn")
            .unwrap();
        assert_eq!(start.json_key(), "startDate");
        assert_eq!(start.kind(), AttributeKind::Date);
        assert!(!start.read_only());

        let kinds: Vec<AttributeKind> = Event::attributes().iter().map(|a| a.kind()).collect();
        assert!(kinds.contains(&AttributeKind::NumberList));
        assert!(kinds.contains(&AttributeKind::EnumList));
    }
}
