// Canonical shape of one exported chat message.
// Export tools disagree on key casing (`channel_id` vs `ChannelId`), so every
// record goes through `from_json` once, right after load, and nothing past this
// file ever looks at raw keys again.
use serde_json::{Map, Value};

/// Key spellings per logical field, preferred spelling first.
const AUTHOR_KEYS: [&str; 2] = ["author", "Author"];
const AUTHOR_ID_KEYS: [&str; 2] = ["id", "Id"];
const CHANNEL_ID_KEYS: [&str; 2] = ["channel_id", "ChannelId"];
const TIMESTAMP_KEYS: [&str; 2] = ["timestamp", "Timestamp"];
const CONTENT_KEYS: [&str; 2] = ["content", "Content"];

/// A single chat message after key-casing normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportMessage {
    /// Author identifier, `None` when the export carries no usable id.
    pub author_id: Option<String>,
    /// Channel identifier, `None` when absent. Messages without a channel
    /// never take part in pairing.
    pub channel_id: Option<String>,
    /// Chronologically sortable timestamp text (ISO-8601). Empty when absent.
    pub timestamp: String,
    /// Raw message body. Empty when absent.
    pub content: String,
}

impl ExportMessage {
    /// Build a message from one exported JSON object, resolving both key casings.
    ///
    /// For every field the lowercase spelling wins when it holds a usable value;
    /// `null`, empty strings and empty objects fall through to the alternate
    /// spelling. Numeric ids are rendered as decimal strings.
    pub fn from_json(obj: &Map<String, Value>) -> Self {
        let author_id = first_present(obj, &AUTHOR_KEYS)
            .and_then(Value::as_object)
            .and_then(|author| first_present(author, &AUTHOR_ID_KEYS))
            .and_then(scalar_text);

        let channel_id = first_present(obj, &CHANNEL_ID_KEYS).and_then(scalar_text);

        let timestamp = first_present(obj, &TIMESTAMP_KEYS)
            .and_then(scalar_text)
            .unwrap_or_default();

        let content = first_present(obj, &CONTENT_KEYS)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default();

        ExportMessage {
            author_id,
            channel_id,
            timestamp,
            content,
        }
    }

    /// True when this message was written by `author_id`.
    pub fn is_authored_by(&self, author_id: &str) -> bool {
        self.author_id.as_deref() == Some(author_id)
    }
}

/// Return the value under the first key in `keys` that holds something usable.
fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| is_present(v))
}

fn is_present(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Object(m) => !m.is_empty(),
        _ => true,
    }
}

/// Identifier and timestamp fields are strings in every known export, but some
/// tools emit snowflake ids as bare numbers.
fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
