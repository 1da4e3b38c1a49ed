//! JSON serialization of broadcast records for the durable log.

use serde::Serialize;

use super::types::Message;

/// Opening marker of a log file.
pub const LOG_OPEN: &str = "[\n";

/// Closing marker of a log file.
pub const LOG_CLOSE: &str = "\n]\n";

/// Separator written between two records.
pub const LOG_SEPARATOR: &str = ",\n";

#[derive(Serialize)]
struct LogRecord<'a> {
    seq: u64,
    kind: crate::message::MessageKind,
    author: Option<&'a str>,
    address: Option<&'a str>,
    timestamp: chrono::DateTime<chrono::Utc>,
    payload: &'a serde_json::Value,
}

/// Serialize a message to a single-line log record.
pub fn serialize_record(message: &Message) -> Result<String, serde_json::Error> {
    let origin = message.origin();
    serde_json::to_string(&LogRecord {
        seq: message.seq(),
        kind: message.kind(),
        author: origin.map(|o| o.name.as_str()),
        address: origin.map(|o| o.address.as_str()),
        timestamp: message.timestamp(),
        payload: message.payload(),
    })
}
