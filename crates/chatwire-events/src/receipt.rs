//! Read receipt aggregation (`m.receipt`).

use chatwire_protocol::{EventId, EventView, PayloadValue, StructuredPayload, TypedEvent, UserId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::warn;

const READ_RECEIPT_KEY: &str = "m.read";

/// One user's read marker at an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTimestamp {
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
}

/// All read markers placed at one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptsForEvent {
    pub event_id: EventId,
    pub receipts: Vec<UserTimestamp>,
}

pub type EventsWithReceipts = Vec<ReceiptsForEvent>;

/// Aggregated read receipts, keyed by the event they point at.
///
/// Receipts are taken from `content` when the payload carries a `content`
/// object, otherwise from the top-level mapping itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptEvent {
    payload: StructuredPayload,
}

impl ReceiptEvent {
    /// Build a wire-shaped receipt event for receipts generated locally.
    ///
    /// Repeated event ids are merged; a repeated user under one event keeps
    /// the last timestamp given.
    pub fn new(events: &[ReceiptsForEvent]) -> Self {
        let mut grouped: IndexMap<&str, Map<String, Value>> = IndexMap::new();
        for entry in events {
            let readers = grouped.entry(entry.event_id.as_str()).or_default();
            for receipt in &entry.receipts {
                readers.insert(
                    receipt.user_id.to_string(),
                    json!({ "ts": receipt.timestamp.timestamp_millis() }),
                );
            }
        }

        let mut content = Map::with_capacity(grouped.len());
        for (event_id, readers) in grouped {
            let mut reads = Map::new();
            reads.insert(READ_RECEIPT_KEY.to_owned(), Value::Object(readers));
            content.insert(event_id.to_owned(), Value::Object(reads));
        }

        let mut payload = Map::new();
        payload.insert("type".to_owned(), Value::from(Self::TYPE_ID));
        payload.insert("content".to_owned(), Value::Object(content));
        Self {
            payload: StructuredPayload::from(payload),
        }
    }

    /// Receipts per event, in wire order. Users keep their first-seen
    /// position; a later duplicate overwrites the timestamp.
    pub fn events_with_receipts(&self) -> EventsWithReceipts {
        self.receipt_entries()
            .into_iter()
            .filter_map(|(event_id, readers)| {
                if event_id.is_empty() {
                    warn!("skipping receipt entry with an empty event id");
                    return None;
                }
                Some(ReceiptsForEvent {
                    event_id: EventId::from(event_id),
                    receipts: read_receipts(readers),
                })
            })
            .collect()
    }

    fn receipt_entries(&self) -> Vec<(&str, &Value)> {
        match self.payload.value("content").and_then(Value::as_object) {
            Some(content) => content
                .iter()
                .map(|(key, value)| (key.as_str(), value))
                .collect(),
            // Top-level envelope fields sit next to the receipts; only entries
            // carrying an `m.read` object are event ids.
            None => self
                .payload
                .iter()
                .filter(|(_, value)| {
                    value
                        .get(READ_RECEIPT_KEY)
                        .is_some_and(Value::is_object)
                })
                .collect(),
        }
    }
}

/// Missing or non-numeric `ts` reads as the epoch.
fn read_receipts(entry: &Value) -> Vec<UserTimestamp> {
    let Some(readers) = entry.get(READ_RECEIPT_KEY).and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut latest: IndexMap<&str, DateTime<Utc>> = IndexMap::with_capacity(readers.len());
    for (user_id, receipt) in readers {
        let timestamp = receipt
            .get("ts")
            .and_then(DateTime::<Utc>::from_value)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        latest.insert(user_id.as_str(), timestamp);
    }

    latest
        .into_iter()
        .map(|(user_id, timestamp)| UserTimestamp {
            user_id: UserId::from(user_id),
            timestamp,
        })
        .collect()
}

impl EventView for ReceiptEvent {
    fn event_type(&self) -> &str {
        Self::TYPE_ID
    }

    fn raw_payload(&self) -> &StructuredPayload {
        &self.payload
    }
}

impl TypedEvent for ReceiptEvent {
    const TYPE_ID: &'static str = "m.receipt";

    fn from_payload(payload: StructuredPayload) -> Self {
        Self { payload }
    }
}
