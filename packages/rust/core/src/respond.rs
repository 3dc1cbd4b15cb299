//! Response assembly: selection results → the platform's wire format.
//!
//! Each delivered event becomes an object holding its payload fields plus
//! `created_at` and a `meta` block whose `id` is the platform dedup key.

use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::{Map, Value, json};

use wikitrigger_shared::{CandidateEvent, CursorDelivery, TriggerKind, WikiTriggerError};

use crate::select::SelectionResult;

/// Body returned to the platform for a successful evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerResponse {
    pub data: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Maps a selection onto an outbound response.
pub trait Responder: Send + Sync {
    fn assemble(
        &self,
        kind: TriggerKind,
        selection: &SelectionResult,
        next_cursor: String,
    ) -> TriggerResponse;
}

/// The automation platform's `{data, cursor}` shape.
#[derive(Debug, Clone, Default)]
pub struct PlatformResponder {
    delivery: CursorDelivery,
}

impl PlatformResponder {
    pub fn new(delivery: CursorDelivery) -> Self {
        Self { delivery }
    }
}

impl Responder for PlatformResponder {
    fn assemble(
        &self,
        _kind: TriggerKind,
        selection: &SelectionResult,
        next_cursor: String,
    ) -> TriggerResponse {
        let cursor = match self.delivery {
            CursorDelivery::Token => Some(next_cursor),
            CursorDelivery::Implicit => None,
        };
        TriggerResponse {
            data: selection.events.iter().map(event_object).collect(),
            cursor,
        }
    }
}

/// Wire object for one event.
pub fn event_object(event: &CandidateEvent) -> Value {
    let mut obj: Map<String, Value> = event
        .fields()
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    let at = event.occurred_at();
    obj.insert(
        "created_at".to_string(),
        Value::String(at.to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    obj.insert(
        "meta".to_string(),
        json!({ "id": event.id(), "timestamp": at.timestamp() }),
    );
    Value::Object(obj)
}

/// Error body for a request-level failure. Never carries `data`.
pub fn error_body(err: &WikiTriggerError) -> Value {
    json!({ "errors": [ { "message": err.to_string() } ] })
}
