use serde::Serialize;

use crate::model::status::now_ms;
use crate::track::footprint::ItemId;

/// One diagnostic record: what the orchestrator decided about one event
/// and why. Written as JSONL so captures can be grepped after a run.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub thread: String,

    /// What happened: "item_started", "event_dropped", "circuit_open", ...
    pub decision: String,

    pub node: Option<String>,
    pub item_id: Option<String>,
    pub detail: Option<String>,
}

impl TraceEvent {
    pub fn now(thread: &str, decision: &str) -> Self {
        Self {
            timestamp_ms: now_ms(),
            thread: thread.to_string(),
            decision: decision.to_string(),
            node: None,
            item_id: None,
            detail: None,
        }
    }

    pub fn with_node(mut self, node: impl ToString) -> Self {
        self.node = Some(node.to_string());
        self
    }

    pub fn with_item(mut self, item: &ItemId) -> Self {
        self.item_id = Some(item.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}
