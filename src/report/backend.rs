use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::model::status::{IssueTag, ItemKind, LaunchMode, LogLevel, Status};
use crate::report::error::ReportError;
use crate::track::footprint::{ItemId, LaunchId};

// ============================================================================
// Reporting backend seam — the one external collaborator the tracker drives
// ============================================================================

/// Launch-level attribute, a key/value pair shown on the launch page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartLaunchRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub attributes: Vec<Attribute>,
    pub mode: LaunchMode,
    pub start_time_ms: u128,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartItemRequest {
    pub name: String,
    pub kind: ItemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Stable fingerprint of the node's declared location, for
    /// server-side history matching across launches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<String>,
    pub start_time_ms: u128,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinishItemRequest {
    pub end_time_ms: u128,
    /// Unset for aggregating nodes: the server derives the status from
    /// the children
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<IssueTag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRequest {
    pub message: String,
    pub level: LogLevel,
    pub time_ms: u128,
}

/// The reporting server, as the tracker sees it: start/finish for launches
/// and items, plus log attachment. Calls are synchronous and may block;
/// any error is terminal for the run (the caller trips its circuit
/// breaker and stops reporting).
pub trait ReportingBackend {
    fn start_launch(&self, req: &StartLaunchRequest) -> Result<LaunchId, ReportError>;

    fn finish_launch(&self, id: &LaunchId, status: Option<Status>) -> Result<(), ReportError>;

    fn start_item(
        &self,
        parent: Option<&ItemId>,
        req: &StartItemRequest,
    ) -> Result<ItemId, ReportError>;

    fn finish_item(&self, id: &ItemId, req: &FinishItemRequest) -> Result<(), ReportError>;

    fn log(&self, item: &ItemId, req: &LogRequest) -> Result<(), ReportError>;
}

/// Shared handles report through the inner backend, so a caller can keep
/// a handle for inspection while the reporter owns another.
impl<T: ReportingBackend + ?Sized> ReportingBackend for std::sync::Arc<T> {
    fn start_launch(&self, req: &StartLaunchRequest) -> Result<LaunchId, ReportError> {
        (**self).start_launch(req)
    }

    fn finish_launch(&self, id: &LaunchId, status: Option<Status>) -> Result<(), ReportError> {
        (**self).finish_launch(id, status)
    }

    fn start_item(
        &self,
        parent: Option<&ItemId>,
        req: &StartItemRequest,
    ) -> Result<ItemId, ReportError> {
        (**self).start_item(parent, req)
    }

    fn finish_item(&self, id: &ItemId, req: &FinishItemRequest) -> Result<(), ReportError> {
        (**self).finish_item(id, req)
    }

    fn log(&self, item: &ItemId, req: &LogRequest) -> Result<(), ReportError> {
        (**self).log(item, req)
    }
}

// ============================================================================
// Null backend — reporting disabled
// ============================================================================

/// Backend used when reporting is turned off: accepts everything,
/// reports nothing. The orchestrator additionally short-circuits before
/// touching tracking state, so this mostly exists to make the disabled
/// mode explicit at construction time.
pub struct NullBackend;

impl ReportingBackend for NullBackend {
    fn start_launch(&self, _req: &StartLaunchRequest) -> Result<LaunchId, ReportError> {
        Ok(LaunchId::new("null"))
    }

    fn finish_launch(&self, _id: &LaunchId, _status: Option<Status>) -> Result<(), ReportError> {
        Ok(())
    }

    fn start_item(
        &self,
        _parent: Option<&ItemId>,
        _req: &StartItemRequest,
    ) -> Result<ItemId, ReportError> {
        Ok(ItemId::new("null"))
    }

    fn finish_item(&self, _id: &ItemId, _req: &FinishItemRequest) -> Result<(), ReportError> {
        Ok(())
    }

    fn log(&self, _item: &ItemId, _req: &LogRequest) -> Result<(), ReportError> {
        Ok(())
    }
}

// ============================================================================
// Recording backend — in-memory, for tests and dry runs
// ============================================================================

/// One backend call, as recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    StartLaunch {
        name: String,
    },
    FinishLaunch {
        id: LaunchId,
        status: Option<Status>,
    },
    StartItem {
        id: ItemId,
        parent: Option<ItemId>,
        name: String,
        kind: ItemKind,
    },
    FinishItem {
        id: ItemId,
        status: Option<Status>,
        issue: Option<IssueTag>,
    },
    Log {
        item: ItemId,
        level: LogLevel,
        message: String,
    },
}

/// In-memory backend that appends every call to a log and hands out
/// deterministic ids. The failure switch makes every call error until
/// cleared, which is how circuit-breaker behavior gets exercised.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<BackendCall>>,
    next_id: AtomicU64,
    failing: AtomicBool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of every call recorded so far.
    pub fn calls(&self) -> Vec<BackendCall> {
        match self.calls.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn call_count(&self) -> usize {
        match self.calls.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn record(&self, call: BackendCall) -> Result<(), ReportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ReportError::Unavailable("failure switch is on".to_string()));
        }
        match self.calls.lock() {
            Ok(mut guard) => guard.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
        Ok(())
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", prefix, n)
    }
}

impl ReportingBackend for RecordingBackend {
    fn start_launch(&self, req: &StartLaunchRequest) -> Result<LaunchId, ReportError> {
        self.record(BackendCall::StartLaunch {
            name: req.name.clone(),
        })?;
        Ok(LaunchId::new(self.fresh_id("launch")))
    }

    fn finish_launch(&self, id: &LaunchId, status: Option<Status>) -> Result<(), ReportError> {
        self.record(BackendCall::FinishLaunch {
            id: id.clone(),
            status,
        })
    }

    fn start_item(
        &self,
        parent: Option<&ItemId>,
        req: &StartItemRequest,
    ) -> Result<ItemId, ReportError> {
        let id = ItemId::new(self.fresh_id("item"));
        self.record(BackendCall::StartItem {
            id: id.clone(),
            parent: parent.cloned(),
            name: req.name.clone(),
            kind: req.kind,
        })?;
        Ok(id)
    }

    fn finish_item(&self, id: &ItemId, req: &FinishItemRequest) -> Result<(), ReportError> {
        self.record(BackendCall::FinishItem {
            id: id.clone(),
            status: req.status,
            issue: req.issue,
        })
    }

    fn log(&self, item: &ItemId, req: &LogRequest) -> Result<(), ReportError> {
        self.record(BackendCall::Log {
            item: item.clone(),
            level: req.level,
            message: req.message.clone(),
        })
    }
}
