use std::sync::Arc;

use launch_reporter::model::event::{
    ExampleRef, FixturePhase, FixtureRef, FixtureScope, ScenarioRef, SuiteRef,
};
use launch_reporter::model::identity::{Location, SuiteIdentity};
use launch_reporter::model::status::{ItemKind, Status};
use launch_reporter::report::backend::{BackendCall, RecordingBackend};
use launch_reporter::report::reporter::{LaunchSettings, Reporter, ReportingPolicy};
use launch_reporter::track::footprint::ItemId;

// =========================================================================
// Descriptor builders
// =========================================================================

pub fn checkout_location() -> Location {
    Location::new("com.example.shop", "checkout_suite.rs")
}

pub fn checkout_identity() -> SuiteIdentity {
    SuiteIdentity::new(checkout_location())
}

pub fn checkout_suite() -> SuiteRef {
    SuiteRef {
        identity: checkout_identity(),
        name: "Checkout".to_string(),
        description: Some("Cart and payment flows".to_string()),
    }
}

pub fn scenario(name: &str, data_driven: bool, report_iterations: bool) -> ScenarioRef {
    ScenarioRef {
        suite: checkout_identity(),
        name: name.to_string(),
        description: None,
        data_driven,
        report_iterations,
    }
}

pub fn example(scenario_name: &str, iteration: usize) -> ExampleRef {
    ExampleRef {
        suite: checkout_identity(),
        scenario: scenario_name.to_string(),
        iteration,
        name: format!("{} [{}]", scenario_name, iteration),
    }
}

pub fn fixture(name: &str, scope: FixtureScope, phase: FixturePhase) -> FixtureRef {
    FixtureRef {
        suite: checkout_identity(),
        name: name.to_string(),
        scope,
        phase,
    }
}

// =========================================================================
// Reporter wiring
// =========================================================================

/// Reporter over a shared in-memory backend, with default policy.
pub fn recording_reporter() -> (Reporter, Arc<RecordingBackend>) {
    recording_reporter_with(ReportingPolicy::default())
}

pub fn recording_reporter_with(policy: ReportingPolicy) -> (Reporter, Arc<RecordingBackend>) {
    let backend = Arc::new(RecordingBackend::new());
    let reporter = Reporter::new(
        Box::new(Arc::clone(&backend)),
        policy,
        LaunchSettings::default(),
    );
    (reporter, backend)
}

// =========================================================================
// Call-log filters
// =========================================================================

pub fn started_items(calls: &[BackendCall]) -> Vec<(ItemId, Option<ItemId>, String, ItemKind)> {
    calls
        .iter()
        .filter_map(|c| match c {
            BackendCall::StartItem {
                id,
                parent,
                name,
                kind,
            } => Some((id.clone(), parent.clone(), name.clone(), *kind)),
            _ => None,
        })
        .collect()
}

pub fn finished_items(calls: &[BackendCall]) -> Vec<(ItemId, Option<Status>)> {
    calls
        .iter()
        .filter_map(|c| match c {
            BackendCall::FinishItem { id, status, .. } => Some((id.clone(), *status)),
            _ => None,
        })
        .collect()
}

pub fn logged_items(calls: &[BackendCall]) -> Vec<(ItemId, String)> {
    calls
        .iter()
        .filter_map(|c| match c {
            BackendCall::Log { item, message, .. } => Some((item.clone(), message.clone())),
            _ => None,
        })
        .collect()
}

/// The finish call for one item, panicking if it was never finished.
pub fn finish_of(calls: &[BackendCall], id: &ItemId) -> BackendCall {
    calls
        .iter()
        .find(|c| matches!(c, BackendCall::FinishItem { id: fid, .. } if fid == id))
        .cloned()
        .unwrap_or_else(|| panic!("item {} was never finished", id))
}
