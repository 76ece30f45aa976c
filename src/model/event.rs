use serde::{Deserialize, Serialize};

use crate::model::identity::SuiteIdentity;
use crate::model::status::ItemKind;

// ============================================================================
// Lifecycle event model — the callback surface of the test engine
// ============================================================================

/// Descriptor of a suite as delivered by the engine's enter/skip callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteRef {
    pub identity: SuiteIdentity,

    /// Display name of the suite
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Descriptor of a scenario (one declared test method).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRef {
    /// Identity of the suite this scenario runs under
    pub suite: SuiteIdentity,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the scenario is driven by a data table
    #[serde(default)]
    pub data_driven: bool,

    /// Whether individual data rows are reported as separate items
    #[serde(default = "default_true")]
    pub report_iterations: bool,
}

impl ScenarioRef {
    /// A scenario is masked when its examples are not reported
    /// individually: a single synthetic example stands in for all of them.
    pub fn is_masked(&self) -> bool {
        !self.data_driven || !self.report_iterations
    }
}

/// Descriptor of one concrete run of a data-driven scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleRef {
    pub suite: SuiteIdentity,

    /// Name of the owning scenario
    pub scenario: String,

    /// Zero-based data-row index
    pub iteration: usize,

    /// Display name of this run (usually the unrolled scenario name)
    pub name: String,
}

/// Which node a fixture is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureScope {
    /// Runs once per suite (setup/teardown-once)
    Suite,
    /// Runs around every example (setup/teardown-each)
    Example,
}

/// Whether a fixture runs before or after the node it wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixturePhase {
    Setup,
    Teardown,
}

/// Descriptor of a setup/teardown method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRef {
    pub suite: SuiteIdentity,
    pub name: String,
    pub scope: FixtureScope,
    pub phase: FixturePhase,
}

impl FixtureRef {
    /// Item kind reported to the server for this fixture.
    pub fn item_kind(&self) -> ItemKind {
        match (self.scope, self.phase) {
            (FixtureScope::Suite, FixturePhase::Setup) => ItemKind::BeforeSuite,
            (FixtureScope::Suite, FixturePhase::Teardown) => ItemKind::AfterSuite,
            (FixtureScope::Example, FixturePhase::Setup) => ItemKind::BeforeEach,
            (FixtureScope::Example, FixturePhase::Teardown) => ItemKind::AfterEach,
        }
    }
}

/// Where a failure originated, used to route the error to exactly one
/// tracked node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorSource {
    /// Suite-level initializer blew up
    SuiteInitializer { suite: SuiteIdentity },

    /// Scenario-level data computation or initializer blew up
    ScenarioData { scenario: ScenarioRef },

    /// The example body itself raised; attributed via the thread's
    /// current pointer
    ExampleBody,

    /// A setup/teardown method raised
    Fixture { fixture: FixtureRef },

    /// The engine could not classify the failure origin
    Unknown { detail: String },
}

/// A single lifecycle callback, as delivered by the engine or replayed from
/// a JSONL capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    SuiteStarted { suite: SuiteRef },
    SuiteFinished { suite: SuiteRef },
    SuiteSkipped { suite: SuiteRef },

    ScenarioStarted { scenario: ScenarioRef },
    ScenarioFinished { scenario: ScenarioRef },
    ScenarioSkipped { scenario: ScenarioRef },

    ExampleStarted { example: ExampleRef },
    ExampleFinished { example: ExampleRef },

    FixtureStarted { fixture: FixtureRef },
    FixtureFinished { fixture: FixtureRef },

    Error { source: ErrorSource, message: String },
}

impl LifecycleEvent {
    /// Short label for summaries and trace records.
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleEvent::SuiteStarted { .. } => "suite_started",
            LifecycleEvent::SuiteFinished { .. } => "suite_finished",
            LifecycleEvent::SuiteSkipped { .. } => "suite_skipped",
            LifecycleEvent::ScenarioStarted { .. } => "scenario_started",
            LifecycleEvent::ScenarioFinished { .. } => "scenario_finished",
            LifecycleEvent::ScenarioSkipped { .. } => "scenario_skipped",
            LifecycleEvent::ExampleStarted { .. } => "example_started",
            LifecycleEvent::ExampleFinished { .. } => "example_finished",
            LifecycleEvent::FixtureStarted { .. } => "fixture_started",
            LifecycleEvent::FixtureFinished { .. } => "fixture_finished",
            LifecycleEvent::Error { .. } => "error",
        }
    }
}

fn default_true() -> bool {
    true
}
