use serde::{Deserialize, Serialize};

use crate::model::event::{FixturePhase, FixtureScope};
use crate::model::status::Status;

// ============================================================================
// Footprint — bookkeeping record for one tracked node
// ============================================================================

/// Opaque item id assigned by the reporting server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque launch id assigned by the reporting server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchId(pub String);

impl LaunchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for LaunchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of logical node a footprint tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Suite,
    Scenario,
    Example,
    Fixture,
}

/// Bookkeeping record correlating one logical node with its server-side
/// item and status.
///
/// One record type covers every node kind; `kind` says which fields are
/// meaningful. Suites hold scenario entries in `children`; scenarios hold
/// example entries. Fixture records live in their owner's `fixtures` list
/// (suite-scoped fixtures on the suite, example-scoped fixtures on the
/// example), never free-floating.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    pub kind: NodeKind,

    /// Display name; for a masked example this is the scenario's own name
    pub name: String,

    /// Server-side item id. Scenario entries have none: the scenario node
    /// itself is never a server-side item.
    pub item_id: Option<ItemId>,

    /// Explicit status, unset until some event determines it
    pub status: Option<Status>,

    /// Monotone false→true; a published record accepts no further mutation
    pub published: bool,

    /// Scenario and example entries under this node
    pub children: Vec<Footprint>,

    /// Fixture records owned by this node
    pub fixtures: Vec<Footprint>,

    /// Scenario entries only: examples are hidden behind one synthetic
    /// masked example
    pub masked: bool,

    /// Example entries only: which data row produced this run
    pub iteration: Option<usize>,

    /// Fixture records only
    pub fixture_scope: Option<FixtureScope>,
    pub fixture_phase: Option<FixturePhase>,
}

impl Footprint {
    pub fn suite(name: &str, item_id: ItemId) -> Self {
        Self::blank(NodeKind::Suite, name).with_item(item_id)
    }

    pub fn scenario(name: &str, masked: bool) -> Self {
        let mut fp = Self::blank(NodeKind::Scenario, name);
        fp.masked = masked;
        fp
    }

    pub fn example(name: &str, iteration: usize, item_id: ItemId) -> Self {
        let mut fp = Self::blank(NodeKind::Example, name).with_item(item_id);
        fp.iteration = Some(iteration);
        fp
    }

    /// Synthetic example standing in for a whole masked scenario; carries
    /// the scenario's own name and no row index.
    pub fn masked_example(name: &str, item_id: ItemId) -> Self {
        Self::blank(NodeKind::Example, name).with_item(item_id)
    }

    pub fn fixture(
        name: &str,
        scope: FixtureScope,
        phase: FixturePhase,
        item_id: ItemId,
    ) -> Self {
        let mut fp = Self::blank(NodeKind::Fixture, name).with_item(item_id);
        fp.fixture_scope = Some(scope);
        fp.fixture_phase = Some(phase);
        fp
    }

    fn blank(kind: NodeKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            item_id: None,
            status: None,
            published: false,
            children: Vec::new(),
            fixtures: Vec::new(),
            masked: false,
            iteration: None,
            fixture_scope: None,
            fixture_phase: None,
        }
    }

    fn with_item(mut self, item_id: ItemId) -> Self {
        self.item_id = Some(item_id);
        self
    }

    /// Suites and scenarios aggregate descendants; examples and fixtures
    /// are leaves. Fixture records are not descendants for status purposes.
    pub fn has_descendants(&self) -> bool {
        matches!(self.kind, NodeKind::Suite | NodeKind::Scenario)
    }

    /// Record a status signal. Published records are frozen; late signals
    /// are dropped. Returns whether the signal was accepted.
    pub fn set_status(&mut self, status: Status) -> bool {
        if self.published {
            return false;
        }
        self.status = Some(status);
        true
    }

    /// Final status to send with the finish request: an explicit status
    /// wins; a node with descendants defers to server-side aggregation
    /// (`None`); a leaf with no signal passed.
    pub fn calculate_status(&self) -> Option<Status> {
        if self.status.is_some() {
            return self.status;
        }
        if self.has_descendants() {
            return None;
        }
        Some(Status::Passed)
    }

    /// Whether any non-teardown fixture owned by this node failed.
    ///
    /// Teardown failures do not count: teardown runs after the node's own
    /// outcome is already meaningful.
    pub fn has_failed_setup_fixture(&self) -> bool {
        self.fixtures.iter().any(|f| {
            f.fixture_phase != Some(FixturePhase::Teardown) && f.status == Some(Status::Failed)
        })
    }

    /// Child scenario entry by name.
    pub fn find_scenario_mut(&mut self, name: &str) -> Option<&mut Footprint> {
        self.children
            .iter_mut()
            .filter(|c| c.kind == NodeKind::Scenario)
            .find(|c| c.name == name)
    }

    pub fn find_scenario(&self, name: &str) -> Option<&Footprint> {
        self.children
            .iter()
            .filter(|c| c.kind == NodeKind::Scenario)
            .find(|c| c.name == name)
    }

    /// Example entry for one data row of a child scenario.
    pub fn find_example_mut(
        &mut self,
        scenario: &str,
        iteration: usize,
    ) -> Option<&mut Footprint> {
        self.find_scenario_mut(scenario)?
            .children
            .iter_mut()
            .find(|e| e.iteration == Some(iteration))
    }

    /// The synthetic masked example of a child scenario, if any.
    pub fn find_masked_example_mut(&mut self, scenario: &str) -> Option<&mut Footprint> {
        self.find_scenario_mut(scenario)?
            .children
            .iter_mut()
            .find(|e| e.iteration.is_none())
    }

    /// Example entry addressed by a runtime-pointer key (row index or
    /// masked stand-in).
    pub fn find_example_by_key_mut(
        &mut self,
        key: &crate::model::identity::ExampleKey,
    ) -> Option<&mut Footprint> {
        self.find_scenario_mut(&key.scenario)?
            .children
            .iter_mut()
            .find(|e| e.iteration == key.iteration)
    }

    /// Most recent unpublished fixture record with the given name.
    pub fn find_open_fixture_mut(&mut self, name: &str) -> Option<&mut Footprint> {
        self.fixtures
            .iter_mut()
            .rev()
            .find(|f| f.name == name && !f.published)
    }
}
