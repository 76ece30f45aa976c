use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::model::event::{ExampleRef, ScenarioRef};
use crate::model::identity::{ExampleKey, Location, SuiteIdentity};
use crate::track::footprint::{Footprint, ItemId, LaunchId};
use crate::track::pointer::RuntimePointer;
use crate::track::{lock, read, write};

// ============================================================================
// Launch context — the footprint registry for one test run
// ============================================================================

/// Suite cells keyed by registered location, remembering registration
/// order for the launch-finish sweep.
#[derive(Debug, Default)]
struct SuiteRegistry {
    by_location: HashMap<Location, Arc<Mutex<Footprint>>>,
    order: Vec<Location>,
}

/// Central store for one launch: maps suite identity to its footprint
/// tree, owns one runtime pointer per execution thread, and gates the
/// launch start/finish calls so each fires exactly once.
///
/// Suites run on independent threads concurrently. The registry map takes
/// a write lock only to insert; every footprint lives in its own mutex
/// cell, so mutating one suite's tree never blocks lookups or mutation of
/// an unrelated suite.
#[derive(Debug, Default)]
pub struct LaunchContext {
    launch_id: Mutex<Option<LaunchId>>,
    started: AtomicBool,
    finished: AtomicBool,
    suites: RwLock<SuiteRegistry>,
    pointers: RwLock<HashMap<String, Arc<Mutex<RuntimePointer>>>>,
}

impl LaunchContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Launch lifecycle gates
    // ------------------------------------------------------------------

    /// First caller wins and must perform the actual backend launch-start
    /// call; every later caller gets `false`.
    pub fn try_start_launch(&self) -> bool {
        self.started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// First caller wins and must perform the actual backend
    /// launch-finish call.
    pub fn try_finish_launch(&self) -> bool {
        self.finished
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn set_launch_id(&self, id: LaunchId) {
        *lock(&self.launch_id) = Some(id);
    }

    pub fn launch_id(&self) -> Option<LaunchId> {
        lock(&self.launch_id).clone()
    }

    /// Tear down after launch finish so a subsequent run starts clean.
    pub fn reset(&self) {
        *lock(&self.launch_id) = None;
        self.started.store(false, Ordering::SeqCst);
        self.finished.store(false, Ordering::SeqCst);
        let mut suites = write(&self.suites);
        suites.by_location.clear();
        suites.order.clear();
        write(&self.pointers).clear();
    }

    // ------------------------------------------------------------------
    // Suite registration and lookup
    // ------------------------------------------------------------------

    /// Track a suite as running and point the calling thread at it.
    ///
    /// Suites are process-wide singletons per identity: when two threads
    /// race on the same location, the first registration wins and the
    /// loser is handed the winner's cell.
    pub fn register_suite_start(
        &self,
        identity: &SuiteIdentity,
        name: &str,
        item_id: ItemId,
        thread: &str,
    ) -> Arc<Mutex<Footprint>> {
        let cell = {
            let mut suites = write(&self.suites);
            match suites.by_location.get(&identity.location) {
                Some(existing) => Arc::clone(existing),
                None => {
                    let cell = Arc::new(Mutex::new(Footprint::suite(name, item_id)));
                    suites
                        .by_location
                        .insert(identity.location.clone(), Arc::clone(&cell));
                    suites.order.push(identity.location.clone());
                    cell
                }
            }
        };

        let pointer = self.pointer_for(thread);
        lock(&pointer).point_to_suite(identity.location.clone());
        cell
    }

    /// Resolve a suite footprint, walking the declared base chain when no
    /// exact registration exists (inherited suites resolve to their
    /// registered ancestor). Returns `None` rather than erroring: an
    /// untracked suite is the expected out-of-order case.
    pub fn find_suite(&self, identity: &SuiteIdentity) -> Option<Arc<Mutex<Footprint>>> {
        let suites = read(&self.suites);
        identity
            .candidates()
            .find_map(|loc| suites.by_location.get(loc).map(Arc::clone))
    }

    /// The location a suite identity actually resolved to in the registry.
    pub fn resolve_location(&self, identity: &SuiteIdentity) -> Option<Location> {
        let suites = read(&self.suites);
        identity
            .candidates()
            .find(|loc| suites.by_location.contains_key(*loc))
            .cloned()
    }

    pub fn find_suite_at(&self, location: &Location) -> Option<Arc<Mutex<Footprint>>> {
        read(&self.suites).by_location.get(location).map(Arc::clone)
    }

    /// Every suite footprint not yet published, in registration order.
    /// Used at launch finish to flush stragglers.
    pub fn find_all_unpublished_suites(&self) -> Vec<Arc<Mutex<Footprint>>> {
        let suites = read(&self.suites);
        suites
            .order
            .iter()
            .filter_map(|loc| suites.by_location.get(loc))
            .filter(|cell| !lock(cell).published)
            .map(Arc::clone)
            .collect()
    }

    pub fn suite_count(&self) -> usize {
        read(&self.suites).order.len()
    }

    // ------------------------------------------------------------------
    // Scenario and example registration
    // ------------------------------------------------------------------

    /// Track a scenario under its parent suite and point the calling
    /// thread at it. When the parent suite is not registered the call is
    /// a silent no-op: the scenario cannot be tracked without a parent,
    /// and degrading quietly beats failing the run.
    pub fn register_scenario_start(
        &self,
        scenario: &ScenarioRef,
        masked: bool,
        thread: &str,
    ) -> bool {
        let Some(cell) = self.find_suite(&scenario.suite) else {
            return false;
        };

        {
            let mut suite = lock(&cell);
            if suite.find_scenario(&scenario.name).is_none() {
                suite
                    .children
                    .push(Footprint::scenario(&scenario.name, masked));
            }
        }

        let pointer = self.pointer_for(thread);
        lock(&pointer).point_to_scenario(&scenario.name);
        true
    }

    /// Track one example run under its scenario and point the calling
    /// thread at it.
    pub fn register_example_start(
        &self,
        example: &ExampleRef,
        item_id: ItemId,
        thread: &str,
    ) -> bool {
        let Some(cell) = self.find_suite(&example.suite) else {
            return false;
        };

        {
            let mut suite = lock(&cell);
            let Some(scenario) = suite.find_scenario_mut(&example.scenario) else {
                return false;
            };
            scenario
                .children
                .push(Footprint::example(&example.name, example.iteration, item_id));
        }

        let pointer = self.pointer_for(thread);
        lock(&pointer).point_to_example(ExampleKey::row(&example.scenario, example.iteration));
        true
    }

    /// Exact lookup of one example run's item id.
    pub fn find_example_item(&self, example: &ExampleRef) -> Option<ItemId> {
        let cell = self.find_suite(&example.suite)?;
        let mut suite = lock(&cell);
        suite
            .find_example_mut(&example.scenario, example.iteration)
            .and_then(|fp| fp.item_id.clone())
    }

    /// Item ids of every tracked run of a scenario, in registration order.
    pub fn find_all_example_items(&self, scenario: &ScenarioRef) -> Vec<ItemId> {
        let Some(cell) = self.find_suite(&scenario.suite) else {
            return Vec::new();
        };
        let suite = lock(&cell);
        suite
            .find_scenario(&scenario.name)
            .map(|s| {
                s.children
                    .iter()
                    .filter_map(|e| e.item_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Runtime pointers
    // ------------------------------------------------------------------

    /// The calling thread's runtime pointer, created on first use.
    pub fn pointer_for(&self, thread: &str) -> Arc<Mutex<RuntimePointer>> {
        if let Some(existing) = read(&self.pointers).get(thread) {
            return Arc::clone(existing);
        }
        let mut pointers = write(&self.pointers);
        Arc::clone(
            pointers
                .entry(thread.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(RuntimePointer::new()))),
        )
    }
}
