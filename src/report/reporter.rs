use std::sync::atomic::{AtomicBool, Ordering};

use crate::model::event::{
    ErrorSource, ExampleRef, FixtureRef, FixtureScope, LifecycleEvent, ScenarioRef, SuiteRef,
};
use crate::model::identity::{ExampleKey, SuiteIdentity, case_fingerprint};
use crate::model::status::{IssueTag, ItemKind, LaunchMode, LogLevel, Status, now_ms};
use crate::report::backend::{
    Attribute, FinishItemRequest, LogRequest, NullBackend, ReportingBackend, StartItemRequest,
    StartLaunchRequest,
};
use crate::report::error::ReportError;
use crate::track::footprint::{Footprint, ItemId, NodeKind};
use crate::track::launch::LaunchContext;
use crate::track::lock;
use crate::track::running::ThreadContext;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

// ============================================================================
// Reporter — turns lifecycle callbacks into backend start/finish/log calls
// ============================================================================

/// Behavior knobs for the reporting pipeline.
#[derive(Debug, Clone)]
pub struct ReportingPolicy {
    /// Master switch; when off every operation is a no-op
    pub enabled: bool,

    /// Global kill-switch for per-row reporting of data-driven scenarios.
    /// A scenario also opts out individually via its own descriptor.
    pub report_iterations: bool,

    /// When true, skipped items are left for investigation instead of
    /// being tagged "not an issue"
    pub skipped_is_issue: bool,
}

impl Default for ReportingPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            report_iterations: true,
            skipped_is_issue: false,
        }
    }
}

/// Launch-level metadata sent with the launch-start call.
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub name: String,
    pub description: Option<String>,
    pub attributes: Vec<Attribute>,
    pub mode: LaunchMode,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            name: "test run".to_string(),
            description: None,
            attributes: Vec::new(),
            mode: LaunchMode::Default,
        }
    }
}

/// Consumes test-engine lifecycle callbacks, drives the footprint
/// registry, computes final statuses, and issues start/finish/log requests
/// to the reporting backend.
///
/// Every public method is failure-isolated: reporting problems downgrade
/// to warnings and trip the circuit breaker, they never propagate to the
/// test engine. Callbacks may arrive concurrently from several execution
/// threads; each thread passes its own [`ThreadContext`].
pub struct Reporter {
    backend: Box<dyn ReportingBackend + Send + Sync>,
    launch: LaunchContext,
    policy: ReportingPolicy,
    settings: LaunchSettings,

    /// One-way: flips on the first failed backend call and never clears
    backend_down: AtomicBool,

    /// Launch-level failure signal (a skip occurred under the default
    /// skip policy)
    launch_degraded: AtomicBool,

    tracer: TraceLogger,
}

impl Reporter {
    pub fn new(
        backend: Box<dyn ReportingBackend + Send + Sync>,
        policy: ReportingPolicy,
        settings: LaunchSettings,
    ) -> Self {
        Self {
            backend,
            launch: LaunchContext::new(),
            policy,
            settings,
            backend_down: AtomicBool::new(false),
            launch_degraded: AtomicBool::new(false),
            tracer: TraceLogger::disabled(),
        }
    }

    /// Reporter with reporting turned off: a null object over a null
    /// backend, selected at construction time.
    pub fn disabled() -> Self {
        let policy = ReportingPolicy {
            enabled: false,
            ..ReportingPolicy::default()
        };
        Self::new(Box::new(NullBackend), policy, LaunchSettings::default())
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    /// Registry handle, exposed for inspection and tests.
    pub fn launch_context(&self) -> &LaunchContext {
        &self.launch
    }

    pub fn is_circuit_open(&self) -> bool {
        self.backend_down.load(Ordering::SeqCst)
    }

    pub fn is_launch_degraded(&self) -> bool {
        self.launch_degraded.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Launch lifecycle
    // ------------------------------------------------------------------

    /// Start the launch if nobody has yet. Safe to call from every
    /// thread; exactly one caller performs the backend call.
    pub fn start_run(&self, thread: &str) {
        if !self.active() {
            return;
        }
        self.ensure_launch_started(thread);
    }

    /// Finish the launch: flush still-unpublished suite footprints, send
    /// the launch-finish call, and reset the registry for the next run.
    /// Exactly one caller performs the backend call.
    pub fn finish_run(&self, thread: &str) {
        if !self.policy.enabled {
            return;
        }
        if !self.launch.try_finish_launch() {
            return;
        }

        if !self.backend_down.load(Ordering::SeqCst) {
            for cell in self.launch.find_all_unpublished_suites() {
                if self.backend_down.load(Ordering::SeqCst) {
                    break;
                }
                let mut suite = lock(&cell);
                self.finish_footprint(thread, &mut suite);
            }

            if let Some(id) = self.launch.launch_id() {
                let status = if self.is_launch_degraded() {
                    Some(Status::Failed)
                } else {
                    None
                };
                if let Err(e) = self.backend.finish_launch(&id, status) {
                    self.trip_breaker(thread, "finish_launch", &e);
                } else {
                    self.tracer
                        .log(&TraceEvent::now(thread, "launch_finished").with_detail(&id));
                }
            }
        }

        self.launch.reset();
        self.launch_degraded.store(false, Ordering::SeqCst);
    }

    // ------------------------------------------------------------------
    // Suite callbacks
    // ------------------------------------------------------------------

    pub fn on_suite_enter(&self, ctx: &mut ThreadContext, suite: &SuiteRef) {
        if !self.active() {
            return;
        }
        self.ensure_launch_started(&ctx.thread);
        if !self.active() {
            return;
        }

        // First registration wins; a duplicate enter is a no-op.
        if self.launch.find_suite_at(&suite.identity.location).is_some() {
            self.trace_drop(&ctx.thread, "duplicate_suite", &suite.identity);
            return;
        }

        let req = StartItemRequest {
            name: suite.name.clone(),
            kind: ItemKind::Suite,
            description: suite.description.clone(),
            test_case_id: Some(suite.identity.location.fingerprint()),
            start_time_ms: now_ms(),
        };
        let Some(item_id) = self.backend_start_item(&ctx.thread, None, &req) else {
            return;
        };

        self.launch
            .register_suite_start(&suite.identity, &suite.name, item_id.clone(), &ctx.thread);
        ctx.stack.push(item_id.clone());
        self.tracer.log(
            &TraceEvent::now(&ctx.thread, "suite_started")
                .with_node(suite.identity.location.key())
                .with_item(&item_id),
        );
    }

    pub fn on_suite_exit(&self, ctx: &mut ThreadContext, suite: &SuiteRef) {
        if !self.active() {
            return;
        }
        let Some(cell) = self.launch.find_suite(&suite.identity) else {
            self.trace_drop(&ctx.thread, "untracked_suite_exit", &suite.identity);
            return;
        };

        let finished = {
            let mut fp = lock(&cell);
            let item = fp.item_id.clone();
            if self.finish_footprint(&ctx.thread, &mut fp) {
                item
            } else {
                None
            }
        };
        pop_if_top(ctx, finished);

        let pointer = self.launch.pointer_for(&ctx.thread);
        lock(&pointer).leave_suite();
    }

    /// A skipped suite gets its status recorded but is NOT finished here:
    /// its finish is deferred to normal suite-exit handling (or the
    /// launch-finish sweep) so any already-open children still resolve.
    pub fn on_suite_skipped(&self, ctx: &mut ThreadContext, suite: &SuiteRef) {
        if !self.active() {
            return;
        }
        self.ensure_launch_started(&ctx.thread);
        if !self.active() {
            return;
        }

        let cell = match self.launch.find_suite(&suite.identity) {
            Some(cell) => cell,
            None => {
                // Skip can arrive before the suite was ever entered.
                let req = StartItemRequest {
                    name: suite.name.clone(),
                    kind: ItemKind::Suite,
                    description: suite.description.clone(),
                    test_case_id: Some(suite.identity.location.fingerprint()),
                    start_time_ms: now_ms(),
                };
                let Some(item_id) = self.backend_start_item(&ctx.thread, None, &req) else {
                    return;
                };
                self.launch.register_suite_start(
                    &suite.identity,
                    &suite.name,
                    item_id,
                    &ctx.thread,
                )
            }
        };

        lock(&cell).set_status(Status::Skipped);
        self.tracer.log(
            &TraceEvent::now(&ctx.thread, "suite_skipped")
                .with_node(suite.identity.location.key()),
        );
    }

    // ------------------------------------------------------------------
    // Scenario callbacks
    // ------------------------------------------------------------------

    pub fn on_scenario_enter(&self, ctx: &mut ThreadContext, scenario: &ScenarioRef) {
        if !self.active() {
            return;
        }
        let masked = self.is_masked(scenario);
        if !self
            .launch
            .register_scenario_start(scenario, masked, &ctx.thread)
        {
            self.trace_drop(&ctx.thread, "untracked_scenario", &scenario.suite);
            return;
        }

        if masked {
            self.open_masked_example(ctx, scenario);
        }
    }

    pub fn on_scenario_exit(&self, ctx: &mut ThreadContext, scenario: &ScenarioRef) {
        if !self.active() {
            return;
        }
        let Some(cell) = self.launch.find_suite(&scenario.suite) else {
            return;
        };

        // Close the masked stand-in (regular masked flow) or any
        // straggler created by a data-computation error.
        let finished = {
            let mut suite = lock(&cell);
            match suite.find_masked_example_mut(&scenario.name) {
                Some(fp) if !fp.published => {
                    let item = fp.item_id.clone();
                    if self.finish_footprint(&ctx.thread, fp) {
                        item
                    } else {
                        None
                    }
                }
                _ => None,
            }
        };
        pop_if_top(ctx, finished);

        let pointer = self.launch.pointer_for(&ctx.thread);
        lock(&pointer).leave_scenario();
    }

    /// A skipped scenario registers its masked footprint, marks it
    /// Skipped, and finishes it immediately — the body never runs.
    pub fn on_scenario_skipped(&self, ctx: &mut ThreadContext, scenario: &ScenarioRef) {
        if !self.active() {
            return;
        }
        self.ensure_launch_started(&ctx.thread);
        if !self.active() {
            return;
        }
        if !self
            .launch
            .register_scenario_start(scenario, true, &ctx.thread)
        {
            self.trace_drop(&ctx.thread, "untracked_scenario", &scenario.suite);
            return;
        }

        let Some(cell) = self.launch.find_suite(&scenario.suite) else {
            return;
        };
        let Some(item_id) = self.start_masked_item(&ctx.thread, scenario) else {
            return;
        };

        ctx.stack.push(item_id.clone());
        let finished = {
            let mut suite = lock(&cell);
            let Some(entry) = suite.find_scenario_mut(&scenario.name) else {
                return;
            };
            entry
                .children
                .push(Footprint::masked_example(&scenario.name, item_id.clone()));
            let fp = match entry.children.last_mut() {
                Some(fp) => fp,
                None => return,
            };
            fp.set_status(Status::Skipped);
            self.finish_footprint(&ctx.thread, fp)
        };
        if finished {
            pop_if_top(ctx, Some(item_id));
        }

        let pointer = self.launch.pointer_for(&ctx.thread);
        lock(&pointer).leave_scenario();
    }

    // ------------------------------------------------------------------
    // Example callbacks
    // ------------------------------------------------------------------

    pub fn on_example_enter(&self, ctx: &mut ThreadContext, example: &ExampleRef) {
        if !self.active() {
            return;
        }
        if self.scenario_is_masked(example) {
            // Individual rows of a masked scenario are not reported.
            return;
        }

        // The owning scenario must already be tracked, or the example
        // cannot be attached anywhere.
        let parent = {
            let Some(cell) = self.launch.find_suite(&example.suite) else {
                self.trace_drop(&ctx.thread, "untracked_example", &example.suite);
                return;
            };
            let suite = lock(&cell);
            if suite.find_scenario(&example.scenario).is_none() {
                self.trace_drop(&ctx.thread, "untracked_example", &example.suite);
                return;
            }
            match suite.item_id.clone() {
                Some(id) => id,
                None => return,
            }
        };

        let req = StartItemRequest {
            name: example.name.clone(),
            kind: ItemKind::Scenario,
            description: None,
            test_case_id: Some(case_fingerprint(
                &example.suite.location,
                &example.name,
            )),
            start_time_ms: now_ms(),
        };
        let Some(item_id) = self.backend_start_item(&ctx.thread, Some(&parent), &req) else {
            return;
        };

        if !self
            .launch
            .register_example_start(example, item_id.clone(), &ctx.thread)
        {
            self.trace_drop(&ctx.thread, "untracked_example", &example.suite);
            return;
        }
        ctx.stack.push(item_id);
    }

    pub fn on_example_exit(&self, ctx: &mut ThreadContext, example: &ExampleRef) {
        if !self.active() {
            return;
        }
        if self.scenario_is_masked(example) {
            return;
        }

        let Some(cell) = self.launch.find_suite(&example.suite) else {
            return;
        };
        let finished = {
            let mut suite = lock(&cell);
            match suite.find_example_mut(&example.scenario, example.iteration) {
                Some(fp) if !fp.published => {
                    let item = fp.item_id.clone();
                    if self.finish_footprint(&ctx.thread, fp) {
                        item
                    } else {
                        None
                    }
                }
                _ => None,
            }
        };
        pop_if_top(ctx, finished);

        let pointer = self.launch.pointer_for(&ctx.thread);
        lock(&pointer).leave_example();
    }

    // ------------------------------------------------------------------
    // Fixture callbacks
    // ------------------------------------------------------------------

    pub fn on_fixture_enter(&self, ctx: &mut ThreadContext, fixture: &FixtureRef) {
        if !self.active() {
            return;
        }
        let Some(parent) = self.fixture_owner_item(ctx, fixture) else {
            self.trace_drop(&ctx.thread, "untracked_fixture", &fixture.suite);
            return;
        };

        let req = StartItemRequest {
            name: fixture.name.clone(),
            kind: fixture.item_kind(),
            description: None,
            test_case_id: None,
            start_time_ms: now_ms(),
        };
        let Some(item_id) = self.backend_start_item(&ctx.thread, Some(&parent), &req) else {
            return;
        };

        if self.attach_fixture(ctx, fixture, item_id.clone(), None) {
            ctx.stack.push(item_id);
        }
    }

    pub fn on_fixture_exit(&self, ctx: &mut ThreadContext, fixture: &FixtureRef) {
        if !self.active() {
            return;
        }
        let finished = self.with_fixture_owner(ctx, fixture, |reporter, thread, owner| {
            match owner.find_open_fixture_mut(&fixture.name) {
                Some(fp) => {
                    let item = fp.item_id.clone();
                    if reporter.finish_footprint(thread, fp) {
                        item
                    } else {
                        None
                    }
                }
                None => None,
            }
        });
        pop_if_top(ctx, finished.flatten());
    }

    // ------------------------------------------------------------------
    // Error attribution
    // ------------------------------------------------------------------

    /// Route a failure to exactly one footprint. A published target means
    /// the signal arrived late; late errors must not resurrect a finished
    /// item, so they are dropped.
    pub fn on_error(&self, ctx: &mut ThreadContext, source: &ErrorSource, message: &str) {
        if !self.active() {
            return;
        }

        match source {
            ErrorSource::SuiteInitializer { suite } => {
                let Some(cell) = self.launch.find_suite(suite) else {
                    self.trace_drop(&ctx.thread, "untracked_error_suite", suite);
                    return;
                };
                let target = {
                    let mut fp = lock(&cell);
                    if !fp.set_status(Status::Failed) {
                        None
                    } else {
                        fp.item_id.clone()
                    }
                };
                if let Some(item) = target {
                    self.backend_log(&ctx.thread, &item, LogLevel::Error, message);
                }
            }

            ErrorSource::ScenarioData { scenario } => {
                self.fail_scenario_data(ctx, scenario, message);
            }

            ErrorSource::ExampleBody => {
                let target = self.current_example_item(ctx, true);
                match target {
                    Some(item) => {
                        self.backend_log(&ctx.thread, &item, LogLevel::Error, message);
                    }
                    None => {
                        self.tracer.log(
                            &TraceEvent::now(&ctx.thread, "error_dropped")
                                .with_detail("no current example"),
                        );
                    }
                }
            }

            ErrorSource::Fixture { fixture } => {
                self.fail_fixture(ctx, fixture, message);
            }

            ErrorSource::Unknown { detail } => {
                eprintln!(
                    "Warning: could not attribute test failure ({}): {}",
                    detail, message
                );
                self.tracer.log(
                    &TraceEvent::now(&ctx.thread, "error_unattributed").with_detail(detail),
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Log side channel
    // ------------------------------------------------------------------

    /// Forward a log line to whichever item is currently running on this
    /// thread. Lines emitted with nothing open are dropped.
    pub fn log(&self, ctx: &ThreadContext, level: LogLevel, message: &str) {
        if !self.active() {
            return;
        }
        match ctx.stack.current_item() {
            Some(item) => self.backend_log(&ctx.thread, &item, level, message),
            None => {
                self.tracer.log(
                    &TraceEvent::now(&ctx.thread, "log_dropped")
                        .with_detail("no running item"),
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Replay dispatch
    // ------------------------------------------------------------------

    /// Feed one captured event through the same paths the live callbacks
    /// take.
    pub fn handle(&self, ctx: &mut ThreadContext, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::SuiteStarted { suite } => self.on_suite_enter(ctx, suite),
            LifecycleEvent::SuiteFinished { suite } => self.on_suite_exit(ctx, suite),
            LifecycleEvent::SuiteSkipped { suite } => self.on_suite_skipped(ctx, suite),
            LifecycleEvent::ScenarioStarted { scenario } => self.on_scenario_enter(ctx, scenario),
            LifecycleEvent::ScenarioFinished { scenario } => self.on_scenario_exit(ctx, scenario),
            LifecycleEvent::ScenarioSkipped { scenario } => self.on_scenario_skipped(ctx, scenario),
            LifecycleEvent::ExampleStarted { example } => self.on_example_enter(ctx, example),
            LifecycleEvent::ExampleFinished { example } => self.on_example_exit(ctx, example),
            LifecycleEvent::FixtureStarted { fixture } => self.on_fixture_enter(ctx, fixture),
            LifecycleEvent::FixtureFinished { fixture } => self.on_fixture_exit(ctx, fixture),
            LifecycleEvent::Error { source, message } => self.on_error(ctx, source, message),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn active(&self) -> bool {
        self.policy.enabled && !self.backend_down.load(Ordering::SeqCst)
    }

    /// Effective masking: the scenario's own opt-out or the global
    /// kill-switch. A single-run scenario is always represented by one
    /// stand-in example carrying the scenario's name.
    fn is_masked(&self, scenario: &ScenarioRef) -> bool {
        scenario.is_masked() || !self.policy.report_iterations
    }

    fn ensure_launch_started(&self, thread: &str) {
        if !self.launch.try_start_launch() {
            return;
        }
        let req = StartLaunchRequest {
            name: self.settings.name.clone(),
            description: self.settings.description.clone(),
            attributes: self.settings.attributes.clone(),
            mode: self.settings.mode,
            start_time_ms: now_ms(),
        };
        match self.backend.start_launch(&req) {
            Ok(id) => {
                self.tracer
                    .log(&TraceEvent::now(thread, "launch_started").with_detail(&id));
                self.launch.set_launch_id(id);
            }
            Err(e) => self.trip_breaker(thread, "start_launch", &e),
        }
    }

    fn trip_breaker(&self, thread: &str, context: &str, err: &ReportError) {
        if !self.backend_down.swap(true, Ordering::SeqCst) {
            eprintln!(
                "Warning: reporting backend call '{}' failed, reporting is disabled for the rest of the run: {}",
                context, err
            );
            self.tracer.log(
                &TraceEvent::now(thread, "circuit_open")
                    .with_detail(format!("{}: {}", context, err)),
            );
        }
    }

    fn backend_start_item(
        &self,
        thread: &str,
        parent: Option<&ItemId>,
        req: &StartItemRequest,
    ) -> Option<ItemId> {
        match self.backend.start_item(parent, req) {
            Ok(id) => Some(id),
            Err(e) => {
                self.trip_breaker(thread, "start_item", &e);
                None
            }
        }
    }

    fn backend_log(&self, thread: &str, item: &ItemId, level: LogLevel, message: &str) {
        let req = LogRequest {
            message: message.to_string(),
            level,
            time_ms: now_ms(),
        };
        if let Err(e) = self.backend.log(item, &req) {
            self.trip_breaker(thread, "log", &e);
        }
    }

    /// Finish one footprint: compute its final status, apply the fixture
    /// bubbling and skip policies, send the finish request, and freeze
    /// the record. Returns whether a server item was actually closed.
    fn finish_footprint(&self, thread: &str, fp: &mut Footprint) -> bool {
        if fp.published {
            return false;
        }

        let mut status = fp.calculate_status();
        let mut issue = None;

        // A failed setup fixture fails the example it belongs to, even
        // when the body itself passed. Teardown failures do not count.
        if fp.kind == NodeKind::Example && fp.has_failed_setup_fixture() {
            status = Some(Status::Failed);
            issue = Some(IssueTag::NotAnIssue);
        }

        if status == Some(Status::Skipped) {
            if !self.policy.skipped_is_issue {
                issue = Some(IssueTag::NotAnIssue);
                self.launch_degraded.store(true, Ordering::SeqCst);
            }
        }

        fp.published = true;
        let Some(item_id) = fp.item_id.clone() else {
            // Scenario entries have no server item of their own.
            return false;
        };

        let req = FinishItemRequest {
            end_time_ms: now_ms(),
            status,
            issue,
        };
        match self.backend.finish_item(&item_id, &req) {
            Ok(()) => {
                self.tracer.log(
                    &TraceEvent::now(thread, "item_finished")
                        .with_node(&fp.name)
                        .with_item(&item_id)
                        .with_detail(format!("{:?}", status)),
                );
                true
            }
            Err(e) => {
                self.trip_breaker(thread, "finish_item", &e);
                // The record stays frozen; the request's effect is lost.
                true
            }
        }
    }

    fn suite_item_id(&self, identity: &SuiteIdentity) -> Option<ItemId> {
        let cell = self.launch.find_suite(identity)?;
        let fp = lock(&cell);
        fp.item_id.clone()
    }

    fn scenario_is_masked(&self, example: &ExampleRef) -> bool {
        let Some(cell) = self.launch.find_suite(&example.suite) else {
            return false;
        };
        let suite = lock(&cell);
        suite
            .find_scenario(&example.scenario)
            .map(|s| s.masked)
            .unwrap_or(false)
    }

    /// Start the synthetic stand-in item for a masked scenario.
    fn start_masked_item(&self, thread: &str, scenario: &ScenarioRef) -> Option<ItemId> {
        let parent = self.suite_item_id(&scenario.suite)?;
        let req = StartItemRequest {
            name: scenario.name.clone(),
            kind: ItemKind::Scenario,
            description: scenario.description.clone(),
            test_case_id: Some(case_fingerprint(
                &scenario.suite.location,
                &scenario.name,
            )),
            start_time_ms: now_ms(),
        };
        self.backend_start_item(thread, Some(&parent), &req)
    }

    /// Open the masked stand-in at scenario registration time and point
    /// the thread at it so fixtures and errors attach correctly.
    fn open_masked_example(&self, ctx: &mut ThreadContext, scenario: &ScenarioRef) {
        let Some(cell) = self.launch.find_suite(&scenario.suite) else {
            return;
        };
        let Some(item_id) = self.start_masked_item(&ctx.thread, scenario) else {
            return;
        };

        {
            let mut suite = lock(&cell);
            let Some(entry) = suite.find_scenario_mut(&scenario.name) else {
                return;
            };
            entry
                .children
                .push(Footprint::masked_example(&scenario.name, item_id.clone()));
        }

        let pointer = self.launch.pointer_for(&ctx.thread);
        lock(&pointer).point_to_example(ExampleKey::masked(&scenario.name));
        ctx.stack.push(item_id);
    }

    /// Scenario-level data/initializer failure: attribute it to the
    /// scenario's masked stand-in, creating one on the spot when the
    /// failure beat registration to it.
    fn fail_scenario_data(&self, ctx: &mut ThreadContext, scenario: &ScenarioRef, message: &str) {
        if !self
            .launch
            .register_scenario_start(scenario, true, &ctx.thread)
        {
            self.trace_drop(&ctx.thread, "untracked_error_scenario", &scenario.suite);
            return;
        }
        let Some(cell) = self.launch.find_suite(&scenario.suite) else {
            return;
        };

        // Reuse an open stand-in when one exists.
        let existing = {
            let mut suite = lock(&cell);
            match suite.find_masked_example_mut(&scenario.name) {
                Some(fp) if !fp.published => {
                    fp.set_status(Status::Failed);
                    fp.item_id.clone()
                }
                Some(_) => return, // late error, item already finished
                None => None,
            }
        };

        let item = match existing {
            Some(item) => item,
            None => {
                let Some(item_id) = self.start_masked_item(&ctx.thread, scenario) else {
                    return;
                };
                let mut suite = lock(&cell);
                let Some(entry) = suite.find_scenario_mut(&scenario.name) else {
                    return;
                };
                let mut fp = Footprint::masked_example(&scenario.name, item_id.clone());
                fp.set_status(Status::Failed);
                entry.children.push(fp);
                item_id
            }
        };

        self.backend_log(&ctx.thread, &item, LogLevel::Error, message);
    }

    /// Fixture failure: attribute it to the fixture's own footprint,
    /// creating one when the failure was reported before the fixture's
    /// enter callback (the out-of-order case this tracker exists for).
    fn fail_fixture(&self, ctx: &mut ThreadContext, fixture: &FixtureRef, message: &str) {
        let marked = self.with_fixture_owner(ctx, fixture, |_, _, owner| {
            match owner.find_open_fixture_mut(&fixture.name) {
                Some(fp) => {
                    fp.set_status(Status::Failed);
                    fp.item_id.clone()
                }
                None => None,
            }
        });

        match marked {
            Some(Some(item)) => {
                self.backend_log(&ctx.thread, &item, LogLevel::Error, message);
            }
            Some(None) => {
                // No open fixture record: the failure arrived first.
                let Some(parent) = self.fixture_owner_item(ctx, fixture) else {
                    self.trace_drop(&ctx.thread, "untracked_error_fixture", &fixture.suite);
                    return;
                };
                let req = StartItemRequest {
                    name: fixture.name.clone(),
                    kind: fixture.item_kind(),
                    description: None,
                    test_case_id: None,
                    start_time_ms: now_ms(),
                };
                let Some(item_id) = self.backend_start_item(&ctx.thread, Some(&parent), &req)
                else {
                    return;
                };
                if self.attach_fixture(ctx, fixture, item_id.clone(), Some(Status::Failed)) {
                    self.backend_log(&ctx.thread, &item_id, LogLevel::Error, message);
                }
            }
            None => {
                self.trace_drop(&ctx.thread, "untracked_error_fixture", &fixture.suite);
            }
        }
    }

    /// Current example's item id; optionally marks it Failed first.
    /// Returns `None` when nothing is pointed at or the record is
    /// already published.
    fn current_example_item(&self, ctx: &ThreadContext, mark_failed: bool) -> Option<ItemId> {
        let pointer = self.launch.pointer_for(&ctx.thread);
        let (suite_loc, key) = {
            let p = lock(&pointer);
            (p.current_suite.clone()?, p.current_example.clone()?)
        };
        let cell = self.launch.find_suite_at(&suite_loc)?;
        let mut suite = lock(&cell);
        let fp = suite.find_example_by_key_mut(&key)?;
        if fp.published {
            return None;
        }
        if mark_failed {
            fp.set_status(Status::Failed);
        }
        fp.item_id.clone()
    }

    /// Resolve the server item a fixture nests under: the suite item for
    /// suite-scoped fixtures, the currently-pointed-at example item for
    /// example-scoped ones.
    fn fixture_owner_item(&self, ctx: &ThreadContext, fixture: &FixtureRef) -> Option<ItemId> {
        match fixture.scope {
            FixtureScope::Suite => self.suite_item_id(&fixture.suite),
            FixtureScope::Example => self.current_example_item(ctx, false),
        }
    }

    /// Run a closure against the footprint owning this fixture's records.
    fn with_fixture_owner<R>(
        &self,
        ctx: &ThreadContext,
        fixture: &FixtureRef,
        f: impl FnOnce(&Self, &str, &mut Footprint) -> R,
    ) -> Option<R> {
        let cell = self.launch.find_suite(&fixture.suite)?;
        match fixture.scope {
            FixtureScope::Suite => {
                let mut suite = lock(&cell);
                Some(f(self, &ctx.thread, &mut suite))
            }
            FixtureScope::Example => {
                let pointer = self.launch.pointer_for(&ctx.thread);
                let key = lock(&pointer).current_example.clone()?;
                let mut suite = lock(&cell);
                let fp = suite.find_example_by_key_mut(&key)?;
                Some(f(self, &ctx.thread, fp))
            }
        }
    }

    /// Append a fixture footprint to its owner. Returns whether an owner
    /// was found.
    fn attach_fixture(
        &self,
        ctx: &ThreadContext,
        fixture: &FixtureRef,
        item_id: ItemId,
        status: Option<Status>,
    ) -> bool {
        self.with_fixture_owner(ctx, fixture, |_, _, owner| {
            let mut fp =
                Footprint::fixture(&fixture.name, fixture.scope, fixture.phase, item_id);
            if let Some(s) = status {
                fp.set_status(s);
            }
            owner.fixtures.push(fp);
        })
        .is_some()
    }

    fn trace_drop(&self, thread: &str, decision: &str, identity: &SuiteIdentity) {
        self.tracer.log(
            &TraceEvent::now(thread, decision).with_node(identity.location.key()),
        );
    }
}

/// Pop the context stack only when the just-closed item is actually the
/// innermost open one. A footprint finished out of band (an error-created
/// stand-in, a straggler swept at launch finish) was never pushed, and
/// popping for it would steal the parent's slot.
fn pop_if_top(ctx: &mut ThreadContext, closed: Option<ItemId>) {
    let Some(closed) = closed else {
        return;
    };
    if ctx.stack.top() == Some(&closed) {
        ctx.stack.clear_top();
    }
}
