use crate::model::identity::{ExampleKey, Location};

/// Per-execution-thread record of which suite/scenario/example is
/// currently open. Mutated only as a side effect of registering a node as
/// running; consulted when an event must be attributed to "the current"
/// node.
#[derive(Debug, Clone, Default)]
pub struct RuntimePointer {
    /// Registered location of the currently-open suite
    pub current_suite: Option<Location>,

    /// Name of the currently-open scenario under `current_suite`
    pub current_scenario: Option<String>,

    /// Key of the currently-open example run
    pub current_example: Option<ExampleKey>,
}

impl RuntimePointer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point_to_suite(&mut self, suite: Location) {
        self.current_suite = Some(suite);
        self.current_scenario = None;
        self.current_example = None;
    }

    pub fn point_to_scenario(&mut self, scenario: &str) {
        self.current_scenario = Some(scenario.to_string());
        self.current_example = None;
    }

    pub fn point_to_example(&mut self, key: ExampleKey) {
        self.current_scenario = Some(key.scenario.clone());
        self.current_example = Some(key);
    }

    pub fn leave_scenario(&mut self) {
        self.current_scenario = None;
        self.current_example = None;
    }

    pub fn leave_example(&mut self) {
        self.current_example = None;
    }

    pub fn leave_suite(&mut self) {
        self.current_suite = None;
        self.current_scenario = None;
        self.current_example = None;
    }
}
