use serde::{Deserialize, Serialize};

// ============================================================================
// Node identity — stable keys derived from declared locations
// ============================================================================

/// Declared location of a suite: the namespace it lives in plus the source
/// file it is declared in. Two runs of the same code produce the same
/// location, which makes it a safe registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub namespace: String,
    pub source: String,
}

impl Location {
    pub fn new(namespace: &str, source: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            source: source.to_string(),
        }
    }

    /// Human-readable key, used in warnings and trace records.
    pub fn key(&self) -> String {
        format!("{}::{}", self.namespace, self.source)
    }

    /// Short stable fingerprint of this location.
    pub fn fingerprint(&self) -> String {
        short_fingerprint(&self.key())
    }
}

/// Identity of a suite: its own location plus the locations of its declared
/// base suites, nearest first. A suite inherited from another resolves
/// through the base chain when no exact registration exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteIdentity {
    pub location: Location,

    /// Base-suite locations, nearest ancestor first
    #[serde(default)]
    pub bases: Vec<Location>,
}

impl SuiteIdentity {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            bases: Vec::new(),
        }
    }

    pub fn with_bases(mut self, bases: Vec<Location>) -> Self {
        self.bases = bases;
        self
    }

    /// All candidate locations for lookup, in resolution order:
    /// the exact location first, then each base.
    pub fn candidates(&self) -> impl Iterator<Item = &Location> {
        std::iter::once(&self.location).chain(self.bases.iter())
    }
}

/// Exact key of one example run: which scenario it belongs to and which
/// data row produced it. A masked run has no row index — one synthetic
/// example stands in for the whole scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleKey {
    pub scenario: String,
    pub iteration: Option<usize>,
}

impl ExampleKey {
    pub fn row(scenario: &str, iteration: usize) -> Self {
        Self {
            scenario: scenario.to_string(),
            iteration: Some(iteration),
        }
    }

    pub fn masked(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            iteration: None,
        }
    }
}

/// Stable test-case id for one scenario (or one of its runs) under a
/// suite location. Sent with item-start requests so the server can match
/// history across launches.
pub fn case_fingerprint(location: &Location, case: &str) -> String {
    short_fingerprint(&format!("{}::{}", location.key(), case))
}

/// Short SHA-1 hex fingerprint of an arbitrary key string.
pub fn short_fingerprint(key: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}
