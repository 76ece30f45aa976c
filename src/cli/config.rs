use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::model::status::LaunchMode;
use crate::report::backend::Attribute;
use crate::report::reporter::{LaunchSettings, ReportingPolicy};

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "launch-reporter",
    version,
    about = "Streams test lifecycle events to a reporting server"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reporting server endpoint
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Reporting server project slug
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// API token for the reporting server
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Path to config file (default: launch-reporter.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a captured JSONL event stream into the reporting pipeline
    Replay {
        /// Path to the JSONL capture file
        #[arg(long)]
        events: String,

        /// Record backend calls in memory instead of sending them
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Launch name override
        #[arg(long)]
        launch_name: Option<String>,
    },

    /// Parse and sanity-check a JSONL capture without reporting
    Validate {
        /// Path to the JSONL capture file
        #[arg(long)]
        events: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `launch-reporter.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_project")]
    pub project: String,

    pub api_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            project: "default".to_string(),
            api_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    #[serde(default = "default_launch_name")]
    pub name: String,

    pub description: Option<String>,

    /// key:value attribute pairs shown on the launch page
    #[serde(default)]
    pub attributes: Vec<AttributePair>,

    #[serde(default)]
    pub mode: LaunchMode,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            name: "test run".to_string(),
            description: None,
            attributes: Vec::new(),
            mode: LaunchMode::Default,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributePair {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub report_iterations: bool,

    #[serde(default)]
    pub skipped_is_issue: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            report_iterations: true,
            skipped_is_issue: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraceConfig {
    /// JSONL trace file; tracing is off when unset
    pub path: Option<String>,
}

// Serde default helpers
fn default_endpoint() -> String { "http://localhost:8080".to_string() }
fn default_project() -> String { "default".to_string() }
fn default_launch_name() -> String { "test run".to_string() }
fn default_true() -> bool { true }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("launch-reporter.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Build the orchestrator policy from resolved config values.
pub fn build_policy(config: &PolicyConfig) -> ReportingPolicy {
    ReportingPolicy {
        enabled: config.enabled,
        report_iterations: config.report_iterations,
        skipped_is_issue: config.skipped_is_issue,
    }
}

/// Build the launch settings from resolved CLI/config values.
pub fn build_launch_settings(config: &LaunchConfig, name_override: Option<&str>) -> LaunchSettings {
    LaunchSettings {
        name: name_override.unwrap_or(&config.name).to_string(),
        description: config.description.clone(),
        attributes: config
            .attributes
            .iter()
            .map(|a| Attribute::new(&a.key, &a.value))
            .collect(),
        mode: config.mode,
    }
}
