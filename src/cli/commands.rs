use std::collections::BTreeMap;

use crate::cli::config::{AppConfig, build_launch_settings, build_policy};
use crate::model::event::LifecycleEvent;
use crate::report::backend::{BackendCall, RecordingBackend, ReportingBackend};
use crate::report::http::HttpBackend;
use crate::report::reporter::Reporter;
use crate::track::running::ThreadContext;
use crate::trace::logger::TraceLogger;

// ============================================================================
// replay subcommand
// ============================================================================

/// Replay a captured event stream through the full tracking pipeline.
/// Returns whether the backend stayed healthy for the whole replay.
pub fn cmd_replay(
    events_path: &str,
    dry_run: bool,
    launch_name: Option<&str>,
    config: &AppConfig,
    verbose: u8,
) -> Result<bool, Box<dyn std::error::Error>> {
    let events = load_events(events_path)?;

    if events.is_empty() {
        eprintln!("No events found in: {}", events_path);
        return Ok(true);
    }

    if verbose > 0 {
        eprintln!("Replaying {} events from {}...", events.len(), events_path);
    }

    let recording = if dry_run {
        Some(std::sync::Arc::new(RecordingBackend::new()))
    } else {
        None
    };

    let backend: Box<dyn ReportingBackend + Send + Sync> = match &recording {
        Some(rec) => Box::new(std::sync::Arc::clone(rec)),
        None => Box::new(HttpBackend::new(
            &config.server.endpoint,
            &config.server.project,
            config.server.api_token.as_deref(),
        )),
    };

    let tracer = match &config.trace.path {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };

    let reporter = Reporter::new(
        backend,
        build_policy(&config.policy),
        build_launch_settings(&config.launch, launch_name),
    )
    .with_tracer(tracer);

    let mut ctx = ThreadContext::new("replay-0");
    reporter.start_run(&ctx.thread);
    for event in &events {
        if verbose > 1 {
            eprintln!("  {}", event.label());
        }
        reporter.handle(&mut ctx, event);
    }
    reporter.finish_run(&ctx.thread);

    let healthy = !reporter.is_circuit_open();
    if !healthy {
        eprintln!("Warning: reporting stopped early; the backend went down mid-replay");
    }

    if let Some(rec) = &recording {
        print_dry_run_summary(&rec.calls());
    } else {
        println!("Replayed {} events", events.len());
    }

    Ok(healthy)
}

/// One call log line per backend call kind, with counts.
fn print_dry_run_summary(calls: &[BackendCall]) {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for call in calls {
        let label = match call {
            BackendCall::StartLaunch { .. } => "start_launch",
            BackendCall::FinishLaunch { .. } => "finish_launch",
            BackendCall::StartItem { .. } => "start_item",
            BackendCall::FinishItem { .. } => "finish_item",
            BackendCall::Log { .. } => "log",
        };
        *counts.entry(label).or_insert(0) += 1;
    }

    println!("Dry run: {} backend calls", calls.len());
    for (label, count) in counts {
        println!("  {:<14} {}", label, count);
    }
}

// ============================================================================
// validate subcommand
// ============================================================================

/// Parse a capture and report what it contains. Returns whether every
/// line parsed.
pub fn cmd_validate(events_path: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(events_path)?;

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut total = 0usize;
    let mut bad_lines = 0usize;

    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LifecycleEvent>(line) {
            Ok(event) => {
                total += 1;
                *counts.entry(event.label()).or_insert(0) += 1;
            }
            Err(e) => {
                bad_lines += 1;
                eprintln!("line {}: {}", lineno + 1, e);
            }
        }
    }

    println!("{} events, {} malformed lines", total, bad_lines);
    for (label, count) in counts {
        println!("  {:<20} {}", label, count);
    }

    Ok(bad_lines == 0)
}

// ============================================================================
// Helpers
// ============================================================================

/// Load a JSONL capture, failing with a line number on the first
/// malformed line.
pub fn load_events(path: &str) -> Result<Vec<LifecycleEvent>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let mut events = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event: LifecycleEvent = serde_json::from_str(line)
            .map_err(|e| format!("{}:{}: {}", path, lineno + 1, e))?;
        events.push(event);
    }
    Ok(events)
}
