use launch_reporter::cli::commands::{cmd_replay, cmd_validate, load_events};
use launch_reporter::cli::config::AppConfig;
use launch_reporter::model::event::LifecycleEvent;

mod common;
use common::utils::{checkout_suite, example, scenario};

// =========================================================================
// Capture fixtures
// =========================================================================

fn capture_lines() -> Vec<String> {
    let sc = scenario("pay with card", true, true);
    let events = vec![
        LifecycleEvent::SuiteStarted {
            suite: checkout_suite(),
        },
        LifecycleEvent::ScenarioStarted {
            scenario: sc.clone(),
        },
        LifecycleEvent::ExampleStarted {
            example: example("pay with card", 0),
        },
        LifecycleEvent::ExampleFinished {
            example: example("pay with card", 0),
        },
        LifecycleEvent::ExampleStarted {
            example: example("pay with card", 1),
        },
        LifecycleEvent::ExampleFinished {
            example: example("pay with card", 1),
        },
        LifecycleEvent::ScenarioFinished { scenario: sc },
        LifecycleEvent::SuiteFinished {
            suite: checkout_suite(),
        },
    ];
    events
        .iter()
        .map(|e| serde_json::to_string(e).expect("serialize event"))
        .collect()
}

fn write_capture(name: &str, lines: &[String]) -> String {
    let path = std::env::temp_dir().join(format!(
        "launch-reporter-replay-{}-{}",
        std::process::id(),
        name
    ));
    std::fs::write(&path, lines.join("\n")).expect("write capture");
    path.to_string_lossy().to_string()
}

// =========================================================================
// load_events
// =========================================================================

#[test]
fn load_events_parses_a_full_capture() {
    let path = write_capture("load.jsonl", &capture_lines());

    let events = load_events(&path).expect("load capture");
    assert_eq!(events.len(), 8);
    assert_eq!(events[0].label(), "suite_started");
    assert_eq!(events[7].label(), "suite_finished");

    std::fs::remove_file(&path).ok();
}

#[test]
fn load_events_skips_blank_lines() {
    let mut lines = capture_lines();
    lines.insert(3, String::new());
    lines.push("   ".to_string());
    let path = write_capture("blanks.jsonl", &lines);

    let events = load_events(&path).expect("load capture");
    assert_eq!(events.len(), 8);

    std::fs::remove_file(&path).ok();
}

#[test]
fn load_events_reports_the_malformed_line_number() {
    let mut lines = capture_lines();
    lines.insert(2, "{\"event\": \"no_such_event\"}".to_string());
    let path = write_capture("bad.jsonl", &lines);

    let err = load_events(&path).expect_err("malformed capture must fail");
    assert!(err.to_string().contains(":3:"), "got: {}", err);

    std::fs::remove_file(&path).ok();
}

// =========================================================================
// replay / validate commands
// =========================================================================

#[test]
fn dry_run_replay_stays_healthy_on_a_clean_capture() {
    let path = write_capture("replay.jsonl", &capture_lines());

    let healthy = cmd_replay(&path, true, Some("replay check"), &AppConfig::default(), 0)
        .expect("replay runs");
    assert!(healthy);

    std::fs::remove_file(&path).ok();
}

#[test]
fn replay_of_an_empty_capture_is_a_no_op() {
    let path = write_capture("empty.jsonl", &[]);

    let healthy =
        cmd_replay(&path, true, None, &AppConfig::default(), 0).expect("replay runs");
    assert!(healthy);

    std::fs::remove_file(&path).ok();
}

#[test]
fn validate_accepts_a_clean_capture() {
    let path = write_capture("validate.jsonl", &capture_lines());

    let clean = cmd_validate(&path).expect("validate runs");
    assert!(clean);

    std::fs::remove_file(&path).ok();
}

#[test]
fn validate_flags_malformed_lines_without_failing() {
    let mut lines = capture_lines();
    lines.push("not json".to_string());
    let path = write_capture("invalid.jsonl", &lines);

    let clean = cmd_validate(&path).expect("validate runs");
    assert!(!clean);

    std::fs::remove_file(&path).ok();
}

#[test]
fn missing_capture_file_is_an_error() {
    assert!(load_events("/nonexistent/capture.jsonl").is_err());
    assert!(cmd_validate("/nonexistent/capture.jsonl").is_err());
}
