use launch_reporter::model::event::{FixturePhase, FixtureScope};
use launch_reporter::model::identity::ExampleKey;
use launch_reporter::model::status::Status;
use launch_reporter::track::footprint::{Footprint, ItemId, NodeKind};

// =========================================================================
// Status computation
// =========================================================================

#[test]
fn explicit_status_wins() {
    let mut fp = Footprint::example("login [0]", 0, ItemId::new("item-1"));
    fp.set_status(Status::Failed);
    assert_eq!(fp.calculate_status(), Some(Status::Failed));
}

#[test]
fn node_with_descendants_defers_to_server_aggregation() {
    let fp = Footprint::suite("Checkout", ItemId::new("item-1"));
    assert_eq!(fp.calculate_status(), None);

    let scenario = Footprint::scenario("pay", false);
    assert_eq!(scenario.calculate_status(), None);
}

#[test]
fn leaf_without_signal_defaults_to_passed() {
    let example = Footprint::example("login [0]", 0, ItemId::new("item-1"));
    assert_eq!(example.calculate_status(), Some(Status::Passed));

    let fixture = Footprint::fixture(
        "setup",
        FixtureScope::Example,
        FixturePhase::Setup,
        ItemId::new("item-2"),
    );
    assert_eq!(fixture.calculate_status(), Some(Status::Passed));
}

#[test]
fn published_record_rejects_status_signals() {
    let mut fp = Footprint::example("login [0]", 0, ItemId::new("item-1"));
    fp.published = true;

    assert!(!fp.set_status(Status::Failed));
    assert_eq!(fp.status, None);
    assert_eq!(fp.calculate_status(), Some(Status::Passed));
}

// =========================================================================
// Fixture bubbling predicate
// =========================================================================

#[test]
fn failed_setup_fixture_is_detected() {
    let mut example = Footprint::example("login [0]", 0, ItemId::new("item-1"));
    let mut setup = Footprint::fixture(
        "setup",
        FixtureScope::Example,
        FixturePhase::Setup,
        ItemId::new("item-2"),
    );
    setup.set_status(Status::Failed);
    example.fixtures.push(setup);

    assert!(example.has_failed_setup_fixture());
}

#[test]
fn failed_teardown_fixture_does_not_count() {
    let mut example = Footprint::example("login [0]", 0, ItemId::new("item-1"));
    let mut teardown = Footprint::fixture(
        "cleanup",
        FixtureScope::Example,
        FixturePhase::Teardown,
        ItemId::new("item-2"),
    );
    teardown.set_status(Status::Failed);
    example.fixtures.push(teardown);

    assert!(!example.has_failed_setup_fixture());
}

#[test]
fn passing_fixtures_do_not_trip_bubbling() {
    let mut example = Footprint::example("login [0]", 0, ItemId::new("item-1"));
    example.fixtures.push(Footprint::fixture(
        "setup",
        FixtureScope::Example,
        FixturePhase::Setup,
        ItemId::new("item-2"),
    ));

    assert!(!example.has_failed_setup_fixture());
}

// =========================================================================
// Tree lookups
// =========================================================================

fn suite_with_rows() -> Footprint {
    let mut suite = Footprint::suite("Checkout", ItemId::new("suite-1"));
    let mut scenario = Footprint::scenario("pay with card", false);
    scenario
        .children
        .push(Footprint::example("pay with card [0]", 0, ItemId::new("ex-0")));
    scenario
        .children
        .push(Footprint::example("pay with card [1]", 1, ItemId::new("ex-1")));
    suite.children.push(scenario);
    suite
}

#[test]
fn finds_scenario_and_example_rows() {
    let mut suite = suite_with_rows();

    assert!(suite.find_scenario("pay with card").is_some());
    assert!(suite.find_scenario("refund").is_none());

    let row = suite.find_example_mut("pay with card", 1).expect("row 1");
    assert_eq!(row.item_id, Some(ItemId::new("ex-1")));
    assert!(suite.find_example_mut("pay with card", 7).is_none());
}

#[test]
fn masked_example_is_found_by_missing_iteration() {
    let mut suite = Footprint::suite("Checkout", ItemId::new("suite-1"));
    let mut scenario = Footprint::scenario("pay with card", true);
    scenario
        .children
        .push(Footprint::masked_example("pay with card", ItemId::new("masked-1")));
    suite.children.push(scenario);

    let masked = suite
        .find_masked_example_mut("pay with card")
        .expect("masked stand-in");
    assert_eq!(masked.kind, NodeKind::Example);
    assert_eq!(masked.iteration, None);

    let by_key = suite
        .find_example_by_key_mut(&ExampleKey::masked("pay with card"))
        .expect("lookup by masked key");
    assert_eq!(by_key.item_id, Some(ItemId::new("masked-1")));
}

#[test]
fn example_key_lookup_distinguishes_rows_from_masked() {
    let mut suite = suite_with_rows();

    let row = suite
        .find_example_by_key_mut(&ExampleKey::row("pay with card", 0))
        .expect("row 0");
    assert_eq!(row.item_id, Some(ItemId::new("ex-0")));

    assert!(
        suite
            .find_example_by_key_mut(&ExampleKey::masked("pay with card"))
            .is_none()
    );
}

#[test]
fn open_fixture_lookup_skips_published_records() {
    let mut suite = Footprint::suite("Checkout", ItemId::new("suite-1"));
    let mut first = Footprint::fixture(
        "setup_all",
        FixtureScope::Suite,
        FixturePhase::Setup,
        ItemId::new("fx-1"),
    );
    first.published = true;
    suite.fixtures.push(first);
    suite.fixtures.push(Footprint::fixture(
        "setup_all",
        FixtureScope::Suite,
        FixturePhase::Setup,
        ItemId::new("fx-2"),
    ));

    let open = suite.find_open_fixture_mut("setup_all").expect("open record");
    assert_eq!(open.item_id, Some(ItemId::new("fx-2")));
}
