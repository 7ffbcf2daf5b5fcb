//! Built-in scenarios, custom scenario loading and end-of-run scoring.

use econ_core::engine::Engine;
use econ_core::events::DO_NOTHING;
use econ_core::metrics::{Grade, PASSING_SCORE};
use econ_core::{
    Command, EventKind, Halt, Notification, ScenarioConfig, ScenarioError, SimConfig,
};

fn decline_pending(engine: &mut Engine) {
    if let Some(id) = engine.events().pending().map(|e| e.id) {
        engine.resolve_choice(id, DO_NOTHING).unwrap();
    }
}

#[test]
fn builtins_are_distinct() {
    let ids = ["sandbox", "great_depression", "gilded_age", "stagflation"];
    for id in ids {
        let s = ScenarioConfig::builtin(id).unwrap_or_else(|| panic!("missing {}", id));
        assert_eq!(s.id, id);
        assert!(s.agents > 0);
    }
    assert!(ScenarioConfig::builtin("atlantis").is_none());
    assert_eq!(ScenarioConfig::lookup("sandbox").duration, 0);
    assert_eq!(ScenarioConfig::lookup("gilded_age").duration, 780);
    assert_eq!(ScenarioConfig::lookup("great_depression").start_year, 1929);
}

#[test]
fn depression_opens_with_a_bank_run() {
    let scenario = ScenarioConfig::lookup("great_depression")
        .with_agents(80)
        .with_businesses(8);
    let mut engine = Engine::with_config(scenario, SimConfig::without_random_events(), 1);
    assert_eq!(engine.world().policy.tariff, 0.4);
    assert_eq!(engine.snapshot().year, 1929);

    for _ in 0..4 {
        engine.step();
    }
    assert!(engine.events().pending().is_none());
    engine.step();
    assert_eq!(
        engine.events().pending().map(|e| e.kind),
        Some(EventKind::BankRun)
    );
    assert_eq!(engine.halt(), Some(Halt::AwaitingChoice));
}

#[test]
fn stagflation_opens_with_an_energy_crisis() {
    let scenario = ScenarioConfig::lookup("stagflation")
        .with_agents(80)
        .with_businesses(8);
    let mut engine = Engine::with_config(scenario, SimConfig::without_random_events(), 2);
    engine.step();
    assert!(engine.events().is_active(EventKind::EnergyCrisis));
    assert!(engine.halt().is_none());
}

#[test]
fn finished_run_is_scored() {
    let scenario = ScenarioConfig::lookup("great_depression")
        .with_agents(80)
        .with_businesses(8)
        .with_duration(60);
    let mut engine = Engine::with_config(scenario, SimConfig::without_random_events(), 3);
    while !engine.is_complete() {
        decline_pending(&mut engine);
        engine.step();
        assert!(engine.tick() <= 60, "run did not complete on time");
    }
    assert_eq!(engine.tick(), 60);

    let report = engine.report().cloned().expect("report");
    assert_eq!(report.scenario, "great_depression");
    assert!((0.0..=100.0).contains(&report.score));
    assert_eq!(report.grade, Grade::from_score(report.score));
    assert!(report.verdict.is_some());
    if report.beat_history {
        assert!(report.score >= PASSING_SCORE);
    }
    assert_eq!(report.final_metrics.tick, 60);

    let notes = engine.drain_notifications();
    let completions: Vec<_> = notes
        .iter()
        .filter_map(|n| match n {
            Notification::ScenarioComplete(r) => Some(r),
            _ => None,
        })
        .collect();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0], &report);
    assert_eq!(engine.snapshot().report, Some(report));
}

#[test]
fn long_run_scores_growth_from_first_sample() {
    let scenario = ScenarioConfig::default()
        .with_agents(60)
        .with_businesses(6)
        .with_duration(1500);
    let mut engine = Engine::with_config(scenario, SimConfig::without_random_events(), 6);
    while !engine.is_complete() {
        decline_pending(&mut engine);
        engine.step();
    }

    // The history ring has long since dropped the first sample
    assert_eq!(engine.history().len(), 240);
    assert!(engine.history().iter().next().map(|m| m.tick) > Some(5));

    let baseline = engine.baseline().cloned().expect("baseline sample");
    assert_eq!(baseline.tick, 5);
    let report = engine.report().cloned().expect("report");
    assert_eq!(report.baseline_tick, 5);
    if baseline.gdp > 0.0 {
        let expected = (report.final_metrics.gdp / baseline.gdp - 1.0) * 100.0;
        assert!((report.gdp_growth_total - expected).abs() < 1e-9);
    }
}

#[test]
fn custom_scenario_from_json() {
    let json = r#"{
        "id": "island",
        "name": "Island Economy",
        "agents": 40,
        "businesses": 4,
        "duration": 30,
        "policy": [{"lever": "ubi", "value": 20}]
    }"#;
    let scenario = ScenarioConfig::from_json(json).unwrap();
    assert_eq!(scenario.id, "island");
    assert_eq!(scenario.agents, 40);
    assert_eq!(scenario.banks, ScenarioConfig::default().banks);

    let engine = Engine::with_config(scenario, SimConfig::without_random_events(), 4);
    assert_eq!(engine.world().policy.ubi, 20.0);
    assert_eq!(engine.world().population(), 40);
    assert_eq!(engine.world().businesses.len(), 4);
}

#[test]
fn malformed_scenarios_are_rejected() {
    assert!(matches!(
        ScenarioConfig::from_json(r#"{"id":"ghost","agents":0}"#),
        Err(ScenarioError::Empty { .. })
    ));
    assert!(ScenarioConfig::from_json("[1, 2").is_err());
}

#[test]
fn reset_command_switches_scenario() {
    let mut engine = Engine::with_config(
        ScenarioConfig::default().with_agents(60).with_businesses(6),
        SimConfig::without_random_events(),
        5,
    );
    for _ in 0..10 {
        engine.step();
    }
    engine.handle_json(r#"{"type":"RESET","scenario":"stagflation","seed":99}"#);
    assert_eq!(engine.tick(), 0);
    assert_eq!(engine.seed(), 99);
    assert_eq!(engine.scenario().id, "stagflation");
    let scheduled = engine.events().scheduled();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].kind, EventKind::EnergyCrisis);
    assert_eq!(scheduled[0].fire_at, 1);

    engine.handle(Command::Reset {
        scenario: None,
        seed: None,
    });
    assert_eq!(engine.scenario().id, "stagflation");
    assert_eq!(engine.seed(), 99);
}
