#![cfg(feature = "instrument")]
//! Structured rows captured through the dataframe subscriber.

use econ_core::engine::Engine;
use econ_core::{EventKind, ScenarioConfig, SimConfig};

fn instrumented_run(steps: usize) -> instrument::Recorder {
    instrument::install_subscriber();
    instrument::clear();

    let mut engine = Engine::with_config(
        ScenarioConfig::default().with_agents(120).with_businesses(10),
        SimConfig::without_random_events(),
        17,
    );
    engine.force_shock(EventKind::TechBreakthrough);
    for _ in 0..steps {
        engine.step();
    }
    instrument::drain()
}

#[test]
fn metrics_rows_follow_cadence() {
    let rec = instrumented_run(100);
    assert_eq!(rec.rows("metrics"), 20);

    let ticks = rec.column_f64("metrics", "tick");
    assert_eq!(ticks.first(), Some(&5.0));
    assert_eq!(ticks.last(), Some(&100.0));
    for u in rec.column_f64("metrics", "unemployment") {
        assert!((0.0..=1.0).contains(&u));
    }
    for g in rec.column_f64("metrics", "gini") {
        assert!((0.0..=1.0).contains(&g));
    }
}

#[test]
fn hires_and_events_are_recorded() {
    let rec = instrumented_run(60);
    assert!(rec.rows("hire") > 0, "no hires in 60 ticks");
    assert!(rec.column_f64("hire", "wage").iter().all(|w| *w > 0.0));

    let phases = rec.column_str("event", "phase");
    let kinds = rec.column_str("event", "kind");
    assert_eq!(phases.first().map(String::as_str), Some("triggered"));
    assert_eq!(kinds.first().map(String::as_str), Some("tech_breakthrough"));
    // Sixty ticks is exactly its duration
    assert!(phases.iter().any(|p| p == "expired"));
}

#[test]
fn rows_convert_to_dataframes() {
    let rec = instrumented_run(50);
    let dfs = rec.to_dataframes();
    let metrics = dfs.get("metrics").expect("metrics table");
    assert_eq!(metrics.height(), 10);
    let gdp: f64 = metrics
        .column("gdp")
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .sum();
    assert!(gdp > 0.0);
}
