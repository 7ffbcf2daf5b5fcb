//! Behavioural properties of the engine as seen through its public surface.

use econ_core::engine::Engine;
use econ_core::events::DO_NOTHING;
use econ_core::metrics::Grade;
use econ_core::policy::PolicyValue;
use econ_core::{EventKind, ResolveError, ScenarioConfig, SimConfig};

fn quiet(scenario: ScenarioConfig, seed: u64) -> Engine {
    Engine::with_config(scenario, SimConfig::without_random_events(), seed)
}

fn small() -> ScenarioConfig {
    ScenarioConfig::default().with_agents(80).with_businesses(8)
}

fn pending_id(engine: &Engine) -> u64 {
    engine
        .events()
        .pending()
        .map(|e| e.id)
        .expect("an event is pending")
}

#[test]
fn resolving_moves_event_to_active() {
    let mut engine = quiet(small(), 1);
    engine.force_shock(EventKind::Pandemic);
    let id = pending_id(&engine);

    engine.resolve_choice(id, "lockdown").expect("lockdown is offered");
    assert!(engine.events().pending().is_none());
    let active = &engine.events().active()[0];
    assert_eq!(active.id, id);
    assert_eq!(active.chosen.as_deref(), Some("lockdown"));
}

#[test]
fn mismatched_resolution_leaves_event_pending() {
    let mut engine = quiet(small(), 2);
    engine.force_shock(EventKind::Pandemic);
    let id = pending_id(&engine);
    let debt = engine.world().government.debt;

    let err = engine.resolve_choice(id + 7, "lockdown").unwrap_err();
    assert_eq!(err, ResolveError::NotPending(id + 7));
    assert!(engine.resolve_choice(id, "shrug").is_err());

    assert_eq!(pending_id(&engine), id);
    assert!(engine.events().active().is_empty());
    assert_eq!(engine.world().government.debt, debt);
}

#[test]
fn doing_nothing_schedules_no_follow_up() {
    let mut engine = quiet(small(), 3);
    engine.force_shock(EventKind::FinancialBubble);
    let id = pending_id(&engine);
    let rate = engine.world().policy.interest_rate;

    engine.resolve_choice(id, DO_NOTHING).unwrap();
    assert!(engine.events().scheduled().is_empty());
    assert_eq!(engine.world().policy.interest_rate, rate);
    assert!(engine.events().is_active(EventKind::FinancialBubble));
}

#[test]
fn follow_up_fires_at_its_offset() {
    let mut engine = quiet(small(), 4);
    engine.force_shock(EventKind::FinancialBubble);
    let id = pending_id(&engine);
    engine.resolve_choice(id, "let_it_ride").unwrap();

    let scheduled = engine.events().scheduled();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].kind, EventKind::BankRun);
    assert_eq!(scheduled[0].fire_at, 80);

    for _ in 0..79 {
        engine.step();
    }
    assert_eq!(engine.tick(), 79);
    assert!(!engine.events().is_live(EventKind::BankRun));

    engine.step();
    assert!(engine.events().is_live(EventKind::BankRun));
    assert!(engine.events().scheduled().is_empty());
}

#[test]
fn debt_forgiveness_clears_debts_once() {
    let mut engine = quiet(small(), 5);
    let ids: Vec<_> = engine.world().agents.keys().take(10).collect();
    for (i, id) in ids.iter().enumerate() {
        let a = &mut engine.world_mut().agents[*id];
        a.wealth = -100.0 * (i as f64 + 1.0);
    }

    engine
        .set_policy("debt_forgiveness", PolicyValue::Flag(true))
        .unwrap();
    assert_eq!(
        engine.world().policy.get("debt_forgiveness"),
        Some(PolicyValue::Flag(true))
    );
    engine.step();

    for a in engine.world().living_agents() {
        assert!(a.wealth >= 0.0, "wealth {} survived forgiveness", a.wealth);
        assert!(a.loans.is_empty());
    }
    assert_eq!(
        engine.world().policy.get("debt_forgiveness"),
        Some(PolicyValue::Flag(false))
    );
}

#[test]
fn grade_thresholds_are_inclusive() {
    for (score, grade) in [
        (100.0, Grade::APlus),
        (90.0, Grade::APlus),
        (89.999, Grade::A),
        (80.0, Grade::A),
        (70.0, Grade::B),
        (60.0, Grade::C),
        (45.0, Grade::D),
        (44.9, Grade::F),
        (0.0, Grade::F),
    ] {
        assert_eq!(Grade::from_score(score), grade, "score {}", score);
    }
}

#[test]
fn more_firms_produce_more() {
    let mean_gdp = |businesses: usize| {
        let scenario = ScenarioConfig::default()
            .with_agents(80)
            .with_businesses(businesses);
        let mut engine = quiet(scenario, 11);
        for _ in 0..100 {
            engine.step();
        }
        let history = engine.history();
        history.iter().map(|m| m.gdp).sum::<f64>() / history.len() as f64
    };
    let many = mean_gdp(20);
    let few = mean_gdp(3);
    assert!(many > few, "20 firms {} vs 3 firms {}", many, few);
}
