//! The event state machine.
//!
//! ```text
//!   trigger ──► pending ──resolve──► active ──duration──► expired
//!      │                                ▲
//!      └──── no choices ────────────────┘
//! ```
//!
//! A single pending slot holds the event awaiting a decision. Choice events
//! triggered while the slot is taken wait in a FIFO queue and are promoted
//! one at a time as decisions arrive. Follow-ups live in a separate schedule
//! of `(kind, fire_at)` pairs.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::error::ResolveError;
use crate::policy::PolicyEntry;
use crate::types::{Tick, finite_or};

use super::catalog::{EffectTable, EventCatalog, EventChoice, EventDefinition, EventKind};

// === INSTANCES ===

#[derive(Debug, Clone)]
pub struct EventInstance {
    pub id: u64,
    pub kind: EventKind,
    pub name: String,
    pub description: String,
    /// Trigger tick while pending; activation tick once active.
    pub started: Tick,
    /// Private copy of the template's effects, with any choice merged in.
    pub effects: EffectTable,
    pub choices: Vec<EventChoice>,
    pub chosen: Option<String>,
}

impl EventInstance {
    pub fn expired(&self, now: Tick) -> bool {
        self.effects.duration != 0 && now.saturating_sub(self.started) >= self.effects.duration
    }

    pub fn remaining(&self, now: Tick) -> Option<Tick> {
        if self.effects.duration == 0 {
            return None;
        }
        Some(
            self.effects
                .duration
                .saturating_sub(now.saturating_sub(self.started)),
        )
    }

    pub fn requires_choice(&self) -> bool {
        !self.choices.is_empty()
    }

    pub fn notice(&self) -> EventNotice {
        EventNotice {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            description: self.description.clone(),
            requires_choice: self.requires_choice(),
            choices: self
                .choices
                .iter()
                .map(|c| ChoiceView {
                    id: c.id.clone(),
                    label: c.label.clone(),
                })
                .collect(),
            tick: self.started,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEvent {
    pub kind: EventKind,
    pub fire_at: Tick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
pub struct ChoiceView {
    pub id: String,
    pub label: String,
}

/// Sent to the host when an event is generated or reaches the pending slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct EventNotice {
    pub id: u64,
    pub kind: EventKind,
    pub name: String,
    pub description: String,
    pub requires_choice: bool,
    pub choices: Vec<ChoiceView>,
    pub tick: Tick,
}

/// Effects the engine must apply once when an event becomes active.
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub id: u64,
    pub kind: EventKind,
    pub effects: EffectTable,
    pub policy: Vec<PolicyEntry>,
    pub debt_cost: f64,
}

#[derive(Debug, Clone, Default)]
pub struct EventStep {
    /// Newly generated events, choice-bearing or not.
    pub triggered: Vec<EventNotice>,
    pub activated: Vec<Activation>,
    pub expired: Vec<EventKind>,
}

impl EventStep {
    fn absorb(&mut self, other: EventStep) {
        self.triggered.extend(other.triggered);
        self.activated.extend(other.activated);
        self.expired.extend(other.expired);
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub activation: Activation,
    pub scheduled: Vec<ScheduledEvent>,
    /// Queued choice event moved into the pending slot.
    pub promoted: Option<EventNotice>,
}

// === LOTTERY ===

/// Macro conditions that tilt the lottery.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventPressure {
    pub gini: f64,
    pub unemployment: f64,
    /// Percent.
    pub inflation: f64,
    /// Percent.
    pub gdp_growth: f64,
    pub unrest: f64,
    pub interest_rate: f64,
    pub tariff: f64,
}

/// Lottery weight of a definition under current conditions.
pub fn lottery_weight(def: &EventDefinition, p: &EventPressure) -> f64 {
    let modifier = match def.kind {
        EventKind::FinancialBubble => {
            let easy_money = if p.interest_rate < 0.03 { 2.0 } else { 1.0 };
            (1.0 + 5.0 * (p.gini - 0.3).max(0.0)) * easy_money
        }
        EventKind::BankRun => 1.0 + if p.interest_rate > 0.1 { 1.0 } else { 0.0 },
        EventKind::TechBreakthrough => 1.0 + (p.gdp_growth / 10.0).clamp(0.0, 1.0),
        EventKind::EnergyCrisis => 1.0 + (p.inflation / 10.0).clamp(0.0, 2.0),
        EventKind::GeneralStrike => 1.0 + 5.0 * p.unemployment + 3.0 * p.unrest,
        EventKind::TradeWar => 1.0 + 3.0 * p.tariff,
        EventKind::Pandemic | EventKind::Drought => 1.0,
    };
    finite_or(def.weight * modifier, 0.0).max(0.0)
}

fn draw<R: Rng>(catalog: &EventCatalog, pressure: &EventPressure, rng: &mut R) -> Option<EventKind> {
    let weighted: Vec<(EventKind, f64)> = catalog
        .definitions()
        .map(|d| (d.kind, lottery_weight(d, pressure)))
        .filter(|(_, w)| *w > 0.0)
        .collect();
    let total: f64 = weighted.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return None;
    }
    let mut roll = rng.random::<f64>() * total;
    for (kind, w) in &weighted {
        if roll < *w {
            return Some(*kind);
        }
        roll -= w;
    }
    weighted.last().map(|(k, _)| *k)
}

/// Knobs for the random lottery.
#[derive(Debug, Clone, Copy)]
pub struct LotteryRules {
    pub base_probability: f64,
    pub cooldown: Tick,
}

// === SYSTEM ===

#[derive(Debug, Clone, Default)]
pub struct EventSystem {
    pending: Option<EventInstance>,
    queued: VecDeque<EventInstance>,
    active: Vec<EventInstance>,
    scheduled: Vec<ScheduledEvent>,
    last_trigger: Option<Tick>,
    next_id: u64,
}

impl EventSystem {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    pub fn pending(&self) -> Option<&EventInstance> {
        self.pending.as_ref()
    }

    pub fn queued(&self) -> impl Iterator<Item = &EventInstance> {
        self.queued.iter()
    }

    pub fn active(&self) -> &[EventInstance] {
        &self.active
    }

    pub fn scheduled(&self) -> &[ScheduledEvent] {
        &self.scheduled
    }

    pub fn last_trigger(&self) -> Option<Tick> {
        self.last_trigger
    }

    pub fn is_active(&self, kind: EventKind) -> bool {
        self.active.iter().any(|e| e.kind == kind)
    }

    /// Present in the pending slot, the queue or the active set.
    pub fn is_live(&self, kind: EventKind) -> bool {
        self.is_active(kind)
            || self.pending.as_ref().is_some_and(|e| e.kind == kind)
            || self.queued.iter().any(|e| e.kind == kind)
    }

    pub fn schedule(&mut self, kind: EventKind, fire_at: Tick) -> ScheduledEvent {
        let entry = ScheduledEvent { kind, fire_at };
        self.scheduled.push(entry);
        self.scheduled.sort_by_key(|s| s.fire_at);
        entry
    }

    /// Advance one tick: expire finished events, fire due follow-ups, then
    /// maybe draw from the lottery.
    pub fn tick<R: Rng>(
        &mut self,
        now: Tick,
        catalog: &EventCatalog,
        pressure: &EventPressure,
        rules: LotteryRules,
        rng: &mut R,
    ) -> EventStep {
        let mut step = EventStep::default();

        let expired = &mut step.expired;
        self.active.retain(|e| {
            if e.expired(now) {
                expired.push(e.kind);
                false
            } else {
                true
            }
        });

        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.scheduled)
            .into_iter()
            .partition(|s| s.fire_at <= now);
        self.scheduled = later;
        for s in due {
            let fired = self.trigger(s.kind, now, catalog);
            step.absorb(fired);
        }

        let cooled = self
            .last_trigger
            .is_none_or(|t| now.saturating_sub(t) >= rules.cooldown);
        if self.pending.is_none() && rules.base_probability > 0.0 && cooled {
            let p = rules.base_probability / (1.0 + self.active.len() as f64);
            if rng.random_bool(p.clamp(0.0, 1.0)) {
                if let Some(kind) = draw(catalog, pressure, rng) {
                    let fired = self.trigger(kind, now, catalog);
                    step.absorb(fired);
                }
            }
        }

        step
    }

    /// Generate an event of `kind` now, bypassing lottery and cooldown.
    /// Kinds missing from the catalog are ignored.
    pub fn trigger(&mut self, kind: EventKind, now: Tick, catalog: &EventCatalog) -> EventStep {
        let mut step = EventStep::default();
        let Some(def) = catalog.get(kind) else {
            return step;
        };
        let instance = EventInstance {
            id: self.next_id,
            kind,
            name: def.name.clone(),
            description: def.description.clone(),
            started: now,
            effects: def.effects.clone(),
            choices: def.choices_with_default(),
            chosen: None,
        };
        self.next_id += 1;
        self.last_trigger = Some(now);
        step.triggered.push(instance.notice());

        if instance.requires_choice() {
            if self.pending.is_none() {
                self.pending = Some(instance);
            } else {
                self.queued.push_back(instance);
            }
        } else {
            step.activated.push(Activation {
                id: instance.id,
                kind,
                effects: instance.effects.clone(),
                policy: Vec::new(),
                debt_cost: 0.0,
            });
            self.active.push(instance);
        }
        step
    }

    /// Resolve the pending event with one of its choices. On a mismatched
    /// event id or unknown choice nothing changes.
    pub fn resolve(&mut self, event_id: u64, choice_id: &str, now: Tick) -> Result<Resolution, ResolveError> {
        if !self.pending.as_ref().is_some_and(|p| p.id == event_id) {
            return Err(ResolveError::NotPending(event_id));
        }
        let Some(mut instance) = self.pending.take() else {
            return Err(ResolveError::NotPending(event_id));
        };
        let Some(choice) = instance.choices.iter().find(|c| c.id == choice_id).cloned() else {
            self.pending = Some(instance);
            return Err(ResolveError::UnknownChoice {
                event: event_id,
                choice: choice_id.to_string(),
            });
        };

        let mut scheduled = Vec::new();
        let mut policy = Vec::new();
        let mut debt_cost = 0.0;
        if !choice.is_do_nothing() {
            instance.effects.merge(&choice.overrides);
            policy = choice.policy.clone();
            debt_cost = choice.debt_cost.max(0.0);
            for f in &choice.follow_ups {
                scheduled.push(self.schedule(f.kind, now + f.offset));
            }
        }

        instance.started = now;
        instance.chosen = Some(choice.id.clone());
        let activation = Activation {
            id: instance.id,
            kind: instance.kind,
            effects: instance.effects.clone(),
            policy,
            debt_cost,
        };
        self.active.push(instance);

        self.pending = self.queued.pop_front();
        let promoted = self.pending.as_ref().map(EventInstance::notice);

        Ok(Resolution {
            activation,
            scheduled,
            promoted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::catalog::DO_NOTHING;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn quiet() -> LotteryRules {
        LotteryRules {
            base_probability: 0.0,
            cooldown: 0,
        }
    }

    #[test]
    fn choice_event_waits_in_pending() {
        let catalog = EventCatalog::standard();
        let mut events = EventSystem::new();
        let step = events.trigger(EventKind::FinancialBubble, 5, &catalog);
        assert_eq!(step.triggered.len(), 1);
        assert!(step.triggered[0].requires_choice);
        assert!(step.activated.is_empty());
        assert!(events.pending().is_some());
        assert!(events.active().is_empty());
    }

    #[test]
    fn no_choice_event_activates_immediately() {
        let catalog = EventCatalog::standard();
        let mut events = EventSystem::new();
        let step = events.trigger(EventKind::TechBreakthrough, 5, &catalog);
        assert_eq!(step.activated.len(), 1);
        assert!(events.pending().is_none());
        assert!(events.is_active(EventKind::TechBreakthrough));
    }

    #[test]
    fn unknown_kind_is_ignored() {
        let mut events = EventSystem::new();
        let step = events.trigger(EventKind::Drought, 5, &EventCatalog::empty());
        assert!(step.triggered.is_empty());
        assert!(events.pending().is_none());
    }

    #[test]
    fn resolve_moves_pending_to_active_with_overrides() {
        let catalog = EventCatalog::standard();
        let mut events = EventSystem::new();
        events.trigger(EventKind::FinancialBubble, 5, &catalog);
        let id = events.pending().unwrap().id;

        let res = events.resolve(id, "raise_rates", 7).unwrap();
        assert!(events.pending().is_none());
        let active = &events.active()[0];
        assert_eq!(active.effects.duration, 20);
        assert_eq!(active.started, 7);
        assert_eq!(res.activation.policy.len(), 1);
        // Template untouched
        assert_eq!(catalog.get(EventKind::FinancialBubble).unwrap().effects.duration, 40);
    }

    #[test]
    fn mismatched_resolution_is_noop() {
        let catalog = EventCatalog::standard();
        let mut events = EventSystem::new();
        events.trigger(EventKind::Pandemic, 5, &catalog);
        let id = events.pending().unwrap().id;

        assert_eq!(
            events.resolve(id + 1, "lockdown", 6).unwrap_err(),
            ResolveError::NotPending(id + 1)
        );
        assert!(matches!(
            events.resolve(id, "pray", 6),
            Err(ResolveError::UnknownChoice { .. })
        ));
        assert_eq!(events.pending().unwrap().id, id);
        assert!(events.active().is_empty());
    }

    #[test]
    fn do_nothing_schedules_nothing() {
        let catalog = EventCatalog::standard();
        let mut events = EventSystem::new();
        events.trigger(EventKind::FinancialBubble, 5, &catalog);
        let id = events.pending().unwrap().id;
        let res = events.resolve(id, DO_NOTHING, 5).unwrap();
        assert!(res.scheduled.is_empty());
        assert!(events.scheduled().is_empty());
        assert!(res.activation.policy.is_empty());
        assert_eq!(res.activation.effects, catalog.get(EventKind::FinancialBubble).unwrap().effects);
    }

    #[test]
    fn follow_up_fires_exactly_at_offset() {
        let catalog = EventCatalog::standard();
        let mut events = EventSystem::new();
        let mut rng = StdRng::seed_from_u64(1);
        events.trigger(EventKind::FinancialBubble, 10, &catalog);
        let id = events.pending().unwrap().id;
        events.resolve(id, "let_it_ride", 10).unwrap();
        assert_eq!(events.scheduled(), &[ScheduledEvent { kind: EventKind::BankRun, fire_at: 90 }]);

        for now in 11..90 {
            events.tick(now, &catalog, &EventPressure::default(), quiet(), &mut rng);
            assert!(!events.is_live(EventKind::BankRun), "fired early at {}", now);
        }
        let step = events.tick(90, &catalog, &EventPressure::default(), quiet(), &mut rng);
        assert_eq!(step.triggered[0].kind, EventKind::BankRun);
        assert!(events.is_live(EventKind::BankRun));
    }

    #[test]
    fn active_events_expire_after_duration() {
        let catalog = EventCatalog::standard();
        let mut events = EventSystem::new();
        let mut rng = StdRng::seed_from_u64(1);
        events.trigger(EventKind::TechBreakthrough, 0, &catalog);
        events.tick(59, &catalog, &EventPressure::default(), quiet(), &mut rng);
        assert!(events.is_active(EventKind::TechBreakthrough));
        let step = events.tick(60, &catalog, &EventPressure::default(), quiet(), &mut rng);
        assert_eq!(step.expired, vec![EventKind::TechBreakthrough]);
        assert!(events.active().is_empty());
    }

    #[test]
    fn zero_duration_is_permanent() {
        let json = r#"{"events":[{"kind":"drought","name":"Forever","effects":{"duration":0}}]}"#;
        let catalog = EventCatalog::from_json(json).unwrap();
        let mut events = EventSystem::new();
        let mut rng = StdRng::seed_from_u64(1);
        events.trigger(EventKind::Drought, 0, &catalog);
        events.tick(100_000, &catalog, &EventPressure::default(), quiet(), &mut rng);
        assert!(events.is_active(EventKind::Drought));
    }

    #[test]
    fn second_choice_event_queues_fifo() {
        let catalog = EventCatalog::standard();
        let mut events = EventSystem::new();
        events.trigger(EventKind::FinancialBubble, 1, &catalog);
        events.trigger(EventKind::Pandemic, 2, &catalog);
        events.trigger(EventKind::Drought, 3, &catalog);
        assert_eq!(events.pending().unwrap().kind, EventKind::FinancialBubble);
        assert_eq!(events.queued().count(), 2);

        let id = events.pending().unwrap().id;
        let res = events.resolve(id, DO_NOTHING, 4).unwrap();
        assert_eq!(res.promoted.unwrap().kind, EventKind::Pandemic);
        assert_eq!(events.pending().unwrap().kind, EventKind::Pandemic);
        assert_eq!(events.queued().count(), 1);
    }

    #[test]
    fn lottery_respects_cooldown_and_pending() {
        let catalog = EventCatalog::standard();
        let mut events = EventSystem::new();
        let mut rng = StdRng::seed_from_u64(9);
        let always = LotteryRules {
            base_probability: 1.0,
            cooldown: 10,
        };
        let step = events.tick(1, &catalog, &EventPressure::default(), always, &mut rng);
        assert_eq!(step.triggered.len(), 1);

        // Within cooldown nothing fires, whatever the probability
        for now in 2..11 {
            let step = events.tick(now, &catalog, &EventPressure::default(), always, &mut rng);
            assert!(step.triggered.is_empty());
        }
    }

    #[test]
    fn inequality_favors_bubbles() {
        let catalog = EventCatalog::standard();
        let def = catalog.get(EventKind::FinancialBubble).unwrap();
        let equal = lottery_weight(def, &EventPressure { gini: 0.2, interest_rate: 0.05, ..Default::default() });
        let unequal = lottery_weight(def, &EventPressure { gini: 0.7, interest_rate: 0.05, ..Default::default() });
        assert!(unequal > equal);
    }
}
