//! The step pipeline and the host-facing command surface.
//!
//! One call to [`Engine::step`] runs every phase in a fixed order:
//!
//! ```text
//! agents → businesses → labor (every N) → market → policy → events
//!        → lifecycle (every N) → metrics (every N) → insights → scoring
//! ```

pub mod lifecycle;
pub mod pacer;

pub use lifecycle::*;
pub use pacer::*;

use std::collections::VecDeque;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::agents::{AgentContext, choose_lender, credit_limit};
use crate::command::{Command, Notification};
use crate::config::SimConfig;
use crate::error::{PolicyError, ResolveError};
use crate::events::{
    Activation, EventCatalog, EventInstance, EventKind, EventPressure, EventShocks, EventStep,
    EventSystem, LotteryRules, apply_immediate, apply_ongoing,
};
use crate::labor::{LaborAsk, LaborBid, ReservationWageModel, clear_labor_market};
use crate::market::PriceInputs;
use crate::metrics::{
    InsightTracker, Metrics, MetricsHistory, ScoreReport, assign_classes, score_run,
};
use crate::policy::{PolicyValue, apply_policy_effects};
use crate::production::{BusinessContext, Workforce, recompute_dominance, top_dominance};
use crate::scenario::ScenarioConfig;
use crate::snapshot::{ActiveEventView, AgentView, BusinessView, GlobalView, Snapshot};
#[cfg(feature = "instrument")]
use crate::types::KeyToU64;
use crate::types::{AgentId, EmploymentState, PerSector, Sector, Tick, finite_or};
use crate::world::World;

/// Undrained notifications kept before the oldest are dropped.
pub const MAX_QUEUED_NOTIFICATIONS: usize = 512;

pub struct Engine {
    config: SimConfig,
    scenario: ScenarioConfig,
    catalog: EventCatalog,
    reservation: ReservationWageModel,
    seed: u64,
    rng: StdRng,
    world: World,
    events: EventSystem,
    /// Latest sample, also available before the first metrics tick.
    current: Metrics,
    history: MetricsHistory,
    /// First sample of the run; total growth is scored against it.
    baseline: Option<Metrics>,
    insights: InsightTracker,
    pacer: Pacer,
    notifications: VecDeque<Notification>,
    report: Option<ScoreReport>,
}

impl Engine {
    pub fn new(scenario: ScenarioConfig, seed: u64) -> Self {
        Self::with_config(scenario, SimConfig::default(), seed)
    }

    pub fn with_config(scenario: ScenarioConfig, config: SimConfig, seed: u64) -> Self {
        let pacer = Pacer::new(config.base_steps_per_second, config.max_steps_per_frame);
        let mut engine = Self {
            history: MetricsHistory::new(config.history_len),
            config,
            scenario,
            catalog: EventCatalog::standard(),
            reservation: ReservationWageModel::default(),
            seed,
            rng: StdRng::seed_from_u64(seed),
            world: World::new(),
            events: EventSystem::new(),
            current: Metrics::default(),
            baseline: None,
            insights: InsightTracker::new(),
            pacer,
            notifications: VecDeque::new(),
            report: None,
        };
        engine.reset(None, None);
        engine
    }

    /// Replace the event templates. Takes effect for events triggered from now on.
    pub fn with_catalog(mut self, catalog: EventCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_reservation_model(mut self, model: ReservationWageModel) -> Self {
        self.reservation = model;
        self
    }

    /// Rebuild everything from the scenario. `None` keeps the current
    /// scenario or seed. Speed survives a reset; pause does not.
    pub fn reset(&mut self, scenario: Option<ScenarioConfig>, seed: Option<u64>) {
        if let Some(scenario) = scenario {
            self.scenario = scenario;
        }
        if let Some(seed) = seed {
            self.seed = seed;
        }
        self.rng = StdRng::seed_from_u64(self.seed);
        self.world = self.scenario.build_world(&self.config, &mut self.rng);
        self.events = EventSystem::new();
        for f in &self.scenario.opening_events {
            self.events.schedule(f.kind, self.world.tick + f.offset);
        }
        self.history = MetricsHistory::new(self.config.history_len);
        self.baseline = None;
        self.insights = InsightTracker::new();
        self.report = None;
        self.notifications.clear();
        self.pacer.resume();

        recompute_dominance(&mut self.world.businesses);
        assign_classes(&mut self.world.agents);
        self.current = Metrics::compute(&self.world, &self.history, &self.config);

        tracing::debug!(
            "reset `{}` seed {}: {} agents, {} businesses",
            self.scenario.id,
            self.seed,
            self.world.population(),
            self.world.businesses.len()
        );
    }

    // ========================================================================
    // Step pipeline
    // ========================================================================

    /// Advance exactly one tick, regardless of pause or pending choices.
    pub fn step(&mut self) {
        self.world.tick += 1;
        let tick = self.world.tick;

        let demand = self.agent_phase();
        let supply = self.business_phase();
        if every(tick, self.config.labor_interval) {
            self.labor_phase();
        }
        self.market_phase(&supply, &demand);
        self.policy_phase();
        self.event_phase();
        if is_lifecycle_tick(tick, &self.config) {
            let report = run_lifecycle(&mut self.world, &self.config, &mut self.rng);
            tracing::debug!(tick, ?report, "lifecycle");
        }
        if every(tick, self.config.metrics_interval) {
            self.sample_metrics();
        }
        if every(tick, self.config.snapshot_interval) {
            let snapshot = self.snapshot();
            self.notify(Notification::State(Box::new(snapshot)));
        }
        self.check_completion();
    }

    /// Run the steps due after `elapsed_ms` of wall-clock time. Stops early
    /// when a choice event appears or the scenario completes.
    pub fn frame(&mut self, elapsed_ms: f64) -> u32 {
        let due = self.pacer.due(elapsed_ms, self.halt());
        let mut ran = 0;
        for _ in 0..due {
            if self.halt().is_some() {
                break;
            }
            self.step();
            ran += 1;
        }
        ran
    }

    /// Why automatic advancement is stopped, if it is.
    pub fn halt(&self) -> Option<Halt> {
        if self.pacer.paused {
            Some(Halt::Paused)
        } else if self.events.pending().is_some() {
            Some(Halt::AwaitingChoice)
        } else if self.is_complete() {
            Some(Halt::Complete)
        } else {
            None
        }
    }

    // === Agents ===

    /// Tick every agent; returns units demanded per sector.
    fn agent_phase(&mut self) -> PerSector<f64> {
        let World {
            tick,
            agents,
            businesses,
            banks,
            market,
            policy,
            ..
        } = &mut self.world;
        let tick = *tick;
        let cap = self.config.life_log_cap;
        let ctx = AgentContext {
            tick,
            config: &self.config,
            policy,
            market,
        };

        let mut demand = PerSector::splat(0.0);
        for agent in agents.values_mut() {
            let out = agent.tick(&ctx, &mut self.rng);
            for s in Sector::ALL {
                demand.add(s, out.consumption.get(s));
            }
            for (bank, amount) in out.repayments {
                if let Some(b) = banks.iter_mut().find(|b| b.id == bank) {
                    b.receive(amount);
                }
            }
            if let Some(b) = out.left_job.and_then(|b| businesses.get_mut(b)) {
                b.employees.remove(&agent.id);
            }
            if let Some(wanted) = out.wants_credit {
                let amount = wanted.min(credit_limit(agent.credit_score));
                if amount <= 0.0 {
                    continue;
                }
                if let Some(loan) = choose_lender(banks, amount).and_then(|i| banks[i].lend(amount)) {
                    agent.borrow(loan, tick, cap);
                }
            }
        }
        demand
    }

    // === Businesses ===

    /// Tick every business; returns units produced per sector.
    fn business_phase(&mut self) -> PerSector<f64> {
        let World {
            tick,
            agents,
            businesses,
            market,
            policy,
            shocks,
            labor_slack,
            ..
        } = &mut self.world;
        let tick = *tick;
        let cap = self.config.life_log_cap;
        let ctx = BusinessContext {
            config: &self.config,
            policy,
            market,
            productivity_shock: &shocks.productivity,
            labor_slack: *labor_slack,
        };

        let mut supply = PerSector::splat(0.0);
        for b in businesses.values_mut() {
            let staff: Vec<(AgentId, f64)> = b
                .employees
                .iter()
                .filter_map(|&e| agents.get(e).map(|a| (e, a)))
                .filter(|(_, a)| a.employment == EmploymentState::Working)
                .map(|(e, a)| (e, a.skill))
                .collect();
            let mut workforce = Workforce::default();
            for &(_, skill) in &staff {
                workforce.add_worker(skill);
            }

            let out = b.tick(&ctx, &workforce);
            supply.add(b.sector, b.output);

            for &(e, _) in &staff {
                if let Some(a) = agents.get_mut(e) {
                    a.wage = b.wage_offered;
                }
            }

            // Least skilled go first
            if out.layoffs > 0 {
                let mut by_skill = staff.clone();
                by_skill.sort_by(|x, y| x.1.total_cmp(&y.1).then_with(|| x.0.cmp(&y.0)));
                for (e, _) in by_skill.into_iter().take(out.layoffs) {
                    b.employees.remove(&e);
                    if let Some(a) = agents.get_mut(e) {
                        a.separate(tick, "laid off", cap);
                    }
                }
            }

            if out.dividend > 0.0 {
                if let Some(owner) = b.owner.and_then(|o| agents.get_mut(o)) {
                    if owner.alive() {
                        owner.wealth += out.dividend;
                    }
                }
            }
        }
        supply
    }

    // === Labor ===

    fn labor_phase(&mut self) {
        let tick = self.world.tick;
        let benefit = self.world.policy.unemployment_benefit;

        let bids: Vec<LaborBid> = self
            .world
            .businesses
            .iter()
            .filter(|(_, b)| b.alive && b.capital > 0.0 && b.open_positions() > 0)
            .map(|(id, b)| LaborBid {
                business: id,
                wage: b.wage_offered,
                slots: b.open_positions(),
            })
            .collect();
        let asks: Vec<LaborAsk> = self
            .world
            .job_seekers()
            .into_iter()
            .filter_map(|id| self.world.agents.get(id).map(|a| (id, a)))
            .map(|(id, a)| {
                let full = self.reservation.reservation_wage(a.skill, a.education, benefit);
                LaborAsk {
                    agent: id,
                    seq: a.seq,
                    skill: a.skill,
                    reservation: self.reservation.discounted(full, a.unemployed_ticks),
                }
            })
            .collect();

        let result = clear_labor_market(bids, asks);
        for hire in &result.hires {
            if !self
                .world
                .employ(hire.agent, hire.business, hire.wage, self.config.life_log_cap)
            {
                continue;
            }

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "hire",
                tick = tick,
                agent_id = hire.agent.to_u64(),
                business_id = hire.business.to_u64(),
                wage = hire.wage,
            );
        }

        let working = self
            .world
            .living_agents()
            .filter(|a| a.employment == EmploymentState::Working)
            .count();
        let pool = working + result.unmatched;
        self.world.labor_slack = if pool == 0 {
            0.0
        } else {
            result.unmatched as f64 / pool as f64
        };
        tracing::debug!(
            tick,
            hires = result.hires.len(),
            unfilled = result.unfilled,
            unmatched = result.unmatched,
            "labor cleared"
        );
    }

    // === Market ===

    fn market_phase(&mut self, supply: &PerSector<f64>, demand: &PerSector<f64>) {
        let w = &mut self.world;
        let printing = 1.0 + w.policy.money_printing.max(0.0);
        let tariff = w.policy.tariff.max(0.0);

        let mut inputs = PriceInputs::new();
        for s in Sector::ALL {
            let imports = w.global.imports.get(s);
            let total = supply.get(s) + imports;
            let import_share = if total > 0.0 { imports / total } else { 0.0 };
            inputs.supply.set(s, total);
            inputs.demand.set(s, demand.get(s) * printing * w.shocks.demand.get(s));
            inputs
                .pressure
                .set(s, w.shocks.price.get(s) * (1.0 + tariff * import_share));
        }
        w.market.update(&inputs, w.policy.price_controls, &self.config);
        w.global
            .update(w.tick, &w.market, &w.policy, self.config.history_len);
    }

    // === Policy ===

    fn policy_phase(&mut self) {
        let w = &mut self.world;
        let summary = apply_policy_effects(
            &mut w.agents,
            &mut w.businesses,
            &mut w.banks,
            &mut w.government,
            &mut w.policy,
            &self.config,
            w.tick,
            w.global.tariff_revenue,
        );
        if !summary.applied.is_empty() {
            tracing::debug!(tick = w.tick, applied = ?summary.applied, forgiven = summary.forgiven, "one-shot levers fired");
        }
    }

    // === Events ===

    fn event_phase(&mut self) {
        let tick = self.world.tick;
        let pressure = EventPressure {
            gini: self.current.gini,
            unemployment: self.current.unemployment,
            inflation: self.current.inflation,
            gdp_growth: self.current.gdp_growth,
            unrest: self.current.unrest,
            interest_rate: self.world.policy.interest_rate,
            tariff: self.world.policy.tariff,
        };
        let rules = LotteryRules {
            base_probability: self.config.event_base_probability,
            cooldown: self.config.event_cooldown,
        };
        let step = self
            .events
            .tick(tick, &self.catalog, &pressure, rules, &mut self.rng);
        self.absorb(step);

        let outcome = apply_ongoing(&mut self.world, self.events.active(), &self.config, &mut self.rng);
        if !outcome.layoffs.is_empty() || !outcome.deaths.is_empty() {
            tracing::debug!(
                tick,
                layoffs = outcome.layoffs.len(),
                deaths = outcome.deaths.len(),
                "event attrition"
            );
        }
        self.world.shocks = EventShocks::from_active(self.events.active());
    }

    fn absorb(&mut self, step: EventStep) {
        let tick = self.world.tick;
        for notice in step.triggered {
            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "event",
                tick = tick,
                event_id = notice.id,
                kind = notice.kind.name(),
                phase = "triggered",
                requires_choice = notice.requires_choice,
            );
            self.notify(Notification::Event(notice));
        }
        for activation in step.activated {
            self.activate(activation);
        }
        for kind in step.expired {
            #[cfg(feature = "instrument")]
            tracing::info!(target: "event", tick = tick, kind = kind.name(), phase = "expired");
            tracing::debug!(tick, "{} ended", kind.name());
        }
    }

    /// Policy overrides and the debt penalty land before the immediate effects.
    fn activate(&mut self, activation: Activation) {
        for entry in &activation.policy {
            if let Err(err) = self.world.policy.set(&entry.lever, entry.value) {
                tracing::warn!("event {}: {}", activation.id, err);
            }
        }
        self.world.government.add_debt(activation.debt_cost);
        apply_immediate(&mut self.world, &activation.effects, &self.config);
        self.world.shocks = EventShocks::from_active(self.events.active());
    }

    // === Metrics, insights, scoring ===

    fn sample_metrics(&mut self) {
        assign_classes(&mut self.world.agents);
        let m = Metrics::compute(&self.world, &self.history, &self.config);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "metrics",
            tick = m.tick,
            unemployment = m.unemployment,
            gini = m.gini,
            gdp = m.gdp,
            gdp_growth = m.gdp_growth,
            cpi = m.cpi,
            inflation = m.inflation,
            poverty_rate = m.poverty_rate,
            crime_rate = m.crime_rate,
            government_debt = m.government_debt,
            budget = m.budget,
            population = m.population as u64,
            business_count = m.business_count as u64,
            avg_wage = m.avg_wage,
        );

        if self.baseline.is_none() {
            self.baseline = Some(m.clone());
        }
        self.history.push(m.clone());
        self.current = m;

        let dominance = top_dominance(&self.world.businesses);
        if let Some(insight) = self
            .insights
            .check(&self.current, dominance, self.config.insight_cooldown)
        {
            #[cfg(feature = "instrument")]
            tracing::info!(target: "insight", tick = insight.tick, id = ?insight.id);
            self.notify(Notification::Insight(insight));
        }
    }

    fn check_completion(&mut self) {
        let tick = self.world.tick;
        let duration = self.scenario.duration;
        if duration == 0 || tick < duration || self.report.is_some() {
            return;
        }
        if self.history.latest().is_none_or(|m| m.tick != tick) {
            self.sample_metrics();
        }
        let (Some(baseline), Some(latest)) = (self.baseline.as_ref(), self.history.latest()) else {
            return;
        };
        let report = score_run(
            &self.scenario.id,
            baseline,
            latest,
            &self.scenario.weights,
            self.scenario.record.as_ref(),
        );
        tracing::debug!(tick, score = report.score, grade = report.grade.label(), "scenario complete");
        self.report = Some(report.clone());
        self.notify(Notification::ScenarioComplete(report));
    }

    /// Fresh metrics for the current state without recording a sample.
    pub fn measure(&self) -> Metrics {
        Metrics::compute(&self.world, &self.history, &self.config)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Apply a host command. Invalid commands are logged and ignored.
    pub fn handle(&mut self, command: Command) {
        match command {
            Command::SetPolicy { policy, value } => {
                if let Err(err) = self.set_policy(&policy, value) {
                    tracing::warn!("SET_POLICY ignored: {}", err);
                }
            }
            Command::SetSpeed { speed } => self.pacer.set_speed(speed),
            Command::Pause => self.pacer.pause(),
            Command::Resume => self.pacer.resume(),
            Command::Reset { scenario, seed } => {
                let scenario = scenario.map(|id| ScenarioConfig::lookup(&id));
                self.reset(scenario, seed);
            }
            Command::ResolveChoice { event_id, choice_id } => {
                if let Err(err) = self.resolve_choice(event_id, &choice_id) {
                    tracing::warn!("RESOLVE_CHOICE ignored: {}", err);
                }
            }
            Command::ForceShock { event_type } => match EventKind::parse(&event_type) {
                Some(kind) => self.force_shock(kind),
                None => tracing::warn!("FORCE_SHOCK ignored: unknown event type `{}`", event_type),
            },
            Command::GetSnapshot => {
                let snapshot = self.snapshot();
                self.notify(Notification::State(Box::new(snapshot)));
            }
            Command::Unknown => tracing::warn!("ignoring unknown command"),
        }
    }

    pub fn handle_json(&mut self, json: &str) {
        match Command::from_json(json) {
            Ok(command) => self.handle(command),
            Err(err) => tracing::warn!("ignoring command: {}", err),
        }
    }

    pub fn set_policy(&mut self, lever: &str, value: PolicyValue) -> Result<(), PolicyError> {
        self.world.policy.set(lever, value)
    }

    /// Resolve the pending event. Follow-ups are scheduled relative to now.
    pub fn resolve_choice(&mut self, event_id: u64, choice_id: &str) -> Result<(), ResolveError> {
        let tick = self.world.tick;
        let resolution = self.events.resolve(event_id, choice_id, tick)?;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "event",
            tick = tick,
            event_id = event_id,
            kind = resolution.activation.kind.name(),
            phase = "resolved",
            choice = choice_id,
            follow_ups = resolution.scheduled.len() as u64,
        );

        self.activate(resolution.activation);
        if let Some(next) = resolution.promoted {
            self.notify(Notification::Event(next));
        }
        Ok(())
    }

    /// Trigger an event now, bypassing lottery and cooldown.
    pub fn force_shock(&mut self, kind: EventKind) {
        let step = self.events.trigger(kind, self.world.tick, &self.catalog);
        self.absorb(step);
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push_back(notification);
        while self.notifications.len() > MAX_QUEUED_NOTIFICATIONS {
            self.notifications.pop_front();
        }
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn snapshot(&self) -> Snapshot {
        let tick = self.world.tick;
        Snapshot {
            tick,
            year: self.scenario.year_at(tick, &self.config),
            scenario: self.scenario.id.clone(),
            paused: self.pacer.paused,
            speed: finite_or(self.pacer.speed, 1.0),
            agents: self
                .world
                .agents
                .values()
                .map(|a| AgentView::new(a, &self.config))
                .collect(),
            businesses: self.world.living_businesses().map(BusinessView::from).collect(),
            metrics: self.current.clone(),
            market: self.world.market.sectors().to_vec(),
            policy: self.world.policy.entries(),
            government: self.world.government.clone(),
            banks: self.world.banks.clone(),
            active_events: self
                .events
                .active()
                .iter()
                .map(|e| ActiveEventView::new(e, tick))
                .collect(),
            pending_event: self.events.pending().map(EventInstance::notice),
            scheduled_events: self.events.scheduled().to_vec(),
            global: GlobalView::from(&self.world.global),
            report: self.report.clone(),
        }
    }

    pub fn tick(&self) -> Tick {
        self.world.tick
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn events(&self) -> &EventSystem {
        &self.events
    }

    pub fn metrics(&self) -> &Metrics {
        &self.current
    }

    pub fn history(&self) -> &MetricsHistory {
        &self.history
    }

    pub fn baseline(&self) -> Option<&Metrics> {
        self.baseline.as_ref()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn report(&self) -> Option<&ScoreReport> {
        self.report.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.report.is_some()
    }
}

fn every(tick: Tick, interval: Tick) -> bool {
    interval > 0 && tick % interval == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> ScenarioConfig {
        ScenarioConfig::default().with_agents(60).with_businesses(6)
    }

    fn quiet_engine(seed: u64) -> Engine {
        Engine::with_config(small(), SimConfig::without_random_events(), seed)
    }

    #[test]
    fn step_advances_one_tick() {
        let mut engine = quiet_engine(1);
        assert_eq!(engine.tick(), 0);
        engine.step();
        engine.step();
        assert_eq!(engine.tick(), 2);
        assert_eq!(engine.world().tick, 2);
    }

    #[test]
    fn metrics_sample_on_cadence() {
        let mut engine = quiet_engine(2);
        for _ in 0..4 {
            engine.step();
        }
        assert!(engine.history().is_empty());
        engine.step();
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.metrics().tick, 5);
    }

    #[test]
    fn pending_choice_halts_frames() {
        let mut engine = quiet_engine(3);
        engine.force_shock(EventKind::FinancialBubble);
        assert_eq!(engine.halt(), Some(Halt::AwaitingChoice));
        assert_eq!(engine.frame(1_000.0), 0);
        assert_eq!(engine.tick(), 0);

        let id = engine.events().pending().map(|e| e.id).unwrap_or_default();
        engine.handle(Command::ResolveChoice {
            event_id: id,
            choice_id: "raise_rates".to_string(),
        });
        assert!(engine.events().pending().is_none());
        assert!(engine.events().is_active(EventKind::FinancialBubble));
        assert_eq!(engine.world().policy.interest_rate, 0.12);
        assert_eq!(engine.frame(1_000.0), 10);
    }

    #[test]
    fn pause_and_speed_commands() {
        let mut engine = quiet_engine(4);
        engine.handle(Command::Pause);
        assert_eq!(engine.frame(1_000.0), 0);
        engine.handle(Command::Resume);
        engine.handle(Command::SetSpeed { speed: 2.0 });
        assert_eq!(engine.frame(1_000.0), 20);
        assert_eq!(engine.tick(), 20);
    }

    #[test]
    fn bad_commands_change_nothing() {
        let mut engine = quiet_engine(5);
        let before = engine.world().policy.income_tax;
        engine.handle_json(r#"{"type":"SET_POLICY","policy":"no_such_lever","value":1}"#);
        engine.handle_json(r#"{"type":"FORCE_SHOCK","eventType":"alien_invasion"}"#);
        engine.handle_json(r#"{"type":"WARP"}"#);
        engine.handle_json("{");
        assert_eq!(engine.world().policy.income_tax, before);
        assert!(engine.events().pending().is_none());
        assert!(engine.events().active().is_empty());
        assert!(engine.drain_notifications().is_empty());
    }

    #[test]
    fn set_policy_by_json() {
        let mut engine = quiet_engine(6);
        engine.handle_json(r#"{"type":"SET_POLICY","policy":"ubi","value":12.5}"#);
        assert_eq!(engine.world().policy.ubi, 12.5);
    }

    #[test]
    fn forced_event_is_announced() {
        let mut engine = quiet_engine(7);
        engine.force_shock(EventKind::TechBreakthrough);
        let notes = engine.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind(), "EVENT");
        assert!(engine.events().is_active(EventKind::TechBreakthrough));
        assert!(engine.halt().is_none());
    }

    #[test]
    fn empty_catalog_ignores_forced_shocks() {
        let mut engine = quiet_engine(12).with_catalog(EventCatalog::empty());
        engine.force_shock(EventKind::Pandemic);
        assert!(engine.events().pending().is_none());
        assert!(engine.events().active().is_empty());
        assert!(engine.drain_notifications().is_empty());
    }

    #[test]
    fn reservation_model_gates_hiring() {
        let working = |e: &Engine| {
            e.world()
                .living_agents()
                .filter(|a| a.employment == EmploymentState::Working)
                .count()
        };
        let choosy = ReservationWageModel {
            base: 1.0e9,
            ..ReservationWageModel::default()
        };
        let scenario = ScenarioConfig::default().with_agents(120).with_businesses(4);
        let mut engine = Engine::with_config(scenario, SimConfig::without_random_events(), 13)
            .with_reservation_model(choosy);
        let before = working(&engine);
        assert!(!engine.world().job_seekers().is_empty());
        for _ in 0..20 {
            engine.step();
        }
        assert!(working(&engine) <= before);
    }

    #[test]
    fn reset_rebuilds_from_seed() {
        let mut engine = quiet_engine(8);
        for _ in 0..12 {
            engine.step();
        }
        engine.handle(Command::Reset {
            scenario: None,
            seed: None,
        });
        assert_eq!(engine.tick(), 0);
        assert!(engine.history().is_empty());

        let fresh = quiet_engine(8);
        let wealth = |e: &Engine| e.world().agents.values().map(|a| a.wealth).collect::<Vec<_>>();
        assert_eq!(wealth(&engine), wealth(&fresh));
    }

    #[test]
    fn reset_to_unknown_scenario_falls_back() {
        let mut engine = quiet_engine(9);
        engine.handle(Command::Reset {
            scenario: Some("atlantis".to_string()),
            seed: Some(3),
        });
        assert_eq!(engine.scenario().id, crate::scenario::DEFAULT_SCENARIO);
        assert_eq!(engine.seed(), 3);
    }

    #[test]
    fn completion_reports_once() {
        let scenario = small().with_duration(20);
        let mut engine = Engine::with_config(scenario, SimConfig::without_random_events(), 10);
        for _ in 0..20 {
            engine.step();
        }
        assert!(engine.is_complete());
        assert_eq!(engine.halt(), Some(Halt::Complete));
        let completions = engine
            .drain_notifications()
            .iter()
            .filter(|n| n.kind() == "SCENARIO_COMPLETE")
            .count();
        assert_eq!(completions, 1);

        engine.step();
        assert!(engine.drain_notifications().iter().all(|n| n.kind() != "SCENARIO_COMPLETE"));
        assert_eq!(engine.frame(1_000.0), 0);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut engine = quiet_engine(11);
        engine.force_shock(EventKind::Pandemic);
        let snap = engine.snapshot();
        assert_eq!(snap.tick, 0);
        assert_eq!(snap.agents.len(), 60);
        assert_eq!(snap.businesses.len(), 6);
        assert_eq!(snap.market.len(), 4);
        assert!(snap.pending_event.is_some());
        assert!(snap.active_events.is_empty());
        assert_eq!(snap.year, 2025);
    }
}
