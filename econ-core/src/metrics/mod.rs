//! Macro indicators, recomputed from live state every sample.

pub mod insights;
pub mod scoring;

pub use insights::*;
pub use scoring::*;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tsify_next::Tsify;

use crate::agents::Agent;
use crate::config::SimConfig;
use crate::types::{AgentId, EmploymentState, Sector, SocialClass, Tick, finite_or};
use crate::world::World;

/// Ticks of essential spending an adult must hold to be above the poverty line.
const POVERTY_BUFFER_TICKS: f64 = 10.0;
/// Unrest above which an agent counts toward the crime rate.
const CRIME_UNREST: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub tick: Tick,
    /// Unemployed share of the labor force, in [0, 1].
    pub unemployment: f64,
    pub gini: f64,
    /// Real output at base prices.
    pub gdp: f64,
    /// Percent change in GDP over the last year of samples.
    pub gdp_growth: f64,
    pub cpi: f64,
    /// Percent.
    pub inflation: f64,
    pub poverty_rate: f64,
    pub crime_rate: f64,
    pub government_debt: f64,
    pub budget: f64,
    pub population: usize,
    pub business_count: usize,
    pub avg_wage: f64,
    pub avg_happiness: f64,
    pub unrest: f64,
}

impl Metrics {
    /// Recompute every indicator from the world. `history` supplies the GDP
    /// baseline for growth.
    pub fn compute(world: &World, history: &MetricsHistory, config: &SimConfig) -> Self {
        let living: Vec<&Agent> = world.living_agents().collect();
        let adults: Vec<&Agent> = living
            .iter()
            .copied()
            .filter(|a| a.employment != EmploymentState::Child)
            .collect();

        let labor_force = living.iter().filter(|a| a.employment.in_labor_force()).count();
        let unemployed = living
            .iter()
            .filter(|a| a.employment == EmploymentState::Unemployed)
            .count();
        let unemployment = ratio(unemployed as f64, labor_force as f64);

        let wealth: Vec<f64> = living.iter().map(|a| a.wealth).collect();
        let gini = gini(&wealth);

        let gdp: f64 = world
            .living_businesses()
            .map(|b| b.output * b.sector.base_price())
            .sum();
        let gdp = finite_or(gdp, 0.0);
        let gdp_growth = match history.gdp_baseline(world.tick, config.ticks_per_year as Tick) {
            Some(base) if base > 0.0 => finite_or((gdp / base - 1.0) * 100.0, 0.0),
            _ => 0.0,
        };

        let poverty_line = POVERTY_BUFFER_TICKS * essential_cost(world);
        let poor = adults.iter().filter(|a| a.wealth < poverty_line).count();
        let restless = adults.iter().filter(|a| a.unrest > CRIME_UNREST).count();

        let wages: Vec<f64> = living
            .iter()
            .filter(|a| a.employment == EmploymentState::Working)
            .map(|a| a.wage)
            .collect();

        Self {
            tick: world.tick,
            unemployment: unemployment.clamp(0.0, 1.0),
            gini,
            gdp,
            gdp_growth,
            cpi: finite_or(world.market.cpi, 100.0).max(f64::MIN_POSITIVE),
            inflation: finite_or(world.market.inflation, 0.0),
            poverty_rate: ratio(poor as f64, adults.len() as f64),
            crime_rate: ratio(restless as f64, adults.len() as f64),
            government_debt: finite_or(world.government.debt, 0.0),
            budget: finite_or(world.government.budget, 0.0),
            population: living.len(),
            business_count: world.living_businesses().count(),
            avg_wage: mean(&wages),
            avg_happiness: mean(&living.iter().map(|a| a.happiness).collect::<Vec<_>>()),
            unrest: mean(&adults.iter().map(|a| a.unrest).collect::<Vec<_>>()),
        }
    }
}

/// Per-tick cost of the essential basket at current prices.
fn essential_cost(world: &World) -> f64 {
    [Sector::Food, Sector::Housing]
        .iter()
        .map(|&s| s.base_consumption() * world.market.price(s))
        .sum()
}

/// `num / den`, or 0 when the denominator is empty.
fn ratio(num: f64, den: f64) -> f64 {
    if den <= 0.0 { 0.0 } else { finite_or(num / den, 0.0) }
}

fn mean(xs: &[f64]) -> f64 {
    ratio(xs.iter().sum(), xs.len() as f64)
}

/// Gini coefficient of the wealth distribution. Debts count as zero wealth,
/// so the result always lies in [0, 1].
pub fn gini(wealth: &[f64]) -> f64 {
    let mut w: Vec<f64> = wealth.iter().map(|&x| finite_or(x, 0.0).max(0.0)).collect();
    let n = w.len();
    let total: f64 = w.iter().sum();
    if n < 2 || total <= 0.0 {
        return 0.0;
    }
    w.sort_by(f64::total_cmp);
    let weighted: f64 = w
        .iter()
        .enumerate()
        .map(|(i, x)| (2.0 * (i + 1) as f64 - n as f64 - 1.0) * x)
        .sum();
    finite_or(weighted / (n as f64 * total), 0.0).clamp(0.0, 1.0)
}

/// Reassign every living agent's class from its wealth percentile.
pub fn assign_classes(agents: &mut SlotMap<AgentId, Agent>) {
    let mut ranked: Vec<(AgentId, f64)> = agents
        .iter()
        .filter(|(_, a)| a.alive())
        .map(|(id, a)| (id, a.wealth))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    let n = ranked.len().max(1) as f64;
    for (rank, (id, _)) in ranked.into_iter().enumerate() {
        if let Some(a) = agents.get_mut(id) {
            a.class = SocialClass::from_percentile(rank as f64 / n);
        }
    }
}

// === HISTORY ===

/// Bounded series of metric samples.
#[derive(Debug, Clone, Default)]
pub struct MetricsHistory {
    samples: VecDeque<Metrics>,
    cap: usize,
}

impl MetricsHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    pub fn push(&mut self, m: Metrics) {
        self.samples.push_back(m);
        while self.samples.len() > self.cap {
            self.samples.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&Metrics> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metrics> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// GDP of the newest sample taken at least `ticks` before `now`, or the
    /// oldest one.
    fn gdp_baseline(&self, now: Tick, ticks: Tick) -> Option<f64> {
        self.samples
            .iter()
            .rev()
            .find(|m| now.saturating_sub(m.tick) >= ticks)
            .or(self.samples.front())
            .map(|m| m.gdp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::production::Business;

    #[test]
    fn gini_of_equal_wealth_is_zero() {
        assert_eq!(gini(&[100.0; 10]), 0.0);
    }

    #[test]
    fn gini_of_concentrated_wealth_approaches_one() {
        let mut w = vec![0.0; 99];
        w.push(1_000.0);
        assert!((gini(&w) - 0.99).abs() < 1e-9);
    }

    #[test]
    fn gini_ignores_debt_and_degenerate_inputs() {
        assert_eq!(gini(&[]), 0.0);
        assert_eq!(gini(&[-50.0, -10.0]), 0.0);
        let g = gini(&[-500.0, 100.0, 100.0, f64::NAN]);
        assert!((0.0..=1.0).contains(&g));
    }

    #[test]
    fn empty_world_has_neutral_metrics() {
        let world = World::new();
        let m = Metrics::compute(&world, &MetricsHistory::new(10), &SimConfig::default());
        assert_eq!(m.unemployment, 0.0);
        assert_eq!(m.gini, 0.0);
        assert_eq!(m.gdp, 0.0);
        assert_eq!(m.poverty_rate, 0.0);
        assert!(m.cpi > 0.0);
        assert_eq!(m.population, 0);
    }

    #[test]
    fn unemployment_counts_owners_in_labor_force() {
        let mut world = World::new();
        world.add_agent(|k| Agent::new(k).with_employment(EmploymentState::Unemployed));
        world.add_agent(|k| Agent::new(k).with_employment(EmploymentState::Owner));
        world.add_agent(|k| Agent::new(k).with_employment(EmploymentState::Retired));
        world.add_agent(|k| Agent::new(k).with_employment(EmploymentState::Dead));
        let m = Metrics::compute(&world, &MetricsHistory::new(10), &SimConfig::default());
        assert_eq!(m.unemployment, 0.5);
        assert_eq!(m.population, 3);
    }

    #[test]
    fn labor_force_excludes_children_and_retirees() {
        let mut world = World::new();
        for state in [
            EmploymentState::Child,
            EmploymentState::Child,
            EmploymentState::Retired,
            EmploymentState::Working,
            EmploymentState::Working,
            EmploymentState::Owner,
            EmploymentState::Unemployed,
        ] {
            world.add_agent(|k| Agent::new(k).with_employment(state));
        }
        let m = Metrics::compute(&world, &MetricsHistory::new(10), &SimConfig::default());
        assert_eq!(m.unemployment, 0.25);
        assert_eq!(m.population, 7);
    }

    #[test]
    fn gdp_is_real_output() {
        let mut world = World::new();
        let b = world.add_business(|k| Business::new(k, Sector::Tech, 1_000.0));
        world.businesses[b].output = 3.0;
        world.market.shock(None, 2.0, 0.01);
        let m = Metrics::compute(&world, &MetricsHistory::new(10), &SimConfig::default());
        assert_eq!(m.gdp, 3.0 * Sector::Tech.base_price());
    }

    #[test]
    fn growth_compares_against_year_old_sample() {
        let config = SimConfig::default();
        let mut history = MetricsHistory::new(100);
        history.push(Metrics { tick: 0, gdp: 100.0, ..Metrics::default() });
        history.push(Metrics { tick: 60, gdp: 150.0, ..Metrics::default() });

        let mut world = World::new();
        world.tick = 60;
        let b = world.add_business(|k| Business::new(k, Sector::Food, 1_000.0));
        world.businesses[b].output = 110.0 / Sector::Food.base_price();
        let m = Metrics::compute(&world, &history, &config);
        assert!((m.gdp_growth - 10.0).abs() < 1e-9);
    }

    #[test]
    fn classes_follow_wealth_rank() {
        let mut world = World::new();
        let ids: Vec<AgentId> = (0..20)
            .map(|i| world.add_agent(|k| Agent::new(k).with_wealth(i as f64 * 10.0)))
            .collect();
        assign_classes(&mut world.agents);
        assert_eq!(world.agents[ids[0]].class, SocialClass::Poor);
        assert_eq!(world.agents[ids[19]].class, SocialClass::Elite);
    }

    #[test]
    fn history_is_bounded() {
        let mut history = MetricsHistory::new(3);
        for t in 0..10 {
            history.push(Metrics { tick: t, ..Metrics::default() });
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.iter().next().map(|m| m.tick), Some(7));
    }
}
