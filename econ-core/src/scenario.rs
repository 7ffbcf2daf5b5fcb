//! Scenario content: who lives in the world at tick 0 and how the run is scored.

use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, LogNormal, Pareto};
use serde::{Deserialize, Serialize};

use crate::agents::{Agent, Bank};
use crate::config::SimConfig;
use crate::error::ScenarioError;
use crate::events::{EventKind, FollowUp};
use crate::metrics::{HistoricalRecord, ScoreWeights};
use crate::policy::{PolicyEntry, PolicyValue};
use crate::production::Business;
use crate::types::{AgentId, EmploymentState, Sector, Tick};
use crate::world::World;

pub const DEFAULT_SCENARIO: &str = "sandbox";

/// Sector of the n-th starting business, cycled.
const SECTOR_MIX: [Sector; 6] = [
    Sector::Food,
    Sector::Housing,
    Sector::Food,
    Sector::Tech,
    Sector::Housing,
    Sector::Luxury,
];
/// Share of each starting firm's capacity staffed at tick 0.
const INITIAL_STAFFING: f64 = 0.75;
const MAP_SIZE: f32 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WealthDistribution {
    Equal { amount: f64 },
    LogNormal { median: f64, sigma: f64 },
    Pareto { scale: f64, alpha: f64 },
}

impl WealthDistribution {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match *self {
            WealthDistribution::Equal { amount } => amount,
            WealthDistribution::LogNormal { median, sigma } => {
                match LogNormal::new(median.max(1e-9).ln(), sigma.max(0.0)) {
                    Ok(d) => d.sample(rng),
                    Err(_) => median,
                }
            }
            WealthDistribution::Pareto { scale, alpha } => match Pareto::new(scale.max(1e-9), alpha.max(1e-3)) {
                Ok(d) => d.sample(rng),
                Err(_) => scale,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    pub agents: usize,
    pub businesses: usize,
    /// Ticks until the run is scored. 0 runs forever.
    pub duration: Tick,
    pub start_year: i32,
    pub wealth: WealthDistribution,
    pub policy: Vec<PolicyEntry>,
    pub weights: ScoreWeights,
    pub record: Option<HistoricalRecord>,
    pub banks: usize,
    pub bank_reserves: f64,
    /// Shocks scheduled at reset, `offset` ticks in.
    pub opening_events: Vec<FollowUp>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_SCENARIO.to_string(),
            name: "Sandbox".to_string(),
            description: "An open-ended economy with moderate policy.".to_string(),
            agents: 200,
            businesses: 20,
            duration: 0,
            start_year: 2025,
            wealth: WealthDistribution::LogNormal {
                median: 800.0,
                sigma: 0.8,
            },
            policy: Vec::new(),
            weights: ScoreWeights::default(),
            record: None,
            banks: 3,
            bank_reserves: 50_000.0,
            opening_events: Vec::new(),
        }
    }
}

fn entry(lever: &str, value: PolicyValue) -> PolicyEntry {
    PolicyEntry {
        lever: lever.to_string(),
        value,
    }
}

impl ScenarioConfig {
    /// Built-in scenario by id.
    pub fn builtin(id: &str) -> Option<Self> {
        let scenario = match id {
            DEFAULT_SCENARIO => Self::default(),
            "great_depression" => Self {
                id: id.to_string(),
                name: "The Great Depression".to_string(),
                description: "Speculation has run its course. Keep the banks and the jobs alive."
                    .to_string(),
                duration: 520,
                start_year: 1929,
                wealth: WealthDistribution::Pareto {
                    scale: 300.0,
                    alpha: 1.6,
                },
                policy: vec![
                    entry("income_tax", PolicyValue::Number(0.05)),
                    entry("interest_rate", PolicyValue::Number(0.06)),
                    entry("tariff", PolicyValue::Number(0.4)),
                    entry("unemployment_benefit", PolicyValue::Number(0.0)),
                ],
                weights: ScoreWeights {
                    equality: 0.5,
                    growth: 1.5,
                    stability: 1.0,
                },
                record: Some(HistoricalRecord {
                    label: "1929-1939".to_string(),
                    score: 35.0,
                }),
                bank_reserves: 20_000.0,
                opening_events: vec![FollowUp {
                    kind: EventKind::BankRun,
                    offset: 5,
                }],
                ..Self::default()
            },
            "gilded_age" => Self {
                id: id.to_string(),
                name: "The Gilded Age".to_string(),
                description: "Fortunes are vast and wages are thin. Spread the gains.".to_string(),
                duration: 780,
                start_year: 1880,
                wealth: WealthDistribution::Pareto {
                    scale: 150.0,
                    alpha: 1.2,
                },
                policy: vec![
                    entry("income_tax", PolicyValue::Number(0.0)),
                    entry("corporate_tax", PolicyValue::Number(0.0)),
                    entry("minimum_wage", PolicyValue::Number(0.0)),
                    entry("unemployment_benefit", PolicyValue::Number(0.0)),
                ],
                weights: ScoreWeights {
                    equality: 2.0,
                    growth: 1.0,
                    stability: 1.0,
                },
                record: Some(HistoricalRecord {
                    label: "1870-1900".to_string(),
                    score: 45.0,
                }),
                ..Self::default()
            },
            "stagflation" => Self {
                id: id.to_string(),
                name: "Stagflation".to_string(),
                description: "Prices climb while output stalls. Tame inflation without a slump."
                    .to_string(),
                duration: 520,
                start_year: 1973,
                policy: vec![
                    entry("interest_rate", PolicyValue::Number(0.04)),
                    entry("money_printing", PolicyValue::Number(0.05)),
                ],
                weights: ScoreWeights {
                    equality: 0.5,
                    growth: 1.0,
                    stability: 2.0,
                },
                record: Some(HistoricalRecord {
                    label: "1973-1982".to_string(),
                    score: 50.0,
                }),
                opening_events: vec![FollowUp {
                    kind: EventKind::EnergyCrisis,
                    offset: 1,
                }],
                ..Self::default()
            },
            _ => return None,
        };
        Some(scenario)
    }

    /// Built-in scenario by id, falling back to the default one.
    pub fn lookup(id: &str) -> Self {
        Self::builtin(id).unwrap_or_else(|| {
            tracing::warn!("unknown scenario `{}`, using `{}`", id, DEFAULT_SCENARIO);
            Self::default()
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_json::from_str(json)?;
        if scenario.agents == 0 {
            return Err(ScenarioError::Empty { id: scenario.id });
        }
        Ok(scenario)
    }

    pub fn with_agents(mut self, agents: usize) -> Self {
        self.agents = agents;
        self
    }

    pub fn with_businesses(mut self, businesses: usize) -> Self {
        self.businesses = businesses;
        self
    }

    pub fn with_duration(mut self, duration: Tick) -> Self {
        self.duration = duration;
        self
    }

    /// Calendar year at `tick`.
    pub fn year_at(&self, tick: Tick, config: &SimConfig) -> i32 {
        self.start_year + (tick / config.ticks_per_year.max(1) as Tick) as i32
    }

    // === WORLD CONSTRUCTION ===

    /// Populate a fresh world: policy overrides, banks, agents, businesses,
    /// then staff the businesses from the working-age population.
    pub fn build_world<R: Rng>(&self, config: &SimConfig, rng: &mut R) -> World {
        let mut world = World::new();

        for e in &self.policy {
            if let Err(err) = world.policy.set(&e.lever, e.value) {
                tracing::warn!("scenario `{}`: {}", self.id, err);
            }
        }

        world.banks = (0..self.banks)
            .map(|i| Bank::new(i as u32, format!("Bank {}", i + 1), self.bank_reserves))
            .collect();

        let population = self.agents.min(config.max_population);
        for _ in 0..population {
            let age_years = rng.random_range(0.0..75.0);
            let age = config.ticks_for_years(age_years);
            let employment = if age < config.working_age_ticks() {
                EmploymentState::Child
            } else if age >= config.retirement_age_ticks() {
                EmploymentState::Retired
            } else {
                EmploymentState::Unemployed
            };
            let wealth = if employment == EmploymentState::Child {
                0.0
            } else {
                self.wealth.sample(rng)
            };
            let skill = rng.random_range(0.1..0.9);
            let education = rng.random_range(0.1..0.9);
            let x = rng.random_range(0.0..MAP_SIZE);
            let y = rng.random_range(0.0..MAP_SIZE);
            world.add_agent(|id| {
                Agent::new(id)
                    .with_age(age)
                    .with_wealth(wealth)
                    .with_skill(skill, education)
                    .with_employment(employment)
                    .with_position(x, y)
            });
        }

        let firms = self.businesses.min(config.max_businesses);
        for i in 0..firms {
            let sector = SECTOR_MIX[i % SECTOR_MIX.len()];
            let capital = config.business_seed_capital * rng.random_range(0.8..1.5);
            let x = rng.random_range(0.0..MAP_SIZE);
            let y = rng.random_range(0.0..MAP_SIZE);
            world.add_business(|id| {
                Business::new(id, sector, capital)
                    .with_name(format!("{} #{}", sector.name(), i + 1))
                    .with_position(x, y)
            });
        }

        self.staff(&mut world, config, rng);
        world
    }

    /// Round-robin initial hiring so every firm starts with a crew.
    fn staff<R: Rng>(&self, world: &mut World, config: &SimConfig, rng: &mut R) {
        let mut seekers: Vec<AgentId> = world.job_seekers();
        seekers.shuffle(rng);
        let firms: Vec<_> = world
            .businesses
            .iter()
            .map(|(id, b)| (id, ((b.capacity as f64) * INITIAL_STAFFING).ceil() as usize, b.wage_offered))
            .collect();
        if firms.is_empty() {
            return;
        }

        let mut filled = vec![0usize; firms.len()];
        let mut next = 0usize;
        for agent in seekers {
            let Some(slot) = (0..firms.len())
                .map(|k| (next + k) % firms.len())
                .find(|&k| filled[k] < firms[k].1)
            else {
                break;
            };
            let (business, _, wage) = firms[slot];
            if world.employ(agent, business, wage, config.life_log_cap) {
                filled[slot] += 1;
            }
            next = slot + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn unknown_id_falls_back_to_default() {
        assert_eq!(ScenarioConfig::lookup("atlantis").id, DEFAULT_SCENARIO);
        assert!(ScenarioConfig::builtin("atlantis").is_none());
        for id in ["sandbox", "great_depression", "gilded_age", "stagflation"] {
            assert_eq!(ScenarioConfig::lookup(id).id, id);
        }
    }

    #[test]
    fn from_json_fills_defaults() {
        let json = r#"{"id":"tiny","agents":10,"businesses":2,
            "wealth":{"kind":"equal","amount":100.0}}"#;
        let s = ScenarioConfig::from_json(json).unwrap();
        assert_eq!(s.agents, 10);
        assert_eq!(s.banks, 3);
        assert_eq!(s.wealth, WealthDistribution::Equal { amount: 100.0 });
    }

    #[test]
    fn from_json_rejects_empty_world() {
        assert!(matches!(
            ScenarioConfig::from_json(r#"{"id":"void","agents":0}"#),
            Err(ScenarioError::Empty { .. })
        ));
        assert!(matches!(ScenarioConfig::from_json("{"), Err(ScenarioError::Malformed(_))));
    }

    #[test]
    fn build_world_staffs_every_firm() {
        let config = SimConfig::default();
        let scenario = ScenarioConfig::default().with_agents(120).with_businesses(6);
        let mut rng = StdRng::seed_from_u64(7);
        let world = scenario.build_world(&config, &mut rng);

        assert_eq!(world.population(), 120);
        assert_eq!(world.banks.len(), 3);
        for b in world.businesses.values() {
            assert!(!b.employees.is_empty(), "{} has no staff", b.name);
            for &e in &b.employees {
                assert_eq!(world.agents[e].employer, Some(b.id));
            }
        }
        assert!(world
            .agents
            .values()
            .filter(|a| a.employment == EmploymentState::Child)
            .all(|a| a.wealth == 0.0));
    }

    #[test]
    fn scenario_policy_overrides_apply() {
        let config = SimConfig::default();
        let scenario = ScenarioConfig::lookup("gilded_age").with_agents(5).with_businesses(1);
        let world = scenario.build_world(&config, &mut StdRng::seed_from_u64(1));
        assert_eq!(world.policy.income_tax, 0.0);
        assert_eq!(world.policy.minimum_wage, 0.0);
    }

    #[test]
    fn wealth_samples_are_finite() {
        let mut rng = StdRng::seed_from_u64(3);
        for dist in [
            WealthDistribution::Equal { amount: 5.0 },
            WealthDistribution::LogNormal { median: 800.0, sigma: 0.8 },
            WealthDistribution::Pareto { scale: 150.0, alpha: 1.2 },
        ] {
            for _ in 0..100 {
                let w = dist.sample(&mut rng);
                assert!(w.is_finite() && w >= 0.0);
            }
        }
    }

    #[test]
    fn year_advances_with_ticks() {
        let config = SimConfig::default();
        let s = ScenarioConfig::lookup("great_depression");
        assert_eq!(s.year_at(0, &config), 1929);
        assert_eq!(s.year_at(52 * 3, &config), 1932);
    }
}
