//! Event templates.
//!
//! A catalog is immutable once built. Triggering an event copies the
//! template's effect table into the instance, so choice overrides never leak
//! back into the catalog.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::error::CatalogError;
use crate::policy::{PolicyEntry, PolicyValue};
use crate::types::{Sector, Tick};

/// Id of the choice appended to every choice-bearing event.
pub const DO_NOTHING: &str = "do_nothing";

// === KINDS ===

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Tsify,
)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FinancialBubble,
    BankRun,
    Pandemic,
    TechBreakthrough,
    Drought,
    EnergyCrisis,
    GeneralStrike,
    TradeWar,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::FinancialBubble,
        EventKind::BankRun,
        EventKind::Pandemic,
        EventKind::TechBreakthrough,
        EventKind::Drought,
        EventKind::EnergyCrisis,
        EventKind::GeneralStrike,
        EventKind::TradeWar,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventKind::FinancialBubble => "financial_bubble",
            EventKind::BankRun => "bank_run",
            EventKind::Pandemic => "pandemic",
            EventKind::TechBreakthrough => "tech_breakthrough",
            EventKind::Drought => "drought",
            EventKind::EnergyCrisis => "energy_crisis",
            EventKind::GeneralStrike => "general_strike",
            EventKind::TradeWar => "trade_war",
        }
    }

    /// Accepts `bank_run`, `bankRun` and `BANK_RUN` alike.
    pub fn parse(name: &str) -> Option<Self> {
        let wanted: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL
            .into_iter()
            .find(|k| k.name().replace('_', "") == wanted)
    }
}

// === EFFECTS ===

/// Numeric effects of an event. Per-step fields apply every tick while the
/// event is active; `immediate_*` fields apply once on activation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectTable {
    /// Ticks the event stays active. 0 means permanent.
    pub duration: Tick,
    /// Sector targeted by the market effects. `None` hits every sector.
    pub sector: Option<Sector>,
    /// Multiplicative pressure on price targets (0.02 = +2% per tick).
    pub price_pressure: f64,
    /// Fractional change in consumer demand.
    pub demand_shift: f64,
    /// Fractional change in business output.
    pub productivity: f64,
    /// Per-tick fractional drift of positive agent wealth.
    pub wealth_drift: f64,
    /// Per-tick fractional drift of positive business capital.
    pub capital_drift: f64,
    pub happiness_drift: f64,
    pub health_drift: f64,
    pub unrest: f64,
    /// Per-tick probability that any given worker loses their job.
    pub layoff_chance: f64,
    /// Extra per-tick death probability.
    pub death_risk: f64,
    /// Per-tick fraction of bank reserves withdrawn.
    pub bank_drain: f64,
    pub immediate_wealth: f64,
    pub immediate_capital: f64,
    pub immediate_price: f64,
}

/// Partial effect table a choice lays over the template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectOverrides {
    pub duration: Option<Tick>,
    pub price_pressure: Option<f64>,
    pub demand_shift: Option<f64>,
    pub productivity: Option<f64>,
    pub wealth_drift: Option<f64>,
    pub capital_drift: Option<f64>,
    pub happiness_drift: Option<f64>,
    pub health_drift: Option<f64>,
    pub unrest: Option<f64>,
    pub layoff_chance: Option<f64>,
    pub death_risk: Option<f64>,
    pub bank_drain: Option<f64>,
    pub immediate_wealth: Option<f64>,
    pub immediate_capital: Option<f64>,
    pub immediate_price: Option<f64>,
}

impl EffectTable {
    pub fn merge(&mut self, o: &EffectOverrides) {
        fn take<T: Copy>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }
        take(&mut self.duration, o.duration);
        take(&mut self.price_pressure, o.price_pressure);
        take(&mut self.demand_shift, o.demand_shift);
        take(&mut self.productivity, o.productivity);
        take(&mut self.wealth_drift, o.wealth_drift);
        take(&mut self.capital_drift, o.capital_drift);
        take(&mut self.happiness_drift, o.happiness_drift);
        take(&mut self.health_drift, o.health_drift);
        take(&mut self.unrest, o.unrest);
        take(&mut self.layoff_chance, o.layoff_chance);
        take(&mut self.death_risk, o.death_risk);
        take(&mut self.bank_drain, o.bank_drain);
        take(&mut self.immediate_wealth, o.immediate_wealth);
        take(&mut self.immediate_capital, o.immediate_capital);
        take(&mut self.immediate_price, o.immediate_price);
    }
}

// === CHOICES ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUp {
    pub kind: EventKind,
    pub offset: Tick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventChoice {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub overrides: EffectOverrides,
    #[serde(default)]
    pub policy: Vec<PolicyEntry>,
    /// Added to government debt when chosen.
    #[serde(default)]
    pub debt_cost: f64,
    #[serde(default)]
    pub follow_ups: Vec<FollowUp>,
}

impl EventChoice {
    fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            overrides: EffectOverrides::default(),
            policy: Vec::new(),
            debt_cost: 0.0,
            follow_ups: Vec::new(),
        }
    }

    /// The synthetic inaction option: default effects, nothing scheduled.
    pub fn do_nothing() -> Self {
        Self::new(DO_NOTHING, "Do nothing")
    }

    fn overrides(mut self, overrides: EffectOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    fn policy(mut self, lever: &str, value: PolicyValue) -> Self {
        self.policy.push(PolicyEntry {
            lever: lever.to_string(),
            value,
        });
        self
    }

    fn debt(mut self, cost: f64) -> Self {
        self.debt_cost = cost;
        self
    }

    fn follow_up(mut self, kind: EventKind, offset: Tick) -> Self {
        self.follow_ups.push(FollowUp { kind, offset });
        self
    }

    pub fn is_do_nothing(&self) -> bool {
        self.id == DO_NOTHING
    }
}

// === DEFINITIONS ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub kind: EventKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effects: EffectTable,
    #[serde(default)]
    pub choices: Vec<EventChoice>,
    /// Base lottery weight before metric modifiers.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl EventDefinition {
    pub fn requires_choice(&self) -> bool {
        !self.choices.is_empty()
    }

    /// Declared choices plus the synthetic inaction option.
    pub fn choices_with_default(&self) -> Vec<EventChoice> {
        let mut choices = self.choices.clone();
        if !choices.is_empty() {
            choices.push(EventChoice::do_nothing());
        }
        choices
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    definitions: BTreeMap<EventKind, EventDefinition>,
}

#[derive(Deserialize)]
struct CatalogFile {
    events: Vec<EventDefinition>,
}

impl EventCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: EventKind) -> Option<&EventDefinition> {
        self.definitions.get(&kind)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &EventDefinition> {
        self.definitions.values()
    }

    pub fn insert(&mut self, def: EventDefinition) -> Result<(), CatalogError> {
        let mut seen = BTreeSet::new();
        for choice in &def.choices {
            if choice.is_do_nothing() {
                return Err(CatalogError::ReservedChoice {
                    event: def.name.clone(),
                    choice: choice.id.clone(),
                });
            }
            if !seen.insert(choice.id.as_str()) {
                return Err(CatalogError::DuplicateChoice {
                    event: def.name.clone(),
                    choice: choice.id.clone(),
                });
            }
        }
        self.definitions.insert(def.kind, def);
        Ok(())
    }

    /// Content pack in the form `{"events": [ ... ]}`. Later entries replace
    /// earlier ones of the same kind.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Self::empty();
        for def in file.events {
            catalog.insert(def)?;
        }
        Ok(catalog)
    }

    /// The built-in shock set.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        for def in standard_definitions() {
            if let Err(err) = catalog.insert(def) {
                tracing::warn!("skipping built-in event: {}", err);
            }
        }
        catalog
    }
}

fn define(kind: EventKind, name: &str, description: &str, weight: f64, effects: EffectTable) -> EventDefinition {
    EventDefinition {
        kind,
        name: name.to_string(),
        description: description.to_string(),
        effects,
        choices: Vec::new(),
        weight,
    }
}

fn standard_definitions() -> Vec<EventDefinition> {
    let mut bubble = define(
        EventKind::FinancialBubble,
        "Financial Bubble",
        "Asset prices are detaching from fundamentals.",
        1.0,
        EffectTable {
            duration: 40,
            sector: Some(Sector::Housing),
            price_pressure: 0.01,
            wealth_drift: 0.002,
            immediate_wealth: 0.05,
            ..EffectTable::default()
        },
    );
    bubble.choices = vec![
        EventChoice::new("raise_rates", "Raise interest rates to cool speculation")
            .policy("interest_rate", PolicyValue::Number(0.12))
            .overrides(EffectOverrides {
                duration: Some(20),
                wealth_drift: Some(0.0),
                ..EffectOverrides::default()
            }),
        EventChoice::new("regulate", "Tighten lending standards")
            .debt(2_000.0)
            .overrides(EffectOverrides {
                price_pressure: Some(0.0),
                wealth_drift: Some(0.0005),
                ..EffectOverrides::default()
            }),
        EventChoice::new("let_it_ride", "Let the market run")
            .overrides(EffectOverrides {
                wealth_drift: Some(0.004),
                ..EffectOverrides::default()
            })
            .follow_up(EventKind::BankRun, 80),
    ];

    let mut bank_run = define(
        EventKind::BankRun,
        "Bank Run",
        "Depositors are lining up to withdraw everything.",
        0.5,
        EffectTable {
            duration: 30,
            bank_drain: 0.05,
            layoff_chance: 0.004,
            unrest: 0.004,
            immediate_wealth: -0.1,
            ..EffectTable::default()
        },
    );
    bank_run.choices = vec![
        EventChoice::new("bailout", "Bail out the banks")
            .debt(20_000.0)
            .overrides(EffectOverrides {
                duration: Some(10),
                bank_drain: Some(0.0),
                immediate_wealth: Some(-0.02),
                ..EffectOverrides::default()
            }),
        EventChoice::new("deposit_guarantee", "Guarantee deposits")
            .debt(8_000.0)
            .overrides(EffectOverrides {
                bank_drain: Some(0.01),
                unrest: Some(0.001),
                ..EffectOverrides::default()
            }),
    ];

    let mut pandemic = define(
        EventKind::Pandemic,
        "Pandemic",
        "A novel disease is spreading through the population.",
        0.6,
        EffectTable {
            duration: 50,
            death_risk: 0.0004,
            productivity: -0.25,
            health_drift: -0.002,
            demand_shift: -0.1,
            ..EffectTable::default()
        },
    );
    pandemic.choices = vec![
        EventChoice::new("lockdown", "Order a lockdown")
            .debt(5_000.0)
            .overrides(EffectOverrides {
                duration: Some(30),
                death_risk: Some(0.0001),
                productivity: Some(-0.45),
                ..EffectOverrides::default()
            }),
        EventChoice::new("stimulus", "Send relief checks")
            .policy("helicopter_money", PolicyValue::Flag(true))
            .overrides(EffectOverrides {
                demand_shift: Some(0.0),
                ..EffectOverrides::default()
            }),
        EventChoice::new("herd_immunity", "Keep the economy open").overrides(EffectOverrides {
            death_risk: Some(0.0008),
            productivity: Some(-0.1),
            ..EffectOverrides::default()
        }),
    ];

    let breakthrough = define(
        EventKind::TechBreakthrough,
        "Tech Breakthrough",
        "A new general-purpose technology boosts output.",
        1.0,
        EffectTable {
            duration: 60,
            sector: Some(Sector::Tech),
            productivity: 0.2,
            price_pressure: -0.01,
            layoff_chance: 0.001,
            ..EffectTable::default()
        },
    );

    let mut drought = define(
        EventKind::Drought,
        "Drought",
        "Harvests are failing across the country.",
        0.8,
        EffectTable {
            duration: 30,
            sector: Some(Sector::Food),
            productivity: -0.4,
            price_pressure: 0.02,
            happiness_drift: -0.001,
            ..EffectTable::default()
        },
    );
    drought.choices = vec![
        EventChoice::new("subsidize_farms", "Subsidize farmers")
            .debt(6_000.0)
            .overrides(EffectOverrides {
                price_pressure: Some(0.005),
                ..EffectOverrides::default()
            }),
        EventChoice::new("import_food", "Drop tariffs and import food")
            .policy("tariff", PolicyValue::Number(0.0))
            .overrides(EffectOverrides {
                price_pressure: Some(0.004),
                ..EffectOverrides::default()
            }),
    ];

    let energy = define(
        EventKind::EnergyCrisis,
        "Energy Crisis",
        "Fuel shortages push up costs everywhere.",
        0.7,
        EffectTable {
            duration: 40,
            price_pressure: 0.01,
            productivity: -0.1,
            immediate_price: 0.05,
            ..EffectTable::default()
        },
    );

    let mut strike = define(
        EventKind::GeneralStrike,
        "General Strike",
        "Workers have walked off the job nationwide.",
        0.3,
        EffectTable {
            duration: 20,
            productivity: -0.5,
            unrest: 0.002,
            capital_drift: -0.002,
            ..EffectTable::default()
        },
    );
    strike.choices = vec![
        EventChoice::new("negotiate", "Negotiate a higher minimum wage")
            .policy("minimum_wage", PolicyValue::Number(12.0))
            .overrides(EffectOverrides {
                duration: Some(10),
                productivity: Some(-0.1),
                ..EffectOverrides::default()
            }),
        EventChoice::new("break_strike", "Break the strike")
            .overrides(EffectOverrides {
                duration: Some(15),
                unrest: Some(0.01),
                ..EffectOverrides::default()
            })
            .follow_up(EventKind::GeneralStrike, 60),
    ];

    let mut trade_war = define(
        EventKind::TradeWar,
        "Trade War",
        "A major partner has slapped tariffs on our exports.",
        0.5,
        EffectTable {
            duration: 40,
            price_pressure: 0.008,
            demand_shift: -0.05,
            ..EffectTable::default()
        },
    );
    trade_war.choices = vec![
        EventChoice::new("retaliate", "Retaliate with tariffs")
            .policy("tariff", PolicyValue::Number(0.3))
            .overrides(EffectOverrides {
                duration: Some(60),
                ..EffectOverrides::default()
            })
            .follow_up(EventKind::EnergyCrisis, 40),
        EventChoice::new("concede", "Negotiate concessions")
            .debt(3_000.0)
            .overrides(EffectOverrides {
                duration: Some(15),
                ..EffectOverrides::default()
            }),
    ];

    vec![bubble, bank_run, pandemic, breakthrough, drought, energy, strike, trade_war]
}
