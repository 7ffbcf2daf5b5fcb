use serde::Serialize;
use tsify_next::Tsify;

use crate::agents::{Agent, Bank};
use crate::config::SimConfig;
use crate::events::{EventInstance, EventKind, EventNotice, ScheduledEvent};
use crate::market::{GlobalEconomy, GlobalPoint, SectorMarket};
use crate::metrics::{Metrics, ScoreReport};
use crate::policy::{Government, PolicyEntry};
use crate::production::Business;
use crate::types::{EmploymentState, KeyToU64, Sector, SocialClass, Tick};

// ============================================================================
// Snapshot - Public view of the engine for the host
// ============================================================================

#[derive(Debug, Clone, Serialize, Tsify)]
#[tsify(into_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub tick: Tick,
    pub year: i32,
    pub scenario: String,
    pub paused: bool,
    pub speed: f64,
    pub agents: Vec<AgentView>,
    pub businesses: Vec<BusinessView>,
    pub metrics: Metrics,
    pub market: Vec<SectorMarket>,
    pub policy: Vec<PolicyEntry>,
    pub government: Government,
    pub banks: Vec<Bank>,
    pub active_events: Vec<ActiveEventView>,
    pub pending_event: Option<EventNotice>,
    pub scheduled_events: Vec<ScheduledEvent>,
    pub global: GlobalView,
    pub report: Option<ScoreReport>,
}

#[derive(Debug, Clone, Serialize, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub age_years: f64,
    pub alive: bool,
    pub employment: EmploymentState,
    pub employer: Option<u64>,
    pub class: SocialClass,
    pub wealth: f64,
    pub wage: f64,
    pub skill: f64,
    pub education: f64,
    pub health: f64,
    pub happiness: f64,
    pub unrest: f64,
    pub credit_score: f64,
    pub debt: f64,
    pub life_events: Vec<String>,
}

impl AgentView {
    pub fn new(a: &Agent, config: &SimConfig) -> Self {
        Self {
            id: a.id.to_u64(),
            x: a.position.0,
            y: a.position.1,
            age_years: a.age_years(config),
            alive: a.alive(),
            employment: a.employment,
            employer: a.employer.map(KeyToU64::to_u64),
            class: a.class,
            wealth: a.wealth,
            wage: a.wage,
            skill: a.skill,
            education: a.education,
            health: a.health,
            happiness: a.happiness,
            unrest: a.unrest,
            credit_score: a.credit_score,
            debt: a.debt(),
            life_events: a.life_events().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct BusinessView {
    pub id: u64,
    pub name: String,
    pub sector: Sector,
    pub x: f32,
    pub y: f32,
    pub capital: f64,
    pub employees: usize,
    pub capacity: usize,
    pub wage_offered: f64,
    pub output: f64,
    pub revenue: f64,
    pub profit: f64,
    pub automation: f64,
    pub dominance: f64,
    pub owner: Option<u64>,
    pub nationalized: bool,
}

impl From<&Business> for BusinessView {
    fn from(b: &Business) -> Self {
        Self {
            id: b.id.to_u64(),
            name: b.name.clone(),
            sector: b.sector,
            x: b.position.0,
            y: b.position.1,
            capital: b.capital,
            employees: b.employees.len(),
            capacity: b.capacity,
            wage_offered: b.wage_offered,
            output: b.output,
            revenue: b.last_revenue,
            profit: b.last_profit,
            automation: b.automation,
            dominance: b.dominance,
            owner: b.owner.map(KeyToU64::to_u64),
            nationalized: b.nationalized,
        }
    }
}

#[derive(Debug, Clone, Serialize, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEventView {
    pub id: u64,
    pub kind: EventKind,
    pub name: String,
    pub started: Tick,
    /// `None` for permanent events.
    pub remaining: Option<Tick>,
    pub chosen: Option<String>,
}

impl ActiveEventView {
    pub fn new(e: &EventInstance, now: Tick) -> Self {
        Self {
            id: e.id,
            kind: e.kind,
            name: e.name.clone(),
            started: e.started,
            remaining: e.remaining(now),
            chosen: e.chosen.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct GlobalView {
    pub fx_rate: f64,
    pub reserves: f64,
    pub trade_balance: f64,
    pub tariff_revenue: f64,
    pub imports: Vec<f64>,
    pub exports: Vec<f64>,
    pub history: Vec<GlobalPoint>,
}

impl From<&GlobalEconomy> for GlobalView {
    fn from(g: &GlobalEconomy) -> Self {
        Self {
            fx_rate: g.fx_rate,
            reserves: g.reserves,
            trade_balance: g.trade_balance,
            tariff_revenue: g.tariff_revenue,
            imports: g.imports.0.to_vec(),
            exports: g.exports.0.to_vec(),
            history: g.history().copied().collect(),
        }
    }
}
