use slotmap::SlotMap;

use crate::agents::{Agent, Bank};
use crate::events::EventShocks;
use crate::market::{GlobalEconomy, Market};
use crate::policy::{Government, PolicyState};
use crate::production::Business;
use crate::types::{AgentId, BusinessId, EmploymentState, Tick};

// ============================================================================
// World - Everything the step pipeline mutates
// ============================================================================

#[derive(Debug, Clone)]
pub struct World {
    pub tick: Tick,
    pub agents: SlotMap<AgentId, Agent>,
    pub businesses: SlotMap<BusinessId, Business>,
    pub banks: Vec<Bank>,
    pub market: Market,
    pub global: GlobalEconomy,
    pub policy: PolicyState,
    pub government: Government,
    /// Aggregated market effects of active events, consumed next tick.
    pub shocks: EventShocks,
    /// Unemployed share of seekers plus workers at the last labor clearing.
    pub labor_slack: f64,
    next_seq: u64,
}

impl World {
    pub fn new() -> Self {
        Self {
            tick: 0,
            agents: SlotMap::with_key(),
            businesses: SlotMap::with_key(),
            banks: Vec::new(),
            market: Market::new(),
            global: GlobalEconomy::new(),
            policy: PolicyState::default(),
            government: Government::default(),
            shocks: EventShocks::default(),
            labor_slack: 0.1,
            next_seq: 0,
        }
    }

    // === Agents ===

    /// Insert an agent and stamp it with the next creation sequence number.
    pub fn add_agent(&mut self, build: impl FnOnce(AgentId) -> Agent) -> AgentId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.agents.insert_with_key(|k| {
            let mut agent = build(k);
            agent.seq = seq;
            agent
        })
    }

    pub fn living_agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values().filter(|a| a.alive())
    }

    pub fn population(&self) -> usize {
        self.living_agents().count()
    }

    // === Businesses ===

    pub fn add_business(&mut self, build: impl FnOnce(BusinessId) -> Business) -> BusinessId {
        self.businesses.insert_with_key(build)
    }

    pub fn living_businesses(&self) -> impl Iterator<Item = &Business> {
        self.businesses.values().filter(|b| b.alive)
    }

    /// Put `agent` on `business`'s payroll. Both sides are updated together.
    pub fn employ(&mut self, agent: AgentId, business: BusinessId, wage: f64, log_cap: usize) -> bool {
        let tick = self.tick;
        let Some(b) = self.businesses.get_mut(business) else {
            return false;
        };
        let Some(a) = self.agents.get_mut(agent) else {
            return false;
        };
        if !b.alive || !a.alive() {
            return false;
        }
        b.employees.insert(agent);
        a.hire(business, wage, tick, log_cap);
        true
    }

    /// Take `agent` off its employer's payroll and make it unemployed.
    pub fn dismiss(&mut self, agent: AgentId, reason: &str, log_cap: usize) {
        let tick = self.tick;
        let Some(a) = self.agents.get_mut(agent) else {
            return;
        };
        if let Some(employer) = a.employer.filter(|_| a.employment == EmploymentState::Working) {
            if let Some(b) = self.businesses.get_mut(employer) {
                b.employees.remove(&agent);
            }
            a.separate(tick, reason, log_cap);
        }
    }

    /// Agents the labor market may hire from.
    pub fn job_seekers(&self) -> Vec<AgentId> {
        self.agents
            .iter()
            .filter(|(_, a)| a.seeking_work())
            .map(|(id, _)| id)
            .collect()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
