use std::collections::BTreeSet;

use crate::config::SimConfig;
use crate::market::Market;
use crate::policy::PolicyState;
use crate::types::{AgentId, BusinessId, PerSector, Sector, Tick, finite_or};

// === CONSTANTS ===

/// Wage every flat-wage employer pays, before the minimum-wage floor.
pub const FLAT_WAGE: f64 = 18.0;
/// Fixed cost of keeping the doors open each tick.
const OVERHEAD: f64 = 4.0;
const CAPACITY_UPKEEP: f64 = 0.4;
const EXPANSION_COST: f64 = 500.0;
const AUTOMATION_COST: f64 = 300.0;
const AUTOMATION_STEP: f64 = 0.02;
pub const MAX_AUTOMATION: f64 = 0.8;
pub const MAX_CAPACITY: usize = 40;
/// Largest per-tick move of the wage offer toward its target.
const WAGE_STEP: f64 = 0.02;
/// Capital below which a losing business starts laying people off.
const DISTRESS_CAPITAL: f64 = -1_000.0;

// === WORKFORCE ===

/// Living employees as seen by the orchestrator this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Workforce {
    pub headcount: usize,
    /// Skill-weighted labor: each worker counts `0.5 + skill`.
    pub effective: f64,
}

impl Workforce {
    pub fn add_worker(&mut self, skill: f64) {
        self.headcount += 1;
        self.effective += 0.5 + skill.clamp(0.0, 1.0);
    }
}

// === BUSINESS ===

#[derive(Debug, Clone)]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
    pub sector: Sector,
    pub position: (f32, f32),
    pub capital: f64,
    pub productivity: f64,
    /// Share of output produced by machines, in [0, MAX_AUTOMATION].
    pub automation: f64,
    pub wage_offered: f64,
    pub employees: BTreeSet<AgentId>,
    pub capacity: usize,
    pub output: f64,
    pub last_revenue: f64,
    /// Gross profit before policy deductions.
    pub last_profit: f64,
    /// Share of sector employment and capital. Recomputed at lifecycle passes.
    pub dominance: f64,
    pub owner: Option<AgentId>,
    pub nationalized: bool,
    pub flat_wage: bool,
    /// Consecutive ticks with no living employees.
    pub idle_ticks: u32,
    pub founded: Tick,
    pub alive: bool,
}

pub struct BusinessContext<'a> {
    pub config: &'a SimConfig,
    pub policy: &'a PolicyState,
    pub market: &'a Market,
    /// Multiplier on output per sector (events).
    pub productivity_shock: &'a PerSector<f64>,
    /// Unemployed share of the labor force at the last clearing.
    pub labor_slack: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusinessOutcome {
    /// Number of workers to let go, least skilled first.
    pub layoffs: usize,
    /// Paid to the owner out of capital.
    pub dividend: f64,
    pub expanded: bool,
    pub automated: bool,
}

impl Business {
    pub fn new(id: BusinessId, sector: Sector, capital: f64) -> Self {
        Self {
            id,
            name: format!("{} co.", sector.name()),
            sector,
            position: (0.0, 0.0),
            capital,
            productivity: 1.0,
            automation: 0.0,
            wage_offered: sector.base_wage(),
            employees: BTreeSet::new(),
            capacity: 6,
            output: 0.0,
            last_revenue: 0.0,
            last_profit: 0.0,
            dominance: 0.0,
            owner: None,
            nationalized: false,
            flat_wage: false,
            idle_ticks: 0,
            founded: 0,
            alive: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_owner(mut self, owner: AgentId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = (x, y);
        self
    }

    pub fn founded_at(mut self, tick: Tick) -> Self {
        self.founded = tick;
        self
    }

    pub fn open_positions(&self) -> usize {
        self.capacity.saturating_sub(self.employees.len())
    }

    /// Units this business would produce with the given workforce at full demand.
    pub fn potential_output(&self, workforce: &Workforce) -> f64 {
        if workforce.headcount == 0 {
            return 0.0;
        }
        self.productivity
            * (1.0 + self.automation)
            * self.sector.labor_yield()
            * workforce.effective.powf(0.9)
    }

    /// Produce, sell, pay wages and costs, then revise the wage offer and
    /// investment. Bankruptcy is not decided here.
    pub fn tick(&mut self, ctx: &BusinessContext, workforce: &Workforce) -> BusinessOutcome {
        let mut outcome = BusinessOutcome::default();
        if !self.alive {
            return outcome;
        }

        if workforce.headcount == 0 {
            self.idle_ticks += 1;
        } else {
            self.idle_ticks = 0;
        }

        let ratio = ctx.market.demand_ratio(self.sector);
        let throttle = ratio.clamp(0.5, 1.0).sqrt();
        let shock = finite_or(ctx.productivity_shock.get(self.sector), 1.0).max(0.0);
        self.output = finite_or(self.potential_output(workforce) * throttle * shock, 0.0);

        let sold = self.output * ratio.min(1.0);
        let revenue = sold * ctx.market.price(self.sector);
        let wage_bill = self.wage_offered * workforce.headcount as f64;
        let upkeep = OVERHEAD
            + CAPACITY_UPKEEP * self.capacity as f64
            + 0.0005 * self.automation * self.capital.max(0.0);
        let carry = if self.capital < 0.0 {
            -self.capital * ctx.config.per_tick(ctx.policy.interest_rate.max(0.0))
        } else {
            0.0
        };

        self.last_revenue = finite_or(revenue, 0.0);
        self.last_profit = finite_or(revenue - wage_bill - upkeep - carry, 0.0);
        self.capital += self.last_profit;

        self.adjust_wage(ctx);

        if self.nationalized {
            return outcome;
        }

        // Distress: shed one worker per tick while deep in the red
        if self.capital < DISTRESS_CAPITAL && self.last_profit < 0.0 && workforce.headcount > 0 {
            outcome.layoffs = 1;
        }

        // Growth
        if self.employees.len() >= self.capacity
            && self.capacity < MAX_CAPACITY
            && self.capital > EXPANSION_COST * 3.0
            && self.last_profit > 0.0
        {
            self.capacity += 1;
            self.capital -= EXPANSION_COST;
            outcome.expanded = true;
        }
        let labor_is_dear = self.wage_offered > self.sector.base_wage() * 1.3;
        if labor_is_dear
            && self.automation < MAX_AUTOMATION
            && self.capital > AUTOMATION_COST * 10.0
        {
            self.automation = (self.automation + AUTOMATION_STEP).min(MAX_AUTOMATION);
            self.capital -= AUTOMATION_COST;
            outcome.automated = true;
        }

        if self.owner.is_some() && self.last_profit > 0.0 && self.capital > ctx.config.business_seed_capital
        {
            outcome.dividend = self.last_profit * 0.5;
            self.capital -= outcome.dividend;
        }

        outcome
    }

    /// Wage the business aims for given labor scarcity and its own fortunes.
    pub fn target_wage(&self, ctx: &BusinessContext) -> f64 {
        let slack = ctx.labor_slack.clamp(0.0, 1.0);
        let scarcity = (0.8 + 0.04 / (slack + 0.05)).clamp(0.8, 1.6);
        let mut target = self.sector.base_wage() * scarcity * (ctx.market.cpi / 100.0);
        if self.open_positions() > 0 && self.capital > 0.0 {
            target *= 1.05;
        }
        if self.last_profit < 0.0 {
            target *= 0.95;
        }
        finite_or(target, self.sector.base_wage())
    }

    fn adjust_wage(&mut self, ctx: &BusinessContext) {
        let floor = ctx.policy.minimum_wage.max(0.0);
        if ctx.policy.flat_wage || self.flat_wage {
            self.wage_offered = FLAT_WAGE.max(floor);
            return;
        }
        let target = self.target_wage(ctx);
        let lo = self.wage_offered * (1.0 - WAGE_STEP);
        let hi = self.wage_offered * (1.0 + WAGE_STEP);
        self.wage_offered = target.clamp(lo, hi).max(floor);
    }

    /// Bankrupt when capital sinks below the floor or the business has had
    /// no workers for longer than the grace period. State-run firms never fail.
    pub fn is_insolvent(&self, config: &SimConfig, policy: &PolicyState) -> bool {
        if self.nationalized {
            return false;
        }
        self.capital < config.bankruptcy_capital_floor
            || self.idle_ticks as f64 > policy.bankruptcy_grace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn business(sector: Sector, capital: f64) -> Business {
        let mut keys: SlotMap<BusinessId, ()> = SlotMap::with_key();
        Business::new(keys.insert(()), sector, capital)
    }

    fn workforce(n: usize, skill: f64) -> Workforce {
        let mut w = Workforce::default();
        for _ in 0..n {
            w.add_worker(skill);
        }
        w
    }

    struct Fixture {
        config: SimConfig,
        policy: PolicyState,
        market: Market,
        shock: PerSector<f64>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: SimConfig::default(),
                policy: PolicyState::default(),
                market: Market::new(),
                shock: PerSector::splat(1.0),
            }
        }

        fn ctx(&self) -> BusinessContext<'_> {
            BusinessContext {
                config: &self.config,
                policy: &self.policy,
                market: &self.market,
                productivity_shock: &self.shock,
                labor_slack: 0.1,
            }
        }
    }

    #[test]
    fn more_workers_more_output() {
        let b = business(Sector::Food, 1000.0);
        let small = b.potential_output(&workforce(2, 0.5));
        let large = b.potential_output(&workforce(8, 0.5));
        assert!(large > small);
        assert_eq!(b.potential_output(&Workforce::default()), 0.0);
    }

    #[test]
    fn idle_business_counts_idle_ticks() {
        let fx = Fixture::new();
        let mut b = business(Sector::Tech, 1000.0);
        for _ in 0..3 {
            b.tick(&fx.ctx(), &Workforce::default());
        }
        assert_eq!(b.idle_ticks, 3);
        assert_eq!(b.output, 0.0);
        assert!(b.capital < 1000.0);
    }

    #[test]
    fn wage_respects_minimum_wage() {
        let mut fx = Fixture::new();
        fx.policy.minimum_wage = 60.0;
        let mut b = business(Sector::Food, 1000.0);
        b.tick(&fx.ctx(), &workforce(3, 0.5));
        assert!(b.wage_offered >= 60.0);
    }

    #[test]
    fn wage_moves_gradually() {
        let fx = Fixture::new();
        let mut b = business(Sector::Food, 1000.0);
        b.wage_offered = 100.0;
        b.tick(&fx.ctx(), &workforce(3, 0.5));
        assert!(b.wage_offered >= 98.0 - 1e-9);
    }

    #[test]
    fn flat_wage_policy_sets_offer() {
        let mut fx = Fixture::new();
        fx.policy.flat_wage = true;
        let mut b = business(Sector::Tech, 1000.0);
        b.tick(&fx.ctx(), &workforce(3, 0.5));
        assert_eq!(b.wage_offered, FLAT_WAGE);
    }

    #[test]
    fn insolvency_rules() {
        let fx = Fixture::new();
        let mut b = business(Sector::Food, -10_000.0);
        assert!(b.is_insolvent(&fx.config, &fx.policy));

        b.capital = 100.0;
        b.idle_ticks = fx.policy.bankruptcy_grace as u32 + 1;
        assert!(b.is_insolvent(&fx.config, &fx.policy));

        b.nationalized = true;
        assert!(!b.is_insolvent(&fx.config, &fx.policy));
    }

    #[test]
    fn deep_losses_trigger_layoffs() {
        let fx = Fixture::new();
        let mut b = business(Sector::Luxury, -3_000.0);
        b.wage_offered = 90.0;
        let outcome = b.tick(&fx.ctx(), &workforce(5, 0.2));
        assert_eq!(outcome.layoffs, 1);
    }

    #[test]
    fn productivity_shock_scales_output() {
        let mut fx = Fixture::new();
        let mut normal = business(Sector::Food, 1000.0);
        normal.tick(&fx.ctx(), &workforce(4, 0.5));
        fx.shock.set(Sector::Food, 0.5);
        let mut shocked = business(Sector::Food, 1000.0);
        shocked.tick(&fx.ctx(), &workforce(4, 0.5));
        assert!((shocked.output - normal.output * 0.5).abs() < 1e-9);
    }
}
