use std::collections::VecDeque;

use rand::Rng;

use crate::agents::credit::{
    LENDING_SCORE, Loan, MAX_CREDIT_SCORE, MIN_CREDIT_SCORE, START_CREDIT_SCORE,
};
use crate::config::SimConfig;
use crate::market::Market;
use crate::mortality::{MortalityOutcome, check_death};
use crate::policy::PolicyState;
use crate::types::{AgentId, BankId, BusinessId, EmploymentState, PerSector, Sector, SocialClass, Tick};

// === CONSTANTS ===

/// Wealth above which sumptuary laws cap luxury consumption.
pub const SUMPTUARY_THRESHOLD: f64 = 5_000.0;

// === FLAGS ===

/// Per-step intentions. Cleared at the start of every agent tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AgentFlags {
    pub wants_business: bool,
    pub sumptuary_limited: bool,
}

// === AGENT ===

#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    /// Order of creation within a world. Unlike `id`, never reused.
    pub seq: u64,
    pub position: (f32, f32),
    /// Age in ticks.
    pub age: u32,
    pub skill: f64,
    pub education: f64,
    pub health: f64,
    pub happiness: f64,
    pub wealth: f64,
    /// Wage per tick while working. Mirrors the employer's offer.
    pub wage: f64,
    pub employment: EmploymentState,
    /// Business worked at, or owned when `employment == Owner`.
    pub employer: Option<BusinessId>,
    pub class: SocialClass,
    pub loans: Vec<Loan>,
    pub credit_score: f64,
    pub unrest: f64,
    pub unemployed_ticks: u32,
    pub flags: AgentFlags,
    life_events: VecDeque<String>,
}

/// What an agent tick asks of the rest of the world.
#[derive(Debug, Clone, Default)]
pub struct AgentOutcome {
    pub died: bool,
    /// Employer left this tick (quit or retired).
    pub left_job: Option<BusinessId>,
    /// Units demanded per sector.
    pub consumption: PerSector<f64>,
    pub spending: f64,
    /// Loan payments to route back into bank reserves.
    pub repayments: Vec<(BankId, f64)>,
    pub wants_credit: Option<f64>,
}

/// Read-only world view an agent acts against.
pub struct AgentContext<'a> {
    pub tick: Tick,
    pub config: &'a SimConfig,
    pub policy: &'a PolicyState,
    pub market: &'a Market,
}

impl Agent {
    pub fn new(id: AgentId) -> Self {
        Self {
            id,
            seq: 0,
            position: (0.0, 0.0),
            age: 0,
            skill: 0.3,
            education: 0.3,
            health: 1.0,
            happiness: 0.6,
            wealth: 0.0,
            wage: 0.0,
            employment: EmploymentState::Child,
            employer: None,
            class: SocialClass::Working,
            loans: Vec::new(),
            credit_score: START_CREDIT_SCORE,
            unrest: 0.0,
            unemployed_ticks: 0,
            flags: AgentFlags::default(),
            life_events: VecDeque::new(),
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    pub fn with_wealth(mut self, wealth: f64) -> Self {
        self.wealth = wealth;
        self
    }

    pub fn with_skill(mut self, skill: f64, education: f64) -> Self {
        self.skill = skill.clamp(0.0, 1.0);
        self.education = education.clamp(0.0, 1.0);
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = (x, y);
        self
    }

    pub fn with_employment(mut self, employment: EmploymentState) -> Self {
        self.employment = employment;
        self
    }

    pub fn alive(&self) -> bool {
        self.employment != EmploymentState::Dead
    }

    pub fn is_owner(&self) -> bool {
        self.employment == EmploymentState::Owner
    }

    /// Available to the labor matcher.
    pub fn seeking_work(&self) -> bool {
        self.employment == EmploymentState::Unemployed
    }

    pub fn age_years(&self, config: &SimConfig) -> f64 {
        self.age as f64 / config.ticks_per_year.max(1) as f64
    }

    pub fn debt(&self) -> f64 {
        self.loans.iter().filter(|l| l.active).map(|l| l.principal).sum()
    }

    pub fn life_events(&self) -> impl Iterator<Item = &str> {
        self.life_events.iter().map(String::as_str)
    }

    /// Append to the bounded life log, dropping the oldest entry when full.
    pub fn log_event(&mut self, tick: Tick, text: impl AsRef<str>, cap: usize) {
        self.life_events.push_back(format!("t{}: {}", tick, text.as_ref()));
        while self.life_events.len() > cap {
            self.life_events.pop_front();
        }
    }

    /// Become employed at `business` for `wage`.
    pub fn hire(&mut self, business: BusinessId, wage: f64, tick: Tick, cap: usize) {
        self.employment = EmploymentState::Working;
        self.employer = Some(business);
        self.wage = wage;
        self.unemployed_ticks = 0;
        self.log_event(tick, format!("hired at {:.1}/tick", wage), cap);
    }

    /// Lose a job without leaving the labor force.
    pub fn separate(&mut self, tick: Tick, reason: &str, cap: usize) {
        if self.employment == EmploymentState::Working {
            self.employment = EmploymentState::Unemployed;
        }
        self.employer = None;
        self.wage = 0.0;
        self.log_event(tick, reason, cap);
    }

    pub fn kill(&mut self, tick: Tick, cause: &str, cap: usize) {
        if !self.alive() {
            return;
        }
        self.employment = EmploymentState::Dead;
        self.wage = 0.0;
        self.log_event(tick, cause, cap);
    }

    /// Advance one tick: aging, income, consumption, loans, drift and a
    /// mortality roll. Dead agents are left untouched.
    pub fn tick<R: Rng>(&mut self, ctx: &AgentContext, rng: &mut R) -> AgentOutcome {
        let mut outcome = AgentOutcome::default();
        if !self.alive() {
            return outcome;
        }
        let cfg = ctx.config;
        let cap = cfg.life_log_cap;
        self.flags = AgentFlags::default();

        self.age = (self.age + 1).min(cfg.max_age_ticks());
        self.transition_by_age(ctx.tick, cfg, &mut outcome);

        if self.employment == EmploymentState::Working {
            self.wealth += self.wage;
        }

        self.consume(ctx, &mut outcome);
        self.service_loans(cfg.per_tick(ctx.policy.interest_rate), &mut outcome);
        self.drift(ctx);

        if self.employment == EmploymentState::Unemployed {
            self.unemployed_ticks += 1;
        } else {
            self.unemployed_ticks = 0;
        }

        // Essentials pushed wealth below zero: try to borrow instead.
        if self.wealth < 0.0 && self.credit_score >= LENDING_SCORE {
            outcome.wants_credit = Some(-self.wealth);
        }

        // Miserable but solvent workers occasionally walk out.
        if self.employment == EmploymentState::Working
            && self.happiness < 0.15
            && self.wealth > 20.0 * self.wage
            && rng.random_bool(0.01)
        {
            outcome.left_job = self.employer;
            self.separate(ctx.tick, "quit", cap);
        }

        let adult = self.age >= cfg.working_age_ticks() + cfg.ticks_for_years(4.0);
        if adult
            && matches!(self.employment, EmploymentState::Working | EmploymentState::Unemployed)
            && self.skill > 0.55
            && self.wealth > cfg.business_seed_capital * 0.25
            && rng.random_bool((0.002 * self.skill).clamp(0.0, 1.0))
        {
            self.flags.wants_business = true;
        }

        let age_years = self.age_years(cfg);
        if check_death(rng, age_years, cfg.max_age_years, self.health, cfg.ticks_per_year)
            == MortalityOutcome::Dies
        {
            outcome.died = true;
            if self.employment == EmploymentState::Working {
                outcome.left_job = self.employer;
            }
            self.kill(ctx.tick, "died", cap);
        }

        outcome
    }

    fn transition_by_age(&mut self, tick: Tick, cfg: &SimConfig, outcome: &mut AgentOutcome) {
        let cap = cfg.life_log_cap;
        match self.employment {
            EmploymentState::Child if self.age >= cfg.working_age_ticks() => {
                self.employment = EmploymentState::Unemployed;
                self.log_event(tick, "entered the workforce", cap);
            }
            EmploymentState::Working | EmploymentState::Unemployed
                if self.age >= cfg.retirement_age_ticks() =>
            {
                if self.employment == EmploymentState::Working {
                    outcome.left_job = self.employer;
                }
                self.employment = EmploymentState::Retired;
                self.employer = None;
                self.wage = 0.0;
                self.log_event(tick, "retired", cap);
            }
            _ => {}
        }
    }

    fn consume(&mut self, ctx: &AgentContext, outcome: &mut AgentOutcome) {
        let wealth_factor = (1.0 + self.wealth.max(0.0) / 1_000.0).ln();
        self.flags.sumptuary_limited =
            ctx.policy.sumptuary_laws && self.wealth > SUMPTUARY_THRESHOLD;

        let mut spent = 0.0;
        for sector in Sector::ALL {
            let price = ctx.market.price(sector);
            let mut units =
                sector.base_consumption() * (1.0 + sector.wealth_elasticity() * wealth_factor);
            let essential = matches!(sector, Sector::Food | Sector::Housing);
            if !essential {
                if self.wealth <= 0.0 {
                    continue;
                }
                let relative = (price / sector.base_price()).clamp(0.1, 10.0);
                units *= relative.powf(-0.5);
                let cost = units * price;
                units *= (self.wealth / (cost * 10.0)).min(1.0);
            }
            if sector == Sector::Luxury && self.flags.sumptuary_limited {
                units = units.min(sector.base_consumption());
            }
            if self.employment == EmploymentState::Child {
                units *= 0.5;
            }
            outcome.consumption.add(sector, units);
            spent += units * price;
        }
        // Children are provided for by their household
        if self.employment != EmploymentState::Child {
            self.wealth -= spent;
            outcome.spending = spent;
        }
    }

    fn service_loans(&mut self, rate: f64, outcome: &mut AgentOutcome) {
        let mut missed = false;
        for loan in self.loans.iter_mut().filter(|l| l.active) {
            let due = loan.installment(rate);
            if self.wealth >= due.total() {
                self.wealth -= due.total();
                loan.amortize(due.amortization);
                outcome.repayments.push((loan.bank, due.total()));
            } else {
                loan.capitalize(due.interest);
                missed = true;
            }
        }
        self.loans.retain(|l| l.active);
        if missed {
            self.credit_score -= 15.0;
        } else if self.wealth > 0.0 {
            self.credit_score += 0.2;
        }
        if self.wealth < 0.0 {
            self.credit_score -= 0.5;
        }
        self.credit_score = self.credit_score.clamp(MIN_CREDIT_SCORE, MAX_CREDIT_SCORE);
    }

    fn drift(&mut self, ctx: &AgentContext) {
        let age_years = self.age_years(ctx.config);

        // Health
        if age_years > 50.0 {
            self.health -= 0.0005 * (age_years - 50.0) / 10.0;
        }
        if self.wealth < 0.0 {
            self.health -= 0.0005;
        } else {
            self.health += 0.0003;
        }
        self.health = self.health.clamp(0.0, 1.0);

        // Happiness eases toward a target set by circumstances
        let status = match self.employment {
            EmploymentState::Working => 0.15,
            EmploymentState::Unemployed => -0.2,
            EmploymentState::Retired => 0.1,
            EmploymentState::Owner => 0.2,
            EmploymentState::Child | EmploymentState::Dead => 0.0,
        };
        let target = 0.5 + status + 0.15 * (self.wealth / 2_000.0).tanh()
            + 0.1 * (self.health - 0.5)
            - 0.1 * self.unrest;
        self.happiness += (target - self.happiness) * 0.05;
        self.happiness = self.happiness.clamp(0.0, 1.0);

        // Unrest accumulates under hardship and decays otherwise
        let mut pressure = -0.15;
        if self.employment == EmploymentState::Unemployed {
            pressure += 0.3;
        }
        if self.wealth < 0.0 {
            pressure += 0.2;
        }
        if self.happiness < 0.3 {
            pressure += 0.2;
        }
        self.unrest = (self.unrest + pressure * 0.02).clamp(0.0, 1.0);

        // Skills
        match self.employment {
            EmploymentState::Working | EmploymentState::Owner => {
                self.skill += 0.0004 * (1.0 - self.skill) * (0.5 + self.education);
            }
            EmploymentState::Unemployed if self.unemployed_ticks > 26 => {
                self.skill -= 0.0002;
            }
            EmploymentState::Child => {
                self.education += 0.002 * (1.0 - self.education);
            }
            _ => {}
        }
        self.skill = self.skill.clamp(0.0, 1.0);
        self.education = self.education.clamp(0.0, 1.0);
    }

    /// Take a loan, crediting the principal to wealth.
    pub fn borrow(&mut self, loan: Loan, tick: Tick, cap: usize) {
        self.wealth += loan.principal;
        self.log_event(tick, format!("borrowed {:.0}", loan.principal), cap);
        self.loans.push(loan);
    }

    /// Clears every loan and returns the outstanding principal per bank.
    pub fn forgive_loans(&mut self) -> Vec<(BankId, f64)> {
        let written_off = self
            .loans
            .iter()
            .filter(|l| l.active)
            .map(|l| (l.bank, l.principal))
            .collect();
        self.loans.clear();
        written_off
    }
}
