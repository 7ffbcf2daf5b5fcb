use rand::Rng;

use crate::config::SimConfig;
use crate::types::{AgentId, BusinessId, EmploymentState, PerSector, Sector, finite_or};
use crate::world::World;

use super::catalog::EffectTable;
use super::system::EventInstance;

// === MARKET SHOCKS ===

/// Multipliers the active events impose on the market, 1.0 meaning no effect.
#[derive(Debug, Clone, PartialEq)]
pub struct EventShocks {
    pub price: PerSector<f64>,
    pub demand: PerSector<f64>,
    pub productivity: PerSector<f64>,
}

impl Default for EventShocks {
    fn default() -> Self {
        Self {
            price: PerSector::splat(1.0),
            demand: PerSector::splat(1.0),
            productivity: PerSector::splat(1.0),
        }
    }
}

fn targets(effects: &EffectTable) -> Vec<Sector> {
    match effects.sector {
        Some(s) => vec![s],
        None => Sector::ALL.to_vec(),
    }
}

impl EventShocks {
    pub fn from_active(active: &[EventInstance]) -> Self {
        let mut shocks = Self::default();
        for e in active {
            let fx = &e.effects;
            for s in targets(fx) {
                shocks.price.scale(s, (1.0 + fx.price_pressure).max(0.0));
                shocks.demand.scale(s, (1.0 + fx.demand_shift).max(0.0));
                shocks.productivity.scale(s, (1.0 + fx.productivity).max(0.0));
            }
        }
        shocks
    }
}

// === IMMEDIATE EFFECTS ===

/// One-time effects applied when an event becomes active. Wealth and capital
/// changes are proportional to positive balances only, so debt is never
/// deepened by an event.
pub fn apply_immediate(world: &mut World, effects: &EffectTable, config: &SimConfig) {
    if effects.immediate_wealth != 0.0 {
        let factor = (1.0 + effects.immediate_wealth).max(0.0);
        for a in world.agents.values_mut().filter(|a| a.alive() && a.wealth > 0.0) {
            a.wealth *= factor;
        }
    }
    if effects.immediate_capital != 0.0 {
        let factor = (1.0 + effects.immediate_capital).max(0.0);
        for b in world.businesses.values_mut().filter(|b| b.alive && b.capital > 0.0) {
            b.capital *= factor;
        }
    }
    if effects.immediate_price != 0.0 {
        world.market.shock(
            effects.sector,
            (1.0 + effects.immediate_price).max(0.0),
            config.price_floor,
        );
    }
}

// === ONGOING EFFECTS ===

/// Combined per-tick household and balance-sheet effects of all active events.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Ongoing {
    wealth_drift: f64,
    capital_drift: f64,
    happiness: f64,
    health: f64,
    unrest: f64,
    layoff_chance: f64,
    death_risk: f64,
    bank_drain: f64,
}

impl Ongoing {
    fn sum(active: &[EventInstance]) -> Self {
        let mut o = Self::default();
        for e in active {
            let fx = &e.effects;
            o.wealth_drift += fx.wealth_drift;
            o.capital_drift += fx.capital_drift;
            o.happiness += fx.happiness_drift;
            o.health += fx.health_drift;
            o.unrest += fx.unrest;
            o.layoff_chance += fx.layoff_chance;
            o.death_risk += fx.death_risk;
            o.bank_drain += fx.bank_drain;
        }
        o
    }
}

#[derive(Debug, Clone, Default)]
pub struct OngoingOutcome {
    pub layoffs: Vec<(AgentId, BusinessId)>,
    pub deaths: Vec<AgentId>,
}

/// Apply the active events' per-tick effects. Layoffs take effect
/// immediately; payroll and estate cleanup for the dead is left to the
/// lifecycle pass.
pub fn apply_ongoing<R: Rng>(
    world: &mut World,
    active: &[EventInstance],
    config: &SimConfig,
    rng: &mut R,
) -> OngoingOutcome {
    let mut outcome = OngoingOutcome::default();
    let o = Ongoing::sum(active);
    if o == Ongoing::default() {
        return outcome;
    }

    let tick = world.tick;
    let cap = config.life_log_cap;
    let wealth_factor = finite_or((1.0 + o.wealth_drift).max(0.0), 1.0);
    let layoff_p = o.layoff_chance.clamp(0.0, 1.0);
    let death_p = o.death_risk.clamp(0.0, 1.0);

    let ids: Vec<AgentId> = world.agents.keys().collect();
    for id in ids {
        let Some(a) = world.agents.get_mut(id) else {
            continue;
        };
        if !a.alive() {
            continue;
        }
        if a.wealth > 0.0 {
            a.wealth *= wealth_factor;
        }
        a.happiness = (a.happiness + o.happiness).clamp(0.0, 1.0);
        a.health = (a.health + o.health).clamp(0.0, 1.0);
        a.unrest = (a.unrest + o.unrest).clamp(0.0, 1.0);

        if death_p > 0.0 && rng.random_bool(death_p) {
            a.kill(tick, "died during a crisis", cap);
            outcome.deaths.push(id);
            continue;
        }
        if layoff_p > 0.0 && a.employment == EmploymentState::Working && rng.random_bool(layoff_p) {
            if let Some(employer) = a.employer {
                outcome.layoffs.push((id, employer));
            }
        }
    }

    for &(agent, _) in &outcome.layoffs {
        world.dismiss(agent, "laid off in a crisis", cap);
    }

    if o.capital_drift != 0.0 {
        let factor = (1.0 + o.capital_drift).max(0.0);
        for b in world.businesses.values_mut().filter(|b| b.alive && b.capital > 0.0) {
            b.capital *= factor;
        }
    }
    if o.bank_drain > 0.0 {
        for bank in world.banks.iter_mut() {
            bank.drain(o.bank_drain);
        }
    }

    outcome
}
