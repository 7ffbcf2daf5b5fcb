//! The periodic demographic and corporate pass: purge the dead, close
//! insolvent firms, add births and immigrants, found new firms, and
//! refresh market power.

use rand::Rng;

use crate::agents::{Agent, choose_lender, credit_limit};
use crate::config::SimConfig;
use crate::market::Market;
use crate::mortality::birth_probability;
use crate::production::{Business, recompute_dominance};
use crate::types::{AgentId, BusinessId, EmploymentState, Sector, Tick};
use crate::world::World;

/// Dominance at which nationalization takes a firm into public hands.
pub const NATIONALIZE_DOMINANCE: f64 = 0.25;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleReport {
    pub purged: usize,
    pub births: usize,
    pub immigrants: usize,
    pub bankruptcies: Vec<BusinessId>,
    pub founded: Vec<BusinessId>,
    pub nationalized: usize,
}

pub fn run_lifecycle<R: Rng>(world: &mut World, config: &SimConfig, rng: &mut R) -> LifecycleReport {
    let mut report = LifecycleReport {
        purged: purge_dead(world, config, rng),
        bankruptcies: close_insolvent(world, config),
        ..LifecycleReport::default()
    };
    report.births = births(world, config, rng);
    report.immigrants = immigration(world, config, rng);
    report.founded = form_businesses(world, config);
    recompute_dominance(&mut world.businesses);
    report.nationalized = apply_nationalization(world, config);
    report
}

// === DEATH & INHERITANCE ===

/// Remove dead agents. Loans die with the borrower; a positive estate and
/// any owned firm pass to a random living adult.
fn purge_dead<R: Rng>(world: &mut World, config: &SimConfig, rng: &mut R) -> usize {
    let dead: Vec<AgentId> = world
        .agents
        .iter()
        .filter(|(_, a)| !a.alive())
        .map(|(id, _)| id)
        .collect();

    let mut estates: Vec<(f64, Option<BusinessId>)> = Vec::new();
    for &id in &dead {
        let Some(agent) = world.agents.remove(id) else {
            continue;
        };
        let mut owned = None;
        if let Some(b) = agent.employer.and_then(|b| world.businesses.get_mut(b)) {
            b.employees.remove(&id);
            if b.owner == Some(id) {
                b.owner = None;
                owned = Some(b.id);
            }
        }
        if agent.wealth > 0.0 || owned.is_some() {
            estates.push((agent.wealth.max(0.0), owned));
        }
    }

    let heirs: Vec<AgentId> = world
        .agents
        .iter()
        .filter(|(_, a)| a.alive() && a.employment != EmploymentState::Child)
        .map(|(id, _)| id)
        .collect();
    if heirs.is_empty() {
        return dead.len();
    }
    for (estate, business) in estates {
        let heir = heirs[rng.random_range(0..heirs.len())];
        inherit(world, heir, estate, business, config);
    }
    dead.len()
}

fn inherit(world: &mut World, heir: AgentId, estate: f64, business: Option<BusinessId>, config: &SimConfig) {
    let tick = world.tick;
    let cap = config.life_log_cap;
    if let Some(a) = world.agents.get_mut(heir) {
        if estate > 0.0 {
            a.wealth += estate;
            a.log_event(tick, format!("inherited {:.0}", estate), cap);
        }
    }

    let Some(business) = business else {
        return;
    };
    let takes_over = world
        .agents
        .get(heir)
        .is_some_and(|a| matches!(a.employment, EmploymentState::Working | EmploymentState::Unemployed));
    if !takes_over {
        return;
    }
    world.dismiss(heir, "left work to run an inherited business", cap);
    if let (Some(a), Some(b)) = (world.agents.get_mut(heir), world.businesses.get_mut(business)) {
        a.employment = EmploymentState::Owner;
        a.employer = Some(business);
        a.wage = 0.0;
        b.owner = Some(heir);
        a.log_event(tick, format!("inherited {}", b.name), cap);
    }
}

// === BANKRUPTCY ===

fn close_insolvent(world: &mut World, config: &SimConfig) -> Vec<BusinessId> {
    let tick = world.tick;
    let cap = config.life_log_cap;
    let failing: Vec<BusinessId> = world
        .businesses
        .iter()
        .filter(|(_, b)| !b.alive || b.is_insolvent(config, &world.policy))
        .map(|(id, _)| id)
        .collect();

    for &id in &failing {
        let Some(b) = world.businesses.remove(id) else {
            continue;
        };
        for e in &b.employees {
            if let Some(a) = world.agents.get_mut(*e) {
                a.separate(tick, "business closed", cap);
            }
        }
        if let Some(a) = b.owner.and_then(|o| world.agents.get_mut(o)) {
            if a.is_owner() && a.employer == Some(id) {
                a.employment = EmploymentState::Unemployed;
                a.employer = None;
                a.log_event(tick, format!("{} went bankrupt", b.name), cap);
            }
        }

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "bankruptcy",
            tick = tick,
            sector = b.sector.name(),
            capital = b.capital,
            employees = b.employees.len() as u64,
            idle_ticks = b.idle_ticks as u64,
        );
    }
    failing
}

// === POPULATION ===

fn births<R: Rng>(world: &mut World, config: &SimConfig, rng: &mut R) -> usize {
    let tick = world.tick;
    let cap = config.life_log_cap;
    let parents: Vec<AgentId> = world
        .agents
        .iter()
        .filter(|(_, a)| a.alive() && a.employment != EmploymentState::Child)
        .map(|(id, _)| id)
        .collect();

    let mut population = world.population();
    let mut born = 0;
    for id in parents {
        if population >= config.max_population {
            break;
        }
        let Some(parent) = world.agents.get(id) else {
            continue;
        };
        let p = birth_probability(
            parent.age_years(config),
            parent.happiness,
            parent.wealth,
            config.birth_rate_per_year,
            config.lifecycle_interval as u32,
            config.ticks_per_year,
        );
        if p <= 0.0 || !rng.random_bool(p.clamp(0.0, 1.0)) {
            continue;
        }
        let skill = (parent.skill * 0.5 + rng.random_range(0.0..0.5)).clamp(0.0, 1.0);
        let education = (parent.education * 0.5 + rng.random_range(0.0..0.4)).clamp(0.0, 1.0);
        let (x, y) = parent.position;
        world.add_agent(|k| Agent::new(k).with_skill(skill, education).with_position(x, y));
        if let Some(parent) = world.agents.get_mut(id) {
            parent.log_event(tick, "had a child", cap);
        }
        population += 1;
        born += 1;
    }
    born
}

fn immigration<R: Rng>(world: &mut World, config: &SimConfig, rng: &mut R) -> usize {
    if !world.policy.open_borders {
        return 0;
    }
    let tick = world.tick;
    let population = world.population();
    let arrivals = (1 + population / 100).min(config.max_population.saturating_sub(population));
    for _ in 0..arrivals {
        let age = config.ticks_for_years(rng.random_range(20.0..40.0));
        let wealth = rng.random_range(50.0..300.0);
        let skill = rng.random_range(0.1..0.8);
        let education = rng.random_range(0.1..0.8);
        let x = rng.random_range(0.0..100.0);
        let y = rng.random_range(0.0..100.0);
        let id = world.add_agent(|k| {
            Agent::new(k)
                .with_age(age)
                .with_wealth(wealth)
                .with_skill(skill, education)
                .with_employment(EmploymentState::Unemployed)
                .with_position(x, y)
        });
        if let Some(a) = world.agents.get_mut(id) {
            a.log_event(tick, "immigrated", config.life_log_cap);
        }
    }
    arrivals
}

// === FORMATION ===

/// Sector whose price sits furthest above its base. Ties go to the earlier sector.
pub fn most_profitable_sector(market: &Market) -> Sector {
    Sector::ALL
        .into_iter()
        .fold((Sector::Food, f64::MIN), |best, s| {
            let ratio = market.price(s) / s.base_price();
            if ratio > best.1 { (s, ratio) } else { best }
        })
        .0
}

/// Agents flagged this tick open a firm, borrowing any shortfall in seed
/// capital. Founders who cannot finance the firm stay where they are.
fn form_businesses(world: &mut World, config: &SimConfig) -> Vec<BusinessId> {
    let tick = world.tick;
    let cap = config.life_log_cap;
    let seed = config.business_seed_capital;
    let founders: Vec<AgentId> = world
        .agents
        .iter()
        .filter(|(_, a)| a.alive() && a.flags.wants_business && !a.is_owner())
        .map(|(id, _)| id)
        .collect();

    let mut founded = Vec::new();
    for id in founders {
        if world.living_businesses().count() >= config.max_businesses {
            break;
        }
        let Some(a) = world.agents.get(id) else {
            continue;
        };
        let shortfall = (seed - a.wealth.max(0.0)).max(0.0);
        if shortfall > 0.0 {
            if shortfall > credit_limit(a.credit_score) {
                continue;
            }
            let Some(lender) = choose_lender(&world.banks, shortfall) else {
                continue;
            };
            let Some(loan) = world.banks[lender].lend(shortfall) else {
                continue;
            };
            if let Some(a) = world.agents.get_mut(id) {
                a.borrow(loan, tick, cap);
            }
        }

        world.dismiss(id, "left to start a business", cap);
        let sector = most_profitable_sector(&world.market);
        let Some(a) = world.agents.get_mut(id) else {
            continue;
        };
        let (x, y) = a.position;
        a.wealth -= seed;
        let business = world.businesses.insert_with_key(|k| {
            Business::new(k, sector, seed)
                .with_owner(id)
                .with_position(x, y)
                .founded_at(tick)
        });
        a.employment = EmploymentState::Owner;
        a.employer = Some(business);
        a.wage = 0.0;
        a.log_event(tick, format!("founded a {} business", sector.name()), cap);
        founded.push(business);
    }
    founded
}

// === NATIONALIZATION ===

/// With the lever on, dominant private firms are taken over and their owners
/// expropriated. With it off, public firms return to ordinary management.
fn apply_nationalization(world: &mut World, config: &SimConfig) -> usize {
    let tick = world.tick;
    if !world.policy.nationalization {
        for b in world.businesses.values_mut().filter(|b| b.nationalized) {
            b.nationalized = false;
            b.flat_wage = false;
        }
        return 0;
    }

    let mut taken = 0;
    for b in world
        .businesses
        .values_mut()
        .filter(|b| b.alive && !b.nationalized && b.dominance >= NATIONALIZE_DOMINANCE)
    {
        b.nationalized = true;
        b.flat_wage = true;
        if let Some(owner) = b.owner.take() {
            if let Some(a) = world.agents.get_mut(owner) {
                if a.is_owner() {
                    a.employment = EmploymentState::Unemployed;
                    a.employer = None;
                    a.log_event(tick, format!("{} was nationalized", b.name), config.life_log_cap);
                }
            }
        }
        taken += 1;
    }
    taken
}

/// Ticks at which the lifecycle pass runs.
pub fn is_lifecycle_tick(tick: Tick, config: &SimConfig) -> bool {
    config.lifecycle_interval > 0 && tick % config.lifecycle_interval == 0
}
