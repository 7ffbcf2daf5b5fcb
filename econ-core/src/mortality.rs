//! Mortality and fertility mechanics.
//!
//! Death risk follows a Gompertz curve in age, amplified by poor health.
//! Births are drawn for adults of child-bearing age and are suppressed by
//! unhappiness and debt, closing the loop between hardship and population.

use rand::Rng;

/// Annual probability of death given age (years) and health in [0, 1].
///
/// - age 20, full health → ~0.2%
/// - age 50, full health → ~2%
/// - age 80, full health → ~27%
/// - any age, zero health → 4x the healthy hazard
pub fn annual_death_probability(age_years: f64, health: f64) -> f64 {
    let hazard = 0.0003 * (0.085 * age_years.max(0.0)).exp();
    let frailty = 1.0 + 3.0 * (1.0 - health.clamp(0.0, 1.0)).powi(2);
    (hazard * frailty).min(0.95)
}

/// Converts an annual probability into a per-tick probability with the same
/// survival over a full year.
pub fn per_tick_probability(annual: f64, ticks_per_year: u32) -> f64 {
    let annual = annual.clamp(0.0, 1.0);
    if annual >= 1.0 {
        return 1.0;
    }
    1.0 - (1.0 - annual).powf(1.0 / ticks_per_year.max(1) as f64)
}

/// Probability that an adult has a child during one lifecycle pass.
///
/// Only ages 20-40 are fertile. Happiness scales the rate linearly and debt
/// halves it.
pub fn birth_probability(
    age_years: f64,
    happiness: f64,
    wealth: f64,
    annual_rate: f64,
    ticks_in_pass: u32,
    ticks_per_year: u32,
) -> f64 {
    if !(20.0..40.0).contains(&age_years) {
        return 0.0;
    }
    let mood = happiness.clamp(0.0, 1.0);
    let means = if wealth < 0.0 { 0.5 } else { 1.0 };
    let per_year = (annual_rate * 2.0 * mood * means).clamp(0.0, 1.0);
    let years = ticks_in_pass as f64 / ticks_per_year.max(1) as f64;
    1.0 - (1.0 - per_year).powf(years)
}

/// Result of a lifecycle roll for an agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MortalityOutcome {
    Survives,
    Dies,
}

/// Roll for death this tick. Agents at or beyond `max_age_years` always die.
pub fn check_death<R: Rng>(
    rng: &mut R,
    age_years: f64,
    max_age_years: f64,
    health: f64,
    ticks_per_year: u32,
) -> MortalityOutcome {
    if age_years >= max_age_years {
        return MortalityOutcome::Dies;
    }
    let p = per_tick_probability(annual_death_probability(age_years, health), ticks_per_year);
    let roll: f64 = rng.random();
    if roll < p {
        MortalityOutcome::Dies
    } else {
        MortalityOutcome::Survives
    }
}
