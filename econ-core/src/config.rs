//! Engine tuning parameters.
//!
//! Everything here is calibration, not content: cadences, bounds and caps that
//! keep the feedback loops stable over long runs. Scenario content lives in
//! `scenario.rs`.

use serde::{Deserialize, Serialize};

use crate::types::Tick;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Labor market clears every `labor_interval` ticks.
    pub labor_interval: Tick,
    pub metrics_interval: Tick,
    pub snapshot_interval: Tick,
    /// Births, business formation and cleanup run on this cadence.
    pub lifecycle_interval: Tick,
    pub ticks_per_year: u32,
    pub working_age_years: f64,
    pub retirement_age_years: f64,
    pub max_age_years: f64,

    // Pricing
    pub max_price_change: f64,
    pub controlled_price_change: f64,
    pub price_floor: f64,
    pub price_elasticity: f64,
    pub inflation_lookback: usize,

    // Events
    pub event_cooldown: Tick,
    pub event_base_probability: f64,

    // Insights
    pub insight_cooldown: Tick,

    // Businesses
    pub bankruptcy_capital_floor: f64,
    pub business_seed_capital: f64,
    pub max_businesses: usize,

    // Population
    pub max_population: usize,
    pub birth_rate_per_year: f64,
    pub life_log_cap: usize,

    // Series
    pub history_len: usize,

    // Pacing
    pub base_steps_per_second: f64,
    pub max_steps_per_frame: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            labor_interval: 5,
            metrics_interval: 5,
            snapshot_interval: 5,
            lifecycle_interval: 10,
            ticks_per_year: 52,
            working_age_years: 18.0,
            retirement_age_years: 65.0,
            max_age_years: 110.0,
            max_price_change: 0.05,
            controlled_price_change: 0.005,
            price_floor: 0.01,
            price_elasticity: 0.5,
            inflation_lookback: 52,
            event_cooldown: 60,
            event_base_probability: 0.02,
            insight_cooldown: 150,
            bankruptcy_capital_floor: -5_000.0,
            business_seed_capital: 2_000.0,
            max_businesses: 200,
            max_population: 2_000,
            birth_rate_per_year: 0.06,
            life_log_cap: 12,
            history_len: 240,
            base_steps_per_second: 10.0,
            max_steps_per_frame: 50,
        }
    }
}

impl SimConfig {
    /// Config with the random event lottery switched off. Forced shocks and
    /// scheduled follow-ups still fire.
    pub fn without_random_events() -> Self {
        Self {
            event_base_probability: 0.0,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn ticks_for_years(&self, years: f64) -> u32 {
        (years * self.ticks_per_year as f64).round().max(0.0) as u32
    }

    pub fn working_age_ticks(&self) -> u32 {
        self.ticks_for_years(self.working_age_years)
    }

    pub fn retirement_age_ticks(&self) -> u32 {
        self.ticks_for_years(self.retirement_age_years)
    }

    pub fn max_age_ticks(&self) -> u32 {
        self.ticks_for_years(self.max_age_years)
    }

    /// Converts an annual rate into a per-tick rate.
    pub fn per_tick(&self, annual: f64) -> f64 {
        annual / self.ticks_per_year.max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = SimConfig::from_json(r#"{ "labor_interval": 7 }"#).unwrap();
        assert_eq!(cfg.labor_interval, 7);
        assert_eq!(cfg.metrics_interval, SimConfig::default().metrics_interval);
    }

    #[test]
    fn test_age_conversions() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.working_age_ticks(), 18 * 52);
        assert!(cfg.retirement_age_ticks() > cfg.working_age_ticks());
        assert!((cfg.per_tick(0.52) - 0.01).abs() < 1e-12);
    }
}
