//! Threshold-triggered commentary on the economy.
//!
//! Every insight fires at most once per run, and no two insights fire within
//! the cooldown window of each other.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::types::Tick;

use super::Metrics;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Tsify,
)]
#[serde(rename_all = "snake_case")]
pub enum InsightId {
    HighUnemployment,
    Inequality,
    InflationSpike,
    Deflation,
    Monopoly,
    DebtSpiral,
    Recession,
    Poverty,
    Unrest,
}

impl InsightId {
    pub const ALL: [InsightId; 9] = [
        InsightId::HighUnemployment,
        InsightId::Inequality,
        InsightId::InflationSpike,
        InsightId::Deflation,
        InsightId::Monopoly,
        InsightId::DebtSpiral,
        InsightId::Recession,
        InsightId::Poverty,
        InsightId::Unrest,
    ];

    fn triggered(self, m: &Metrics, top_dominance: f64) -> bool {
        match self {
            InsightId::HighUnemployment => m.unemployment > 0.15,
            InsightId::Inequality => m.gini > 0.5,
            InsightId::InflationSpike => m.inflation > 10.0,
            InsightId::Deflation => m.inflation < -2.0,
            InsightId::Monopoly => top_dominance > 0.5,
            InsightId::DebtSpiral => m.government_debt > 0.0 && m.budget < 0.0 && m.government_debt > 50.0 * m.gdp.max(1.0),
            InsightId::Recession => m.gdp_growth < -5.0,
            InsightId::Poverty => m.poverty_rate > 0.3,
            InsightId::Unrest => m.crime_rate > 0.2,
        }
    }

    fn text(self) -> &'static str {
        match self {
            InsightId::HighUnemployment => {
                "More than one in seven workers cannot find a job. Idle labor drags down demand everywhere."
            }
            InsightId::Inequality => "Wealth is concentrating at the top. Consumption is thinning out as a result.",
            InsightId::InflationSpike => "Prices are rising faster than 10% a year and eroding savings.",
            InsightId::Deflation => "Prices are falling. Households postpone purchases and debts grow heavier.",
            InsightId::Monopoly => "A single firm dominates its sector and is setting terms for everyone else.",
            InsightId::DebtSpiral => "Public debt is outrunning output while the budget stays in deficit.",
            InsightId::Recession => "Output is shrinking year over year. The economy is in recession.",
            InsightId::Poverty => "Nearly a third of adults cannot cover ten weeks of essentials.",
            InsightId::Unrest => "Unrest is spreading. Hardship is turning into crime.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
pub struct Insight {
    pub id: InsightId,
    pub text: String,
    pub tick: Tick,
}

#[derive(Debug, Clone, Default)]
pub struct InsightTracker {
    fired: BTreeSet<InsightId>,
    last_fired: Option<Tick>,
}

impl InsightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_fired(&self, id: InsightId) -> bool {
        self.fired.contains(&id)
    }

    /// At most one new insight per call.
    pub fn check(&mut self, m: &Metrics, top_dominance: f64, cooldown: Tick) -> Option<Insight> {
        if self
            .last_fired
            .is_some_and(|t| m.tick.saturating_sub(t) < cooldown)
        {
            return None;
        }
        let id = InsightId::ALL
            .into_iter()
            .find(|id| !self.fired.contains(id) && id.triggered(m, top_dominance))?;
        self.fired.insert(id);
        self.last_fired = Some(m.tick);
        Some(Insight {
            id,
            text: id.text().to_string(),
            tick: m.tick,
        })
    }
}
