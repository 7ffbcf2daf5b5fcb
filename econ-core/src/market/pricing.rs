use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::config::SimConfig;
use crate::types::{PerSector, SECTOR_COUNT, Sector, finite_or};

pub const BASE_CPI: f64 = 100.0;
/// Largest demand/supply imbalance that feeds into the price target.
const MAX_IMBALANCE: f64 = 4.0;

// === SECTOR MARKET ===

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
pub struct SectorMarket {
    pub sector: Sector,
    pub price: f64,
    pub supply: f64,
    pub demand: f64,
}

/// Aggregates feeding one price update.
#[derive(Debug, Clone, Default)]
pub struct PriceInputs {
    pub supply: PerSector<f64>,
    pub demand: PerSector<f64>,
    /// Multiplicative pressure on the target price (events, tariffs).
    pub pressure: PerSector<f64>,
}

impl PriceInputs {
    pub fn new() -> Self {
        Self {
            supply: PerSector::splat(0.0),
            demand: PerSector::splat(0.0),
            pressure: PerSector::splat(1.0),
        }
    }
}

// === MARKET ===

#[derive(Debug, Clone)]
pub struct Market {
    sectors: [SectorMarket; SECTOR_COUNT],
    pub cpi: f64,
    /// Percent change in CPI over the lookback window.
    pub inflation: f64,
    cpi_history: VecDeque<f64>,
}

impl Default for Market {
    fn default() -> Self {
        Self::new()
    }
}

impl Market {
    pub fn new() -> Self {
        let sectors = Sector::ALL.map(|sector| SectorMarket {
            sector,
            price: sector.base_price(),
            supply: 0.0,
            demand: 0.0,
        });
        let mut cpi_history = VecDeque::new();
        cpi_history.push_back(BASE_CPI);
        Self {
            sectors,
            cpi: BASE_CPI,
            inflation: 0.0,
            cpi_history,
        }
    }

    pub fn price(&self, sector: Sector) -> f64 {
        self.sectors[sector.index()].price
    }

    pub fn prices(&self) -> PerSector<f64> {
        PerSector(self.sectors.each_ref().map(|m| m.price))
    }

    pub fn sector(&self, sector: Sector) -> &SectorMarket {
        &self.sectors[sector.index()]
    }

    pub fn sectors(&self) -> &[SectorMarket] {
        &self.sectors
    }

    /// Demand over supply for the last update, bounded. A market with no
    /// activity on either side reads as balanced.
    pub fn demand_ratio(&self, sector: Sector) -> f64 {
        let m = &self.sectors[sector.index()];
        imbalance(m.supply, m.demand)
    }

    /// Move every price toward its demand/supply target, then recompute CPI
    /// and inflation.
    pub fn update(&mut self, inputs: &PriceInputs, price_controls: bool, config: &SimConfig) {
        let max_change = if price_controls {
            config.controlled_price_change
        } else {
            config.max_price_change
        };

        for m in self.sectors.iter_mut() {
            let supply = finite_or(inputs.supply.get(m.sector), 0.0).max(0.0);
            let demand = finite_or(inputs.demand.get(m.sector), 0.0).max(0.0);
            let pressure = finite_or(inputs.pressure.get(m.sector), 1.0).max(0.0);

            let target = target_price(m.price, supply, demand, config.price_elasticity) * pressure;
            m.price = bounded_step(m.price, target, max_change, config.price_floor);
            m.supply = supply;
            m.demand = demand;
        }

        self.cpi = compute_cpi(&self.prices());
        self.cpi_history.push_back(self.cpi);
        let keep = config.inflation_lookback.max(config.history_len) + 1;
        while self.cpi_history.len() > keep {
            self.cpi_history.pop_front();
        }
        self.inflation = inflation_rate(&self.cpi_history, config.inflation_lookback);
    }

    /// Scale one sector's price, or every price when `sector` is `None`,
    /// respecting the floor.
    pub fn shock(&mut self, sector: Option<Sector>, factor: f64, floor: f64) {
        for m in self.sectors.iter_mut() {
            if sector.is_none_or(|s| s == m.sector) {
                m.price = finite_or(m.price * factor, m.price).max(floor);
            }
        }
    }
}

// === PRICE MATH ===

fn imbalance(supply: f64, demand: f64) -> f64 {
    if supply <= f64::EPSILON && demand <= f64::EPSILON {
        1.0
    } else if supply <= f64::EPSILON {
        MAX_IMBALANCE
    } else {
        (demand / supply).clamp(1.0 / MAX_IMBALANCE, MAX_IMBALANCE)
    }
}

/// Price that would clear the market given current supply and demand.
pub fn target_price(price: f64, supply: f64, demand: f64, elasticity: f64) -> f64 {
    price * imbalance(supply, demand).powf(elasticity)
}

/// One bounded step from `price` toward `target`. The result is always
/// finite and at least `floor`.
pub fn bounded_step(price: f64, target: f64, max_change: f64, floor: f64) -> f64 {
    let floor = floor.max(f64::MIN_POSITIVE);
    let price = finite_or(price, floor).max(floor);
    let target = finite_or(target, price);
    let lo = price * (1.0 - max_change);
    let hi = price * (1.0 + max_change);
    target.clamp(lo, hi).max(floor)
}

/// CPI: weighted basket of price relatives, 100 at base prices.
pub fn compute_cpi(prices: &PerSector<f64>) -> f64 {
    let index: f64 = Sector::ALL
        .iter()
        .map(|&s| s.cpi_weight() * prices.get(s) / s.base_price())
        .sum();
    finite_or(index * BASE_CPI, BASE_CPI)
}

/// Percent change between the newest CPI and the one `lookback` entries back
/// (or the oldest available).
pub fn inflation_rate(history: &VecDeque<f64>, lookback: usize) -> f64 {
    let Some(&now) = history.back() else {
        return 0.0;
    };
    let back = history.len().saturating_sub(1).min(lookback);
    let then = history[history.len() - 1 - back];
    if then <= 0.0 {
        return 0.0;
    }
    finite_or((now / then - 1.0) * 100.0, 0.0)
}
