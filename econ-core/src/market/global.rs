//! Rest-of-world trade.
//!
//! The domestic economy trades each sector against a fixed world price
//! converted through a floating exchange rate. Goods flow toward the cheaper
//! side, tariffs tax imports, and the trade balance feeds back into reserves
//! and the exchange rate.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::market::Market;
use crate::policy::PolicyState;
use crate::types::{PerSector, Sector, Tick, finite_or};

/// Share of domestic demand that can switch to imports at full price gap.
const IMPORT_SHARE: f64 = 0.3;
/// Share of domestic supply that can be sold abroad at full price gap.
const EXPORT_SHARE: f64 = 0.2;
const FX_BOUNDS: (f64, f64) = (0.25, 4.0);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Tsify)]
pub struct GlobalPoint {
    pub tick: Tick,
    pub fx_rate: f64,
    pub reserves: f64,
    pub trade_balance: f64,
}

#[derive(Debug, Clone)]
pub struct GlobalEconomy {
    /// Domestic currency per unit of foreign currency.
    pub fx_rate: f64,
    pub reserves: f64,
    /// Foreign-currency prices.
    pub world_prices: PerSector<f64>,
    /// Units imported in the last update; added to next tick's supply.
    pub imports: PerSector<f64>,
    pub exports: PerSector<f64>,
    /// Exports minus imports, in domestic currency.
    pub trade_balance: f64,
    pub tariff_revenue: f64,
    history: VecDeque<GlobalPoint>,
}

impl Default for GlobalEconomy {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalEconomy {
    pub fn new() -> Self {
        Self {
            fx_rate: 1.0,
            reserves: 10_000.0,
            world_prices: PerSector(Sector::ALL.map(|s| s.base_price())),
            imports: PerSector::splat(0.0),
            exports: PerSector::splat(0.0),
            trade_balance: 0.0,
            tariff_revenue: 0.0,
            history: VecDeque::new(),
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &GlobalPoint> {
        self.history.iter()
    }

    /// Landed price of a foreign good including tariff.
    pub fn import_price(&self, sector: Sector, tariff: f64) -> f64 {
        self.world_prices.get(sector) * self.fx_rate * (1.0 + tariff.max(0.0))
    }

    /// Recompute trade flows against the current domestic market.
    pub fn update(&mut self, tick: Tick, market: &Market, policy: &PolicyState, history_len: usize) {
        let tariff = policy.tariff.max(0.0);
        let mut import_value = 0.0;
        let mut export_value = 0.0;

        for sector in Sector::ALL {
            let domestic = market.price(sector);
            let landed = self.import_price(sector, tariff);
            let world_local = self.world_prices.get(sector) * self.fx_rate;
            let m = market.sector(sector);

            let (imports, exports) = if domestic > landed {
                let gap = ((domestic - landed) / landed).min(1.0);
                (IMPORT_SHARE * gap * m.demand, 0.0)
            } else if domestic < world_local {
                let gap = ((world_local - domestic) / world_local).min(1.0);
                (0.0, EXPORT_SHARE * gap * m.supply)
            } else {
                (0.0, 0.0)
            };

            self.imports.set(sector, finite_or(imports, 0.0));
            self.exports.set(sector, finite_or(exports, 0.0));
            import_value += imports * world_local;
            export_value += exports * domestic;
        }

        self.tariff_revenue = finite_or(import_value * tariff, 0.0);
        self.trade_balance = finite_or(export_value - import_value, 0.0);
        self.reserves = (self.reserves + self.trade_balance * 0.1 / self.fx_rate).max(0.0);

        // Deficits weaken the currency; high rates strengthen it.
        let scale = (import_value + export_value).max(1.0);
        let drift = -0.01 * self.trade_balance / scale - 0.02 * (policy.interest_rate - 0.03);
        self.fx_rate = finite_or(self.fx_rate * (1.0 + drift.clamp(-0.02, 0.02)), 1.0)
            .clamp(FX_BOUNDS.0, FX_BOUNDS.1);

        self.history.push_back(GlobalPoint {
            tick,
            fx_rate: self.fx_rate,
            reserves: self.reserves,
            trade_balance: self.trade_balance,
        });
        while self.history.len() > history_len {
            self.history.pop_front();
        }
    }
}
