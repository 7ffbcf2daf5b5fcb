use slotmap::SlotMap;

use crate::types::{BusinessId, PerSector, Sector};

use super::business::Business;

/// Recompute each living business's share of its sector, averaging its share
/// of sector employment with its share of (non-negative) sector capital.
pub fn recompute_dominance(businesses: &mut SlotMap<BusinessId, Business>) {
    let mut employment = PerSector::splat(0.0);
    let mut capital = PerSector::splat(0.0);
    for b in businesses.values().filter(|b| b.alive) {
        employment.add(b.sector, b.employees.len() as f64);
        capital.add(b.sector, b.capital.max(0.0));
    }

    for b in businesses.values_mut() {
        if !b.alive {
            b.dominance = 0.0;
            continue;
        }
        let emp_total = employment.get(b.sector);
        let cap_total = capital.get(b.sector);
        let emp_share = if emp_total > 0.0 {
            b.employees.len() as f64 / emp_total
        } else {
            0.0
        };
        let cap_share = if cap_total > 0.0 {
            b.capital.max(0.0) / cap_total
        } else {
            0.0
        };
        b.dominance = (0.5 * emp_share + 0.5 * cap_share).clamp(0.0, 1.0);
    }
}

/// Highest dominance in each sector.
pub fn sector_leaders(businesses: &SlotMap<BusinessId, Business>) -> PerSector<f64> {
    let mut leaders = PerSector::splat(0.0);
    for b in businesses.values().filter(|b| b.alive) {
        if b.dominance > leaders.get(b.sector) {
            leaders.set(b.sector, b.dominance);
        }
    }
    leaders
}

/// Highest dominance across all sectors.
pub fn top_dominance(businesses: &SlotMap<BusinessId, Business>) -> f64 {
    let leaders = sector_leaders(businesses);
    Sector::ALL
        .iter()
        .map(|&s| leaders.get(s))
        .fold(0.0, f64::max)
}
