use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use tsify_next::Tsify;

// ============================================================================
// IDs - Using slotmap for generational indices
// ============================================================================

new_key_type! {
    pub struct AgentId;
    pub struct BusinessId;
}

/// Discrete simulation time.
pub type Tick = u64;

pub type BankId = u32;

/// Trait for converting SlotMap keys to u64 for the host boundary
pub trait KeyToU64 {
    fn to_u64(self) -> u64;
}

impl KeyToU64 for AgentId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

impl KeyToU64 for BusinessId {
    fn to_u64(self) -> u64 {
        self.0.as_ffi()
    }
}

// ============================================================================
// Sectors - The goods categories that are produced and priced
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Tsify,
)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Food,
    Housing,
    Tech,
    Luxury,
}

pub const SECTOR_COUNT: usize = 4;

impl Sector {
    pub const ALL: [Sector; SECTOR_COUNT] =
        [Sector::Food, Sector::Housing, Sector::Tech, Sector::Luxury];

    pub fn index(self) -> usize {
        match self {
            Sector::Food => 0,
            Sector::Housing => 1,
            Sector::Tech => 2,
            Sector::Luxury => 3,
        }
    }

    /// Price at CPI = 100.
    pub fn base_price(self) -> f64 {
        match self {
            Sector::Food => 10.0,
            Sector::Housing => 25.0,
            Sector::Tech => 40.0,
            Sector::Luxury => 60.0,
        }
    }

    /// Basket weight in the CPI. Weights sum to 1.
    pub fn cpi_weight(self) -> f64 {
        match self {
            Sector::Food => 0.35,
            Sector::Housing => 0.35,
            Sector::Tech => 0.2,
            Sector::Luxury => 0.1,
        }
    }

    /// Units consumed per agent per tick at baseline wealth.
    pub fn base_consumption(self) -> f64 {
        match self {
            Sector::Food => 0.5,
            Sector::Housing => 0.25,
            Sector::Tech => 0.1,
            Sector::Luxury => 0.04,
        }
    }

    /// How strongly consumption rises with wealth.
    pub fn wealth_elasticity(self) -> f64 {
        match self {
            Sector::Food => 0.05,
            Sector::Housing => 0.2,
            Sector::Tech => 0.5,
            Sector::Luxury => 1.2,
        }
    }

    /// Units one effective worker produces per tick at productivity 1.
    pub fn labor_yield(self) -> f64 {
        match self {
            Sector::Food => 2.5,
            Sector::Housing => 1.2,
            Sector::Tech => 0.75,
            Sector::Luxury => 0.4,
        }
    }

    /// Reference wage a business in this sector starts hiring at.
    pub fn base_wage(self) -> f64 {
        match self {
            Sector::Food => 14.0,
            Sector::Housing => 16.0,
            Sector::Tech => 24.0,
            Sector::Luxury => 18.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Sector::Food => "food",
            Sector::Housing => "housing",
            Sector::Tech => "tech",
            Sector::Luxury => "luxury",
        }
    }
}

/// Fixed-size per-sector table.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerSector<T>(pub [T; SECTOR_COUNT]);

impl<T: Copy> PerSector<T> {
    pub fn splat(value: T) -> Self {
        Self([value; SECTOR_COUNT])
    }

    pub fn get(&self, sector: Sector) -> T {
        self.0[sector.index()]
    }

    pub fn set(&mut self, sector: Sector, value: T) {
        self.0[sector.index()] = value;
    }
}

impl PerSector<f64> {
    pub fn add(&mut self, sector: Sector, amount: f64) {
        self.0[sector.index()] += amount;
    }

    pub fn scale(&mut self, sector: Sector, factor: f64) {
        self.0[sector.index()] *= factor;
    }
}

// ============================================================================
// Employment & class
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentState {
    Child,
    Working,
    Unemployed,
    Retired,
    Owner,
    Dead,
}

impl EmploymentState {
    /// Part of the working-age labor force.
    pub fn in_labor_force(self) -> bool {
        matches!(
            self,
            EmploymentState::Working | EmploymentState::Unemployed | EmploymentState::Owner
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Tsify)]
#[serde(rename_all = "snake_case")]
pub enum SocialClass {
    Poor,
    Working,
    Middle,
    Upper,
    Elite,
}

impl SocialClass {
    /// Class for a wealth percentile in [0, 1].
    pub fn from_percentile(p: f64) -> Self {
        if p < 0.2 {
            SocialClass::Poor
        } else if p < 0.5 {
            SocialClass::Working
        } else if p < 0.8 {
            SocialClass::Middle
        } else if p < 0.95 {
            SocialClass::Upper
        } else {
            SocialClass::Elite
        }
    }
}

/// Replaces a non-finite value with a neutral fallback.
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}
