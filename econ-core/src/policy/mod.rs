//! Policy levers.
//!
//! The policy is a flat mapping from lever name to value. Numeric levers are
//! clamped into their declared range, flags are plain booleans, and one-shot
//! levers are queued as pending actions that the engine drains exactly once.

pub mod fiscal;

pub use fiscal::*;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::error::PolicyError;

// === LEVERS ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyLever {
    IncomeTax,
    CorporateTax,
    WealthTax,
    MinimumWage,
    Ubi,
    UnemploymentBenefit,
    InterestRate,
    RobotTax,
    ProfitSharing,
    LandTax,
    Tariff,
    MoneyPrinting,
    BankruptcyGrace,
    PriceControls,
    SumptuaryLaws,
    Nationalization,
    FlatWage,
    OpenBorders,
    DebtForgiveness,
    HelicopterMoney,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeverKind {
    Rate { min: f64, max: f64 },
    Flag,
    OneShot(OneShot),
}

impl PolicyLever {
    pub const ALL: [PolicyLever; 20] = [
        PolicyLever::IncomeTax,
        PolicyLever::CorporateTax,
        PolicyLever::WealthTax,
        PolicyLever::MinimumWage,
        PolicyLever::Ubi,
        PolicyLever::UnemploymentBenefit,
        PolicyLever::InterestRate,
        PolicyLever::RobotTax,
        PolicyLever::ProfitSharing,
        PolicyLever::LandTax,
        PolicyLever::Tariff,
        PolicyLever::MoneyPrinting,
        PolicyLever::BankruptcyGrace,
        PolicyLever::PriceControls,
        PolicyLever::SumptuaryLaws,
        PolicyLever::Nationalization,
        PolicyLever::FlatWage,
        PolicyLever::OpenBorders,
        PolicyLever::DebtForgiveness,
        PolicyLever::HelicopterMoney,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PolicyLever::IncomeTax => "income_tax",
            PolicyLever::CorporateTax => "corporate_tax",
            PolicyLever::WealthTax => "wealth_tax",
            PolicyLever::MinimumWage => "minimum_wage",
            PolicyLever::Ubi => "ubi",
            PolicyLever::UnemploymentBenefit => "unemployment_benefit",
            PolicyLever::InterestRate => "interest_rate",
            PolicyLever::RobotTax => "robot_tax",
            PolicyLever::ProfitSharing => "profit_sharing",
            PolicyLever::LandTax => "land_tax",
            PolicyLever::Tariff => "tariff",
            PolicyLever::MoneyPrinting => "money_printing",
            PolicyLever::BankruptcyGrace => "bankruptcy_grace",
            PolicyLever::PriceControls => "price_controls",
            PolicyLever::SumptuaryLaws => "sumptuary_laws",
            PolicyLever::Nationalization => "nationalization",
            PolicyLever::FlatWage => "flat_wage",
            PolicyLever::OpenBorders => "open_borders",
            PolicyLever::DebtForgiveness => "debt_forgiveness",
            PolicyLever::HelicopterMoney => "helicopter_money",
        }
    }

    /// Accepts `income_tax`, `incomeTax` and `INCOME-TAX` alike.
    pub fn parse(name: &str) -> Option<Self> {
        let wanted = normalize(name);
        Self::ALL.into_iter().find(|l| normalize(l.name()) == wanted)
    }

    pub fn kind(self) -> LeverKind {
        match self {
            PolicyLever::IncomeTax | PolicyLever::CorporateTax => LeverKind::Rate { min: 0.0, max: 0.9 },
            PolicyLever::WealthTax => LeverKind::Rate { min: 0.0, max: 0.2 },
            PolicyLever::MinimumWage => LeverKind::Rate { min: 0.0, max: 100.0 },
            PolicyLever::Ubi | PolicyLever::UnemploymentBenefit => LeverKind::Rate { min: 0.0, max: 50.0 },
            PolicyLever::InterestRate => LeverKind::Rate { min: -0.02, max: 0.25 },
            PolicyLever::RobotTax | PolicyLever::ProfitSharing => LeverKind::Rate { min: 0.0, max: 0.5 },
            PolicyLever::LandTax => LeverKind::Rate { min: 0.0, max: 0.1 },
            PolicyLever::Tariff => LeverKind::Rate { min: 0.0, max: 1.0 },
            PolicyLever::MoneyPrinting => LeverKind::Rate { min: 0.0, max: 0.5 },
            PolicyLever::BankruptcyGrace => LeverKind::Rate { min: 1.0, max: 520.0 },
            PolicyLever::PriceControls
            | PolicyLever::SumptuaryLaws
            | PolicyLever::Nationalization
            | PolicyLever::FlatWage
            | PolicyLever::OpenBorders => LeverKind::Flag,
            PolicyLever::DebtForgiveness => LeverKind::OneShot(OneShot::DebtForgiveness),
            PolicyLever::HelicopterMoney => LeverKind::OneShot(OneShot::HelicopterMoney),
        }
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// === VALUES ===

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[serde(untagged)]
pub enum PolicyValue {
    Flag(bool),
    Number(f64),
}

impl PolicyValue {
    pub fn as_number(self) -> f64 {
        match self {
            PolicyValue::Number(v) => v,
            PolicyValue::Flag(true) => 1.0,
            PolicyValue::Flag(false) => 0.0,
        }
    }

    pub fn as_flag(self) -> bool {
        match self {
            PolicyValue::Flag(b) => b,
            PolicyValue::Number(v) => v != 0.0,
        }
    }
}

/// A lever whose effect fires once and then reverts to inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OneShot {
    DebtForgiveness,
    HelicopterMoney,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
pub struct PolicyEntry {
    pub lever: String,
    pub value: PolicyValue,
}

// === STATE ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyState {
    pub income_tax: f64,
    pub corporate_tax: f64,
    /// Annual rate on wealth above `WEALTH_TAX_THRESHOLD`.
    pub wealth_tax: f64,
    pub minimum_wage: f64,
    pub ubi: f64,
    pub unemployment_benefit: f64,
    /// Annual rate.
    pub interest_rate: f64,
    pub robot_tax: f64,
    pub profit_sharing: f64,
    /// Annual levy on housing-sector capital.
    pub land_tax: f64,
    pub tariff: f64,
    pub money_printing: f64,
    /// Ticks a business may run with zero employees before bankruptcy.
    pub bankruptcy_grace: f64,
    pub price_controls: bool,
    pub sumptuary_laws: bool,
    pub nationalization: bool,
    pub flat_wage: bool,
    pub open_borders: bool,
    #[serde(skip)]
    pub(crate) pending: Vec<OneShot>,
}

impl Default for PolicyState {
    fn default() -> Self {
        Self {
            income_tax: 0.2,
            corporate_tax: 0.21,
            wealth_tax: 0.0,
            minimum_wage: 8.0,
            ubi: 0.0,
            unemployment_benefit: 4.0,
            interest_rate: 0.05,
            robot_tax: 0.0,
            profit_sharing: 0.0,
            land_tax: 0.0,
            tariff: 0.0,
            money_printing: 0.0,
            bankruptcy_grace: 26.0,
            price_controls: false,
            sumptuary_laws: false,
            nationalization: false,
            flat_wage: false,
            open_borders: false,
            pending: Vec::new(),
        }
    }
}

impl PolicyState {
    /// Set a lever by name.
    pub fn set(&mut self, name: &str, value: PolicyValue) -> Result<(), PolicyError> {
        let lever =
            PolicyLever::parse(name).ok_or_else(|| PolicyError::UnknownLever(name.to_string()))?;
        self.set_lever(lever, value)
    }

    pub fn set_lever(&mut self, lever: PolicyLever, value: PolicyValue) -> Result<(), PolicyError> {
        match lever.kind() {
            LeverKind::Rate { min, max } => {
                let v = value.as_number();
                if !v.is_finite() {
                    return Err(PolicyError::NonFinite {
                        lever: lever.name().to_string(),
                        value: v,
                    });
                }
                *self.rate_mut(lever) = v.clamp(min, max);
            }
            LeverKind::Flag => *self.flag_mut(lever) = value.as_flag(),
            LeverKind::OneShot(shot) => {
                if value.as_flag() {
                    if !self.pending.contains(&shot) {
                        self.pending.push(shot);
                    }
                } else {
                    self.pending.retain(|s| *s != shot);
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<PolicyValue> {
        PolicyLever::parse(name).map(|l| self.value(l))
    }

    pub fn value(&self, lever: PolicyLever) -> PolicyValue {
        match lever.kind() {
            LeverKind::Rate { .. } => PolicyValue::Number(self.rate(lever)),
            LeverKind::Flag => PolicyValue::Flag(self.flag(lever)),
            LeverKind::OneShot(shot) => PolicyValue::Flag(self.pending.contains(&shot)),
        }
    }

    /// Drain queued one-shot actions. After this call every one-shot lever
    /// reads as inactive.
    pub fn take_one_shots(&mut self) -> Vec<OneShot> {
        std::mem::take(&mut self.pending)
    }

    pub fn entries(&self) -> Vec<PolicyEntry> {
        PolicyLever::ALL
            .iter()
            .map(|&l| PolicyEntry {
                lever: l.name().to_string(),
                value: self.value(l),
            })
            .collect()
    }

    fn rate(&self, lever: PolicyLever) -> f64 {
        match lever {
            PolicyLever::IncomeTax => self.income_tax,
            PolicyLever::CorporateTax => self.corporate_tax,
            PolicyLever::WealthTax => self.wealth_tax,
            PolicyLever::MinimumWage => self.minimum_wage,
            PolicyLever::Ubi => self.ubi,
            PolicyLever::UnemploymentBenefit => self.unemployment_benefit,
            PolicyLever::InterestRate => self.interest_rate,
            PolicyLever::RobotTax => self.robot_tax,
            PolicyLever::ProfitSharing => self.profit_sharing,
            PolicyLever::LandTax => self.land_tax,
            PolicyLever::Tariff => self.tariff,
            PolicyLever::MoneyPrinting => self.money_printing,
            PolicyLever::BankruptcyGrace => self.bankruptcy_grace,
            _ => 0.0,
        }
    }

    fn rate_mut(&mut self, lever: PolicyLever) -> &mut f64 {
        match lever {
            PolicyLever::IncomeTax => &mut self.income_tax,
            PolicyLever::CorporateTax => &mut self.corporate_tax,
            PolicyLever::WealthTax => &mut self.wealth_tax,
            PolicyLever::MinimumWage => &mut self.minimum_wage,
            PolicyLever::Ubi => &mut self.ubi,
            PolicyLever::UnemploymentBenefit => &mut self.unemployment_benefit,
            PolicyLever::InterestRate => &mut self.interest_rate,
            PolicyLever::RobotTax => &mut self.robot_tax,
            PolicyLever::ProfitSharing => &mut self.profit_sharing,
            PolicyLever::LandTax => &mut self.land_tax,
            PolicyLever::Tariff => &mut self.tariff,
            PolicyLever::MoneyPrinting => &mut self.money_printing,
            _ => &mut self.bankruptcy_grace,
        }
    }

    fn flag(&self, lever: PolicyLever) -> bool {
        match lever {
            PolicyLever::PriceControls => self.price_controls,
            PolicyLever::SumptuaryLaws => self.sumptuary_laws,
            PolicyLever::Nationalization => self.nationalization,
            PolicyLever::FlatWage => self.flat_wage,
            PolicyLever::OpenBorders => self.open_borders,
            _ => false,
        }
    }

    fn flag_mut(&mut self, lever: PolicyLever) -> &mut bool {
        match lever {
            PolicyLever::PriceControls => &mut self.price_controls,
            PolicyLever::SumptuaryLaws => &mut self.sumptuary_laws,
            PolicyLever::Nationalization => &mut self.nationalization,
            PolicyLever::FlatWage => &mut self.flat_wage,
            _ => &mut self.open_borders,
        }
    }
}
