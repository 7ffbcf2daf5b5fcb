//! Taxes, transfers and the government ledger.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tsify_next::Tsify;

use crate::agents::{Agent, Bank};
use crate::config::SimConfig;
use crate::production::Business;
use crate::types::{AgentId, BusinessId, EmploymentState, Sector, Tick, finite_or};

use super::{OneShot, PolicyState};

/// Wealth exempt from the wealth tax.
pub const WEALTH_TAX_THRESHOLD: f64 = 10_000.0;
/// Paid once to every living adult by the helicopter-money one-shot.
pub const HELICOPTER_AMOUNT: f64 = 500.0;
/// Share of forgiven loan principal the government reimburses to banks.
pub const BANK_COMPENSATION: f64 = 0.5;

// === GOVERNMENT ===

#[derive(Debug, Clone, Default, Serialize, Deserialize, Tsify)]
pub struct Government {
    /// Revenue collected in the last policy pass.
    pub revenue: f64,
    /// Spending in the last policy pass, including debt service.
    pub spending: f64,
    /// revenue - spending for the last pass.
    pub budget: f64,
    pub debt: f64,
}

impl Government {
    /// Extraordinary spending financed by borrowing (choice penalties, bailouts).
    pub fn add_debt(&mut self, amount: f64) {
        self.debt += finite_or(amount, 0.0).max(0.0);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiscalSummary {
    pub revenue: f64,
    pub spending: f64,
    pub applied: Vec<OneShot>,
    /// Negative wealth and loan principal cleared by debt forgiveness.
    pub forgiven: f64,
    pub helicopter: f64,
}

/// Apply one policy pass.
///
/// Taxes are assessed on wages and wealth as they stood before any transfer
/// in this pass. Transfers follow, then business levies, then queued
/// one-shots, and finally the deficit rolls into debt.
#[allow(clippy::too_many_arguments)]
pub fn apply_policy_effects(
    agents: &mut SlotMap<AgentId, Agent>,
    businesses: &mut SlotMap<BusinessId, Business>,
    banks: &mut [Bank],
    government: &mut Government,
    policy: &mut PolicyState,
    config: &SimConfig,
    tick: Tick,
    tariff_revenue: f64,
) -> FiscalSummary {
    let mut summary = FiscalSummary {
        applied: policy.take_one_shots(),
        ..FiscalSummary::default()
    };
    let mut revenue = finite_or(tariff_revenue, 0.0).max(0.0);
    let mut spending = 0.0;
    let adult_age = config.working_age_ticks();
    let wealth_rate = config.per_tick(policy.wealth_tax);

    // Household taxes on pre-transfer values, then transfers
    for agent in agents.values_mut().filter(|a| a.alive()) {
        let wage = if agent.employment == EmploymentState::Working {
            agent.wage
        } else {
            0.0
        };
        let income_tax = wage.max(0.0) * policy.income_tax;
        let wealth_tax = (agent.wealth - WEALTH_TAX_THRESHOLD).max(0.0) * wealth_rate;
        agent.wealth -= income_tax + wealth_tax;
        revenue += income_tax + wealth_tax;

        if agent.age >= adult_age && policy.ubi > 0.0 {
            agent.wealth += policy.ubi;
            spending += policy.ubi;
        }
        if agent.employment == EmploymentState::Unemployed {
            agent.wealth += policy.unemployment_benefit;
            spending += policy.unemployment_benefit;
        }
    }

    // Business levies
    let land_rate = config.per_tick(policy.land_tax);
    let business_ids: Vec<BusinessId> = businesses.keys().collect();
    for id in business_ids {
        let Some(b) = businesses.get_mut(id) else {
            continue;
        };
        if !b.alive {
            continue;
        }
        let profit = b.last_profit;

        if b.nationalized {
            if profit > 0.0 {
                b.capital -= profit;
                revenue += profit;
            } else {
                b.capital -= profit;
                spending -= profit;
            }
            continue;
        }

        let mut levy = 0.0;
        if profit > 0.0 {
            levy += profit * policy.corporate_tax;
        }
        levy += policy.robot_tax * b.automation * b.last_revenue.max(0.0);
        if b.sector == Sector::Housing {
            levy += b.capital.max(0.0) * land_rate;
        }
        b.capital -= levy;
        revenue += levy;

        if profit > 0.0 && policy.profit_sharing > 0.0 {
            let living: Vec<AgentId> = b
                .employees
                .iter()
                .copied()
                .filter(|e| agents.get(*e).is_some_and(|a| a.alive()))
                .collect();
            if !living.is_empty() {
                let pool = profit * (1.0 - policy.corporate_tax) * policy.profit_sharing;
                b.capital -= pool;
                let share = pool / living.len() as f64;
                for e in living {
                    if let Some(a) = agents.get_mut(e) {
                        a.wealth += share;
                    }
                }
            }
        }
    }

    // One-shots
    for shot in summary.applied.clone() {
        match shot {
            OneShot::HelicopterMoney => {
                for agent in agents.values_mut().filter(|a| a.alive() && a.age >= adult_age) {
                    agent.wealth += HELICOPTER_AMOUNT;
                    agent.log_event(tick, "received helicopter money", config.life_log_cap);
                    summary.helicopter += HELICOPTER_AMOUNT;
                }
                spending += summary.helicopter;
            }
            OneShot::DebtForgiveness => {
                summary.forgiven += forgive_debts(agents, banks, config, tick);
                spending += summary.forgiven * BANK_COMPENSATION;
            }
        }
    }

    // Ledger
    let interest = government.debt.max(0.0) * config.per_tick(policy.interest_rate.max(0.0));
    spending += interest;
    revenue = finite_or(revenue, 0.0);
    spending = finite_or(spending, 0.0);
    let budget = revenue - spending;
    if budget < 0.0 {
        // Money printing monetizes part of the deficit
        government.debt += -budget * (1.0 - policy.money_printing.clamp(0.0, 1.0));
    } else {
        government.debt = (government.debt - budget).max(0.0);
    }
    government.revenue = revenue;
    government.spending = spending;
    government.budget = budget;

    summary.revenue = revenue;
    summary.spending = spending;
    summary
}

/// Clear every negative balance and every outstanding loan. Banks are
/// compensated for part of the written-off principal.
fn forgive_debts(
    agents: &mut SlotMap<AgentId, Agent>,
    banks: &mut [Bank],
    config: &SimConfig,
    tick: Tick,
) -> f64 {
    let mut forgiven = 0.0;
    for agent in agents.values_mut().filter(|a| a.alive()) {
        let mut cleared = false;
        if agent.wealth < 0.0 {
            forgiven += -agent.wealth;
            agent.wealth = 0.0;
            cleared = true;
        }
        for (bank_id, principal) in agent.forgive_loans() {
            forgiven += principal;
            cleared = true;
            if let Some(bank) = banks.iter_mut().find(|b| b.id == bank_id) {
                bank.receive(principal * BANK_COMPENSATION);
            }
        }
        if cleared {
            agent.log_event(tick, "debts forgiven", config.life_log_cap);
        }
    }
    forgiven
}
