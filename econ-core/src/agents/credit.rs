use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::types::BankId;

// === CONSTANTS ===

/// Loans amortize over three years of weekly ticks.
pub const LOAN_TERM_TICKS: f64 = 156.0;
pub const MIN_CREDIT_SCORE: f64 = 300.0;
pub const MAX_CREDIT_SCORE: f64 = 850.0;
/// Score below which banks refuse new credit.
pub const LENDING_SCORE: f64 = 580.0;
pub const START_CREDIT_SCORE: f64 = 650.0;

// === LOAN ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub principal: f64,
    pub bank: BankId,
    pub active: bool,
}

/// What a borrower owes this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Installment {
    pub interest: f64,
    pub amortization: f64,
}

impl Installment {
    pub fn total(&self) -> f64 {
        self.interest + self.amortization
    }
}

impl Loan {
    pub fn new(principal: f64, bank: BankId) -> Self {
        Self {
            principal,
            bank,
            active: principal > 0.0,
        }
    }

    /// Installment at the given per-tick interest rate. Negative rates are
    /// treated as zero interest.
    pub fn installment(&self, rate_per_tick: f64) -> Installment {
        if !self.active {
            return Installment {
                interest: 0.0,
                amortization: 0.0,
            };
        }
        Installment {
            interest: self.principal * rate_per_tick.max(0.0),
            amortization: (self.principal / LOAN_TERM_TICKS).min(self.principal),
        }
    }

    /// Reduce principal by a paid amortization. Closes the loan once the
    /// remainder is negligible.
    pub fn amortize(&mut self, amount: f64) {
        self.principal = (self.principal - amount).max(0.0);
        if self.principal < 0.01 {
            self.principal = 0.0;
            self.active = false;
        }
    }

    /// Missed payment: interest is added to principal.
    pub fn capitalize(&mut self, interest: f64) {
        self.principal += interest.max(0.0);
    }
}

// === BANKS ===

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
pub struct Bank {
    pub id: BankId,
    pub name: String,
    pub reserves: f64,
    pub solvent: bool,
}

impl Bank {
    pub fn new(id: BankId, name: impl Into<String>, reserves: f64) -> Self {
        Self {
            id,
            name: name.into(),
            reserves,
            solvent: reserves > 0.0,
        }
    }

    pub fn can_lend(&self, amount: f64) -> bool {
        self.solvent && amount > 0.0 && self.reserves >= amount
    }

    /// Originate a loan out of reserves.
    pub fn lend(&mut self, amount: f64) -> Option<Loan> {
        if !self.can_lend(amount) {
            return None;
        }
        self.reserves -= amount;
        Some(Loan::new(amount, self.id))
    }

    pub fn receive(&mut self, amount: f64) {
        self.reserves += amount;
        if self.reserves > 0.0 {
            self.solvent = true;
        }
    }

    /// Withdrawal pressure (e.g. a run). Reserves never go below zero; an
    /// emptied bank is marked insolvent.
    pub fn drain(&mut self, fraction: f64) -> f64 {
        let taken = self.reserves.max(0.0) * fraction.clamp(0.0, 1.0);
        self.reserves -= taken;
        if self.reserves < 1.0 {
            self.solvent = false;
        }
        taken
    }
}

/// Bank with the most reserves that can cover `amount`. Ties go to the lower id.
pub fn choose_lender(banks: &[Bank], amount: f64) -> Option<usize> {
    banks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.can_lend(amount))
        .max_by(|(_, a), (_, b)| {
            a.reserves
                .total_cmp(&b.reserves)
                .then_with(|| b.id.cmp(&a.id))
        })
        .map(|(i, _)| i)
}

/// Largest new loan a borrower with this score can take.
pub fn credit_limit(score: f64) -> f64 {
    if score < LENDING_SCORE {
        0.0
    } else {
        (score - LENDING_SCORE) * 20.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installment_and_amortization() {
        let mut loan = Loan::new(1560.0, 0);
        let due = loan.installment(0.001);
        assert!((due.interest - 1.56).abs() < 1e-9);
        assert!((due.amortization - 10.0).abs() < 1e-9);

        loan.amortize(due.amortization);
        assert!((loan.principal - 1550.0).abs() < 1e-9);
        assert!(loan.active);

        loan.amortize(10_000.0);
        assert_eq!(loan.principal, 0.0);
        assert!(!loan.active);
        assert_eq!(loan.installment(0.001).total(), 0.0);
    }

    #[test]
    fn test_bank_lending_respects_reserves() {
        let mut bank = Bank::new(0, "First", 1000.0);
        assert!(bank.lend(2000.0).is_none());
        let loan = bank.lend(400.0).unwrap();
        assert_eq!(loan.principal, 400.0);
        assert_eq!(bank.reserves, 600.0);
    }

    #[test]
    fn test_drain_marks_insolvent() {
        let mut bank = Bank::new(0, "First", 1000.0);
        let taken = bank.drain(1.0);
        assert_eq!(taken, 1000.0);
        assert!(!bank.solvent);
        assert!(!bank.can_lend(1.0));
        bank.receive(50.0);
        assert!(bank.solvent);
    }

    #[test]
    fn test_choose_lender_prefers_deepest_reserves() {
        let banks = vec![
            Bank::new(0, "A", 500.0),
            Bank::new(1, "B", 900.0),
            Bank::new(2, "C", 900.0),
        ];
        assert_eq!(choose_lender(&banks, 100.0), Some(1));
        assert_eq!(choose_lender(&banks, 1000.0), None);
    }

    #[test]
    fn test_credit_limit() {
        assert_eq!(credit_limit(500.0), 0.0);
        assert!(credit_limit(750.0) > credit_limit(650.0));
    }
}
