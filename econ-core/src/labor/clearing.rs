use std::cmp::Ordering;

use crate::types::{AgentId, BusinessId};

// === LABOR ORDERS ===

/// Open positions a business is hiring for.
#[derive(Debug, Clone, PartialEq)]
pub struct LaborBid {
    pub business: BusinessId,
    pub wage: f64,
    pub slots: usize,
}

/// A job-seeker's offer to work.
#[derive(Debug, Clone, PartialEq)]
pub struct LaborAsk {
    pub agent: AgentId,
    /// Creation sequence of the agent; breaks skill ties.
    pub seq: u64,
    pub skill: f64,
    pub reservation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hire {
    pub agent: AgentId,
    pub business: BusinessId,
    pub wage: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaborMarketResult {
    pub hires: Vec<Hire>,
    /// Positions nobody acceptable applied for.
    pub unfilled: usize,
    /// Seekers left without a job.
    pub unmatched: usize,
}

// === CLEARING ===

fn by_wage_desc(a: &LaborBid, b: &LaborBid) -> Ordering {
    b.wage
        .total_cmp(&a.wage)
        .then_with(|| a.business.cmp(&b.business))
}

fn by_skill_desc(a: &LaborAsk, b: &LaborAsk) -> Ordering {
    b.skill.total_cmp(&a.skill).then_with(|| a.seq.cmp(&b.seq))
}

/// Match seekers to openings.
///
/// Openings are served best-paying first (ties by business id). Each slot
/// takes the most skilled remaining seeker whose reservation wage the offer
/// covers (ties go to the longest-standing agent). Every seeker is hired at most once.
pub fn clear_labor_market(mut bids: Vec<LaborBid>, mut asks: Vec<LaborAsk>) -> LaborMarketResult {
    bids.sort_by(by_wage_desc);
    asks.sort_by(by_skill_desc);

    let mut taken = vec![false; asks.len()];
    let mut result = LaborMarketResult::default();

    for bid in &bids {
        for _ in 0..bid.slots {
            let pick = asks
                .iter()
                .enumerate()
                .find(|(i, ask)| !taken[*i] && ask.reservation <= bid.wage);
            match pick {
                Some((i, ask)) => {
                    taken[i] = true;
                    result.hires.push(Hire {
                        agent: ask.agent,
                        business: bid.business,
                        wage: bid.wage,
                    });
                }
                None => result.unfilled += 1,
            }
        }
    }

    result.unmatched = taken.iter().filter(|t| !**t).count();
    result
}
