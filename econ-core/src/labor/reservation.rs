use serde::{Deserialize, Serialize};

/// Lowest wage a job-seeker accepts.
///
/// Takes the larger of two floors: what staying unemployed pays (the benefit,
/// scaled by a replacement ratio) and a skill-weighted base. Better trained
/// workers hold out for more.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationWageModel {
    pub base: f64,
    pub skill_weight: f64,
    pub education_weight: f64,
    /// Multiple of the unemployment benefit a worker needs to give it up.
    pub benefit_replacement: f64,
}

impl Default for ReservationWageModel {
    fn default() -> Self {
        Self {
            base: 10.0,
            skill_weight: 0.6,
            education_weight: 0.3,
            benefit_replacement: 1.25,
        }
    }
}

impl ReservationWageModel {
    pub fn reservation_wage(&self, skill: f64, education: f64, benefit: f64) -> f64 {
        let skill_floor = self.base
            * (0.5 + self.skill_weight * skill.clamp(0.0, 1.0)
                + self.education_weight * education.clamp(0.0, 1.0));
        let benefit_floor = benefit.max(0.0) * self.benefit_replacement;
        skill_floor.max(benefit_floor)
    }

    /// Long spells of unemployment erode what a worker holds out for.
    pub fn discounted(&self, reservation: f64, unemployed_ticks: u32) -> f64 {
        let erosion = (unemployed_ticks as f64 / 52.0).min(1.0) * 0.3;
        reservation * (1.0 - erosion)
    }
}
