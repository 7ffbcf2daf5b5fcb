use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::types::Tick;

use super::Metrics;

/// Minimum score awarded for beating the historical record.
pub const PASSING_SCORE: f64 = 60.0;
/// Gini at which the equality score bottoms out.
const GINI_FLOOR: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Lower bounds are inclusive: 90 is an A+, 89.99 an A.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Grade::APlus,
            s if s >= 80.0 => Grade::A,
            s if s >= 70.0 => Grade::B,
            s if s >= 60.0 => Grade::C,
            s if s >= 45.0 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

/// Relative weight of each domain in the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub equality: f64,
    pub growth: f64,
    pub stability: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            equality: 1.0,
            growth: 1.0,
            stability: 1.0,
        }
    }
}

/// What actually happened in the historical episode a scenario replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct DomainScores {
    pub equality: f64,
    pub growth: f64,
    pub stability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub scenario: String,
    pub domains: DomainScores,
    pub score: f64,
    pub grade: Grade,
    /// Percent change in GDP over the whole run.
    pub gdp_growth_total: f64,
    /// Tick of the sample growth is measured from.
    pub baseline_tick: Tick,
    pub final_metrics: Metrics,
    pub verdict: Option<String>,
    pub beat_history: bool,
}

fn clamp_score(x: f64) -> f64 {
    if x.is_finite() { x.clamp(0.0, 100.0) } else { 0.0 }
}

/// Domain scores for a finished run.
pub fn domain_scores(latest: &Metrics, gdp_growth_total: f64) -> DomainScores {
    let equality = clamp_score(100.0 * (1.0 - latest.gini / GINI_FLOOR));
    let growth = clamp_score(50.0 + 2.0 * gdp_growth_total);
    let unrest_penalty = 50.0 * latest.crime_rate + 30.0 * latest.unemployment;
    let stability = clamp_score(100.0 - 2.0 * latest.inflation.abs() - unrest_penalty);
    DomainScores {
        equality,
        growth,
        stability,
    }
}

/// Score a finished run. `baseline` is the first sample of the run and
/// `latest` the final one.
pub fn score_run(
    scenario: &str,
    baseline: &Metrics,
    latest: &Metrics,
    weights: &ScoreWeights,
    record: Option<&HistoricalRecord>,
) -> ScoreReport {
    let gdp_growth_total = if baseline.gdp > 0.0 {
        (latest.gdp / baseline.gdp - 1.0) * 100.0
    } else {
        0.0
    };
    let domains = domain_scores(latest, gdp_growth_total);

    let total_weight = weights.equality + weights.growth + weights.stability;
    let mut score = if total_weight > 0.0 {
        (domains.equality * weights.equality
            + domains.growth * weights.growth
            + domains.stability * weights.stability)
            / total_weight
    } else {
        (domains.equality + domains.growth + domains.stability) / 3.0
    };
    score = clamp_score(score);

    let mut beat_history = false;
    let verdict = record.map(|r| {
        beat_history = score > r.score;
        if beat_history {
            score = score.max(PASSING_SCORE);
            format!("You outperformed history ({}).", r.label)
        } else {
            format!("History did better ({}).", r.label)
        }
    });

    ScoreReport {
        scenario: scenario.to_string(),
        domains,
        score,
        grade: Grade::from_score(score),
        gdp_growth_total: if gdp_growth_total.is_finite() { gdp_growth_total } else { 0.0 },
        baseline_tick: baseline.tick,
        final_metrics: latest.clone(),
        verdict,
        beat_history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_bands_are_inclusive_at_lower_bound() {
        assert_eq!(Grade::from_score(100.0), Grade::APlus);
        assert_eq!(Grade::from_score(90.0), Grade::APlus);
        assert_eq!(Grade::from_score(89.999), Grade::A);
        assert_eq!(Grade::from_score(80.0), Grade::A);
        assert_eq!(Grade::from_score(70.0), Grade::B);
        assert_eq!(Grade::from_score(69.9), Grade::C);
        assert_eq!(Grade::from_score(60.0), Grade::C);
        assert_eq!(Grade::from_score(45.0), Grade::D);
        assert_eq!(Grade::from_score(44.9), Grade::F);
        assert_eq!(Grade::from_score(0.0), Grade::F);
        assert_eq!(Grade::from_score(f64::NAN), Grade::F);
    }

    #[test]
    fn grade_serializes_with_plus_sign() {
        assert_eq!(serde_json::to_string(&Grade::APlus).unwrap(), "\"A+\"");
    }

    fn start(gdp: f64) -> Metrics {
        Metrics { tick: 5, gdp, ..Metrics::default() }
    }

    #[test]
    fn domain_scores_reward_equality_growth_and_calm() {
        let d = domain_scores(&Metrics { gini: 0.0, ..Metrics::default() }, 25.0);
        assert_eq!(d.equality, 100.0);
        assert_eq!(d.growth, 100.0);
        assert_eq!(d.stability, 100.0);

        let d = domain_scores(&Metrics { gini: 0.9, inflation: 60.0, ..Metrics::default() }, -40.0);
        assert_eq!(d.equality, 0.0);
        assert_eq!(d.growth, 0.0);
        assert_eq!(d.stability, 0.0);
    }

    #[test]
    fn growth_is_measured_from_the_baseline() {
        let last = Metrics { tick: 900, gdp: 150.0, ..Metrics::default() };
        let report = score_run("sandbox", &start(100.0), &last, &ScoreWeights::default(), None);
        assert_eq!(report.baseline_tick, 5);
        assert!((report.gdp_growth_total - 50.0).abs() < 1e-9);

        let report = score_run("sandbox", &start(0.0), &last, &ScoreWeights::default(), None);
        assert_eq!(report.gdp_growth_total, 0.0);
    }

    #[test]
    fn beating_history_boosts_to_passing() {
        let last = Metrics {
            gdp: 100.0,
            gini: 0.6,
            inflation: 20.0,
            unemployment: 0.3,
            ..Metrics::default()
        };
        let record = HistoricalRecord {
            label: "1929-1939".to_string(),
            score: 20.0,
        };
        let report = score_run("great_depression", &start(100.0), &last, &ScoreWeights::default(), Some(&record));
        assert!(report.beat_history);
        assert_eq!(report.score, PASSING_SCORE);
        assert_eq!(report.grade, Grade::C);
        assert!(report.verdict.unwrap().contains("outperformed"));
    }

    #[test]
    fn losing_to_history_keeps_raw_score() {
        let last = Metrics { gdp: 50.0, gini: 0.5, ..Metrics::default() };
        let record = HistoricalRecord {
            label: "record".to_string(),
            score: 99.0,
        };
        let report = score_run("x", &start(100.0), &last, &ScoreWeights::default(), Some(&record));
        assert!(!report.beat_history);
        assert!(report.score < PASSING_SCORE);
        assert!((report.gdp_growth_total + 50.0).abs() < 1e-9);
    }

    #[test]
    fn weights_shift_the_final_score() {
        let last = Metrics { gdp: 100.0, gini: 0.0, inflation: 50.0, ..Metrics::default() };
        let growth_only = ScoreWeights { equality: 0.0, growth: 1.0, stability: 0.0 };
        let report = score_run("x", &start(100.0), &last, &growth_only, None);
        assert_eq!(report.score, 50.0);
        assert!(report.verdict.is_none());
    }
}
