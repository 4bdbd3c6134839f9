//! Score aggregation
//!
//! Pure computation from per-answer scores to interview-level numbers.
//! Topic grouping and narrative text are produced by the scoring gateway,
//! not here.

use serde::Serialize;

/// Aggregate numeric result for one interview
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSummary {
    /// Sum of per-answer scores (unset scores count as 0)
    pub overall_score: f64,
    /// 5 points per answer
    pub max_score: f64,
    /// overall / max × 100, defined as 0 for zero answers
    pub overall_score_percent: f64,
    pub answer_count: usize,
}

/// Summarize a set of per-answer scores. `None` entries are unscored
/// answers and count as 0.
pub fn summarize(scores: &[Option<f64>]) -> ScoreSummary {
    let overall_score: f64 = scores.iter().map(|s| s.unwrap_or(0.0)).sum();
    let max_score = scores.len() as f64 * 5.0;
    let overall_score_percent = if max_score > 0.0 {
        overall_score / max_score * 100.0
    } else {
        0.0
    };

    ScoreSummary {
        overall_score,
        max_score,
        overall_score_percent,
        answer_count: scores.len(),
    }
}

/// Dashboard rollup across interviews: sum of scores over sum of maxima,
/// rescaled to [0, 5]. This is intentionally not the mean of the per-
/// interview percentages; interviews with more answers weigh more.
pub fn dashboard_average(rows: &[(f64, i64)]) -> f64 {
    let mut total_score = 0.0;
    let mut total_max = 0.0;
    for &(score_sum, answer_count) in rows {
        total_score += score_sum.max(0.0);
        total_max += if answer_count > 0 {
            answer_count as f64 * 5.0
        } else {
            5.0
        };
    }
    if total_max > 0.0 {
        total_score / total_max * 5.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_answers_scenario() {
        let scores = vec![Some(4.0), Some(3.0), Some(5.0), Some(2.0), Some(4.0)];
        let summary = summarize(&scores);
        assert_eq!(summary.overall_score, 18.0);
        assert_eq!(summary.max_score, 25.0);
        assert_eq!(summary.overall_score_percent, 72.0);
        assert_eq!(summary.answer_count, 5);
    }

    #[test]
    fn zero_answers_is_zero_percent() {
        let summary = summarize(&[]);
        assert_eq!(summary.overall_score, 0.0);
        assert_eq!(summary.max_score, 0.0);
        assert_eq!(summary.overall_score_percent, 0.0);
    }

    #[test]
    fn unscored_answers_count_as_zero() {
        let summary = summarize(&[Some(5.0), None, None, Some(5.0)]);
        assert_eq!(summary.overall_score, 10.0);
        assert_eq!(summary.overall_score_percent, 50.0);
    }

    #[test]
    fn percent_stays_in_range() {
        for n in 0..10usize {
            let scores: Vec<Option<f64>> = (0..n).map(|i| Some((i % 6) as f64)).collect();
            let summary = summarize(&scores);
            assert!(summary.overall_score_percent >= 0.0);
            assert!(summary.overall_score_percent <= 100.0);
        }
    }

    #[test]
    fn dashboard_rollup_weighs_by_answer_count() {
        // One interview 10/10, one interview 5/25: rollup is 15/35 * 5,
        // not the mean of 100% and 20%.
        let rows = vec![(10.0, 2), (5.0, 5)];
        let avg = dashboard_average(&rows);
        assert!((avg - 15.0 / 35.0 * 5.0).abs() < 1e-9);
    }

    #[test]
    fn dashboard_rollup_of_nothing_is_zero() {
        assert_eq!(dashboard_average(&[]), 0.0);
    }

    #[test]
    fn dashboard_rollup_treats_empty_interview_as_one_question() {
        // A completed interview with no answers still contributes max 5
        // to the denominator.
        let rows = vec![(0.0, 0)];
        assert_eq!(dashboard_average(&rows), 0.0);
    }
}
