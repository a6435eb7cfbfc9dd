use super::{DemographicReport, StatisticalReport, TextBiasReport};

/// Unweighted mean of the three sub-scores, clamped to [0, 100].
pub fn overall_bias_score(
    demographic: &DemographicReport,
    text: &TextBiasReport,
    statistical: &StatisticalReport,
) -> f64 {
    let scores = [demographic.score, text.score, statistical.score];
    let mean = scores.iter().map(|s| s.clamp(0.0, 100.0)).sum::<f64>() / scores.len() as f64;
    mean.clamp(0.0, 100.0)
}
