//! Ordered, human-readable guidance derived from a bias report.
//!
//! Blocks are emitted in a fixed order: overview, demographic, text,
//! statistical, outliers, best practices.

use super::{DemographicReport, StatisticalReport, TextBiasReport};

const CRITICAL_THRESHOLD: f64 = 70.0;
const MODERATE_THRESHOLD: f64 = 40.0;
const BEST_PRACTICES_THRESHOLD: f64 = 20.0;
const HIGH_TOXIC_VOLUME: usize = 50;
const HIGH_OUTLIER_PERCENTAGE: f64 = 10.0;
const NAMED_COLUMNS: usize = 5;

fn overview(score: f64, recs: &mut Vec<String>) {
    if score > CRITICAL_THRESHOLD {
        recs.push(
            "[CRITICAL] Dataset shows high bias levels (>70%). Immediate action required before deployment."
                .into(),
        );
        recs.push(
            "-> Recommendation: Collect additional diverse data to balance underrepresented groups."
                .into(),
        );
    } else if score > MODERATE_THRESHOLD {
        recs.push(
            "[MODERATE] Significant bias detected (40-70%). Review data collection practices.".into(),
        );
        recs.push(
            "-> Recommendation: Implement stratified sampling to ensure fair representation.".into(),
        );
    } else {
        recs.push(
            "[LOW] Bias levels are acceptable (<40%). Continue monitoring for changes.".into(),
        );
    }
}

fn demographic_block(report: &DemographicReport, recs: &mut Vec<String>) {
    if report.imbalanced_columns.is_empty() {
        return;
    }
    let named: Vec<&str> = report
        .imbalanced_columns
        .iter()
        .take(NAMED_COLUMNS)
        .map(String::as_str)
        .collect();
    recs.push(format!(
        "[DEMOGRAPHIC] Demographic Imbalance: {} columns affected",
        report.imbalanced_columns.len()
    ));
    recs.push(format!("   Columns: {}", named.join(", ")));
    if let Some(worst) = report.imbalance_details.first() {
        recs.push(format!(
            "   Worst case: '{}' has {:.1}% in one category",
            worst.column,
            worst.max_proportion * 100.0
        ));
        recs.push(
            "-> Action: Apply resampling techniques (SMOTE, oversampling) to balance these groups."
                .into(),
        );
    }
}

fn text_block(report: &TextBiasReport, recs: &mut Vec<String>) {
    if report.toxic_texts.is_empty() {
        return;
    }
    recs.push(format!(
        "[TEXT] Text Bias: {} potentially toxic/biased text entries detected",
        report.toxic_count
    ));
    recs.push(
        "-> Action: Review and filter toxic content. Consider implementing content moderation."
            .into(),
    );
    if report.toxic_count > HIGH_TOXIC_VOLUME {
        recs.push(format!(
            "   ALERT: High volume of toxic content ({} instances). Data quality issue likely.",
            report.toxic_count
        ));
    }
}

fn statistical_blocks(report: &StatisticalReport, recs: &mut Vec<String>) {
    if !report.skewed_columns.is_empty() {
        let named: Vec<&str> = report
            .skewed_columns
            .iter()
            .take(NAMED_COLUMNS)
            .map(String::as_str)
            .collect();
        recs.push(format!(
            "[STATISTICAL] Statistical Skew: {} columns with high skewness",
            report.skewed_columns.len()
        ));
        recs.push(format!("   Columns: {}", named.join(", ")));
        recs.push(
            "-> Action: Apply log transformation, Box-Cox, or robust scaling to normalize distributions."
                .into(),
        );
    }

    let high_outliers = report
        .statistical_details
        .iter()
        .filter(|d| d.outlier_percentage > HIGH_OUTLIER_PERCENTAGE)
        .count();
    if high_outliers > 0 {
        recs.push(format!(
            "[OUTLIERS] Outliers: {high_outliers} columns have >10% outliers"
        ));
        recs.push(
            "-> Action: Investigate outliers - may indicate data entry errors or legitimate edge cases."
                .into(),
        );
    }
}

fn best_practices(recs: &mut Vec<String>) {
    recs.push(String::new());
    recs.push("[BEST PRACTICES]".into());
    recs.extend(
        [
            "   - Implement fairness metrics (demographic parity, equalized odds)",
            "   - Use adversarial debiasing during model training",
            "   - Conduct regular bias audits on production data",
            "   - Document data collection methodology and known limitations",
        ]
        .map(String::from),
    );
}

/// Build the recommendation list for an overall score and its sub-reports.
pub fn generate_recommendations(
    overall_score: f64,
    demographic: &DemographicReport,
    text: &TextBiasReport,
    statistical: &StatisticalReport,
) -> Vec<String> {
    let mut recs = Vec::new();
    overview(overall_score, &mut recs);
    demographic_block(demographic, &mut recs);
    text_block(text, &mut recs);
    statistical_blocks(statistical, &mut recs);
    if overall_score > BEST_PRACTICES_THRESHOLD {
        best_practices(&mut recs);
    }
    if recs.is_empty() {
        recs.push("[LOW] No significant bias detected. Dataset appears well-balanced.".into());
        recs.push("-> Continue monitoring: Run periodic bias checks as new data is added.".into());
    }
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ColumnImbalanceRecord, ColumnStatRecord, ToxicExample};
    use pretty_assertions::assert_eq;

    fn empty() -> (DemographicReport, TextBiasReport, StatisticalReport) {
        Default::default()
    }

    #[test]
    fn test_overview_buckets() {
        let (d, t, s) = empty();
        assert!(generate_recommendations(75.0, &d, &t, &s)[0].starts_with("[CRITICAL]"));
        assert!(generate_recommendations(55.0, &d, &t, &s)[0].starts_with("[MODERATE]"));
        assert!(generate_recommendations(40.0, &d, &t, &s)[0].starts_with("[LOW]"));
        assert!(generate_recommendations(70.0, &d, &t, &s)[0].starts_with("[MODERATE]"));
    }

    #[test]
    fn test_low_score_without_findings_is_single_line() {
        let (d, t, s) = empty();
        assert_eq!(
            generate_recommendations(5.0, &d, &t, &s),
            vec!["[LOW] Bias levels are acceptable (<40%). Continue monitoring for changes."]
        );
    }

    #[test]
    fn test_block_order() {
        let d = DemographicReport {
            score: 80.0,
            imbalanced_columns: vec!["gender".into()],
            imbalance_details: vec![ColumnImbalanceRecord {
                column: "gender".into(),
                max_proportion: 0.9,
                imbalance_ratio: 9.0,
                severity: 80.0,
                distribution: vec![],
            }],
            ..Default::default()
        };
        let t = TextBiasReport {
            score: 10.0,
            toxic_count: 60,
            toxic_texts: vec![ToxicExample {
                column: "c".into(),
                text: "x".into(),
                confidence: 0.9,
            }],
            ..Default::default()
        };
        let s = StatisticalReport {
            score: 30.0,
            skewed_columns: vec!["age".into()],
            statistical_details: vec![ColumnStatRecord {
                column: "age".into(),
                skewness: 9.0,
                kurtosis: 80.0,
                outlier_percentage: 12.0,
                bias_score: 40.0,
                mean: 1.0,
                median: 1.0,
                std: 1.0,
            }],
            ..Default::default()
        };
        let recs = generate_recommendations(40.0, &d, &t, &s);
        let tags: Vec<&str> = recs
            .iter()
            .filter(|r| r.starts_with('['))
            .map(|r| &r[..r.find(']').map_or(0, |i| i + 1)])
            .collect();
        assert_eq!(
            tags,
            vec![
                "[LOW]",
                "[DEMOGRAPHIC]",
                "[TEXT]",
                "[STATISTICAL]",
                "[OUTLIERS]",
                "[BEST PRACTICES]"
            ]
        );
        assert!(recs.iter().any(|r| r.contains("'gender' has 90.0% in one category")));
        assert!(recs.iter().any(|r| r.contains("ALERT: High volume")));
    }
}
