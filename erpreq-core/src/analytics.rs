//! Aggregate statistics over stored requirements
//!
//! Every chart is returned as two parallel arrays (`labels`, `values`) that
//! can be handed straight to a charting library. None of the reducers return
//! an empty or all-zero series where a chart would break; they substitute a
//! sentinel instead.

use serde::{Deserialize, Serialize};

use crate::models::{Complexity, CustomizationType, Requirement};
use crate::timeline;

/// Number of modules shown in the module chart
const TOP_MODULES: usize = 5;

/// Average-score cutoffs between Low/Medium and Medium/High
const LOW_CUTOFF: f64 = 1.67;
const MEDIUM_CUTOFF: f64 = 2.34;

const NOT_AVAILABLE: &str = "N/A";

const TIMELINE_BUCKETS: [&str; 4] = ["1-3 months", "4-6 months", "7-12 months", "12+ months"];

/// Parallel label/value arrays for one chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<u64>,
}

impl ChartSeries {
    fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>, values: Vec<u64>) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            values,
        }
    }

    /// Iterates `(label, value)` pairs
    pub fn points(&self) -> impl Iterator<Item = (&str, u64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// Headline numbers for the analytics page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementStats {
    pub total_requirements: usize,
    /// "Low", "Medium", "High" or "N/A"
    pub avg_complexity: String,
    /// Most frequent customization type, e.g. "Workflow Adjustment", or "N/A"
    pub common_type: String,
}

/// Everything the analytics view shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub modules: ChartSeries,
    pub complexity: ChartSeries,
    pub timeline: ChartSeries,
    pub stats: RequirementStats,
}

impl AnalyticsReport {
    pub fn from_requirements(requirements: &[Requirement]) -> Self {
        Self {
            modules: module_histogram(requirements),
            complexity: complexity_histogram(requirements),
            timeline: timeline_histogram(requirements),
            stats: requirement_stats(requirements),
        }
    }
}

/// Counts items keeping first-seen order, then sorts by count (stable)
fn ranked_counts<T, I>(items: I) -> Vec<(T, u64)>
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    let mut counts: Vec<(T, u64)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(seen, _)| *seen == item) {
            Some((_, count)) => *count += 1,
            None => counts.push((item, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Top five modules by number of mentions
pub fn module_histogram(requirements: &[Requirement]) -> ChartSeries {
    let mut ranked = ranked_counts(requirements.iter().flat_map(|r| r.modules()));
    ranked.truncate(TOP_MODULES);

    if ranked.is_empty() {
        return ChartSeries::new(["No data"], vec![0]);
    }

    let (labels, values): (Vec<String>, Vec<u64>) = ranked.into_iter().unzip();
    ChartSeries { labels, values }
}

/// Requirement counts per complexity tier, in Low/Medium/High order
pub fn complexity_histogram(requirements: &[Requirement]) -> ChartSeries {
    let tiers = [Complexity::Low, Complexity::Medium, Complexity::High];
    let values: Vec<u64> = tiers
        .iter()
        .map(|tier| requirements.iter().filter(|r| r.complexity == *tier).count() as u64)
        .collect();

    let values = if values.iter().all(|v| *v == 0) {
        vec![0, 1, 0]
    } else {
        values
    };

    ChartSeries::new(tiers.iter().map(|t| t.title()), values)
}

/// Index of the timeline bucket for a month count; `None` for 0
fn timeline_bucket(months: u32) -> Option<usize> {
    match months {
        0 => None,
        1..=3 => Some(0),
        4..=6 => Some(1),
        7..=12 => Some(2),
        _ => Some(3),
    }
}

/// Requirement counts per preferred-timeline range
pub fn timeline_histogram(requirements: &[Requirement]) -> ChartSeries {
    let mut counts = vec![0u64; TIMELINE_BUCKETS.len()];
    for requirement in requirements {
        let months = timeline::parse_months(requirement.preferred_timeline.as_deref());
        if let Some(bucket) = timeline_bucket(months) {
            counts[bucket] += 1;
        }
    }
    ChartSeries::new(TIMELINE_BUCKETS, counts)
}

/// Label for an average complexity score
pub fn complexity_label(average: f64) -> &'static str {
    if average < LOW_CUTOFF {
        "Low"
    } else if average < MEDIUM_CUTOFF {
        "Medium"
    } else {
        "High"
    }
}

/// "workflow_adjustment" -> "Workflow Adjustment"
fn title_case(raw: &str) -> String {
    raw.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Total count, average complexity and most common customization type
pub fn requirement_stats(requirements: &[Requirement]) -> RequirementStats {
    if requirements.is_empty() {
        return RequirementStats {
            total_requirements: 0,
            avg_complexity: NOT_AVAILABLE.to_string(),
            common_type: NOT_AVAILABLE.to_string(),
        };
    }

    let total_score: u32 = requirements.iter().map(|r| r.complexity.score()).sum();
    let average = total_score as f64 / requirements.len() as f64;

    let common_type = ranked_counts::<CustomizationType, _>(
        requirements.iter().map(|r| r.customization_type),
    )
    .first()
    .map(|(kind, _)| title_case(kind.as_str()))
    .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    RequirementStats {
        total_requirements: requirements.len(),
        avg_complexity: complexity_label(average).to_string(),
        common_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn requirement(
        modules: &str,
        complexity: Complexity,
        kind: CustomizationType,
        timeline: Option<&str>,
    ) -> Requirement {
        let mut req = Requirement::new(
            Uuid::new_v4(),
            "Scope".to_string(),
            kind,
            modules.to_string(),
            "Details".to_string(),
        );
        req.complexity = complexity;
        req.preferred_timeline = timeline.map(String::from);
        req
    }

    fn with_complexity(complexity: Complexity) -> Requirement {
        requirement("CRM", complexity, CustomizationType::NewModule, None)
    }

    #[test]
    fn test_empty_collection_sentinels() {
        let report = AnalyticsReport::from_requirements(&[]);
        assert_eq!(report.modules.labels, vec!["No data"]);
        assert_eq!(report.modules.values, vec![0]);
        assert_eq!(report.complexity.labels, vec!["Low", "Medium", "High"]);
        assert_eq!(report.complexity.values, vec![0, 1, 0]);
        assert_eq!(report.timeline.values, vec![0, 0, 0, 0]);
        assert_eq!(report.stats.total_requirements, 0);
        assert_eq!(report.stats.avg_complexity, "N/A");
        assert_eq!(report.stats.common_type, "N/A");
    }

    #[test]
    fn test_module_histogram_top_five_with_first_seen_ties() {
        let reqs = vec![
            requirement("CRM, Sales", Complexity::Low, CustomizationType::NewModule, None),
            requirement("Inventory, CRM", Complexity::Low, CustomizationType::NewModule, None),
            requirement(
                "HR, Payroll, Accounting, Fleet",
                Complexity::Low,
                CustomizationType::NewModule,
                None,
            ),
        ];
        let series = module_histogram(&reqs);
        assert_eq!(series.labels, vec!["CRM", "Sales", "Inventory", "HR", "Payroll"]);
        assert_eq!(series.values, vec![2, 1, 1, 1, 1]);
    }

    #[test]
    fn test_module_histogram_counts_empty_entries() {
        let reqs = vec![requirement("CRM,", Complexity::Low, CustomizationType::NewModule, None)];
        let series = module_histogram(&reqs);
        assert_eq!(series.labels, vec!["CRM", ""]);
    }

    #[test]
    fn test_complexity_histogram_order() {
        let reqs = vec![
            with_complexity(Complexity::High),
            with_complexity(Complexity::High),
            with_complexity(Complexity::Low),
        ];
        assert_eq!(complexity_histogram(&reqs).values, vec![1, 0, 2]);
    }

    #[test]
    fn test_timeline_buckets() {
        let timelines = [
            Some("2 months"),
            Some("3 mo"),
            Some("6 months"),
            Some("9 months"),
            Some("12 months"),
            Some("18 months"),
            Some("soon"),
            Some("0 months"),
            None,
        ];
        let reqs: Vec<Requirement> = timelines
            .iter()
            .map(|t| requirement("CRM", Complexity::Low, CustomizationType::NewModule, *t))
            .collect();
        let series = timeline_histogram(&reqs);
        assert_eq!(series.labels, TIMELINE_BUCKETS.to_vec());
        assert_eq!(series.values, vec![2, 1, 2, 1]);
    }

    #[test]
    fn test_oversized_timeline_counts_as_longest_bucket() {
        let reqs = vec![requirement(
            "CRM",
            Complexity::Low,
            CustomizationType::NewModule,
            Some("5000000000 months"),
        )];
        assert_eq!(timeline_histogram(&reqs).values, vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_average_complexity_thresholds() {
        assert_eq!(complexity_label(1.0), "Low");
        assert_eq!(complexity_label(1.66), "Low");
        assert_eq!(complexity_label(1.67), "Medium");
        assert_eq!(complexity_label(2.33), "Medium");
        assert_eq!(complexity_label(2.34), "High");
    }

    #[test]
    fn test_average_exactly_at_low_cutoff_is_medium() {
        // 100 requirements scoring 167 in total: average is exactly 1.67
        let mut reqs: Vec<Requirement> = (0..67).map(|_| with_complexity(Complexity::Medium)).collect();
        reqs.extend((0..33).map(|_| with_complexity(Complexity::Low)));
        let stats = requirement_stats(&reqs);
        assert_eq!(stats.total_requirements, 100);
        assert_eq!(stats.avg_complexity, "Medium");
    }

    #[test]
    fn test_common_type_title_cased() {
        let reqs = vec![
            requirement("CRM", Complexity::High, CustomizationType::WorkflowAdjustment, None),
            requirement("CRM", Complexity::High, CustomizationType::Integration, None),
            requirement("CRM", Complexity::High, CustomizationType::WorkflowAdjustment, None),
        ];
        let stats = requirement_stats(&reqs);
        assert_eq!(stats.common_type, "Workflow Adjustment");
        assert_eq!(stats.avg_complexity, "High");
    }

    #[test]
    fn test_chart_series_serializes_as_parallel_arrays() {
        let json = serde_json::to_value(complexity_histogram(&[])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"labels": ["Low", "Medium", "High"], "values": [0, 1, 0]})
        );
    }
}
