//! Keyword-based analysis of submitted requirements
//!
//! Classifies a requirement's complexity and pulls out the sentences that
//! the plan generator needs. Every function here is total: missing or empty
//! text simply produces empty lists.

use serde::{Deserialize, Serialize};

use crate::models::{Complexity, Requirement};

/// Words that push a requirement towards higher complexity
const COMPLEXITY_KEYWORDS: [&str; 5] = [
    "integration",
    "custom",
    "automation",
    "workflow",
    "third-party",
];

/// Words that mark a sentence as a key feature
const FEATURE_KEYWORDS: [&str; 4] = ["need", "should", "must", "require"];

/// Derived classification of a requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub modules: Vec<String>,
    pub complexity: Complexity,
    /// Preferred timeline as submitted, empty when none was given
    pub estimated_duration: String,
    pub key_features: Vec<String>,
    pub technical_requirements: Vec<String>,
}

/// Analyzes a requirement
pub fn analyze(requirement: &Requirement) -> Analysis {
    Analysis {
        modules: parse_modules(&requirement.modules_involved),
        complexity: classify_complexity(
            &requirement.project_scope,
            &requirement.functional_requirements,
        ),
        estimated_duration: requirement.preferred_timeline.clone().unwrap_or_default(),
        key_features: extract_key_features(&requirement.functional_requirements),
        technical_requirements: requirement
            .technical_constraints
            .as_deref()
            .map(split_sentences)
            .unwrap_or_default(),
    }
}

/// Splits a comma-separated module list, trimming each entry.
///
/// Empty entries (e.g. from a trailing comma) are kept.
pub fn parse_modules(modules_involved: &str) -> Vec<String> {
    modules_involved
        .split(',')
        .map(|m| m.trim().to_string())
        .collect()
}

/// Counts distinct complexity keywords present in scope + requirements.
pub fn complexity_score(project_scope: &str, functional_requirements: &str) -> usize {
    let text = format!("{} {}", project_scope, functional_requirements).to_lowercase();
    COMPLEXITY_KEYWORDS
        .iter()
        .filter(|kw| text.contains(*kw))
        .count()
}

pub fn classify_complexity(project_scope: &str, functional_requirements: &str) -> Complexity {
    match complexity_score(project_scope, functional_requirements) {
        0 => Complexity::Low,
        1 | 2 => Complexity::Medium,
        _ => Complexity::High,
    }
}

/// Sentences of the functional requirements that state a need
pub fn extract_key_features(functional_requirements: &str) -> Vec<String> {
    split_sentences(functional_requirements)
        .into_iter()
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            FEATURE_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .collect()
}

/// Splits text on periods, returning trimmed non-empty sentences
fn split_sentences(text: &str) -> Vec<String> {
    text.split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CustomizationType;
    use uuid::Uuid;

    fn requirement(scope: &str, functional: &str) -> Requirement {
        Requirement::new(
            Uuid::new_v4(),
            scope.to_string(),
            CustomizationType::Integration,
            "CRM".to_string(),
            functional.to_string(),
        )
    }

    #[test]
    fn test_parse_modules_trims_entries() {
        assert_eq!(
            parse_modules("CRM, Sales ,  Inventory"),
            vec!["CRM", "Sales", "Inventory"]
        );
    }

    #[test]
    fn test_parse_modules_keeps_empty_and_duplicate_entries() {
        assert_eq!(parse_modules("CRM,,CRM,"), vec!["CRM", "", "CRM", ""]);
    }

    #[test]
    fn test_complexity_boundaries() {
        assert_eq!(classify_complexity("Plain reporting", ""), Complexity::Low);
        assert_eq!(
            classify_complexity("A custom screen", "with a new workflow"),
            Complexity::Medium
        );
        assert_eq!(
            classify_complexity("A custom screen", "with workflow automation"),
            Complexity::High
        );
    }

    #[test]
    fn test_complexity_counts_presence_not_frequency() {
        assert_eq!(complexity_score("custom custom custom", "custom"), 1);
        assert_eq!(
            classify_complexity("custom custom custom", "custom"),
            Complexity::Medium
        );
    }

    #[test]
    fn test_key_features_case_insensitive() {
        let features = extract_key_features(
            "Users MUST approve orders. Dashboard is blue. We Need exports.",
        );
        assert_eq!(features, vec!["Users MUST approve orders", "We Need exports"]);
    }

    #[test]
    fn test_analyze_empty_text_degrades_gracefully() {
        let mut req = requirement("", "");
        req.modules_involved = String::new();
        let analysis = analyze(&req);
        assert_eq!(analysis.modules, vec![""]);
        assert_eq!(analysis.complexity, Complexity::Low);
        assert_eq!(analysis.estimated_duration, "");
        assert!(analysis.key_features.is_empty());
        assert!(analysis.technical_requirements.is_empty());
    }

    #[test]
    fn test_technical_requirements_unfiltered() {
        let mut req = requirement("Scope", "Nothing here");
        req.technical_constraints = Some("Postgres 14. Runs on-prem.  . ".to_string());
        req.preferred_timeline = Some("6 months".to_string());
        let analysis = analyze(&req);
        assert_eq!(
            analysis.technical_requirements,
            vec!["Postgres 14", "Runs on-prem"]
        );
        assert_eq!(analysis.estimated_duration, "6 months");
    }

    #[test]
    fn test_end_to_end_high_complexity() {
        let mut req = requirement(
            "",
            "We need integration with a custom third-party workflow automation tool.",
        );
        req.technical_constraints = Some(String::new());
        let analysis = analyze(&req);
        assert_eq!(
            complexity_score(&req.project_scope, &req.functional_requirements),
            5
        );
        assert_eq!(analysis.complexity, Complexity::High);
        assert_eq!(
            analysis.key_features,
            vec!["We need integration with a custom third-party workflow automation tool"]
        );
        assert!(analysis.technical_requirements.is_empty());
    }
}
