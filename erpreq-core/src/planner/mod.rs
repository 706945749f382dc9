//! Implementation plan generation
//!
//! A plan is written either by an external [`TextGenerator`] or by the
//! built-in template. Generation as a whole cannot fail: any error from the
//! external generator selects the template instead.

pub mod schedule;
pub mod template;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ai::{AiError, TextGenerator};
use crate::analyzer::Analysis;

pub use schedule::{PhaseWindow, Schedule};

/// Which strategy produced a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanSource {
    /// Written by the external generator
    External { generator: String },
    /// External generation failed; the template was used
    Fallback { reason: String },
    /// No external generator configured
    Template,
}

/// A generated plan and how it was produced
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPlan {
    pub text: String,
    pub source: PlanSource,
}

/// Produces implementation plans from analyses
#[derive(Default)]
pub struct PlanGenerator {
    external: Option<Box<dyn TextGenerator>>,
}

impl PlanGenerator {
    /// Generator that prefers `external` and falls back to the template
    pub fn new(external: Option<Box<dyn TextGenerator>>) -> Self {
        Self { external }
    }

    /// Generator that only ever uses the template
    pub fn template_only() -> Self {
        Self { external: None }
    }

    pub fn has_external(&self) -> bool {
        self.external.is_some()
    }

    /// Short description of the active strategy
    pub fn describe(&self) -> String {
        match &self.external {
            Some(generator) => format!("{} (template fallback)", generator.describe()),
            None => "built-in template".to_string(),
        }
    }

    /// Generates a plan, with phase dates counted from `now`
    pub fn generate(&self, analysis: &Analysis, now: DateTime<Utc>) -> GeneratedPlan {
        match self.try_external(analysis) {
            Some(Ok(text)) => GeneratedPlan {
                text,
                source: PlanSource::External {
                    generator: self.describe_external(),
                },
            },
            Some(Err(err)) => {
                log::warn!("Plan generation via {} failed: {}", self.describe_external(), err);
                GeneratedPlan {
                    text: generate_template_plan(analysis, now),
                    source: PlanSource::Fallback {
                        reason: err.to_string(),
                    },
                }
            }
            None => GeneratedPlan {
                text: generate_template_plan(analysis, now),
                source: PlanSource::Template,
            },
        }
    }

    /// Single attempt at the external generator; `None` when there is none
    fn try_external(&self, analysis: &Analysis) -> Option<Result<String, AiError>> {
        self.external.as_ref().map(|generator| {
            generator.generate_plan(
                &analysis.modules,
                analysis.complexity,
                &analysis.technical_requirements,
            )
        })
    }

    fn describe_external(&self) -> String {
        self.external
            .as_ref()
            .map(|g| g.describe())
            .unwrap_or_default()
    }
}

/// Renders the deterministic plan for an analysis
pub fn generate_template_plan(analysis: &Analysis, now: DateTime<Utc>) -> String {
    let schedule = Schedule::build(&analysis.estimated_duration, now);
    template::render_plan(analysis, &schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Complexity;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedGenerator(&'static str);

    impl TextGenerator for FixedGenerator {
        fn describe(&self) -> String {
            "fixed".to_string()
        }

        fn generate_plan(
            &self,
            modules: &[String],
            _complexity: Complexity,
            _technical_requirements: &[String],
        ) -> Result<String, AiError> {
            Ok(format!("{} for {}", self.0, modules.join("+")))
        }
    }

    struct FailingGenerator {
        calls: Arc<AtomicUsize>,
    }

    impl TextGenerator for FailingGenerator {
        fn describe(&self) -> String {
            "failing".to_string()
        }

        fn generate_plan(
            &self,
            _modules: &[String],
            _complexity: Complexity,
            _technical_requirements: &[String],
        ) -> Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AiError::RateLimited)
        }
    }

    fn analysis() -> Analysis {
        Analysis {
            modules: vec!["CRM".to_string(), "Sales".to_string()],
            complexity: Complexity::High,
            estimated_duration: "6 months".to_string(),
            key_features: vec!["We need quotes".to_string()],
            technical_requirements: Vec::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_template_only() {
        let plan = PlanGenerator::template_only().generate(&analysis(), now());
        assert_eq!(plan.source, PlanSource::Template);
        assert!(plan.text.contains("Estimated Duration: 24 weeks"));
    }

    #[test]
    fn test_external_success() {
        let generator = PlanGenerator::new(Some(Box::new(FixedGenerator("custom plan"))));
        let plan = generator.generate(&analysis(), now());
        assert_eq!(plan.text, "custom plan for CRM+Sales");
        assert_eq!(
            plan.source,
            PlanSource::External {
                generator: "fixed".to_string()
            }
        );
    }

    #[test]
    fn test_external_failure_falls_back_without_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let generator = PlanGenerator::new(Some(Box::new(FailingGenerator {
            calls: Arc::clone(&calls),
        })));

        let plan = generator.generate(&analysis(), now());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(plan.source, PlanSource::Fallback { .. }));
        assert_eq!(plan.text, generate_template_plan(&analysis(), now()));
    }

    #[test]
    fn test_template_plan_is_deterministic() {
        assert_eq!(
            generate_template_plan(&analysis(), now()),
            generate_template_plan(&analysis(), now())
        );
    }

    #[test]
    fn test_describe() {
        assert_eq!(PlanGenerator::template_only().describe(), "built-in template");
        let generator = PlanGenerator::new(Some(Box::new(FixedGenerator("x"))));
        assert!(generator.has_external());
        assert_eq!(generator.describe(), "fixed (template fallback)");
    }
}
