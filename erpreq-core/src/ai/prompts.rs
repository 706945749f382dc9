//! Prompt Templates for Plan Generation
//!
//! Builds the messages sent to the plan-writing model from an analysis.

use crate::models::Complexity;

/// System message framing the model as an ERP consultant
pub const PLAN_SYSTEM_PROMPT: &str = "You are an expert ERP implementation consultant specializing in Odoo ERP systems. Generate detailed, practical implementation plans.";

/// Build the module context line
fn build_modules_context(modules: &[String]) -> String {
    modules.join(", ")
}

/// Build the technical requirements block
fn build_technical_context(technical_requirements: &[String]) -> String {
    if technical_requirements.is_empty() {
        "No specific technical requirements".to_string()
    } else {
        technical_requirements.join("\n")
    }
}

/// Build prompt for generating an implementation plan
pub fn build_plan_prompt(
    modules: &[String],
    complexity: Complexity,
    technical_requirements: &[String],
) -> String {
    format!(
        r#"Generate a detailed ERP implementation plan for the following requirements:

Core Modules to be implemented: {}
Project Complexity: {}
Technical Requirements:
{}

The plan should include:
1. Project Overview with timeline estimates
2. Detailed phase breakdown (Initial Setup, Development, Testing, Deployment)
3. Specific tasks and milestones for each phase
4. Risk assessment and mitigation strategies
5. Technical considerations and best practices
6. Resource allocation recommendations

Please format the response with Markdown headings and bullet points."#,
        build_modules_context(modules),
        complexity.as_str(),
        build_technical_context(technical_requirements),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_prompt_embeds_analysis() {
        let prompt = build_plan_prompt(
            &["CRM".to_string(), "Sales".to_string()],
            Complexity::High,
            &["Postgres 14".to_string()],
        );
        assert!(prompt.contains("Core Modules to be implemented: CRM, Sales"));
        assert!(prompt.contains("Project Complexity: high"));
        assert!(prompt.contains("Postgres 14"));
    }

    #[test]
    fn test_plan_prompt_without_technical_requirements() {
        let prompt = build_plan_prompt(&["CRM".to_string()], Complexity::Low, &[]);
        assert!(prompt.contains("No specific technical requirements"));
    }
}
