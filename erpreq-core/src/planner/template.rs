//! Built-in plan template used when no model is available.

use chrono::{DateTime, Utc};

use super::schedule::{PhaseWindow, Schedule};
use crate::analyzer::Analysis;
use crate::models::{Complexity, Phase};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A titled block of the rendered plan
struct Section {
    title: &'static str,
    lines: Vec<String>,
}

impl Section {
    fn render(&self) -> String {
        format!("# {}\n{}", self.title, self.lines.join("\n"))
    }
}

fn fmt_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn bullets(items: &[String]) -> impl Iterator<Item = String> + '_ {
    items.iter().map(|item| format!("- {}", item))
}

/// Renders the full plan for an analysis and its schedule
pub fn render_plan(analysis: &Analysis, schedule: &Schedule) -> String {
    [
        project_overview(analysis, schedule),
        implementation_phases(schedule),
        technical_requirements(analysis),
        risk_analysis(analysis),
    ]
    .iter()
    .map(Section::render)
    .collect::<Vec<_>>()
    .join("\n\n")
}

fn project_overview(analysis: &Analysis, schedule: &Schedule) -> Section {
    let mut lines = vec![
        format!("Complexity Level: {}", analysis.complexity.title()),
        format!("Estimated Duration: {} weeks", schedule.total_weeks),
        format!("Project Start Date: {}", fmt_date(&schedule.start)),
        format!("Project End Date: {}", fmt_date(&schedule.end)),
        String::new(),
        "Core Modules:".to_string(),
    ];
    lines.extend(bullets(&analysis.modules));
    lines.push(String::new());
    lines.push("Timeline Breakdown:".to_string());

    for window in &schedule.phases {
        lines.push(format!("- {}", window.phase.title()));
        lines.push(format!("  Start: {}", fmt_date(&window.start)));
        lines.push(format!("  End: {}", fmt_date(&window.end)));
        lines.push(String::new());
    }

    Section {
        title: "Project Overview",
        lines,
    }
}

/// Standard tasks for each phase
fn phase_tasks(phase: Phase) -> [&'static str; 4] {
    match phase {
        Phase::InitialSetup => [
            "Environment setup and configuration",
            "Module installation and basic configuration",
            "Initial database setup",
            "User access configuration",
        ],
        Phase::Development => [
            "Configure core modules",
            "Implement customizations",
            "Develop integrations",
            "Setup workflows",
        ],
        Phase::Testing => [
            "Unit testing",
            "Integration testing",
            "User acceptance testing",
            "Performance testing",
        ],
        Phase::Deployment => [
            "Data migration",
            "User training",
            "Go-live preparation",
            "Post-deployment support",
        ],
    }
}

fn phase_heading(window: &PhaseWindow) -> String {
    format!(
        "{} ({} to {})",
        window.phase.title(),
        fmt_date(&window.start),
        fmt_date(&window.end)
    )
}

fn implementation_phases(schedule: &Schedule) -> Section {
    let mut lines = Vec::new();
    for window in &schedule.phases {
        lines.push(phase_heading(window));
        lines.extend(phase_tasks(window.phase).iter().map(|t| format!("- {}", t)));
        lines.push(String::new());
    }

    Section {
        title: "Implementation Phases",
        lines,
    }
}

fn technical_requirements(analysis: &Analysis) -> Section {
    let mut lines = vec![
        "- Use only out-of-the-box Odoo features wherever possible".to_string(),
        "- Standard Odoo workflow configurations".to_string(),
    ];
    lines.extend(bullets(&analysis.technical_requirements));

    Section {
        title: "Technical Requirements",
        lines,
    }
}

/// Risks scaled to complexity and constraints
pub fn risks(analysis: &Analysis) -> Vec<&'static str> {
    let mut risks = vec![
        "Ensure all customizations stay within Odoo's standard feature set",
        "User adoption of standard Odoo workflows may require additional training",
    ];

    if analysis.complexity == Complexity::High {
        risks.push("Complex requirements may need to be simplified to fit standard features");
        risks.push("Timeline may need adjustment based on complexity");
    }

    if !analysis.technical_requirements.is_empty() {
        risks.push("Technical constraints may impact implementation approach");
    }

    risks
}

fn risk_analysis(analysis: &Analysis) -> Section {
    Section {
        title: "Risk Analysis",
        lines: risks(analysis).iter().map(|r| format!("- {}", r)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn analysis(complexity: Complexity, technical: &[&str]) -> Analysis {
        Analysis {
            modules: vec!["CRM".to_string(), "Sales".to_string()],
            complexity,
            estimated_duration: String::new(),
            key_features: Vec::new(),
            technical_requirements: technical.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_risks_baseline() {
        assert_eq!(risks(&analysis(Complexity::Low, &[])).len(), 2);
        assert_eq!(risks(&analysis(Complexity::Medium, &[])).len(), 2);
    }

    #[test]
    fn test_risks_escalate_with_complexity_and_constraints() {
        assert_eq!(risks(&analysis(Complexity::High, &[])).len(), 4);
        let all = risks(&analysis(Complexity::High, &["On-prem only"]));
        assert_eq!(all.len(), 5);
        assert_eq!(
            all.last().copied(),
            Some("Technical constraints may impact implementation approach")
        );
    }

    #[test]
    fn test_render_sections_in_order() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let a = analysis(Complexity::Medium, &["Postgres 14"]);
        let schedule = Schedule::build("", now);
        let text = render_plan(&a, &schedule);

        let overview = text.find("# Project Overview").unwrap();
        let phases = text.find("# Implementation Phases").unwrap();
        let technical = text.find("# Technical Requirements").unwrap();
        let risk = text.find("# Risk Analysis").unwrap();
        assert!(overview < phases && phases < technical && technical < risk);

        assert!(text.starts_with("# Project Overview\nComplexity Level: Medium\n"));
        assert!(text.contains("Estimated Duration: 12 weeks"));
        assert!(text.contains("Project Start Date: 2024-01-01"));
        assert!(text.contains("- CRM\n- Sales\n"));
        assert!(text.contains("- Postgres 14"));
        // Initial Setup is 2 weeks of the default 12
        assert!(text.contains("Initial Setup (2024-01-01 to 2024-01-15)"));
        assert!(text.contains("Development (2024-01-15 to 2024-02-19)"));
    }
}
