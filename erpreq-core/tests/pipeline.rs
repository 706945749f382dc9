use chrono::{TimeZone, Utc};
use erpreq_core::{
    analyze, create_backend, AdminSettings, BackendType, Complexity, NewUser, PlanGenerator,
    PlanSource, RequirementInput, RequirementService, RequirementStatus,
};
use tempfile::TempDir;

fn submission() -> RequirementInput {
    RequirementInput {
        project_scope: "Custom workflow automation with third-party integration".to_string(),
        customization_type: "integration".to_string(),
        modules_involved: "CRM, Sales".to_string(),
        functional_requirements: "We need approval steps. It is blue.".to_string(),
        technical_constraints: None,
        preferred_timeline: Some("6 months".to_string()),
    }
}

fn open(dir: &TempDir, file: &str) -> RequirementService {
    let db = create_backend(&dir.path().join(file), None).unwrap();
    RequirementService::new(db, PlanGenerator::template_only())
}

#[test]
fn test_full_pipeline_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir, "erpreq.db");
    assert_eq!(svc.backend().backend_type(), BackendType::Sqlite);

    svc.bootstrap_admin(&AdminSettings::default()).unwrap();
    let admin = svc.find_user("admin").unwrap();
    let ana = svc
        .register_user(&NewUser {
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "secret".to_string(),
        })
        .unwrap();

    let result = svc.submit(&ana, &submission()).unwrap();
    assert_eq!(result.plan_source, PlanSource::Template);
    assert_eq!(result.analysis.complexity, Complexity::High);
    assert_eq!(result.analysis.key_features, vec!["We need approval steps"]);
    assert!(result.analysis.technical_requirements.is_empty());

    let plan = &result.requirement.implementation_plan;
    assert!(plan.contains("Estimated Duration: 24 weeks"));
    assert!(plan.contains("- CRM\n- Sales"));
    assert!(plan.contains("- Timeline may need adjustment based on complexity"));
    assert!(!plan.contains("Technical constraints may impact implementation approach"));

    // A second process sees the same data
    drop(svc);
    let svc = open(&dir, "erpreq.db");

    let updated = svc
        .update_progress(
            &admin,
            "REQ-001",
            [
                ("initial_setup", 100),
                ("development", 100),
                ("testing", 100),
                ("deployment", 100),
            ],
        )
        .unwrap();
    assert_eq!(updated.overall_progress, 100);
    assert_eq!(updated.status, RequirementStatus::Completed);

    svc.add_comment(&ana, "REQ-001", "Thanks!").unwrap();
    assert_eq!(svc.comments_for(&admin, "REQ-001").unwrap()[0].author, "ana");

    let report = svc.analytics().unwrap();
    assert_eq!(report.modules.labels, vec!["CRM", "Sales"]);
    assert_eq!(report.complexity.values, vec![0, 0, 1]);
    assert_eq!(report.stats.avg_complexity, "High");
    assert_eq!(report.stats.common_type, "Integration");
}

#[test]
fn test_yaml_backend_pipeline() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir, "erpreq.yaml");
    assert_eq!(svc.backend().backend_type(), BackendType::Yaml);

    svc.bootstrap_admin(&AdminSettings::default()).unwrap();
    let admin = svc.find_user("admin").unwrap();

    let mut input = submission();
    input.preferred_timeline = None;
    input.technical_constraints = Some("Must run on PostgreSQL 15. REST only".to_string());
    let result = svc.submit(&admin, &input).unwrap();

    assert_eq!(result.analysis.technical_requirements.len(), 2);
    assert!(result
        .requirement
        .implementation_plan
        .contains("Estimated Duration: 12 weeks"));

    svc.delete(&admin, "REQ-001").unwrap();
    assert_eq!(svc.analytics().unwrap().stats.total_requirements, 0);
}

#[test]
fn test_template_plan_is_reproducible_for_fixed_start() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir, "erpreq.db");
    svc.bootstrap_admin(&AdminSettings::default()).unwrap();
    let admin = svc.find_user("admin").unwrap();
    let stored = svc.submit(&admin, &submission()).unwrap().requirement;

    let analysis = analyze(&stored);
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let planner = PlanGenerator::template_only();
    let first = planner.generate(&analysis, start);
    let second = planner.generate(&analysis, start);

    assert_eq!(first.text, second.text);
    assert!(first.text.contains("Project Start Date: 2024-01-01"));
}
