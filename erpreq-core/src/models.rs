use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of customization a requirement asks for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CustomizationType {
    NewModule,
    WorkflowAdjustment,
    ReportCustomization,
    Integration,
}

impl CustomizationType {
    pub const ALL: [CustomizationType; 4] = [
        CustomizationType::NewModule,
        CustomizationType::WorkflowAdjustment,
        CustomizationType::ReportCustomization,
        CustomizationType::Integration,
    ];

    /// Stored form, e.g. `workflow_adjustment`
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomizationType::NewModule => "new_module",
            CustomizationType::WorkflowAdjustment => "workflow_adjustment",
            CustomizationType::ReportCustomization => "report_customization",
            CustomizationType::Integration => "integration",
        }
    }

    /// Label shown on the submission form
    pub fn label(&self) -> &'static str {
        match self {
            CustomizationType::NewModule => "New Module",
            CustomizationType::WorkflowAdjustment => "Workflow Adjustment",
            CustomizationType::ReportCustomization => "Report Customization",
            CustomizationType::Integration => "Third-party Integration",
        }
    }
}

impl fmt::Display for CustomizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for CustomizationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "new_module" => Ok(CustomizationType::NewModule),
            "workflow_adjustment" => Ok(CustomizationType::WorkflowAdjustment),
            "report_customization" => Ok(CustomizationType::ReportCustomization),
            "integration" | "third_party_integration" => Ok(CustomizationType::Integration),
            other => Err(format!(
                "Unknown customization type '{}'. Expected one of: new_module, workflow_adjustment, report_customization, integration",
                other
            )),
        }
    }
}

/// Complexity tier assigned by the analyzer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }

    /// Weight used when averaging complexity across requirements
    pub fn score(&self) -> u32 {
        match self {
            Complexity::Low => 1,
            Complexity::Medium => 2,
            Complexity::High => 3,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Complexity::Low => "Low",
            Complexity::Medium => "Medium",
            Complexity::High => "High",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Complexity::Low),
            "medium" => Ok(Complexity::Medium),
            "high" => Ok(Complexity::High),
            other => Err(format!("Unknown complexity '{}'", other)),
        }
    }
}

/// Lifecycle status, always derived from overall progress
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl RequirementStatus {
    pub fn from_progress(overall: u8) -> Self {
        match overall {
            100 => RequirementStatus::Completed,
            0 => RequirementStatus::Pending,
            _ => RequirementStatus::InProgress,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementStatus::Pending => "pending",
            RequirementStatus::InProgress => "in_progress",
            RequirementStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementStatus::Pending => write!(f, "Pending"),
            RequirementStatus::InProgress => write!(f, "In Progress"),
            RequirementStatus::Completed => write!(f, "Completed"),
        }
    }
}

impl FromStr for RequirementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequirementStatus::Pending),
            "in_progress" => Ok(RequirementStatus::InProgress),
            "completed" => Ok(RequirementStatus::Completed),
            other => Err(format!("Unknown status '{}'", other)),
        }
    }
}

/// One of the four fixed implementation stages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    InitialSetup,
    Development,
    Testing,
    Deployment,
}

impl Phase {
    /// Phases in execution order
    pub const ALL: [Phase; 4] = [
        Phase::InitialSetup,
        Phase::Development,
        Phase::Testing,
        Phase::Deployment,
    ];

    /// Key used in progress maps, e.g. `initial_setup`
    pub fn key(&self) -> &'static str {
        match self {
            Phase::InitialSetup => "initial_setup",
            Phase::Development => "development",
            Phase::Testing => "testing",
            Phase::Deployment => "deployment",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Phase::InitialSetup => "Initial Setup",
            Phase::Development => "Development",
            Phase::Testing => "Testing",
            Phase::Deployment => "Deployment",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Phase::ALL.iter().copied().find(|p| p.key() == key)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Percent complete for each phase (0-100)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PhaseProgress {
    #[serde(default)]
    pub initial_setup: u8,
    #[serde(default)]
    pub development: u8,
    #[serde(default)]
    pub testing: u8,
    #[serde(default)]
    pub deployment: u8,
}

impl PhaseProgress {
    /// Builds progress from `(phase name, percent)` pairs.
    ///
    /// Phases that are not mentioned stay at 0, unknown names are ignored and
    /// percentages are clamped into 0..=100.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        let mut progress = PhaseProgress::default();
        for (name, percent) in entries {
            if let Some(phase) = Phase::from_key(name.trim()) {
                progress.set(phase, percent.clamp(0, 100) as u8);
            }
        }
        progress
    }

    pub fn get(&self, phase: Phase) -> u8 {
        match phase {
            Phase::InitialSetup => self.initial_setup,
            Phase::Development => self.development,
            Phase::Testing => self.testing,
            Phase::Deployment => self.deployment,
        }
    }

    pub fn set(&mut self, phase: Phase, percent: u8) {
        let percent = percent.min(100);
        match phase {
            Phase::InitialSetup => self.initial_setup = percent,
            Phase::Development => self.development = percent,
            Phase::Testing => self.testing = percent,
            Phase::Deployment => self.deployment = percent,
        }
    }

    /// Integer-division average of the four phases
    pub fn overall(&self) -> u8 {
        let total: u32 = Phase::ALL.iter().map(|p| self.get(*p) as u32).sum();
        (total / Phase::ALL.len() as u32) as u8
    }
}

/// Raw form fields of a submission, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequirementInput {
    pub project_scope: String,
    pub customization_type: String,
    pub modules_involved: String,
    pub functional_requirements: String,
    #[serde(default)]
    pub technical_constraints: Option<String>,
    #[serde(default)]
    pub preferred_timeline: Option<String>,
}

/// A submitted ERP customization request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    /// Unique identifier (UUID)
    pub id: Uuid,

    /// Human-friendly ID (e.g., "REQ-001"), assigned when stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_id: Option<String>,

    /// User who submitted the requirement
    pub owner_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,

    pub project_scope: String,
    pub customization_type: CustomizationType,

    /// Comma-separated module list exactly as submitted
    pub modules_involved: String,

    pub functional_requirements: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_constraints: Option<String>,

    /// Free-form duration such as "6 months"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_timeline: Option<String>,

    #[serde(default)]
    pub complexity: Complexity,

    #[serde(default)]
    pub implementation_plan: String,

    #[serde(default)]
    pub status: RequirementStatus,

    #[serde(default)]
    pub phase_progress: PhaseProgress,

    #[serde(default)]
    pub overall_progress: u8,
}

impl Requirement {
    /// Creates a pending requirement with no plan yet
    pub fn new(
        owner_id: Uuid,
        project_scope: String,
        customization_type: CustomizationType,
        modules_involved: String,
        functional_requirements: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            spec_id: None,
            owner_id,
            created_at: now,
            last_updated: now,
            project_scope,
            customization_type,
            modules_involved,
            functional_requirements,
            technical_constraints: None,
            preferred_timeline: None,
            complexity: Complexity::default(),
            implementation_plan: String::new(),
            status: RequirementStatus::Pending,
            phase_progress: PhaseProgress::default(),
            overall_progress: 0,
        }
    }

    /// Module names parsed from the comma-separated field
    pub fn modules(&self) -> Vec<String> {
        crate::analyzer::parse_modules(&self.modules_involved)
    }

    /// Replaces phase progress and re-derives overall progress and status
    pub fn apply_progress(&mut self, progress: PhaseProgress) {
        self.phase_progress = progress;
        self.overall_progress = progress.overall();
        self.status = RequirementStatus::from_progress(self.overall_progress);
        self.last_updated = Utc::now();
    }

    /// Display ID: spec_id if assigned, otherwise the UUID
    pub fn display_id(&self) -> String {
        self.spec_id.clone().unwrap_or_else(|| self.id.to_string())
    }
}

/// A comment left on a requirement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub requirement_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(requirement_id: Uuid, author_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            requirement_id,
            author_id,
            content,
            created_at: Utc::now(),
        }
    }
}

/// An account that can submit requirements
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            is_admin: false,
            created_at: Utc::now(),
        }
    }
}

/// Everything persisted by a backend, as one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementsStore {
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Next number for REQ-NNN identifiers
    #[serde(default = "default_next_number")]
    pub next_requirement_number: u32,
}

fn default_next_number() -> u32 {
    1
}

impl Default for RequirementsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RequirementsStore {
    pub fn new() -> Self {
        Self {
            requirements: Vec::new(),
            users: Vec::new(),
            comments: Vec::new(),
            next_requirement_number: 1,
        }
    }

    /// Returns the next REQ-NNN id and advances the counter
    pub fn next_spec_id(&mut self) -> String {
        let spec_id = format_spec_id(self.next_requirement_number);
        self.next_requirement_number += 1;
        spec_id
    }

    /// Adds a requirement, assigning a spec_id if it has none
    pub fn add_requirement(&mut self, mut requirement: Requirement) -> Requirement {
        if requirement.spec_id.is_none() {
            requirement.spec_id = Some(self.next_spec_id());
        }
        self.requirements.push(requirement.clone());
        requirement
    }

    pub fn get_requirement(&self, id: &Uuid) -> Option<&Requirement> {
        self.requirements.iter().find(|r| &r.id == id)
    }

    pub fn get_requirement_mut(&mut self, id: &Uuid) -> Option<&mut Requirement> {
        self.requirements.iter_mut().find(|r| &r.id == id)
    }

    pub fn get_requirement_by_spec_id(&self, spec_id: &str) -> Option<&Requirement> {
        self.requirements
            .iter()
            .find(|r| r.spec_id.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(spec_id)))
    }

    /// Removes a requirement and its comments. Returns false if it did not exist.
    pub fn remove_requirement(&mut self, id: &Uuid) -> bool {
        let before = self.requirements.len();
        self.requirements.retain(|r| &r.id != id);
        if self.requirements.len() == before {
            return false;
        }
        self.comments.retain(|c| &c.requirement_id != id);
        true
    }

    /// Removes a user with their requirements and every comment they wrote or
    /// that belonged to those requirements. Returns false if the user did not exist.
    pub fn remove_user(&mut self, id: &Uuid) -> bool {
        let before = self.users.len();
        self.users.retain(|u| &u.id != id);
        if self.users.len() == before {
            return false;
        }
        let owned: Vec<Uuid> = self
            .requirements
            .iter()
            .filter(|r| &r.owner_id == id)
            .map(|r| r.id)
            .collect();
        self.requirements.retain(|r| &r.owner_id != id);
        self.comments
            .retain(|c| &c.author_id != id && !owned.contains(&c.requirement_id));
        true
    }
}

/// Formats a requirement number as REQ-NNN
pub fn format_spec_id(number: u32) -> String {
    format!("REQ-{:03}", number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(owner: Uuid) -> Requirement {
        Requirement::new(
            owner,
            "Scope".to_string(),
            CustomizationType::NewModule,
            "CRM, Sales".to_string(),
            "We need a report.".to_string(),
        )
    }

    #[test]
    fn test_progress_all_complete() {
        let mut req = sample(Uuid::new_v4());
        req.apply_progress(PhaseProgress::from_entries([
            ("initial_setup", 100),
            ("development", 100),
            ("testing", 100),
            ("deployment", 100),
        ]));
        assert_eq!(req.overall_progress, 100);
        assert_eq!(req.status, RequirementStatus::Completed);
    }

    #[test]
    fn test_progress_all_zero_is_pending() {
        let mut req = sample(Uuid::new_v4());
        req.apply_progress(PhaseProgress::from_entries([
            ("initial_setup", 0),
            ("development", 0),
            ("testing", 0),
            ("deployment", 0),
        ]));
        assert_eq!(req.overall_progress, 0);
        assert_eq!(req.status, RequirementStatus::Pending);
    }

    #[test]
    fn test_progress_integer_division() {
        let mut req = sample(Uuid::new_v4());
        req.apply_progress(PhaseProgress::from_entries([("initial_setup", 50)]));
        assert_eq!(req.overall_progress, 12);
        assert_eq!(req.status, RequirementStatus::InProgress);
        assert_eq!(req.phase_progress.development, 0);
    }

    #[test]
    fn test_progress_clamps_and_ignores_unknown_phases() {
        let progress = PhaseProgress::from_entries([
            ("initial_setup", 250),
            ("testing", -5),
            ("go_live", 80),
        ]);
        assert_eq!(progress.initial_setup, 100);
        assert_eq!(progress.testing, 0);
        assert_eq!(progress.overall(), 25);
    }

    #[test]
    fn test_customization_type_parsing() {
        assert_eq!(
            "workflow_adjustment".parse::<CustomizationType>().unwrap(),
            CustomizationType::WorkflowAdjustment
        );
        assert_eq!(
            "Report Customization".parse::<CustomizationType>().unwrap(),
            CustomizationType::ReportCustomization
        );
        assert!("rewrite_everything".parse::<CustomizationType>().is_err());
    }

    #[test]
    fn test_store_assigns_sequential_spec_ids() {
        let mut store = RequirementsStore::new();
        let owner = Uuid::new_v4();
        let first = store.add_requirement(sample(owner));
        let second = store.add_requirement(sample(owner));
        assert_eq!(first.spec_id.as_deref(), Some("REQ-001"));
        assert_eq!(second.spec_id.as_deref(), Some("REQ-002"));
        assert!(store.get_requirement_by_spec_id("req-002").is_some());
    }

    #[test]
    fn test_remove_user_cascades() {
        let mut store = RequirementsStore::new();
        let alice = User::new("alice".into(), "a@example.com".into(), "x".into());
        let bob = User::new("bob".into(), "b@example.com".into(), "x".into());
        store.users.push(alice.clone());
        store.users.push(bob.clone());

        let alice_req = store.add_requirement(sample(alice.id));
        let bob_req = store.add_requirement(sample(bob.id));
        store
            .comments
            .push(Comment::new(alice_req.id, bob.id, "on alice's".into()));
        store
            .comments
            .push(Comment::new(bob_req.id, alice.id, "alice on bob's".into()));
        store
            .comments
            .push(Comment::new(bob_req.id, bob.id, "bob on bob's".into()));

        assert!(store.remove_user(&alice.id));
        assert_eq!(store.requirements.len(), 1);
        assert_eq!(store.comments.len(), 1);
        assert_eq!(store.comments[0].content, "bob on bob's");
        assert!(!store.remove_user(&alice.id));
    }
}
