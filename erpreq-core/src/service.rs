//! Requirement workflow: submission, progress, comments and user administration
//!
//! `RequirementService` ties storage, analysis and plan generation together
//! and enforces who may see or change what. Storage failures are logged here
//! and surfaced as [`ServiceError::Storage`].

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::analytics::AnalyticsReport;
use crate::analyzer::{self, Analysis};
use crate::auth::{self, AuthError};
use crate::config::AdminSettings;
use crate::db::DatabaseBackend;
use crate::models::{
    Comment, CustomizationType, PhaseProgress, Requirement, RequirementInput, User,
};
use crate::planner::{PlanGenerator, PlanSource};

/// Number of recent requirements shown on the admin dashboard
const DASHBOARD_RECENT: usize = 5;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Outcome of a submission
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub requirement: Requirement,
    pub analysis: Analysis,
    pub plan_source: PlanSource,
}

/// A comment together with its author's username
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub comment: Comment,
    pub author: String,
}

/// Headline numbers for administrators
#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub total_users: usize,
    pub total_requirements: usize,
    pub admin_count: usize,
    pub total_comments: usize,
    /// Most recently submitted first
    pub recent_requirements: Vec<Requirement>,
}

/// What `bootstrap_admin` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created,
    /// Existing account promoted and its password reset
    Promoted,
    /// Already an administrator; `default_password` is true when the
    /// bootstrap password still works
    Unchanged { default_password: bool },
}

/// Registration form fields
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct RequirementService {
    db: Box<dyn DatabaseBackend>,
    planner: PlanGenerator,
}

/// Trims and requires a non-blank value
fn required(value: &str, field: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional value, treating blank as absent
fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Logs a storage failure before converting it
fn storage<T>(result: anyhow::Result<T>, action: &str) -> ServiceResult<T> {
    result.map_err(|err| {
        log::error!("Failed to {}: {:#}", action, err);
        ServiceError::Storage(err)
    })
}

fn require_admin(actor: &User) -> ServiceResult<()> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(
            "administrator access required".to_string(),
        ))
    }
}

impl RequirementService {
    pub fn new(db: Box<dyn DatabaseBackend>, planner: PlanGenerator) -> Self {
        Self { db, planner }
    }

    pub fn backend(&self) -> &dyn DatabaseBackend {
        self.db.as_ref()
    }

    pub fn planner(&self) -> &PlanGenerator {
        &self.planner
    }

    // =========================================================================
    // Requirements
    // =========================================================================

    /// Builds an unsaved requirement from form input
    pub fn validate_input(owner_id: Uuid, input: &RequirementInput) -> ServiceResult<Requirement> {
        let project_scope = required(&input.project_scope, "Project scope")?;
        let customization_type: CustomizationType = required(
            &input.customization_type,
            "Customization type",
        )?
        .parse()
        .map_err(ServiceError::Validation)?;
        let modules_involved = required(&input.modules_involved, "Modules involved")?;
        let functional_requirements =
            required(&input.functional_requirements, "Functional requirements")?;

        let mut requirement = Requirement::new(
            owner_id,
            project_scope,
            customization_type,
            modules_involved,
            functional_requirements,
        );
        requirement.technical_constraints = optional(input.technical_constraints.as_deref());
        requirement.preferred_timeline = optional(input.preferred_timeline.as_deref());
        Ok(requirement)
    }

    /// Validates, analyzes, plans and stores a new requirement
    pub fn submit(&self, actor: &User, input: &RequirementInput) -> ServiceResult<Submission> {
        let mut requirement = Self::validate_input(actor.id, input)?;

        let analysis = analyzer::analyze(&requirement);
        let plan = self.planner.generate(&analysis, Utc::now());

        requirement.complexity = analysis.complexity;
        requirement.implementation_plan = plan.text;

        let requirement = storage(self.db.add_requirement(requirement), "store requirement")?;
        log::info!(
            "{} submitted {} ({} complexity)",
            actor.username,
            requirement.display_id(),
            requirement.complexity.as_str()
        );

        Ok(Submission {
            requirement,
            analysis,
            plan_source: plan.source,
        })
    }

    /// Finds a requirement by UUID or REQ-NNN
    pub fn resolve_requirement(&self, id: &str) -> ServiceResult<Requirement> {
        let id = id.trim();
        let found = match Uuid::parse_str(id) {
            Ok(uuid) => storage(self.db.get_requirement(&uuid), "load requirement")?,
            Err(_) => storage(self.db.get_requirement_by_spec_id(id), "load requirement")?,
        };
        found.ok_or_else(|| ServiceError::NotFound(format!("requirement {}", id)))
    }

    /// Owners and administrators may act on a requirement
    fn authorize(actor: &User, requirement: &Requirement) -> ServiceResult<()> {
        if actor.is_admin || requirement.owner_id == actor.id {
            Ok(())
        } else {
            Err(ServiceError::Unauthorized(format!(
                "{} may not access {}",
                actor.username,
                requirement.display_id()
            )))
        }
    }

    /// Requirements submitted by the actor
    pub fn requirements_for(&self, actor: &User) -> ServiceResult<Vec<Requirement>> {
        storage(
            self.db.list_requirements_for_owner(&actor.id),
            "list requirements",
        )
    }

    /// Every requirement; administrators only
    pub fn all_requirements(&self, actor: &User) -> ServiceResult<Vec<Requirement>> {
        require_admin(actor)?;
        storage(self.db.list_requirements(), "list requirements")
    }

    pub fn get(&self, actor: &User, id: &str) -> ServiceResult<Requirement> {
        let requirement = self.resolve_requirement(id)?;
        Self::authorize(actor, &requirement)?;
        Ok(requirement)
    }

    /// Re-runs the analyzer over a stored requirement
    pub fn analysis(&self, actor: &User, id: &str) -> ServiceResult<Analysis> {
        Ok(analyzer::analyze(&self.get(actor, id)?))
    }

    /// Replaces phase progress with the given `(phase, percent)` entries.
    /// Phases left out are reset to 0.
    pub fn update_progress<'a, I>(&self, actor: &User, id: &str, entries: I) -> ServiceResult<Requirement>
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        let requirement = self.get(actor, id)?;
        let progress = PhaseProgress::from_entries(entries);
        let updated = storage(
            self.db.update_progress(&requirement.id, progress),
            "update progress",
        )?;
        log::info!(
            "{} progress now {}% ({})",
            updated.display_id(),
            updated.overall_progress,
            updated.status.as_str()
        );
        Ok(updated)
    }

    pub fn delete(&self, actor: &User, id: &str) -> ServiceResult<Requirement> {
        let requirement = self.get(actor, id)?;
        storage(
            self.db.delete_requirement(&requirement.id),
            "delete requirement",
        )?;
        log::info!("{} deleted {}", actor.username, requirement.display_id());
        Ok(requirement)
    }

    pub fn add_comment(&self, actor: &User, id: &str, content: &str) -> ServiceResult<Comment> {
        let content = required(content, "Comment")?;
        let requirement = self.get(actor, id)?;
        storage(
            self.db
                .add_comment(Comment::new(requirement.id, actor.id, content)),
            "add comment",
        )
    }

    /// Comments on a requirement, oldest first
    pub fn comments_for(&self, actor: &User, id: &str) -> ServiceResult<Vec<CommentView>> {
        let requirement = self.get(actor, id)?;
        let comments = storage(self.db.list_comments(&requirement.id), "list comments")?;
        let users = storage(self.db.list_users(), "list users")?;

        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = users
                    .iter()
                    .find(|u| u.id == comment.author_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_else(|| "unknown".to_string());
                CommentView { comment, author }
            })
            .collect())
    }

    /// Charts and headline stats over all stored requirements
    pub fn analytics(&self) -> ServiceResult<AnalyticsReport> {
        let requirements = storage(self.db.list_requirements(), "list requirements")?;
        Ok(AnalyticsReport::from_requirements(&requirements))
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub fn find_user(&self, username: &str) -> ServiceResult<User> {
        storage(self.db.get_user_by_username(username.trim()), "load user")?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", username.trim())))
    }

    pub fn register_user(&self, new_user: &NewUser) -> ServiceResult<User> {
        let username = required(&new_user.username, "Username")?;
        let email = required(&new_user.email, "Email")?;
        if !email.contains('@') {
            return Err(ServiceError::Validation(format!(
                "'{}' is not an email address",
                email
            )));
        }

        if storage(self.db.get_user_by_username(&username), "load user")?.is_some() {
            return Err(ServiceError::Conflict(format!("username {}", username)));
        }
        if storage(self.db.get_user_by_email(&email), "load user")?.is_some() {
            return Err(ServiceError::Conflict(format!("email {}", email)));
        }

        let password_hash = auth::hash_password(&new_user.password)?;
        let user = storage(
            self.db.add_user(User::new(username, email, password_hash)),
            "add user",
        )?;
        log::info!("Registered user {}", user.username);
        Ok(user)
    }

    pub fn list_users(&self, actor: &User) -> ServiceResult<Vec<User>> {
        require_admin(actor)?;
        storage(self.db.list_users(), "list users")
    }

    /// Deletes a user along with their requirements and comments
    pub fn delete_user(&self, actor: &User, username: &str) -> ServiceResult<User> {
        require_admin(actor)?;
        let target = self.find_user(username)?;
        if target.id == actor.id {
            return Err(ServiceError::Forbidden(
                "administrators cannot delete their own account".to_string(),
            ));
        }
        storage(self.db.delete_user(&target.id), "delete user")?;
        log::info!("{} deleted user {}", actor.username, target.username);
        Ok(target)
    }

    /// Grants or revokes administrator rights
    pub fn set_admin(&self, actor: &User, username: &str, is_admin: bool) -> ServiceResult<User> {
        require_admin(actor)?;
        let mut target = self.find_user(username)?;
        if target.id == actor.id && !is_admin {
            return Err(ServiceError::Forbidden(
                "administrators cannot remove their own admin rights".to_string(),
            ));
        }
        target.is_admin = is_admin;
        storage(self.db.update_user(&target), "update user")?;
        log::info!(
            "{} set admin={} for {}",
            actor.username,
            is_admin,
            target.username
        );
        Ok(target)
    }

    pub fn admin_dashboard(&self, actor: &User) -> ServiceResult<AdminDashboard> {
        require_admin(actor)?;
        let store = storage(self.db.load(), "load database")?;

        let mut recent = store.requirements.clone();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(DASHBOARD_RECENT);

        Ok(AdminDashboard {
            total_users: store.users.len(),
            total_requirements: store.requirements.len(),
            admin_count: store.users.iter().filter(|u| u.is_admin).count(),
            total_comments: store.comments.len(),
            recent_requirements: recent,
        })
    }

    /// Ensures the configured administrator exists and has admin rights.
    /// Safe to call repeatedly.
    pub fn bootstrap_admin(&self, settings: &AdminSettings) -> ServiceResult<BootstrapOutcome> {
        match storage(self.db.get_user_by_username(&settings.username), "load user")? {
            None => {
                let mut admin = User::new(
                    settings.username.clone(),
                    settings.email.clone(),
                    auth::hash_password(&settings.password)?,
                );
                admin.is_admin = true;
                storage(self.db.add_user(admin), "add user")?;
                log::info!("Created administrator {}", settings.username);
                Ok(BootstrapOutcome::Created)
            }
            Some(mut user) if !user.is_admin => {
                user.is_admin = true;
                user.password_hash = auth::hash_password(&settings.password)?;
                storage(self.db.update_user(&user), "update user")?;
                log::info!("Promoted {} to administrator", user.username);
                Ok(BootstrapOutcome::Promoted)
            }
            Some(user) => Ok(BootstrapOutcome::Unchanged {
                default_password: auth::verify_password(&settings.password, &user.password_hash),
            }),
        }
    }
}
