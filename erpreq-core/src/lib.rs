pub mod ai;
pub mod analytics;
pub mod analyzer;
pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod planner;
pub mod service;
pub mod storage;
pub mod timeline;

// Re-export commonly used types
pub use ai::{AiClient, AiError, AiMode, TextGenerator};
pub use analytics::{AnalyticsReport, ChartSeries, RequirementStats};
pub use analyzer::{analyze, Analysis};
pub use config::{get_config_path, AdminSettings, AiSettings, AppConfig};
pub use db::{create_backend, open_or_create, BackendType, DatabaseBackend, SqliteBackend, YamlBackend};
pub use models::{
    Comment, Complexity, CustomizationType, Phase, PhaseProgress, Requirement, RequirementInput,
    RequirementStatus, RequirementsStore, User,
};
pub use planner::{GeneratedPlan, PlanGenerator, PlanSource, Schedule};
pub use service::{
    AdminDashboard, BootstrapOutcome, CommentView, NewUser, RequirementService, ServiceError,
    ServiceResult, Submission,
};
pub use storage::Storage;
