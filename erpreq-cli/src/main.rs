mod cli;
mod prompts;

use anyhow::{Context, Result};
use clap::Parser;
use colored::{ColoredString, Colorize};
use env_logger::{Env, Target};
use std::path::Path;

use erpreq_core::db::{self, BackendType};
use erpreq_core::{
    get_config_path, AiClient, AnalyticsReport, AppConfig, BootstrapOutcome, ChartSeries,
    Complexity, Phase, PlanGenerator, PlanSource, Requirement, RequirementInput,
    RequirementService, RequirementStatus, User,
};

use crate::cli::{AdminCommand, Cli, Command, CommentCommand, ConfigCommand, DbCommand, UserCommand};

/// Width of the bars drawn by `analytics`
const BAR_WIDTH: u64 = 30;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .target(Target::Stderr)
        .init();

    let cli = Cli::parse();

    // Config commands don't need a database
    if let Command::Config(cmd) = &cli.command {
        return handle_config_command(cmd);
    }

    let config = AppConfig::load_default()?;
    let (db_path, backend_type) = match &cli.db {
        Some(path) => (path.clone(), None),
        None => (config.database_path()?, config.backend),
    };

    let backend = db::open_or_create(&db_path, backend_type)
        .with_context(|| format!("Failed to open database {:?}", db_path))?;
    let service = RequirementService::new(backend, build_planner(&config));

    match &cli.command {
        Command::Init => return init(&service, &config, &db_path),
        Command::User(UserCommand::Register {
            username,
            email,
            password,
        }) => {
            let new_user = prompts::prompt_new_user(username.clone(), email.clone(), password.clone())?;
            let user = service.register_user(&new_user)?;
            println!("{} {}", "Registered".green(), user.username.bold());
            return Ok(());
        }
        _ => {}
    }

    let actor_name = cli
        .actor
        .clone()
        .unwrap_or_else(|| config.admin.username.clone());
    let actor = service.find_user(&actor_name).with_context(|| {
        format!(
            "Unknown user '{}'. Run `erpreq init` or `erpreq user register` first",
            actor_name
        )
    })?;

    match &cli.command {
        Command::Submit {
            scope,
            customization_type,
            modules,
            functional,
            constraints,
            timeline,
            interactive,
        } => {
            let should_be_interactive = *interactive
                || (scope.is_none()
                    && customization_type.is_none()
                    && modules.is_none()
                    && functional.is_none());

            let input = if should_be_interactive {
                prompts::prompt_requirement()?
            } else {
                RequirementInput {
                    project_scope: scope.clone().unwrap_or_default(),
                    customization_type: customization_type.clone().unwrap_or_default(),
                    modules_involved: modules.clone().unwrap_or_default(),
                    functional_requirements: functional.clone().unwrap_or_default(),
                    technical_constraints: constraints.clone(),
                    preferred_timeline: timeline.clone(),
                }
            };
            submit(&service, &actor, &input)?;
        }
        Command::List { all } => {
            let requirements = if *all {
                service.all_requirements(&actor)?
            } else {
                service.requirements_for(&actor)?
            };
            list_requirements(&requirements);
        }
        Command::Show { id } => {
            let req = service.get(&actor, id)?;
            show_requirement(&req);
        }
        Command::Plan { id, analysis } => {
            let req = service.get(&actor, id)?;
            println!("{}", req.implementation_plan);
            if *analysis {
                let analysis = service.analysis(&actor, id)?;
                println!("\n{}", serde_json::to_string_pretty(&analysis)?);
            }
        }
        Command::Progress {
            id,
            initial_setup,
            development,
            testing,
            deployment,
        } => {
            let given = [
                (Phase::InitialSetup, *initial_setup),
                (Phase::Development, *development),
                (Phase::Testing, *testing),
                (Phase::Deployment, *deployment),
            ];
            let entries: Vec<(Phase, i64)> = if given.iter().all(|(_, v)| v.is_none()) {
                let current = service.get(&actor, id)?;
                prompts::prompt_progress(&current.phase_progress)?
            } else {
                given
                    .iter()
                    .filter_map(|(phase, value)| value.map(|v| (*phase, v)))
                    .collect()
            };

            let updated = service.update_progress(
                &actor,
                id,
                entries.iter().map(|(phase, v)| (phase.key(), *v)),
            )?;
            println!(
                "{} {} is {}% complete ({})",
                "Progress updated:".green(),
                updated.display_id(),
                updated.overall_progress,
                status_colored(updated.status)
            );
        }
        Command::Delete { id, yes } => delete_requirement(&service, &actor, id, *yes)?,
        Command::Comment(cmd) => handle_comment_command(cmd, &service, &actor)?,
        Command::Analytics { json } => {
            let report = service.analytics()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_analytics(&report);
            }
        }
        Command::User(cmd) => handle_user_command(cmd, &service, &actor)?,
        Command::Admin(AdminCommand::Dashboard { json }) => {
            let dashboard = service.admin_dashboard(&actor)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                println!("{}", "Admin Dashboard".bold());
                println!("{}: {}", "Users".blue(), dashboard.total_users);
                println!("{}: {}", "Administrators".blue(), dashboard.admin_count);
                println!("{}: {}", "Requirements".blue(), dashboard.total_requirements);
                println!("{}: {}", "Comments".blue(), dashboard.total_comments);
                println!("\n{}", "Recent submissions:".green());
                list_requirements(&dashboard.recent_requirements);
            }
        }
        Command::Db(cmd) => handle_db_command(cmd, &service, &actor)?,
        Command::Init | Command::Config(_) => unreachable!("handled before actor lookup"),
    }

    Ok(())
}

/// Uses the external model when configured, otherwise the template only
fn build_planner(config: &AppConfig) -> PlanGenerator {
    let client = AiClient::from_settings(&config.ai);
    if client.is_available() {
        log::info!("Plan generation via {}", client.mode_description());
        PlanGenerator::new(Some(Box::new(client)))
    } else {
        PlanGenerator::template_only()
    }
}

fn init(service: &RequirementService, config: &AppConfig, db_path: &Path) -> Result<()> {
    println!(
        "{} {} database at {}",
        "Using".green(),
        service.backend().backend_type(),
        db_path.display()
    );

    match service.bootstrap_admin(&config.admin)? {
        BootstrapOutcome::Created => println!(
            "{} administrator '{}'",
            "Created".green(),
            config.admin.username
        ),
        BootstrapOutcome::Promoted => println!(
            "{} '{}' to administrator and reset its password",
            "Promoted".yellow(),
            config.admin.username
        ),
        BootstrapOutcome::Unchanged { default_password } => {
            println!("Administrator '{}' already exists", config.admin.username);
            if default_password {
                println!(
                    "{}",
                    "Warning: the administrator still uses the configured bootstrap password".yellow()
                );
            }
        }
    }

    println!("Plan generation: {}", service.planner().describe());
    Ok(())
}

fn submit(service: &RequirementService, actor: &User, input: &RequirementInput) -> Result<()> {
    let submission = service.submit(actor, input)?;
    let req = &submission.requirement;

    println!("{}", "Requirement submitted successfully!".green());
    println!("UUID: {}", req.id);
    println!("ID: {}", req.display_id().green());
    println!("Complexity: {}", complexity_colored(req.complexity));

    match &submission.plan_source {
        PlanSource::External { generator } => println!("Plan written by {}", generator),
        PlanSource::Fallback { reason } => println!(
            "{} {}",
            "Plan generated from template (external generator failed):".yellow(),
            reason
        ),
        PlanSource::Template => println!("Plan generated from template"),
    }
    println!("Run `erpreq plan {}` to read it.", req.display_id());
    Ok(())
}

fn status_colored(status: RequirementStatus) -> ColoredString {
    match status {
        RequirementStatus::Pending => status.to_string().yellow(),
        RequirementStatus::InProgress => status.to_string().blue(),
        RequirementStatus::Completed => status.to_string().green(),
    }
}

fn complexity_colored(complexity: Complexity) -> ColoredString {
    match complexity {
        Complexity::Low => complexity.title().green(),
        Complexity::Medium => complexity.title().yellow(),
        Complexity::High => complexity.title().red(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn list_requirements(requirements: &[Requirement]) {
    if requirements.is_empty() {
        println!("{}", "No requirements found.".yellow());
        return;
    }

    println!(
        "{:<8} | {:<24} | {:<22} | {:<8} | {:<11} | {:>4}",
        "ID", "Scope", "Type", "Level", "Status", "Done"
    );
    println!("{}", "-".repeat(94));

    for req in requirements {
        println!(
            "{:<8} | {:<24} | {:<22} | {:<8} | {:<11} | {:>3}%",
            req.display_id(),
            truncate(&req.project_scope, 24),
            req.customization_type.label(),
            complexity_colored(req.complexity),
            status_colored(req.status),
            req.overall_progress
        );
    }
}

fn show_requirement(req: &Requirement) {
    println!("{}: {}", "ID".blue(), req.id);
    if let Some(spec_id) = &req.spec_id {
        println!("{}: {}", "SPEC-ID".blue(), spec_id);
    }
    println!("{}: {}", "Project Scope".blue(), req.project_scope);
    println!("{}: {}", "Customization".blue(), req.customization_type);
    println!("{}: {}", "Modules".blue(), req.modules_involved);
    println!("{}: {}", "Functional".blue(), req.functional_requirements);
    if let Some(constraints) = &req.technical_constraints {
        println!("{}: {}", "Constraints".blue(), constraints);
    }
    if let Some(timeline) = &req.preferred_timeline {
        println!("{}: {}", "Timeline".blue(), timeline);
    }
    println!("{}: {}", "Complexity".blue(), complexity_colored(req.complexity));
    println!("{}: {}", "Status".blue(), status_colored(req.status));
    println!("{}: {}", "Created".blue(), req.created_at);
    println!("{}: {}", "Updated".blue(), req.last_updated);

    println!("\n{}:", "Progress".green());
    for phase in Phase::ALL {
        println!("  {:<14} {:>3}%", phase.title(), req.phase_progress.get(phase));
    }
    println!("  {:<14} {:>3}%", "Overall".bold(), req.overall_progress);
}

fn delete_requirement(
    service: &RequirementService,
    actor: &User,
    id: &str,
    skip_confirm: bool,
) -> Result<()> {
    let req = service.get(actor, id)?;

    println!("{}", "Requirement to delete:".yellow());
    println!("  ID: {}", req.display_id());
    println!("  Scope: {}", req.project_scope);

    // Confirm deletion unless --yes flag is used
    if !skip_confirm {
        let confirm = inquire::Confirm::new("Are you sure you want to delete this requirement?")
            .with_default(false)
            .prompt()?;

        if !confirm {
            println!("{}", "Deletion cancelled.".yellow());
            return Ok(());
        }
    }

    service.delete(actor, id)?;
    println!("{}", "Requirement deleted successfully!".green());
    Ok(())
}

fn handle_comment_command(
    cmd: &CommentCommand,
    service: &RequirementService,
    actor: &User,
) -> Result<()> {
    match cmd {
        CommentCommand::Add { id, content } => {
            let content = match content {
                Some(c) => c.clone(),
                None => prompts::prompt_comment()?,
            };
            service.add_comment(actor, id, &content)?;
            println!("{}", "Comment added successfully!".green());
        }
        CommentCommand::List { id } => {
            let comments = service.comments_for(actor, id)?;
            if comments.is_empty() {
                println!("{}", "No comments found.".yellow());
            }
            for view in comments {
                println!(
                    "{} {}",
                    view.author.bold(),
                    view.comment
                        .created_at
                        .format("%Y-%m-%d %H:%M")
                        .to_string()
                        .dimmed()
                );
                println!("  {}", view.comment.content);
            }
        }
    }
    Ok(())
}

fn handle_user_command(cmd: &UserCommand, service: &RequirementService, actor: &User) -> Result<()> {
    match cmd {
        UserCommand::Register { .. } => unreachable!("handled before actor lookup"),
        UserCommand::List => {
            let users = service.list_users(actor)?;
            println!("{:<20} | {:<30} | {:<5} | {}", "Username", "Email", "Admin", "Joined");
            println!("{}", "-".repeat(76));
            for user in users {
                println!(
                    "{:<20} | {:<30} | {:<5} | {}",
                    user.username,
                    user.email,
                    if user.is_admin { "yes" } else { "no" },
                    user.created_at.format("%Y-%m-%d")
                );
            }
        }
        UserCommand::Delete { username, yes } => {
            if !yes {
                let confirm = inquire::Confirm::new(&format!(
                    "Delete '{}' together with their requirements and comments?",
                    username
                ))
                .with_default(false)
                .prompt()?;
                if !confirm {
                    println!("{}", "Deletion cancelled.".yellow());
                    return Ok(());
                }
            }
            let removed = service.delete_user(actor, username)?;
            println!("{} {}", "Deleted user".green(), removed.username);
        }
        UserCommand::Promote { username } => {
            service.set_admin(actor, username, true)?;
            println!("{} is now an administrator", username.green());
        }
        UserCommand::Demote { username } => {
            service.set_admin(actor, username, false)?;
            println!("{} is no longer an administrator", username.yellow());
        }
    }
    Ok(())
}

fn print_chart(title: &str, series: &ChartSeries) {
    println!("{}", title.bold());
    let max = series.values.iter().copied().max().unwrap_or(0).max(1);
    for (label, value) in series.points() {
        let bar = "#".repeat((value * BAR_WIDTH / max) as usize);
        println!("  {:<14} {:>4} {}", label, value, bar.cyan());
    }
    println!();
}

fn print_analytics(report: &AnalyticsReport) {
    println!("{}: {}", "Total Requirements".blue(), report.stats.total_requirements);
    println!("{}: {}", "Average Complexity".blue(), report.stats.avg_complexity);
    println!("{}: {}\n", "Most Common Type".blue(), report.stats.common_type);

    print_chart("Top Modules", &report.modules);
    print_chart("Complexity", &report.complexity);
    print_chart("Preferred Timeline", &report.timeline);
}

fn handle_db_command(cmd: &DbCommand, service: &RequirementService, actor: &User) -> Result<()> {
    if !actor.is_admin {
        anyhow::bail!("Database maintenance requires an administrator");
    }

    match cmd {
        DbCommand::Migrate { target, backend } => {
            let backend_type = backend
                .as_deref()
                .map(str::parse::<BackendType>)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let target_db = db::create_backend(target, backend_type)?;
            let summary = db::migrate(service.backend(), target_db.as_ref())?;
            println!(
                "{} {} requirements, {} users, {} comments to {}",
                "Migrated".green(),
                summary.requirements,
                summary.users,
                summary.comments,
                target.display()
            );
        }
        DbCommand::Export { file } => {
            let summary = db::export_to_json(service.backend(), file)?;
            println!(
                "{} {} requirements to {}",
                "Exported".green(),
                summary.requirements,
                file.display()
            );
        }
        DbCommand::Import { file, yes } => {
            if !yes {
                let confirm = inquire::Confirm::new("This replaces all existing data. Continue?")
                    .with_default(false)
                    .prompt()?;
                if !confirm {
                    println!("{}", "Import cancelled.".yellow());
                    return Ok(());
                }
            }
            let summary = db::import_from_json(service.backend(), file)?;
            println!(
                "{} {} requirements, {} users, {} comments",
                "Imported".green(),
                summary.requirements,
                summary.users,
                summary.comments
            );
        }
        DbCommand::Stats => {
            let stats = service.backend().stats()?;
            println!("{}: {}", "Backend".blue(), stats.backend_type);
            println!("{}: {}", "Path".blue(), service.backend().path().display());
            println!("{}: {}", "Requirements".blue(), stats.requirement_count);
            println!("{}: {} ({} admin)", "Users".blue(), stats.user_count, stats.admin_count);
            println!("{}: {}", "Comments".blue(), stats.comment_count);
        }
    }
    Ok(())
}

fn handle_config_command(cmd: &ConfigCommand) -> Result<()> {
    let path = get_config_path()?;
    match cmd {
        ConfigCommand::Show => {
            let config = AppConfig::load(&path)?;
            println!("{}: {}", "Config file".blue(), path.display());
            println!("{}: {}", "Database".blue(), config.database_path()?.display());
            print!("{}", serde_yaml::to_string(&config)?);
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            AppConfig::default().save(&path)?;
            println!("{} {}", "Wrote".green(), path.display());
        }
    }
    Ok(())
}
