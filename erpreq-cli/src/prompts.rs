use anyhow::Result;
use inquire::{Password, Select, Text};

use erpreq_core::{CustomizationType, NewUser, Phase, PhaseProgress, RequirementInput};

/// Treats an empty answer as "not given"
fn optional_text(prompt: &str, help: &str) -> Result<Option<String>> {
    let value = Text::new(prompt).with_help_message(help).prompt()?;
    Ok(Some(value).filter(|v| !v.trim().is_empty()))
}

/// Prompts the user for a new requirement
pub fn prompt_requirement() -> Result<RequirementInput> {
    let project_scope = Text::new("Project scope:").prompt()?;

    let customization_type = Select::new(
        "Customization type:",
        CustomizationType::ALL.to_vec(),
    )
    .prompt()?;

    let modules_involved = Text::new("Modules involved:")
        .with_help_message("Comma-separated, e.g. CRM, Sales, Inventory")
        .prompt()?;

    // Use the Editor type for multiline input
    let functional_requirements = inquire::Editor::new("Functional requirements:")
        .with_help_message("State each need as a sentence ending in a period")
        .prompt()?;

    let technical_constraints = optional_text(
        "Technical constraints (optional):",
        "Separate constraints with periods",
    )?;
    let preferred_timeline =
        optional_text("Preferred timeline (optional):", "e.g. 3 months")?;

    Ok(RequirementInput {
        project_scope,
        customization_type: customization_type.as_str().to_string(),
        modules_involved,
        functional_requirements,
        technical_constraints,
        preferred_timeline,
    })
}

/// Prompts for each phase's percentage, defaulting to the current value
pub fn prompt_progress(current: &PhaseProgress) -> Result<Vec<(Phase, i64)>> {
    let mut entries = Vec::new();
    for phase in Phase::ALL {
        let answer = inquire::CustomType::<i64>::new(&format!("{} (%):", phase.title()))
            .with_default(current.get(phase) as i64)
            .with_error_message("Enter a whole number between 0 and 100")
            .prompt()?;
        entries.push((phase, answer));
    }
    Ok(entries)
}

/// Prompts for any registration fields not given on the command line
pub fn prompt_new_user(
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<NewUser> {
    let username = match username {
        Some(u) => u,
        None => Text::new("Username:").prompt()?,
    };
    let email = match email {
        Some(e) => e,
        None => Text::new("Email:").prompt()?,
    };
    let password = match password {
        Some(p) => p,
        None => Password::new("Password:")
            .with_custom_confirmation_message("Confirm password:")
            .prompt()?,
    };

    Ok(NewUser {
        username,
        email,
        password,
    })
}

/// Prompts for comment text
pub fn prompt_comment() -> Result<String> {
    Ok(Text::new("Comment:").prompt()?)
}
