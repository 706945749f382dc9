use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Capture ERP customization requirements and generate implementation plans"
)]
pub struct Cli {
    /// Path to the database (.db/.sqlite for SQLite, .yaml for YAML).
    /// Overrides ERPREQ_DB and the config file.
    #[clap(long, global = true)]
    pub db: Option<PathBuf>,

    /// Username to act as (defaults to the configured admin).
    /// No password is checked: anyone who can run the CLI against a database
    /// may act as any account in it, so protect the file itself.
    #[clap(long = "as", global = true, value_name = "USERNAME")]
    pub actor: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database and ensure the admin account exists
    Init,

    /// Submit a new customization requirement
    Submit {
        /// What the project should achieve
        #[clap(long)]
        scope: Option<String>,

        /// new_module, workflow_adjustment, report_customization or integration
        #[clap(long = "type")]
        customization_type: Option<String>,

        /// Comma-separated modules, e.g. "CRM, Sales"
        #[clap(long)]
        modules: Option<String>,

        /// Functional requirements, one sentence per need
        #[clap(long)]
        functional: Option<String>,

        /// Technical constraints, separated by periods
        #[clap(long)]
        constraints: Option<String>,

        /// Preferred timeline, e.g. "6 months"
        #[clap(long)]
        timeline: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long, short = 'i')]
        interactive: bool,
    },

    /// List requirements
    List {
        /// Every user's requirements (admin only)
        #[clap(long)]
        all: bool,
    },

    /// Show a requirement with its progress
    Show {
        /// Requirement ID (UUID or REQ-NNN)
        id: String,
    },

    /// Print the implementation plan of a requirement
    Plan {
        /// Requirement ID (UUID or REQ-NNN)
        id: String,

        /// Also print the analysis as JSON
        #[clap(long)]
        analysis: bool,
    },

    /// Record phase progress (phases not given are set to 0)
    Progress {
        /// Requirement ID (UUID or REQ-NNN)
        id: String,

        #[clap(long)]
        initial_setup: Option<i64>,

        #[clap(long)]
        development: Option<i64>,

        #[clap(long)]
        testing: Option<i64>,

        #[clap(long)]
        deployment: Option<i64>,
    },

    /// Delete a requirement and its comments
    Delete {
        /// Requirement ID (UUID or REQ-NNN)
        id: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Manage comments on a requirement
    #[clap(subcommand)]
    Comment(CommentCommand),

    /// Show module, complexity and timeline charts
    Analytics {
        /// Print the chart data as JSON
        #[clap(long)]
        json: bool,
    },

    /// Manage user accounts
    #[clap(subcommand)]
    User(UserCommand),

    /// Administrator views
    #[clap(subcommand)]
    Admin(AdminCommand),

    /// Manage configuration
    #[clap(subcommand)]
    Config(ConfigCommand),

    /// Database maintenance (admin only)
    #[clap(subcommand)]
    Db(DbCommand),
}

#[derive(Subcommand, Debug)]
pub enum CommentCommand {
    /// Add a comment to a requirement
    Add {
        /// Requirement ID (UUID or REQ-NNN)
        id: String,

        /// Comment text (prompted for if omitted)
        #[clap(long)]
        content: Option<String>,
    },

    /// List comments on a requirement
    List {
        /// Requirement ID (UUID or REQ-NNN)
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Create a new account
    Register {
        #[clap(long)]
        username: Option<String>,

        #[clap(long)]
        email: Option<String>,

        /// Password (prompted for if omitted)
        #[clap(long)]
        password: Option<String>,
    },

    /// List all accounts (admin only)
    List,

    /// Delete an account with its requirements and comments (admin only)
    Delete {
        username: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Grant admin rights (admin only)
    Promote { username: String },

    /// Revoke admin rights (admin only)
    Demote { username: String },
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Totals and the most recent submissions
    Dashboard {
        /// Print as JSON
        #[clap(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[clap(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Copy all data into another database file
    Migrate {
        /// Target database path
        target: PathBuf,

        /// Target backend (yaml or sqlite); inferred from the extension if omitted
        #[clap(long)]
        backend: Option<String>,
    },

    /// Write all data to a JSON file
    Export {
        /// Output file
        file: PathBuf,
    },

    /// Replace all data with the contents of a JSON file
    Import {
        /// Input file
        file: PathBuf,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Show record counts
    Stats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_as_is_global() {
        let cli = Cli::try_parse_from(["erpreq", "list", "--as", "ana"]).unwrap();
        assert_eq!(cli.actor.as_deref(), Some("ana"));
        assert!(matches!(cli.command, Command::List { all: false }));
    }

    #[test]
    fn test_as_help_warns_that_no_password_is_checked() {
        let cmd = Cli::command();
        let arg = cmd
            .get_arguments()
            .find(|a| a.get_long() == Some("as"))
            .unwrap();
        let help = arg.get_long_help().or(arg.get_help()).unwrap().to_string();
        assert!(help.contains("No password is checked"));
    }
}
