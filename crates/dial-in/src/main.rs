//! CLI entry point for dial-in.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dial_in_core::Frequency;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

/// Recurring tasks and events driven by compact rate patterns.
#[derive(Parser, Debug)]
#[command(
    name = "dial-in",
    version,
    about = "dial-in: recurrence rules like `w#1,3T#09:00` expanded into tasks and events"
)]
struct Cli {
    /// Project directory or any subdir (defaults to current).
    #[arg(long, global = true)]
    dir: Option<String>,

    /// Override the data file configured in `.dial-in/config.toml`.
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Username owning the records (required by record commands).
    #[arg(long, short = 'u', global = true)]
    user: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode, encode, validate and expand rate patterns.
    #[command(subcommand)]
    Pattern(PatternCommand),

    /// Manage users.
    #[command(subcommand)]
    User(UserCommand),

    /// Manage categories.
    #[command(subcommand)]
    Category(CategoryCommand),

    /// Manage recurrence rules.
    #[command(subcommand)]
    Rule(RuleCommand),

    /// Manage tasks.
    #[command(subcommand)]
    Task(TaskCommand),

    /// Manage events.
    #[command(subcommand)]
    Event(EventCommand),

    /// Materialize a rule into tasks or events.
    #[command(subcommand)]
    Generate(GenerateCommand),
}

#[derive(Subcommand, Debug)]
enum PatternCommand {
    /// Show the structured form of a pattern.
    Decode { pattern: String },

    /// Build a pattern from its parts.
    Encode {
        #[arg(long = "freq", value_enum)]
        frequency: FrequencyArg,
        /// Comma-separated points, e.g. `1,3,5`.
        #[arg(long, value_delimiter = ',')]
        points: Vec<u32>,
        /// Time of day as `HH:MM`.
        #[arg(long)]
        time: String,
    },

    /// Check a pattern and print its canonical form.
    Validate { pattern: String },

    /// List occurrences of a pattern in `[from, to)`.
    Expand {
        pattern: String,
        /// RFC3339 start (inclusive).
        #[arg(long)]
        from: String,
        /// RFC3339 end (exclusive).
        #[arg(long)]
        to: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Register a new user.
    Register { username: String },

    /// List users.
    Ls {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    /// Create a category.
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Update a category.
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
    },

    /// List categories.
    Ls {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Delete a category; rules, tasks and events keep existing without it.
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
enum RuleCommand {
    /// Create a rule.
    Add {
        name: String,
        /// Rate pattern, e.g. `w#1,3T#09:00`.
        #[arg(long)]
        pattern: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Create the rule paused.
        #[arg(long)]
        inactive: bool,
    },

    /// Update a rule.
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long, conflicts_with = "clear_category")]
        category: Option<String>,
        #[arg(long)]
        clear_category: bool,
        #[arg(long, conflicts_with = "pause")]
        resume: bool,
        #[arg(long)]
        pause: bool,
    },

    /// List rules.
    Ls {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Delete a rule; generated tasks and events are kept.
    Rm { id: String },

    /// Preview occurrences of a rule in `[from, to)`.
    Expand {
        id: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// Create a task.
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// RFC3339 due date.
        #[arg(long)]
        due: Option<String>,
    },

    /// Update a task; completion has its own commands.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long, conflicts_with = "clear_category")]
        category: Option<String>,
        #[arg(long)]
        clear_category: bool,
        /// RFC3339 due date.
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
    },

    /// List tasks.
    Ls {
        /// Only tasks generated from this rule.
        #[arg(long)]
        rule: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Mark a task completed.
    Complete { id: String },

    /// Mark a task not completed.
    Reopen { id: String },

    /// Delete a task.
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
enum EventCommand {
    /// Create an event.
    Add {
        title: String,
        /// RFC3339 start.
        #[arg(long)]
        start: String,
        /// RFC3339 end.
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },

    /// Update an event.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// RFC3339 start.
        #[arg(long)]
        start: Option<String>,
        /// RFC3339 end.
        #[arg(long, conflicts_with = "clear_end")]
        end: Option<String>,
        #[arg(long)]
        clear_end: bool,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long, conflicts_with = "clear_category")]
        category: Option<String>,
        #[arg(long)]
        clear_category: bool,
    },

    /// List events, optionally those starting in `[from, to)`.
    Ls {
        #[arg(long, requires = "to")]
        from: Option<String>,
        #[arg(long, requires = "from")]
        to: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Delete an event.
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
enum GenerateCommand {
    /// One task per occurrence, due at the occurrence.
    Tasks(GenerateArgs),

    /// One event per occurrence, starting at the occurrence.
    Events(GenerateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(long)]
    rule: String,
    #[arg(long)]
    from: String,
    #[arg(long)]
    to: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FrequencyArg {
    #[value(alias = "d")]
    Daily,
    #[value(alias = "w")]
    Weekly,
    #[value(alias = "m")]
    Monthly,
    #[value(alias = "y")]
    Yearly,
}

impl From<FrequencyArg> for Frequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Daily => Self::Daily,
            FrequencyArg::Weekly => Self::Weekly,
            FrequencyArg::Monthly => Self::Monthly,
            FrequencyArg::Yearly => Self::Yearly,
        }
    }
}

fn main() -> Result<()> {
    let Cli {
        dir,
        data,
        user,
        cmd,
    } = Cli::parse();
    install_tracing();

    let dir = dir.unwrap_or_else(|| ".".to_owned());
    commands::run(&commands::Context { dir, data, user }, cmd)
}

fn install_tracing() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .try_init();
}

/// Filter from `RUST_LOG` directives; INFO when unset, blank or unparsable.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    fn enabled_under(directives: Option<&str>) -> (bool, bool) {
        let subscriber = tracing_subscriber::registry().with(log_filter(directives));
        tracing::subscriber::with_default(subscriber, || {
            (tracing::enabled!(Level::INFO), tracing::enabled!(Level::DEBUG))
        })
    }

    #[test]
    fn rust_log_debug_shows_debug_events() {
        assert_eq!(enabled_under(Some("debug")), (true, true));
    }

    #[test]
    fn log_filter_defaults_to_info() {
        assert_eq!(enabled_under(None), (true, false));
        assert_eq!(enabled_under(Some("  ")), (true, false));
        assert_eq!(enabled_under(Some("warn")), (false, false));
    }

    #[test]
    fn parse_pattern_encode_command() {
        let cli = Cli::parse_from([
            "dial-in", "pattern", "encode", "--freq", "w", "--points", "5,1,3", "--time", "09:00",
        ]);

        match cli.cmd {
            Command::Pattern(PatternCommand::Encode {
                frequency,
                points,
                time,
            }) => {
                assert_eq!(Frequency::from(frequency), Frequency::Weekly);
                assert_eq!(points, vec![5, 1, 3]);
                assert_eq!(time, "09:00");
            }
            other => panic!("expected pattern encode, got {other:?}"),
        }
    }

    #[test]
    fn parse_rule_add_with_global_options() {
        let cli = Cli::parse_from([
            "dial-in",
            "rule",
            "--user",
            "alice",
            "add",
            "Gym",
            "--pattern",
            "w#1,3T#06:00",
            "--inactive",
            "--dir",
            "/tmp/project",
        ]);

        assert_eq!(cli.dir.as_deref(), Some("/tmp/project"));
        assert_eq!(cli.user.as_deref(), Some("alice"));
        match cli.cmd {
            Command::Rule(RuleCommand::Add {
                name,
                pattern,
                inactive,
                ..
            }) => {
                assert_eq!(name, "Gym");
                assert_eq!(pattern, "w#1,3T#06:00");
                assert!(inactive);
            }
            other => panic!("expected rule add, got {other:?}"),
        }
    }

    #[test]
    fn parse_generate_events_command() {
        let cli = Cli::parse_from([
            "dial-in",
            "generate",
            "-u",
            "bob",
            "events",
            "--rule",
            "0192b6c4-0000-7000-8000-000000000000",
            "--from",
            "2024-01-01T00:00:00Z",
            "--to",
            "2024-02-01T00:00:00Z",
        ]);

        assert_eq!(cli.user.as_deref(), Some("bob"));
        match cli.cmd {
            Command::Generate(GenerateCommand::Events(args)) => {
                assert_eq!(args.from, "2024-01-01T00:00:00Z");
            }
            other => panic!("expected generate events, got {other:?}"),
        }
    }

    #[test]
    fn rule_edit_rejects_conflicting_flags() {
        let result = Cli::try_parse_from([
            "dial-in", "rule", "-u", "alice", "edit", "some-id", "--pause", "--resume",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_task_edit_clearing_the_due_date() {
        let cli = Cli::parse_from(["dial-in", "task", "-u", "alice", "edit", "some-id", "--clear-due", "--title", "Rent"]);
        match cli.cmd {
            Command::Task(TaskCommand::Edit {
                title,
                due,
                clear_due,
                ..
            }) => {
                assert_eq!(title.as_deref(), Some("Rent"));
                assert!(due.is_none());
                assert!(clear_due);
            }
            other => panic!("expected task edit, got {other:?}"),
        }
        let result = Cli::try_parse_from([
            "dial-in", "task", "-u", "alice", "edit", "some-id", "--clear-due", "--due", "2024-01-01T00:00:00Z",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn event_ls_requires_both_bounds() {
        let result = Cli::try_parse_from([
            "dial-in", "event", "-u", "alice", "ls", "--from", "2024-01-01T00:00:00Z",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
