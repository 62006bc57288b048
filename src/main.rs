//! Registrar CLI - manage students, courses and enrollments

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use registrar::config::{self, RegistrarConfig};
use registrar::storage::SqliteStore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "registrar")]
#[command(version)]
#[command(about = "Student and course enrollment records")]
#[command(long_about = r#"
Registrar keeps students, courses and enrollments in a SQLite database.

Example usage:
  registrar init
  registrar student add --roll R1 --first Ann
  registrar course add --code C1 --name Math
  registrar enroll 1 1
  registrar serve --port 5000
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage students
    #[command(subcommand)]
    Student(StudentCommand),

    /// Manage courses
    #[command(subcommand)]
    Course(CourseCommand),

    /// Enroll a student in a course
    Enroll { student_id: i64, course_id: i64 },

    /// Withdraw a student from a course
    Withdraw { student_id: i64, course_id: i64 },

    /// Show row counts
    Stats,
}

#[derive(Subcommand)]
pub enum StudentCommand {
    /// Add a student
    Add {
        #[arg(short, long)]
        roll: String,
        #[arg(short, long)]
        first: String,
        #[arg(short, long)]
        last: Option<String>,
    },
    /// List all students
    List,
    /// Show a student and their courses
    Show { id: i64 },
    /// Change a student's names, optionally enrolling them in a course
    Update {
        id: i64,
        #[arg(short, long)]
        first: String,
        #[arg(short, long)]
        last: Option<String>,
        /// Course id to enroll in as part of the update
        #[arg(long)]
        course: Option<i64>,
    },
    /// Delete a student and their enrollments
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum CourseCommand {
    /// Add a course
    Add {
        #[arg(long)]
        code: String,
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List all courses
    List,
    /// Show a course and its students
    Show { id: i64 },
    /// Change a course's name and description
    Update {
        id: i64,
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a course and its enrollments
    Delete { id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

pub fn emit_success(output_mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if !output_mode.is_human() {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn emit_error(output_mode: OutputMode, err: &anyhow::Error) {
    if output_mode.is_human() {
        registrar::ui::error(&format!("{:#}", err));
    } else {
        let envelope = serde_json::json!({
            "ok": false,
            "error": format!("{:#}", err),
        });
        println!("{}", envelope);
    }
}

/// Resolved settings shared by every command
pub struct Context {
    pub output_mode: OutputMode,
    pub config: RegistrarConfig,
    pub config_path: PathBuf,
    pub database: PathBuf,
}

impl Context {
    pub fn open_store(&self) -> anyhow::Result<SqliteStore> {
        config::ensure_db_dir(&self.database)?;
        let store = SqliteStore::open_with_timeout(&self.database, self.config.busy_timeout())?;
        Ok(store)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    match run(cli, output_mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            emit_error(output_mode, &err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = config::load_config(Some(&config_path))?.unwrap_or_default();
    let base = std::env::current_dir()?;
    let database = config.database_path(cli.database.as_deref(), &base);
    tracing::debug!("Using database {}", database.display());

    let ctx = Context {
        output_mode,
        config,
        config_path,
        database,
    };

    match cli.command {
        Commands::Init { force } => commands::run_init(&ctx, force),
        Commands::Serve { port } => {
            let port = ctx.config.port(port);
            config::ensure_db_dir(&ctx.database)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(registrar::server::start_server(
                port,
                ctx.database.clone(),
                ctx.config.busy_timeout(),
            ))
        }
        Commands::Student(cmd) => commands::run_student(&ctx, cmd),
        Commands::Course(cmd) => commands::run_course(&ctx, cmd),
        Commands::Enroll { student_id, course_id } => commands::run_enroll(&ctx, student_id, course_id),
        Commands::Withdraw { student_id, course_id } => commands::run_withdraw(&ctx, student_id, course_id),
        Commands::Stats => commands::run_stats(&ctx),
    }
}
