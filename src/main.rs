mod cli;
mod config;
mod logging;
mod process;
mod workflow;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::{CancellationToken, OutputMode, RunArgs};
use std::path::PathBuf;
use std::sync::Arc;
use workflow::{ShellResolver, ShellRunner};

#[derive(Parser)]
#[command(name = "asc-workflow")]
#[command(about = "Run JSON-defined shell workflows with hooks and nested calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress progress output
    #[arg(long, global = true)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Also write logs to a timestamped file under the config directory
    #[arg(long, global = true, conflicts_with = "log_file")]
    log: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a named workflow
    Run {
        /// Workflow name
        workflow: String,

        /// Parameters as KEY:VALUE or KEY=VALUE
        params: Vec<String>,

        /// Workflow definition file
        #[arg(long, default_value = config::DEFAULT_PATH)]
        file: PathBuf,

        /// Print steps without executing them
        #[arg(long)]
        dry_run: bool,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },

    /// Validate the definition file for errors and cycles
    Validate {
        /// Workflow definition file
        #[arg(long, default_value = config::DEFAULT_PATH)]
        file: PathBuf,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },

    /// List workflows
    List {
        /// Workflow definition file
        #[arg(long, default_value = config::DEFAULT_PATH)]
        file: PathBuf,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,

        /// Include private workflows
        #[arg(long)]
        all: bool,
    },
}

impl Commands {
    fn log_label(&self) -> String {
        match self {
            Commands::Run { workflow, .. } => format!("run-{}", workflow),
            Commands::Validate { .. } => "validate".into(),
            Commands::List { .. } => "list".into(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    std::process::exit(code);
}

async fn run(app: Cli) -> Result<i32> {
    let log_file = if app.log {
        Some(logging::default_log_path(&app.command.log_label())?)
    } else {
        app.log_file
    };
    logging::init_logging(app.debug, app.quiet, log_file)?;

    match app.command {
        Commands::Run {
            workflow,
            params,
            file,
            dry_run,
            pretty,
        } => {
            let cancel = CancellationToken::new();
            tokio::spawn(cli::setup_signal_handlers(cancel.clone()));

            let mode = if app.quiet {
                OutputMode::Quiet
            } else {
                OutputMode::Console
            };
            let handler = cli::create_handler(mode, app.debug);

            // One resolver per process
            let shell = ShellRunner::new(Arc::new(ShellResolver::new()));
            let args = RunArgs {
                file,
                workflow,
                params,
                dry_run,
                pretty,
            };

            cli::run_workflow(&args, shell, &cancel, &*handler, std::io::stdout()).await
        }

        Commands::Validate { file, pretty } => {
            cli::validate_workflow(&file, pretty, std::io::stdout())
        }

        Commands::List { file, pretty, all } => {
            cli::list_workflows(&file, pretty, all, std::io::stdout())
        }
    }
}
