//! Helpdesk - help request resolution and knowledge sync
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use helpdesk::config::{helpdesk_home, Config};
use helpdesk::core::RequestStatus;
use helpdesk::error::exit_codes;
use helpdesk::{open_store, Helpdesk};

// =============================================================================
// CLI Definition
// =============================================================================

/// Helpdesk - help request resolution and knowledge sync
#[derive(Parser)]
#[command(name = "helpdesk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a customer question as a pending request
    Submit {
        /// Customer the answer goes back to
        customer_id: String,
        /// The question as asked
        question: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Answer a pending request and record it in the knowledge base
    Resolve {
        /// Request ID
        request_id: String,
        /// The supervisor's answer
        #[arg(long, short)]
        answer: String,
        /// Knowledge base category
        #[arg(long, short)]
        category: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List pending and resolved requests
    List {
        /// Only show one status
        #[arg(long, short, value_enum)]
        status: Option<StatusArg>,
        /// Maximum number of requests per status
        #[arg(long, short)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List knowledge base entries, newest first
    Knowledge {
        /// Maximum number of entries
        #[arg(long, short)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show live pending and resolved views until interrupted
    Watch {
        /// Emit one JSON object per render
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

/// Request status filter.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusArg {
    Pending,
    Resolved,
}

impl From<StatusArg> for RequestStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Pending => RequestStatus::Pending,
            StatusArg::Resolved => RequestStatus::Resolved,
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    setup_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("helpdesk error: {}", e);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.helpdesk/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("helpdesk panic: {}", info);

        if let Some(home) = helpdesk_home() {
            let _ = std::fs::create_dir_all(&home);
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Log to stderr, filtered by `RUST_LOG` (default: warn).
fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load();
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Submit {
            customer_id,
            question,
            json,
            quiet,
        } => runtime.block_on(run_submit(&config, &customer_id, &question, json, quiet)),
        Commands::Resolve {
            request_id,
            answer,
            category,
            json,
            quiet,
        } => runtime.block_on(run_resolve(
            &config,
            &request_id,
            &answer,
            &category,
            json,
            quiet,
        )),
        Commands::List {
            status,
            limit,
            json,
            quiet,
        } => run_list(&config, status.map(Into::into), limit, json, quiet),
        Commands::Knowledge { limit, json, quiet } => run_knowledge(&config, limit, json, quiet),
        Commands::Watch { json, quiet } => runtime.block_on(run_watch(&config, json, quiet)),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::FAILURE as u8)
    }
}

fn print_formatted(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted);
    }
}

async fn run_submit(
    config: &Config,
    customer_id: &str,
    question: &str,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use helpdesk::cli::submit::{SubmitCommand, SubmitOptions};

    let helpdesk = Helpdesk::from_config(config)?;
    let cmd = SubmitCommand::new(&helpdesk);
    let options = SubmitOptions { json, quiet };

    let output = cmd.run(customer_id, question);
    print_formatted(&cmd.format_output(&output, &options));

    helpdesk.shutdown().await;
    Ok(success_to_exit_code(output.success))
}

async fn run_resolve(
    config: &Config,
    request_id: &str,
    answer: &str,
    category: &str,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use helpdesk::cli::resolve::{ResolveCommand, ResolveOptions};

    let helpdesk = Helpdesk::from_config(config)?;
    let cmd = ResolveCommand::new(&helpdesk);
    let options = ResolveOptions { json, quiet };

    let output = cmd.run(request_id, answer, category);
    print_formatted(&cmd.format_output(&output, &options));

    // Let the trigger finish notifying before the process exits.
    if let Some(stats) = helpdesk.shutdown().await {
        if stats.abandoned > 0 {
            tracing::warn!(abandoned = stats.abandoned, "resolution trigger gave up on a change");
        }
    }

    if output.partial {
        Ok(ExitCode::from(exit_codes::PARTIAL as u8))
    } else {
        Ok(success_to_exit_code(output.success))
    }
}

fn run_list(
    config: &Config,
    status: Option<RequestStatus>,
    limit: Option<usize>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use helpdesk::cli::list::{ListCommand, ListOptions};

    let cmd = ListCommand::new(open_store(&config.store)?);
    let options = ListOptions {
        json,
        quiet,
        status,
        limit,
    };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_knowledge(
    config: &Config,
    limit: Option<usize>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use helpdesk::cli::knowledge::{KnowledgeCommand, KnowledgeOptions};

    let cmd = KnowledgeCommand::new(open_store(&config.store)?);
    let options = KnowledgeOptions { json, quiet, limit };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

async fn run_watch(
    config: &Config,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use helpdesk::cli::watch::{TerminalRenderer, WatchCommand, WatchOptions};

    let store = open_store(&config.store)?;
    let cmd = WatchCommand::new(store, Duration::from_millis(config.store.poll_interval_ms));
    let renderer = TerminalRenderer::new(std::io::stdout(), WatchOptions { json, quiet });

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    match cmd.run(renderer, interrupted).await {
        Ok(()) => Ok(ExitCode::from(exit_codes::SUCCESS as u8)),
        Err(e) => {
            eprintln!("Watch failed: {}", e);
            Ok(ExitCode::from(exit_codes::FAILURE as u8))
        }
    }
}
