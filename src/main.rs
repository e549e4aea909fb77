//! tusk - a small declarative task runner.
//!
//! Usage:
//!   tusk run -f tasks.yaml        Run all tasks in dependency order
//!   tusk run -f tasks.yaml --id build   Run a single task
//!   tusk list -f tasks.yaml       List tasks in the file
//!   tusk validate -f tasks.yaml   Validate the file without running
//!   tusk init -f tasks.yaml       Create a starter task file

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tusk::{Config, Executor, TaskId};

/// tusk - a small declarative task runner
#[derive(Parser)]
#[command(name = "tusk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose progress narration
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tasks from a task file
    Run {
        /// Path to the task file
        #[arg(short, long, default_value = "tasks.yaml")]
        file: PathBuf,

        /// Run only the task with this identifier
        #[arg(long)]
        id: Option<String>,

        /// Concurrency degree (reserved; execution is sequential)
        #[arg(short, long, default_value = "1")]
        concurrency: usize,
    },

    /// List all tasks in a task file
    List {
        /// Path to the task file
        #[arg(short, long, default_value = "tasks.yaml")]
        file: PathBuf,
    },

    /// Validate a task file without running anything
    Validate {
        /// Path to the task file
        #[arg(short, long, default_value = "tasks.yaml")]
        file: PathBuf,
    },

    /// Create a starter task file
    Init {
        /// Path to the task file
        #[arg(short, long, default_value = "tasks.yaml")]
        file: PathBuf,

        /// Include example tasks
        #[arg(long)]
        example: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            id,
            concurrency,
        } => run_tasks(&file, id, concurrency, cli.verbose).await?,
        Commands::List { file } => list_tasks(&file)?,
        Commands::Validate { file } => validate_tasks(&file)?,
        Commands::Init { file, example } => init_task_file(&file, example)?,
    }

    Ok(())
}

/// Load, validate, execute, and summarize.
async fn run_tasks(
    file: &Path,
    id: Option<String>,
    concurrency: usize,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(file)?;
    config.validate()?;

    let executor = Executor::new(concurrency, verbose);
    executor.register_all(config.tasks)?;

    println!("Loaded {} task(s) from {}\n", executor.len(), file.display());

    // Ctrl-C cancels the in-flight invocation and fails the current task.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling run");
            signal_token.cancel();
        }
    });

    let started = Instant::now();
    let outcome = match id {
        Some(id) => {
            println!("Executing task: {}\n", id);
            executor
                .run_one(&cancel, &TaskId::new(id))
                .await
                .map(|_| ())
        }
        None => {
            println!("Executing all tasks...");
            executor.run_all(&cancel).await
        }
    };
    let total = started.elapsed();

    print_summary(&executor, total);

    if let Err(err) = outcome {
        return Err(format!("execution completed with errors: {}", err).into());
    }
    Ok(())
}

/// Print the per-task result table and the run totals.
fn print_summary(executor: &Executor, total: std::time::Duration) {
    println!("\n{}", "=".repeat(60));
    println!("Execution Summary");
    println!("{}", "=".repeat(60));

    println!(
        "{:<16} {:<10} {:>9}  {}",
        "Task ID", "Status", "Duration", "Message"
    );
    println!(
        "{:<16} {:<10} {:>9}  {}",
        "-------", "------", "--------", "-------"
    );

    let mut results: Vec<_> = executor.results().into_iter().collect();
    results.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));

    let mut succeeded = 0;
    let mut failed = 0;
    for (id, result) in results {
        if result.success {
            succeeded += 1;
        } else {
            failed += 1;
        }
        let message = if result.success {
            "completed".to_string()
        } else {
            result.error.unwrap_or_default()
        };
        println!(
            "{:<16} {:<10} {:>8.2}s  {}",
            id.as_str(),
            result.task.status,
            result.duration.as_secs_f64(),
            message
        );
    }

    println!("\nTotal duration: {:.2}s", total.as_secs_f64());
    println!("Succeeded: {}", succeeded);
    println!("Failed: {}", failed);
}

/// List the tasks defined in a file.
fn list_tasks(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(file)?;

    println!("Tasks in {}:\n", file.display());
    println!(
        "{:<16} {:<20} {:<8} {:<24} {}",
        "ID", "Name", "Type", "Command", "Dependencies"
    );
    println!(
        "{:<16} {:<20} {:<8} {:<24} {}",
        "--", "----", "----", "-------", "------------"
    );

    for task in &config.tasks {
        let deps = if task.depends_on.is_empty() {
            "-".to_string()
        } else {
            task.depends_on
                .iter()
                .map(|d| d.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "{:<16} {:<20} {:<8} {:<24} {}",
            task.id.as_str(),
            task.name,
            task.kind.to_string(),
            task.command,
            deps
        );
    }

    println!("\nTotal: {} task(s)", config.tasks.len());
    Ok(())
}

/// Validate a task file without running anything.
fn validate_tasks(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(file)?;
    config.validate()?;

    println!("Task file '{}' is valid", file.display());
    println!("  Version: {}", config.version);
    println!("  Tasks: {}", config.tasks.len());
    Ok(())
}

/// Write a starter task file, refusing to overwrite an existing one.
fn init_task_file(file: &Path, example: bool) -> Result<(), Box<dyn std::error::Error>> {
    if file.exists() {
        return Err(format!("file '{}' already exists", file.display()).into());
    }

    if let Some(dir) = file.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let config = Config::example(example);
    config.save(file)?;

    println!("Created task file: {}", file.display());
    if example {
        println!("  Generated with example tasks");
    }
    println!("\nNext steps:");
    println!("  1. Edit the file to add your tasks");
    println!("  2. Run: tusk validate -f {}", file.display());
    println!("  3. Run: tusk run -f {}", file.display());

    Ok(())
}
