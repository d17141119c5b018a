//! `datascope` command line interface.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use datascope_tasks::{
    CsvDirProvider, CsvSource, EngineConfig, MemoryStore, StatsEngine, TableSource, TaskStatus,
};

#[derive(Parser)]
#[command(name = "datascope", version, about = "Table statistics engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a CSV file and print the computed statistics as JSON
    Analyze {
        /// Path to the CSV file
        file: PathBuf,

        /// Grouping key for the stored statistics (defaults to the file stem)
        #[arg(long)]
        table_id: Option<String>,

        /// Worker threads in the task pool
        #[arg(long, default_value_t = 2)]
        workers: usize,

        /// Compute columns one at a time instead of in parallel batches
        #[arg(long)]
        sequential: bool,

        /// Seed for sampling, for reproducible output
        #[arg(long)]
        sample_seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Analyze {
            file,
            table_id,
            workers,
            sequential,
            sample_seed,
        } => analyze(&file, table_id, workers, sequential, sample_seed),
    }
}

fn analyze(
    file: &Path,
    table_id: Option<String>,
    workers: usize,
    sequential: bool,
    sample_seed: Option<u64>,
) -> Result<()> {
    let file = file
        .canonicalize()
        .with_context(|| format!("cannot open '{}'", file.display()))?;
    let dir = file
        .parent()
        .context("file has no parent directory")?
        .to_path_buf();
    let table_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("file name is not valid UTF-8")?
        .to_string();
    let table_id = table_id.unwrap_or_else(|| {
        file.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&table_name)
            .to_string()
    });

    let mut builder = EngineConfig::builder()
        .workers(workers)
        .parallel_columns(!sequential);
    if let Some(seed) = sample_seed {
        builder = builder.sample_seed(seed);
    }
    let config = builder.build().context("invalid configuration")?;

    let engine = StatsEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(CsvDirProvider::new(dir)),
        config,
    )?;

    let task_id = engine.submit(&table_id, &table_name)?;
    println!("Submitted task {task_id}");

    let record = loop {
        let record = engine.get_status(&task_id)?;
        println!(
            "[{:>5.1}%] {} - {}",
            record.progress * 100.0,
            record.status.as_str(),
            record.message
        );
        if record.status.is_terminal() {
            break record;
        }
        thread::sleep(Duration::from_millis(500));
    };

    if record.status == TaskStatus::Failed {
        engine.shutdown();
        bail!("analysis failed: {}", record.message);
    }

    let columns = CsvSource::new(&file).column_names()?;
    for column in &columns {
        if let Some(stats) = engine.get_column_stats(&table_id, column)? {
            println!("=== {column} ===");
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    if let Some(stats) = engine.get_dataset_stats(&table_id)? {
        println!("=== dataset ===");
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    engine.shutdown();
    Ok(())
}
