//! Command-line interface for restock.
//!
//! Provides commands for running the sales → surplus → forecast
//! pipeline, seeding a workbook, inspecting tables and reviewing past
//! runs.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::adapters::WorkbookStore;
use crate::config::Settings;
use crate::core::{validate_line, Coordinator, RunJournal};
use crate::domain::{RunState, SalesRecord};

/// restock - Daily sales reconciliation and restock forecasting
#[derive(Parser, Debug)]
#[command(name = "restock")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a session's sales and project the next stock
    Run {
        /// Comma-separated sales figures (prompts interactively if omitted)
        #[arg(short, long)]
        sales: Option<String>,
    },

    /// Create the workbook tables
    Init {
        /// Comma-separated product column headings
        #[arg(long)]
        headers: String,

        /// Comma-separated initial stock figures
        #[arg(long)]
        stock: Option<String>,
    },

    /// Print the header and latest rows of a table
    Show {
        /// Table name (sales, surplus or stock)
        table: String,

        /// Number of rows to show
        #[arg(short, long, default_value = "5")]
        rows: usize,
    },

    /// List recent runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Check the status of a run
    Status {
        /// Run ID (UUID)
        run_id: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let settings = Settings::load()?;

        match self.command {
            Commands::Run { sales } => run_pipeline(settings, sales).await,
            Commands::Init { headers, stock } => init_workbook(&settings, &headers, stock).await,
            Commands::Show { table, rows } => show_table(&settings, &table, rows).await,
            Commands::Runs { limit } => list_runs(&settings, limit).await,
            Commands::Status { run_id } => show_status(&settings, &run_id).await,
            Commands::Config => show_config(&settings),
        }
    }
}

/// Prompt until the operator enters a valid sales line.
///
/// Each rejected line is explained and the prompt repeats; end of input
/// aborts.
pub fn prompt_sales<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    product_count: usize,
) -> Result<SalesRecord> {
    let example: Vec<String> = (1..=product_count).map(|i| (i * 10).to_string()).collect();

    loop {
        writeln!(output, "Please enter sales data from the last market.")?;
        writeln!(
            output,
            "Data should be {} numbers, separated by commas.",
            product_count
        )?;
        writeln!(output, "Example: {}\n", example.join(","))?;
        write!(output, "Enter your data here: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line).context("Failed to read input")? == 0 {
            anyhow::bail!("Input closed before valid sales data was entered");
        }

        match validate_line(&line, product_count) {
            Ok(record) => {
                writeln!(output, "Data is valid!")?;
                return Ok(record);
            }
            Err(e) => {
                writeln!(output, "Invalid data: {}, please try again.\n", e)?;
            }
        }
    }
}

/// Run the pipeline once
async fn run_pipeline(settings: Settings, sales: Option<String>) -> Result<()> {
    let store = WorkbookStore::open(&settings.workbook);
    let journal = RunJournal::new(&settings.journal);
    let coordinator = Coordinator::new(settings, store)?.with_journal(journal);

    let sales = match sales {
        Some(raw) => coordinator
            .validate_input(&raw)
            .with_context(|| format!("Invalid sales data: {}", raw))?,
        None => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            prompt_sales(
                &mut stdin.lock(),
                &mut stdout.lock(),
                coordinator.settings().product_count,
            )?
        }
    };

    let run = coordinator.run(sales).await?;

    let forecast = run
        .forecast
        .as_ref()
        .context("Completed run has no stock projection")?;
    let values = coordinator.stock_values(forecast).await?;

    if let Some(ref surplus) = run.surplus {
        println!("Surplus: {}", surplus);
    }
    println!("Make the following numbers for next market:\n");
    print!("{}", values);
    eprintln!("\n[Run {} completed successfully]", run.id);

    Ok(())
}

/// Seed a new workbook
async fn init_workbook(settings: &Settings, headers: &str, stock: Option<String>) -> Result<()> {
    let headers: Vec<&str> = headers.split(',').map(str::trim).collect();
    if headers.len() != settings.product_count || headers.iter().any(|h| h.is_empty()) {
        anyhow::bail!(
            "Expected {} non-empty headings, got {}",
            settings.product_count,
            headers.len()
        );
    }

    let seed = stock
        .map(|raw| validate_line(&raw, settings.product_count))
        .transpose()
        .context("Invalid initial stock")?;

    let store = WorkbookStore::init(
        &settings.workbook,
        &settings.tables.all(),
        &headers,
        &settings.tables.stock,
        seed.as_ref().map(|record| record.values()),
    )
    .await?;

    println!("Workbook initialized at {}", store.dir().display());
    Ok(())
}

/// Print a table's header and its most recent rows
async fn show_table(settings: &Settings, table: &str, rows: usize) -> Result<()> {
    let store = WorkbookStore::open(&settings.workbook);
    let (header, data) = store.read_table(table).await?;

    println!("{}", header.join("\t"));
    for row in &data[data.len().saturating_sub(rows)..] {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        println!("{}", cells.join("\t"));
    }

    Ok(())
}

/// List recent runs
async fn list_runs(settings: &Settings, limit: usize) -> Result<()> {
    let journal = RunJournal::new(&settings.journal);
    let runs = journal.runs(limit).await?;

    if runs.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    println!("{:<38} {:<26} {:<12}", "RUN ID", "STARTED", "STATE");
    println!("{}", "-".repeat(78));

    for run in runs {
        let state_str = match &run.state {
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed { .. } => "failed",
        };
        println!(
            "{:<38} {:<26} {:<12}",
            run.id,
            run.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            state_str
        );
    }

    Ok(())
}

/// Show the status of a run
async fn show_status(settings: &Settings, run_id_str: &str) -> Result<()> {
    let run_id = Uuid::parse_str(run_id_str)
        .with_context(|| format!("Invalid run ID: {}", run_id_str))?;

    let journal = RunJournal::new(&settings.journal);
    let run = journal
        .run(run_id)
        .await?
        .with_context(|| format!("Run {} not found", run_id))?;

    println!("Run ID: {}", run.id);
    println!("State: {:?}", run.state);
    println!("Started: {}", run.started_at);
    if let Some(completed) = run.completed_at {
        println!("Completed: {}", completed);
    }

    println!("\nSteps:");
    for step in run.completed_steps.iter() {
        println!("  {}: completed", step);
    }
    if let RunState::Failed { step: Some(step), error } = &run.state {
        println!("  {}: failed ({})", step, error);
    }

    for (label, record) in [
        ("Sales", &run.sales),
        ("Stock", &run.stock),
        ("Surplus", &run.surplus),
        ("Forecast", &run.forecast),
    ] {
        if let Some(record) = record {
            println!("{:<9} {}", format!("{}:", label), record);
        }
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(settings: &Settings) -> Result<()> {
    println!("restock configuration");
    println!("=====================");
    println!();

    if let Some(ref config_file) = settings.config_file {
        println!("Config file: {}", config_file.display());
    } else {
        println!("Config file: (none - using defaults)");
    }
    println!();

    println!("Workbook:      {}", settings.workbook.display());
    println!("Journal:       {}", settings.journal.display());
    println!("Products:      {}", settings.product_count);
    println!("Window:        {}", settings.window);
    println!("Margin:        {}", settings.margin);
    println!(
        "Tables:        sales={} surplus={} stock={}",
        settings.tables.sales, settings.tables.surplus, settings.tables.stock
    );

    Ok(())
}
