//! detox-annotator - dataset utilities for the annotation workflow
//!
//! Non-interactive companion to the annotation UI: inspect a batch file,
//! check stored ratings, and cut a dataset into batches.
//!
//! # Usage
//!
//! ```bash
//! # Schema, completion counts, and the resume position of a batch
//! detox-annotator status batches/batch_1.csv
//!
//! # Check every stored rating symbol against the variant's alphabet
//! detox-annotator validate annotations/annotations_batch_1.csv
//!
//! # Cut a dataset into 10 batches, 20% marked for cross-evaluation
//! detox-annotator split dataset.csv 10 --crossval-percentage 20
//! ```

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use detox_annotator::{
    split_into_batches, CsvStore, Schema, SplitConfig, Table, TableStore,
};

// ============================================================================
// CLI Structure
// ============================================================================

/// Dataset utilities for the detox annotation workflow
#[derive(Parser)]
#[command(name = "detox-annotator")]
#[command(
    author,
    version,
    about = "Dataset utilities for the detox annotation workflow"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show schema, completion counts, and the resume position of a table
    #[command(visible_alias = "s")]
    Status(StatusArgs),

    /// Check stored ratings against the variant's rating alphabet
    #[command(visible_alias = "v")]
    Validate(ValidateArgs),

    /// Split a dataset into annotation batches
    Split(SplitArgs),
}

#[derive(Parser)]
struct StatusArgs {
    /// Annotation table (CSV)
    file: String,

    /// Emit machine-readable JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ValidateArgs {
    /// Annotation table (CSV)
    file: String,
}

#[derive(Parser)]
struct SplitArgs {
    /// Source dataset (CSV)
    file: String,

    /// Number of batches to create
    num_batches: usize,

    /// Directory to write batches into
    #[arg(long, default_value = "batches")]
    output_dir: String,

    /// Percentage of batches to mark for cross-evaluation
    #[arg(long, default_value = "0.0")]
    crossval_percentage: f64,

    /// Seed for the cross-evaluation sample (reproducible splits)
    #[arg(long)]
    seed: Option<u64>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Status(args) => cmd_status(args),
        Commands::Validate(args) => cmd_validate(args),
        Commands::Split(args) => cmd_split(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn load_table(path: &str) -> Result<(Table, Schema), String> {
    let table = CsvStore::new(path)
        .load()
        .map_err(|e| format!("failed to load {}: {}", path, e))?;
    let schema = Schema::detect(&table).map_err(|e| e.to_string())?;
    Ok((table, schema))
}

fn cmd_status(args: StatusArgs) -> Result<(), String> {
    let (table, schema) = load_table(&args.file)?;
    if table.is_empty() {
        return Err(format!("{} has no rows", args.file));
    }

    let complete = table
        .rows()
        .iter()
        .filter(|row| schema.is_complete(row))
        .count();
    let resume = table
        .rows()
        .iter()
        .position(|row| !schema.is_complete(row))
        .unwrap_or(table.len() - 1);

    if args.json {
        let status = serde_json::json!({
            "file": args.file,
            "variant": schema.kind.name(),
            "rows": table.len(),
            "complete": complete,
            "incomplete": table.len() - complete,
            "resume_index": resume,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&status).unwrap_or_default()
        );
        return Ok(());
    }

    println!("file:         {}", args.file);
    println!("variant:      {}", schema.kind.name());
    println!("rows:         {}", table.len());
    println!("complete:     {}", complete);
    println!("incomplete:   {}", table.len() - complete);
    println!("resume index: {}", resume);
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> Result<(), String> {
    let (table, schema) = load_table(&args.file)?;

    let mut violations = 0usize;
    for (index, row) in table.rows().iter().enumerate() {
        for candidate in &schema.candidates {
            let rating = row.get(candidate.rating_col);
            if !rating.is_empty() && schema.validate_rating(rating).is_err() {
                violations += 1;
                eprintln!(
                    "row {}: {} = '{}' is not in {:?}",
                    index, candidate.rating_col, rating, schema.rating_alphabet
                );
            }
        }
        for preference in &schema.preferences {
            let choice = row.get(preference.key);
            if !choice.is_empty() && schema.candidate_position(choice).is_none() {
                violations += 1;
                eprintln!(
                    "row {}: {} = '{}' is not a known candidate",
                    index, preference.key, choice
                );
            }
        }
    }

    if violations > 0 {
        return Err(format!(
            "{}: {} invalid values across {} rows",
            args.file,
            violations,
            table.len()
        ));
    }
    println!(
        "{}: {} rows, all stored values valid for the {} layout",
        args.file,
        table.len(),
        schema.kind.name()
    );
    Ok(())
}

fn cmd_split(args: SplitArgs) -> Result<(), String> {
    let table = CsvStore::new(&args.file)
        .load()
        .map_err(|e| format!("failed to load {}: {}", args.file, e))?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let config = SplitConfig {
        num_batches: args.num_batches,
        crossval_percentage: args.crossval_percentage,
    };
    let files = split_into_batches(
        &table,
        &config,
        std::path::Path::new(&args.output_dir),
        &mut rng,
    )
    .map_err(|e| e.to_string())?;

    for file in &files {
        println!(
            "{} ({} rows){}",
            file.path.display(),
            file.rows,
            if file.crossval { " [crossval]" } else { "" }
        );
    }
    let marked: Vec<String> = files
        .iter()
        .enumerate()
        .filter(|(_, f)| f.crossval)
        .map(|(i, _)| (i + 1).to_string())
        .collect();
    if !marked.is_empty() {
        println!("batches selected for cross-evaluation: {}", marked.join(", "));
    }
    Ok(())
}
