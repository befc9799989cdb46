//! astrefine CLI

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use astrefine::{LoweredFunction, PassPipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "astrefine", version, about = "Structural simplification of decompiled syntax trees")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simplify a lowered function and print the result
    Refine {
        /// Lowered function (JSON)
        file: PathBuf,
        /// Pipeline configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the refined function as JSON instead of C-like text
        #[arg(long)]
        json: bool,
        /// Override the round cap
        #[arg(long)]
        max_rounds: Option<usize>,
    },
    /// Print a lowered function as C-like text
    Print {
        /// Lowered function (JSON)
        file: PathBuf,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Refine {
            file,
            config,
            json,
            max_rounds,
        } => refine_file(&file, config.as_ref(), json, max_rounds),
        Command::Print { file } => print_file(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn refine_file(
    path: &PathBuf,
    config: Option<&PathBuf>,
    json: bool,
    max_rounds: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config {
        Some(p) => PipelineConfig::from_file(p)?,
        None => PipelineConfig::default(),
    };
    if let Some(n) = max_rounds {
        config = config.max_rounds(n);
        config.validate()?;
    }

    let mut func = LoweredFunction::from_file(path)?;
    let mut pipeline = PassPipeline::from_config(&config);
    let stats = func.refine(&mut pipeline)?;

    if json {
        println!("{}", func.to_json()?);
    } else {
        print!("{}", func.tree());
    }
    eprintln!(
        "{} substitution(s) in {} round(s){}",
        stats.substitutions,
        stats.rounds,
        if stats.converged { "" } else { " (not converged)" }
    );
    Ok(())
}

fn print_file(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let func = LoweredFunction::from_file(path)?;
    print!("{}", func.tree());
    Ok(())
}
