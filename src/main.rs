//! Weft front-end driver
//!
//! Loads serialized syntax trees, schedules the resolution passes over
//! them, and prints each unit's resolved name table.

mod frontend;
mod passes;
mod resolve;
mod types;
mod utils;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};

use frontend::loader;
use passes::verify::TypeVerifyPass;
use passes::Compiler;
use resolve::TypeResolutionPass;

/// Weft type-resolution front end
#[derive(Parser, Debug)]
#[command(name = "weftc")]
#[command(version = "0.1.0")]
#[command(about = "Type-resolution front end for the Weft source-to-source compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Trace every resolved name
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve every unit and print the resolved name tables
    Check {
        /// Serialized syntax trees, one unit per file
        files: Vec<PathBuf>,
    },
    /// Print the resolved table of a single unit
    Dump {
        /// Serialized syntax trees, one unit per file
        files: Vec<PathBuf>,

        /// Import path of the unit to print
        #[arg(long)]
        unit: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    if let Err(err) = run(&cli) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Check { files } => {
            let compiler = resolve_all(files)?;
            for unit in compiler.project.units() {
                print_unit(&compiler, &unit.path)?;
            }
            Ok(())
        }
        Commands::Dump { files, unit } => {
            let compiler = resolve_all(files)?;
            print_unit(&compiler, unit)
        }
    }
}

fn resolve_all(files: &[PathBuf]) -> Result<Compiler> {
    let project = loader::load_project(files)?;
    let mut compiler = Compiler::new(project);
    compiler.register(Box::new(TypeResolutionPass));
    compiler.register(Box::new(TypeVerifyPass));
    compiler.run()?;
    Ok(compiler)
}

fn print_unit(compiler: &Compiler, path: &str) -> Result<()> {
    let types = compiler
        .results
        .types(path)
        .ok_or_else(|| anyhow::anyhow!("no resolved unit `{path}`"))?;
    println!("unit {path}");
    for (name, &ty) in &types.defined {
        println!("  {} = {}", name, compiler.arena.display(ty));
    }
    Ok(())
}
