//! stencil CLI
//!
//! Usage:
//!   stencil [OPTIONS] --name <TEMPLATE> [FILE]
//!
//! Reads a markup document (file or stdin) containing template
//! definitions, clones the named template once per model in the JSON
//! model file, and prints the populated document.

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;

use stencil::{CloneOptions, Engine, RunSettings};

#[derive(Parser)]
#[command(name = "stencil")]
#[command(about = "Declarative template compilation and data injection engine")]
struct Cli {
    /// Input markup file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Template name to clone
    #[arg(short, long)]
    name: String,

    /// JSON model file; an array clones one instance per element
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Settings file (TOML format)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Replicate the models this many times (overrides settings)
    #[arg(short, long)]
    count: Option<usize>,

    /// Log compile and injection steps to stderr
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(io::stderr)
            .init();
    }

    let settings = match &cli.settings {
        Some(path) => match RunSettings::from_file(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error loading settings '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => RunSettings::default(),
    };

    if cli.input.is_none() && io::stdin().is_terminal() {
        eprintln!("stencil: no input file and stdin is a terminal; see --help");
        std::process::exit(1);
    }

    let source = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => buffer,
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let models = match &cli.model {
        Some(path) => match read_models(path) {
            Ok(models) => models,
            Err(e) => {
                eprintln!("Error reading model '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => vec![Value::Object(Default::default())],
    };

    let mut engine = Engine::from_markup(&source);
    let options = CloneOptions::new()
        .with_html(settings.html)
        .with_top(settings.top)
        .with_clones(cli.count.unwrap_or(settings.clones));
    match engine.clone_template(&cli.name, models, options) {
        Ok(_) => println!("{}", engine.markup()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn read_models(path: &PathBuf) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    Ok(match value {
        Value::Array(items) => items,
        single => vec![single],
    })
}
