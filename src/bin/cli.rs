use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use etlflow::catalog::PipelineValidator;
use etlflow::config::{AggregateMode, EngineConfig};
use etlflow::pipeline::{ConsoleLoader, Pipeline};
use etlflow::query::executor::engine::ExecutionEngine;
use etlflow::query::executor::expression_eval::Evaluator;
use etlflow::query::executor::result::{Row, Value};

const HISTORY_FILE: &str = ".etl_history";

#[derive(Parser)]
#[command(author, version, about = "etl - validate and run declarative ETL pipelines")]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a pipeline definition without processing any rows
    Validate {
        /// Pipeline definition (JSON)
        pipeline: PathBuf,
    },

    /// Validate, extract, transform and load a pipeline
    Run {
        /// Pipeline definition (JSON)
        pipeline: PathBuf,

        /// Merge aggregates sharing a group-by into one row per group
        #[arg(long)]
        wide: bool,

        /// Skip the validation pass
        #[arg(long)]
        no_validate: bool,
    },

    /// Evaluate a single expression
    Eval {
        /// Expression to evaluate
        expression: String,

        /// Row values as column=value
        #[arg(short, long = "row", value_parser = parse_key_val)]
        row: Vec<(String, String)>,
    },

    /// Start an interactive expression shell
    Shell,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected column=value, got '{}'", s))
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_json_file(path).with_context(|| format!("Failed to load {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn build_row(pairs: &[(String, String)]) -> Row {
    let mut row = Row::new();
    for (column, raw) in pairs {
        row.set(column.clone(), Value::from_cell(raw));
    }
    row
}

/// What the shell should do after a line
#[derive(Debug, PartialEq)]
enum ShellAction {
    Print(String),
    Exit,
    Nothing,
}

/// Handle one shell line against the working row
fn handle_line(line: &str, row: &mut Row, evaluator: &Evaluator) -> ShellAction {
    let line = line.trim();
    if line.is_empty() {
        return ShellAction::Nothing;
    }

    match line.to_lowercase().as_str() {
        "exit" | "quit" => return ShellAction::Exit,
        "help" => return ShellAction::Print(help_text()),
        ":row" => {
            return ShellAction::Print(if row.is_empty() {
                "(empty row)".to_string()
            } else {
                row.values_with_names()
                    .map(|(col, val)| format!("{} = {}", col, val))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        ":clear" => {
            *row = Row::new();
            return ShellAction::Print("Row cleared".to_string());
        }
        _ => {}
    }

    if let Some(rest) = line.strip_prefix(":set") {
        let mut parts = rest.trim().splitn(2, char::is_whitespace);
        return match (parts.next().filter(|c| !c.is_empty()), parts.next()) {
            (Some(column), Some(raw)) => {
                let value = Value::from_cell(raw.trim());
                let message = format!("{} = {}", column, value);
                row.set(column.to_string(), value);
                ShellAction::Print(message)
            }
            _ => ShellAction::Print("Usage: :set <column> <value>".to_string()),
        };
    }

    match evaluator.evaluate(line, row) {
        Ok(value) => ShellAction::Print(value.to_string()),
        Err(err) => ShellAction::Print(format!("Error: {}", err)),
    }
}

fn help_text() -> String {
    [
        "Enter an expression to evaluate it against the working row.",
        "",
        "Operators (lowest to highest precedence):",
        "  OR, AND, NOT",
        "  = == != <> < > <= >= CONTAINS",
        "  + -",
        "  * /",
        "Literals: 12.5, \"text\", TRUE, FALSE, NULL",
        "",
        "Commands:",
        "  :set <column> <value>         - Set a column on the working row",
        "  :row                          - Show the working row",
        "  :clear                        - Clear the working row",
        "  help                          - Display this help message",
        "  exit                          - Exit the shell",
    ]
    .join("\n")
}

fn run_shell(config: &EngineConfig) -> Result<()> {
    println!("etl expression shell. Type 'help' for assistance or 'exit' to quit.");

    let evaluator = Evaluator::new().with_null_short_circuit(config.null_short_circuit);
    let mut row = Row::new();
    let mut rl = Editor::<(), DefaultHistory>::new()?;
    if let Err(err) = rl.load_history(HISTORY_FILE) {
        if !err.to_string().contains("No such file or directory") {
            println!("Error loading history: {}", err);
        }
    }

    loop {
        match rl.readline("etl> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match handle_line(&line, &mut row, &evaluator) {
                    ShellAction::Print(text) => println!("{}", text),
                    ShellAction::Exit => {
                        println!("Goodbye!");
                        break;
                    }
                    ShellAction::Nothing => {}
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    if let Err(err) = rl.save_history(HISTORY_FILE) {
        println!("Error saving history: {}", err);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Validate { pipeline }) => {
            let definition = Pipeline::from_json_file(&pipeline)?;
            let registry = PipelineValidator::check(&definition)
                .with_context(|| format!("Pipeline '{}' is invalid", definition.name))?;
            println!("Pipeline '{}' is valid", definition.name);
            println!("{}", registry.describe());
        }
        Some(Commands::Run {
            pipeline,
            wide,
            no_validate,
        }) => {
            let definition = Pipeline::from_json_file(&pipeline)?;
            let mut config = config;
            if wide {
                config = config.with_aggregate_mode(AggregateMode::Wide);
            }
            if no_validate {
                config = config.with_validation(false);
            }
            info!("Loaded pipeline '{}' from {}", definition.name, pipeline.display());

            let engine = ExecutionEngine::new(config);
            let mut loader = ConsoleLoader::new(io::stdout());
            engine
                .run(&definition, &mut loader)
                .with_context(|| format!("Pipeline '{}' failed", definition.name))?;
        }
        Some(Commands::Eval { expression, row }) => {
            let evaluator = Evaluator::new().with_null_short_circuit(config.null_short_circuit);
            let value = evaluator
                .evaluate(&expression, &build_row(&row))
                .with_context(|| format!("Failed to evaluate '{}'", expression))?;
            println!("{}", value);
        }
        Some(Commands::Shell) | None => {
            run_shell(&config)?;
        }
    }

    Ok(())
}
